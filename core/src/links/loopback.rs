//! In-process links backed by crossbeam channels.
//!
//! Bytes sent on a [`LoopbackTransmitter`] are visible to its paired
//! [`LoopbackReceiver`] as soon as `send` returns, in FIFO order.
use crate::link::{Endpoint, Message, Receiver, Transmitter};
use crate::{CommsError, Result};
use crossbeam::channel::{self, RecvTimeoutError, TryRecvError, TrySendError};
use std::time::Duration;
use tracing::debug;

/// Sending half of a loopback pair.
#[derive(Debug, Clone)]
pub struct LoopbackTransmitter {
    address: String,
    sender: channel::Sender<Message>,
}

/// Receiving half of a loopback pair.
#[derive(Debug)]
pub struct LoopbackReceiver {
    address: String,
    receiver: channel::Receiver<Message>,
    wait: Option<Duration>,
}

/// Unbounded transmitter/receiver pair.
pub fn loopback(
    tx_address: impl Into<String>,
    rx_address: impl Into<String>,
) -> (LoopbackTransmitter, LoopbackReceiver) {
    let (sender, receiver) = channel::unbounded();
    pair(tx_address.into(), rx_address.into(), sender, receiver)
}

/// Bounded pair; `send` fails with a transport error while the queue is full.
pub fn bounded_loopback(
    tx_address: impl Into<String>,
    rx_address: impl Into<String>,
    capacity: usize,
) -> (LoopbackTransmitter, LoopbackReceiver) {
    let (sender, receiver) = channel::bounded(capacity);
    pair(tx_address.into(), rx_address.into(), sender, receiver)
}

fn pair(
    tx_address: String,
    rx_address: String,
    sender: channel::Sender<Message>,
    receiver: channel::Receiver<Message>,
) -> (LoopbackTransmitter, LoopbackReceiver) {
    (
        LoopbackTransmitter {
            address: tx_address,
            sender,
        },
        LoopbackReceiver {
            address: rx_address,
            receiver,
            wait: None,
        },
    )
}

impl LoopbackReceiver {
    /// Make `receive` block up to `wait` for a message, like a socket read.
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = Some(wait);
        self
    }

    /// Messages queued and not yet received
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl Endpoint for LoopbackTransmitter {
    fn address(&self) -> &str {
        &self.address
    }
}

impl Transmitter for LoopbackTransmitter {
    fn send(&self, message: &[u8]) -> Result<()> {
        send_on(&self.address, &self.sender, message)
    }
}

impl Endpoint for LoopbackReceiver {
    fn address(&self) -> &str {
        &self.address
    }
}

impl Receiver for LoopbackReceiver {
    fn receive(&self) -> Result<Option<Message>> {
        Ok(receive_on(&self.receiver, self.wait))
    }
}

/// One side of a bidirectional in-process link.
#[derive(Debug)]
pub struct DuplexEndpoint {
    address: String,
    sender: channel::Sender<Message>,
    receiver: channel::Receiver<Message>,
}

/// Two connected endpoints: what one sends, the other receives.
pub fn duplex_pair(
    a_address: impl Into<String>,
    b_address: impl Into<String>,
) -> (DuplexEndpoint, DuplexEndpoint) {
    let (a_to_b, b_from_a) = channel::unbounded();
    let (b_to_a, a_from_b) = channel::unbounded();
    (
        DuplexEndpoint {
            address: a_address.into(),
            sender: a_to_b,
            receiver: a_from_b,
        },
        DuplexEndpoint {
            address: b_address.into(),
            sender: b_to_a,
            receiver: b_from_a,
        },
    )
}

impl Endpoint for DuplexEndpoint {
    fn address(&self) -> &str {
        &self.address
    }
}

impl Receiver for DuplexEndpoint {
    fn receive(&self) -> Result<Option<Message>> {
        Ok(receive_on(&self.receiver, None))
    }
}

impl Transmitter for DuplexEndpoint {
    fn send(&self, message: &[u8]) -> Result<()> {
        send_on(&self.address, &self.sender, message)
    }
}

fn send_on(address: &str, sender: &channel::Sender<Message>, message: &[u8]) -> Result<()> {
    match sender.try_send(message.to_vec()) {
        Ok(()) => {
            debug!(target: "loopback", address = %address, bytes = message.len(), "Queued message");
            Ok(())
        }
        Err(TrySendError::Full(_)) => Err(CommsError::transport(address, "loopback queue full")),
        Err(TrySendError::Disconnected(_)) => {
            Err(CommsError::transport(address, "loopback peer disconnected"))
        }
    }
}

// A disconnected peer reads as "no message" once the queue is drained.
fn receive_on(receiver: &channel::Receiver<Message>, wait: Option<Duration>) -> Option<Message> {
    match wait {
        Some(wait) => match receiver.recv_timeout(wait) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        },
        None => match receiver.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        },
    }
}
