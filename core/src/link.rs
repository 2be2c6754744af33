//! Link capability contract.
//!
//! A link is a single addressable, directional endpoint. Concrete transports
//! implement [`Receiver`], [`Transmitter`] or both; a [`Channel`](crate::Channel)
//! only ever talks to them through the [`Link`] union.
use crate::{CommsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Raw message bytes carried by a link
pub type Message = Vec<u8>;

/// Which operations a link accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
    Bidirectional,
}

impl Direction {
    pub fn is_incoming(self) -> bool {
        self != Direction::Outgoing
    }

    pub fn is_outgoing(self) -> bool {
        self != Direction::Incoming
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Incoming => f.write_str("incoming"),
            Direction::Outgoing => f.write_str("outgoing"),
            Direction::Bidirectional => f.write_str("bidirectional"),
        }
    }
}

/// Operation requested on a link, reported in direction errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Send,
    Receive,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Send => f.write_str("send"),
            Operation::Receive => f.write_str("receive"),
        }
    }
}

/// Shared base of every link role.
pub trait Endpoint: Send + Sync {
    /// Stable address, constant for the lifetime of the object.
    fn address(&self) -> &str;

    /// Release transport resources held by this endpoint.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Inbound-only role.
pub trait Receiver: Endpoint {
    /// Next available message, or `None` when nothing is pending.
    ///
    /// Implementations that may block should be wrapped in a
    /// [`ThreadedReceiver`](crate::ThreadedReceiver) before being polled
    /// synchronously through a channel.
    fn receive(&self) -> Result<Option<Message>>;
}

/// Outbound-only role.
pub trait Transmitter: Endpoint {
    /// Best-effort delivery; failures are returned, never swallowed.
    fn send(&self, message: &[u8]) -> Result<()>;
}

/// Symmetric transports satisfy both roles with one object.
pub trait Duplex: Receiver + Transmitter {}

impl<T: Receiver + Transmitter> Duplex for T {}

/// A link held by a channel, tagged by role.
#[derive(Clone)]
pub enum Link {
    Receiver(Arc<dyn Receiver>),
    Transmitter(Arc<dyn Transmitter>),
    Duplex(Arc<dyn Duplex>),
}

impl Link {
    pub fn receiver<R: Receiver + 'static>(receiver: R) -> Self {
        Link::Receiver(Arc::new(receiver))
    }

    pub fn transmitter<T: Transmitter + 'static>(transmitter: T) -> Self {
        Link::Transmitter(Arc::new(transmitter))
    }

    pub fn duplex<D: Duplex + 'static>(duplex: D) -> Self {
        Link::Duplex(Arc::new(duplex))
    }

    pub fn address(&self) -> &str {
        match self {
            Link::Receiver(r) => r.address(),
            Link::Transmitter(t) => t.address(),
            Link::Duplex(d) => d.address(),
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Link::Receiver(_) => Direction::Incoming,
            Link::Transmitter(_) => Direction::Outgoing,
            Link::Duplex(_) => Direction::Bidirectional,
        }
    }

    /// Role name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Link::Receiver(_) => "Receiver",
            Link::Transmitter(_) => "Transmitter",
            Link::Duplex(_) => "Duplex",
        }
    }

    pub fn receive(&self) -> Result<Option<Message>> {
        match self {
            Link::Receiver(r) => r.receive(),
            Link::Duplex(d) => d.receive(),
            Link::Transmitter(_) => Err(self.mismatch(Operation::Receive)),
        }
    }

    pub fn send(&self, message: &[u8]) -> Result<()> {
        match self {
            Link::Transmitter(t) => t.send(message),
            Link::Duplex(d) => d.send(message),
            Link::Receiver(_) => Err(self.mismatch(Operation::Send)),
        }
    }

    pub fn close(&self) -> Result<()> {
        match self {
            Link::Receiver(r) => r.close(),
            Link::Transmitter(t) => t.close(),
            Link::Duplex(d) => d.close(),
        }
    }

    pub(crate) fn mismatch(&self, operation: Operation) -> CommsError {
        CommsError::DirectionMismatch {
            address: self.address().to_string(),
            direction: self.direction(),
            operation,
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.address())
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("kind", &self.kind())
            .field("address", &self.address())
            .finish()
    }
}
