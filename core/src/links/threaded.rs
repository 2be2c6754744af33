//! Background-polled receiver.
//!
//! [`ThreadedReceiver`] owns one thread that repeatedly calls the wrapped
//! receiver's `receive()`, pushing every message into a lock-free buffer.
//! Callers pop from that buffer without ever blocking. Delivery is FIFO;
//! a bounded buffer applies the configured [`OverflowPolicy`] when full.
//!
//! The thread is stopped and joined by [`ThreadedReceiver::stop`], by
//! `close()`, or when the wrapper is dropped.
use crate::config::{OverflowPolicy, PollingConfig};
use crate::link::{Endpoint, Message, Receiver};
use crate::{CommsError, Result};
use chrono::{DateTime, Utc};
use crossbeam::channel::{self, RecvTimeoutError};
use crossbeam::queue::{ArrayQueue, SegQueue};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Polling statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiverStats {
    /// Messages obtained from the wrapped receiver
    pub total_polled: u64,
    /// Messages handed to callers
    pub total_delivered: u64,
    /// Messages discarded by the overflow policy
    pub dropped_messages: u64,
    /// Errors returned by the wrapped receiver
    pub poll_errors: u64,
    /// Messages currently buffered
    pub backlog_size: usize,
    pub last_message_at: Option<DateTime<Utc>>,
}

enum MessageBuffer {
    Bounded {
        queue: ArrayQueue<Message>,
        overflow: OverflowPolicy,
    },
    Unbounded(SegQueue<Message>),
}

impl MessageBuffer {
    fn new(config: &PollingConfig) -> Self {
        match config.capacity {
            Some(capacity) => MessageBuffer::Bounded {
                queue: ArrayQueue::new(capacity),
                overflow: config.overflow,
            },
            None => MessageBuffer::Unbounded(SegQueue::new()),
        }
    }

    /// Push a message, returning whichever message the overflow policy discarded.
    fn push(&self, message: Message) -> Option<Message> {
        match self {
            MessageBuffer::Bounded { queue, overflow } => match overflow {
                OverflowPolicy::DropOldest => queue.force_push(message),
                OverflowPolicy::DropNewest => queue.push(message).err(),
            },
            MessageBuffer::Unbounded(queue) => {
                queue.push(message);
                None
            }
        }
    }

    fn pop(&self) -> Option<Message> {
        match self {
            MessageBuffer::Bounded { queue, .. } => queue.pop(),
            MessageBuffer::Unbounded(queue) => queue.pop(),
        }
    }

    fn len(&self) -> usize {
        match self {
            MessageBuffer::Bounded { queue, .. } => queue.len(),
            MessageBuffer::Unbounded(queue) => queue.len(),
        }
    }
}

#[derive(Default)]
struct Counters {
    polled: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    errors: AtomicU64,
    last_message_at: Mutex<Option<DateTime<Utc>>>,
}

/// State shared between the wrapper and its polling thread
struct Shared {
    inner: Arc<dyn Receiver>,
    buffer: MessageBuffer,
    counters: Counters,
}

/// Receiver adapter that drains a wrapped receiver on a background thread.
pub struct ThreadedReceiver {
    shared: Arc<Shared>,
    config: PollingConfig,
    // Dropping the sender wakes and terminates the polling loop.
    stop_tx: Mutex<Option<channel::Sender<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl ThreadedReceiver {
    /// Wrap `receiver` and start polling it immediately.
    pub fn new<R: Receiver + 'static>(receiver: R, config: PollingConfig) -> Result<Self> {
        Self::from_shared(Arc::new(receiver), config)
    }

    /// Wrap a receiver that is also referenced elsewhere.
    pub fn from_shared(receiver: Arc<dyn Receiver>, config: PollingConfig) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(Shared {
            inner: receiver,
            buffer: MessageBuffer::new(&config),
            counters: Counters::default(),
        });
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);

        let address = shared.inner.address().to_string();
        let thread_name = thread_name(&config, &address);
        let interval = config.poll_interval();
        let worker = Arc::clone(&shared);

        let handle = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || poll_loop(worker, stop_rx, interval))?;

        info!(
            target: "threaded_receiver",
            address = %address,
            thread = %thread_name,
            interval = ?interval,
            capacity = ?config.capacity,
            "Started polling receiver"
        );

        Ok(Self {
            shared,
            config,
            stop_tx: Mutex::new(Some(stop_tx)),
            handle: Mutex::new(Some(handle)),
            stopped: AtomicBool::new(false),
        })
    }

    /// Signal the polling thread and wait for it to exit.
    ///
    /// Once this returns, the buffer receives no further writes. A second
    /// call returns [`CommsError::AlreadyStopped`], but only after the thread
    /// has been joined, even when the first call is still in progress on
    /// another thread.
    pub fn stop(&self) -> Result<()> {
        // Held across the join so concurrent callers wait for the thread to exit.
        let mut handle = lock(&self.handle);
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Err(CommsError::AlreadyStopped(self.address().to_string()));
        }

        drop(lock(&self.stop_tx).take());
        if let Some(handle) = handle.take() {
            if handle.join().is_err() {
                error!(target: "threaded_receiver", address = %self.address(), "Polling thread panicked");
                return Err(CommsError::transport(
                    self.address(),
                    "polling thread panicked",
                ));
            }
        }

        info!(
            target: "threaded_receiver",
            address = %self.address(),
            backlog = self.shared.buffer.len(),
            "Stopped polling receiver"
        );
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    /// Messages currently buffered
    pub fn len(&self) -> usize {
        self.shared.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    pub fn stats(&self) -> ReceiverStats {
        let counters = &self.shared.counters;
        ReceiverStats {
            total_polled: counters.polled.load(Ordering::Relaxed),
            total_delivered: counters.delivered.load(Ordering::Relaxed),
            dropped_messages: counters.dropped.load(Ordering::Relaxed),
            poll_errors: counters.errors.load(Ordering::Relaxed),
            backlog_size: self.shared.buffer.len(),
            last_message_at: *lock(&counters.last_message_at),
        }
    }
}

impl Endpoint for ThreadedReceiver {
    fn address(&self) -> &str {
        self.shared.inner.address()
    }

    /// Stop polling, then close the wrapped receiver once the thread has exited.
    fn close(&self) -> Result<()> {
        match self.stop() {
            Ok(()) | Err(CommsError::AlreadyStopped(_)) => {}
            Err(e) => return Err(e),
        }
        self.shared.inner.close()
    }
}

impl Receiver for ThreadedReceiver {
    /// Pop the oldest buffered message without blocking.
    fn receive(&self) -> Result<Option<Message>> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(CommsError::AlreadyStopped(self.address().to_string()));
        }
        let message = self.shared.buffer.pop();
        if message.is_some() {
            self.shared.counters.delivered.fetch_add(1, Ordering::Relaxed);
        }
        Ok(message)
    }
}

impl Drop for ThreadedReceiver {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(e) = self.stop() {
                warn!(target: "threaded_receiver", error = %e, "Failed to stop polling receiver on drop");
            }
        }
    }
}

impl std::fmt::Debug for ThreadedReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadedReceiver")
            .field("address", &self.address())
            .field("running", &self.is_running())
            .field("backlog", &self.len())
            .finish()
    }
}

fn poll_loop(shared: Arc<Shared>, stop_rx: channel::Receiver<()>, interval: Duration) {
    let address = shared.inner.address().to_string();
    debug!(target: "threaded_receiver", address = %address, "Polling loop running");

    loop {
        match shared.inner.receive() {
            Ok(Some(message)) => {
                let counters = &shared.counters;
                counters.polled.fetch_add(1, Ordering::Relaxed);
                *lock(&counters.last_message_at) = Some(Utc::now());
                if shared.buffer.push(message).is_some() {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(target: "threaded_receiver", address = %address, "Polling buffer full, dropped message");
                }
            }
            Ok(None) => {}
            Err(e) => {
                shared.counters.errors.fetch_add(1, Ordering::Relaxed);
                warn!(target: "threaded_receiver", address = %address, error = %e, "Wrapped receiver failed");
            }
        }

        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(target: "threaded_receiver", address = %address, "Polling loop exited");
}

// Thread names may not contain NUL bytes.
fn thread_name(config: &PollingConfig, address: &str) -> String {
    let name = match &config.thread_name {
        Some(name) => name.clone(),
        None => format!("poll-{}", address),
    };
    name.replace('\0', "_")
}

// Poisoning only means another thread panicked mid-update; the data is still usable.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
