//! Concrete links shipped with the core.
//!
//! - `DummyReceiver` / `DummyTransmitter`: no-op placeholders for channels built without a real endpoint
//! - `loopback` / `duplex_pair`: in-process queues, the stub transport used in tests and demos
//! - `ThreadedReceiver`: drains a slow or blocking receiver on a background thread into a buffer

pub mod dummy;
pub mod loopback;
pub mod threaded;

pub use dummy::{DummyReceiver, DummyTransmitter};
pub use loopback::{
    bounded_loopback, duplex_pair, loopback, DuplexEndpoint, LoopbackReceiver, LoopbackTransmitter,
};
pub use threaded::{ReceiverStats, ThreadedReceiver};
