// Comms Core Library
// Transport-agnostic links, channels and networks

pub mod channel;
pub mod config;
pub mod link;
pub mod links;
pub mod network;
pub mod telemetry;
pub mod topology;

// Export core types
pub use channel::{Channel, ChannelBuilder, Gathered};
pub use config::{OverflowPolicy, PollingConfig};
pub use link::{Direction, Duplex, Endpoint, Link, Message, Operation, Receiver, Transmitter};
pub use links::{
    bounded_loopback, duplex_pair, loopback, DummyReceiver, DummyTransmitter, DuplexEndpoint,
    LoopbackReceiver, LoopbackTransmitter, ReceiverStats, ThreadedReceiver,
};
pub use network::{Network, NetworkBuilder};
pub use topology::{ChannelNode, LinkNode, TopologySnapshot};

// Error types
use thiserror::Error;

/// Opaque cause reported by a concrete transport.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum CommsError {
    #[error("Address not found: {0}")]
    AddressNotFound(String),

    #[error("Direction mismatch: cannot {operation} on {direction} link {address}")]
    DirectionMismatch {
        address: String,
        direction: Direction,
        operation: Operation,
    },

    #[error("Transport error on {address}: {source}")]
    Transport {
        address: String,
        #[source]
        source: BoxError,
    },

    #[error("Receiver already stopped: {0}")]
    AlreadyStopped(String),

    #[error("Duplicate link address: {0}")]
    DuplicateAddress(String),

    #[error("Invalid link address: {0:?}")]
    InvalidAddress(String),

    #[error("Duplicate channel name: {0}")]
    DuplicateChannel(String),

    #[error("Partial delivery: {delivered} delivered, {} failed", .failures.len())]
    PartialDelivery {
        delivered: usize,
        failures: Vec<(String, CommsError)>,
    },

    #[error("Close failed for {} link(s)", .failures.len())]
    CloseFailed { failures: Vec<(String, CommsError)> },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CommsError {
    /// Wrap a collaborator failure for the link at `address`.
    pub fn transport(address: impl Into<String>, source: impl Into<BoxError>) -> Self {
        CommsError::Transport {
            address: address.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CommsError>;
