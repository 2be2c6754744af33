// No-op links used as channel placeholders
use crate::link::{Endpoint, Message, Receiver, Transmitter};
use crate::Result;

/// Receiver that never has a message
#[derive(Debug, Clone)]
pub struct DummyReceiver {
    address: String,
}

impl DummyReceiver {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl Default for DummyReceiver {
    fn default() -> Self {
        Self::new("dummy-rx")
    }
}

impl Endpoint for DummyReceiver {
    fn address(&self) -> &str {
        &self.address
    }
}

impl Receiver for DummyReceiver {
    fn receive(&self) -> Result<Option<Message>> {
        Ok(None)
    }
}

/// Transmitter that accepts and discards every message
#[derive(Debug, Clone)]
pub struct DummyTransmitter {
    address: String,
}

impl DummyTransmitter {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl Default for DummyTransmitter {
    fn default() -> Self {
        Self::new("dummy-tx")
    }
}

impl Endpoint for DummyTransmitter {
    fn address(&self) -> &str {
        &self.address
    }
}

impl Transmitter for DummyTransmitter {
    fn send(&self, _message: &[u8]) -> Result<()> {
        Ok(())
    }
}
