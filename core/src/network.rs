// Network registry
use crate::channel::Channel;
use crate::topology::TopologySnapshot;
use crate::{CommsError, Result};
use tracing::{info, warn};

/// A named collection of channels.
///
/// Channels are independent address namespaces; the network only enumerates
/// and looks them up by name.
#[derive(Debug)]
pub struct Network {
    name: String,
    channels: Vec<(String, Channel)>,
}

impl Network {
    pub fn builder(name: impl Into<String>) -> NetworkBuilder {
        NetworkBuilder {
            name: name.into(),
            channels: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Channels in registration order
    pub fn channels(&self) -> impl Iterator<Item = (&str, &Channel)> {
        self.channels.iter().map(|(name, ch)| (name.as_str(), ch))
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ch)| ch)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn topology(&self) -> TopologySnapshot {
        TopologySnapshot::from_network(self)
    }

    /// Close every channel; failures of individual links are collected.
    pub fn close(&self) -> Result<()> {
        info!(target: "network", network = %self.name, "Closing network");

        let mut failures = Vec::new();
        for (name, channel) in &self.channels {
            match channel.close() {
                Ok(()) => {}
                Err(CommsError::CloseFailed { failures: inner }) => {
                    warn!(target: "network", channel = %name, failed = inner.len(), "Channel closed with errors");
                    failures.extend(inner);
                }
                Err(e) => failures.push((name.clone(), e)),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CommsError::CloseFailed { failures })
        }
    }
}

pub struct NetworkBuilder {
    name: String,
    channels: Vec<(String, Channel)>,
}

impl NetworkBuilder {
    pub fn channel(mut self, name: impl Into<String>, channel: Channel) -> Self {
        self.channels.push((name.into(), channel));
        self
    }

    /// Fails if two channels share a name.
    pub fn build(self) -> Result<Network> {
        for (i, (name, _)) in self.channels.iter().enumerate() {
            if self.channels[..i].iter().any(|(other, _)| other == name) {
                return Err(CommsError::DuplicateChannel(name.clone()));
            }
        }
        info!(
            target: "network",
            network = %self.name,
            channels = self.channels.len(),
            "Built network"
        );
        Ok(Network {
            name: self.name,
            channels: self.channels,
        })
    }
}
