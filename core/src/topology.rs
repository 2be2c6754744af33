// Topology snapshot
//
// Serializable view of a network: channels, their links and directions

use crate::link::Direction;
use crate::network::Network;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub network: String,
    pub channels: Vec<ChannelNode>,
    pub timestamp: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChannelNode {
    pub name: String,
    pub links: Vec<LinkNode>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkNode {
    pub address: String,
    pub kind: String,
    pub direction: Direction,
}

impl TopologySnapshot {
    pub fn from_network(network: &Network) -> Self {
        let channels = network
            .channels()
            .map(|(name, channel)| ChannelNode {
                name: name.to_string(),
                links: channel
                    .links()
                    .iter()
                    .map(|link| LinkNode {
                        address: link.address().to_string(),
                        kind: link.kind().to_string(),
                        direction: link.direction(),
                    })
                    .collect(),
            })
            .collect();

        TopologySnapshot {
            network: network.name().to_string(),
            channels,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
