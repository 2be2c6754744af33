// Channel implementation
use crate::link::{Link, Message, Operation, Receiver, Transmitter};
use crate::links::{DummyReceiver, DummyTransmitter};
use crate::{CommsError, Duplex, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One entry per incoming link from [`Channel::receive`], in link order
pub type Gathered = Vec<(String, Result<Option<Message>>)>;

/// A fixed set of links routable by address.
///
/// Membership is decided at construction and never changes afterwards, so a
/// channel can be shared freely between threads.
pub struct Channel {
    links: Vec<Link>,
    // address -> position in `links`
    index: HashMap<String, usize>,
}

impl Channel {
    /// Build from any mix of links; fails on empty or duplicate addresses.
    pub fn from_links(links: Vec<Link>) -> Result<Self> {
        let mut index = HashMap::with_capacity(links.len());
        for (pos, link) in links.iter().enumerate() {
            let address = link.address();
            if address.is_empty() {
                return Err(CommsError::InvalidAddress(address.to_string()));
            }
            if index.insert(address.to_string(), pos).is_some() {
                return Err(CommsError::DuplicateAddress(address.to_string()));
            }
        }
        debug!(target: "channel", links = links.len(), "Built channel");
        Ok(Self { links, index })
    }

    /// Receivers first, then transmitters.
    pub fn new(
        receivers: Vec<Arc<dyn Receiver>>,
        transmitters: Vec<Arc<dyn Transmitter>>,
    ) -> Result<Self> {
        let links = receivers
            .into_iter()
            .map(Link::Receiver)
            .chain(transmitters.into_iter().map(Link::Transmitter))
            .collect();
        Self::from_links(links)
    }

    pub fn builder() -> ChannelBuilder {
        ChannelBuilder::default()
    }

    /// One receiver and one transmitter; a missing side becomes a dummy.
    pub fn point_to_point(
        receiver: Option<Arc<dyn Receiver>>,
        transmitter: Option<Arc<dyn Transmitter>>,
    ) -> Result<Self> {
        let receiver: Arc<dyn Receiver> = match receiver {
            Some(receiver) => receiver,
            None => Arc::new(DummyReceiver::default()),
        };
        let transmitter: Arc<dyn Transmitter> = match transmitter {
            Some(transmitter) => transmitter,
            None => Arc::new(DummyTransmitter::default()),
        };
        Self::new(vec![receiver], vec![transmitter])
    }

    /// One receiver, many transmitters.
    pub fn fan_out(
        receiver: Arc<dyn Receiver>,
        transmitters: Vec<Arc<dyn Transmitter>>,
    ) -> Result<Self> {
        Self::new(vec![receiver], transmitters)
    }

    /// Many receivers, one transmitter.
    pub fn fan_in(
        receivers: Vec<Arc<dyn Receiver>>,
        transmitter: Arc<dyn Transmitter>,
    ) -> Result<Self> {
        Self::new(receivers, vec![transmitter])
    }

    /// Many receivers, many transmitters.
    pub fn mesh(
        receivers: Vec<Arc<dyn Receiver>>,
        transmitters: Vec<Arc<dyn Transmitter>>,
    ) -> Result<Self> {
        Self::new(receivers, transmitters)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link(&self, address: &str) -> Option<&Link> {
        self.index.get(address).map(|&pos| &self.links[pos])
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.links.iter().map(|l| l.address())
    }

    /// Links whose direction is not outgoing-only
    pub fn incoming_links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|l| l.direction().is_incoming())
    }

    /// Links whose direction is not incoming-only
    pub fn outgoing_links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|l| l.direction().is_outgoing())
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Send to the link at `address`.
    pub fn send_to(&self, message: &[u8], address: &str) -> Result<()> {
        let link = self.lookup(address, Operation::Send)?;
        debug!(target: "channel", address = %address, bytes = message.len(), "Sending message");
        link.send(message)
    }

    /// Receive from the link at `address`; `Ok(None)` means no message is pending.
    pub fn receive_from(&self, address: &str) -> Result<Option<Message>> {
        let link = self.lookup(address, Operation::Receive)?;
        link.receive()
    }

    /// Broadcast to every outgoing link in link order.
    ///
    /// Every link is attempted. Returns the number of links delivered to, or
    /// [`CommsError::PartialDelivery`] naming each link that failed.
    pub fn send(&self, message: &[u8]) -> Result<usize> {
        let mut delivered = 0;
        let mut failures = Vec::new();

        for link in self.outgoing_links() {
            match link.send(message) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(target: "channel", address = %link.address(), error = %e, "Broadcast delivery failed");
                    failures.push((link.address().to_string(), e));
                }
            }
        }

        if failures.is_empty() {
            Ok(delivered)
        } else {
            Err(CommsError::PartialDelivery {
                delivered,
                failures,
            })
        }
    }

    /// Snapshot poll of every incoming link, one entry per link.
    pub fn receive(&self) -> Gathered {
        self.incoming_links()
            .map(|link| (link.address().to_string(), link.receive()))
            .collect()
    }

    /// Close every link, attempting all of them even when some fail.
    pub fn close(&self) -> Result<()> {
        let failures: Vec<(String, CommsError)> = self
            .links
            .iter()
            .filter_map(|link| {
                link.close().err().map(|e| {
                    warn!(target: "channel", address = %link.address(), error = %e, "Error closing link");
                    (link.address().to_string(), e)
                })
            })
            .collect();

        if failures.is_empty() {
            info!(target: "channel", links = self.links.len(), "Channel closed");
            Ok(())
        } else {
            Err(CommsError::CloseFailed { failures })
        }
    }

    fn lookup(&self, address: &str, operation: Operation) -> Result<&Link> {
        let link = self
            .link(address)
            .ok_or_else(|| CommsError::AddressNotFound(address.to_string()))?;
        let allowed = match operation {
            Operation::Send => link.direction().is_outgoing(),
            Operation::Receive => link.direction().is_incoming(),
        };
        if allowed {
            Ok(link)
        } else {
            Err(link.mismatch(operation))
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, link) in self.links.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", link)?;
        }
        f.write_str("]")
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel").field("links", &self.links).finish()
    }
}

/// Incremental channel construction; `links()` order is receivers,
/// transmitters, then duplex links.
#[derive(Default)]
pub struct ChannelBuilder {
    receivers: Vec<Link>,
    transmitters: Vec<Link>,
    duplexes: Vec<Link>,
}

impl ChannelBuilder {
    pub fn receiver<R: Receiver + 'static>(self, receiver: R) -> Self {
        self.shared_receiver(Arc::new(receiver))
    }

    pub fn shared_receiver(mut self, receiver: Arc<dyn Receiver>) -> Self {
        self.receivers.push(Link::Receiver(receiver));
        self
    }

    pub fn transmitter<T: Transmitter + 'static>(self, transmitter: T) -> Self {
        self.shared_transmitter(Arc::new(transmitter))
    }

    pub fn shared_transmitter(mut self, transmitter: Arc<dyn Transmitter>) -> Self {
        self.transmitters.push(Link::Transmitter(transmitter));
        self
    }

    pub fn duplex<D: Duplex + 'static>(self, duplex: D) -> Self {
        self.shared_duplex(Arc::new(duplex))
    }

    pub fn shared_duplex(mut self, duplex: Arc<dyn Duplex>) -> Self {
        self.duplexes.push(Link::Duplex(duplex));
        self
    }

    pub fn build(self) -> Result<Channel> {
        let mut links = self.receivers;
        links.extend(self.transmitters);
        links.extend(self.duplexes);
        Channel::from_links(links)
    }
}
