pub mod addresses;
pub mod factory;
pub mod pool;
pub mod queue;
pub mod serial;
pub mod udp;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::filter::Filter;
use crate::mavlink::{MavAddress, Packet};
use crate::metrics::Metrics;

pub use addresses::{AddressPool, DEFAULT_ADDRESS_TTL};
pub use factory::ConnectionFactory;
pub use pool::ConnectionPool;
pub use queue::PacketQueue;

/// One endpoint of the router: the addresses seen behind it, the queue of
/// packets destined for it, and the filter consulted on every admission.
///
/// `send` is called by the fan-out for every packet received elsewhere; it
/// decides whether this endpoint gets a copy and at what priority. The
/// endpoint's egress driver drains the queue with [`next_packet`](Self::next_packet).
pub struct Connection {
    name: String,
    filter: Arc<Filter>,
    /// A mirror receives every packet, regardless of destination matching.
    mirror: bool,
    pool: AddressPool,
    queue: PacketQueue,
    metrics: Metrics,
}

impl Connection {
    pub fn new(
        name: impl Into<String>,
        filter: Arc<Filter>,
        mirror: bool,
        pool: AddressPool,
        queue: PacketQueue,
        metrics: Metrics,
    ) -> Self {
        Self {
            name: name.into(),
            filter,
            mirror,
            pool,
            queue,
            metrics,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records a sighting of `address` behind this connection.
    pub fn add_address(&self, address: MavAddress) {
        if self.pool.add(address) {
            info!("new address {} on {}", address, self.name);
        }
    }

    /// Offers a received packet to this connection.
    ///
    /// Candidate destinations come from the address pool: a packet with a
    /// concrete destination is considered for that address only (and
    /// dropped if this endpoint has never seen it); broadcast and
    /// destination-less packets are considered for every fresh address.
    /// The packet is enqueued at most once, at the highest accepted
    /// priority.
    pub fn send(&self, packet: &Arc<Packet>) {
        if self.mirror {
            self.push(packet, packet.priority());
            return;
        }

        let candidates = match packet.dest() {
            Some(dest) if !dest.is_broadcast() => {
                if self.pool.contains(dest) {
                    vec![dest]
                } else {
                    trace!("{}: no address {} in pool, dropping {}", self.name, dest, packet);
                    return;
                }
            }
            _ => self.pool.addresses(),
        };

        let mut accepted: Option<i32> = None;
        for address in candidates {
            match self.filter.will_accept(packet, address) {
                Ok((true, priority)) => {
                    accepted = Some(accepted.map_or(priority, |best| best.max(priority)));
                }
                Ok((false, _)) => {}
                Err(error) => {
                    self.metrics.record_dropped();
                    warn!("{}: dropping {}: {}", self.name, packet, error);
                    return;
                }
            }
        }

        match accepted {
            Some(priority) => self.push(packet, priority),
            None => {
                self.metrics.record_filtered();
                trace!("{}: filter rejected {}", self.name, packet);
            }
        }
    }

    /// Waits for the next packet to write out on this endpoint. `None` once
    /// the queue has been closed.
    pub async fn next_packet(&self, timeout: Option<Duration>) -> Option<Arc<Packet>> {
        self.queue.pop(timeout).await
    }

    /// Closes the packet queue; pending and future pops return `None` and
    /// later pushes are dropped.
    pub fn close(&self) {
        self.queue.close();
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    fn push(&self, packet: &Arc<Packet>, priority: i32) {
        if self.queue.push(packet.clone(), priority) {
            self.metrics.record_delivered(packet.data().len());
            debug!("{}: queued {} with priority {}", self.name, packet, priority);
        } else {
            self.metrics.record_dropped();
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .field("mirror", &self.mirror)
            .finish_non_exhaustive()
    }
}
