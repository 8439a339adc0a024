use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::filter::Filter;
use crate::metrics::Metrics;

use super::{AddressPool, Connection, PacketQueue};

/// Builds the per-peer connections of a multi-peer interface (UDP) and
/// multiplexes their egress wake-ups.
///
/// Every queue handed out by the factory releases one permit on a shared
/// semaphore per push, so a single task can sleep in
/// [`wait_for_packet`](Self::wait_for_packet) and then drain whichever
/// peer queues have work.
pub struct ConnectionFactory {
    filter: Arc<Filter>,
    metrics: Metrics,
    address_ttl: Duration,
    ready: Arc<Semaphore>,
}

impl ConnectionFactory {
    pub fn new(filter: Arc<Filter>, metrics: Metrics, address_ttl: Duration) -> Self {
        Self {
            filter,
            metrics,
            address_ttl,
            ready: Arc::new(Semaphore::new(0)),
        }
    }

    /// Creates a connection whose queue signals this factory on every push.
    pub fn connect(&self, name: impl Into<String>) -> Arc<Connection> {
        let ready = Arc::clone(&self.ready);
        let queue = PacketQueue::with_callback(move || {
            ready.add_permits(1);
        });
        Arc::new(Connection::new(
            name,
            Arc::clone(&self.filter),
            false,
            AddressPool::with_ttl(self.address_ttl),
            queue,
            self.metrics.clone(),
        ))
    }

    /// Waits until some connection created by this factory has queued a
    /// packet. `None` waits indefinitely. Returns false on timeout.
    pub async fn wait_for_packet(&self, timeout: Option<Duration>) -> bool {
        let acquired = match timeout {
            Some(timeout) => match tokio::time::timeout(timeout, self.ready.acquire()).await {
                Ok(result) => result.ok(),
                Err(_elapsed) => None,
            },
            None => self.ready.acquire().await.ok(),
        };
        match acquired {
            Some(permit) => {
                permit.forget();
                true
            }
            None => false,
        }
    }
}
