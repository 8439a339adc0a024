use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::mavlink::MavAddress;

/// How long an address stays fresh without being seen again.
pub const DEFAULT_ADDRESS_TTL: Duration = Duration::from_secs(120);

/// The set of MAVLink addresses recently observed on a connection.
///
/// Every sighting refreshes the address's timestamp; queries never return
/// an address older than the TTL. Timestamps come from [`tokio::time`], so
/// tests can drive expiry with paused time.
#[derive(Debug)]
pub struct AddressPool {
    entries: Mutex<HashMap<MavAddress, Instant>>,
    ttl: Duration,
}

impl AddressPool {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_ADDRESS_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Records a sighting of `address`. Returns true if the address was not
    /// already fresh in the pool.
    pub fn add(&self, address: MavAddress) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("address pool poisoned");
        match entries.insert(address, now) {
            Some(last_seen) => now.duration_since(last_seen) >= self.ttl,
            None => true,
        }
    }

    /// Whether `address` has been seen within the TTL.
    pub fn contains(&self, address: MavAddress) -> bool {
        let entries = self.entries.lock().expect("address pool poisoned");
        entries
            .get(&address)
            .is_some_and(|last_seen| last_seen.elapsed() < self.ttl)
    }

    /// All fresh addresses. Expired entries are pruned as a side effect.
    pub fn addresses(&self) -> Vec<MavAddress> {
        let ttl = self.ttl;
        let mut entries = self.entries.lock().expect("address pool poisoned");
        entries.retain(|_, last_seen| last_seen.elapsed() < ttl);
        entries.keys().copied().collect()
    }
}

impl Default for AddressPool {
    fn default() -> Self {
        Self::new()
    }
}
