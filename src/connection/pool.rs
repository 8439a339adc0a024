use std::sync::{Arc, RwLock, Weak};

use tracing::trace;

use crate::mavlink::Packet;

use super::Connection;

/// Registry of every live connection; received packets fan out through it.
///
/// Connections are held weakly, so dropping an endpoint's last `Arc` is
/// enough to retire it; dead references are pruned on the way through.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    connections: RwLock<Vec<Weak<Connection>>>,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, connection: &Arc<Connection>) {
        let mut connections = self.connections.write().expect("connection pool poisoned");
        connections.push(Arc::downgrade(connection));
    }

    pub fn remove(&self, connection: &Arc<Connection>) {
        let mut connections = self.connections.write().expect("connection pool poisoned");
        connections.retain(|weak| {
            weak.upgrade()
                .is_some_and(|live| !Arc::ptr_eq(&live, connection))
        });
    }

    /// Offers `packet` to every live connection except the one it arrived
    /// on. No lock is held while the connections run their filters.
    pub fn send(&self, packet: &Arc<Packet>) {
        let (live, had_dead) = {
            let connections = self.connections.read().expect("connection pool poisoned");
            let live: Vec<Arc<Connection>> =
                connections.iter().filter_map(Weak::upgrade).collect();
            let had_dead = live.len() < connections.len();
            (live, had_dead)
        };

        if had_dead {
            let mut connections = self.connections.write().expect("connection pool poisoned");
            connections.retain(|weak| weak.strong_count() > 0);
        }

        let source = packet.connection();
        for connection in live {
            if source
                .as_ref()
                .is_some_and(|source| Arc::ptr_eq(source, &connection))
            {
                trace!("skipping source connection {}", connection.name());
                continue;
            }
            connection.send(packet);
        }
    }

    /// Closes every live connection's queue; used at shutdown so egress
    /// drivers drain out.
    pub fn close(&self) {
        let connections = self.connections.read().expect("connection pool poisoned");
        for connection in connections.iter().filter_map(Weak::upgrade) {
            connection.close();
        }
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        let connections = self.connections.read().expect("connection pool poisoned");
        connections
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
