use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tracing::{debug, error, info};

use crate::config::UdpConfig;
use crate::connection::{Connection, ConnectionFactory, ConnectionPool};
use crate::filter::Filter;
use crate::mavlink::PacketParser;
use crate::metrics::Metrics;

struct Peer {
    connection: Arc<Connection>,
    parser: PacketParser,
}

/// A UDP endpoint: one socket, one connection per remote peer.
///
/// Each distinct remote address gets its own connection (and parser) the
/// first time a datagram arrives from it. Egress is multiplexed through the
/// [`ConnectionFactory`]: one task sleeps until any peer queue has work,
/// then drains them all.
pub struct UdpInterface {
    name: String,
    socket: UdpSocket,
    factory: ConnectionFactory,
    peers: HashMap<SocketAddr, Peer>,
    pool: Arc<ConnectionPool>,
    metrics: Metrics,
    /// Egress rate limit in bits per second.
    max_bitrate: Option<u64>,
}

impl UdpInterface {
    pub async fn bind(
        config: &UdpConfig,
        filter: Arc<Filter>,
        pool: Arc<ConnectionPool>,
        metrics: Metrics,
        address_ttl: Duration,
    ) -> anyhow::Result<Self> {
        let bind_addr = format!("{}:{}", config.address, config.port);
        let socket = UdpSocket::bind(&bind_addr).await?;
        info!("udp:{} listening", bind_addr);

        Ok(Self {
            name: format!("udp:{bind_addr}"),
            socket,
            factory: ConnectionFactory::new(filter, metrics.clone(), address_ttl),
            peers: HashMap::new(),
            pool,
            metrics,
            max_bitrate: config.max_bitrate,
        })
    }

    pub async fn run(mut self) {
        let mut buf = vec![0u8; 65536];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, addr)) => self.handle_datagram(&buf[..len], addr),
                        Err(error) => {
                            error!("{} receive error: {}", self.name, error);
                        }
                    }
                }

                _ = self.factory.wait_for_packet(None) => {
                    if let Err(error) = self.flush().await {
                        error!("{} send error: {}", self.name, error);
                    }
                }
            }
        }
    }

    fn handle_datagram(&mut self, data: &[u8], addr: SocketAddr) {
        if !self.peers.contains_key(&addr) {
            info!("{}: new peer {}", self.name, addr);
            let connection = self.factory.connect(format!("udp:{addr}"));
            self.pool.add(&connection);
            self.peers.insert(
                addr,
                Peer {
                    connection,
                    parser: PacketParser::new(),
                },
            );
        }
        let Some(peer) = self.peers.get_mut(&addr) else {
            return;
        };

        for &byte in data {
            if let Some(mut packet) = peer.parser.parse_byte(byte) {
                self.metrics.record_received();
                packet.set_connection(&peer.connection);
                let packet = Arc::new(packet);
                debug!("udp:{} received {}", addr, packet);
                peer.connection.add_address(packet.source());
                self.pool.send(&packet);
            }
        }
    }

    /// Drains every peer queue onto the socket.
    async fn flush(&self) -> std::io::Result<()> {
        for (addr, peer) in &self.peers {
            while let Some(packet) = peer.connection.next_packet(Some(Duration::ZERO)).await {
                self.socket.send_to(packet.data(), addr).await?;
                debug!("udp:{} wrote {}", addr, packet);

                if let Some(max_bitrate) = self.max_bitrate {
                    let bits = packet.data().len() as u64 * 8;
                    let pause = Duration::from_secs_f64(bits as f64 / max_bitrate as f64);
                    tokio::time::sleep(pause).await;
                }
            }
        }
        Ok(())
    }
}
