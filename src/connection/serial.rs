use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::sleep;
use tokio_serial::{FlowControl, SerialPortBuilderExt, SerialStream};
use tracing::{debug, error, info, warn};

use crate::config::SerialConfig;
use crate::connection::{AddressPool, Connection, ConnectionPool, PacketQueue};
use crate::filter::Filter;
use crate::mavlink::{MavAddress, PacketParser};
use crate::metrics::Metrics;

const REOPEN_DELAY: Duration = Duration::from_secs(5);

/// A serial port endpoint: one device, one connection.
///
/// Ingress bytes run through a [`PacketParser`] and fan out over the
/// connection pool; egress drains this endpoint's queue onto the port. A
/// device that fails to open (or disappears) is retried every few seconds.
pub struct SerialInterface {
    device: String,
    baud_rate: u32,
    flow_control: FlowControl,
    preload: Vec<MavAddress>,
    connection: Arc<Connection>,
    pool: Arc<ConnectionPool>,
    metrics: Metrics,
}

impl SerialInterface {
    pub fn new(
        config: &SerialConfig,
        filter: Arc<Filter>,
        pool: Arc<ConnectionPool>,
        metrics: Metrics,
        address_ttl: Duration,
    ) -> anyhow::Result<Self> {
        let preload = config
            .preload
            .iter()
            .map(|address| address.parse())
            .collect::<Result<Vec<MavAddress>, _>>()?;

        let connection = Arc::new(Connection::new(
            format!("serial:{}", config.device),
            filter,
            false,
            AddressPool::with_ttl(address_ttl),
            PacketQueue::new(),
            metrics.clone(),
        ));
        pool.add(&connection);

        Ok(Self {
            device: config.device.clone(),
            baud_rate: config.baud_rate,
            flow_control: if config.flow_control {
                FlowControl::Hardware
            } else {
                FlowControl::None
            },
            preload,
            connection,
            pool,
            metrics,
        })
    }

    pub async fn run(self) {
        loop {
            info!("serial:{} opening at {} baud", self.device, self.baud_rate);

            match tokio_serial::new(&self.device, self.baud_rate)
                .flow_control(self.flow_control)
                .open_native_async()
            {
                Ok(mut port) => {
                    info!("serial:{} opened", self.device);
                    match self.drive(&mut port).await {
                        Ok(()) if self.connection.is_closed() => {
                            info!("serial:{} shut down", self.device);
                            return;
                        }
                        Ok(()) => {
                            info!("serial:{} disconnected, reopening in 5s", self.device);
                        }
                        Err(error) => {
                            error!("serial:{} error: {}, reopening in 5s", self.device, error);
                        }
                    }
                }
                Err(error) => {
                    warn!(
                        "serial:{} failed to open: {}, retrying in 5s",
                        self.device, error
                    );
                }
            }

            if self.connection.is_closed() {
                return;
            }
            sleep(REOPEN_DELAY).await;
        }
    }

    async fn drive(&self, port: &mut SerialStream) -> anyhow::Result<()> {
        let mut parser = PacketParser::new();
        let mut read_buf = BytesMut::with_capacity(4096);
        // Preloaded addresses are refreshed so a silent peer keeps
        // receiving traffic past the pool TTL.
        let mut preload_refresh = tokio::time::interval(Duration::from_secs(30));

        loop {
            tokio::select! {
                result = port.read_buf(&mut read_buf) => {
                    match result {
                        Ok(0) => {
                            debug!("serial:{} EOF", self.device);
                            return Ok(());
                        }
                        Ok(n) => {
                            debug!("serial:{} read {} bytes", self.device, n);
                            for byte in read_buf.split() {
                                if let Some(mut packet) = parser.parse_byte(byte) {
                                    self.metrics.record_received();
                                    packet.set_connection(&self.connection);
                                    let packet = Arc::new(packet);
                                    debug!("serial:{} received {}", self.device, packet);
                                    self.connection.add_address(packet.source());
                                    self.pool.send(&packet);
                                }
                            }
                        }
                        Err(error) => return Err(error.into()),
                    }
                }

                packet = self.connection.next_packet(None) => {
                    match packet {
                        Some(packet) => {
                            port.write_all(packet.data()).await?;
                            debug!("serial:{} wrote {}", self.device, packet);
                        }
                        // Queue closed: the router is shutting down.
                        None => return Ok(()),
                    }
                }

                _ = preload_refresh.tick() => {
                    for &address in &self.preload {
                        self.connection.add_address(address);
                    }
                }
            }
        }
    }
}
