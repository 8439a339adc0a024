use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{info, warn};

/// Global counters for the router, shared by every interface.
#[derive(Debug, Clone)]
pub struct Metrics {
    /// Frames parsed off an ingress transport
    frames_received: Arc<AtomicU64>,
    /// Frame copies admitted onto a peer queue
    frames_delivered: Arc<AtomicU64>,
    /// Frames a peer's filter turned away entirely
    frames_filtered: Arc<AtomicU64>,
    /// Frames lost to a closed queue or a filter evaluation error
    frames_dropped: Arc<AtomicU64>,
    /// Bytes admitted onto peer queues
    bytes_delivered: Arc<AtomicU64>,
    start_time: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            frames_received: Arc::new(AtomicU64::new(0)),
            frames_delivered: Arc::new(AtomicU64::new(0)),
            frames_filtered: Arc::new(AtomicU64::new(0)),
            frames_dropped: Arc::new(AtomicU64::new(0)),
            bytes_delivered: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn record_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivered(&self, bytes: usize) {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
        self.bytes_delivered.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_filtered(&self) {
        self.frames_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_filtered: self.frames_filtered.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            bytes_delivered: self.bytes_delivered.load(Ordering::Relaxed),
            uptime: self.start_time.elapsed(),
        }
    }

    /// Starts a background task that logs totals and rates periodically.
    pub fn start_stats_logger(self, interval_secs: u64) {
        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(interval_secs));
            let mut last = self.snapshot();

            loop {
                interval.tick().await;
                let current = self.snapshot();
                let delivered = current.frames_delivered - last.frames_delivered;
                let bytes = current.bytes_delivered - last.bytes_delivered;
                let dropped = current.frames_dropped - last.frames_dropped;

                info!(
                    "stats: up {}h{}m{}s, {} received, {} delivered, {} filtered, {} dropped",
                    current.uptime.as_secs() / 3600,
                    (current.uptime.as_secs() % 3600) / 60,
                    current.uptime.as_secs() % 60,
                    current.frames_received,
                    current.frames_delivered,
                    current.frames_filtered,
                    current.frames_dropped,
                );
                info!(
                    "stats: {:.1} frames/s, {:.1} KB/s over the last {}s",
                    delivered as f64 / interval_secs as f64,
                    bytes as f64 / 1024.0 / interval_secs as f64,
                    interval_secs,
                );

                if dropped > 0 {
                    warn!("stats: {} frames dropped in the last {}s", dropped, interval_secs);
                }

                last = current;
            }
        });
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub frames_delivered: u64,
    pub frames_filtered: u64,
    pub frames_dropped: u64,
    pub bytes_delivered: u64,
    pub uptime: Duration,
}
