use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::mavlink::Packet;

/// A queue entry: the packet plus its admission priority and a ticket
/// number recording arrival order.
#[derive(Debug, Clone)]
struct QueuedPacket {
    packet: Arc<Packet>,
    priority: i32,
    ticket: u64,
}

impl PartialEq for QueuedPacket {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.ticket == other.ticket
    }
}

impl Eq for QueuedPacket {}

impl Ord for QueuedPacket {
    /// Heap order: higher priority first, then first-come-first-served.
    /// Tickets compare modularly, so a wrapped counter still orders a live
    /// queue correctly.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority).then_with(|| {
            if self.ticket == other.ticket {
                Ordering::Equal
            } else if (other.ticket.wrapping_sub(self.ticket) as i64) < 0 {
                // `other` was issued before us; it pops first.
                Ordering::Less
            } else {
                Ordering::Greater
            }
        })
    }
}

impl PartialOrd for QueuedPacket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

type PushCallback = Box<dyn Fn() + Send + Sync>;

/// Priority packet queue feeding one connection's egress.
///
/// `pop` returns the highest-priority packet, FIFO among equals. Waiters
/// suspend on an internal semaphore whose permit count mirrors the number
/// of queued packets; `close` wakes every waiter and makes all further
/// pops return `None` (pushes after close are dropped silently).
pub struct PacketQueue {
    inner: Mutex<Inner>,
    available: Semaphore,
    callback: Option<PushCallback>,
}

#[derive(Debug)]
struct Inner {
    heap: BinaryHeap<QueuedPacket>,
    next_ticket: u64,
}

impl PacketQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                next_ticket: 0,
            }),
            available: Semaphore::new(0),
            callback: None,
        }
    }

    /// A queue that invokes `callback` after every successful push; the
    /// connection factory uses this to wake its multiplexed waiter.
    pub fn with_callback(callback: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            callback: Some(Box::new(callback)),
            ..Self::new()
        }
    }

    /// Enqueues a packet, returning false once the queue is closed (the
    /// packet is then dropped silently).
    pub fn push(&self, packet: Arc<Packet>, priority: i32) -> bool {
        if self.available.is_closed() {
            return false;
        }
        {
            let mut inner = self.inner.lock().expect("packet queue poisoned");
            let ticket = inner.next_ticket;
            inner.next_ticket = ticket.wrapping_add(1);
            inner.heap.push(QueuedPacket {
                packet,
                priority,
                ticket,
            });
        }
        self.available.add_permits(1);
        if let Some(callback) = &self.callback {
            callback();
        }
        true
    }

    /// Removes the next packet without waiting.
    pub fn try_pop(&self) -> Option<Arc<Packet>> {
        match self.available.try_acquire() {
            Ok(permit) => {
                permit.forget();
                self.take()
            }
            Err(_) => None,
        }
    }

    /// Waits for the next packet.
    ///
    /// `None` timeout waits indefinitely; a zero timeout degenerates to
    /// [`try_pop`](Self::try_pop). Returns `None` on timeout or once the
    /// queue is closed.
    pub async fn pop(&self, timeout: Option<Duration>) -> Option<Arc<Packet>> {
        match timeout {
            Some(timeout) if timeout.is_zero() => self.try_pop(),
            Some(timeout) => match tokio::time::timeout(timeout, self.available.acquire()).await {
                Ok(Ok(permit)) => {
                    permit.forget();
                    self.take()
                }
                Ok(Err(_)) | Err(_) => None,
            },
            None => match self.available.acquire().await {
                Ok(permit) => {
                    permit.forget();
                    self.take()
                }
                Err(_closed) => None,
            },
        }
    }

    /// Closes the queue: current and future pops return `None`.
    pub fn close(&self) {
        self.available.close();
    }

    pub fn is_closed(&self) -> bool {
        self.available.is_closed()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().expect("packet queue poisoned").heap.is_empty()
    }

    fn take(&self) -> Option<Arc<Packet>> {
        let mut inner = self.inner.lock().expect("packet queue poisoned");
        inner.heap.pop().map(|queued| queued.packet)
    }
}

impl Default for PacketQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PacketQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketQueue")
            .field("inner", &self.inner)
            .field("closed", &self.available.is_closed())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}
