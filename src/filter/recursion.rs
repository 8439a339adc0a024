use std::collections::HashSet;
use std::sync::Mutex;
use std::thread::{self, ThreadId};

/// Per-chain bookkeeping for recursion detection.
///
/// The set holds the IDs of threads currently evaluating the owning chain.
/// Cloning yields a fresh empty set: the set describes a live activation,
/// not the chain's value, so it must never travel with a copy.
#[derive(Debug, Default)]
pub struct RecursionData {
    calling_threads: Mutex<HashSet<ThreadId>>,
}

impl Clone for RecursionData {
    fn clone(&self) -> Self {
        Self::default()
    }
}

/// Scoped marker for one thread's entry into a chain.
///
/// Entering marks the current thread in the chain's [`RecursionData`];
/// dropping the guard unmarks it, on success and error paths alike.
#[derive(Debug)]
pub struct RecursionGuard<'a> {
    data: &'a RecursionData,
}

impl<'a> RecursionGuard<'a> {
    /// Marks the current thread, or returns `None` if it is already inside
    /// the chain (re-entry from other threads is fine).
    pub fn enter(data: &'a RecursionData) -> Option<Self> {
        let mut calling_threads = data.calling_threads.lock().expect("recursion set poisoned");
        if calling_threads.insert(thread::current().id()) {
            Some(Self { data })
        } else {
            None
        }
    }
}

impl Drop for RecursionGuard<'_> {
    fn drop(&mut self) {
        let mut calling_threads = self
            .data
            .calling_threads
            .lock()
            .expect("recursion set poisoned");
        calling_threads.remove(&thread::current().id());
    }
}
