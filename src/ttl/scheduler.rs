//! Expiry Scheduler
//!
//! One background thread owns a min-heap of pending deadlines. It sleeps on
//! its request channel until either a new countdown arrives or the earliest
//! deadline is reached, then asks the [`ExpireTarget`] to delete due keys.
//!
//! The thread also tracks the live generation of every key. A newer countdown
//! supersedes an older one, and a cancellation retires it. Once superseded
//! entries outnumber live ones the heap is rebuilt without them.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::error::Result;

/// Whatever owns the keys being expired
pub trait ExpireTarget: Send + Sync + 'static {
    /// Delete `key` if countdown `generation` is still its live countdown and
    /// its deadline has passed. Returns `true` if the key was deleted.
    fn expire(&self, key: &str, generation: u64) -> bool;
}

/// A countdown handed to the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledExpiry {
    pub key: String,
    pub deadline: Instant,
    pub generation: u64,
}

impl Ord for ScheduledExpiry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.generation.cmp(&other.generation))
    }
}

impl PartialOrd for ScheduledExpiry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Stale entries tolerated in the heap before it is rebuilt
const COMPACT_SLACK: usize = 64;

enum Request {
    Schedule(ScheduledExpiry),
    Cancel { key: String, generation: u64 },
    Shutdown,
}

/// Handle to the background expiry thread
pub struct ExpiryScheduler {
    sender: Sender<Request>,
    handle: Mutex<Option<JoinHandle<()>>>,

    /// Heap size after the last request the thread handled
    pending: Arc<AtomicUsize>,
}

impl ExpiryScheduler {
    /// Spawn the scheduler thread
    pub fn start<T: ExpireTarget>(target: Arc<T>) -> Result<Self> {
        let (sender, receiver) = channel::unbounded();
        let pending = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&pending);
        let handle = thread::Builder::new()
            .name("skipkv-expiry".to_string())
            .spawn(move || run(receiver, target, counter))?;

        Ok(Self {
            sender,
            handle: Mutex::new(Some(handle)),
            pending,
        })
    }

    /// Register a countdown. Stale registrations are harmless.
    pub fn schedule(&self, entry: ScheduledExpiry) {
        if self.sender.send(Request::Schedule(entry)).is_err() {
            tracing::debug!("Expiry scheduler stopped; countdown not registered");
        }
    }

    /// Retire countdown `generation` of `key` if it is still the live one
    pub fn cancel(&self, key: &str, generation: u64) {
        let request = Request::Cancel {
            key: key.to_string(),
            generation,
        };
        if self.sender.send(request).is_err() {
            tracing::debug!("Expiry scheduler stopped; cancellation dropped");
        }
    }

    /// Entries currently held in the heap, stale ones included
    pub fn pending(&self) -> usize {
        self.pending.load(AtomicOrdering::SeqCst)
    }

    /// Stop the thread and wait for it to exit
    pub fn shutdown(&self) {
        let _ = self.sender.send(Request::Shutdown);
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                tracing::error!("Expiry scheduler thread panicked");
            }
        }
    }
}

impl Drop for ExpiryScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<T: ExpireTarget>(receiver: Receiver<Request>, target: Arc<T>, pending: Arc<AtomicUsize>) {
    tracing::debug!("Expiry scheduler started");

    let mut heap: BinaryHeap<Reverse<ScheduledExpiry>> = BinaryHeap::new();
    let mut live: HashMap<String, u64> = HashMap::new();

    loop {
        let request = match heap.peek() {
            Some(Reverse(next)) => {
                let wait = next.deadline.saturating_duration_since(Instant::now());
                receiver.recv_timeout(wait)
            }
            None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match request {
            Ok(Request::Schedule(entry)) => {
                live.insert(entry.key.clone(), entry.generation);
                heap.push(Reverse(entry));
            }
            Ok(Request::Cancel { key, generation }) => {
                if live.get(&key) == Some(&generation) {
                    live.remove(&key);
                }
            }
            Ok(Request::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if heap.len() > 2 * live.len() + COMPACT_SLACK {
            let before = heap.len();
            heap.retain(|Reverse(e)| live.get(&e.key) == Some(&e.generation));
            tracing::debug!(before, after = heap.len(), "Expiry heap compacted");
        }

        let now = Instant::now();
        while let Some(Reverse(next)) = heap.peek() {
            if next.deadline > now {
                break;
            }
            let Some(Reverse(due)) = heap.pop() else {
                break;
            };
            if live.get(&due.key) == Some(&due.generation) {
                live.remove(&due.key);
            }
            if target.expire(&due.key, due.generation) {
                tracing::debug!(key = %due.key, "Key expired");
            }
        }

        pending.store(heap.len(), AtomicOrdering::SeqCst);
    }

    tracing::debug!(pending = heap.len(), "Expiry scheduler stopped");
}
