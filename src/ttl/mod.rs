//! TTL Module
//!
//! Per-key expiry records and the background scheduler that reaps them.
//!
//! ## State Machine
//! ```text
//!   (absent) ──write──► NoExpiry ──EXPIRE/EX/PX──► Expiring(deadline)
//!                          ▲                            │
//!                          └──────── plain write ───────┤
//!                                                       ▼
//!                                         deadline passes: key deleted,
//!                                         record removed
//! ```
//!
//! Every countdown carries a generation number. The scheduler only deletes a
//! key when the generation it was given still matches the record. Countdowns
//! replaced by a plain write or a delete are queued as cancellations so the
//! scheduler can drop them from its heap.

mod scheduler;

pub use scheduler::{ExpiryScheduler, ExpireTarget, ScheduledExpiry};

use std::collections::HashMap;
use std::mem;
use std::time::{Duration, Instant};

/// Longest countdown; larger requests are clamped to it
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Granularity of a countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickUnit {
    /// One tick per second (`EX`, or `EXPIRE` on a key with no countdown)
    Seconds,

    /// One tick per millisecond (`PX`)
    Milliseconds,
}

impl TickUnit {
    /// Length of one tick
    pub fn tick(self) -> Duration {
        match self {
            TickUnit::Seconds => Duration::from_secs(1),
            TickUnit::Milliseconds => Duration::from_millis(1),
        }
    }

    /// Duration of `ticks` ticks
    pub fn duration(self, ticks: u64) -> Duration {
        match self {
            TickUnit::Seconds => Duration::from_secs(ticks),
            TickUnit::Milliseconds => Duration::from_millis(ticks),
        }
    }
}

/// An expiry request: `ticks` ticks of `unit` from now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    pub ticks: u64,
    pub unit: TickUnit,
}

impl Expiry {
    pub fn seconds(ticks: u64) -> Self {
        Self { ticks, unit: TickUnit::Seconds }
    }

    pub fn millis(ticks: u64) -> Self {
        Self { ticks, unit: TickUnit::Milliseconds }
    }
}

/// TTL state of a present key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlRecord {
    /// The key never expires
    NoExpiry,

    /// The key is deleted once `deadline` passes
    Expiring {
        deadline: Instant,
        unit: TickUnit,
        generation: u64,
    },
}

/// TTL as reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    /// No record: the key does not exist (`-2`)
    Missing,

    /// The key exists without expiry (`-1`)
    Persistent,

    /// Ticks left before deletion, rounded up (always >= 1)
    Remaining(u64),
}

impl TtlStatus {
    /// Redis-style integer encoding
    pub fn as_i64(self) -> i64 {
        match self {
            TtlStatus::Missing => -2,
            TtlStatus::Persistent => -1,
            TtlStatus::Remaining(ticks) => ticks as i64,
        }
    }
}

/// Expiry records for every present key
#[derive(Debug, Default)]
pub struct TtlTable {
    records: HashMap<String, TtlRecord>,
    next_generation: u64,

    /// `(key, generation)` of countdowns ended by persist/remove
    cancelled: Vec<(String, u64)>,
}

impl TtlTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `key` never expires, cancelling any countdown
    pub fn persist(&mut self, key: &str) {
        let previous = self.records.insert(key.to_string(), TtlRecord::NoExpiry);
        self.note_cancelled(key, previous);
    }

    /// Start a countdown for `key`, or move the deadline of a running one
    pub fn start(&mut self, key: &str, expiry: Expiry, now: Instant) -> ScheduledExpiry {
        self.next_generation += 1;
        let generation = self.next_generation;
        let deadline = deadline_after(now, expiry.unit.duration(expiry.ticks));

        self.records.insert(
            key.to_string(),
            TtlRecord::Expiring {
                deadline,
                unit: expiry.unit,
                generation,
            },
        );

        ScheduledExpiry {
            key: key.to_string(),
            deadline,
            generation,
        }
    }

    /// Drop the record of a deleted key
    pub fn remove(&mut self, key: &str) -> Option<TtlRecord> {
        let previous = self.records.remove(key);
        self.note_cancelled(key, previous);
        previous
    }

    /// Drop the record of a key whose countdown just fired
    pub fn reap(&mut self, key: &str) -> Option<TtlRecord> {
        self.records.remove(key)
    }

    /// Countdowns cancelled since the last call
    pub fn take_cancelled(&mut self) -> Vec<(String, u64)> {
        mem::take(&mut self.cancelled)
    }

    fn note_cancelled(&mut self, key: &str, previous: Option<TtlRecord>) {
        if let Some(TtlRecord::Expiring { generation, .. }) = previous {
            self.cancelled.push((key.to_string(), generation));
        }
    }

    pub fn get(&self, key: &str) -> Option<TtlRecord> {
        self.records.get(key).copied()
    }

    /// True if `key` has a countdown whose deadline is at or before `now`
    pub fn is_expired(&self, key: &str, now: Instant) -> bool {
        matches!(
            self.records.get(key),
            Some(TtlRecord::Expiring { deadline, .. }) if *deadline <= now
        )
    }

    /// True if the countdown `generation` is still the live one for `key`
    /// and its deadline has passed
    pub fn is_due(&self, key: &str, generation: u64, now: Instant) -> bool {
        matches!(
            self.records.get(key),
            Some(TtlRecord::Expiring { deadline, generation: live, .. })
                if *live == generation && *deadline <= now
        )
    }

    /// TTL of `key` as seen at `now`
    pub fn status(&self, key: &str, now: Instant) -> TtlStatus {
        match self.records.get(key) {
            None => TtlStatus::Missing,
            Some(TtlRecord::NoExpiry) => TtlStatus::Persistent,
            Some(TtlRecord::Expiring { deadline, unit, .. }) => {
                if *deadline <= now {
                    return TtlStatus::Missing;
                }
                let left = deadline.duration_since(now).as_nanos();
                let tick = unit.tick().as_nanos();
                TtlStatus::Remaining(left.div_ceil(tick) as u64)
            }
        }
    }
}

/// `now + delay`, clamped to [`MAX_TTL`] and to what `Instant` can hold
fn deadline_after(now: Instant, delay: Duration) -> Instant {
    let mut delay = delay.min(MAX_TTL);
    loop {
        if let Some(deadline) = now.checked_add(delay) {
            return deadline;
        }
        delay /= 2;
    }
}
