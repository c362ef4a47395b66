//! Store state
//!
//! Keyspace and TTL table, mutated together. Lives behind the engine's
//! RwLock; nothing in here locks.
//!
//! A key whose deadline has passed but which the scheduler has not reaped
//! yet is treated as absent by every operation.

use std::time::Instant;

use crate::error::Result;
use crate::keyspace::{KeySpace, Value};
use crate::snapshot::SnapshotImage;
use crate::sortedset::Score;
use crate::ttl::{Expiry, ScheduledExpiry, TickUnit, TtlRecord, TtlStatus, TtlTable};

/// Result of an EXPIRE against the state
#[derive(Debug)]
pub(crate) enum ExpireOutcome {
    /// The key does not exist
    Missing,

    /// A non-positive timeout deleted the key on the spot
    Deleted,

    /// A countdown was started or moved
    Scheduled(ScheduledExpiry),
}

#[derive(Debug, Default)]
pub(crate) struct StoreState {
    keyspace: KeySpace,
    ttl: TtlTable,
}

impl StoreState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Present and not past its deadline
    fn is_live(&self, key: &str, now: Instant) -> bool {
        self.keyspace.contains(key) && !self.ttl.is_expired(key, now)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    pub fn set(
        &mut self,
        key: &str,
        value: &str,
        expiry: Option<Expiry>,
        now: Instant,
    ) -> Option<ScheduledExpiry> {
        self.delete(key, now);
        self.keyspace.set_string(key, value);
        match expiry {
            None => {
                self.ttl.persist(key);
                None
            }
            Some(expiry) => Some(self.ttl.start(key, expiry, now)),
        }
    }

    /// Delete `key` under any kind. Returns `true` if a live key was removed.
    pub fn delete(&mut self, key: &str, now: Instant) -> bool {
        let live = self.is_live(key, now);
        self.ttl.remove(key);
        self.keyspace.remove(key);
        live
    }

    /// Start a countdown, or move a running one keeping its tick unit
    pub fn expire(&mut self, key: &str, ticks: i64, now: Instant) -> ExpireOutcome {
        if !self.is_live(key, now) {
            // Purge a key that expired but was not reaped yet
            self.delete(key, now);
            return ExpireOutcome::Missing;
        }
        if ticks <= 0 {
            self.delete(key, now);
            return ExpireOutcome::Deleted;
        }
        let unit = match self.ttl.get(key) {
            Some(TtlRecord::Expiring { unit, .. }) => unit,
            _ => TickUnit::Seconds,
        };
        let expiry = Expiry {
            ticks: ticks as u64,
            unit,
        };
        ExpireOutcome::Scheduled(self.ttl.start(key, expiry, now))
    }

    /// Add or update members; returns how many were new. Clears any TTL.
    pub fn zadd(&mut self, key: &str, entries: &[(Score, String)], now: Instant) -> usize {
        if !self.is_live(key, now) {
            self.delete(key, now);
        }

        let set = self.keyspace.sorted_set_mut(key);
        let mut added = 0;
        for (score, member) in entries {
            if set.add_or_update(member, *score, ()) {
                added += 1;
            }
        }

        self.ttl.persist(key);
        added
    }

    /// Delete `key` if countdown `generation` is live and due
    pub fn expire_due(&mut self, key: &str, generation: u64, now: Instant) -> bool {
        if !self.ttl.is_due(key, generation, now) {
            return false;
        }
        self.ttl.reap(key);
        self.keyspace.remove(key);
        true
    }

    /// Countdowns ended by writes since the last call
    pub fn take_cancelled(&mut self) -> Vec<(String, u64)> {
        self.ttl.take_cancelled()
    }

    /// Replay a snapshot image as SET/ZADD without expiry
    pub fn restore(&mut self, image: SnapshotImage, now: Instant) {
        for (key, value) in image.strings {
            self.set(&key, &value, None, now);
        }
        for (key, members) in image.sorted_sets {
            if !members.is_empty() {
                self.zadd(&key, &members, now);
            }
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get(&self, key: &str, now: Instant) -> Result<Option<String>> {
        if !self.is_live(key, now) {
            return Ok(None);
        }
        Ok(self.keyspace.get_string(key)?.map(str::to_string))
    }

    pub fn ttl(&self, key: &str, now: Instant) -> TtlStatus {
        if !self.keyspace.contains(key) {
            return TtlStatus::Missing;
        }
        self.ttl.status(key, now)
    }

    /// Members (and scores) in a rank window; `None` if the key is absent
    pub fn zrange(
        &self,
        key: &str,
        start: i64,
        stop: i64,
        now: Instant,
    ) -> Result<Option<Vec<(String, Score)>>> {
        if !self.is_live(key, now) {
            return Ok(None);
        }
        let Some(set) = self.keyspace.get_sorted_set(key)? else {
            return Ok(None);
        };
        Ok(Some(
            set.range_by_rank(start, stop)
                .into_iter()
                .map(|e| (e.member.to_string(), e.score))
                .collect(),
        ))
    }

    /// 1-based rank of `member` (`0` if not a member); `None` if the key is absent
    pub fn zrank(&self, key: &str, member: &str, now: Instant) -> Result<Option<usize>> {
        if !self.is_live(key, now) {
            return Ok(None);
        }
        Ok(self
            .keyspace
            .get_sorted_set(key)?
            .map(|set| set.find_rank(member)))
    }

    /// Number of live keys
    pub fn key_count(&self, now: Instant) -> usize {
        self.keyspace
            .iter()
            .filter(|(key, _)| !self.ttl.is_expired(key, now))
            .count()
    }

    /// Owned image of every live key, sorted by key
    pub fn image(&self, now: Instant) -> SnapshotImage {
        let mut image = SnapshotImage::default();
        for (key, value) in self.keyspace.iter() {
            if self.ttl.is_expired(key, now) {
                continue;
            }
            match value {
                Value::Str(s) => image.strings.push((key.to_string(), s.clone())),
                Value::SortedSet(set) => image.sorted_sets.push((
                    key.to_string(),
                    set.iter().map(|e| (e.score, e.member.to_string())).collect(),
                )),
            }
        }
        image.strings.sort();
        image.sorted_sets.sort_by(|a, b| a.0.cmp(&b.0));
        image
    }
}
