//! Engine Module
//!
//! The store itself: keyspace, TTL table, expiry scheduler and snapshot
//! task wired together behind one lock.
//!
//! ## Responsibilities
//! - Execute commands against the keyspace
//! - Hand countdowns to the expiry scheduler
//! - Restore from the snapshot file on open
//! - Write snapshots periodically and on close

mod state;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, SkipKvError};
use crate::protocol::{Command, CommandError, Reply};
use crate::snapshot::{self, SnapshotImage, SnapshotSource, SnapshotTask};
use crate::sortedset::Score;
use crate::config::SnapshotFormat;
use crate::ttl::{ExpireTarget, Expiry, ExpiryScheduler, ScheduledExpiry, TtlStatus};

use state::{ExpireOutcome, StoreState};

/// State shared with the background threads
struct Shared {
    state: RwLock<StoreState>,

    /// Held while a snapshot file is being written
    snapshot_lock: Mutex<()>,
}

impl ExpireTarget for Shared {
    fn expire(&self, key: &str, generation: u64) -> bool {
        self.state.write().expire_due(key, generation, Instant::now())
    }
}

impl SnapshotSource for Shared {
    fn capture(&self) -> SnapshotImage {
        self.state.read().image(Instant::now())
    }

    fn write_to(&self, path: &Path, format: SnapshotFormat) -> Result<usize> {
        let _guard = self.snapshot_lock.lock();
        let image = self.capture();
        snapshot::write(path, format, &image)?;
        Ok(image.key_count())
    }
}

/// The main store
///
/// ## Concurrency Model: Readers-Writer
///
/// - **Reads** (GET/TTL/ZRANGE/ZRANK): shared lock, any number at once.
///   Keys past their deadline read as absent even before they are reaped.
/// - **Writes** (SET/DEL/EXPIRE/ZADD) and expiry deletions: exclusive lock.
/// - **Snapshots**: capture an owned image under the shared lock, then
///   encode and write holding only the snapshot lock, so the periodic task
///   and `snapshot()` never write the temp file at the same time.
///
/// Countdowns are registered or cancelled with the scheduler after the write
/// lock is released; the scheduler re-checks the generation under the write
/// lock before deleting.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Snapshot file, derived from data_dir and format
    snapshot_path: PathBuf,

    /// Keyspace and TTL table
    shared: Arc<Shared>,

    /// Background expiry thread
    expiry: ExpiryScheduler,

    /// Background snapshot thread (absent when the interval is zero)
    snapshots: Mutex<Option<SnapshotTask>>,

    /// Set once by close()
    closed: AtomicBool,
}

impl Engine {
    /// Open an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Replay the snapshot file, if any, as SET/ZADD without expiry
    /// 3. Start the expiry scheduler and snapshot task
    pub fn open(config: Config) -> Result<Self> {
        if config.read_workers == 0 {
            return Err(SkipKvError::Config("read_workers must be at least 1".into()));
        }

        fs::create_dir_all(&config.data_dir)?;
        let snapshot_path = config.snapshot_path();

        let shared = Arc::new(Shared {
            state: RwLock::new(StoreState::new()),
            snapshot_lock: Mutex::new(()),
        });

        if config.restore_on_open {
            match snapshot::read(&snapshot_path, config.snapshot_format)? {
                Some(image) => {
                    let keys = image.key_count();
                    shared.state.write().restore(image, Instant::now());
                    info!(path = %snapshot_path.display(), keys, "Restored snapshot");
                }
                None => {
                    info!(path = %snapshot_path.display(), "No snapshot found, starting empty");
                }
            }
        }

        let expiry = ExpiryScheduler::start(Arc::clone(&shared))?;

        let snapshots = if config.snapshot_interval.is_zero() {
            None
        } else {
            Some(SnapshotTask::start(
                Arc::clone(&shared),
                snapshot_path.clone(),
                config.snapshot_format,
                config.snapshot_interval,
            )?)
        };

        Ok(Self {
            config,
            snapshot_path,
            shared,
            expiry,
            snapshots: Mutex::new(snapshots),
            closed: AtomicBool::new(false),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Execute a command and produce its reply
    ///
    /// WRONGTYPE is a reply, not an error. Errors are reserved for an engine
    /// that has been closed.
    pub fn execute(&self, command: Command) -> Result<Reply> {
        let result = match command {
            Command::Set { key, value, expiry } => self.set(&key, &value, expiry).map(|_| Reply::Ok),
            Command::Get { key } => self.get(&key).map(|v| v.map_or(Reply::Nil, Reply::Bulk)),
            Command::Del { keys } => self
                .del(keys.as_slice())
                .map(|removed| Reply::Integer(i64::from(removed > 0))),
            Command::Ttl { key } => self.ttl(&key).map(|status| Reply::Integer(status.as_i64())),
            Command::Expire { key, seconds } => self
                .expire(&key, seconds)
                .map(|found| if found { Reply::Ok } else { Reply::Nil }),
            Command::ZAdd { key, entries } => self.zadd(&key, &entries).map(|_| Reply::Ok),
            Command::ZRange {
                key,
                start,
                stop,
                with_scores,
            } => self.zrange(&key, start, stop).map(|members| match members {
                None => Reply::Nil,
                Some(members) => Reply::Array(flatten(members, with_scores)),
            }),
            Command::ZRank { key, member } => self
                .zrank(&key, &member)
                .map(|rank| rank.map_or(Reply::Nil, |r| Reply::Integer(r as i64))),
        };

        match result {
            Err(SkipKvError::WrongKind) => Ok(Reply::Error(CommandError::WrongType)),
            other => other,
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Store a string, replacing any previous value and countdown
    pub fn set(&self, key: &str, value: &str, expiry: Option<Expiry>) -> Result<()> {
        self.ensure_open()?;
        let (scheduled, cancelled) = {
            let mut state = self.shared.state.write();
            let scheduled = state.set(key, value, expiry, Instant::now());
            (scheduled, state.take_cancelled())
        };
        self.hand_off(cancelled, scheduled);
        Ok(())
    }

    /// Delete keys of any kind; returns how many live keys were removed
    pub fn del<S: AsRef<str>>(&self, keys: &[S]) -> Result<usize> {
        self.ensure_open()?;
        let now = Instant::now();
        let (removed, cancelled) = {
            let mut state = self.shared.state.write();
            let mut removed = 0;
            for key in keys {
                if state.delete(key.as_ref(), now) {
                    removed += 1;
                }
            }
            (removed, state.take_cancelled())
        };
        self.hand_off(cancelled, None);
        Ok(removed)
    }

    /// Start a countdown in seconds, or move a running one
    ///
    /// A running countdown keeps its tick unit, so after `SET k v PX ..` the
    /// new value counts milliseconds. Returns `false` if the key does not
    /// exist. A non-positive timeout deletes the key immediately.
    pub fn expire(&self, key: &str, ticks: i64) -> Result<bool> {
        self.ensure_open()?;
        let (outcome, cancelled) = {
            let mut state = self.shared.state.write();
            let outcome = state.expire(key, ticks, Instant::now());
            (outcome, state.take_cancelled())
        };
        match outcome {
            ExpireOutcome::Missing => {
                self.hand_off(cancelled, None);
                Ok(false)
            }
            ExpireOutcome::Deleted => {
                self.hand_off(cancelled, None);
                Ok(true)
            }
            ExpireOutcome::Scheduled(entry) => {
                self.hand_off(cancelled, Some(entry));
                Ok(true)
            }
        }
    }

    /// Add or update sorted set members; returns how many were new
    ///
    /// A string under `key` is replaced by a new sorted set. Any countdown
    /// on the key is cleared.
    pub fn zadd(&self, key: &str, entries: &[(Score, String)]) -> Result<usize> {
        self.ensure_open()?;
        let (added, cancelled) = {
            let mut state = self.shared.state.write();
            let added = state.zadd(key, entries, Instant::now());
            (added, state.take_cancelled())
        };
        self.hand_off(cancelled, None);
        Ok(added)
    }

    /// Pass countdown changes made under the write lock to the scheduler
    fn hand_off(&self, cancelled: Vec<(String, u64)>, scheduled: Option<ScheduledExpiry>) {
        for (key, generation) in cancelled {
            self.expiry.cancel(&key, generation);
        }
        if let Some(entry) = scheduled {
            self.expiry.schedule(entry);
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a string; `Err(WrongKind)` if the key holds a sorted set
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.ensure_open()?;
        self.shared.state.read().get(key, Instant::now())
    }

    /// Remaining time to live
    pub fn ttl(&self, key: &str) -> Result<TtlStatus> {
        self.ensure_open()?;
        Ok(self.shared.state.read().ttl(key, Instant::now()))
    }

    /// Members and scores in a 1-based rank window
    pub fn zrange(&self, key: &str, start: i64, stop: i64) -> Result<Option<Vec<(String, Score)>>> {
        self.ensure_open()?;
        self.shared.state.read().zrange(key, start, stop, Instant::now())
    }

    /// 1-based rank of `member`, `Some(0)` if it is not a member
    pub fn zrank(&self, key: &str, member: &str) -> Result<Option<usize>> {
        self.ensure_open()?;
        self.shared.state.read().zrank(key, member, Instant::now())
    }

    // =========================================================================
    // Persistence and lifecycle
    // =========================================================================

    /// Write a snapshot now
    pub fn snapshot(&self) -> Result<()> {
        let keys = self
            .shared
            .write_to(&self.snapshot_path, self.config.snapshot_format)?;
        debug!(keys, "Snapshot written");
        Ok(())
    }

    /// Close the engine gracefully
    ///
    /// Stops the background threads and writes a final snapshot. Calling it
    /// again does nothing.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Some(task) = self.snapshots.lock().take() {
            task.stop();
        }
        self.expiry.shutdown();

        self.snapshot()?;
        info!(path = %self.snapshot_path.display(), "Engine closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(SkipKvError::Shutdown);
        }
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the snapshot file path
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Number of live keys
    pub fn key_count(&self) -> usize {
        self.shared.state.read().key_count(Instant::now())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Entries held by the expiry scheduler, including superseded ones
    pub fn pending_expiries(&self) -> usize {
        self.expiry.pending()
    }
}

/// ZRANGE reply body: members, or member/score pairs
fn flatten(members: Vec<(String, Score)>, with_scores: bool) -> Vec<String> {
    if !with_scores {
        return members.into_iter().map(|(member, _)| member).collect();
    }
    members
        .into_iter()
        .flat_map(|(member, score)| [member, score.to_string()])
        .collect()
}
