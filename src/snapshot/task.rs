//! Periodic snapshot task
//!
//! Background thread that captures and writes a snapshot every interval.
//! A failed write is logged and retried on the next tick.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::config::SnapshotFormat;
use crate::error::Result;

use super::SnapshotImage;

/// Anything that can produce a consistent image of the keyspace
pub trait SnapshotSource: Send + Sync + 'static {
    fn capture(&self) -> SnapshotImage;

    /// Capture and write a snapshot to `path`; returns the key count.
    /// Sources written from several threads override this to serialize.
    fn write_to(&self, path: &Path, format: SnapshotFormat) -> Result<usize> {
        let image = self.capture();
        super::write(path, format, &image)?;
        Ok(image.key_count())
    }
}

/// Handle to the background snapshot thread
pub struct SnapshotTask {
    stop: Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SnapshotTask {
    /// Spawn the snapshot thread
    pub fn start<S: SnapshotSource>(
        source: Arc<S>,
        path: PathBuf,
        format: SnapshotFormat,
        interval: Duration,
    ) -> Result<Self> {
        let (stop, stopped) = channel::bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("skipkv-snapshot".to_string())
            .spawn(move || {
                tracing::debug!(interval_ms = interval.as_millis() as u64, "Snapshot task started");
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if let Err(e) = source.write_to(&path, format) {
                                tracing::error!("Snapshot failed: {}", e);
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::debug!("Snapshot task stopped");
            })?;

        Ok(Self {
            stop,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(&self) {
        let _ = self.stop.try_send(());
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                tracing::error!("Snapshot thread panicked");
            }
        }
    }
}

impl Drop for SnapshotTask {
    fn drop(&mut self) {
        self.stop();
    }
}
