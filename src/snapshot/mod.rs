//! Snapshot Module
//!
//! Periodic whole-store snapshots for crash recovery.
//!
//! ## Responsibilities
//! - Capture a point-in-time image of every string and sorted set
//! - Encode it as text (legacy) or binary (checksummed)
//! - Replace the snapshot file atomically (temp file + rename)
//! - Decode it at startup so the engine can replay it
//!
//! TTLs are not part of a snapshot; restored keys never expire.
//!
//! ## Binary Format
//! ```text
//! ┌──────────┬─────────────┬─────────┬─────────┬──────────────────┐
//! │Magic (4) │ Version (2) │ Len (4) │ CRC (4) │ bincode payload  │
//! └──────────┴─────────────┴─────────┴─────────┴──────────────────┘
//! ```

mod binary;
mod task;
mod text;

pub use binary::{MAGIC, VERSION, HEADER_SIZE};
pub use task::{SnapshotSource, SnapshotTask};

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::SnapshotFormat;
use crate::error::Result;
use crate::sortedset::Score;

/// Owned image of the keyspace, sorted by key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotImage {
    /// `(key, value)` for every string key
    pub strings: Vec<(String, String)>,

    /// `(key, [(score, member)])` for every sorted set, members ascending
    pub sorted_sets: Vec<(String, Vec<(Score, String)>)>,
}

impl SnapshotImage {
    /// Total number of keys in the image
    pub fn key_count(&self) -> usize {
        self.strings.len() + self.sorted_sets.len()
    }
}

/// Encode an image in the given format
pub fn encode(image: &SnapshotImage, format: SnapshotFormat) -> Result<Vec<u8>> {
    match format {
        SnapshotFormat::Text => Ok(text::encode(image).into_bytes()),
        SnapshotFormat::Binary => binary::encode(image),
    }
}

/// Decode an image in the given format
pub fn decode(bytes: &[u8], format: SnapshotFormat) -> Result<SnapshotImage> {
    match format {
        SnapshotFormat::Text => text::decode(bytes),
        SnapshotFormat::Binary => binary::decode(bytes),
    }
}

/// Write `image` to `path`, replacing any previous snapshot atomically
pub fn write(path: &Path, format: SnapshotFormat, image: &SnapshotImage) -> Result<()> {
    let bytes = encode(image, format)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;

    tracing::debug!(
        path = %path.display(),
        keys = image.key_count(),
        bytes = bytes.len(),
        "Snapshot written"
    );
    Ok(())
}

/// Read the snapshot at `path`; `Ok(None)` if there is no file
pub fn read(path: &Path, format: SnapshotFormat) -> Result<Option<SnapshotImage>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    decode(&bytes, format).map(Some)
}
