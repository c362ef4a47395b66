//! # SkipKV
//!
//! An in-memory key-value store with:
//! - String values and skip-list sorted sets, one kind per key
//! - Per-key expiry driven by a single scheduler thread
//! - Readers-writer concurrency over one lock
//! - Periodic snapshots in a text or checksummed binary format
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Command Router                             │
//! │          (Reader Pool / Single Writer)                       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Engine                                  │
//! │               RwLock<StoreState>                             │
//! └──────┬───────────────────────┬──────────────────────┬───────┘
//!        │                       │                      │
//!        ▼                       ▼                      ▼
//!   ┌──────────┐          ┌─────────────┐        ┌─────────────┐
//!   │ KeySpace │          │  TtlTable   │        │  Snapshot   │
//!   │ (String/ │          │ + Scheduler │        │   (Task)    │
//!   │ SortedSet)│         └─────────────┘        └─────────────┘
//!   └──────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod sortedset;
pub mod ttl;
pub mod keyspace;
pub mod snapshot;
pub mod protocol;
pub mod engine;
pub mod router;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{SkipKvError, Result};
pub use config::{Config, SnapshotFormat};
pub use engine::Engine;
pub use router::Router;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of SkipKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
