//! KeySpace Module
//!
//! The authoritative map from key to typed value.
//!
//! ## Responsibilities
//! - Exactly one kind per key (String or SortedSet)
//! - Destructive type migration on write
//! - Distinguish "absent" from "wrong kind" on read
//!
//! Existence is map membership; there is no separate existence index.

mod table;

pub use table::KeySpace;

use crate::sortedset::SortedSet;

/// Value stored under a key
#[derive(Debug)]
pub enum Value {
    /// A scalar string
    Str(String),

    /// A score-ordered set
    SortedSet(SortedSet),
}
