//! Sorted Set Module
//!
//! Rank-indexed skip list backing the ZADD/ZRANGE/ZRANK family.
//!
//! ## Responsibilities
//! - Keep members ordered by `(score, member)`
//! - Answer rank queries in O(log n) via per-link spans
//! - O(1) membership and score lookups through a direct index
//!
//! ## Layout
//! ```text
//! Level 2:  HEAD ───────────(3)──────────► c ──(1)──► NIL
//! Level 1:  HEAD ──(1)──► a ──(2)────────► c ──(1)──► NIL
//! Level 0:  HEAD ──(1)──► a ──(1)──► b ──(1)──► c ──► NIL
//!                        ◄──────── ◄──────── (backward)
//! ```
//! Each forward link carries the number of level-0 hops it covers (its span).
//! Summing spans along a search path gives the 1-based rank of the node reached.
//!
//! Nodes live in an arena; links are indices into it rather than pointers.

mod node;
mod skiplist;

pub use skiplist::SortedSet;

/// Score type for sorted set members
pub type Score = i64;

/// Maximum number of levels a node may participate in
pub const MAX_LEVEL: usize = 32;

/// Probability that a node is promoted to the next level
pub const LEVEL_PROBABILITY: f64 = 0.25;

/// An owned member taken out of (or copied from) a sorted set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element<V = ()> {
    pub member: String,
    pub score: Score,
    pub value: V,
}

/// A borrowed view of a member still held by a sorted set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementRef<'a, V = ()> {
    pub member: &'a str,
    pub score: Score,
    pub value: &'a V,
}

impl<'a, V: Clone> ElementRef<'a, V> {
    /// Copy the view into an owned element
    pub fn to_element(&self) -> Element<V> {
        Element {
            member: self.member.to_string(),
            score: self.score,
            value: self.value.clone(),
        }
    }
}

/// Options for [`SortedSet::get_by_score_range`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreRangeOptions {
    /// Maximum number of members to return (`None` = unbounded)
    pub limit: Option<usize>,

    /// Exclude members whose score equals the start bound
    pub exclude_start: bool,

    /// Exclude members whose score equals the end bound
    pub exclude_end: bool,
}
