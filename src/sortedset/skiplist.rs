//! Skip list implementation
//!
//! Redis-style skip list with spans, backed by an index arena.

use std::collections::HashMap;
use std::mem;

use rand::Rng;

use super::node::{Arena, Link, Node, NodeId};
use super::{Element, ElementRef, Score, ScoreRangeOptions, LEVEL_PROBABILITY, MAX_LEVEL};

/// Traversal position: `None` is the header, `Some` a live node.
type Cursor = Option<NodeId>;

/// Ordered, rank-indexed set of unique members with integer scores
///
/// Members are ordered by `(score ascending, member ascending)`. Every member
/// may carry a payload `V`; the keyspace uses `()`.
///
/// ## Complexity
/// - `len`, `peek_min`, `peek_max`, `get_by_key`, `score`: O(1)
/// - `add_or_update`, `remove`, `pop_*`, `find_rank`: O(log n) expected
/// - range queries: O(log n + k) for k returned members
#[derive(Debug)]
pub struct SortedSet<V = ()> {
    /// Header links, valid up to `level`
    head: [Link; MAX_LEVEL],

    /// Highest-ordered node
    tail: Option<NodeId>,

    /// Number of members
    length: usize,

    /// Number of levels currently in use (always >= 1)
    level: usize,

    /// Node storage
    nodes: Arena<V>,

    /// member → node, mirrors the ordered structure
    index: HashMap<String, NodeId>,
}

impl<V> SortedSet<V> {
    /// Create an empty sorted set
    pub fn new() -> Self {
        Self {
            head: [Link::default(); MAX_LEVEL],
            tail: None,
            length: 0,
            level: 1,
            nodes: Arena::new(),
            index: HashMap::new(),
        }
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of levels currently in use
    pub fn level(&self) -> usize {
        self.level
    }

    /// Lowest-ordered member
    pub fn peek_min(&self) -> Option<ElementRef<'_, V>> {
        self.head[0].forward.map(|id| self.element_ref(id))
    }

    /// Highest-ordered member
    pub fn peek_max(&self) -> Option<ElementRef<'_, V>> {
        self.tail.map(|id| self.element_ref(id))
    }

    /// Remove and return the lowest-ordered member
    pub fn pop_min(&mut self) -> Option<Element<V>> {
        let id = self.head[0].forward?;
        let member = self.nodes.get(id).member.clone();
        self.remove(&member)
    }

    /// Remove and return the highest-ordered member
    pub fn pop_max(&mut self) -> Option<Element<V>> {
        let id = self.tail?;
        let member = self.nodes.get(id).member.clone();
        self.remove(&member)
    }

    /// Insert `member` with `score`, or update it if already present.
    ///
    /// An unchanged score only replaces the payload; a changed score moves the
    /// member to its new position. Returns `true` if the member was new.
    pub fn add_or_update(&mut self, member: &str, score: Score, value: V) -> bool {
        match self.index.get(member).copied() {
            Some(id) => {
                let old_score = self.nodes.get(id).score;
                if old_score == score {
                    self.nodes.get_mut(id).value = value;
                } else {
                    self.delete(old_score, member);
                    let id = self.insert_node(score, member.to_string(), value);
                    self.index.insert(member.to_string(), id);
                }
                false
            }
            None => {
                let id = self.insert_node(score, member.to_string(), value);
                self.index.insert(member.to_string(), id);
                true
            }
        }
    }

    /// Remove `member`, returning it if it was present
    pub fn remove(&mut self, member: &str) -> Option<Element<V>> {
        let id = *self.index.get(member)?;
        let score = self.nodes.get(id).score;
        self.delete(score, member).map(into_element)
    }

    /// Look up a member without traversing the ordering
    pub fn get_by_key(&self, member: &str) -> Option<ElementRef<'_, V>> {
        self.index.get(member).map(|&id| self.element_ref(id))
    }

    /// Score of `member`, if present
    pub fn score(&self, member: &str) -> Option<Score> {
        self.index.get(member).map(|&id| self.nodes.get(id).score)
    }

    /// True if `member` is in the set
    pub fn contains(&self, member: &str) -> bool {
        self.index.contains_key(member)
    }

    /// 1-based rank of `member`, or `0` if it is not in the set
    pub fn find_rank(&self, member: &str) -> usize {
        let Some(&target) = self.index.get(member) else {
            return 0;
        };
        let score = self.nodes.get(target).score;

        let mut rank = 0;
        let mut x: Cursor = None;
        for i in (0..self.level).rev() {
            loop {
                let link = self.link(x, i);
                match link.forward {
                    Some(next) if self.nodes.get(next).precedes_or_eq(score, member) => {
                        rank += link.span;
                        x = Some(next);
                    }
                    _ => break,
                }
            }
            if x == Some(target) {
                return rank;
            }
        }
        0
    }

    /// Members whose score lies between `start` and `end`.
    ///
    /// When `start > end` the walk runs from high to low scores and the
    /// bounds (with their exclusion flags) are swapped.
    pub fn get_by_score_range(
        &self,
        start: Score,
        end: Score,
        options: &ScoreRangeOptions,
    ) -> Vec<ElementRef<'_, V>> {
        let mut limit = options.limit.unwrap_or(usize::MAX);
        let (mut start, mut end) = (start, end);
        let (mut exclude_start, mut exclude_end) = (options.exclude_start, options.exclude_end);

        let reverse = start > end;
        if reverse {
            mem::swap(&mut start, &mut end);
            mem::swap(&mut exclude_start, &mut exclude_end);
        }

        let mut nodes = Vec::new();
        if self.length == 0 {
            return nodes;
        }

        let below_start = |s: Score| if exclude_start { s <= start } else { s < start };
        let above_end = |s: Score| if exclude_end { s >= end } else { s > end };

        let mut x: Cursor = None;
        if reverse {
            // Last node still inside the end bound.
            for i in (0..self.level).rev() {
                while let Some(next) = self.link(x, i).forward {
                    if above_end(self.nodes.get(next).score) {
                        break;
                    }
                    x = Some(next);
                }
            }

            while let Some(id) = x {
                let node = self.nodes.get(id);
                if limit == 0 || below_start(node.score) {
                    break;
                }
                nodes.push(self.element_ref(id));
                limit -= 1;
                x = node.backward;
            }
        } else {
            // Last node still before the start bound.
            for i in (0..self.level).rev() {
                while let Some(next) = self.link(x, i).forward {
                    if !below_start(self.nodes.get(next).score) {
                        break;
                    }
                    x = Some(next);
                }
            }

            let mut current = self.link(x, 0).forward;
            while let Some(id) = current {
                let node = self.nodes.get(id);
                if limit == 0 || above_end(node.score) {
                    break;
                }
                nodes.push(self.element_ref(id));
                limit -= 1;
                current = node.levels[0].forward;
            }
        }

        nodes
    }

    /// Members whose 1-based rank lies in `[start, end]`, without removal.
    ///
    /// Negative ranks count from the end (`-1` is the last member); ranks
    /// that resolve to zero or below clamp to 1. If `start > end` the window
    /// is walked ascending and returned reversed.
    pub fn range_by_rank(&self, start: i64, end: i64) -> Vec<ElementRef<'_, V>> {
        let (start, end, reverse) = self.resolve_ranks(start, end);

        let mut traversed = 0;
        let mut x: Cursor = None;
        for i in (0..self.level).rev() {
            loop {
                let link = self.link(x, i);
                match link.forward {
                    Some(next) if traversed + link.span < start => {
                        traversed += link.span;
                        x = Some(next);
                    }
                    _ => break,
                }
            }
            if traversed + 1 == start {
                break;
            }
        }

        let mut nodes = Vec::new();
        traversed += 1;
        let mut current = self.link(x, 0).forward;
        while let Some(id) = current {
            if traversed > end {
                break;
            }
            nodes.push(self.element_ref(id));
            current = self.nodes.get(id).levels[0].forward;
            traversed += 1;
        }

        if reverse {
            nodes.reverse();
        }
        nodes
    }

    /// Iterate members in ascending order
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            set: self,
            next: self.head[0].forward,
            remaining: self.length,
        }
    }

    // =========================================================================
    // Internal
    // =========================================================================

    #[inline]
    fn link(&self, at: Cursor, level: usize) -> Link {
        match at {
            None => self.head[level],
            Some(id) => self.nodes.get(id).levels[level],
        }
    }

    #[inline]
    fn link_mut(&mut self, at: Cursor, level: usize) -> &mut Link {
        match at {
            None => &mut self.head[level],
            Some(id) => &mut self.nodes.get_mut(id).levels[level],
        }
    }

    fn element_ref(&self, id: NodeId) -> ElementRef<'_, V> {
        let node = self.nodes.get(id);
        ElementRef {
            member: &node.member,
            score: node.score,
            value: &node.value,
        }
    }

    fn random_level() -> usize {
        let mut rng = rand::rng();
        let mut level = 1;
        while level < MAX_LEVEL && rng.random_bool(LEVEL_PROBABILITY) {
            level += 1;
        }
        level
    }

    /// Resolve a rank window to `(start, end, reversed)`, all 1-based
    fn resolve_ranks(&self, start: i64, end: i64) -> (usize, usize, bool) {
        let len = self.length as i64;
        let resolve = |rank: i64| {
            let rank = if rank < 0 { len + rank + 1 } else { rank };
            rank.max(1) as usize
        };

        let (start, end) = (resolve(start), resolve(end));
        if start > end {
            (end, start, true)
        } else {
            (start, end, false)
        }
    }

    /// For each level, the last node ordered before `(score, member)`
    fn search_path(&self, score: Score, member: &str) -> [Cursor; MAX_LEVEL] {
        let mut update = [None; MAX_LEVEL];
        let mut x: Cursor = None;
        for i in (0..self.level).rev() {
            while let Some(next) = self.link(x, i).forward {
                if !self.nodes.get(next).precedes(score, member) {
                    break;
                }
                x = Some(next);
            }
            update[i] = x;
        }
        update
    }

    fn insert_node(&mut self, score: Score, member: String, value: V) -> NodeId {
        let mut update: [Cursor; MAX_LEVEL] = [None; MAX_LEVEL];
        let mut rank = [0usize; MAX_LEVEL];

        let mut x: Cursor = None;
        for i in (0..self.level).rev() {
            // Rank crossed to reach the insert position on this level
            rank[i] = if i == self.level - 1 { 0 } else { rank[i + 1] };
            loop {
                let link = self.link(x, i);
                match link.forward {
                    Some(next) if self.nodes.get(next).precedes(score, &member) => {
                        rank[i] += link.span;
                        x = Some(next);
                    }
                    _ => break,
                }
            }
            update[i] = x;
        }

        let level = Self::random_level();
        if level > self.level {
            for i in self.level..level {
                rank[i] = 0;
                update[i] = None;
                self.head[i].span = self.length;
            }
            self.level = level;
        }

        let id = self.nodes.alloc(Node::new(member, score, value, level));
        for i in 0..level {
            let prev = self.link(update[i], i);
            let covered = rank[0] - rank[i];
            self.nodes.get_mut(id).levels[i] = Link {
                forward: prev.forward,
                span: prev.span - covered,
            };
            *self.link_mut(update[i], i) = Link {
                forward: Some(id),
                span: covered + 1,
            };
        }

        // Levels above the new node now skip over one more node
        for i in level..self.level {
            self.link_mut(update[i], i).span += 1;
        }

        self.nodes.get_mut(id).backward = update[0];
        match self.nodes.get(id).levels[0].forward {
            Some(next) => self.nodes.get_mut(next).backward = Some(id),
            None => self.tail = Some(id),
        }

        self.length += 1;
        id
    }

    /// Unlink `id` given its predecessors on every level
    fn delete_node(&mut self, id: NodeId, update: &[Cursor; MAX_LEVEL]) -> Node<V> {
        for i in 0..self.level {
            let link = self.link(update[i], i);
            if link.forward == Some(id) {
                let removed = self.nodes.get(id).levels[i];
                *self.link_mut(update[i], i) = Link {
                    forward: removed.forward,
                    span: link.span + removed.span - 1,
                };
            } else {
                self.link_mut(update[i], i).span -= 1;
            }
        }

        let (forward, backward) = {
            let node = self.nodes.get(id);
            (node.levels[0].forward, node.backward)
        };
        match forward {
            Some(next) => self.nodes.get_mut(next).backward = backward,
            None => self.tail = backward,
        }

        while self.level > 1 && self.head[self.level - 1].forward.is_none() {
            self.level -= 1;
        }

        self.length -= 1;
        let node = self.nodes.release(id);
        self.index.remove(&node.member);
        node
    }

    /// Delete the node matching both `score` and `member`
    fn delete(&mut self, score: Score, member: &str) -> Option<Node<V>> {
        let update = self.search_path(score, member);
        let candidate = self.link(update[0], 0).forward?;
        let node = self.nodes.get(candidate);
        if node.score == score && node.member == member {
            Some(self.delete_node(candidate, &update))
        } else {
            None
        }
    }
}

impl<V: Clone> SortedSet<V> {
    /// Members whose 1-based rank lies in `[start, end]`, optionally removing
    /// them while they are collected. Rank resolution follows
    /// [`SortedSet::range_by_rank`].
    pub fn get_by_rank_range(&mut self, start: i64, end: i64, remove: bool) -> Vec<Element<V>> {
        if !remove {
            return self
                .range_by_rank(start, end)
                .iter()
                .map(ElementRef::to_element)
                .collect();
        }

        let (start, end, reverse) = self.resolve_ranks(start, end);

        let mut update = [None; MAX_LEVEL];
        let mut traversed = 0;
        let mut x: Cursor = None;
        for i in (0..self.level).rev() {
            loop {
                let link = self.link(x, i);
                match link.forward {
                    Some(next) if traversed + link.span < start => {
                        traversed += link.span;
                        x = Some(next);
                    }
                    _ => break,
                }
            }
            update[i] = x;
        }

        let mut nodes = Vec::new();
        traversed += 1;
        let mut current = self.link(x, 0).forward;
        while let Some(id) = current {
            if traversed > end {
                break;
            }
            current = self.nodes.get(id).levels[0].forward;
            nodes.push(into_element(self.delete_node(id, &update)));
            traversed += 1;
        }

        if reverse {
            nodes.reverse();
        }
        nodes
    }

    /// Member at 1-based `rank` (negative counts from the end)
    pub fn get_by_rank(&mut self, rank: i64, remove: bool) -> Option<Element<V>> {
        let mut nodes = self.get_by_rank_range(rank, rank, remove);
        if nodes.len() == 1 {
            nodes.pop()
        } else {
            None
        }
    }
}

impl<V> Default for SortedSet<V> {
    fn default() -> Self {
        Self::new()
    }
}

fn into_element<V>(node: Node<V>) -> Element<V> {
    Element {
        member: node.member,
        score: node.score,
        value: node.value,
    }
}

/// Ascending iterator over a sorted set
pub struct Iter<'a, V> {
    set: &'a SortedSet<V>,
    next: Option<NodeId>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = ElementRef<'a, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.set.nodes.get(id);
        self.next = node.levels[0].forward;
        self.remaining -= 1;
        Some(ElementRef {
            member: &node.member,
            score: node.score,
            value: &node.value,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, V> ExactSizeIterator for Iter<'a, V> {}
