//! Skip list nodes and the arena that owns them.

use super::Score;

/// Index of a node inside the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

/// One forward link of a node (or of the header)
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Link {
    /// Next node on this level, `None` for end of list
    pub forward: Option<NodeId>,

    /// Number of level-0 hops covered by `forward`
    pub span: usize,
}

#[derive(Debug)]
pub(crate) struct Node<V> {
    pub member: String,
    pub score: Score,
    pub value: V,

    /// Previous node on level 0, `None` when the predecessor is the header
    pub backward: Option<NodeId>,

    /// Forward links, one per level this node participates in
    pub levels: Vec<Link>,
}

impl<V> Node<V> {
    pub fn new(member: String, score: Score, value: V, level: usize) -> Self {
        Self {
            member,
            score,
            value,
            backward: None,
            levels: vec![Link::default(); level],
        }
    }

    /// True if this node sorts strictly before `(score, member)`
    #[inline]
    pub fn precedes(&self, score: Score, member: &str) -> bool {
        self.score < score || (self.score == score && self.member.as_str() < member)
    }

    /// True if this node sorts before or at `(score, member)`
    #[inline]
    pub fn precedes_or_eq(&self, score: Score, member: &str) -> bool {
        self.score < score || (self.score == score && self.member.as_str() <= member)
    }
}

/// Slot storage with a free list so removed nodes leave no dangling links.
#[derive(Debug)]
pub(crate) struct Arena<V> {
    slots: Vec<Option<Node<V>>>,
    free: Vec<usize>,
}

impl<V> Arena<V> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn alloc(&mut self, node: Node<V>) -> NodeId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        }
    }

    pub fn release(&mut self, id: NodeId) -> Node<V> {
        match self.slots[id.0].take() {
            Some(node) => {
                self.free.push(id.0);
                node
            }
            None => unreachable!("skip list released vacant slot {}", id.0),
        }
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &Node<V> {
        match &self.slots[id.0] {
            Some(node) => node,
            None => unreachable!("skip list link to vacant slot {}", id.0),
        }
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node<V> {
        match &mut self.slots[id.0] {
            Some(node) => node,
            None => unreachable!("skip list link to vacant slot {}", id.0),
        }
    }

    /// Number of released slots waiting for reuse
    #[cfg(test)]
    pub fn vacant(&self) -> usize {
        self.free.len()
    }
}
