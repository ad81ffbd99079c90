//! Per-view adjacency over the shared node set.
//!
//! A topology is one tree-shaped view: primary children form a strict tree
//! (each non-root node has at most one primary parent within the view, and
//! siblings are ordered), while shared children are cross-references that
//! may appear under several parents and in several views. Both edge classes
//! are stored CSR-style: a flat child list plus per-node `(start, count)`
//! spans.
//!
//! Node indices are identical across all topologies built from the same
//! node store; only the edge tables differ.

/// Dense 0-based node index.
pub type NodeIndex = u64;

/// Sentinel for "no node".
pub const NONE: NodeIndex = u64::MAX;

/// The root node is always created first.
pub const ROOT: NodeIndex = 0;

#[derive(Clone, Copy, Debug, Default)]
struct ChildSpan {
    start: u64,
    count: u64,
}

/// One frozen view: primary tree edges plus shared cross-reference edges.
#[derive(Clone, Debug, Default)]
pub struct Topology {
    children_list: Vec<NodeIndex>,
    shared_children_list: Vec<NodeIndex>,
    node_children: Vec<ChildSpan>,
    node_shared_children: Vec<ChildSpan>,
    node_parent: Vec<NodeIndex>,
    node_child_index: Vec<NodeIndex>,
}

impl Topology {
    pub fn num_nodes(&self) -> u64 {
        debug_assert_eq!(self.node_children.len(), self.node_shared_children.len());
        debug_assert_eq!(self.node_children.len(), self.node_parent.len());
        debug_assert_eq!(self.node_children.len(), self.node_child_index.len());
        self.node_children.len() as u64
    }

    /// Primary parent of `node` within this view, or [`NONE`].
    pub fn parent_of(&self, node: NodeIndex) -> NodeIndex {
        self.node_parent[node as usize]
    }

    /// Position of `node` in its primary parent's child list, or [`NONE`].
    pub fn child_index_of(&self, node: NodeIndex) -> NodeIndex {
        self.node_child_index[node as usize]
    }

    pub fn num_children(&self, node: NodeIndex) -> u64 {
        self.node_children[node as usize].count
    }

    pub fn child_at(&self, node: NodeIndex, child_index: u64) -> NodeIndex {
        let span = self.node_children[node as usize];
        assert!(child_index < span.count);
        self.children_list[(span.start + child_index) as usize]
    }

    pub fn num_shared_children(&self, node: NodeIndex) -> u64 {
        self.node_shared_children[node as usize].count
    }

    pub fn shared_child_at(&self, node: NodeIndex, child_index: u64) -> NodeIndex {
        let span = self.node_shared_children[node as usize];
        assert!(child_index < span.count);
        self.shared_children_list[(span.start + child_index) as usize]
    }

    /// Next node in a pre-order walk of the primary tree, or [`NONE`] once
    /// the walk is exhausted.
    pub fn next_in_preorder(&self, node: NodeIndex) -> NodeIndex {
        if self.num_children(node) > 0 {
            return self.child_at(node, 0);
        }
        let mut node = node;
        loop {
            if node == ROOT {
                return NONE;
            }
            let parent = self.parent_of(node);
            let sibling = self.child_index_of(node) + 1;
            if sibling < self.num_children(parent) {
                return self.child_at(parent, sibling);
            }
            node = parent;
        }
    }

    /// Resizes the per-node tables. Parent and child-index entries initialize
    /// to [`NONE`].
    pub fn set_size(&mut self, num_nodes: u64) {
        self.node_children.resize(num_nodes as usize, ChildSpan::default());
        self.node_shared_children
            .resize(num_nodes as usize, ChildSpan::default());
        self.node_parent.resize(num_nodes as usize, NONE);
        self.node_child_index.resize(num_nodes as usize, NONE);
    }

    /// Appends `children` as the primary children of `node` and writes the
    /// parent back-links. `node` must not already have primary children, and
    /// no child may already have a primary parent in this view.
    pub fn add_children(&mut self, node: NodeIndex, children: &[NodeIndex]) {
        let start = self.children_list.len() as u64;
        self.children_list.extend_from_slice(children);

        let span = &mut self.node_children[node as usize];
        assert_eq!(span.count, 0, "node {node} already has primary children");
        span.start = start;
        span.count = children.len() as u64;

        for (i, &child) in children.iter().enumerate() {
            assert!((child as usize) < self.node_parent.len());
            assert_eq!(
                self.node_parent[child as usize], NONE,
                "node {child} already has a primary parent"
            );
            self.node_parent[child as usize] = node;
            self.node_child_index[child as usize] = i as u64;
        }
    }

    /// Appends `children` as the shared children of `node`. No back-links.
    pub fn add_shared_children(&mut self, node: NodeIndex, children: &[NodeIndex]) {
        let start = self.shared_children_list.len() as u64;
        self.shared_children_list.extend_from_slice(children);

        let span = &mut self.node_shared_children[node as usize];
        assert_eq!(span.count, 0, "node {node} already has shared children");
        span.start = start;
        span.count = children.len() as u64;
    }
}
