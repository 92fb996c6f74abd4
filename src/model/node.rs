//! Vertex of a synthesized tree.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::geometry::Vec2;

/// Handle into a [`NodeTable`](super::NodeTable). Stable for the whole build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIdx(pub u32);

impl NodeIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Edge list of a node. Most nodes have at most a handful of links.
pub type Links = SmallVec<[NodeIdx; 4]>;

/// Theme label for items without a confident theme.
pub const UNASSIGNED_THEME: &str = "unassigned";

/// A node in the unlock tree.
///
/// `children` and `prerequisites` are kept mutually transposed by the owning
/// table; they can only be changed through
/// [`NodeTable::link`](super::NodeTable::link) and
/// [`NodeTable::unlink`](super::NodeTable::unlink).
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub idx: NodeIdx,
    pub id: String,
    pub name: String,
    pub tier: String,
    /// Ordinal position of `tier` in the configured tier list.
    pub tier_index: usize,
    pub theme: String,
    pub depth: u32,
    pub is_root: bool,
    pub position: Vec2,
    pub(crate) children: Links,
    pub(crate) prerequisites: Links,
}

impl TreeNode {
    pub fn new(idx: NodeIdx, id: impl Into<String>, tier: impl Into<String>, tier_index: usize) -> Self {
        Self {
            idx,
            id: id.into(),
            name: String::new(),
            tier: tier.into(),
            tier_index,
            theme: UNASSIGNED_THEME.to_string(),
            depth: 0,
            is_root: false,
            position: Vec2::ZERO,
            children: Links::new(),
            prerequisites: Links::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }

    pub fn children(&self) -> &[NodeIdx] {
        &self.children
    }

    pub fn prerequisites(&self) -> &[NodeIdx] {
        &self.prerequisites
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn is_unassigned(&self) -> bool {
        self.theme == UNASSIGNED_THEME
    }
}
