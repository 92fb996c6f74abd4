//! Serializable build results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::node::{NodeIdx, TreeNode};
use super::table::NodeTable;
use crate::geometry::Vec2;

/// Format version stamped on every [`Forest`].
pub const OUTPUT_VERSION: &str = "1.0";

/// One emitted node. Links are expressed as item ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeOutput {
    pub id: String,
    pub name: String,
    pub tier: String,
    pub theme: String,
    pub depth: u32,
    pub is_root: bool,
    pub children: Vec<String>,
    pub prerequisites: Vec<String>,
    pub position: Vec2,
}

impl NodeOutput {
    fn from_node(table: &NodeTable, node: &TreeNode) -> Self {
        let ids = |links: &[NodeIdx]| links.iter().map(|l| table.get(*l).id.clone()).collect();
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            tier: node.tier.clone(),
            theme: node.theme.clone(),
            depth: node.depth,
            is_root: node.is_root,
            children: ids(node.children()),
            prerequisites: ids(node.prerequisites()),
            position: node.position,
        }
    }
}

/// Where a bucket's effective settings came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Global,
    Override,
    Advisor,
}

/// Effective settings a bucket was built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigUsed {
    pub shape: String,
    pub formation: String,
    pub density: f64,
    pub symmetry: f64,
    pub convergence_chance: f64,
    pub seed: u64,
    pub source: ConfigSource,
}

/// Counts of every degraded outcome the builder repaired in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDiagnostics {
    /// Items dropped because their id was already taken.
    pub duplicate_items: usize,
    /// Items whose tier name was not in the tier list.
    pub unknown_tiers: usize,
    /// Lowest-tier items linked straight to a full root.
    pub root_overflow_links: usize,
    /// Items attached by the orphan pass.
    pub orphans_attached: usize,
    /// Higher-tier orphans that could only go under the root.
    pub forced_root_orphans: usize,
    /// Extra prerequisites added during connection and enforcement.
    pub convergence_links: usize,
    /// Top-tier nodes left below their prerequisite floor.
    pub convergence_shortfalls: usize,
    /// Repair passes that changed something.
    pub repair_passes: usize,
    /// Nodes relinked by the repair loop.
    pub repaired_nodes: usize,
    /// Whether the repair loop fell back to linking leftovers to the root.
    pub aggressive_fallback: bool,
    /// Node pairs still closer than the minimum spacing after layout.
    pub overlapping_pairs: usize,
}

impl BuildDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.root_overflow_links == 0
            && self.forced_root_orphans == 0
            && self.repaired_nodes == 0
            && !self.aggressive_fallback
    }
}

/// A finished tree for one bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeOutput {
    pub root: String,
    pub layout_style: String,
    pub nodes: Vec<NodeOutput>,
    pub config_used: ConfigUsed,
    pub diagnostics: BuildDiagnostics,
}

impl TreeOutput {
    pub fn from_table(
        table: &NodeTable,
        root: NodeIdx,
        layout_style: impl Into<String>,
        config_used: ConfigUsed,
        diagnostics: BuildDiagnostics,
    ) -> Self {
        Self {
            root: table.get(root).id.clone(),
            layout_style: layout_style.into(),
            nodes: table.iter().map(|n| NodeOutput::from_node(table, n)).collect(),
            config_used,
            diagnostics,
        }
    }

    pub fn node(&self, id: &str) -> Option<&NodeOutput> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Trees for every bucket, keyed by bucket name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    pub version: String,
    pub buckets: BTreeMap<String, TreeOutput>,
}

impl Forest {
    pub fn new() -> Self {
        Self {
            version: OUTPUT_VERSION.to_string(),
            buckets: BTreeMap::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.buckets.values().map(|t| t.nodes.len()).sum()
    }
}

impl Default for Forest {
    fn default() -> Self {
        Self::new()
    }
}
