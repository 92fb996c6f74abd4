//! # Layout
//!
//! Formations turn a linked tree into 2D positions. Each formation computes a
//! preferred point per node, snaps it to free space through the
//! [`SpacingEngine`], and finishes with a repulsion pass.
//!
//! | Formation | Placement |
//! |-----------|-----------|
//! | `radial` | Walks out from the root along the shape's branch angles |
//! | `layered` | One row per depth, siblings centred |

pub mod radial;
pub mod layered;

pub use radial::RadialFormation;
pub use layered::LayeredFormation;

use serde::{Deserialize, Serialize};

use crate::geometry::Vec2;
use crate::growth::BuildRng;
use crate::model::{NodeIdx, NodeTable};
use crate::shapes::{GrowthContext, GrowthShape};
use crate::spacing::{SpacingConfig, SpacingEngine};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Distance between a parent and its child (radial) or between rows
    /// (layered). Default: 2.0.
    pub level_spacing: f64,
    /// Horizontal gap between siblings in a row. Default: 1.5.
    pub sibling_spacing: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { level_spacing: 2.0, sibling_spacing: 1.5 }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.level_spacing > 0.0) {
            return Err(Error::invalid_config(
                "layout.level_spacing",
                self.level_spacing,
                "must be a positive number",
            ));
        }
        if !(self.sibling_spacing > 0.0) {
            return Err(Error::invalid_config(
                "layout.sibling_spacing",
                self.sibling_spacing,
                "must be a positive number",
            ));
        }
        Ok(())
    }
}

/// Everything a formation may read while placing one bucket.
pub struct Placement<'a> {
    pub root: NodeIdx,
    pub shape: &'a dyn GrowthShape,
    pub ctx: GrowthContext<'a>,
    pub layout: &'a LayoutConfig,
    pub spacing: &'a SpacingConfig,
}

/// A pluggable placement strategy.
pub trait Formation {
    fn name(&self) -> &'static str;

    /// Write a position into every node of `table`. Returns the number of
    /// node pairs still closer than the minimum spacing.
    fn place(&self, table: &mut NodeTable, placement: &Placement<'_>, rng: &mut BuildRng) -> usize;
}

/// Snap `preferred` to free space, record it in both the engine and the table.
pub(crate) fn settle(
    engine: &mut SpacingEngine,
    table: &mut NodeTable,
    node: NodeIdx,
    preferred: Vec2,
    parent: Option<Vec2>,
) -> Vec2 {
    let position = engine.find_valid_position(preferred, parent, None);
    engine.register_node(node, position);
    table.get_mut(node).position = position;
    position
}

/// Final relaxation shared by every formation.
pub(crate) fn relax(engine: &mut SpacingEngine, table: &mut NodeTable) -> usize {
    let history = engine.repel_nearby_nodes(table, None);
    tracing::debug!(?history, "repulsion finished");
    history.last().copied().unwrap_or_else(|| engine.count_overlaps())
}

/// Breadth-first order from `root`, followed by anything it cannot reach.
pub(crate) fn placement_order(table: &NodeTable, root: NodeIdx) -> Vec<NodeIdx> {
    let mut seen = vec![false; table.len()];
    let mut order = Vec::with_capacity(table.len());
    let mut queue = std::collections::VecDeque::from([root]);
    seen[root.index()] = true;
    while let Some(current) = queue.pop_front() {
        order.push(current);
        for &child in table.get(current).children() {
            if !seen[child.index()] {
                seen[child.index()] = true;
                queue.push_back(child);
            }
        }
    }
    order.extend(table.indices().filter(|i| !seen[i.index()]));
    order
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_order_is_breadth_first() {
        let table = testing::sample_tree();
        let order: Vec<String> = placement_order(&table, NodeIdx(0))
            .into_iter()
            .map(|i| table.get(i).id.clone())
            .collect();
        assert_eq!(order, ["root", "a", "b", "c", "a1", "a2", "b1", "b2", "c1", "c2"]);
    }

    #[test]
    fn test_layout_config_rejects_negative_spacing() {
        let cfg = LayoutConfig { level_spacing: -1.0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }
}
