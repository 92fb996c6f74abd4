//! Cascade: tier-banded rows that spill downward.

use rand::Rng;

use super::{
    clamp_children, with_capacity, GrowthContext, GrowthShape, ShapeConfig, ShapeOptions,
    SymmetryMode,
};
use crate::growth::BuildRng;
use crate::model::{NodeIdx, TreeNode};

#[derive(Debug, Clone)]
pub struct CascadeShape {
    config: ShapeConfig,
}

impl CascadeShape {
    pub fn defaults() -> ShapeConfig {
        ShapeConfig {
            min_children: 2,
            max_children: 3,
            branching_angle: (60.0, 120.0),
            symmetry: SymmetryMode::Mirror,
            symmetry_strength: 0.6,
            density: 0.7,
            ..ShapeConfig::default()
        }
    }

    pub fn new(options: &ShapeOptions) -> Self {
        Self { config: Self::defaults().with_options(options) }
    }

    pub fn boxed(options: &ShapeOptions) -> Box<dyn GrowthShape> {
        Box::new(Self::new(options))
    }
}

impl GrowthShape for CascadeShape {
    fn name(&self) -> &'static str {
        "cascade"
    }

    fn description(&self) -> &'static str {
        "Horizontal tiers cascading downward"
    }

    fn config(&self) -> &ShapeConfig {
        &self.config
    }

    fn select_parent(
        &self,
        node: &TreeNode,
        candidates: &[&TreeNode],
        ctx: &GrowthContext<'_>,
        _rng: &mut BuildRng,
    ) -> Option<NodeIdx> {
        let available = with_capacity(candidates, ctx);
        let ideal = node.tier_index.saturating_sub(1) as u32;

        // Spread load evenly across the band one tier up.
        let band = available
            .iter()
            .filter(|c| c.depth == ideal)
            .min_by_key(|c| c.child_count());
        if let Some(parent) = band {
            return Some(parent.idx);
        }
        available
            .iter()
            .min_by_key(|c| (c.depth.abs_diff(ideal), c.child_count()))
            .map(|c| c.idx)
    }

    fn calculate_children_count(
        &self,
        node: &TreeNode,
        ctx: &GrowthContext<'_>,
        rng: &mut BuildRng,
    ) -> usize {
        let max = self.config.max_children.min(ctx.max_children);
        match node.tier_index {
            0 | 1 => clamp_children(rng.random_range(2..=3), &self.config, ctx),
            2 => rng.random_range(1..=2usize).min(max),
            _ => max.min(1),
        }
    }

    fn should_branch(&self, node: &TreeNode, ctx: &GrowthContext<'_>, _rng: &mut BuildRng) -> bool {
        let last_band = ctx.tier_count.saturating_sub(1) as u32;
        node.depth < last_band && !self.config.depth_exhausted(node.depth)
    }
}
