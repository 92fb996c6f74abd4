//! Mountain: a wide base of early tiers narrowing toward a peak.

use std::f64::consts::FRAC_PI_2;

use rand::Rng;

use super::{
    best_scored, with_capacity, GrowthContext, GrowthShape, ShapeConfig, ShapeOptions, SymmetryMode,
};
use crate::growth::BuildRng;
use crate::model::{NodeIdx, TreeNode};

#[derive(Debug, Clone)]
pub struct MountainShape {
    config: ShapeConfig,
}

impl MountainShape {
    pub fn defaults() -> ShapeConfig {
        ShapeConfig {
            min_children: 1,
            max_children: 3,
            branching_angle: (30.0, 150.0),
            symmetry: SymmetryMode::Partial,
            symmetry_strength: 0.4,
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

    /// Angular spread in degrees at a tier: 150 at the base, 20 less per tier.
    fn spread_degrees(tier_index: usize) -> (f64, f64) {
        let spread = 150.0 - tier_index as f64 * 20.0;
        let lo = (90.0 - spread / 2.0).max(20.0);
        let hi = (90.0 + spread / 2.0).min(160.0);
        if lo < hi { (lo, hi) } else { (90.0, 90.0) }
    }
}

impl GrowthShape for MountainShape {
    fn name(&self) -> &'static str {
        "mountain"
    }

    fn description(&self) -> &'static str {
        "Wide base tapering to narrow peak"
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
        if node.tier_index <= 1 {
            // Base: spread out.
            return available.iter().min_by_key(|c| c.child_count()).map(|c| c.idx);
        }

        // Slopes: gather onto deep, already busy parents of the same theme.
        let same_theme: Vec<&TreeNode> =
            available.iter().copied().filter(|c| c.theme == node.theme).collect();
        let pool = if same_theme.is_empty() { available } else { same_theme };
        best_scored(
            pool.iter()
                .map(|c| (c.depth as f64 * 0.5 + c.child_count() as f64 * 0.3, c.idx))
                .collect(),
        )
    }

    fn calculate_children_count(
        &self,
        node: &TreeNode,
        ctx: &GrowthContext<'_>,
        rng: &mut BuildRng,
    ) -> usize {
        let max = self.config.max_children.min(ctx.max_children);
        if node.depth == 0 {
            return max.min(3);
        }
        let taper = (node.tier_index as f64 * self.config.extras.taper_rate * 2.0) as usize;
        let base = 3usize.saturating_sub(taper).clamp(1, 3);
        let count = if rng.random::<f64>() < 0.3 { (base - 1).max(1) } else { base };
        count.min(max)
    }

    fn get_branch_angle(
        &self,
        parent: &TreeNode,
        child_index: usize,
        total: usize,
        _ctx: &GrowthContext<'_>,
        _rng: &mut BuildRng,
    ) -> f64 {
        if total <= 1 {
            return FRAC_PI_2;
        }
        let (lo, hi) = Self::spread_degrees(parent.tier_index);
        let step = (hi - lo) / (total - 1) as f64;
        (lo + step * child_index as f64).to_radians()
    }
}
