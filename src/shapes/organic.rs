//! Organic: natural, asymmetric growth that clusters by theme.

use rand::Rng;
use rand_distr::StandardNormal;

use super::{
    clamp_children, score_parent_candidate, with_capacity, GrowthContext, GrowthShape,
    ShapeConfig, ShapeOptions, SymmetryMode,
};
use crate::geometry::normalize_angle;
use crate::growth::BuildRng;
use crate::model::{NodeIdx, TreeNode};

#[derive(Debug, Clone)]
pub struct OrganicShape {
    config: ShapeConfig,
}

impl OrganicShape {
    pub fn defaults() -> ShapeConfig {
        ShapeConfig {
            min_children: 1,
            max_children: 3,
            branching_angle: (25.0, 90.0),
            symmetry: SymmetryMode::None,
            symmetry_strength: 0.2,
            density: 0.65,
            theme_coherence: 0.7,
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

impl GrowthShape for OrganicShape {
    fn name(&self) -> &'static str {
        "organic"
    }

    fn description(&self) -> &'static str {
        "Natural tree with varied branching like real plants"
    }

    fn config(&self) -> &ShapeConfig {
        &self.config
    }

    fn layout_style(&self) -> &'static str {
        "radial"
    }

    fn select_parent(
        &self,
        node: &TreeNode,
        candidates: &[&TreeNode],
        ctx: &GrowthContext<'_>,
        rng: &mut BuildRng,
    ) -> Option<NodeIdx> {
        let available = with_capacity(candidates, ctx);
        if available.is_empty() {
            return None;
        }

        let ideal_depth = node.depth.saturating_sub(1);
        let mut scored: Vec<(f64, NodeIdx)> = available
            .iter()
            .map(|c| {
                let mut score = score_parent_candidate(node, c, &self.config);
                score += rng.random_range(-0.2..=0.2);
                if c.depth == ideal_depth {
                    score += 0.3;
                }
                (score, c.idx)
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        // Runner-up now and then keeps the canopy uneven.
        if scored.len() > 1 && rng.random::<f64>() < 0.2 {
            return Some(scored[1].1);
        }
        scored.first().map(|(_, idx)| *idx)
    }

    fn calculate_children_count(
        &self,
        node: &TreeNode,
        ctx: &GrowthContext<'_>,
        rng: &mut BuildRng,
    ) -> usize {
        let cfg = &self.config;
        let depth_factor = (1.0 - node.depth as f64 * 0.15).max(0.2);
        let span = cfg.max_children.saturating_sub(cfg.min_children) as f64;
        let average = cfg.min_children as f64 + span * cfg.density * depth_factor;
        let noise: f64 = rng.sample::<f64, _>(StandardNormal) * 0.5;
        let count = (average + noise).max(0.0) as usize;
        clamp_children(count, cfg, ctx)
    }

    fn should_branch(&self, node: &TreeNode, _ctx: &GrowthContext<'_>, rng: &mut BuildRng) -> bool {
        if self.config.depth_exhausted(node.depth) {
            return false;
        }
        let probability = (self.config.density * (1.0 - node.depth as f64 * 0.12)).max(0.1);
        rng.random::<f64>() < probability
    }

    fn get_branch_angle(
        &self,
        _parent: &TreeNode,
        child_index: usize,
        total: usize,
        _ctx: &GrowthContext<'_>,
        rng: &mut BuildRng,
    ) -> f64 {
        let (lo, hi) = self.config.angle_range_radians();
        if total <= 1 {
            return normalize_angle((lo + hi) / 2.0 + rng.random_range(-0.2..=0.2));
        }
        let step = (hi - lo) / total as f64;
        let base = lo + step * child_index as f64 + step / 2.0;
        normalize_angle(base + rng.random_range(-step * 0.3..=step * 0.3))
    }
}
