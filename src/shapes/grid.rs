//! Grid: orderly rows with orthogonal and diagonal connections.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use rand::Rng;

use super::{
    best_scored, with_capacity, GrowthContext, GrowthShape, ShapeConfig, ShapeOptions, SymmetryMode,
};
use crate::geometry::normalize_angle;
use crate::growth::BuildRng;
use crate::model::{NodeIdx, TreeNode};

/// Child headings relative to the parent: straight on, then the diagonals,
/// then sideways.
const HEADINGS: [f64; 4] = [FRAC_PI_2, FRAC_PI_4, 3.0 * FRAC_PI_4, 0.0];

#[derive(Debug, Clone)]
pub struct GridShape {
    config: ShapeConfig,
    prefer_horizontal: bool,
}

impl GridShape {
    pub fn defaults() -> ShapeConfig {
        ShapeConfig {
            min_children: 1,
            max_children: 4,
            branching_angle: (0.0, 360.0),
            symmetry: SymmetryMode::Mirror,
            symmetry_strength: 0.8,
            density: 0.7,
            theme_coherence: 0.6,
            ..ShapeConfig::default()
        }
    }

    pub fn new(options: &ShapeOptions) -> Self {
        Self {
            config: Self::defaults().with_options(options),
            prefer_horizontal: true,
        }
    }

    pub fn boxed(options: &ShapeOptions) -> Box<dyn GrowthShape> {
        Box::new(Self::new(options))
    }
}

impl GrowthShape for GridShape {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn description(&self) -> &'static str {
        "Structured grid pattern with orthogonal connections"
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
        let scored = with_capacity(candidates, ctx)
            .into_iter()
            .map(|c| {
                let mut score = 1.0;
                let one_up = c.depth + 1 == node.depth;
                if one_up {
                    score += 1.0;
                } else if c.depth == node.depth {
                    score += 0.5;
                }
                score -= c.child_count() as f64 * 0.2;
                if !node.is_unassigned() && c.theme == node.theme {
                    score += self.config.theme_coherence * 0.5;
                }
                if self.prefer_horizontal && one_up {
                    score += 0.3;
                }
                (score, c.idx)
            })
            .collect();
        best_scored(scored)
    }

    fn calculate_children_count(
        &self,
        node: &TreeNode,
        ctx: &GrowthContext<'_>,
        rng: &mut BuildRng,
    ) -> usize {
        let max = self.config.max_children.min(ctx.max_children);
        if node.depth == 0 {
            return self.config.extras.grid_columns.min(max);
        }
        let target: usize = if self.prefer_horizontal { 2 } else { 1 };
        if rng.random::<f64>() < self.config.density {
            target.min(max)
        } else {
            max.min(1)
        }
    }

    fn get_branch_angle(
        &self,
        parent: &TreeNode,
        child_index: usize,
        total: usize,
        _ctx: &GrowthContext<'_>,
        _rng: &mut BuildRng,
    ) -> f64 {
        if parent.depth == 0 {
            if total <= 1 {
                return 0.0;
            }
            // First row across the lower half-plane.
            return PI / (total + 1) as f64 * (child_index + 1) as f64;
        }
        let heading = HEADINGS
            .get(child_index)
            .copied()
            .unwrap_or(FRAC_PI_2 + child_index as f64 * 0.3);
        normalize_angle(heading)
    }
}
