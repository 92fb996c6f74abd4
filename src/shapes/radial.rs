//! Radial: spokes out of the root, one per theme, each extended outward.

use std::f64::consts::{FRAC_PI_2, TAU};

use rand::Rng;

use super::{
    best_scored, with_capacity, GrowthContext, GrowthShape, ShapeConfig, ShapeOptions, SymmetryMode,
};
use crate::geometry::normalize_angle;
use crate::growth::BuildRng;
use crate::model::{NodeIdx, TreeNode};

#[derive(Debug, Clone)]
pub struct RadialShape {
    config: ShapeConfig,
}

impl RadialShape {
    pub fn defaults() -> ShapeConfig {
        ShapeConfig {
            min_children: 3,
            max_children: 8,
            branching_angle: (0.0, 360.0),
            symmetry: SymmetryMode::Radial,
            symmetry_strength: 0.9,
            density: 0.5,
            theme_coherence: 0.5,
            ..ShapeConfig::default()
        }
    }

    pub fn new(options: &ShapeOptions) -> Self {
        Self { config: Self::defaults().with_options(options) }
    }

    pub fn boxed(options: &ShapeOptions) -> Box<dyn GrowthShape> {
        Box::new(Self::new(options))
    }

    fn spoke_count(&self) -> usize {
        self.config.extras.spoke_count
    }
}

impl GrowthShape for RadialShape {
    fn name(&self) -> &'static str {
        "radial"
    }

    fn description(&self) -> &'static str {
        "Star pattern with spokes radiating from center"
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
                // Same theme means same spoke.
                if !node.is_unassigned() && c.theme == node.theme {
                    score += 1.5;
                }
                if c.depth + 1 == node.depth {
                    score += 0.5;
                }
                score -= c.child_count() as f64 * 0.1;
                if c.is_root && c.child_count() < self.spoke_count() {
                    score += 1.0;
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
        if node.is_root || node.depth == 0 {
            return self.spoke_count().min(max);
        }
        if node.depth < 3 {
            return rng.random_range(1..=2usize.min(max).max(1));
        }
        usize::from(rng.random::<f64>() < self.config.density).min(max)
    }

    fn should_branch(&self, node: &TreeNode, _ctx: &GrowthContext<'_>, rng: &mut BuildRng) -> bool {
        if node.is_root || node.depth == 0 {
            return true;
        }
        if self.config.depth_exhausted(node.depth) {
            return false;
        }
        let probability = self.config.density * (1.0 - node.depth as f64 * 0.1);
        rng.random::<f64>() < probability
    }

    fn get_branch_angle(
        &self,
        parent: &TreeNode,
        child_index: usize,
        total: usize,
        _ctx: &GrowthContext<'_>,
        rng: &mut BuildRng,
    ) -> f64 {
        let total = total.max(1);
        if parent.is_root || parent.depth == 0 {
            return normalize_angle(TAU / total as f64 * child_index as f64);
        }
        // Keep extending the spoke; siblings fan out slightly.
        let fan = (child_index as f64 - (total - 1) as f64 / 2.0) * 0.35;
        normalize_angle(FRAC_PI_2 + fan + rng.random_range(-0.1..=0.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::growth::seeded_rng;
    use crate::shapes::testing::{ctx, sample, tree};

    #[test]
    fn test_root_children_become_spokes() {
        let table = tree(&[
            ("root", 0, "arcane", None),
            ("f1", 0, "fire", Some("root")),
        ]);
        let themes = vec!["fire".to_string(), "frost".to_string()];
        let shape = RadialShape::new(&ShapeOptions::default());
        let mut rng = seeded_rng(1);
        let mut node = sample(&table, "x", 1, "frost");
        node.depth = 1;
        let candidates = vec![table.get(NodeIdx(0)), table.get(NodeIdx(1))];
        // A new theme opens a spoke on the root.
        assert_eq!(shape.select_parent(&node, &candidates, &ctx(&themes), &mut rng), Some(NodeIdx(0)));

        let mut node = sample(&table, "y", 1, "fire");
        node.depth = 2;
        assert_eq!(shape.select_parent(&node, &candidates, &ctx(&themes), &mut rng), Some(NodeIdx(1)));
    }

    #[test]
    fn test_root_angles_cover_circle() {
        let table = tree(&[("root", 0, "fire", None)]);
        let shape = RadialShape::new(&ShapeOptions::default());
        let themes = vec![];
        let mut rng = seeded_rng(1);
        let root = table.get(NodeIdx(0));
        let angles: Vec<f64> = (0..4)
            .map(|i| shape.get_branch_angle(root, i, 4, &ctx(&themes), &mut rng))
            .collect();
        assert_eq!(angles[0], 0.0);
        assert!((angles[2] - std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn test_root_children_capped_by_capacity() {
        let table = tree(&[("root", 0, "fire", None)]);
        let shape = RadialShape::new(&ShapeOptions::default());
        let themes = vec![];
        let mut rng = seeded_rng(1);
        let n = shape.calculate_children_count(table.get(NodeIdx(0)), &ctx(&themes), &mut rng);
        assert_eq!(n, 3);
    }
}
