//! Linear: clean chains with the odd Y-fork.

use rand::seq::IndexedRandom;
use rand::Rng;

use super::{
    clamp_children, with_capacity, GrowthContext, GrowthShape, ShapeConfig, ShapeOptions,
    SymmetryMode,
};
use crate::growth::BuildRng;
use crate::model::{NodeIdx, TreeNode};

#[derive(Debug, Clone)]
pub struct LinearShape {
    config: ShapeConfig,
}

impl LinearShape {
    pub fn defaults() -> ShapeConfig {
        ShapeConfig {
            min_children: 1,
            max_children: 2,
            branching_angle: (45.0, 90.0),
            symmetry: SymmetryMode::Partial,
            symmetry_strength: 0.5,
            density: 0.5,
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

impl GrowthShape for LinearShape {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn description(&self) -> &'static str {
        "Simple Y-branching, clean progression"
    }

    fn config(&self) -> &ShapeConfig {
        &self.config
    }

    fn select_parent(
        &self,
        node: &TreeNode,
        candidates: &[&TreeNode],
        ctx: &GrowthContext<'_>,
        rng: &mut BuildRng,
    ) -> Option<NodeIdx> {
        let available = with_capacity(candidates, ctx);

        // Extend a chain end when there is one, same theme first.
        let tips: Vec<&TreeNode> = available.iter().copied().filter(|c| c.child_count() == 0).collect();
        if !tips.is_empty() {
            let same_theme: Vec<&TreeNode> =
                tips.iter().copied().filter(|c| c.theme == node.theme).collect();
            let pool = if same_theme.is_empty() { &tips } else { &same_theme };
            return pool.choose(rng).map(|c| c.idx);
        }

        available.iter().min_by_key(|c| c.child_count()).map(|c| c.idx)
    }

    fn calculate_children_count(
        &self,
        node: &TreeNode,
        ctx: &GrowthContext<'_>,
        rng: &mut BuildRng,
    ) -> usize {
        if node.depth == 0 {
            return clamp_children(rng.random_range(2..=3), &self.config, ctx);
        }
        let count = if rng.random::<f64>() < 0.8 { 1 } else { 2 };
        clamp_children(count, &self.config, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::growth::seeded_rng;
    use crate::shapes::testing::{ctx, sample, tree};

    #[test]
    fn test_extends_same_theme_tip() {
        let table = tree(&[
            ("root", 0, "fire", None),
            ("a", 0, "fire", Some("root")),
            ("b", 0, "frost", Some("root")),
        ]);
        let themes = vec!["fire".to_string(), "frost".to_string()];
        let shape = LinearShape::new(&ShapeOptions::default());
        let node = sample(&table, "c", 1, "frost");
        let candidates: Vec<_> = table.iter().collect();
        let mut rng = seeded_rng(2);
        for _ in 0..10 {
            assert_eq!(
                shape.select_parent(&node, &candidates, &ctx(&themes), &mut rng),
                Some(NodeIdx(2))
            );
        }
    }

    #[test]
    fn test_falls_back_to_least_loaded() {
        let table = tree(&[
            ("root", 0, "fire", None),
            ("a", 0, "fire", Some("root")),
            ("a1", 1, "fire", Some("a")),
        ]);
        let themes = vec!["fire".to_string()];
        let shape = LinearShape::new(&ShapeOptions::default());
        let node = sample(&table, "x", 1, "fire");
        // Only non-tips offered: root has 1 child, a has 1 child.
        let candidates = vec![table.get(NodeIdx(0)), table.get(NodeIdx(1))];
        let mut rng = seeded_rng(2);
        assert_eq!(
            shape.select_parent(&node, &candidates, &ctx(&themes), &mut rng),
            Some(NodeIdx(0))
        );
    }

    #[test]
    fn test_mostly_single_children() {
        let table = tree(&[("root", 0, "fire", None), ("a", 0, "fire", Some("root"))]);
        let themes = vec![];
        let shape = LinearShape::new(&ShapeOptions::default());
        let mut rng = seeded_rng(8);
        let a = table.get(NodeIdx(1));
        let singles = (0..1000)
            .filter(|_| shape.calculate_children_count(a, &ctx(&themes), &mut rng) == 1)
            .count();
        assert!((700..900).contains(&singles), "{singles}");

        let root = table.get(NodeIdx(0));
        let n = shape.calculate_children_count(root, &ctx(&themes), &mut rng);
        assert_eq!(n, 2);
    }
}
