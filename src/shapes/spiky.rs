//! Spiky: long thin chains that occasionally split at sharp angles.

use std::f64::consts::FRAC_PI_2;

use hashbrown::HashMap;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::{
    clamp_children, with_capacity, GrowthContext, GrowthShape, ShapeConfig, ShapeOptions,
    SymmetryMode,
};
use crate::growth::BuildRng;
use crate::model::{NodeIdx, TreeNode};

#[derive(Debug, Clone)]
pub struct SpikyShape {
    config: ShapeConfig,
    /// Length of the single-child run ending at each linked node.
    chain_lengths: HashMap<NodeIdx, usize>,
}

impl SpikyShape {
    pub fn defaults() -> ShapeConfig {
        ShapeConfig {
            min_children: 1,
            max_children: 2,
            branching_angle: (60.0, 120.0),
            symmetry: SymmetryMode::None,
            density: 0.4,
            ..ShapeConfig::default()
        }
    }

    pub fn new(options: &ShapeOptions) -> Self {
        Self {
            config: Self::defaults().with_options(options),
            chain_lengths: HashMap::new(),
        }
    }

    pub fn boxed(options: &ShapeOptions) -> Box<dyn GrowthShape> {
        Box::new(Self::new(options))
    }

    pub fn chain_length(&self, node: &TreeNode) -> usize {
        self.chain_lengths
            .get(&node.idx)
            .copied()
            .unwrap_or(node.depth as usize)
    }
}

impl GrowthShape for SpikyShape {
    fn name(&self) -> &'static str {
        "spiky"
    }

    fn description(&self) -> &'static str {
        "Long thin branches, sharp angles"
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

        let tips: Vec<&TreeNode> = available.iter().copied().filter(|c| c.child_count() == 0).collect();
        if !tips.is_empty() {
            let same_theme: Vec<&TreeNode> =
                tips.iter().copied().filter(|c| c.theme == node.theme).collect();
            let pool = if same_theme.is_empty() { &tips } else { &same_theme };
            return pool.choose(rng).map(|c| c.idx);
        }

        // No free tip: split the longest spike. First of equals wins.
        let deepest = available.iter().map(|c| c.depth).max()?;
        available.iter().find(|c| c.depth == deepest).map(|c| c.idx)
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
        let extras = &self.config.extras;
        let chance = extras.split_chance * self.chain_length(node) as f64 / extras.spike_length as f64;
        let count = if rng.random::<f64>() < chance { 2 } else { 1 };
        clamp_children(count, &self.config, ctx)
    }

    fn should_branch(&self, node: &TreeNode, _ctx: &GrowthContext<'_>, rng: &mut BuildRng) -> bool {
        if self.config.depth_exhausted(node.depth) {
            return false;
        }
        node.depth < 8 || rng.random::<f64>() < 0.3
    }

    fn get_branch_angle(
        &self,
        _parent: &TreeNode,
        child_index: usize,
        total: usize,
        _ctx: &GrowthContext<'_>,
        rng: &mut BuildRng,
    ) -> f64 {
        if total <= 1 {
            return FRAC_PI_2 + rng.random_range(-0.3..=0.3);
        }
        let base: f64 = if child_index == 0 { 45.0 } else { 135.0 };
        (base + rng.random_range(-10.0..=10.0)).to_radians()
    }

    fn on_linked(&mut self, parent: &TreeNode, child: &TreeNode) {
        let length = if parent.child_count() <= 1 {
            self.chain_length(parent) + 1
        } else {
            1
        };
        self.chain_lengths.insert(child.idx, length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::growth::seeded_rng;
    use crate::model::NodeTable;
    use crate::shapes::testing::{ctx, tree};

    #[test]
    fn test_chain_length_tracks_single_child_runs() {
        let mut table = tree(&[("root", 0, "fire", None)]);
        let mut shape = SpikyShape::new(&ShapeOptions::default());
        let root = NodeIdx(0);
        let mut prev = root;
        for i in 0..3 {
            let id = format!("s{i}");
            let idx = table.insert(&id, &id, "Novice", 0, "fire").unwrap();
            table.link(prev, idx);
            shape.on_linked(table.get(prev), table.get(idx));
            prev = idx;
        }
        assert_eq!(shape.chain_length(table.get(prev)), 3);

        // A second child under s1 starts a fresh spike.
        let fork = table.insert("fork", "fork", "Novice", 0, "fire").unwrap();
        let s1 = table.lookup("s1").unwrap();
        table.link(s1, fork);
        shape.on_linked(table.get(s1), table.get(fork));
        assert_eq!(shape.chain_length(table.get(fork)), 1);
    }

    #[test]
    fn test_split_angles_are_sharp() {
        let table: NodeTable = tree(&[("root", 0, "fire", None), ("a", 0, "fire", Some("root"))]);
        let shape = SpikyShape::new(&ShapeOptions::default());
        let themes = vec![];
        let mut rng = seeded_rng(6);
        let a = table.get(NodeIdx(1));
        for _ in 0..20 {
            let left = shape.get_branch_angle(a, 0, 2, &ctx(&themes), &mut rng).to_degrees();
            let right = shape.get_branch_angle(a, 1, 2, &ctx(&themes), &mut rng).to_degrees();
            assert!((35.0..=55.0).contains(&left));
            assert!((125.0..=145.0).contains(&right));
        }
    }

    #[test]
    fn test_prefers_deepest_when_no_tips() {
        let table = tree(&[
            ("root", 0, "fire", None),
            ("a", 0, "fire", Some("root")),
            ("b", 1, "fire", Some("a")),
            ("c", 2, "fire", Some("b")),
        ]);
        let shape = SpikyShape::new(&ShapeOptions::default());
        let themes = vec![];
        let mut rng = seeded_rng(6);
        let node = crate::shapes::testing::sample(&table, "x", 2, "fire");
        let busy: Vec<_> = table.iter().filter(|n| n.child_count() > 0).collect();
        assert_eq!(shape.select_parent(&node, &busy, &ctx(&themes), &mut rng), Some(NodeIdx(2)));
    }
}
