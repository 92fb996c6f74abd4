//! Cloud: dense, capacity-bounded clusters with gaps between them.
//!
//! Every linked node belongs to a cluster. A child joins its parent's
//! cluster while that cluster is under `cluster_size`, otherwise it starts a
//! new one. Parent selection favours same-theme nodes whose cluster still has
//! room, so clusters fill up before new ones open.

use std::f64::consts::{FRAC_PI_2, TAU};

use hashbrown::HashMap;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::{
    clamp_children, with_capacity, GrowthContext, GrowthShape, ShapeConfig, ShapeOptions,
    SymmetryMode,
};
use crate::geometry::normalize_angle;
use crate::growth::BuildRng;
use crate::model::{NodeIdx, TreeNode};

/// Angular spread of siblings inside one cluster.
const CLUSTER_SPREAD: f64 = 2.0 * std::f64::consts::FRAC_PI_3;

#[derive(Debug, Clone)]
pub struct CloudShape {
    config: ShapeConfig,
    node_cluster: HashMap<NodeIdx, usize>,
    cluster_sizes: Vec<usize>,
}

impl CloudShape {
    pub fn defaults() -> ShapeConfig {
        ShapeConfig {
            min_children: 2,
            max_children: 3,
            branching_angle: (20.0, 160.0),
            symmetry: SymmetryMode::None,
            density: 0.8,
            ..ShapeConfig::default()
        }
    }

    pub fn new(options: &ShapeOptions) -> Self {
        Self {
            config: Self::defaults().with_options(options),
            node_cluster: HashMap::new(),
            cluster_sizes: Vec::new(),
        }
    }

    pub fn boxed(options: &ShapeOptions) -> Box<dyn GrowthShape> {
        Box::new(Self::new(options))
    }

    pub fn cluster_of(&self, node: NodeIdx) -> Option<usize> {
        self.node_cluster.get(&node).copied()
    }

    pub fn cluster_size(&self, cluster: usize) -> usize {
        self.cluster_sizes.get(cluster).copied().unwrap_or(0)
    }

    pub fn cluster_count(&self) -> usize {
        self.cluster_sizes.len()
    }

    fn has_room(&self, node: NodeIdx) -> bool {
        self.cluster_of(node)
            .is_some_and(|c| self.cluster_size(c) < self.config.extras.cluster_size)
    }
}

impl GrowthShape for CloudShape {
    fn name(&self) -> &'static str {
        "cloud"
    }

    fn description(&self) -> &'static str {
        "Clustered groups with gaps between"
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
        let same_theme: Vec<&TreeNode> =
            available.iter().copied().filter(|c| c.theme == node.theme).collect();

        if same_theme.is_empty() {
            return available.choose(rng).map(|c| c.idx);
        }
        if let Some(open) = same_theme.iter().find(|c| self.has_room(c.idx)) {
            return Some(open.idx);
        }
        same_theme.choose(rng).map(|c| c.idx)
    }

    fn calculate_children_count(
        &self,
        node: &TreeNode,
        ctx: &GrowthContext<'_>,
        rng: &mut BuildRng,
    ) -> usize {
        if node.depth == 0 {
            return clamp_children(3, &self.config, ctx);
        }
        if let Some(cluster) = self.cluster_of(node.idx)
            && self.cluster_size(cluster) + 1 >= self.config.extras.cluster_size
        {
            return ctx.max_children.min(1);
        }
        clamp_children(rng.random_range(2..=3), &self.config, ctx)
    }

    fn should_branch(&self, node: &TreeNode, _ctx: &GrowthContext<'_>, rng: &mut BuildRng) -> bool {
        if node.depth < 2 {
            return true;
        }
        if self.has_room(node.idx) {
            return rng.random::<f64>() < 0.8;
        }
        rng.random::<f64>() < self.config.density
    }

    fn get_branch_angle(
        &self,
        parent: &TreeNode,
        child_index: usize,
        total: usize,
        _ctx: &GrowthContext<'_>,
        rng: &mut BuildRng,
    ) -> f64 {
        if parent.is_root {
            // One wedge per cluster, half a wedge of gap on either side.
            let wedge = TAU / total.max(1) as f64;
            let jitter: f64 = rng.random_range(-0.15..=0.15);
            return normalize_angle(wedge * (child_index as f64 + jitter));
        }
        if total <= 1 {
            return normalize_angle(FRAC_PI_2 + rng.random_range(-0.5..=0.5));
        }
        let step = CLUSTER_SPREAD / (total - 1) as f64;
        let offset = -CLUSTER_SPREAD / 2.0 + step * child_index as f64;
        normalize_angle(FRAC_PI_2 + offset + rng.random_range(-0.2..=0.2))
    }

    fn on_linked(&mut self, parent: &TreeNode, child: &TreeNode) {
        if self.node_cluster.contains_key(&child.idx) {
            return;
        }
        let cluster = match self.cluster_of(parent.idx) {
            Some(c) if self.cluster_size(c) < self.config.extras.cluster_size => c,
            _ => {
                self.cluster_sizes.push(0);
                self.cluster_sizes.len() - 1
            }
        };
        self.cluster_sizes[cluster] += 1;
        self.node_cluster.insert(child.idx, cluster);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::growth::seeded_rng;
    use crate::shapes::testing::{ctx, sample, tree};

    fn grow_chain(shape: &mut CloudShape, len: usize) -> crate::model::NodeTable {
        let mut table = tree(&[("root", 0, "mist", None)]);
        let mut prev = NodeIdx(0);
        for i in 0..len {
            let id = format!("c{i}");
            let idx = table.insert(&id, &id, "Novice", 0, "mist").unwrap();
            table.link(prev, idx);
            shape.on_linked(table.get(prev), table.get(idx));
            prev = idx;
        }
        table
    }

    #[test]
    fn test_clusters_cap_at_configured_size() {
        let mut shape = CloudShape::new(&ShapeOptions { cluster_size: Some(3), ..Default::default() });
        let table = grow_chain(&mut shape, 7);
        assert_eq!(shape.cluster_count(), 3);
        assert_eq!(shape.cluster_size(0), 3);
        assert_eq!(shape.cluster_size(1), 3);
        assert_eq!(shape.cluster_size(2), 1);
        assert_eq!(shape.cluster_of(table.lookup("c6").unwrap()), Some(2));
    }

    #[test]
    fn test_joins_open_cluster_first() {
        let mut shape = CloudShape::new(&ShapeOptions { cluster_size: Some(2), ..Default::default() });
        let table = grow_chain(&mut shape, 3);
        // c0,c1 fill cluster 0; c2 opened cluster 1.
        let themes = vec!["mist".to_string()];
        let candidates: Vec<_> = table.iter().collect();
        let node = sample(&table, "x", 1, "mist");
        let mut rng = seeded_rng(1);
        assert_eq!(
            shape.select_parent(&node, &candidates, &ctx(&themes), &mut rng),
            table.lookup("c2")
        );
    }

    #[test]
    fn test_nearly_full_cluster_grows_one_child() {
        let mut shape = CloudShape::new(&ShapeOptions { cluster_size: Some(3), ..Default::default() });
        let table = grow_chain(&mut shape, 2);
        let themes = vec![];
        let mut rng = seeded_rng(1);
        let mut c1 = table.get(table.lookup("c1").unwrap()).clone();
        c1.depth = 2;
        assert_eq!(shape.calculate_children_count(&c1, &ctx(&themes), &mut rng), 1);
    }

    #[test]
    fn test_branch_angles_stay_within_one_turn() {
        let table = tree(&[("root", 0, "mist", None), ("a", 0, "mist", Some("root"))]);
        let shape = CloudShape::new(&ShapeOptions::default());
        let themes = vec![];
        let mut rng = seeded_rng(12);
        for parent in [NodeIdx(0), NodeIdx(1)] {
            for _ in 0..50 {
                for i in 0..4 {
                    let a = shape.get_branch_angle(table.get(parent), i, 4, &ctx(&themes), &mut rng);
                    assert!((0.0..TAU).contains(&a), "{a}");
                }
            }
        }
    }
}
