//! Structural checks over a finished tree.
//!
//! [`TreeReport::inspect`] works on the serialized [`TreeOutput`] alone, so
//! it can check trees loaded back from disk as well as fresh builds.

use std::collections::{BTreeMap, VecDeque};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::config::TierOrder;
use crate::model::TreeOutput;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeReport {
    pub node_count: usize,
    /// Nodes reachable from the root along child links.
    pub reachable: usize,
    /// Nodes unlockable from the root when every prerequisite is required.
    pub unlockable: usize,
    pub has_cycle: bool,
    /// Links present on one side only, or naming unknown ids.
    pub link_mismatches: usize,
    /// Non-root nodes holding more children than allowed.
    pub capacity_violations: usize,
    pub root_children: usize,
    /// Root holds more children than allowed. Tolerated by [`Self::is_valid`].
    pub root_over_capacity: bool,
    /// Links `order` forbids. Links out of the root are exempt.
    pub tier_violations: usize,
    /// Smallest prerequisite count seen per tier, root excluded.
    pub min_prerequisites: BTreeMap<String, usize>,
}

impl TreeReport {
    /// Check `tree` against the tier list, child capacity and tier order it
    /// was built with.
    pub fn inspect(tree: &TreeOutput, tiers: &[String], max_children: usize, order: TierOrder) -> Self {
        let index: HashMap<&str, usize> = tree
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();
        let tier_of = |tier: &str| tiers.iter().position(|t| t.eq_ignore_ascii_case(tier)).unwrap_or(0);

        let mut report = Self {
            node_count: tree.nodes.len(),
            ..Self::default()
        };

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); tree.nodes.len()];
        let mut prereqs: Vec<Vec<usize>> = vec![Vec::new(); tree.nodes.len()];
        for (i, node) in tree.nodes.iter().enumerate() {
            for child in &node.children {
                match index.get(child.as_str()) {
                    Some(&c) if tree.nodes[c].prerequisites.contains(&node.id) => children[i].push(c),
                    _ => report.link_mismatches += 1,
                }
            }
            for parent in &node.prerequisites {
                match index.get(parent.as_str()) {
                    Some(&p) if tree.nodes[p].children.contains(&node.id) => prereqs[i].push(p),
                    _ => report.link_mismatches += 1,
                }
            }
        }

        let Some(&root) = index.get(tree.root.as_str()) else {
            return report;
        };

        report.reachable = reachable(&children, root);
        report.unlockable = unlockable(&children, &prereqs, root);
        report.has_cycle = has_cycle(&children);
        report.root_children = children[root].len();
        report.root_over_capacity = report.root_children > max_children;

        for (i, node) in tree.nodes.iter().enumerate() {
            if i != root && children[i].len() > max_children {
                report.capacity_violations += 1;
            }
            let tier = tier_of(&node.tier);
            for &c in &children[i] {
                if !order.allows_tiers(tier, i == root, tier_of(&tree.nodes[c].tier)) {
                    report.tier_violations += 1;
                }
            }
            if i != root {
                let entry = report
                    .min_prerequisites
                    .entry(node.tier.clone())
                    .or_insert(usize::MAX);
                *entry = (*entry).min(prereqs[i].len());
            }
        }
        report
    }

    /// Every node unlockable, no cycles, links mirrored, capacity held.
    pub fn is_valid(&self) -> bool {
        self.unlockable == self.node_count
            && !self.has_cycle
            && self.link_mismatches == 0
            && self.capacity_violations == 0
    }
}

fn reachable(children: &[Vec<usize>], root: usize) -> usize {
    let mut seen = vec![false; children.len()];
    let mut queue = VecDeque::from([root]);
    seen[root] = true;
    let mut count = 0;
    while let Some(n) = queue.pop_front() {
        count += 1;
        for &c in &children[n] {
            if !seen[c] {
                seen[c] = true;
                queue.push_back(c);
            }
        }
    }
    count
}

fn unlockable(children: &[Vec<usize>], prereqs: &[Vec<usize>], root: usize) -> usize {
    let mut open = vec![false; children.len()];
    let mut waiting: Vec<usize> = prereqs.iter().map(Vec::len).collect();
    let mut queue = VecDeque::from([root]);
    open[root] = true;
    let mut count = 0;
    while let Some(n) = queue.pop_front() {
        count += 1;
        for &c in &children[n] {
            waiting[c] = waiting[c].saturating_sub(1);
            if waiting[c] == 0 && !open[c] {
                open[c] = true;
                queue.push_back(c);
            }
        }
    }
    count
}

/// Kahn's algorithm: a cycle leaves nodes with unresolved in-degree.
fn has_cycle(children: &[Vec<usize>]) -> bool {
    let mut indegree = vec![0usize; children.len()];
    for kids in children {
        for &c in kids {
            indegree[c] += 1;
        }
    }
    let mut queue: VecDeque<usize> = (0..children.len()).filter(|&i| indegree[i] == 0).collect();
    let mut visited = 0;
    while let Some(n) = queue.pop_front() {
        visited += 1;
        for &c in &children[n] {
            indegree[c] -= 1;
            if indegree[c] == 0 {
                queue.push_back(c);
            }
        }
    }
    visited < children.len()
}
