//! Flat node arena.
//!
//! Nodes live in a `Vec` and refer to each other by [`NodeIdx`]. All edge
//! mutation goes through [`NodeTable::link`] / [`NodeTable::unlink`], which
//! update both endpoints so `children` and `prerequisites` stay transposed.

use std::collections::VecDeque;

use hashbrown::HashMap;

use super::node::{NodeIdx, TreeNode};

#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    nodes: Vec<TreeNode>,
    by_id: HashMap<String, NodeIdx>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Returns `None` when the id is already present.
    pub fn insert(
        &mut self,
        id: &str,
        name: &str,
        tier: &str,
        tier_index: usize,
        theme: &str,
    ) -> Option<NodeIdx> {
        if self.by_id.contains_key(id) {
            return None;
        }
        let idx = NodeIdx(self.nodes.len() as u32);
        let node = TreeNode::new(idx, id, tier, tier_index)
            .with_name(name)
            .with_theme(theme);
        self.nodes.push(node);
        self.by_id.insert(id.to_string(), idx);
        Some(idx)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Panics on a handle from another table.
    pub fn get(&self, idx: NodeIdx) -> &TreeNode {
        &self.nodes[idx.index()]
    }

    pub fn get_mut(&mut self, idx: NodeIdx) -> &mut TreeNode {
        &mut self.nodes[idx.index()]
    }

    pub fn lookup(&self, id: &str) -> Option<NodeIdx> {
        self.by_id.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }

    pub fn indices(&self) -> impl Iterator<Item = NodeIdx> + use<> {
        (0..self.nodes.len() as u32).map(NodeIdx)
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Add `parent -> child`. No-op (returns `false`) for self loops and
    /// edges that already exist.
    pub fn link(&mut self, parent: NodeIdx, child: NodeIdx) -> bool {
        if parent == child || self.get(parent).children.contains(&child) {
            return false;
        }
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].prerequisites.push(parent);
        true
    }

    /// Remove `parent -> child` from both endpoints.
    pub fn unlink(&mut self, parent: NodeIdx, child: NodeIdx) -> bool {
        let children = &mut self.nodes[parent.index()].children;
        let Some(pos) = children.iter().position(|&c| c == child) else {
            return false;
        };
        children.remove(pos);
        self.nodes[child.index()].prerequisites.retain(|p| *p != parent);
        true
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Nodes reachable from `start` along children edges, indexed by handle.
    pub fn reachable_from(&self, start: NodeIdx) -> Vec<bool> {
        let mut seen = vec![false; self.nodes.len()];
        let mut queue = VecDeque::from([start]);
        seen[start.index()] = true;
        while let Some(idx) = queue.pop_front() {
            for &child in &self.get(idx).children {
                if !seen[child.index()] {
                    seen[child.index()] = true;
                    queue.push_back(child);
                }
            }
        }
        seen
    }

    /// Nodes a player could unlock starting from `root`: a node unlocks once
    /// every one of its prerequisites is unlocked. Nodes on a cycle or behind
    /// an unreachable prerequisite stay locked.
    pub fn unlocked_from(&self, root: NodeIdx) -> Vec<bool> {
        let mut unlocked = vec![false; self.nodes.len()];
        let mut pending: Vec<usize> = self.nodes.iter().map(|n| n.prerequisites.len()).collect();
        let mut queue = VecDeque::from([root]);
        unlocked[root.index()] = true;
        while let Some(idx) = queue.pop_front() {
            for &child in &self.get(idx).children {
                let slot = &mut pending[child.index()];
                *slot = slot.saturating_sub(1);
                if *slot == 0 && !unlocked[child.index()] {
                    unlocked[child.index()] = true;
                    queue.push_back(child);
                }
            }
        }
        unlocked
    }

    /// True when `candidate` is `ancestor` or lies below it.
    pub fn is_descendant(&self, ancestor: NodeIdx, candidate: NodeIdx) -> bool {
        if ancestor == candidate {
            return true;
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![ancestor];
        while let Some(idx) = stack.pop() {
            for &child in &self.get(idx).children {
                if child == candidate {
                    return true;
                }
                if !seen[child.index()] {
                    seen[child.index()] = true;
                    stack.push(child);
                }
            }
        }
        false
    }

    /// Kahn's algorithm over the whole table.
    pub fn has_cycle(&self) -> bool {
        let mut indegree: Vec<usize> = self.nodes.iter().map(|n| n.prerequisites.len()).collect();
        let mut queue: VecDeque<NodeIdx> = self
            .indices()
            .filter(|idx| indegree[idx.index()] == 0)
            .collect();
        let mut visited = 0;
        while let Some(idx) = queue.pop_front() {
            visited += 1;
            for &child in &self.get(idx).children {
                indegree[child.index()] -= 1;
                if indegree[child.index()] == 0 {
                    queue.push_back(child);
                }
            }
        }
        visited < self.nodes.len()
    }

    /// Reset every reachable node's depth to its shortest children-distance
    /// from `root`. Unreachable nodes keep their current depth.
    pub fn recompute_depths(&mut self, root: NodeIdx) {
        let mut seen = vec![false; self.nodes.len()];
        let mut queue = VecDeque::from([root]);
        seen[root.index()] = true;
        self.nodes[root.index()].depth = 0;
        while let Some(idx) = queue.pop_front() {
            let depth = self.nodes[idx.index()].depth;
            let children = self.nodes[idx.index()].children.clone();
            for child in children {
                if !seen[child.index()] {
                    seen[child.index()] = true;
                    self.nodes[child.index()].depth = depth + 1;
                    queue.push_back(child);
                }
            }
        }
    }

    /// Check the transpose invariant. Used by tests and the validator.
    pub fn links_consistent(&self) -> bool {
        self.nodes.iter().all(|node| {
            node.children
                .iter()
                .all(|c| self.get(*c).prerequisites.contains(&node.idx))
                && node
                    .prerequisites
                    .iter()
                    .all(|p| self.get(*p).children.contains(&node.idx))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(n: usize) -> (NodeTable, Vec<NodeIdx>) {
        let mut t = NodeTable::new();
        let ids = (0..n)
            .map(|i| {
                let id = format!("n{i}");
                t.insert(&id, &id, "Novice", 0, "fire").unwrap()
            })
            .collect();
        (t, ids)
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let mut t = NodeTable::new();
        assert!(t.insert("a", "A", "Novice", 0, "fire").is_some());
        assert!(t.insert("a", "A2", "Adept", 2, "frost").is_none());
        assert_eq!(t.len(), 1);
        assert_eq!(t.lookup("a"), Some(NodeIdx(0)));
    }

    #[test]
    fn test_link_and_unlink_stay_transposed() {
        let (mut t, n) = table(3);
        assert!(t.link(n[0], n[1]));
        assert!(!t.link(n[0], n[1]));
        assert!(!t.link(n[2], n[2]));
        assert!(t.link(n[0], n[2]));
        assert!(t.link(n[1], n[2]));
        assert!(t.links_consistent());
        assert_eq!(t.get(n[2]).prerequisites(), &[n[0], n[1]]);

        assert!(t.unlink(n[0], n[2]));
        assert!(!t.unlink(n[0], n[2]));
        assert!(t.links_consistent());
        assert_eq!(t.get(n[2]).prerequisites(), &[n[1]]);
    }

    #[test]
    fn test_unlock_requires_all_prerequisites() {
        let (mut t, n) = table(4);
        t.link(n[0], n[1]);
        t.link(n[1], n[3]);
        t.link(n[2], n[3]); // n2 itself is never reachable
        let reach = t.reachable_from(n[0]);
        let unlocked = t.unlocked_from(n[0]);
        assert!(reach[n[3].index()]);
        assert!(!unlocked[n[3].index()]);
        assert!(unlocked[n[1].index()]);
    }

    #[test]
    fn test_descendant_and_cycle_detection() {
        let (mut t, n) = table(3);
        t.link(n[0], n[1]);
        t.link(n[1], n[2]);
        assert!(t.is_descendant(n[0], n[2]));
        assert!(!t.is_descendant(n[2], n[0]));
        assert!(!t.has_cycle());
        t.link(n[2], n[0]);
        assert!(t.has_cycle());
    }

    #[test]
    fn test_recompute_depths_uses_shortest_path() {
        let (mut t, n) = table(4);
        t.link(n[0], n[1]);
        t.link(n[1], n[2]);
        t.link(n[2], n[3]);
        t.link(n[0], n[3]);
        t.get_mut(n[3]).depth = 9;
        t.recompute_depths(n[0]);
        assert_eq!(t.get(n[2]).depth, 2);
        assert_eq!(t.get(n[3]).depth, 1);
    }
}
