//! Reachability repair.
//!
//! A bounded fixed-point loop over the unlock simulation. Each pass finds
//! every locked node and replaces its locked prerequisites with one edge from
//! the shallowest unlocked node that still has room. A pass that fixes
//! nothing switches to the aggressive fallback, which hangs every remaining
//! locked node directly off the root. Afterwards every node is unlocked.

use crate::config::TierOrder;
use crate::model::{NodeIdx, NodeTable};

/// Loop state. `Scanning` counts passes already run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepairState {
    Scanning { pass: usize },
    Aggressive,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Passes that relinked at least one node.
    pub passes: usize,
    /// Nodes relinked by regular passes or the fallback.
    pub relinked: usize,
    pub aggressive_fallback: bool,
}

impl RepairReport {
    pub fn changed(&self) -> bool {
        self.relinked > 0
    }
}

pub struct Repairer<'a> {
    pub max_children: usize,
    pub max_passes: usize,
    pub order: TierOrder,
    pub bucket: &'a str,
}

impl Repairer<'_> {
    pub fn run(&self, table: &mut NodeTable, root: NodeIdx) -> RepairReport {
        let mut report = RepairReport::default();
        let mut state = RepairState::Scanning { pass: 0 };

        loop {
            state = match state {
                RepairState::Scanning { pass } if pass >= self.max_passes => RepairState::Aggressive,
                RepairState::Scanning { pass } => {
                    let unlocked = table.unlocked_from(root);
                    let locked: Vec<NodeIdx> =
                        table.indices().filter(|i| !unlocked[i.index()]).collect();
                    if locked.is_empty() {
                        RepairState::Done
                    } else {
                        tracing::debug!(bucket = self.bucket, pass = pass + 1, locked = locked.len(), "repair pass");
                        let fixed = self.pass(table, root, &unlocked, &locked);
                        if fixed == 0 {
                            RepairState::Aggressive
                        } else {
                            report.passes += 1;
                            report.relinked += fixed;
                            RepairState::Scanning { pass: pass + 1 }
                        }
                    }
                }
                RepairState::Aggressive => {
                    let relinked = attach_locked_to_root(table, root);
                    if relinked > 0 {
                        tracing::warn!(bucket = self.bucket, nodes = relinked, "aggressive repair: linked locked nodes to root");
                        report.relinked += relinked;
                        report.aggressive_fallback = true;
                    }
                    RepairState::Done
                }
                RepairState::Done => break,
            };
        }
        report
    }

    /// One pass over the nodes locked at its start. Returns how many were
    /// relinked.
    fn pass(&self, table: &mut NodeTable, root: NodeIdx, unlocked: &[bool], locked: &[NodeIdx]) -> usize {
        let mut fixed = 0;
        for &node in locked {
            if node == root {
                continue;
            }
            let Some(parent) = self.replacement_parent(table, unlocked, node) else {
                continue;
            };
            let blocking: Vec<NodeIdx> = table
                .get(node)
                .prerequisites()
                .iter()
                .copied()
                .filter(|p| !unlocked[p.index()])
                .collect();
            for old in blocking {
                table.unlink(old, node);
            }
            table.link(parent, node);
            let depth = table.get(parent).depth + 1;
            table.get_mut(node).depth = depth;
            fixed += 1;
        }
        fixed
    }

    /// Shallowest unlocked node with room that respects tier order. Ties keep
    /// handle order.
    fn replacement_parent(&self, table: &NodeTable, unlocked: &[bool], node: NodeIdx) -> Option<NodeIdx> {
        let child = table.get(node);
        table
            .indices()
            .filter(|&c| c != node && unlocked[c.index()])
            .filter(|&c| table.get(c).child_count() < self.max_children)
            .filter(|&c| self.order.allows(table.get(c), child))
            .min_by_key(|c| table.get(*c).depth)
    }
}

/// Replace every locked node's prerequisites with the root.
fn attach_locked_to_root(table: &mut NodeTable, root: NodeIdx) -> usize {
    let unlocked = table.unlocked_from(root);
    let locked: Vec<NodeIdx> = table
        .indices()
        .filter(|i| *i != root && !unlocked[i.index()])
        .collect();
    for &node in &locked {
        let old: Vec<NodeIdx> = table.get(node).prerequisites().to_vec();
        for parent in old {
            table.unlink(parent, node);
        }
        table.link(root, node);
        table.get_mut(node).depth = 1;
    }
    locked.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::testing::tree;

    fn repairer(max_children: usize) -> Repairer<'static> {
        Repairer {
            max_children,
            max_passes: 10,
            order: TierOrder { strict: true, allow_same_tier: true },
            bucket: "test",
        }
    }

    fn all_unlocked(table: &NodeTable) -> bool {
        table.unlocked_from(NodeIdx(0)).into_iter().all(|u| u)
    }

    #[test]
    fn test_clean_tree_needs_no_repair() {
        let mut table = tree(&[
            ("root", 0, "fire", None),
            ("a", 1, "fire", Some("root")),
            ("b", 2, "fire", Some("a")),
        ]);
        let report = repairer(3).run(&mut table, NodeIdx(0));
        assert_eq!(report, RepairReport::default());
        assert!(!report.changed());
    }

    #[test]
    fn test_replaces_blocking_prerequisite() {
        let mut table = tree(&[
            ("root", 0, "fire", None),
            ("a", 1, "fire", Some("root")),
            ("island", 1, "frost", None),
            ("b", 2, "frost", Some("island")),
        ]);
        // `island` was marked root by the fixture; it is just detached here.
        let island = table.lookup("island").unwrap();
        table.get_mut(island).is_root = false;

        let report = repairer(3).run(&mut table, NodeIdx(0));
        assert!(all_unlocked(&table));
        assert!(table.links_consistent());
        assert!(!report.aggressive_fallback);
        // Pass 1 relinks both locked nodes; `b` drops its locked prerequisite.
        assert_eq!(report.passes, 1);
        assert_eq!(report.relinked, 2);
        let b = table.get(table.lookup("b").unwrap());
        assert_eq!(b.prerequisites(), &[NodeIdx(0)]);
    }

    #[test]
    fn test_cycle_is_broken() {
        let mut table = tree(&[
            ("root", 0, "fire", None),
            ("a", 1, "fire", Some("root")),
            ("x", 2, "fire", Some("a")),
            ("y", 2, "fire", Some("x")),
        ]);
        let x = table.lookup("x").unwrap();
        let y = table.lookup("y").unwrap();
        table.link(y, x);
        assert!(table.has_cycle());

        repairer(3).run(&mut table, NodeIdx(0));
        assert!(all_unlocked(&table));
        assert!(!table.has_cycle());
    }

    #[test]
    fn test_full_tree_falls_back_to_root() {
        let mut table = tree(&[
            ("root", 0, "fire", None),
            ("a", 1, "fire", Some("root")),
            ("x", 1, "fire", Some("a")),
        ]);
        let a = table.lookup("a").unwrap();
        let x = table.lookup("x").unwrap();
        table.link(x, a);

        // Only the root is unlocked and it is already full.
        let report = repairer(1).run(&mut table, NodeIdx(0));
        assert!(report.aggressive_fallback);
        assert_eq!(report.passes, 0);
        assert_eq!(report.relinked, 2);
        assert!(all_unlocked(&table));
        assert!(!table.has_cycle());
        assert_eq!(table.get(x).prerequisites(), &[NodeIdx(0)]);
        assert_eq!(table.get(NodeIdx(0)).child_count(), 2);
    }
}
