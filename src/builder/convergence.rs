//! Convergence: nodes that need more than one prerequisite.
//!
//! Two entry points. [`maybe_add_convergence`] runs while connecting and
//! probabilistically adds prerequisites from a different theme to freshly
//! linked nodes at or above the convergence tier. [`enforce_floor`] runs
//! after orphan attachment and tops up every node still below its tier's
//! required minimum.
//!
//! Every candidate must already be unlocked, have spare capacity, sit at a
//! shallower depth, respect tier ordering, and not be a descendant of the
//! node (which would close a cycle).

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::config::TierOrder;
use crate::growth::BuildRng;
use crate::model::{NodeIdx, NodeTable};
use crate::{Error, Result};

/// Per-tier convergence tables, indexed by tier. Tiers past the end of a
/// table use its last entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceRules {
    /// Scales `convergence_chance` per tier.
    pub chance_multipliers: Vec<f64>,
    /// No node gains extra prerequisites beyond this count.
    pub max_prerequisites: Vec<usize>,
    /// Floor enforced after connection; below it convergence is forced.
    pub required_minimum: Vec<usize>,
}

impl Default for ConvergenceRules {
    fn default() -> Self {
        Self {
            chance_multipliers: vec![0.5, 1.0, 1.5, 2.0, 10.0],
            max_prerequisites: vec![1, 2, 2, 3, 4],
            required_minimum: vec![0, 0, 0, 2, 3],
        }
    }
}

fn lookup<T: Copy>(table: &[T], tier: usize, fallback: T) -> T {
    table.get(tier).or(table.last()).copied().unwrap_or(fallback)
}

impl ConvergenceRules {
    pub fn chance_multiplier(&self, tier: usize) -> f64 {
        lookup(&self.chance_multipliers, tier, 1.0)
    }

    pub fn max_prerequisites(&self, tier: usize) -> usize {
        lookup(&self.max_prerequisites, tier, 2)
    }

    pub fn required_minimum(&self, tier: usize) -> usize {
        lookup(&self.required_minimum, tier, 0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chance_multipliers.is_empty() || self.max_prerequisites.is_empty() {
            return Err(Error::invalid_config(
                "convergence",
                "[]",
                "chance_multipliers and max_prerequisites need at least one entry",
            ));
        }
        if let Some(bad) = self.chance_multipliers.iter().find(|m| !(**m >= 0.0)) {
            return Err(Error::invalid_config(
                "convergence.chance_multipliers",
                bad,
                "must not be negative",
            ));
        }
        for (tier, &floor) in self.required_minimum.iter().enumerate() {
            let cap = self.max_prerequisites(tier);
            if floor > cap {
                return Err(Error::invalid_config(
                    "convergence.required_minimum",
                    floor,
                    format!("tier {tier} floor exceeds its max_prerequisites ({cap})"),
                ));
            }
        }
        Ok(())
    }
}

/// What the convergence passes may link.
#[derive(Debug, Clone, Copy)]
pub struct ConvergencePolicy<'a> {
    pub rules: &'a ConvergenceRules,
    pub chance: f64,
    pub max_children: usize,
    pub order: TierOrder,
}

impl ConvergencePolicy<'_> {
    fn eligible(&self, table: &NodeTable, unlocked: &[bool], node: NodeIdx, candidate: NodeIdx) -> bool {
        let n = table.get(node);
        let c = table.get(candidate);
        candidate != node
            && unlocked[candidate.index()]
            && c.child_count() < self.max_children
            && c.depth < n.depth
            && !n.prerequisites().contains(&candidate)
            && self.order.allows(c, n)
            && !table.is_descendant(node, candidate)
    }
}

/// Maybe give a freshly linked `node` extra prerequisites of other themes.
/// Returns the number of links added.
pub fn maybe_add_convergence(
    table: &mut NodeTable,
    root: NodeIdx,
    node: NodeIdx,
    policy: &ConvergencePolicy<'_>,
    rng: &mut BuildRng,
) -> usize {
    let (tier, have) = {
        let n = table.get(node);
        (n.tier_index, n.prerequisites().len())
    };
    let rules = policy.rules;
    let required = rules.required_minimum(tier);
    let forced = have < required;
    let chance = (policy.chance * rules.chance_multiplier(tier)).min(1.0);

    if !forced && rng.random::<f64>() >= chance {
        return 0;
    }
    let cap = rules.max_prerequisites(tier);
    if have >= cap {
        return 0;
    }

    let wanted = required.saturating_sub(have).max(1);
    let unlocked = table.unlocked_from(root);
    let mut added = 0;
    for _ in 0..wanted {
        if table.get(node).prerequisites().len() >= cap {
            break;
        }
        let layer = nearest_other_theme(table, &unlocked, node, policy);
        let Some(&extra) = layer.choose(rng) else {
            break;
        };
        table.link(extra, node);
        added += 1;
    }

    if added > 0 {
        let n = table.get(node);
        tracing::debug!(node = %n.id, tier = %n.tier, prerequisites = n.prerequisites().len(), "convergence added");
    }
    added
}

/// Eligible candidates of another theme on the deepest layer that has any,
/// in handle order.
fn nearest_other_theme(
    table: &NodeTable,
    unlocked: &[bool],
    node: NodeIdx,
    policy: &ConvergencePolicy<'_>,
) -> Vec<NodeIdx> {
    let theme = &table.get(node).theme;
    let eligible: Vec<NodeIdx> = table
        .indices()
        .filter(|&c| table.get(c).theme != *theme && policy.eligible(table, unlocked, node, c))
        .collect();
    let Some(nearest) = eligible.iter().map(|c| table.get(*c).depth).max() else {
        return Vec::new();
    };
    eligible.into_iter().filter(|c| table.get(*c).depth == nearest).collect()
}

/// Eligible candidates ordered other theme first, then deeper, then by id.
fn ranked_for_floor(
    table: &NodeTable,
    unlocked: &[bool],
    node: NodeIdx,
    policy: &ConvergencePolicy<'_>,
) -> Vec<NodeIdx> {
    let theme = &table.get(node).theme;
    let mut ranked: Vec<NodeIdx> = table
        .indices()
        .filter(|&c| policy.eligible(table, unlocked, node, c))
        .collect();
    ranked.sort_by(|&a, &b| {
        let (a, b) = (table.get(a), table.get(b));
        (a.theme == *theme)
            .cmp(&(b.theme == *theme))
            .then(b.depth.cmp(&a.depth))
            .then(a.id.cmp(&b.id))
    });
    ranked
}

/// Outcome of [`enforce_floor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FloorReport {
    pub links_added: usize,
    /// Nodes that stayed below their floor for lack of candidates.
    pub shortfalls: usize,
}

/// Top up every non-root node below its tier's required minimum.
///
/// Candidates of another theme come first, then deeper ones, then lower ids.
pub fn enforce_floor(table: &mut NodeTable, root: NodeIdx, policy: &ConvergencePolicy<'_>) -> FloorReport {
    let mut report = FloorReport::default();
    let rules = policy.rules;

    for node in table.indices() {
        if node == root {
            continue;
        }
        let required = rules.required_minimum(table.get(node).tier_index);
        let have = table.get(node).prerequisites().len();
        if have >= required {
            continue;
        }

        let unlocked = table.unlocked_from(root);
        let picks: Vec<NodeIdx> = ranked_for_floor(table, &unlocked, node, policy)
            .into_iter()
            .take(required - have)
            .collect();

        for extra in picks {
            if table.link(extra, node) {
                report.links_added += 1;
            }
        }
        if table.get(node).prerequisites().len() < required {
            report.shortfalls += 1;
            let n = table.get(node);
            tracing::warn!(node = %n.id, tier = %n.tier, required, have = n.prerequisites().len(), "convergence floor not met");
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::growth::seeded_rng;
    use crate::shapes::testing::tree;

    fn policy(rules: &ConvergenceRules, chance: f64) -> ConvergencePolicy<'_> {
        ConvergencePolicy {
            rules,
            chance,
            max_children: 3,
            order: TierOrder { strict: true, allow_same_tier: true },
        }
    }

    /// Root with fire, frost and shock chains two deep, plus a master item.
    fn sample() -> NodeTable {
        tree(&[
            ("root", 0, "arcane", None),
            ("fire1", 1, "fire", Some("root")),
            ("frost1", 1, "frost", Some("root")),
            ("shock1", 1, "shock", Some("root")),
            ("fire2", 2, "fire", Some("fire1")),
            ("frost2", 2, "frost", Some("frost1")),
            ("shock2", 2, "shock", Some("shock1")),
            ("inferno", 4, "fire", Some("fire2")),
        ])
    }

    #[test]
    fn test_rules_reuse_last_entry() {
        let rules = ConvergenceRules::default();
        assert_eq!(rules.required_minimum(4), 3);
        assert_eq!(rules.required_minimum(9), 3);
        assert_eq!(rules.max_prerequisites(7), 4);
        assert_eq!(rules.chance_multiplier(0), 0.5);
    }

    #[test]
    fn test_forced_at_top_tier_uses_other_themes() {
        let mut table = sample();
        let rules = ConvergenceRules::default();
        let inferno = table.lookup("inferno").unwrap();
        let added = maybe_add_convergence(&mut table, NodeIdx(0), inferno, &policy(&rules, 0.0), &mut seeded_rng(3));
        assert_eq!(added, 2);

        let prereqs: Vec<&str> = table
            .get(inferno)
            .prerequisites()
            .iter()
            .map(|p| table.get(*p).id.as_str())
            .collect();
        assert_eq!(prereqs.len(), 3);
        assert_eq!(prereqs[0], "fire2");
        for extra in &prereqs[1..] {
            assert!(["frost2", "shock2"].contains(extra), "{extra}");
        }
        assert!(!table.has_cycle());
        assert!(table.links_consistent());
    }

    #[test]
    fn test_zero_chance_below_floor_tiers_adds_nothing() {
        let mut table = sample();
        let rules = ConvergenceRules::default();
        let fire2 = table.lookup("fire2").unwrap();
        for seed in 0..10 {
            let added = maybe_add_convergence(&mut table, NodeIdx(0), fire2, &policy(&rules, 0.0), &mut seeded_rng(seed));
            assert_eq!(added, 0);
        }
    }

    #[test]
    fn test_never_links_a_descendant() {
        let mut table = tree(&[
            ("root", 0, "arcane", None),
            ("a", 1, "fire", Some("root")),
            ("b", 3, "frost", Some("a")),
            ("d", 1, "shock", Some("root")),
        ]);
        let b = table.lookup("b").unwrap();
        let d = table.lookup("d").unwrap();
        // `d` is shallow but also hangs below `b`.
        table.link(b, d);

        let rules = ConvergenceRules::default();
        let report = enforce_floor(&mut table, NodeIdx(0), &policy(&rules, 0.4));
        let prereqs: Vec<&str> = table
            .get(b)
            .prerequisites()
            .iter()
            .map(|p| table.get(*p).id.as_str())
            .collect();
        assert_eq!(prereqs, vec!["a", "root"]);
        assert!(!table.has_cycle());
        assert_eq!(report.shortfalls, 0);
    }

    #[test]
    fn test_enforce_floor_prefers_other_theme_then_depth_then_id() {
        let mut table = sample();
        let rules = ConvergenceRules::default();
        let report = enforce_floor(&mut table, NodeIdx(0), &policy(&rules, 0.4));
        let inferno = table.lookup("inferno").unwrap();
        let prereqs: Vec<&str> = table
            .get(inferno)
            .prerequisites()
            .iter()
            .map(|p| table.get(*p).id.as_str())
            .collect();
        assert_eq!(prereqs, vec!["fire2", "frost2", "shock2"]);
        assert_eq!(report, FloorReport { links_added: 2, shortfalls: 0 });
    }
}
