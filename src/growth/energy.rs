//! Branching-energy controller.
//!
//! Tracks, for the path ending at each linked node, how many consecutive
//! straight (single-child) connections led to it and how much "pressure to
//! branch" has accumulated. Trees grown with it show runs of straight growth
//! punctuated by bursts instead of independent per-node coin flips.
//!
//! The controller only sees node handles and connection events. State is
//! written once per node when it is linked and read afterwards.

use hashbrown::HashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::BuildRng;
use crate::model::NodeIdx;
use crate::{Error, Result};

// ============================================================================
// Config
// ============================================================================

/// Tuning for [`BranchingEnergy`]. Immutable once a build starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchingEnergyConfig {
    /// Default: `true`. When off, branching falls back to plain coin flips.
    pub enabled: bool,
    /// Straight steps required before a branch is allowed. Default: 2.
    pub min_straight: u32,
    /// Straight steps after which a branch is forced. Default: 5.
    pub max_straight: u32,
    /// Energy gained per straight step. Default: 0.3.
    pub energy_per_node: f64,
    /// Energy needed to branch between the two thresholds. Default: 1.0.
    pub energy_to_branch: f64,
    /// Noise applied to branch decisions, in `[0, 1]`. Default: 0.3.
    pub randomness: f64,
}

impl Default for BranchingEnergyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_straight: 2,
            max_straight: 5,
            energy_per_node: 0.3,
            energy_to_branch: 1.0,
            randomness: 0.3,
        }
    }
}

impl BranchingEnergyConfig {
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_straight > self.max_straight {
            return Err(Error::invalid_config(
                "branching_energy.min_straight",
                self.min_straight,
                format!("must not exceed max_straight ({})", self.max_straight),
            ));
        }
        if !(self.energy_to_branch > 0.0) {
            return Err(Error::invalid_config(
                "branching_energy.energy_to_branch",
                self.energy_to_branch,
                "must be greater than 0",
            ));
        }
        if !(self.energy_per_node >= 0.0) || !self.energy_per_node.is_finite() {
            return Err(Error::invalid_config(
                "branching_energy.energy_per_node",
                self.energy_per_node,
                "must be a non-negative number",
            ));
        }
        if !(0.0..=1.0).contains(&self.randomness) {
            return Err(Error::invalid_config(
                "branching_energy.randomness",
                self.randomness,
                "must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Per-path straight-count and energy bookkeeping.
#[derive(Debug, Clone)]
pub struct BranchingEnergy {
    config: BranchingEnergyConfig,
    straight: HashMap<NodeIdx, u32>,
    energy: HashMap<NodeIdx, f64>,
}

impl BranchingEnergy {
    pub fn new(config: BranchingEnergyConfig) -> Self {
        Self {
            config,
            straight: HashMap::new(),
            energy: HashMap::new(),
        }
    }

    pub fn config(&self) -> &BranchingEnergyConfig {
        &self.config
    }

    pub fn start_path(&mut self, root: NodeIdx) {
        self.straight.insert(root, 0);
        self.energy.insert(root, 0.0);
    }

    /// Record `parent -> child`. A branch resets the straight count and
    /// carries half of the surplus energy over; a straight step accumulates.
    pub fn record_connection(&mut self, parent: NodeIdx, child: NodeIdx, is_branch: bool) {
        if !self.config.enabled {
            return;
        }
        let parent_straight = self.straight_count(parent);
        let parent_energy = self.energy(parent);

        if is_branch {
            self.straight.insert(child, 0);
            self.energy.insert(
                child,
                (parent_energy - self.config.energy_to_branch).max(0.0) * 0.5,
            );
        } else {
            self.straight.insert(child, parent_straight + 1);
            self.energy
                .insert(child, parent_energy + self.config.energy_per_node);
        }
    }

    /// Unknown nodes read as a fresh path.
    pub fn straight_count(&self, node: NodeIdx) -> u32 {
        self.straight.get(&node).copied().unwrap_or(0)
    }

    pub fn energy(&self, node: NodeIdx) -> f64 {
        self.energy.get(&node).copied().unwrap_or(0.0)
    }

    pub fn can_branch(&self, node: NodeIdx) -> bool {
        if !self.config.enabled {
            return true;
        }
        let straight = self.straight_count(node);
        if straight < self.config.min_straight {
            return false;
        }
        if straight >= self.config.max_straight {
            return true;
        }
        self.energy(node) >= self.config.energy_to_branch
    }

    pub fn must_branch(&self, node: NodeIdx) -> bool {
        self.config.enabled && self.straight_count(node) >= self.config.max_straight
    }

    /// Branch decision for the path ending at `node`.
    ///
    /// Between the thresholds the probability blends energy progress (60%)
    /// with straight-count progress (40%), scales by `base_probability`, and
    /// is perturbed by up to `±randomness / 2` before the final flip.
    pub fn should_branch(&self, node: NodeIdx, base_probability: f64, rng: &mut BuildRng) -> bool {
        let base = base_probability.clamp(0.0, 1.0);
        if !self.config.enabled {
            return rng.random::<f64>() < base;
        }
        if !self.can_branch(node) {
            return false;
        }
        if self.must_branch(node) {
            return true;
        }

        let cfg = &self.config;
        let energy_factor = (self.energy(node) / cfg.energy_to_branch).min(1.0);
        let span = cfg.max_straight.saturating_sub(cfg.min_straight).max(1) as f64;
        let progress =
            self.straight_count(node).saturating_sub(cfg.min_straight) as f64 / span;

        let mut probability = (0.6 * energy_factor + 0.4 * progress) * base;
        if cfg.randomness > 0.0 {
            let noise = (rng.random::<f64>() - 0.5) * 2.0 * cfg.randomness * 0.5;
            probability = (probability + noise).clamp(0.0, 1.0);
        }
        rng.random::<f64>() < probability
    }

    /// Children to grow from `node`: 1 when not branching, otherwise
    /// `2..=max_children` biased upward by energy beyond the branch threshold.
    pub fn calculate_children_count(
        &self,
        node: NodeIdx,
        max_children: usize,
        base_probability: f64,
        rng: &mut BuildRng,
    ) -> usize {
        if max_children <= 1 {
            return max_children;
        }
        if !self.should_branch(node, base_probability, rng) {
            return 1;
        }

        let cfg = &self.config;
        if !cfg.enabled || cfg.randomness >= 0.8 {
            return rng.random_range(2..=max_children);
        }

        let excess = (self.energy(node) - cfg.energy_to_branch).max(0.0);
        let bonus = if cfg.energy_per_node > 0.0 {
            (excess / cfg.energy_per_node) as usize
        } else {
            0
        };
        let mut count = 2 + bonus;
        if cfg.randomness > 0.0 {
            let headroom = max_children.saturating_sub(2 + bonus);
            let extra = rng.random_range(0..=headroom) as f64 * cfg.randomness;
            count += extra as usize;
        }
        count.clamp(2, max_children)
    }

    /// Current `(straight_count, energy)` for diagnostics.
    pub fn state(&self, node: NodeIdx) -> (u32, f64) {
        (self.straight_count(node), self.energy(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::growth::seeded_rng;

    const ROOT: NodeIdx = NodeIdx(0);

    fn chain(energy: &mut BranchingEnergy, len: u32) -> NodeIdx {
        energy.start_path(ROOT);
        let mut prev = ROOT;
        for i in 1..=len {
            let next = NodeIdx(i);
            energy.record_connection(prev, next, false);
            prev = next;
        }
        prev
    }

    #[test]
    fn test_straight_steps_accumulate() {
        let mut energy = BranchingEnergy::new(BranchingEnergyConfig::default());
        let tip = chain(&mut energy, 3);
        let (straight, e) = energy.state(tip);
        assert_eq!(straight, 3);
        assert!((e - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_branch_resets_and_carries_half_surplus() {
        let mut energy = BranchingEnergy::new(BranchingEnergyConfig::default());
        let tip = chain(&mut energy, 5); // energy 1.5
        energy.record_connection(tip, NodeIdx(99), true);
        let (straight, e) = energy.state(NodeIdx(99));
        assert_eq!(straight, 0);
        assert!((e - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_thresholds() {
        let mut energy = BranchingEnergy::new(BranchingEnergyConfig::default());
        let tip = chain(&mut energy, 1);
        assert!(!energy.can_branch(tip));
        assert!(!energy.must_branch(tip));

        let tip = chain(&mut energy, 5);
        assert!(energy.can_branch(tip));
        assert!(energy.must_branch(tip));

        // 3 steps: between thresholds, energy 0.9 < 1.0
        let tip = chain(&mut energy, 3);
        assert!(!energy.can_branch(tip));
    }

    #[test]
    fn test_forced_and_blocked_decisions() {
        let mut rng = seeded_rng(7);
        let mut energy = BranchingEnergy::new(BranchingEnergyConfig::default());
        let long = chain(&mut energy, 6);
        for _ in 0..20 {
            assert!(energy.should_branch(long, 0.0, &mut rng));
        }
        let short = NodeIdx(1);
        for _ in 0..20 {
            assert!(!energy.should_branch(short, 1.0, &mut rng));
        }
    }

    #[test]
    fn test_disabled_ignores_records() {
        let mut rng = seeded_rng(1);
        let mut energy = BranchingEnergy::new(BranchingEnergyConfig::disabled());
        energy.record_connection(ROOT, NodeIdx(1), false);
        assert_eq!(energy.state(NodeIdx(1)), (0, 0.0));
        assert!(energy.can_branch(NodeIdx(1)));
        assert!(!energy.must_branch(NodeIdx(1)));
        assert!(!energy.should_branch(NodeIdx(1), 0.0, &mut rng));
        assert!(energy.should_branch(NodeIdx(1), 1.0, &mut rng));
    }

    #[test]
    fn test_children_count_bounds() {
        let mut rng = seeded_rng(42);
        let mut energy = BranchingEnergy::new(BranchingEnergyConfig::default());
        let tip = chain(&mut energy, 8);
        assert_eq!(energy.calculate_children_count(tip, 1, 1.0, &mut rng), 1);
        assert_eq!(energy.calculate_children_count(tip, 0, 1.0, &mut rng), 0);
        for _ in 0..50 {
            let n = energy.calculate_children_count(tip, 4, 1.0, &mut rng);
            assert!((2..=4).contains(&n), "got {n}");
        }
        assert_eq!(energy.calculate_children_count(NodeIdx(500), 4, 1.0, &mut rng), 1);
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let cfg = BranchingEnergyConfig { min_straight: 6, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig { .. })));
        let cfg = BranchingEnergyConfig { energy_to_branch: 0.0, ..Default::default() };
        assert!(cfg.validate().is_err());
        assert!(BranchingEnergyConfig::default().validate().is_ok());
    }
}
