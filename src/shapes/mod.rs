//! # Growth Shapes
//!
//! A growth shape decides *where* the next node hangs and *how* a node fans
//! out: parent selection, children count, branch/no-branch, and the angle of
//! each child relative to its parent. Shapes are created per bucket through
//! the [`ShapeRegistry`](crate::registry::ShapeRegistry) and draw every random
//! decision from the build's [`BuildRng`].
//!
//! | Shape | Character |
//! |-------|-----------|
//! | `organic` | Varied, asymmetric, theme-clustered |
//! | `radial` | Spokes out of the root, one per theme |
//! | `grid` | Orderly rows, orthogonal angles |
//! | `linear` | Long chains with rare forks |
//! | `cascade` | Tier-banded waterfall |
//! | `mountain` | Wide base tapering to a narrow peak |
//! | `spiky` | Long spikes that occasionally split |
//! | `cloud` | Capacity-bounded clusters with gaps |

pub mod organic;
pub mod radial;
pub mod grid;
pub mod linear;
pub mod cascade;
pub mod mountain;
pub mod spiky;
pub mod cloud;

pub use organic::OrganicShape;
pub use radial::RadialShape;
pub use grid::GridShape;
pub use linear::LinearShape;
pub use cascade::CascadeShape;
pub use mountain::MountainShape;
pub use spiky::SpikyShape;
pub use cloud::CloudShape;

use std::f64::consts::FRAC_PI_2;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::{distribute_angles, lerp, normalize_angle};
use crate::growth::BuildRng;
use crate::model::{NodeIdx, TreeNode};

// ============================================================================
// Configuration
// ============================================================================

/// How sibling branch angles are regularized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymmetryMode {
    #[default]
    None,
    Partial,
    Mirror,
    Radial,
}

/// Shape-specific knobs. Each shape reads only the ones it understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeExtras {
    /// Target nodes per cloud cluster.
    pub cluster_size: usize,
    /// Root children that start radial spokes.
    pub spoke_count: usize,
    /// Root children that form the first grid row.
    pub grid_columns: usize,
    /// How quickly mountain branching narrows per tier.
    pub taper_rate: f64,
    /// Chain length at which a spike is most likely to split.
    pub spike_length: usize,
    /// Base chance of a spike splitting.
    pub split_chance: f64,
}

impl Default for ShapeExtras {
    fn default() -> Self {
        Self {
            cluster_size: 5,
            spoke_count: 5,
            grid_columns: 5,
            taper_rate: 0.3,
            spike_length: 4,
            split_chance: 0.15,
        }
    }
}

/// Parameters owned by one shape instance for one bucket build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeConfig {
    pub min_children: usize,
    pub max_children: usize,
    /// Branch angle range in degrees.
    pub branching_angle: (f64, f64),
    pub symmetry: SymmetryMode,
    pub symmetry_strength: f64,
    /// Branching probability scalar in `[0, 1]`.
    pub density: f64,
    pub max_depth: Option<u32>,
    pub theme_coherence: f64,
    pub extras: ShapeExtras,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            min_children: 1,
            max_children: 3,
            branching_angle: (30.0, 150.0),
            symmetry: SymmetryMode::None,
            symmetry_strength: 0.0,
            density: 0.6,
            max_depth: None,
            theme_coherence: 0.5,
            extras: ShapeExtras::default(),
        }
    }
}

impl ShapeConfig {
    /// Layer caller overrides on top of a shape's defaults.
    pub fn with_options(mut self, options: &ShapeOptions) -> Self {
        if let Some(density) = options.density {
            self.density = density.clamp(0.0, 1.0);
        }
        if let Some(strength) = options.symmetry {
            self.symmetry_strength = strength.clamp(0.0, 1.0);
        }
        if let Some(mode) = options.symmetry_mode {
            self.symmetry = mode;
        }
        if options.max_depth.is_some() {
            self.max_depth = options.max_depth;
        }
        let extras = &mut self.extras;
        if let Some(v) = options.cluster_size {
            extras.cluster_size = v.max(1);
        }
        if let Some(v) = options.spoke_count {
            extras.spoke_count = v.max(1);
        }
        if let Some(v) = options.grid_columns {
            extras.grid_columns = v.max(1);
        }
        if let Some(v) = options.taper_rate {
            extras.taper_rate = v.max(0.0);
        }
        if let Some(v) = options.spike_length {
            extras.spike_length = v.max(1);
        }
        if let Some(v) = options.split_chance {
            extras.split_chance = v.clamp(0.0, 1.0);
        }
        self
    }

    pub fn angle_range_radians(&self) -> (f64, f64) {
        (self.branching_angle.0.to_radians(), self.branching_angle.1.to_radians())
    }

    pub fn depth_exhausted(&self, depth: u32) -> bool {
        self.max_depth.is_some_and(|max| depth >= max)
    }
}

/// Caller-side overrides for a shape. `None` keeps the shape default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub density: Option<f64>,
    /// Symmetry strength in `[0, 1]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symmetry: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symmetry_mode: Option<SymmetryMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spoke_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_columns: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taper_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spike_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_chance: Option<f64>,
}

impl ShapeOptions {
    /// `other` wins wherever it sets a value.
    pub fn merged(&self, other: &ShapeOptions) -> ShapeOptions {
        ShapeOptions {
            density: other.density.or(self.density),
            symmetry: other.symmetry.or(self.symmetry),
            symmetry_mode: other.symmetry_mode.or(self.symmetry_mode),
            max_depth: other.max_depth.or(self.max_depth),
            cluster_size: other.cluster_size.or(self.cluster_size),
            spoke_count: other.spoke_count.or(self.spoke_count),
            grid_columns: other.grid_columns.or(self.grid_columns),
            taper_rate: other.taper_rate.or(self.taper_rate),
            spike_length: other.spike_length.or(self.spike_length),
            split_chance: other.split_chance.or(self.split_chance),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == ShapeOptions::default()
    }
}

// ============================================================================
// Context
// ============================================================================

/// Build-wide facts shared with every shape call.
#[derive(Debug, Clone, Copy)]
pub struct GrowthContext<'a> {
    /// Themes present in the bucket, largest first.
    pub themes: &'a [String],
    /// Hard per-node child capacity.
    pub max_children: usize,
    /// Number of configured tiers.
    pub tier_count: usize,
}

// ============================================================================
// Strategy trait
// ============================================================================

/// A pluggable growth strategy.
///
/// Decisions take `&self`; only [`GrowthShape::on_linked`] may update
/// internal bookkeeping (clusters, chain lengths) after the builder commits a
/// link.
pub trait GrowthShape {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn config(&self) -> &ShapeConfig;

    /// Layout style reported in the output tree.
    fn layout_style(&self) -> &'static str {
        self.name()
    }

    /// Pick a parent for `node` among `candidates`. Candidates at capacity
    /// are never chosen; `None` means nothing qualifies.
    fn select_parent(
        &self,
        node: &TreeNode,
        candidates: &[&TreeNode],
        ctx: &GrowthContext<'_>,
        rng: &mut BuildRng,
    ) -> Option<NodeIdx>;

    /// How many children `node` should grow, within the configured bounds.
    fn calculate_children_count(
        &self,
        node: &TreeNode,
        ctx: &GrowthContext<'_>,
        rng: &mut BuildRng,
    ) -> usize;

    fn should_branch(&self, node: &TreeNode, _ctx: &GrowthContext<'_>, rng: &mut BuildRng) -> bool {
        let cfg = self.config();
        if cfg.depth_exhausted(node.depth) {
            return false;
        }
        rng.random::<f64>() < cfg.density
    }

    /// Angle in radians, within `[0, 2π)`, of child `child_index` of `total`
    /// under `parent`. At the root the angle is absolute; elsewhere it is
    /// relative to the parent's heading, with `PI / 2` meaning "straight on".
    fn get_branch_angle(
        &self,
        _parent: &TreeNode,
        child_index: usize,
        total: usize,
        _ctx: &GrowthContext<'_>,
        _rng: &mut BuildRng,
    ) -> f64 {
        let (lo, hi) = self.config().angle_range_radians();
        let angle = distribute_angles(total.max(1), lo, hi - lo)
            .get(child_index)
            .copied()
            .unwrap_or((lo + hi) / 2.0);
        normalize_angle(angle)
    }

    /// Notification that the builder linked `parent -> child`.
    fn on_linked(&mut self, _parent: &TreeNode, _child: &TreeNode) {}
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Candidates that still have room under the hard capacity.
pub fn with_capacity<'c>(candidates: &[&'c TreeNode], ctx: &GrowthContext<'_>) -> Vec<&'c TreeNode> {
    candidates
        .iter()
        .copied()
        .filter(|c| c.child_count() < ctx.max_children)
        .collect()
}

/// Baseline parent score: theme match, closeness to the ideal depth one level
/// above `node`, and a small penalty per existing child.
pub fn score_parent_candidate(node: &TreeNode, candidate: &TreeNode, cfg: &ShapeConfig) -> f64 {
    let mut score = 1.0;
    if !node.is_unassigned() && candidate.theme == node.theme {
        score += cfg.theme_coherence * 2.0;
    }
    let ideal = node.depth.saturating_sub(1) as f64;
    let gap = (candidate.depth as f64 - ideal).abs();
    score += 1.0 / (1.0 + gap);
    score - candidate.child_count() as f64 * 0.15
}

/// Highest score wins; equal scores keep candidate order.
pub fn best_scored(mut scored: Vec<(f64, NodeIdx)>) -> Option<NodeIdx> {
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.first().map(|(_, idx)| *idx)
}

pub fn clamp_children(count: usize, cfg: &ShapeConfig, ctx: &GrowthContext<'_>) -> usize {
    let max = cfg.max_children.min(ctx.max_children);
    count.clamp(cfg.min_children.min(max), max)
}

impl SymmetryMode {
    /// Regularize sibling angles in place. Every angle ends up in `[0, 2π)`.
    ///
    /// `Mirror` reflects the first half of the siblings onto the second
    /// around `PI / 2` (straight on); `Radial` pulls angles onto an even
    /// split of the range; `Partial` does the same at half weight.
    /// `strength` blends between the raw and the regularized angle.
    pub fn apply(self, angles: &mut [f64], strength: f64, lo: f64, hi: f64) {
        let n = angles.len();
        if n >= 2 && strength > 0.0 {
            self.regularize(angles, strength.min(1.0), lo, hi);
        }
        for a in angles.iter_mut() {
            *a = normalize_angle(*a);
        }
    }


    fn regularize(self, angles: &mut [f64], strength: f64, lo: f64, hi: f64) {
        let n = angles.len();
        let even = distribute_angles(n, lo, hi - lo);
        match self {
            SymmetryMode::None => {}
            SymmetryMode::Mirror => {
                let mid = FRAC_PI_2;
                for i in 0..n / 2 {
                    let j = n - 1 - i;
                    let mirrored = 2.0 * mid - angles[i];
                    angles[j] = lerp(angles[j], mirrored, strength);
                }
                if n % 2 == 1 {
                    angles[n / 2] = lerp(angles[n / 2], mid, strength);
                }
            }
            SymmetryMode::Radial => {
                for (a, target) in angles.iter_mut().zip(even) {
                    *a = lerp(*a, target, strength);
                }
            }
            SymmetryMode::Partial => {
                for (a, target) in angles.iter_mut().zip(even) {
                    *a = lerp(*a, target, strength * 0.5);
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{PI, TAU};

    #[test]
    fn test_options_override_defaults() {
        let opts = ShapeOptions {
            density: Some(1.5),
            spoke_count: Some(0),
            symmetry_mode: Some(SymmetryMode::Mirror),
            ..Default::default()
        };
        let cfg = ShapeConfig::default().with_options(&opts);
        assert_eq!(cfg.density, 1.0);
        assert_eq!(cfg.extras.spoke_count, 1);
        assert_eq!(cfg.symmetry, SymmetryMode::Mirror);
    }

    #[test]
    fn test_merged_prefers_other() {
        let base = ShapeOptions { density: Some(0.2), taper_rate: Some(0.5), ..Default::default() };
        let over = ShapeOptions { density: Some(0.9), ..Default::default() };
        let merged = base.merged(&over);
        assert_eq!(merged.density, Some(0.9));
        assert_eq!(merged.taper_rate, Some(0.5));
    }

    #[test]
    fn test_mirror_symmetry_reflects() {
        let mut angles = vec![0.3, 1.0, 2.0];
        SymmetryMode::Mirror.apply(&mut angles, 1.0, 0.0, PI);
        assert!((angles[2] - (PI - 0.3)).abs() < 1e-9);
        assert!((angles[1] - PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_apply_wraps_into_one_turn() {
        let mut angles = vec![-0.5, 7.0];
        SymmetryMode::None.apply(&mut angles, 0.0, 0.0, PI);
        assert!((angles[0] - (TAU - 0.5)).abs() < 1e-9);
        assert!((angles[1] - (7.0 - TAU)).abs() < 1e-9);

        let mut spread = vec![0.0, 0.0];
        SymmetryMode::Radial.apply(&mut spread, 1.0, PI, 3.0 * PI);
        assert!(spread.iter().all(|a| (0.0..TAU).contains(a)), "{spread:?}");
        assert!((spread[1] - PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_radial_symmetry_snaps_to_even_split() {
        let mut angles = vec![0.1, 0.2, 0.3, 0.4];
        SymmetryMode::Radial.apply(&mut angles, 1.0, 0.0, 2.0 * PI);
        let even = distribute_angles(4, 0.0, 2.0 * PI);
        for (a, e) in angles.iter().zip(even) {
            assert!((a - e).abs() < 1e-9);
        }
        let mut untouched = vec![0.1, 0.2];
        SymmetryMode::None.apply(&mut untouched, 1.0, 0.0, PI);
        assert_eq!(untouched, vec![0.1, 0.2]);
    }
}
