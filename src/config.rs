//! Builder configuration.
//!
//! One typed struct per component, every field defaulted, validated once
//! when a [`TreeBuilder`](crate::builder::TreeBuilder) is constructed.
//! Per-bucket settings resolve in the order shape defaults < global config <
//! bucket override; an advisor suggestion stands in for the override only
//! when the bucket has none.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::builder::ConvergenceRules;
use crate::growth::BranchingEnergyConfig;
use crate::layout::LayoutConfig;
use crate::model::{ConfigSource, TreeNode};
use crate::shapes::ShapeOptions;
use crate::spacing::SpacingConfig;
use crate::{Error, Result};

pub const DEFAULT_TIERS: [&str; 5] = ["Novice", "Apprentice", "Adept", "Expert", "Master"];

// ============================================================================
// Global config
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Growth shape name. Default: `"organic"`.
    pub shape: String,
    /// Layout formation name. Default: `"radial"`.
    pub formation: String,
    /// Density, symmetry and shape extras forwarded to the shape.
    #[serde(flatten)]
    pub shape_options: ShapeOptions,
    /// Base chance of an extra prerequisite. Default: 0.4.
    pub convergence_chance: f64,
    /// First tier index that gains extra prerequisites while connecting.
    /// Default: 2.
    pub convergence_at_tier: usize,
    /// Hard child capacity per node. Default: 3.
    pub max_children_per_node: usize,
    pub branching_energy: BranchingEnergyConfig,
    /// `None` draws a fresh seed per build and logs it.
    pub seed: Option<u64>,
    pub prefer_canonical_roots: bool,
    pub allow_same_tier_links: bool,
    pub strict_tier_ordering: bool,
    /// Ordinal tier names, lowest first.
    pub tiers: Vec<String>,
    /// Theme labels below this confidence count as unassigned. Default: 0.3.
    pub min_theme_confidence: f64,
    /// Preferred root ids per bucket; the first one present wins.
    pub canonical_roots: BTreeMap<String, Vec<String>>,
    /// Theme whose lowest-tier item roots the bucket when no canonical root
    /// is present.
    pub default_themes: BTreeMap<String, String>,
    pub bucket_overrides: BTreeMap<String, BucketOverride>,
    pub convergence: ConvergenceRules,
    pub spacing: SpacingConfig,
    pub layout: LayoutConfig,
    /// Upper bound on reachability repair passes. Default: 10.
    pub repair_passes: usize,
    /// Bucket for items that name none. Default: `"Hedge Wizard"`.
    pub fallback_bucket: String,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            shape: "organic".into(),
            formation: "radial".into(),
            shape_options: ShapeOptions::default(),
            convergence_chance: 0.4,
            convergence_at_tier: 2,
            max_children_per_node: 3,
            branching_energy: BranchingEnergyConfig::default(),
            seed: None,
            prefer_canonical_roots: true,
            allow_same_tier_links: true,
            strict_tier_ordering: true,
            tiers: DEFAULT_TIERS.iter().map(|t| t.to_string()).collect(),
            min_theme_confidence: 0.3,
            canonical_roots: BTreeMap::new(),
            default_themes: BTreeMap::new(),
            bucket_overrides: BTreeMap::new(),
            convergence: ConvergenceRules::default(),
            spacing: SpacingConfig::default(),
            layout: LayoutConfig::default(),
            repair_passes: 10,
            fallback_bucket: "Hedge Wizard".into(),
        }
    }
}

impl BuilderConfig {
    pub fn with_shape(mut self, shape: impl Into<String>) -> Self {
        self.shape = shape.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_children(mut self, max: usize) -> Self {
        self.max_children_per_node = max;
        self
    }

    pub fn with_convergence_chance(mut self, chance: f64) -> Self {
        self.convergence_chance = chance;
        self
    }

    /// Fail fast on anything out of range. Plugin names are checked by the
    /// builder against its registries.
    pub fn validate(&self) -> Result<()> {
        if self.max_children_per_node == 0 {
            return Err(Error::invalid_config("max_children_per_node", 0, "must be at least 1"));
        }
        if self.tiers.is_empty() {
            return Err(Error::invalid_config("tiers", "[]", "must name at least one tier"));
        }
        for (i, tier) in self.tiers.iter().enumerate() {
            if self.tiers[..i].iter().any(|t| t.eq_ignore_ascii_case(tier)) {
                return Err(Error::invalid_config("tiers", tier, "duplicate tier name"));
            }
        }
        unit_interval("convergence_chance", self.convergence_chance)?;
        unit_interval("min_theme_confidence", self.min_theme_confidence)?;
        if self.fallback_bucket.trim().is_empty() {
            return Err(Error::invalid_config("fallback_bucket", "\"\"", "must not be blank"));
        }
        validate_options("", &self.shape_options)?;
        self.branching_energy.validate()?;
        self.convergence.validate()?;
        self.spacing.validate()?;
        self.layout.validate()?;
        for (bucket, over) in &self.bucket_overrides {
            over.validate(bucket)?;
        }
        Ok(())
    }

    /// Ordinal of `tier`, matched case-insensitively.
    pub fn tier_index(&self, tier: &str) -> Option<usize> {
        let tier = tier.trim();
        self.tiers.iter().position(|t| t.eq_ignore_ascii_case(tier))
    }

    pub fn tier_order(&self) -> TierOrder {
        TierOrder {
            strict: self.strict_tier_ordering,
            allow_same_tier: self.allow_same_tier_links,
        }
    }

    /// Effective settings for one bucket.
    pub fn settings_for(&self, bucket: &str, advice: Option<&BucketOverride>) -> BucketSettings {
        let global = BucketSettings {
            shape: self.shape.clone(),
            formation: self.formation.clone(),
            options: self.shape_options.clone(),
            convergence_chance: self.convergence_chance,
            branching_energy: self.branching_energy.clone(),
            source: ConfigSource::Global,
        };
        match (self.bucket_overrides.get(bucket), advice) {
            (Some(over), _) => global.overlay(over, ConfigSource::Override),
            (None, Some(advice)) => global.overlay(advice, ConfigSource::Advisor),
            (None, None) => global,
        }
    }
}

fn unit_interval(field: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::invalid_config(field, value, "must be within [0, 1]"))
    }
}

fn validate_options(scope: &str, options: &ShapeOptions) -> Result<()> {
    let checks = [
        ("density", options.density),
        ("symmetry", options.symmetry),
        ("split_chance", options.split_chance),
    ];
    for (field, value) in checks {
        if let Some(v) = value
            && !(0.0..=1.0).contains(&v)
        {
            return Err(Error::invalid_config(
                field,
                v,
                format!("must be within [0, 1]{scope}"),
            ));
        }
    }
    if let Some(rate) = options.taper_rate
        && !(rate >= 0.0)
    {
        return Err(Error::invalid_config("taper_rate", rate, format!("must not be negative{scope}")));
    }
    Ok(())
}

// ============================================================================
// Per-bucket overrides
// ============================================================================

/// Partial settings for one bucket. Unset fields keep the global value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formation: Option<String>,
    #[serde(flatten)]
    pub options: ShapeOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convergence_chance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branching_energy: Option<BranchingEnergyConfig>,
}

impl BucketOverride {
    pub fn with_shape(mut self, shape: impl Into<String>) -> Self {
        self.shape = Some(shape.into());
        self
    }

    pub fn validate(&self, bucket: &str) -> Result<()> {
        let scope = format!(" (bucket '{bucket}')");
        validate_options(&scope, &self.options)?;
        if let Some(chance) = self.convergence_chance
            && !(0.0..=1.0).contains(&chance)
        {
            return Err(Error::invalid_config(
                "convergence_chance",
                chance,
                format!("must be within [0, 1]{scope}"),
            ));
        }
        if let Some(energy) = &self.branching_energy {
            energy.validate()?;
        }
        Ok(())
    }
}

/// Settings one bucket is actually built with.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSettings {
    pub shape: String,
    pub formation: String,
    pub options: ShapeOptions,
    pub convergence_chance: f64,
    pub branching_energy: BranchingEnergyConfig,
    pub source: ConfigSource,
}

impl BucketSettings {
    fn overlay(mut self, over: &BucketOverride, source: ConfigSource) -> Self {
        if let Some(shape) = &over.shape {
            self.shape = shape.clone();
        }
        if let Some(formation) = &over.formation {
            self.formation = formation.clone();
        }
        self.options = self.options.merged(&over.options);
        if let Some(chance) = over.convergence_chance {
            self.convergence_chance = chance;
        }
        if let Some(energy) = &over.branching_energy {
            self.branching_energy = energy.clone();
        }
        self.source = source;
        self
    }
}

// ============================================================================
// Tier ordering
// ============================================================================

/// Which parent → child edges respect tier progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierOrder {
    pub strict: bool,
    pub allow_same_tier: bool,
}

impl TierOrder {
    /// Edges out of the root are always allowed.
    pub fn allows(&self, parent: &TreeNode, child: &TreeNode) -> bool {
        self.allows_tiers(parent.tier_index, parent.is_root, child.tier_index)
    }

    /// [`Self::allows`] over bare tier ordinals.
    pub fn allows_tiers(&self, parent_tier: usize, parent_is_root: bool, child_tier: usize) -> bool {
        if !self.strict || parent_is_root {
            return true;
        }
        if self.allow_same_tier {
            parent_tier <= child_tier
        } else {
            parent_tier < child_tier
        }
    }
}
