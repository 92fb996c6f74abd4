//! # spelltree: Procedural Unlock-Tree Synthesis
//!
//! Turns a flat list of items (spells, skills, perks) tagged with a tier and
//! a theme into one prerequisite tree per bucket, ready to render.
//!
//! ## Design Principles
//!
//! 1. **Shape is a strategy**: `GrowthShape` decides parents and fan-out; the
//!    builder never hard-codes a silhouette
//! 2. **One random stream**: every probabilistic decision draws from a single
//!    seeded `BuildRng`, so a seed reproduces a tree exactly
//! 3. **Degrade, don't fail**: only bad configuration is an `Err`; structural
//!    problems are repaired in place and counted in `BuildDiagnostics`
//! 4. **Plain data out**: `TreeOutput` carries ids, never indices, and
//!    serializes as-is
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spelltree::{BuilderConfig, ItemRecord, TreeBuilder};
//!
//! # fn example() -> spelltree::Result<()> {
//! let config = BuilderConfig::default().with_shape("mountain").with_seed(7);
//! let builder = TreeBuilder::new(config)?;
//!
//! let items = vec![
//!     ItemRecord::new("flames", "Novice").with_bucket("Destruction").with_theme("fire"),
//!     ItemRecord::new("firebolt", "Apprentice").with_bucket("Destruction").with_theme("fire"),
//! ];
//! let forest = builder.build_forest(&items)?;
//! for (bucket, tree) in &forest.buckets {
//!     println!("{bucket}: root {} with {} nodes", tree.root, tree.nodes.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Formations
//!
//! | Formation | Description |
//! |-----------|-------------|
//! | `radial` | (default) Walks out from the root along the shape's branch angles |
//! | `layered` | One row per depth, siblings centred |
//!
//! Eight growth shapes ship built in; see [`shapes`].

// ============================================================================
// Modules
// ============================================================================

pub mod geometry;
pub mod model;
pub mod registry;
pub mod config;
pub mod growth;
pub mod shapes;
pub mod spacing;
pub mod layout;
pub mod builder;
pub mod validate;
pub mod collab;
pub mod protocol;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    BuildDiagnostics, ConfigSource, ConfigUsed, Forest, ItemRecord, NodeOutput, TreeOutput,
};

// ============================================================================
// Re-exports: Engine
// ============================================================================

pub use builder::TreeBuilder;
pub use config::{BucketOverride, BuilderConfig};
pub use growth::{BranchingEnergy, BranchingEnergyConfig};
pub use layout::{Formation, LayoutConfig};
pub use registry::Plugins;
pub use shapes::{GrowthShape, ShapeConfig, ShapeOptions};
pub use spacing::{SpacingConfig, SpacingEngine};
pub use validate::TreeReport;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown {kind} '{name}'. Available: {available}")]
    UnknownPlugin {
        kind: &'static str,
        name: String,
        available: String,
    },

    #[error("Invalid config `{field}` = {value}: {reason}")]
    InvalidConfig {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Bucket '{0}' has no items")]
    EmptyBucket(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_config(
        field: &'static str,
        value: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
