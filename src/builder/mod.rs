//! # Tree Builder
//!
//! Turns item records into one prerequisite tree per bucket:
//!
//! 1. **Root**: canonical id, else the bucket's default theme at the lowest
//!    tier, else the lowest-tier item.
//! 2. **Connect**: themes largest first, items by tier; the growth shape
//!    picks each parent from connected nodes with room, the branching-energy
//!    controller books the link, convergence may add extra prerequisites.
//! 3. **Orphans**: anything left over hangs off a shallower connected node.
//! 4. **Convergence floor**, **reachability repair**, depth recompute.
//! 5. **Layout** through the configured formation.
//!
//! Nothing past configuration validation fails: every degraded outcome is
//! repaired in place, logged, and counted in [`BuildDiagnostics`].

pub mod convergence;
pub mod repair;

pub use convergence::{ConvergencePolicy, ConvergenceRules, FloorReport};
pub use repair::{RepairReport, Repairer};

use std::collections::BTreeMap;

use crate::collab::{ConfigAdvisor, RecordedThemes, ThemeAssignment, ThemeSource};
use crate::config::{BucketOverride, BucketSettings, BuilderConfig};
use crate::growth::{seeded_rng, BranchingEnergy, BuildRng};
use crate::layout::{Formation, Placement};
use crate::model::{
    BuildDiagnostics, ConfigUsed, Forest, ItemRecord, NodeIdx, NodeTable, TreeOutput,
    UNASSIGNED_THEME,
};
use crate::registry::Plugins;
use crate::shapes::{GrowthContext, GrowthShape};
use crate::{Error, Result};

/// Items shown to a config advisor per bucket.
const ADVISOR_SAMPLE: usize = 12;

/// Probability handed to the energy controller's branch check on each link.
const LINK_BRANCH_PROBABILITY: f64 = 0.5;

/// Bucket names that mean "no bucket".
const BLANK_BUCKETS: [&str; 3] = ["null", "undefined", "none"];

// ============================================================================
// Builder
// ============================================================================

pub struct TreeBuilder {
    config: BuilderConfig,
    plugins: Plugins,
    themes: Box<dyn ThemeSource>,
    advisor: Option<Box<dyn ConfigAdvisor>>,
}

impl std::fmt::Debug for TreeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeBuilder")
            .field("config", &self.config)
            .field("plugins", &self.plugins)
            .field("advisor", &self.advisor.is_some())
            .finish()
    }
}

impl TreeBuilder {
    /// Builder with the built-in shapes and formations.
    pub fn new(config: BuilderConfig) -> Result<Self> {
        Self::with_plugins(config, Plugins::builtin())
    }

    /// Validate `config` and check every plugin name it mentions.
    pub fn with_plugins(config: BuilderConfig, plugins: Plugins) -> Result<Self> {
        config.validate()?;
        plugins.shapes.resolve(&config.shape)?;
        plugins.formations.resolve(&config.formation)?;
        for over in config.bucket_overrides.values() {
            check_override_plugins(&plugins, over)?;
        }
        Ok(Self {
            config,
            plugins,
            themes: Box::new(RecordedThemes),
            advisor: None,
        })
    }

    pub fn with_theme_source(mut self, source: impl ThemeSource + 'static) -> Self {
        self.themes = Box::new(source);
        self
    }

    pub fn with_advisor(mut self, advisor: impl ConfigAdvisor + 'static) -> Self {
        self.advisor = Some(Box::new(advisor));
        self
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn plugins(&self) -> &Plugins {
        &self.plugins
    }

    /// Build every bucket present in `items`.
    pub fn build_forest(&self, items: &[ItemRecord]) -> Result<Forest> {
        let seed = self.resolve_seed();
        let assignment = self.assign_themes(items);

        let mut buckets: BTreeMap<String, Vec<ItemRecord>> = BTreeMap::new();
        for item in items {
            buckets
                .entry(self.bucket_of(item))
                .or_default()
                .push(item.clone());
        }

        let mut forest = Forest::new();
        for (bucket, bucket_items) in buckets {
            let tree = self.build_with(&bucket, &bucket_items, &assignment, seed)?;
            forest.buckets.insert(bucket, tree);
        }
        Ok(forest)
    }

    /// Build a single bucket from `items`, ignoring their own bucket field.
    pub fn build_bucket(&self, bucket: &str, items: &[ItemRecord]) -> Result<TreeOutput> {
        let seed = self.resolve_seed();
        let assignment = self.assign_themes(items);
        self.build_with(bucket, items, &assignment, seed)
    }

    fn bucket_of(&self, item: &ItemRecord) -> String {
        let bucket = item.bucket.trim();
        if bucket.is_empty() || BLANK_BUCKETS.iter().any(|b| b.eq_ignore_ascii_case(bucket)) {
            self.config.fallback_bucket.clone()
        } else {
            bucket.to_string()
        }
    }

    fn resolve_seed(&self) -> u64 {
        self.config.seed.unwrap_or_else(|| {
            let seed = rand::random::<u64>();
            tracing::info!(seed, "no seed configured, drew a fresh one");
            seed
        })
    }

    fn assign_themes(&self, items: &[ItemRecord]) -> ThemeAssignment {
        let mut assignment = self.themes.assign_themes(items);
        let Some(advisor) = &self.advisor else {
            return assignment;
        };
        let min = self.config.min_theme_confidence;
        let ambiguous: Vec<ItemRecord> = items
            .iter()
            .filter(|item| assignment.confident_label(&item.id, min).is_none())
            .cloned()
            .collect();
        if ambiguous.is_empty() {
            return assignment;
        }
        let resolved = advisor.resolve_ambiguous(&ambiguous);
        tracing::debug!(ambiguous = ambiguous.len(), resolved = resolved.len(), "advisor labels");
        for (id, label) in resolved {
            assignment.insert(id, label, 1.0);
        }
        assignment
    }

    /// Advisor suggestion for a bucket without an explicit override, dropped
    /// when it does not validate.
    fn advice_for(&self, bucket: &str, items: &[ItemRecord]) -> Option<BucketOverride> {
        if self.config.bucket_overrides.contains_key(bucket) {
            return None;
        }
        let advisor = self.advisor.as_ref()?;
        let sample = &items[..items.len().min(ADVISOR_SAMPLE)];
        let advice = advisor.suggest_config(bucket, sample)?;
        match advice
            .validate(bucket)
            .and_then(|()| check_override_plugins(&self.plugins, &advice))
        {
            Ok(()) => Some(advice),
            Err(err) => {
                tracing::warn!(bucket, %err, "ignoring advisor suggestion");
                None
            }
        }
    }

    fn build_with(
        &self,
        bucket: &str,
        items: &[ItemRecord],
        assignment: &ThemeAssignment,
        seed: u64,
    ) -> Result<TreeOutput> {
        if items.is_empty() {
            return Err(Error::EmptyBucket(bucket.to_string()));
        }
        let advice = self.advice_for(bucket, items);
        let settings = self.config.settings_for(bucket, advice.as_ref());
        let shape = self.plugins.shapes.create(&settings.shape, &settings.options)?;
        let formation = self.plugins.formations.create(&settings.formation)?;

        tracing::info!(
            bucket,
            items = items.len(),
            shape = shape.name(),
            formation = formation.name(),
            seed,
            "building bucket"
        );

        let mut build = BucketBuild::new(&self.config, &settings, bucket, shape, bucket_seed(seed, bucket));
        build.load(items, assignment);
        let root = build.select_root()?;
        build.grow(root);
        Ok(build.finish(root, formation.as_ref(), seed))
    }
}

fn check_override_plugins(plugins: &Plugins, over: &BucketOverride) -> Result<()> {
    if let Some(shape) = &over.shape {
        plugins.shapes.resolve(shape)?;
    }
    if let Some(formation) = &over.formation {
        plugins.formations.resolve(formation)?;
    }
    Ok(())
}

/// Per-bucket stream derived from the build seed, so a bucket's tree does
/// not depend on which other buckets were built before it.
fn bucket_seed(seed: u64, bucket: &str) -> u64 {
    // FNV-1a
    let hash = bucket.bytes().fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    });
    seed ^ hash
}

// ============================================================================
// One bucket
// ============================================================================

struct BucketBuild<'a> {
    config: &'a BuilderConfig,
    settings: &'a BucketSettings,
    bucket: &'a str,
    table: NodeTable,
    shape: Box<dyn GrowthShape>,
    energy: BranchingEnergy,
    rng: BuildRng,
    /// Assigned themes, largest first.
    themes: Vec<String>,
    /// Connected nodes in connection order.
    available: Vec<NodeIdx>,
    connected: Vec<bool>,
    /// Soft child budget per connected node.
    budget: Vec<usize>,
    diagnostics: BuildDiagnostics,
}

impl<'a> BucketBuild<'a> {
    fn new(
        config: &'a BuilderConfig,
        settings: &'a BucketSettings,
        bucket: &'a str,
        shape: Box<dyn GrowthShape>,
        seed: u64,
    ) -> Self {
        Self {
            config,
            settings,
            bucket,
            table: NodeTable::new(),
            shape,
            energy: BranchingEnergy::new(settings.branching_energy.clone()),
            rng: seeded_rng(seed),
            themes: Vec::new(),
            available: Vec::new(),
            connected: Vec::new(),
            budget: Vec::new(),
            diagnostics: BuildDiagnostics::default(),
        }
    }

    fn max_children(&self) -> usize {
        self.config.max_children_per_node
    }

    /// Create one node per item and rank the themes.
    fn load(&mut self, items: &[ItemRecord], assignment: &ThemeAssignment) {
        let min_confidence = self.config.min_theme_confidence;
        for item in items {
            let tier_index = match self.config.tier_index(&item.tier) {
                Some(index) => index,
                None => {
                    tracing::warn!(bucket = self.bucket, item = %item.id, tier = %item.tier, "unknown tier, treating as lowest");
                    self.diagnostics.unknown_tiers += 1;
                    0
                }
            };
            let theme = assignment
                .confident_label(&item.id, min_confidence)
                .unwrap_or(UNASSIGNED_THEME);
            let inserted = self.table.insert(&item.id, item.display_name(), &item.tier, tier_index, theme);
            if inserted.is_none() {
                tracing::warn!(bucket = self.bucket, item = %item.id, "duplicate item id, keeping the first");
                self.diagnostics.duplicate_items += 1;
            }
        }

        let mut sizes: BTreeMap<&str, usize> = BTreeMap::new();
        for node in self.table.iter().filter(|n| !n.is_unassigned()) {
            *sizes.entry(node.theme.as_str()).or_default() += 1;
        }
        let mut ranked: Vec<(&str, usize)> = sizes.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        self.themes = ranked.into_iter().map(|(t, _)| t.to_string()).collect();

        self.connected = vec![false; self.table.len()];
        self.budget = vec![self.max_children(); self.table.len()];
    }

    fn select_root(&self) -> Result<NodeIdx> {
        let table = &self.table;
        let lowest = |theme: Option<&str>| -> Option<NodeIdx> {
            table
                .iter()
                .filter(|n| theme.is_none_or(|t| n.theme == t))
                .min_by_key(|n| n.tier_index)
                .map(|n| n.idx)
        };

        let canonical = self
            .config
            .prefer_canonical_roots
            .then(|| self.config.canonical_roots.get(self.bucket))
            .flatten()
            .and_then(|ids| ids.iter().find_map(|id| table.lookup(id)));
        let by_theme = || {
            self.config
                .default_themes
                .get(self.bucket)
                .and_then(|theme| lowest(Some(theme.as_str())))
        };

        canonical
            .or_else(by_theme)
            .or_else(|| lowest(None))
            .ok_or_else(|| Error::EmptyBucket(self.bucket.to_string()))
    }

    fn convergence_policy(&self) -> ConvergencePolicy<'a> {
        ConvergencePolicy {
            rules: &self.config.convergence,
            chance: self.settings.convergence_chance,
            max_children: self.config.max_children_per_node,
            order: self.config.tier_order(),
        }
    }

    // ========================================================================
    // Growth
    // ========================================================================

    fn grow(&mut self, root: NodeIdx) {
        {
            let node = self.table.get_mut(root);
            node.is_root = true;
            node.depth = 0;
        }
        self.energy.start_path(root);
        self.connected[root.index()] = true;
        self.available.push(root);
        self.budget[root.index()] = self.child_budget(root);

        let mut groups: Vec<(String, bool)> = self.themes.iter().map(|t| (t.clone(), true)).collect();
        groups.push((UNASSIGNED_THEME.to_string(), false));
        for (theme, converge) in groups {
            let mut members: Vec<NodeIdx> = self
                .table
                .iter()
                .filter(|n| n.theme == theme && !self.connected[n.idx.index()])
                .map(|n| n.idx)
                .collect();
            members.sort_by_key(|m| self.table.get(*m).tier_index);
            for node in members {
                self.connect(root, node, converge);
            }
        }

        self.attach_orphans(root);
    }

    fn connect(&mut self, root: NodeIdx, node: NodeIdx, converge: bool) {
        let target = self.table.get(node).tier_index;
        let pool = self.parent_pool(node, target);

        let picked = if pool.is_empty() {
            None
        } else {
            let mut staged = self.table.get(node).clone();
            staged.depth = target as u32;
            let ctx = GrowthContext {
                themes: &self.themes,
                max_children: self.config.max_children_per_node,
                tier_count: self.config.tiers.len(),
            };
            let candidates: Vec<_> = pool.iter().map(|c| self.table.get(*c)).collect();
            self.shape.select_parent(&staged, &candidates, &ctx, &mut self.rng)
        };

        let parent = match picked {
            Some(parent) => parent,
            None if target == 0 => {
                if self.table.get(root).child_count() >= self.max_children() {
                    tracing::warn!(bucket = self.bucket, node = %self.table.get(node).id, "root over capacity for lowest-tier item");
                    self.diagnostics.root_overflow_links += 1;
                }
                root
            }
            None => return,
        };
        self.attach(parent, node);

        if converge && target >= self.config.convergence_at_tier {
            let policy = self.convergence_policy();
            let added = convergence::maybe_add_convergence(&mut self.table, root, node, &policy, &mut self.rng);
            self.diagnostics.convergence_links += added;
        }
    }

    /// Connected nodes with room at an eligible depth, shallowest first.
    /// Nodes still under their soft budget are preferred.
    fn parent_pool(&self, node: NodeIdx, target: usize) -> Vec<NodeIdx> {
        let order = self.config.tier_order();
        let max = self.max_children();
        let child = self.table.get(node);
        let target = target as u32;
        let in_range = |depth: u32| match (self.config.strict_tier_ordering, self.config.allow_same_tier_links) {
            (true, true) => depth <= target,
            (true, false) => depth < target,
            (false, _) => depth + 2 >= target && depth <= target + 1,
        };

        let mut open: Vec<NodeIdx> = self
            .available
            .iter()
            .copied()
            .filter(|&c| {
                let cand = self.table.get(c);
                cand.child_count() < max && order.allows(cand, child)
            })
            .collect();
        open.sort_by_key(|c| self.table.get(*c).depth);

        let mut pool: Vec<NodeIdx> = open.iter().copied().filter(|c| in_range(self.table.get(*c).depth)).collect();
        if pool.is_empty() {
            // Shallowest layer below the target.
            if let Some(&first) = open.first()
                && self.table.get(first).depth < target
            {
                let depth = self.table.get(first).depth;
                pool = open.into_iter().filter(|c| self.table.get(*c).depth == depth).collect();
            }
        }

        let under: Vec<NodeIdx> = pool
            .iter()
            .copied()
            .filter(|c| self.table.get(*c).child_count() < self.budget[c.index()])
            .collect();
        if under.is_empty() { pool } else { under }
    }

    fn attach(&mut self, parent: NodeIdx, node: NodeIdx) {
        let is_branch = self.energy.should_branch(parent, LINK_BRANCH_PROBABILITY, &mut self.rng)
            || self.table.get(parent).child_count() > 0;
        self.table.link(parent, node);
        let depth = self.table.get(parent).depth + 1;
        self.table.get_mut(node).depth = depth;
        self.energy.record_connection(parent, node, is_branch);
        self.shape.on_linked(self.table.get(parent), self.table.get(node));

        self.connected[node.index()] = true;
        self.available.push(node);
        self.budget[node.index()] = self.child_budget(node);
    }

    /// How many children `node` should aim for. The shape proposes a count;
    /// away from the root the energy controller may widen it when the shape
    /// wants to branch, or cut it to a single child when it does not.
    fn child_budget(&mut self, node: NodeIdx) -> usize {
        let max = self.max_children();
        let ctx = GrowthContext {
            themes: &self.themes,
            max_children: max,
            tier_count: self.config.tiers.len(),
        };
        let n = self.table.get(node);
        let proposed = self.shape.calculate_children_count(n, &ctx, &mut self.rng);
        if n.is_root {
            return proposed.min(max);
        }
        let density = self.shape.config().density;
        let paced = self.energy.calculate_children_count(node, max, density, &mut self.rng);
        let budget = if self.shape.should_branch(n, &ctx, &mut self.rng) {
            proposed.max(paced)
        } else {
            proposed.min(paced).min(1)
        };
        budget.min(max)
    }

    fn attach_orphans(&mut self, root: NodeIdx) {
        let mut orphans: Vec<NodeIdx> = self.table.indices().filter(|i| !self.connected[i.index()]).collect();
        if orphans.is_empty() {
            return;
        }
        tracing::debug!(bucket = self.bucket, orphans = orphans.len(), "attaching orphans");
        orphans.sort_by_key(|o| self.table.get(*o).tier_index);

        let order = self.config.tier_order();
        let max = self.max_children();
        for orphan in orphans {
            let child = self.table.get(orphan);
            let target = child.tier_index as u32;
            let open = || {
                self.available
                    .iter()
                    .copied()
                    .filter(|&c| {
                        let cand = self.table.get(c);
                        cand.child_count() < max && order.allows(cand, child)
                    })
            };
            let fewest_children = |c: &NodeIdx| self.table.get(*c).child_count();
            let parent = open()
                .filter(|c| self.table.get(*c).depth < target)
                .min_by_key(fewest_children)
                .or_else(|| open().min_by_key(fewest_children));

            let parent = match parent {
                Some(parent) => parent,
                None if target == 0 => {
                    if self.table.get(root).child_count() >= max {
                        self.diagnostics.root_overflow_links += 1;
                    }
                    root
                }
                None => {
                    tracing::warn!(bucket = self.bucket, node = %child.id, tier = %child.tier, "no parent for orphan, forced to root");
                    self.diagnostics.forced_root_orphans += 1;
                    root
                }
            };
            self.attach(parent, orphan);
            self.diagnostics.orphans_attached += 1;
        }
    }

    // ========================================================================
    // Post passes
    // ========================================================================

    fn finish(mut self, root: NodeIdx, formation: &dyn Formation, seed: u64) -> TreeOutput {
        let policy = self.convergence_policy();
        let floor = convergence::enforce_floor(&mut self.table, root, &policy);
        self.diagnostics.convergence_links += floor.links_added;
        self.diagnostics.convergence_shortfalls = floor.shortfalls;

        let repair = Repairer {
            max_children: self.max_children(),
            max_passes: self.config.repair_passes,
            order: self.config.tier_order(),
            bucket: self.bucket,
        }
        .run(&mut self.table, root);
        self.diagnostics.repair_passes = repair.passes;
        self.diagnostics.repaired_nodes = repair.relinked;
        self.diagnostics.aggressive_fallback = repair.aggressive_fallback;

        if repair.changed() {
            // Repair may have dropped prerequisites below the floor.
            let floor = convergence::enforce_floor(&mut self.table, root, &policy);
            self.diagnostics.convergence_links += floor.links_added;
            self.diagnostics.convergence_shortfalls = floor.shortfalls;
        }
        self.table.recompute_depths(root);

        let placement = Placement {
            root,
            shape: self.shape.as_ref(),
            ctx: GrowthContext {
                themes: &self.themes,
                max_children: self.config.max_children_per_node,
                tier_count: self.config.tiers.len(),
            },
            layout: &self.config.layout,
            spacing: &self.config.spacing,
        };
        self.diagnostics.overlapping_pairs = formation.place(&mut self.table, &placement, &mut self.rng);

        if !self.diagnostics.is_clean() {
            tracing::debug!(bucket = self.bucket, diagnostics = ?self.diagnostics, "bucket built with repairs");
        }

        let shape_cfg = self.shape.config();
        let config_used = ConfigUsed {
            shape: self.shape.name().to_string(),
            formation: formation.name().to_string(),
            density: shape_cfg.density,
            symmetry: shape_cfg.symmetry_strength,
            convergence_chance: self.settings.convergence_chance,
            seed,
            source: self.settings.source,
        };
        TreeOutput::from_table(
            &self.table,
            root,
            self.shape.layout_style(),
            config_used,
            self.diagnostics,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConfigSource;
    use pretty_assertions::assert_eq;

    fn item(id: &str, tier: &str, theme: &str) -> ItemRecord {
        ItemRecord::new(id, tier).with_name(id).with_bucket("Destruction").with_theme(theme)
    }

    fn children_of<'t>(tree: &'t TreeOutput, id: &str) -> Vec<&'t str> {
        tree.node(id).unwrap().children.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_canonical_root_wins() {
        let mut config = BuilderConfig::default().with_seed(1);
        config.canonical_roots.insert("Destruction".into(), vec!["missing".into(), "b".into()]);
        let builder = TreeBuilder::new(config).unwrap();
        let items = vec![item("a", "Novice", "fire"), item("b", "Apprentice", "frost")];
        let tree = builder.build_bucket("Destruction", &items).unwrap();
        assert_eq!(tree.root, "b");
        assert!(tree.node("b").unwrap().is_root);
    }

    #[test]
    fn test_default_theme_root() {
        let mut config = BuilderConfig::default().with_seed(1);
        config.default_themes.insert("Destruction".into(), "frost".into());
        let builder = TreeBuilder::new(config).unwrap();
        let items = vec![
            item("a", "Novice", "fire"),
            item("b", "Apprentice", "frost"),
            item("c", "Novice", "frost"),
        ];
        let tree = builder.build_bucket("Destruction", &items).unwrap();
        assert_eq!(tree.root, "c");
    }

    #[test]
    fn test_low_confidence_theme_is_unassigned() {
        let builder = TreeBuilder::new(BuilderConfig::default().with_seed(4)).unwrap();
        let items = vec![
            item("a", "Novice", "fire"),
            ItemRecord::new("b", "Novice").with_theme_confidence("frost", 0.1),
        ];
        let tree = builder.build_bucket("Destruction", &items).unwrap();
        assert_eq!(tree.node("b").unwrap().theme, UNASSIGNED_THEME);
        assert_eq!(children_of(&tree, "a"), vec!["b"]);
    }

    #[test]
    fn test_duplicates_and_unknown_tiers_are_counted() {
        let builder = TreeBuilder::new(BuilderConfig::default().with_seed(4)).unwrap();
        let items = vec![
            item("a", "Novice", "fire"),
            item("a", "Adept", "fire"),
            item("b", "Legendary", "fire"),
        ];
        let tree = builder.build_bucket("Destruction", &items).unwrap();
        assert_eq!(tree.nodes.len(), 2);
        assert_eq!(tree.diagnostics.duplicate_items, 1);
        assert_eq!(tree.diagnostics.unknown_tiers, 1);
    }

    #[test]
    fn test_capacity_one_builds_a_chain() {
        let config = BuilderConfig::default().with_seed(9).with_max_children(1);
        let builder = TreeBuilder::new(config).unwrap();
        let items = vec![
            item("a", "Novice", "fire"),
            item("b", "Novice", "fire"),
            item("m", "Master", "fire"),
        ];
        let tree = builder.build_bucket("Destruction", &items).unwrap();
        assert_eq!(children_of(&tree, "a"), vec!["b"]);
        assert_eq!(children_of(&tree, "b"), vec!["m"]);
        // A single theme offers no convergence partners for the master item.
        assert_eq!(tree.diagnostics.convergence_shortfalls, 1);
        assert!(tree.diagnostics.is_clean());
    }

    #[test]
    fn test_override_shape_reported() {
        let mut config = BuilderConfig::default().with_seed(2);
        config
            .bucket_overrides
            .insert("Destruction".into(), BucketOverride::default().with_shape("SPIKY"));
        let builder = TreeBuilder::new(config).unwrap();
        let items = vec![item("a", "Novice", "fire"), item("b", "Apprentice", "fire")];
        let tree = builder.build_bucket("Destruction", &items).unwrap();
        assert_eq!(tree.config_used.shape, "spiky");
        assert_eq!(tree.config_used.source, ConfigSource::Override);
        assert_eq!(tree.layout_style, "spiky");
    }

    #[test]
    fn test_organic_reports_radial_layout() {
        let builder = TreeBuilder::new(BuilderConfig::default().with_seed(2)).unwrap();
        let tree = builder.build_bucket("X", &[item("a", "Novice", "fire")]).unwrap();
        assert_eq!(tree.layout_style, "radial");
        assert_eq!(tree.config_used.shape, "organic");
    }

    #[test]
    fn test_unknown_override_shape_fails_fast() {
        let mut config = BuilderConfig::default();
        config
            .bucket_overrides
            .insert("Destruction".into(), BucketOverride::default().with_shape("spiral"));
        let err = TreeBuilder::new(config).unwrap_err();
        assert!(matches!(err, Error::UnknownPlugin { .. }));
    }

    #[test]
    fn test_empty_bucket_is_an_error() {
        let builder = TreeBuilder::new(BuilderConfig::default()).unwrap();
        assert!(matches!(builder.build_bucket("X", &[]), Err(Error::EmptyBucket(_))));
    }

    #[test]
    fn test_bucket_seed_differs_per_bucket() {
        assert_ne!(bucket_seed(7, "Destruction"), bucket_seed(7, "Illusion"));
        assert_eq!(bucket_seed(7, "Illusion"), bucket_seed(7, "Illusion"));
    }
}
