//! Spacing engine: a uniform-grid spatial index over node positions.
//!
//! Instead of scanning every node for each neighbour query, positions are
//! bucketed into square cells; a query only visits the cells its radius can
//! touch and then does the exact distance check. On top of the index sit
//! overlap tests, an expanding radial search for free positions, and a
//! bounded pairwise-repulsion relaxation.
//!
//! The position table is authoritative. The cell index is derived from it and
//! only has to agree with it between `register_node` / `unregister_node`
//! calls.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::geometry::Vec2;
use crate::model::{NodeIdx, NodeTable};
use crate::{Error, Result};

/// Golden angle in radians. Spreads per-node fallback directions evenly.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Search rings tried by [`SpacingEngine::find_valid_position`].
const SEARCH_RINGS: u32 = 5;
const SEARCH_STEP_DEGREES: u32 = 30;

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacingConfig {
    /// Closest two nodes may sit. Default: 1.0.
    pub min_spacing: f64,
    /// Edge length of one index cell. Default: 2.0.
    pub grid_cell_size: f64,
    /// Fraction of the overlap pushed back per iteration. Default: 0.5.
    pub repulsion_strength: f64,
    /// Relaxation iterations after layout. Default: 3.
    pub repulsion_iterations: usize,
}

impl Default for SpacingConfig {
    fn default() -> Self {
        Self {
            min_spacing: 1.0,
            grid_cell_size: 2.0,
            repulsion_strength: 0.5,
            repulsion_iterations: 3,
        }
    }
}

impl SpacingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_spacing > 0.0) || !self.min_spacing.is_finite() {
            return Err(Error::invalid_config(
                "spacing.min_spacing",
                self.min_spacing,
                "must be a positive number",
            ));
        }
        if !(self.grid_cell_size > 0.0) || !self.grid_cell_size.is_finite() {
            return Err(Error::invalid_config(
                "spacing.grid_cell_size",
                self.grid_cell_size,
                "must be a positive number",
            ));
        }
        if !(0.0..=1.0).contains(&self.repulsion_strength) {
            return Err(Error::invalid_config(
                "spacing.repulsion_strength",
                self.repulsion_strength,
                "must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Engine
// ============================================================================

type Cell = (i64, i64);

#[derive(Debug, Clone)]
pub struct SpacingEngine {
    config: SpacingConfig,
    cells: HashMap<Cell, Vec<NodeIdx>>,
    /// Indexed by handle; `None` for unregistered nodes.
    positions: Vec<Option<Vec2>>,
}

impl SpacingEngine {
    pub fn new(config: SpacingConfig) -> Self {
        Self {
            config,
            cells: HashMap::new(),
            positions: Vec::new(),
        }
    }

    pub fn config(&self) -> &SpacingConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.positions.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn position(&self, id: NodeIdx) -> Option<Vec2> {
        self.positions.get(id.index()).copied().flatten()
    }

    fn cell_size(&self) -> f64 {
        self.config.grid_cell_size.max(f64::EPSILON)
    }

    fn cell_of(&self, pos: Vec2) -> Cell {
        let size = self.cell_size();
        ((pos.x / size).floor() as i64, (pos.y / size).floor() as i64)
    }

    /// Insert or move a node. The old cell entry is dropped first.
    pub fn register_node(&mut self, id: NodeIdx, position: Vec2) {
        self.unregister_node(id);
        if self.positions.len() <= id.index() {
            self.positions.resize(id.index() + 1, None);
        }
        self.positions[id.index()] = Some(position);
        let cell = self.cell_of(position);
        self.cells.entry(cell).or_default().push(id);
    }

    pub fn unregister_node(&mut self, id: NodeIdx) {
        let Some(old) = self.position(id) else {
            return;
        };
        let cell = self.cell_of(old);
        if let Some(members) = self.cells.get_mut(&cell) {
            members.retain(|m| *m != id);
            if members.is_empty() {
                self.cells.remove(&cell);
            }
        }
        self.positions[id.index()] = None;
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.positions.clear();
    }

    /// Registered nodes within `radius` of `position`, in handle order.
    /// `None` uses twice the minimum spacing.
    pub fn get_nearby_nodes(&self, position: Vec2, radius: Option<f64>) -> Vec<NodeIdx> {
        let radius = radius.unwrap_or(self.config.min_spacing * 2.0);
        if !(radius >= 0.0) || !position.is_finite() {
            return Vec::new();
        }
        let (cx, cy) = self.cell_of(position);
        let reach = (radius / self.cell_size()) as i64 + 1;

        let mut nearby = Vec::new();
        for dx in -reach..=reach {
            for dy in -reach..=reach {
                let Some(members) = self.cells.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                nearby.extend(members.iter().copied().filter(|m| {
                    self.position(*m)
                        .is_some_and(|p| p.distance_to(position) <= radius)
                }));
            }
        }
        nearby.sort_unstable();
        nearby
    }

    /// True when some other registered node lies closer than `min_spacing`.
    pub fn check_overlap(&self, position: Vec2, exclude: Option<NodeIdx>) -> bool {
        let min = self.config.min_spacing;
        self.get_nearby_nodes(position, Some(min))
            .into_iter()
            .filter(|id| Some(*id) != exclude)
            .any(|id| self.position(id).is_some_and(|p| p.distance_to(position) < min))
    }

    /// Nearest free spot around `preferred`.
    ///
    /// Tries rings of `min_spacing × 1..=5` in 30° steps, starting from
    /// `direction` (or parent → preferred, or +X). Never fails: when every
    /// candidate collides, returns `preferred` pushed `2 × min_spacing` along the
    /// search direction, which may still overlap.
    pub fn find_valid_position(
        &self,
        preferred: Vec2,
        parent: Option<Vec2>,
        direction: Option<Vec2>,
    ) -> Vec2 {
        if !preferred.is_finite() || !self.check_overlap(preferred, None) {
            return preferred;
        }

        let direction = direction
            .map(Vec2::normalized)
            .or_else(|| parent.map(|p| (preferred - p).normalized()))
            .filter(|d| *d != Vec2::ZERO)
            .unwrap_or(Vec2::new(1.0, 0.0));

        let min = self.config.min_spacing;
        for ring in 1..=SEARCH_RINGS {
            let radius = min * ring as f64;
            for step in (0..360).step_by(SEARCH_STEP_DEGREES as usize) {
                let candidate = preferred + direction.rotate((step as f64).to_radians()) * radius;
                if !self.check_overlap(candidate, None) {
                    return candidate;
                }
            }
        }
        preferred + direction * (min * 2.0)
    }

    /// Relax overlapping nodes apart.
    ///
    /// Each iteration sums, per node, a push of
    /// `(min_spacing - distance) × repulsion_strength` away from every
    /// neighbour closer than `min_spacing`, then moves all nodes at once and
    /// writes the new positions back into `table`. Coincident nodes are
    /// pushed along a fixed per-node direction. Returns the number of
    /// overlapping pairs left after each iteration.
    pub fn repel_nearby_nodes(&mut self, table: &mut NodeTable, iterations: Option<usize>) -> Vec<usize> {
        let iterations = iterations.unwrap_or(self.config.repulsion_iterations);
        let min = self.config.min_spacing;
        let strength = self.config.repulsion_strength;
        let mut history = Vec::with_capacity(iterations);

        for _ in 0..iterations {
            let registered: Vec<(NodeIdx, Vec2)> = self.registered().collect();
            let mut forces = vec![Vec2::ZERO; registered.len()];

            for (slot, (id, pos)) in registered.iter().enumerate() {
                for other in self.get_nearby_nodes(*pos, None) {
                    if other == *id {
                        continue;
                    }
                    let Some(other_pos) = self.position(other) else {
                        continue;
                    };
                    let diff = *pos - other_pos;
                    let dist = diff.magnitude();
                    if dist >= min {
                        continue;
                    }
                    let push = (min - dist) * strength;
                    let heading = if dist > 0.0 {
                        diff.normalized()
                    } else {
                        Vec2::from_angle(GOLDEN_ANGLE * id.0 as f64, 1.0)
                    };
                    forces[slot] += heading * push;
                }
            }

            for ((id, pos), force) in registered.into_iter().zip(forces) {
                if force == Vec2::ZERO {
                    continue;
                }
                let moved = pos + force;
                self.register_node(id, moved);
                if id.index() < table.len() {
                    table.get_mut(id).position = moved;
                }
            }
            history.push(self.count_overlaps());
        }
        history
    }

    /// Pairs of registered nodes closer than `min_spacing`.
    pub fn count_overlaps(&self) -> usize {
        let min = self.config.min_spacing;
        self.registered()
            .map(|(id, pos)| {
                self.get_nearby_nodes(pos, Some(min))
                    .into_iter()
                    .filter(|other| *other > id)
                    .filter(|other| self.position(*other).is_some_and(|p| p.distance_to(pos) < min))
                    .count()
            })
            .sum()
    }

    fn registered(&self) -> impl Iterator<Item = (NodeIdx, Vec2)> + '_ {
        self.positions
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|p| (NodeIdx(i as u32), p)))
    }
}
