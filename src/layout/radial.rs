//! Radial formation: walk out from the root along the shape's branch angles.

use std::f64::consts::FRAC_PI_2;

use super::{placement_order, relax, settle, Formation, Placement};
use crate::geometry::{normalize_angle, Vec2};
use crate::growth::BuildRng;
use crate::model::{NodeIdx, NodeTable};
use crate::spacing::SpacingEngine;

#[derive(Debug, Clone, Copy, Default)]
pub struct RadialFormation;

impl RadialFormation {
    pub fn boxed() -> Box<dyn Formation> {
        Box::new(Self)
    }
}

impl Formation for RadialFormation {
    fn name(&self) -> &'static str {
        "radial"
    }

    fn place(&self, table: &mut NodeTable, placement: &Placement<'_>, rng: &mut BuildRng) -> usize {
        let Placement { root, shape, ctx, layout, spacing } = *placement;
        let cfg = shape.config();
        let (lo, hi) = cfg.angle_range_radians();

        let mut engine = SpacingEngine::new(spacing.clone());
        let mut placed = vec![false; table.len()];
        let mut heading = vec![FRAC_PI_2; table.len()];

        settle(&mut engine, table, root, Vec2::ZERO, None);
        placed[root.index()] = true;

        for parent in placement_order(table, root) {
            if !placed[parent.index()] {
                // Not reachable from the root; park it near the origin.
                settle(&mut engine, table, parent, Vec2::ZERO, None);
                placed[parent.index()] = true;
            }
            let pending: Vec<NodeIdx> = table
                .get(parent)
                .children()
                .iter()
                .copied()
                .filter(|c| !placed[c.index()])
                .collect();
            if pending.is_empty() {
                continue;
            }

            let parent_node = table.get(parent);
            let total = pending.len();
            let mut angles: Vec<f64> = (0..total)
                .map(|i| shape.get_branch_angle(parent_node, i, total, &ctx, rng))
                .collect();
            let at_root = parent_node.is_root;
            if !at_root {
                cfg.symmetry.apply(&mut angles, cfg.symmetry_strength, lo, hi);
            }

            let origin = parent_node.position;
            let parent_heading = heading[parent.index()];
            for (child, angle) in pending.into_iter().zip(angles) {
                let direction = if at_root {
                    angle
                } else {
                    normalize_angle(parent_heading + angle - FRAC_PI_2)
                };
                heading[child.index()] = direction;
                let preferred = origin + Vec2::from_angle(direction, layout.level_spacing);
                settle(&mut engine, table, child, preferred, Some(origin));
                placed[child.index()] = true;
            }
        }

        relax(&mut engine, table)
    }
}
