//! Layered formation: one row per depth, siblings centred under the root.

use super::{placement_order, relax, settle, Formation, Placement};
use crate::geometry::Vec2;
use crate::growth::BuildRng;
use crate::model::NodeTable;
use crate::spacing::SpacingEngine;

#[derive(Debug, Clone, Copy, Default)]
pub struct LayeredFormation;

impl LayeredFormation {
    pub fn boxed() -> Box<dyn Formation> {
        Box::new(Self)
    }
}

impl Formation for LayeredFormation {
    fn name(&self) -> &'static str {
        "layered"
    }

    fn place(&self, table: &mut NodeTable, placement: &Placement<'_>, _rng: &mut BuildRng) -> usize {
        let layout = placement.layout;
        let mut rows: Vec<Vec<_>> = Vec::new();
        for node in placement_order(table, placement.root) {
            let depth = table.get(node).depth as usize;
            if rows.len() <= depth {
                rows.resize_with(depth + 1, Vec::new);
            }
            rows[depth].push(node);
        }

        let mut engine = SpacingEngine::new(placement.spacing.clone());
        for (depth, row) in rows.iter().enumerate() {
            let y = depth as f64 * layout.level_spacing;
            let half_width = (row.len().saturating_sub(1)) as f64 / 2.0;
            for (slot, &node) in row.iter().enumerate() {
                let x = (slot as f64 - half_width) * layout.sibling_spacing;
                settle(&mut engine, table, node, Vec2::new(x, y), None);
            }
        }

        relax(&mut engine, table)
    }
}
