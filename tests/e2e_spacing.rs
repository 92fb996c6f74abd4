//! End-to-end tests for the spacing engine's relaxation.

use spelltree::geometry::Vec2;
use spelltree::model::{NodeIdx, NodeTable};
use spelltree::{SpacingConfig, SpacingEngine};

fn cluster(positions: impl IntoIterator<Item = Vec2>) -> SpacingEngine {
    let mut engine = SpacingEngine::new(SpacingConfig::default());
    for (i, pos) in positions.into_iter().enumerate() {
        engine.register_node(NodeIdx(i as u32), pos);
    }
    engine
}

fn assert_shrinking(initial: usize, history: &[usize]) {
    let mut previous = initial;
    for (i, &count) in history.iter().enumerate() {
        assert!(
            count == 0 || count < previous,
            "iteration {i}: {count} overlaps after {previous} ({history:?})"
        );
        previous = count;
    }
}

#[test]
fn test_coincident_cluster_spreads_out() {
    let mut engine = cluster((0..40).map(|_| Vec2::ZERO));
    let initial = engine.count_overlaps();
    assert_eq!(initial, 40 * 39 / 2);

    let history = engine.repel_nearby_nodes(&mut NodeTable::new(), Some(3));
    assert_eq!(history.len(), 3);
    assert_shrinking(initial, &history);
    assert_eq!(history.last(), Some(&0));
}

#[test]
fn test_spiral_cluster_overlaps_shrink_every_iteration() {
    let spiral = (0..40).map(|i| {
        let i = f64::from(i);
        Vec2::new(0.05 * i * i.cos(), 0.05 * i * i.sin())
    });
    let mut engine = cluster(spiral);
    let initial = engine.count_overlaps();
    assert!(initial > 100, "{initial}");

    let history = engine.repel_nearby_nodes(&mut NodeTable::new(), Some(3));
    assert_eq!(history.len(), 3);
    assert_shrinking(initial, &history);
}

#[test]
fn test_relaxation_writes_positions_back() {
    let mut table = NodeTable::new();
    let a = table.insert("a", "a", "Novice", 0, "fire").unwrap();
    let b = table.insert("b", "b", "Novice", 0, "fire").unwrap();

    let mut engine = SpacingEngine::new(SpacingConfig::default());
    engine.register_node(a, Vec2::new(0.0, 0.0));
    engine.register_node(b, Vec2::new(0.5, 0.0));
    engine.repel_nearby_nodes(&mut table, Some(1));

    // Each side is pushed half the overlap away from the other.
    assert_eq!(table.get(a).position, Vec2::new(-0.25, 0.0));
    assert_eq!(table.get(b).position, Vec2::new(0.75, 0.0));
    assert_eq!(engine.position(a), Some(Vec2::new(-0.25, 0.0)));
}
