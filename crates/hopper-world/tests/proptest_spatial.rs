//! Property tests for the spatial index.
//!
//! The index is a broad-phase filter: it may return extra ids, but it must
//! never miss an entity whose center is within one cell width of the query
//! point, and inserting then removing must leave no trace.

use std::collections::HashMap;

use hopper_world::prelude::*;
use proptest::prelude::*;

/// Finite coordinates spanning many cells on both sides of the origin.
fn coord() -> impl Strategy<Value = f64> {
    (-200_000i32..200_000i32).prop_map(|v| v as f64 * 0.01)
}

fn cell_size() -> impl Strategy<Value = f64> {
    (50u32..2_000u32).prop_map(|v| v as f64 * 0.01)
}

#[derive(Debug, Clone)]
enum IndexOp {
    Insert(usize, f64, f64),
    Update(usize, f64, f64),
    Remove(usize),
}

fn index_op() -> impl Strategy<Value = IndexOp> {
    prop_oneof![
        (0..40usize, coord(), coord()).prop_map(|(i, x, z)| IndexOp::Insert(i, x, z)),
        (0..40usize, coord(), coord()).prop_map(|(i, x, z)| IndexOp::Update(i, x, z)),
        (0..40usize).prop_map(IndexOp::Remove),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    #[test]
    fn query_never_misses_entities_within_one_cell(
        c in cell_size(),
        points in prop::collection::vec((coord(), coord()), 1..60),
        (qx, qz) in (coord(), coord()),
        offsets in prop::collection::vec((-0.999f64..0.999, -0.999f64..0.999), 1..20),
    ) {
        let mut index = SpatialIndex::new(c);
        let mut positions = Vec::new();
        for (i, (x, z)) in points.iter().enumerate() {
            let id = EntityId::new(format!("far-{i}"));
            index.insert(id.clone(), *x, *z);
            positions.push((id, *x, *z));
        }
        // Plant entities guaranteed to be within one cell width of the query.
        for (i, (ox, oz)) in offsets.iter().enumerate() {
            let id = EntityId::new(format!("near-{i}"));
            let (x, z) = (qx + ox * c, qz + oz * c);
            index.insert(id.clone(), x, z);
            positions.push((id, x, z));
        }

        let hits = index.query(qx, qz);
        for (id, x, z) in &positions {
            if (x - qx).abs() < c && (z - qz).abs() < c {
                prop_assert!(hits.contains(id), "missed {} at ({}, {})", id, x, z);
            }
        }
    }

    #[test]
    fn insert_then_remove_leaves_no_trace(
        c in cell_size(),
        base in prop::collection::vec((coord(), coord()), 0..30),
        (x, z) in (coord(), coord()),
    ) {
        let mut index = SpatialIndex::new(c);
        for (i, (bx, bz)) in base.iter().enumerate() {
            index.insert(EntityId::new(format!("b{i}")), *bx, *bz);
        }
        let before_len = index.len();
        let before_cells = index.occupied_cells();
        let before_query = index.query(x, z);

        let probe = EntityId::from("probe");
        index.insert(probe.clone(), x, z);
        index.remove(&probe);

        prop_assert_eq!(index.len(), before_len);
        prop_assert_eq!(index.occupied_cells(), before_cells);
        prop_assert_eq!(index.query(x, z), before_query);
        prop_assert!(!index.contains(&probe));
    }

    #[test]
    fn random_ops_keep_single_consistent_membership(
        c in cell_size(),
        ops in prop::collection::vec(index_op(), 1..80),
    ) {
        let mut index = SpatialIndex::new(c);
        let mut model: HashMap<usize, (f64, f64)> = HashMap::new();

        for op in ops {
            match op {
                IndexOp::Insert(i, x, z) => {
                    index.insert(EntityId::new(format!("e{i}")), x, z);
                    model.insert(i, (x, z));
                }
                IndexOp::Update(i, x, z) => {
                    index.update(&EntityId::new(format!("e{i}")), x, z);
                    if let Some(p) = model.get_mut(&i) {
                        *p = (x, z);
                    }
                }
                IndexOp::Remove(i) => {
                    index.remove(&EntityId::new(format!("e{i}")));
                    model.remove(&i);
                }
            }

            prop_assert_eq!(index.len(), model.len());
            for (i, (x, z)) in &model {
                let id = EntityId::new(format!("e{i}"));
                prop_assert_eq!(index.cell_of(&id), Some(index.cell_key(*x, *z)));
                let hits = index.query(*x, *z);
                prop_assert_eq!(hits.iter().filter(|h| **h == id).count(), 1);
            }
        }
    }
}
