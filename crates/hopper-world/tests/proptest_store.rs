//! Property tests for the entity store.
//!
//! Random spawn/modify/move/destroy/clear sequences must keep the store,
//! its spawn order, its groups, and its spatial index in agreement, and must
//! never exceed capacity.

use hopper_world::prelude::*;
use proptest::prelude::*;

const CAPACITY: usize = 25;

#[derive(Debug, Clone)]
enum StoreOp {
    Spawn(EntityKind, f64, f64, f64, Option<u8>),
    Move(usize, f64, f64),
    Resize(usize, f64),
    Regroup(usize, Option<u8>),
    Destroy(usize),
    Clear,
}

fn coord() -> impl Strategy<Value = f64> {
    (-10_000i32..10_000i32).prop_map(|v| v as f64 * 0.01)
}

/// Coordinates near the origin, biased toward cell boundaries.
fn edge_coord() -> impl Strategy<Value = f64> {
    prop_oneof![
        (-4_000i32..4_000i32).prop_map(|v| v as f64 * 0.01),
        (-5i32..=5, -10i32..=10).prop_map(|(cell, nudge)| cell as f64 * 8.0 + nudge as f64 * 0.01),
    ]
}

/// Footprint of the default actor.
const ACTOR_SIZE: Vec3 = Vec3::new(0.7, 1.8, 0.7);

fn kind() -> impl Strategy<Value = EntityKind> {
    prop::sample::select(EntityKind::ALL.to_vec())
}

fn store_op() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        6 => (kind(), coord(), coord(), 1u32..2_000, prop::option::of(0u8..3))
            .prop_map(|(k, x, z, w, g)| StoreOp::Spawn(k, x, z, w as f64 * 0.01, g)),
        3 => (0..50usize, coord(), coord()).prop_map(|(i, x, z)| StoreOp::Move(i, x, z)),
        1 => (0..50usize, 1u32..3_000).prop_map(|(i, w)| StoreOp::Resize(i, w as f64 * 0.01)),
        1 => (0..50usize, prop::option::of(0u8..3)).prop_map(|(i, g)| StoreOp::Regroup(i, g)),
        2 => (0..50usize).prop_map(StoreOp::Destroy),
        1 => Just(StoreOp::Clear),
    ]
}

fn group_props(group: Option<u8>) -> Properties {
    Properties {
        group_id: group.map(|g| format!("g{g}")),
        ..Default::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1_000))]

    #[test]
    fn store_ops_preserve_invariants(ops in prop::collection::vec(store_op(), 1..120)) {
        let mut world = World::with_config(WorldConfig {
            max_entities: CAPACITY,
            ..Default::default()
        });
        let mut alive: Vec<EntityId> = Vec::new();

        for op in ops {
            match op {
                StoreOp::Spawn(k, x, z, w, g) => {
                    let spec = EntitySpec::new(k, Vec3::new(x, 0.0, z), Vec3::new(w, 1.0, w))
                        .with_properties(group_props(g));
                    match world.spawn(spec) {
                        Ok(e) => alive.push(e.id),
                        Err(WorldError::CapacityExceeded { max }) => {
                            prop_assert_eq!(max, CAPACITY);
                            prop_assert_eq!(alive.len(), CAPACITY);
                        }
                        Err(other) => prop_assert!(false, "unexpected error {}", other),
                    }
                }
                StoreOp::Move(i, x, z) => {
                    if !alive.is_empty() {
                        let id = &alive[i % alive.len()];
                        prop_assert!(world.set_position(id, Vec3::new(x, 0.0, z)));
                    }
                }
                StoreOp::Resize(i, w) => {
                    if !alive.is_empty() {
                        let id = alive[i % alive.len()].clone();
                        let patch = EntityPatch {
                            size: Some(Vec3::new(w, 1.0, w)),
                            ..Default::default()
                        };
                        prop_assert!(world.modify(&id, patch).is_ok());
                    }
                }
                StoreOp::Regroup(i, g) => {
                    if !alive.is_empty() {
                        let id = alive[i % alive.len()].clone();
                        let patch = EntityPatch {
                            properties: Some(group_props(g)),
                            ..Default::default()
                        };
                        prop_assert!(world.modify(&id, patch).is_ok());
                    }
                }
                StoreOp::Destroy(i) => {
                    if !alive.is_empty() {
                        let id = alive.remove(i % alive.len());
                        prop_assert!(world.destroy(&id).is_ok());
                        prop_assert!(world.destroy(&id).is_err());
                    }
                }
                StoreOp::Clear => {
                    world.clear();
                    alive.clear();
                }
            }

            prop_assert_eq!(world.len(), alive.len());
            prop_assert!(world.len() <= CAPACITY);
            if let Err(msg) = world.check_consistency() {
                prop_assert!(false, "inconsistent world: {}", msg);
            }
            // Spawn order matches our tracking (modify keeps the slot).
            prop_assert_eq!(world.ids(), alive.as_slice());
        }
    }

    /// Every entity whose box overlaps an actor-sized box shows up in the
    /// broad phase around that box's center, whether it sits in a
    /// neighboring cell, straddles a cell edge, or is on the oversized list.
    #[test]
    fn collision_candidates_cover_every_overlapping_box(
        entities in prop::collection::vec(
            (edge_coord(), edge_coord(), 1u32..2_000, 1u32..2_000),
            1..60,
        ),
        actors in prop::collection::vec((edge_coord(), edge_coord()), 1..20),
    ) {
        let mut world = World::new();
        for (x, z, w, d) in entities {
            world
                .spawn(EntitySpec::new(
                    EntityKind::Platform,
                    Vec3::new(x, 0.0, z),
                    Vec3::new(w as f64 * 0.01, 1.0, d as f64 * 0.01),
                ))
                .unwrap();
        }

        for (ax, az) in actors {
            let body = Aabb::from_center_size(Vec3::new(ax, 0.0, az), ACTOR_SIZE);
            let candidates = world.collision_candidates(ax, az);
            for entity in world.iter() {
                if body.intersects(&entity.aabb()) {
                    prop_assert!(
                        candidates.contains(&entity.id),
                        "missed {} at {:?} size {:?} for actor at ({}, {})",
                        entity.id, entity.position, entity.size, ax, az
                    );
                }
            }
            let mut unique = candidates.clone();
            unique.sort();
            unique.dedup();
            prop_assert_eq!(unique.len(), candidates.len());
        }
    }

    #[test]
    fn reads_never_reapply_defaults(
        k in kind(),
        breakable in any::<bool>(),
        chase in any::<bool>(),
        kinematic in any::<bool>(),
    ) {
        let mut world = World::new();
        let spec = EntitySpec::new(k, Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0))
            .with_properties(Properties {
                breakable,
                chase,
                kinematic,
                ..Default::default()
            });
        let spawned = world.spawn(spec).unwrap();
        for _ in 0..3 {
            prop_assert_eq!(world.get(&spawned.id), Some(&spawned));
        }
        prop_assert_eq!(
            spawned.properties.clone().with_defaults(k),
            spawned.properties.clone()
        );
    }
}
