//! The entity store.
//!
//! [`World`] owns every entity record, mints ids, enforces the capacity
//! limit, and keeps the [`SpatialIndex`] in lockstep with the records: every
//! spawn inserts, every position change updates, every destroy removes. No
//! other code touches the index directly.
//!
//! Groups are kept as explicit ordered member lists. The first member of a
//! group (the earliest spawned that is still alive) is its leader.
//!
//! The world is mutated by exactly one tick at a time. It is `Send` but has
//! no interior locking; a multi-threaded host must route all mutation
//! through a single simulation thread.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::entity::{Entity, EntityId, EntityIdAllocator, EntityPatch, EntitySpec};
use crate::math::Vec3;
use crate::spatial::{SpatialIndex, DEFAULT_CELL_SIZE};
use crate::WorldError;

/// Default entity capacity.
pub const DEFAULT_MAX_ENTITIES: usize = 500;

// ---------------------------------------------------------------------------
// WorldConfig
// ---------------------------------------------------------------------------

/// Construction parameters for a [`World`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Spawns beyond this count fail with [`WorldError::CapacityExceeded`].
    pub max_entities: usize,
    /// Spatial index cell width.
    pub cell_size: f64,
    /// Seed for the id suffix generator.
    pub id_seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_entities: DEFAULT_MAX_ENTITIES,
            cell_size: DEFAULT_CELL_SIZE,
            id_seed: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Entity store with an attached spatial index.
#[derive(Debug, Clone)]
pub struct World {
    config: WorldConfig,
    entities: HashMap<EntityId, Entity>,
    /// Spawn order. Iteration follows this list.
    order: Vec<EntityId>,
    /// Group id -> members in spawn order.
    groups: HashMap<String, Vec<EntityId>>,
    /// Entities whose footprint is wider than a cell. The grid alone can
    /// miss them, so collision lookups always include this list.
    oversized: Vec<EntityId>,
    spatial: SpatialIndex,
    ids: EntityIdAllocator,
    clock_ms: u64,
    epoch: u64,
}

impl World {
    /// Create an empty world with default configuration.
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Create an empty world.
    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            spatial: SpatialIndex::new(config.cell_size),
            ids: EntityIdAllocator::new(config.id_seed),
            config,
            entities: HashMap::new(),
            order: Vec::new(),
            groups: HashMap::new(),
            oversized: Vec::new(),
            clock_ms: 0,
            epoch: 0,
        }
    }

    // -- clock / epoch -------------------------------------------------------

    /// Set the clock used to stamp `createdAt` / `modifiedAt`.
    pub fn set_clock(&mut self, now_ms: u64) {
        self.clock_ms = now_ms;
    }

    /// Current clock value in milliseconds.
    pub fn clock(&self) -> u64 {
        self.clock_ms
    }

    /// Incremented by every [`clear`](Self::clear). Scheduled work compares
    /// against it to detect that the world it was scheduled in is gone.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    // -- CRUD ----------------------------------------------------------------

    /// Create an entity with a fresh id. Property defaults are applied here
    /// and nowhere else.
    pub fn spawn(&mut self, spec: EntitySpec) -> Result<Entity, WorldError> {
        if self.entities.len() >= self.config.max_entities {
            warn!(
                max = self.config.max_entities,
                kind = %spec.kind,
                "spawn rejected: entity capacity reached"
            );
            return Err(WorldError::CapacityExceeded {
                max: self.config.max_entities,
            });
        }
        validate_geometry(None, spec.position, spec.size)?;

        let id = self.ids.allocate(spec.kind);
        let entity = Entity {
            id: id.clone(),
            kind: spec.kind,
            position: spec.position,
            size: spec.size,
            properties: spec.properties.with_defaults(spec.kind),
            created_at: self.clock_ms,
            modified_at: None,
        };
        self.attach(entity.clone());
        debug!(entity = %id, kind = %entity.kind, "spawned entity");
        Ok(entity)
    }

    /// Apply a partial update. Fails if the entity does not exist or the new
    /// geometry is invalid; the record is unchanged on failure.
    pub fn modify(&mut self, id: &EntityId, patch: EntityPatch) -> Result<Entity, WorldError> {
        let current = self
            .entities
            .get(id)
            .ok_or_else(|| WorldError::EntityNotFound { id: id.clone() })?;
        let position = patch.position.unwrap_or(current.position);
        let size = patch.size.unwrap_or(current.size);
        validate_geometry(Some(id), position, size)?;

        let mut updated = current.clone();
        updated.position = position;
        updated.size = size;
        if let Some(props) = patch.properties {
            updated.properties = props.with_defaults(updated.kind);
        }
        updated.modified_at = Some(self.clock_ms);

        // Re-attach so group membership and the oversized list follow the
        // new properties and size.
        let position_in_order = self.order.iter().position(|o| o == id);
        self.detach(id);
        self.attach(updated.clone());
        if let Some(idx) = position_in_order {
            // Keep the original spawn slot so group leadership is stable.
            let moved = self.order.pop();
            if let Some(moved) = moved {
                self.order.insert(idx, moved);
            }
            self.rebuild_groups();
        }
        Ok(updated)
    }

    /// Remove an entity, returning its last record.
    pub fn destroy(&mut self, id: &EntityId) -> Result<Entity, WorldError> {
        let entity = self
            .detach(id)
            .ok_or_else(|| WorldError::EntityNotFound { id: id.clone() })?;
        debug!(entity = %id, "destroyed entity");
        Ok(entity)
    }

    /// Remove an entity if present. Used where absence is expected.
    pub fn remove_if_present(&mut self, id: &EntityId) -> Option<Entity> {
        self.detach(id)
    }

    /// Remove every entity and bump the epoch.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.order.clear();
        self.groups.clear();
        self.oversized.clear();
        self.spatial.clear();
        self.epoch += 1;
        debug!(epoch = self.epoch, "world cleared");
    }

    /// Move an entity. Unknown ids are ignored and return `false`.
    ///
    /// This is the hot path used by animation; it does not stamp
    /// `modifiedAt`.
    pub fn set_position(&mut self, id: &EntityId, position: Vec3) -> bool {
        match self.entities.get_mut(id) {
            Some(entity) if position.is_finite() => {
                entity.position = position;
                self.spatial.update(id, position.x, position.z);
                true
            }
            _ => false,
        }
    }

    // -- reads ---------------------------------------------------------------

    /// Look up an entity.
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Whether `id` is present.
    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the world holds no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.config.max_entities
    }

    /// The configuration this world was built with.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Entities in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    /// Ids in spawn order.
    pub fn ids(&self) -> &[EntityId] {
        &self.order
    }

    /// Members of a group in spawn order; empty for unknown groups.
    pub fn group_members(&self, group_id: &str) -> &[EntityId] {
        self.groups.get(group_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First member of a group.
    pub fn group_leader(&self, group_id: &str) -> Option<&EntityId> {
        self.group_members(group_id).first()
    }

    /// Group ids in the order their leaders were spawned.
    pub fn group_ids(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for entity in self.iter() {
            if let Some(g) = entity.group_id() {
                if !seen.iter().any(|s: &String| s == g) {
                    seen.push(g.to_owned());
                }
            }
        }
        seen
    }

    /// Read-only access to the spatial index.
    pub fn spatial(&self) -> &SpatialIndex {
        &self.spatial
    }

    /// Broad-phase candidates around `(x, z)`: the 3×3 grid neighborhood
    /// plus every oversized entity, without duplicates.
    pub fn collision_candidates(&self, x: f64, z: f64) -> Vec<EntityId> {
        let mut out = self.spatial.query(x, z);
        for id in &self.oversized {
            if !out.contains(id) {
                out.push(id.clone());
            }
        }
        out
    }

    /// Verify that records, spawn order, groups, and the spatial index agree.
    /// Returns a description of the first inconsistency found.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.order.len() != self.entities.len() {
            return Err(format!(
                "order has {} ids but store has {} entities",
                self.order.len(),
                self.entities.len()
            ));
        }
        if self.spatial.len() != self.entities.len() {
            return Err(format!(
                "spatial index has {} ids but store has {} entities",
                self.spatial.len(),
                self.entities.len()
            ));
        }
        for (id, entity) in &self.entities {
            let expected = self.spatial.cell_key(entity.position.x, entity.position.z);
            if self.spatial.cell_of(id) != Some(expected) {
                return Err(format!("entity {id} is registered in the wrong cell"));
            }
            if let Some(g) = entity.group_id() {
                if !self.group_members(g).contains(id) {
                    return Err(format!("entity {id} missing from group {g}"));
                }
            }
        }
        if self.entities.len() > self.config.max_entities {
            return Err("capacity exceeded".to_owned());
        }
        Ok(())
    }

    // -- snapshot support ----------------------------------------------------

    pub(crate) fn ids_allocated(&self) -> u64 {
        self.ids.allocated()
    }

    /// Replace all contents with `entities`, preserving their ids and order.
    pub(crate) fn replace_contents(
        &mut self,
        entities: Vec<Entity>,
        clock_ms: u64,
        epoch: u64,
        ids_allocated: u64,
    ) {
        self.entities.clear();
        self.order.clear();
        self.groups.clear();
        self.oversized.clear();
        self.spatial.clear();
        for entity in entities {
            self.attach(entity);
        }
        self.clock_ms = clock_ms;
        self.epoch = epoch;
        self.ids.advance_to(ids_allocated);
    }

    // -- internals -----------------------------------------------------------

    fn is_oversized(&self, size: Vec3) -> bool {
        size.x.max(size.z) > self.spatial.cell_size()
    }

    fn attach(&mut self, entity: Entity) {
        let id = entity.id.clone();
        self.spatial
            .insert(id.clone(), entity.position.x, entity.position.z);
        if let Some(g) = entity.group_id() {
            self.groups.entry(g.to_owned()).or_default().push(id.clone());
        }
        if self.is_oversized(entity.size) {
            self.oversized.push(id.clone());
        }
        self.order.push(id.clone());
        self.entities.insert(id, entity);
    }

    fn detach(&mut self, id: &EntityId) -> Option<Entity> {
        let entity = self.entities.remove(id)?;
        self.spatial.remove(id);
        self.order.retain(|o| o != id);
        self.oversized.retain(|o| o != id);
        if let Some(g) = entity.group_id() {
            if let Some(members) = self.groups.get_mut(g) {
                members.retain(|m| m != id);
                if members.is_empty() {
                    self.groups.remove(g);
                }
            }
        }
        Some(entity)
    }

    fn rebuild_groups(&mut self) {
        self.groups.clear();
        for id in &self.order {
            if let Some(g) = self.entities.get(id).and_then(Entity::group_id) {
                self.groups.entry(g.to_owned()).or_default().push(id.clone());
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_geometry(id: Option<&EntityId>, position: Vec3, size: Vec3) -> Result<(), WorldError> {
    let details = if !position.is_finite() {
        Some(format!("non-finite position {position:?}"))
    } else if !size.is_finite() || size.x < 0.0 || size.y < 0.0 || size.z < 0.0 {
        Some(format!("size must be finite and non-negative, got {size:?}"))
    } else {
        None
    };
    match details {
        Some(details) => Err(WorldError::InvalidGeometry {
            id: id.cloned(),
            details,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;
    use crate::properties::{Properties, DEFAULT_BREAK_DELAY_MS};

    fn platform_at(x: f64, z: f64) -> EntitySpec {
        EntitySpec::new(
            EntityKind::Platform,
            Vec3::new(x, 0.0, z),
            Vec3::new(2.0, 1.0, 2.0),
        )
    }

    fn grouped(x: f64, group: &str) -> EntitySpec {
        platform_at(x, 0.0).with_properties(Properties {
            group_id: Some(group.to_owned()),
            ..Default::default()
        })
    }

    #[test]
    fn spawn_then_get_applies_defaults_once() {
        let mut world = World::new();
        let spec = platform_at(0.0, 0.0).with_properties(Properties {
            breakable: true,
            ..Default::default()
        });
        let spawned = world.spawn(spec).unwrap();
        let first = world.get(&spawned.id).unwrap().clone();
        let second = world.get(&spawned.id).unwrap().clone();
        assert_eq!(first, spawned);
        assert_eq!(first, second);
        assert_eq!(first.properties.break_delay, Some(DEFAULT_BREAK_DELAY_MS));
        assert_eq!(
            first.properties,
            first.properties.clone().with_defaults(first.kind)
        );
    }

    #[test]
    fn capacity_is_enforced() {
        let mut world = World::with_config(WorldConfig {
            max_entities: 3,
            ..Default::default()
        });
        for i in 0..3 {
            world.spawn(platform_at(i as f64, 0.0)).unwrap();
        }
        let err = world.spawn(platform_at(9.0, 0.0)).unwrap_err();
        assert!(matches!(err, WorldError::CapacityExceeded { max: 3 }));
        assert_eq!(world.len(), 3);
    }

    #[test]
    fn destroy_unknown_is_validation_error() {
        let mut world = World::new();
        let err = world.destroy(&EntityId::from("nope")).unwrap_err();
        assert!(matches!(err, WorldError::EntityNotFound { .. }));
        assert!(world.remove_if_present(&EntityId::from("nope")).is_none());
    }

    #[test]
    fn modify_updates_index_and_stamps_time() {
        let mut world = World::new();
        let e = world.spawn(platform_at(0.0, 0.0)).unwrap();
        world.set_clock(1234);
        let patched = world
            .modify(
                &e.id,
                EntityPatch {
                    position: Some(Vec3::new(100.0, 0.0, 100.0)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(patched.modified_at, Some(1234));
        assert!(world.spatial().query(0.0, 0.0).is_empty());
        assert_eq!(world.spatial().query(100.0, 100.0), vec![e.id.clone()]);
        world.check_consistency().unwrap();
    }

    #[test]
    fn rejects_nan_and_negative_geometry() {
        let mut world = World::new();
        let bad = EntitySpec::new(
            EntityKind::Platform,
            Vec3::new(f64::NAN, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
        );
        assert!(matches!(
            world.spawn(bad),
            Err(WorldError::InvalidGeometry { .. })
        ));
        let e = world.spawn(platform_at(0.0, 0.0)).unwrap();
        let err = world
            .modify(
                &e.id,
                EntityPatch {
                    size: Some(Vec3::new(-1.0, 1.0, 1.0)),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, WorldError::InvalidGeometry { .. }));
        assert_eq!(world.get(&e.id).unwrap().size, Vec3::new(2.0, 1.0, 2.0));
    }

    #[test]
    fn group_leader_is_first_spawned_and_survives_modify() {
        let mut world = World::new();
        let a = world.spawn(grouped(0.0, "snake")).unwrap();
        let b = world.spawn(grouped(1.0, "snake")).unwrap();
        world
            .modify(
                &a.id,
                EntityPatch {
                    position: Some(Vec3::new(5.0, 0.0, 0.0)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(world.group_leader("snake"), Some(&a.id));
        assert_eq!(world.group_members("snake"), &[a.id.clone(), b.id.clone()]);

        world.destroy(&a.id).unwrap();
        assert_eq!(world.group_leader("snake"), Some(&b.id));
        world.destroy(&b.id).unwrap();
        assert!(world.group_members("snake").is_empty());
    }

    #[test]
    fn oversized_entities_are_always_candidates() {
        let mut world = World::new();
        let floor = world
            .spawn(EntitySpec::new(
                EntityKind::Platform,
                Vec3::ZERO,
                Vec3::new(200.0, 1.0, 200.0),
            ))
            .unwrap();
        let candidates = world.collision_candidates(90.0, 90.0);
        assert_eq!(candidates, vec![floor.id]);
    }

    #[test]
    fn clear_bumps_epoch_and_empties_index() {
        let mut world = World::new();
        world.spawn(platform_at(0.0, 0.0)).unwrap();
        let epoch = world.epoch();
        world.clear();
        assert_eq!(world.epoch(), epoch + 1);
        assert!(world.is_empty());
        assert!(world.spatial().is_empty());
    }

    #[test]
    fn set_position_on_unknown_id_is_noop() {
        let mut world = World::new();
        assert!(!world.set_position(&EntityId::from("ghost"), Vec3::ZERO));
        assert!(world.spatial().is_empty());
    }
}
