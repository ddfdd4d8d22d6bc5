//! Entity records, kinds, and identifier allocation.
//!
//! An [`EntityId`] is an opaque string on the wire. Ids are minted by the
//! [`EntityIdAllocator`] as `"{type}-{counter}-{suffix}"`: the counter makes
//! every id unique for the lifetime of a world, the hex suffix comes from a
//! seeded PCG generator so two worlds built from the same seed hand out the
//! same ids.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::math::{Aabb, Vec3};
use crate::properties::Properties;
use crate::WorldError;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// Identifier of an entity in the store.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wrap an existing id string (e.g. one received from the network).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

/// The coarse entity type. Behavior is further refined by [`Properties`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Platform,
    Ramp,
    Collectible,
    Obstacle,
    Trigger,
    Decoration,
}

impl EntityKind {
    /// Every kind, in wire order.
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Platform,
        EntityKind::Ramp,
        EntityKind::Collectible,
        EntityKind::Obstacle,
        EntityKind::Trigger,
        EntityKind::Decoration,
    ];

    /// The lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Platform => "platform",
            EntityKind::Ramp => "ramp",
            EntityKind::Collectible => "collectible",
            EntityKind::Obstacle => "obstacle",
            EntityKind::Trigger => "trigger",
            EntityKind::Decoration => "decoration",
        }
    }

    /// Whether the actor can stand on / be blocked by this kind.
    pub fn is_solid(self) -> bool {
        matches!(self, EntityKind::Platform | EntityKind::Ramp)
    }

    /// Color applied when a spawn request omits one.
    pub fn default_color(self) -> &'static str {
        match self {
            EntityKind::Platform => "#3b82f6",
            EntityKind::Ramp => "#22c55e",
            EntityKind::Collectible => "#facc15",
            EntityKind::Obstacle => "#ef4444",
            EntityKind::Trigger => "#a855f7",
            EntityKind::Decoration => "#9ca3af",
        }
    }
}

impl FromStr for EntityKind {
    type Err = WorldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| WorldError::UnknownEntityType { name: s.to_owned() })
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A stored entity. This is also the JSON wire schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// Box center.
    pub position: Vec3,
    /// Full box size.
    pub size: Vec3,
    #[serde(default)]
    pub properties: Properties,
    /// Milliseconds on the owning world's clock.
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<u64>,
}

impl Entity {
    /// The entity's bounding box.
    pub fn aabb(&self) -> Aabb {
        Aabb::from_center_size(self.position, self.size)
    }

    /// Group this entity belongs to, if any.
    pub fn group_id(&self) -> Option<&str> {
        self.properties.group_id.as_deref()
    }
}

/// A spawn request: everything except identity and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub position: Vec3,
    pub size: Vec3,
    #[serde(default)]
    pub properties: Properties,
}

impl EntitySpec {
    /// Spec with default properties.
    pub fn new(kind: EntityKind, position: Vec3, size: Vec3) -> Self {
        Self {
            kind,
            position,
            size,
            properties: Properties::default(),
        }
    }

    /// Replace the properties.
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }

    /// Parse the kind from its wire name, rejecting unknown types.
    pub fn from_wire(
        kind: &str,
        position: Vec3,
        size: Vec3,
        properties: Properties,
    ) -> Result<Self, WorldError> {
        Ok(Self {
            kind: kind.parse()?,
            position,
            size,
            properties,
        })
    }
}

impl From<&Entity> for EntitySpec {
    fn from(e: &Entity) -> Self {
        Self {
            kind: e.kind,
            position: e.position,
            size: e.size,
            properties: e.properties.clone(),
        }
    }
}

/// Partial update for an existing entity. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityPatch {
    #[serde(default)]
    pub position: Option<Vec3>,
    #[serde(default)]
    pub size: Option<Vec3>,
    #[serde(default)]
    pub properties: Option<Properties>,
}

// ---------------------------------------------------------------------------
// EntityIdAllocator
// ---------------------------------------------------------------------------

/// Mints fresh, never-reused entity ids.
#[derive(Debug, Clone)]
pub struct EntityIdAllocator {
    counter: u64,
    rng: Pcg32,
}

impl EntityIdAllocator {
    /// Create an allocator whose suffix stream is derived from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            counter: 0,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Allocate the next id for an entity of the given kind.
    pub fn allocate(&mut self, kind: EntityKind) -> EntityId {
        self.counter += 1;
        let suffix: u32 = self.rng.gen();
        EntityId(format!("{}-{}-{:08x}", kind.as_str(), self.counter, suffix))
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u64 {
        self.counter
    }

    /// Skip past `counter`, used when restoring a snapshot so new ids
    /// cannot collide with restored ones.
    pub fn advance_to(&mut self, counter: u64) {
        self.counter = self.counter.max(counter);
    }
}

impl Default for EntityIdAllocator {
    fn default() -> Self {
        Self::new(0)
    }
}
