//! Hopper World -- entity storage and broad-phase for the platformer core.
//!
//! This crate owns the data side of the simulation: typed entity records
//! ([`entity`], [`properties`]), the uniform-grid [`spatial`] index, the
//! capacity-limited [`store`] that keeps both in sync, and hashed
//! [`snapshot`]s for replication. Behavior lives in `hopper-sim`.
//!
//! # Quick Start
//!
//! ```
//! use hopper_world::prelude::*;
//!
//! let mut world = World::new();
//! let platform = world
//!     .spawn(EntitySpec::new(
//!         EntityKind::Platform,
//!         Vec3::new(0.0, 0.0, 0.0),
//!         Vec3::new(4.0, 1.0, 4.0),
//!     ))
//!     .unwrap();
//!
//! let nearby = world.spatial().query(1.0, 1.0);
//! assert_eq!(nearby, vec![platform.id.clone()]);
//! assert_eq!(world.get(&platform.id), Some(&platform));
//! ```

#![deny(unsafe_code)]

pub mod entity;
pub mod math;
pub mod properties;
pub mod snapshot;
pub mod spatial;
pub mod store;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Validation errors from entity store operations.
///
/// These indicate a caller bug and are returned to the direct caller.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A spawn request named a type that does not exist.
    #[error("unknown entity type '{name}'. Valid types: platform, ramp, collectible, obstacle, trigger, decoration")]
    UnknownEntityType { name: String },

    /// The world already holds the maximum number of entities.
    #[error("entity capacity of {max} reached")]
    CapacityExceeded { max: usize },

    /// A modify/destroy targeted an id that is not in the store.
    #[error("entity {id} does not exist")]
    EntityNotFound { id: entity::EntityId },

    /// Position or size was NaN, infinite, or negative.
    #[error("invalid geometry for entity {id:?}: {details}")]
    InvalidGeometry {
        id: Option<entity::EntityId>,
        details: String,
    },
}

/// Errors produced while encoding, decoding, or restoring a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The snapshot's digest does not match its contents.
    #[error("snapshot hash mismatch: expected {expected}, computed {actual}")]
    HashMismatch { expected: String, actual: String },

    /// The snapshot holds more entities than the target world allows.
    #[error("snapshot holds {count} entities, target world allows {max}")]
    TooManyEntities { count: usize, max: usize },

    /// JSON encoding or decoding failed.
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::entity::{
        Entity, EntityId, EntityIdAllocator, EntityKind, EntityPatch, EntitySpec,
    };
    pub use crate::math::{lerp_angle, wrap_angle, yaw_towards, Aabb, Vec3};
    pub use crate::properties::{Bounce, Conveyor, Properties, SpeedBoost, Wind};
    pub use crate::snapshot::WorldSnapshot;
    pub use crate::spatial::{CellKey, SpatialIndex};
    pub use crate::store::{World, WorldConfig};
    pub use crate::{SnapshotError, WorldError};
}
