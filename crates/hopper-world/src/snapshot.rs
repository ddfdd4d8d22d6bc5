//! World snapshots with BLAKE3 hashing for replication.
//!
//! A [`WorldSnapshot`] is the full entity list in spawn order plus the clock,
//! epoch, and id counter, with a BLAKE3 digest over the canonical JSON form.
//! The server sends one to late joiners; the client verifies the digest
//! before replacing its local world.
//!
//! ```
//! use hopper_world::prelude::*;
//!
//! let mut server = World::new();
//! server
//!     .spawn(EntitySpec::new(EntityKind::Platform, Vec3::ZERO, Vec3::new(4.0, 1.0, 4.0)))
//!     .unwrap();
//!
//! let snapshot = server.capture_snapshot();
//! assert_eq!(snapshot.hash.len(), 64);
//!
//! let mut client = World::new();
//! client.restore_snapshot(&snapshot).unwrap();
//! assert_eq!(client.len(), 1);
//! assert_eq!(client.state_hash(), server.state_hash());
//! ```
//!
//! Scheduler state (pending breaks, path progress) is not part of the
//! snapshot; it belongs to the server loop and is never replicated.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::entity::Entity;
use crate::store::World;
use crate::SnapshotError;

// ---------------------------------------------------------------------------
// WorldSnapshot
// ---------------------------------------------------------------------------

/// Serializable copy of a world's entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    /// Entities in spawn order.
    pub entities: Vec<Entity>,
    /// World clock at capture time.
    pub clock_ms: u64,
    /// World epoch at capture time.
    pub epoch: u64,
    /// Ids handed out so far; restoring continues after this counter.
    pub ids_allocated: u64,
    /// BLAKE3 hex digest (64 lowercase hex chars) of the fields above.
    pub hash: String,
}

impl WorldSnapshot {
    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from a JSON string. The hash is checked on restore, not here.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Recompute the digest from the snapshot's own contents.
    pub fn recompute_hash(&self) -> Result<String, SnapshotError> {
        compute_hash(&self.entities, self.clock_ms, self.epoch, self.ids_allocated)
    }
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

fn compute_hash(
    entities: &[Entity],
    clock_ms: u64,
    epoch: u64,
    ids_allocated: u64,
) -> Result<String, SnapshotError> {
    #[derive(Serialize)]
    struct HashableState<'a> {
        entities: &'a [Entity],
        clock_ms: u64,
        epoch: u64,
        ids_allocated: u64,
    }

    let bytes = serde_json::to_vec(&HashableState {
        entities,
        clock_ms,
        epoch,
        ids_allocated,
    })?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

// ---------------------------------------------------------------------------
// World snapshot methods
// ---------------------------------------------------------------------------

impl World {
    /// Capture every entity in spawn order.
    pub fn capture_snapshot(&self) -> WorldSnapshot {
        let entities: Vec<Entity> = self.iter().cloned().collect();
        let clock_ms = self.clock();
        let epoch = self.epoch();
        let ids_allocated = self.ids_allocated();
        // Entity serialization is infallible; an empty digest never verifies.
        let hash = compute_hash(&entities, clock_ms, epoch, ids_allocated).unwrap_or_default();
        WorldSnapshot {
            entities,
            clock_ms,
            epoch,
            ids_allocated,
            hash,
        }
    }

    /// Replace this world's contents with the snapshot's.
    ///
    /// The digest is verified first; on mismatch the world is left untouched.
    /// Capacity and cell size keep this world's configuration.
    pub fn restore_snapshot(&mut self, snapshot: &WorldSnapshot) -> Result<(), SnapshotError> {
        let actual = snapshot.recompute_hash()?;
        if actual != snapshot.hash {
            warn!(
                expected = %snapshot.hash,
                actual = %actual,
                "snapshot hash mismatch, restore aborted"
            );
            return Err(SnapshotError::HashMismatch {
                expected: snapshot.hash.clone(),
                actual,
            });
        }
        if snapshot.entities.len() > self.capacity() {
            return Err(SnapshotError::TooManyEntities {
                count: snapshot.entities.len(),
                max: self.capacity(),
            });
        }
        self.replace_contents(
            snapshot.entities.clone(),
            snapshot.clock_ms,
            snapshot.epoch,
            snapshot.ids_allocated,
        );
        Ok(())
    }

    /// Digest of the current state.
    pub fn state_hash(&self) -> String {
        self.capture_snapshot().hash
    }
}
