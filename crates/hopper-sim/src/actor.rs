//! The controlled actor's state.

use serde::{Deserialize, Serialize};

use hopper_world::entity::EntityId;
use hopper_world::math::{Aabb, Vec3};

/// Whether the actor is playing or waiting to respawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Life {
    Alive,
    Dead {
        #[serde(rename = "respawnAt")]
        respawn_at: u64,
    },
}

/// The surface the actor stood on at the end of the last collision pass.
#[derive(Debug, Clone, PartialEq)]
pub struct StandingOn {
    pub entity: EntityId,
    /// The surface's position when last seen, for moving-platform carry.
    pub last_position: Vec3,
}

/// Player-controlled actor.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Yaw in radians.
    pub rotation: f64,
    pub is_grounded: bool,
    /// Seconds of coyote time left.
    pub coyote_timer: f64,
    /// Seconds a buffered jump press stays valid.
    pub jump_buffer_timer: f64,
    pub is_jumping: bool,
    pub jump_held: bool,
    pub life: Life,
    pub standing_on: Option<StandingOn>,
    /// Death checks are skipped until this time (ms).
    pub invulnerable_until: u64,
    /// End of a boost-pad speed window (ms).
    pub speed_boost_until: u64,
}

impl Actor {
    /// A freshly joined actor at `position`.
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            rotation: 0.0,
            is_grounded: false,
            coyote_timer: 0.0,
            jump_buffer_timer: 0.0,
            is_jumping: false,
            jump_held: false,
            life: Life::Alive,
            standing_on: None,
            invulnerable_until: 0,
            speed_boost_until: 0,
        }
    }

    /// Collision box for the given half extents.
    pub fn aabb(&self, half_extents: Vec3) -> Aabb {
        Aabb::new(self.position, half_extents)
    }

    pub fn is_alive(&self) -> bool {
        self.life == Life::Alive
    }

    pub fn is_invulnerable(&self, now_ms: u64) -> bool {
        now_ms < self.invulnerable_until
    }

    /// The id of the surface under the actor, if grounded on an entity.
    pub fn standing_entity(&self) -> Option<&EntityId> {
        self.standing_on.as_ref().map(|s| &s.entity)
    }

    /// Wire view of the actor for renderers and the network.
    pub fn state(&self) -> ActorState {
        ActorState {
            position: self.position,
            velocity: self.velocity,
            rotation: self.rotation,
            is_grounded: self.is_grounded,
            life: self.life,
        }
    }
}

/// Per-tick actor output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: f64,
    pub is_grounded: bool,
    pub life: Life,
}
