//! Per-frame inputs the actor tick reads from the outside world.

use serde::{Deserialize, Serialize};

use hopper_world::math::Vec3;

use crate::config::ServerPhysics;
use crate::effects::ActiveEffect;

/// Session phase, as broadcast by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    #[default]
    Lobby,
    Building,
    Countdown,
    Playing,
    Ended,
}

impl GamePhase {
    /// Phases in which every floor acts solid and hazards are off.
    pub fn is_safe(self) -> bool {
        !matches!(self, GamePhase::Playing)
    }
}

/// What lies under the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloorType {
    #[default]
    Solid,
    None,
    Lava,
}

/// Rising lethal plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardPlane {
    pub active: bool,
    /// `"lava"` or `"water"`; only affects presentation.
    #[serde(rename = "type")]
    pub kind: HazardKind,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HazardKind {
    #[default]
    Lava,
    Water,
}

/// Everything the actor tick needs besides input and the world.
#[derive(Debug, Clone)]
pub struct FrameContext<'a> {
    /// Frame delta in seconds.
    pub dt: f64,
    /// Wall-clock milliseconds, same clock as effect start times.
    pub now_ms: u64,
    pub phase: GamePhase,
    pub floor: FloorType,
    pub effects: &'a [ActiveEffect],
    pub physics: &'a ServerPhysics,
    pub hazard: HazardPlane,
    pub respawn_point: Vec3,
}

impl<'a> FrameContext<'a> {
    /// A playing-phase frame over a solid floor with no effects.
    pub fn new(dt: f64, now_ms: u64, physics: &'a ServerPhysics) -> Self {
        Self {
            dt,
            now_ms,
            phase: GamePhase::Playing,
            floor: FloorType::Solid,
            effects: &[],
            physics,
            hazard: HazardPlane::default(),
            respawn_point: Vec3::new(0.0, 3.0, 0.0),
        }
    }

    /// Whether the ground plane at y = 0 holds the actor this frame.
    pub fn floor_is_solid(&self) -> bool {
        self.phase.is_safe() || self.floor == FloorType::Solid
    }
}
