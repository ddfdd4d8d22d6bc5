//! Hopper Sim -- movement, collision behaviors, and entity lifecycle.
//!
//! This crate builds on [`hopper_world`] to provide the per-frame actor
//! controller ([`player::PlayerSim`]) and the fixed-interval server loop
//! ([`tick::ServerTick`]) that drives breakable, kinematic, and chase
//! entities.
//!
//! # Quick Start
//!
//! ```
//! use hopper_sim::prelude::*;
//!
//! let mut world = World::new();
//! world
//!     .spawn(EntitySpec::new(
//!         EntityKind::Platform,
//!         Vec3::new(0.0, -0.5, 0.0),
//!         Vec3::new(20.0, 1.0, 20.0),
//!     ))
//!     .unwrap();
//!
//! let physics = ServerPhysics::default();
//! let mut player = PlayerSim::new(Vec3::new(0.0, 2.0, 0.0), MovementConfig::default());
//! for frame in 0..60u64 {
//!     let ctx = FrameContext::new(1.0 / 60.0, frame * 16, &physics);
//!     player.step(&mut world, &InputState::default(), &ctx);
//! }
//! assert!(player.actor().is_grounded);
//! ```

#![deny(unsafe_code)]

pub mod actor;
pub mod behavior;
pub mod collision;
pub mod config;
pub mod context;
pub mod effects;
pub mod events;
pub mod hazards;
pub mod input;
pub mod lifecycle;
pub mod movement;
pub mod player;
pub mod throttle;
pub mod tick;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the world crate for convenience.
pub use hopper_world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// A configuration document could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The JSON did not parse.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value parsed but is out of range.
    #[error("invalid config field '{field}': {details}")]
    Invalid { field: &'static str, details: String },
}

/// Errors surfaced by the simulation's public API.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    World(#[from] hopper_world::WorldError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use hopper_world::prelude::*;

    pub use crate::actor::{Actor, ActorState, Life};
    pub use crate::behavior::{Behavior, BehaviorKind, Outcome, TriggerCooldowns};
    pub use crate::config::{MovementConfig, ServerPhysics, TickConfig};
    pub use crate::context::{FloorType, FrameContext, GamePhase, HazardKind, HazardPlane};
    pub use crate::effects::{ActiveEffect, EffectKind, Modifiers};
    pub use crate::events::{Cue, Outbox, ParticleKind, SimEvent, SoundKind};
    pub use crate::hazards::DeathCause;
    pub use crate::input::InputState;
    pub use crate::lifecycle::{BreakOutcome, LifecycleScheduler};
    pub use crate::player::PlayerSim;
    pub use crate::tick::{ServerTick, TickDiagnostics};
    pub use crate::{ConfigError, SimError};
}
