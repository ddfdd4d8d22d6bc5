//! Death checks, death, and respawn.

use serde::{Deserialize, Serialize};
use tracing::info;

use hopper_world::math::Vec3;

use crate::actor::{Actor, Life};
use crate::config::MovementConfig;
use crate::context::{FloorType, FrameContext, GamePhase};
use crate::events::{Outbox, ParticleKind, SimEvent, SoundKind};

/// Why the actor died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeathCause {
    /// Fell below the abyss line over an open floor.
    Abyss,
    /// Sank into a lava floor.
    Lava,
    /// Caught by the rising hazard plane.
    Hazard,
    /// Fell below the absolute void line.
    Void,
    /// Touched an obstacle.
    Obstacle,
}

/// Height-based death checks for the actor's current position.
///
/// Everything is skipped while the post-respawn invulnerability window is
/// open. The void line applies on every floor and in every phase.
pub fn check_death(
    actor: &Actor,
    config: &MovementConfig,
    frame: &FrameContext<'_>,
) -> Option<DeathCause> {
    if actor.is_invulnerable(frame.now_ms) {
        return None;
    }
    let y = actor.position.y;

    if y < config.void_death_y {
        return Some(DeathCause::Void);
    }
    if !frame.phase.is_safe() {
        match frame.floor {
            FloorType::None if y < config.abyss_death_y => return Some(DeathCause::Abyss),
            FloorType::Lava if y < config.lava_death_y => return Some(DeathCause::Lava),
            _ => {}
        }
    }
    if frame.hazard.active && frame.phase == GamePhase::Playing && y < frame.hazard.height {
        return Some(DeathCause::Hazard);
    }
    None
}

/// Kill the actor unless it is already dead or died within the cooldown.
///
/// Returns whether the death took effect.
pub fn die(
    actor: &mut Actor,
    cause: DeathCause,
    last_death_at: &mut Option<u64>,
    config: &MovementConfig,
    now_ms: u64,
    outbox: &mut Outbox,
) -> bool {
    if !actor.is_alive() {
        return false;
    }
    if let Some(last) = *last_death_at {
        if now_ms.saturating_sub(last) < config.death_cooldown_ms {
            return false;
        }
    }

    *last_death_at = Some(now_ms);
    let respawn_at = now_ms.saturating_add(config.respawn_delay_ms);
    actor.life = Life::Dead { respawn_at };
    actor.velocity = Vec3::ZERO;
    actor.standing_on = None;
    actor.is_grounded = false;

    info!(?cause, x = actor.position.x, y = actor.position.y, z = actor.position.z, respawn_at, "actor died");
    outbox.emit(SimEvent::Died {
        position: actor.position,
    });
    outbox.particles(actor.position, ParticleKind::Burst);
    outbox.sound(SoundKind::Death);
    true
}

/// Put the actor back at `point`, stationary and briefly invulnerable.
pub fn respawn(
    actor: &mut Actor,
    point: Vec3,
    config: &MovementConfig,
    now_ms: u64,
    outbox: &mut Outbox,
) {
    actor.position = point;
    actor.velocity = Vec3::ZERO;
    actor.is_grounded = false;
    actor.is_jumping = false;
    actor.jump_held = false;
    actor.coyote_timer = 0.0;
    actor.jump_buffer_timer = 0.0;
    actor.standing_on = None;
    actor.speed_boost_until = 0;
    actor.life = Life::Alive;
    actor.invulnerable_until = now_ms.saturating_add(config.invulnerability_ms);

    info!(x = point.x, y = point.y, z = point.z, "actor respawned");
    outbox.emit(SimEvent::Respawned);
}
