//! Tuning constants for movement, server physics, and the server loop.
//!
//! Every struct has a `Default` carrying the documented values and derives
//! `Deserialize` with `#[serde(default)]`, so a partial JSON document only
//! overrides the fields it names.

use serde::{Deserialize, Serialize};

use hopper_world::math::Vec3;

use crate::ConfigError;

/// Server gravity that corresponds to a gravity scale of 1.0.
pub const DEFAULT_SERVER_GRAVITY: f64 = -9.81;

// ---------------------------------------------------------------------------
// MovementConfig
// ---------------------------------------------------------------------------

/// Client-side actor tuning. Speeds are units/s, accelerations units/s²,
/// windows in seconds unless the name says `_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub walk_speed: f64,
    pub sprint_speed: f64,
    pub jump_force: f64,
    /// Gravity at a server gravity of [`DEFAULT_SERVER_GRAVITY`]. Negative.
    pub base_gravity: f64,
    /// Gravity multiplier while falling.
    pub fall_multiplier: f64,
    /// Gravity multiplier while rising with jump released. Larger than
    /// `fall_multiplier`, which makes short hops possible.
    pub low_jump_multiplier: f64,
    /// Most negative vertical velocity allowed.
    pub terminal_velocity: f64,

    pub ground_accel: f64,
    pub ground_decel: f64,
    pub air_accel: f64,
    pub air_decel: f64,
    /// Scale on `ground_accel` while standing on ice.
    pub ice_accel_factor: f64,
    /// Scale on `ground_decel` while standing on ice.
    pub ice_decel_factor: f64,

    pub coyote_time: f64,
    pub jump_buffer_time: f64,

    /// Collision half extents. Smaller than the rendered model.
    pub actor_half_extents: Vec3,
    /// How far below a platform top the actor's feet may be and still land.
    pub stand_tolerance: f64,
    /// Fraction of the remaining yaw closed per second.
    pub turn_rate: f64,

    pub abyss_death_y: f64,
    pub lava_death_y: f64,
    pub void_death_y: f64,

    pub death_cooldown_ms: u64,
    pub respawn_delay_ms: u64,
    pub invulnerability_ms: u64,
    pub trigger_cooldown_ms: u64,
    pub position_send_interval_ms: u64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            walk_speed: 8.0,
            sprint_speed: 14.0,
            jump_force: 12.0,
            base_gravity: -30.0,
            fall_multiplier: 2.0,
            low_jump_multiplier: 3.0,
            terminal_velocity: -40.0,

            ground_accel: 80.0,
            ground_decel: 60.0,
            air_accel: 30.0,
            air_decel: 8.0,
            ice_accel_factor: 0.2,
            ice_decel_factor: 0.06,

            coyote_time: 0.1,
            jump_buffer_time: 0.1,

            actor_half_extents: Vec3::new(0.35, 0.9, 0.35),
            stand_tolerance: 0.5,
            turn_rate: 12.0,

            abyss_death_y: -20.0,
            lava_death_y: 0.5,
            void_death_y: -50.0,

            death_cooldown_ms: 500,
            respawn_delay_ms: 1500,
            invulnerability_ms: 2000,
            trigger_cooldown_ms: 2000,
            position_send_interval_ms: 50,
        }
    }
}

impl MovementConfig {
    /// Parse from JSON, filling omitted fields with defaults, then validate.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the controller misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("walk_speed", self.walk_speed),
            ("sprint_speed", self.sprint_speed),
            ("jump_force", self.jump_force),
            ("ground_accel", self.ground_accel),
            ("ground_decel", self.ground_decel),
            ("air_accel", self.air_accel),
            ("air_decel", self.air_decel),
            ("ice_accel_factor", self.ice_accel_factor),
            ("ice_decel_factor", self.ice_decel_factor),
            ("coyote_time", self.coyote_time),
            ("jump_buffer_time", self.jump_buffer_time),
            ("turn_rate", self.turn_rate),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    details: format!("must be positive and finite, got {value}"),
                });
            }
        }
        if !(self.base_gravity.is_finite() && self.base_gravity < 0.0) {
            return Err(ConfigError::Invalid {
                field: "base_gravity",
                details: format!("must be negative, got {}", self.base_gravity),
            });
        }
        if !(self.terminal_velocity.is_finite() && self.terminal_velocity < 0.0) {
            return Err(ConfigError::Invalid {
                field: "terminal_velocity",
                details: format!("must be negative, got {}", self.terminal_velocity),
            });
        }
        let h = self.actor_half_extents;
        if !(h.is_finite() && h.x > 0.0 && h.y > 0.0 && h.z > 0.0) {
            return Err(ConfigError::Invalid {
                field: "actor_half_extents",
                details: format!("must be positive, got {h:?}"),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ServerPhysics
// ---------------------------------------------------------------------------

/// Physics tuning pushed by the server at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerPhysics {
    pub gravity: f64,
    /// Multiplier on walk and sprint speed.
    pub speed_scale: f64,
    /// Multiplier on jump force.
    pub jump_scale: f64,
}

impl Default for ServerPhysics {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_SERVER_GRAVITY,
            speed_scale: 1.0,
            jump_scale: 1.0,
        }
    }
}

impl ServerPhysics {
    /// Parse a server tuning message.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Ratio of the pushed gravity to the documented default.
    pub fn gravity_scale(&self) -> f64 {
        let scale = self.gravity / DEFAULT_SERVER_GRAVITY;
        if scale.is_finite() {
            scale
        } else {
            1.0
        }
    }
}

// ---------------------------------------------------------------------------
// TickConfig
// ---------------------------------------------------------------------------

/// Configuration for the fixed-interval server loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Seconds per server tick. Must be positive and finite.
    pub fixed_dt: f64,
    /// Minimum milliseconds between two movement broadcasts.
    pub broadcast_interval_ms: u64,
    /// Distance at which a chaser stops advancing.
    pub chase_snap_distance: f64,
}

impl Default for TickConfig {
    /// 20 Hz ticks, 50 ms broadcasts.
    fn default() -> Self {
        Self {
            fixed_dt: 0.05,
            broadcast_interval_ms: 50,
            chase_snap_distance: 0.5,
        }
    }
}
