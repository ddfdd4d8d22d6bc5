//! Typed entity traits.
//!
//! Every entity carries one [`Properties`] struct. Each trait is an
//! independent optional field rather than a key in an open dictionary, so any
//! combination is representable and behavior dispatch can match on fields
//! exhaustively. The JSON form uses the camelCase keys clients already send
//! (`breakDelay`, `isIce`, `isConveyor`, ...).
//!
//! Defaults for omitted tuning values are filled in exactly once by
//! [`Properties::with_defaults`] when an entity enters the store. The
//! function is idempotent: applying it to an already-defaulted bag is a no-op.

use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;
use crate::math::Vec3;

/// Path progress per second for kinematic entities without an explicit speed.
pub const DEFAULT_PATH_SPEED: f64 = 0.5;
/// Units per second for chase entities without an explicit speed.
pub const DEFAULT_CHASE_SPEED: f64 = 3.0;
/// Pursuit radius for chase entities without an explicit `chaseRadius`.
pub const DEFAULT_CHASE_RADIUS: f64 = 20.0;
/// Milliseconds between first step and destruction.
pub const DEFAULT_BREAK_DELAY_MS: u64 = 500;
/// Milliseconds between destruction and regeneration.
pub const DEFAULT_REGEN_DELAY_MS: u64 = 3000;
/// Upward velocity applied by a bounce pad.
pub const DEFAULT_BOUNCE_FORCE: f64 = 18.0;
/// Speed-boost window in milliseconds.
pub const DEFAULT_BOOST_DURATION_MS: u64 = 3000;
/// Conveyor push in units per second.
pub const DEFAULT_CONVEYOR_SPEED: f64 = 3.0;

// ---------------------------------------------------------------------------
// Trait payloads
// ---------------------------------------------------------------------------

/// Conveyor surface: pushes a standing actor along `dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conveyor {
    /// Push direction. Normalized when defaults are applied.
    pub dir: Vec3,
    /// Push speed in units per second.
    #[serde(default)]
    pub speed: Option<f64>,
}

/// Wind volume: adds `force` (units/s²) to an overlapping actor's velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// Acceleration applied while the actor overlaps the volume.
    pub force: Vec3,
}

/// Bounce pad: launches the actor upward.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounce {
    /// Upward velocity set on contact.
    #[serde(default)]
    pub force: Option<f64>,
}

/// Speed-boost pad: opens a timed speed window on contact.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpeedBoost {
    /// Window length in milliseconds.
    #[serde(default)]
    pub duration: Option<u64>,
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

/// The sparse set of traits an entity may carry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Properties {
    /// Position is driven by path animation.
    #[serde(skip_serializing_if = "is_false")]
    pub kinematic: bool,
    /// Waypoints for kinematic movement. Only the endpoints are interpolated.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Vec3>,
    /// Path progress per second (kinematic) or units per second (chase).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Pursues the nearest player.
    #[serde(skip_serializing_if = "is_false")]
    pub chase: bool,
    /// Pursuit radius for chase entities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chase_radius: Option<f64>,
    /// Entities sharing a group move as one rigid body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Breaks after being stepped on.
    #[serde(skip_serializing_if = "is_false")]
    pub breakable: bool,
    /// Milliseconds from first step to destruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_delay: Option<u64>,
    /// Milliseconds from destruction to regeneration; 0 disables regeneration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regen_delay: Option<u64>,
    /// Low-friction surface.
    #[serde(skip_serializing_if = "is_false")]
    pub is_ice: bool,
    /// Conveyor surface.
    #[serde(rename = "isConveyor", skip_serializing_if = "Option::is_none")]
    pub conveyor: Option<Conveyor>,
    /// Wind volume.
    #[serde(rename = "isWind", skip_serializing_if = "Option::is_none")]
    pub wind: Option<Wind>,
    /// Bounce pad.
    #[serde(rename = "isBounce", skip_serializing_if = "Option::is_none")]
    pub bounce: Option<Bounce>,
    /// Speed-boost pad.
    #[serde(rename = "isSpeedBoost", skip_serializing_if = "Option::is_none")]
    pub speed_boost: Option<SpeedBoost>,
    /// Reaching this entity finishes the course.
    #[serde(skip_serializing_if = "is_false")]
    pub is_goal: bool,
    /// Render color as a CSS hex string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Visual spin, renderer only.
    #[serde(skip_serializing_if = "is_false")]
    pub rotating: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Properties {
    /// Fill every omitted tuning value that applies to the traits present.
    ///
    /// Only fields belonging to an enabled trait are defaulted, so a plain
    /// platform does not sprout a `breakDelay`. Values already present are
    /// never overwritten. Chasing wins over a path, so a chaser that is also
    /// kinematic gets the chase speed.
    pub fn with_defaults(mut self, kind: EntityKind) -> Self {
        if self.chase {
            self.speed.get_or_insert(DEFAULT_CHASE_SPEED);
            self.chase_radius.get_or_insert(DEFAULT_CHASE_RADIUS);
        }
        if self.kinematic {
            self.speed.get_or_insert(DEFAULT_PATH_SPEED);
        }
        if self.breakable {
            self.break_delay.get_or_insert(DEFAULT_BREAK_DELAY_MS);
            self.regen_delay.get_or_insert(DEFAULT_REGEN_DELAY_MS);
        }
        if let Some(conveyor) = &mut self.conveyor {
            conveyor.dir = conveyor.dir.normalize_or_zero();
            conveyor.speed.get_or_insert(DEFAULT_CONVEYOR_SPEED);
        }
        if let Some(bounce) = &mut self.bounce {
            bounce.force.get_or_insert(DEFAULT_BOUNCE_FORCE);
        }
        if let Some(boost) = &mut self.speed_boost {
            boost.duration.get_or_insert(DEFAULT_BOOST_DURATION_MS);
        }
        if self.color.is_none() {
            self.color = Some(kind.default_color().to_owned());
        }
        self
    }

    /// Whether this entity follows a scripted path (needs at least two points).
    pub fn has_path(&self) -> bool {
        self.kinematic && self.path.len() >= 2
    }

    /// Path or chase speed, falling back to the documented defaults.
    pub fn speed_or_default(&self) -> f64 {
        self.speed.unwrap_or(if self.chase {
            DEFAULT_CHASE_SPEED
        } else {
            DEFAULT_PATH_SPEED
        })
    }

    /// Chase radius with its default.
    pub fn chase_radius_or_default(&self) -> f64 {
        self.chase_radius.unwrap_or(DEFAULT_CHASE_RADIUS)
    }

    /// Break delay with its default.
    pub fn break_delay_or_default(&self) -> u64 {
        self.break_delay.unwrap_or(DEFAULT_BREAK_DELAY_MS)
    }

    /// Regeneration delay with its default.
    pub fn regen_delay_or_default(&self) -> u64 {
        self.regen_delay.unwrap_or(DEFAULT_REGEN_DELAY_MS)
    }

    /// Conveyor push per second as a vector, if this is a conveyor surface.
    pub fn conveyor_velocity(&self) -> Option<Vec3> {
        self.conveyor.as_ref().map(|c| {
            c.dir.normalize_or_zero() * c.speed.unwrap_or(DEFAULT_CONVEYOR_SPEED)
        })
    }

    /// Bounce force, if this is a bounce pad.
    pub fn bounce_force(&self) -> Option<f64> {
        self.bounce
            .as_ref()
            .map(|b| b.force.unwrap_or(DEFAULT_BOUNCE_FORCE))
    }

    /// Boost window in milliseconds, if this is a speed-boost pad.
    pub fn boost_duration(&self) -> Option<u64> {
        self.speed_boost
            .as_ref()
            .map(|b| b.duration.unwrap_or(DEFAULT_BOOST_DURATION_MS))
    }
}
