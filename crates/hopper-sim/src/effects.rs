//! Timed gameplay effects and the movement modifiers they produce.
//!
//! Speed effects override one another rather than stacking: the first active
//! effect in [`SPEED_PRECEDENCE`] decides the speed and jump multipliers.
//! Gravity effects work the same way among themselves. Inverted controls is
//! independent of both.

use serde::{Deserialize, Serialize};

/// A kind of timed effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    SpeedBoost,
    SlowMotion,
    Giant,
    Tiny,
    InvertControls,
    LowGravity,
    HighGravity,
}

/// Speed-altering effects, highest priority first.
pub const SPEED_PRECEDENCE: [EffectKind; 4] = [
    EffectKind::SpeedBoost,
    EffectKind::SlowMotion,
    EffectKind::Giant,
    EffectKind::Tiny,
];

impl EffectKind {
    /// `(speed, jump)` multipliers for speed-altering effects.
    fn speed_jump(self) -> Option<(f64, f64)> {
        match self {
            EffectKind::SpeedBoost => Some((1.6, 1.15)),
            EffectKind::SlowMotion => Some((0.5, 0.7)),
            EffectKind::Giant => Some((1.2, 1.3)),
            EffectKind::Tiny => Some((0.8, 0.85)),
            _ => None,
        }
    }

    /// Gravity multiplier for gravity-altering effects.
    fn gravity(self) -> Option<f64> {
        match self {
            EffectKind::LowGravity => Some(0.4),
            EffectKind::HighGravity => Some(1.8),
            _ => None,
        }
    }
}

/// One active effect as sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEffect {
    #[serde(rename = "type")]
    pub kind: EffectKind,
    /// Milliseconds, same clock as the frame's `now_ms`.
    pub start_time: u64,
    /// Milliseconds.
    pub duration: u64,
}

impl ActiveEffect {
    /// Whether the effect covers `now_ms`.
    pub fn is_active(&self, now_ms: u64) -> bool {
        now_ms >= self.start_time && now_ms < self.start_time.saturating_add(self.duration)
    }
}

/// Combined multipliers for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modifiers {
    pub speed: f64,
    pub jump: f64,
    pub gravity: f64,
    pub inverted: bool,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            speed: 1.0,
            jump: 1.0,
            gravity: 1.0,
            inverted: false,
        }
    }
}

impl Modifiers {
    /// Resolve the effects active at `now_ms`.
    ///
    /// `local_boost` is a speed boost opened by a boost pad the actor touched;
    /// it counts as an active [`EffectKind::SpeedBoost`].
    pub fn resolve(effects: &[ActiveEffect], now_ms: u64, local_boost: bool) -> Self {
        let active = |kind: EffectKind| {
            (kind == EffectKind::SpeedBoost && local_boost)
                || effects.iter().any(|e| e.kind == kind && e.is_active(now_ms))
        };

        let mut out = Modifiers::default();
        if let Some((speed, jump)) = SPEED_PRECEDENCE
            .into_iter()
            .find(|k| active(*k))
            .and_then(EffectKind::speed_jump)
        {
            out.speed = speed;
            out.jump = jump;
        }
        if let Some(g) = [EffectKind::LowGravity, EffectKind::HighGravity]
            .into_iter()
            .find(|k| active(*k))
            .and_then(EffectKind::gravity)
        {
            out.gravity = g;
        }
        out.inverted = active(EffectKind::InvertControls);
        out
    }
}
