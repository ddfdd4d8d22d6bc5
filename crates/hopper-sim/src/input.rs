//! Per-frame player input.

use serde::{Deserialize, Serialize};

use hopper_world::math::Vec3;

/// Raw input for one frame: keyboard state plus an analog stick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputState {
    pub w: bool,
    pub a: bool,
    pub s: bool,
    pub d: bool,
    /// Jump key.
    pub space: bool,
    /// Sprint key.
    pub shift: bool,
    /// Stick right, in `[-1, 1]`.
    pub joystick_x: f64,
    /// Stick forward, in `[-1, 1]`.
    pub joystick_y: f64,
    /// Camera yaw in radians. Yaw 0 looks down -Z.
    pub camera_yaw: f64,
}

impl InputState {
    /// Whether any movement input is present.
    pub fn has_movement(&self) -> bool {
        self.w || self.a || self.s || self.d || self.joystick_x != 0.0 || self.joystick_y != 0.0
    }

    /// Camera-relative movement direction on the XZ plane.
    ///
    /// Keys and stick are summed, then clamped to unit length. Magnitudes
    /// below 1 (partial stick deflection) are kept so analog walking is
    /// slower than a full push.
    pub fn movement_direction(&self) -> Vec3 {
        let forward_axis = axis(self.w, self.s) + finite_or_zero(self.joystick_y);
        let right_axis = axis(self.d, self.a) + finite_or_zero(self.joystick_x);

        let (sin, cos) = self.camera_yaw.sin_cos();
        let forward = Vec3::new(-sin, 0.0, -cos);
        let right = Vec3::new(cos, 0.0, -sin);
        let dir = forward * forward_axis + right * right_axis;

        let len = dir.length();
        if len > 1.0 {
            dir * (1.0 / len)
        } else {
            dir
        }
    }
}

fn axis(positive: bool, negative: bool) -> f64 {
    match (positive, negative) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Turns the held jump key into a one-frame press.
#[derive(Debug, Clone, Copy, Default)]
pub struct JumpEdge {
    prev_held: bool,
}

impl JumpEdge {
    /// Returns `true` only on the frame the key goes down.
    pub fn pressed(&mut self, held: bool) -> bool {
        let pressed = held && !self.prev_held;
        self.prev_held = held;
        pressed
    }
}
