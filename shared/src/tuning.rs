//! Movement and physics tuning.
//!
//! Units are world units (one tile = 16 units) and seconds. Y points down, so gravity is
//! positive and a jump impulse is applied as negative Y velocity.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Y-down gravity in units/s^2.
pub const GRAVITY: f32 = 500.0;

/// Upward speed set on liftoff (applied as -Y).
pub const JUMP_IMPULSE: f32 = 125.0;

/// Horizontal walking speed in units/s.
pub const WALK_SPEED: f32 = 100.0;

/// After a liftoff, holding jump keeps the impulse applied for this long.
pub const JUMP_WINDOW_MS: u64 = 200;

/// Grace period for a jump after walking off a ledge.
pub const LEDGE_GRACE_MS: u64 = 200;

/// A wall whose center is left of `actor_x + WALL_BIAS` counts as a left wall.
pub const WALL_BIAS: f32 = 4.0;

/// Horizontal camera focus offset from the actor.
pub const FOCUS_OFFSET: f32 = 32.0;

/// "Near zero" for velocities and input vectors.
pub const INPUT_EPSILON: f32 = 1.0e-5;

/// Projectile speed in units/s.
pub const BULLET_SPEED: f32 = 300.0;

/// Projectiles that hit nothing are removed after this long.
pub const BULLET_LIFETIME_MS: u64 = 1500;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub gravity: f32,
    pub jump_impulse: f32,
    pub walk_speed: f32,
    pub jump_window_ms: u64,
    /// Set to 0 to disable walk-off grace entirely.
    pub ledge_grace_ms: u64,
    pub wall_bias: f32,
    pub focus_offset: f32,
    pub input_epsilon: f32,
    pub bullet_speed: f32,
    pub bullet_lifetime_ms: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            jump_impulse: JUMP_IMPULSE,
            walk_speed: WALK_SPEED,
            jump_window_ms: JUMP_WINDOW_MS,
            ledge_grace_ms: LEDGE_GRACE_MS,
            wall_bias: WALL_BIAS,
            focus_offset: FOCUS_OFFSET,
            input_epsilon: INPUT_EPSILON,
            bullet_speed: BULLET_SPEED,
            bullet_lifetime_ms: BULLET_LIFETIME_MS,
        }
    }
}

impl Tuning {
    pub fn jump_window(&self) -> Duration {
        Duration::from_millis(self.jump_window_ms)
    }

    pub fn ledge_grace(&self) -> Duration {
        Duration::from_millis(self.ledge_grace_ms)
    }

    pub fn bullet_lifetime(&self) -> Duration {
        Duration::from_millis(self.bullet_lifetime_ms)
    }
}

/// Parse tuning from RON text. Missing fields fall back to defaults.
pub fn load_tuning_from_str(text: &str) -> Result<Tuning, String> {
    let tuning: Tuning =
        ron::from_str(text).map_err(|e| format!("tuning parse failed: {e}"))?;
    if tuning.walk_speed < 0.0 || tuning.jump_impulse < 0.0 {
        return Err(format!(
            "Tuning speeds must be non-negative (walk_speed={}, jump_impulse={})",
            tuning.walk_speed, tuning.jump_impulse
        ));
    }
    Ok(tuning)
}

/// Load tuning from a RON file.
pub fn load_tuning_from_file(path: impl AsRef<Path>) -> Result<Tuning, String> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| format!("failed to read {path:?}: {e}"))?;
    load_tuning_from_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let tuning = load_tuning_from_str("(walk_speed: 80.0)").unwrap();
        assert_eq!(tuning.walk_speed, 80.0);
        assert_eq!(tuning.gravity, GRAVITY);
        assert_eq!(tuning.jump_window(), Duration::from_millis(200));
    }

    #[test]
    fn test_negative_speed_rejected() {
        let err = load_tuning_from_str("(jump_impulse: -5.0)").unwrap_err();
        assert!(err.contains("non-negative"));
    }

    #[test]
    fn test_garbage_reports_parse_error() {
        let err = load_tuning_from_str("not ron at all {").unwrap_err();
        assert!(err.starts_with("tuning parse failed"));
    }
}
