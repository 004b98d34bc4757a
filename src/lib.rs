//! Hover Racer - anti-gravity racing on extruded 3D tracks
//!
//! Core modules:
//! - `sim`: Deterministic simulation (track geometry, raycast collision, vehicles, race loop)
//! - `data`: Static track and vehicle authoring data
//! - `settings`: Race timing and presentation parameters
//! - `error`: Load-time configuration errors

pub mod data;
pub mod error;
pub mod settings;
pub mod sim;

pub use error::ConfigError;
pub use settings::RaceSettings;

use glam::{Quat, Vec3};

/// Game configuration constants
pub mod consts {
    use glam::Vec3;

    /// Fixed simulation timestep in milliseconds (60 Hz, one tick per display frame)
    pub const SIM_DT_MS: f32 = 1000.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 4;

    /// Gravity added to vehicle velocity every airborne tick
    pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -0.012, 0.0);
    /// Pitch decay per airborne tick (eases the nose back to level)
    pub const AIRBORNE_PITCH_DECAY: f32 = 0.99;
    /// Roll decay per tick with no steering input
    pub const ROLL_DECAY: f32 = 0.8;

    /// Samples taken along a segment's centerline
    pub const DEFAULT_DIVISIONS: usize = 100;
    /// Samples used to build a curve's arc-length table
    pub const ARC_LENGTH_DIVISIONS: usize = 200;

    /// Checkpoint trigger plane size
    pub const CHECKPOINT_WIDTH: f32 = 48.0;
    pub const CHECKPOINT_HEIGHT: f32 = 8.0;

    /// CPU velocity is set directly each tick, scaled by this factor
    pub const CPU_SPEED_FACTOR: f32 = 50.0;
    /// Fraction of gravity applied to CPU velocity per millisecond
    pub const CPU_GRAVITY_FACTOR: f32 = 0.75;
}

/// World up axis. Vehicles steer and pitch relative to this, never relative
/// to their own tilted frame.
pub const UP: Vec3 = Vec3::Y;

/// Build a rotation from a (pitch, yaw, roll) triple applied in Y-Z-X order
///
/// `rotation.x` is pitch, `rotation.y` is yaw and `rotation.z` is roll.
#[inline]
pub fn euler_yzx(rotation: Vec3) -> Quat {
    Quat::from_rotation_y(rotation.y)
        * Quat::from_rotation_z(rotation.z)
        * Quat::from_rotation_x(rotation.x)
}

/// Angle between two vectors in radians, `π/2` if either is zero length
#[inline]
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    let denominator = (a.length_squared() * b.length_squared()).sqrt();
    if denominator == 0.0 {
        return std::f32::consts::FRAC_PI_2;
    }
    (a.dot(b) / denominator).clamp(-1.0, 1.0).acos()
}

/// Remove the component of `v` along `plane_normal`
///
/// A zero plane normal leaves `v` unchanged.
#[inline]
pub fn project_on_plane(v: Vec3, plane_normal: Vec3) -> Vec3 {
    let len_sq = plane_normal.length_squared();
    if len_sq == 0.0 {
        return v;
    }
    v - plane_normal * (v.dot(plane_normal) / len_sq)
}

/// Format a race time in milliseconds as `m:ss.mmm`
pub fn format_race_time(time_ms: f32) -> String {
    let total_ms = time_ms.max(0.0) as u64;
    let minutes = total_ms / 60_000;
    let seconds = (total_ms / 1000) % 60;
    let millis = total_ms % 1000;
    format!("{minutes}:{seconds:02}.{millis:03}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_euler_yaw_only_turns_forward_axis() {
        // Yaw of π/2 points the model's +Z forward axis along +X
        let q = euler_yzx(Vec3::new(0.0, FRAC_PI_2, 0.0));
        let forward = q * Vec3::Z;
        assert!((forward - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_angle_between() {
        assert!((angle_between(Vec3::X, Vec3::Y) - FRAC_PI_2).abs() < 1e-6);
        assert!((angle_between(Vec3::X, -Vec3::X) - PI).abs() < 1e-6);
        assert!(angle_between(Vec3::Y, Vec3::Y * 3.0).abs() < 1e-3);
        assert_eq!(angle_between(Vec3::ZERO, Vec3::Y), FRAC_PI_2);
    }

    #[test]
    fn test_project_on_plane() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        let p = project_on_plane(v, Vec3::new(0.0, 0.0, -2.0));
        assert!((p - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-6);
        assert_eq!(project_on_plane(v, Vec3::ZERO), v);
    }

    #[test]
    fn test_format_race_time() {
        assert_eq!(format_race_time(0.0), "0:00.000");
        assert_eq!(format_race_time(83_456.0), "1:23.456");
        assert_eq!(format_race_time(-5.0), "0:00.000");
    }
}
