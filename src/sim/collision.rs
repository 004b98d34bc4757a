//! Vehicle-ground contact
//!
//! The tricky part of the racer: keeping a vehicle glued to an arbitrary
//! extruded surface using nothing but rays. Rays are cast from the vehicle's
//! center through each corner of its hitbox. A hit only counts when it lies
//! inside the box along that ray, so "grounded" means the surface actually
//! cuts through the vehicle.

use glam::Vec3;

use super::mesh::Ray;
use super::track::Track;
use super::vehicle::Vehicle;
use crate::{UP, angle_between, project_on_plane};

/// A qualifying contact with the track or a platform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundContact {
    /// Contact point in world space
    pub point: Vec3,
    /// Surface normal, flipped to point up
    pub normal: Vec3,
    /// Pitch that lines the vehicle up with the slope
    pub pitch: f32,
    /// Heading reprojected onto the surface
    pub direction: Vec3,
}

/// Result of resolving one vehicle against the track
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CollisionResult {
    /// First qualifying ground contact, `None` when airborne
    pub ground: Option<GroundContact>,
    /// 1-based index of the first checkpoint plane touched
    pub checkpoint: Option<usize>,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self::default()
    }

    pub fn grounded(&self) -> bool {
        self.ground.is_some()
    }

    pub fn ground_height(&self) -> Option<f32> {
        self.ground.map(|contact| contact.point.y)
    }
}

/// Pitch and heading that follow a surface with normal `normal`
///
/// The normal is flipped up first so a ribbon seen from below does not flip
/// the vehicle. Its component along the heading gives the slope angle; the
/// new heading is perpendicular to that component within the vertical plane
/// of travel. Uphill headings get a negative pitch (nose up).
///
/// Returns `(pitch, direction, upward normal)`.
pub fn align_to_surface(normal: Vec3, direction: Vec3) -> (f32, Vec3, Vec3) {
    let normal = if normal.y < 0.0 { -normal } else { normal };

    let plane_normal = UP.cross(direction);
    let along = project_on_plane(normal, plane_normal);
    let mut pitch = angle_between(along, UP);

    let direction = along
        .cross(plane_normal)
        .try_normalize()
        .map_or(direction, |d| -d);

    if direction.y >= 0.0 {
        pitch = -pitch;
    }

    (pitch, direction, normal)
}

/// Cast the hitbox rays for `vehicle` against `track`
///
/// Ground and checkpoints are tested independently on the same rays. The
/// first qualifying ground hit wins; at most one checkpoint is reported.
pub fn resolve(vehicle: &Vehicle, track: &Track) -> CollisionResult {
    let origin = vehicle.position;
    let mut result = CollisionResult::miss();

    for offset in vehicle.hitbox_offsets() {
        let reach = offset.length();
        let Some(ray) = Ray::towards(origin, origin + offset) else {
            continue;
        };

        if result.ground.is_none() {
            if let Some(hit) = track.raycast_ground(&ray).filter(|hit| hit.distance < reach) {
                let (pitch, direction, normal) = align_to_surface(hit.normal, vehicle.direction);
                result.ground = Some(GroundContact {
                    point: hit.point,
                    normal,
                    pitch,
                    direction,
                });
            }
        }

        if result.checkpoint.is_none() {
            result.checkpoint = track
                .checkpoints
                .iter()
                .find(|cp| cp.raycast(&ray).is_some_and(|hit| hit.distance < reach))
                .map(|cp| cp.index);
        }

        if result.ground.is_some() && result.checkpoint.is_some() {
            break;
        }
    }

    result
}
