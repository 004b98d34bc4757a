//! Moving platforms
//!
//! A platform oscillates sinusoidally about the position it was built at.
//! Every platform is driven by the same race clock; the phase offset is what
//! staggers them.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::mesh::{Mesh, Ray, RayHit};

/// Oscillation parameters copied from the segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlatformMotion {
    /// Peak displacement from the origin
    pub direction: Vec3,
    /// Milliseconds per full cycle, positive
    pub period: f32,
    /// Milliseconds added to the clock before taking the phase
    pub phase: f32,
}

impl PlatformMotion {
    /// Displacement from the origin at `elapsed_ms`
    pub fn offset(&self, elapsed_ms: f32) -> Vec3 {
        let t = (elapsed_ms + self.phase).rem_euclid(self.period);
        let angle = std::f32::consts::TAU * t / self.period;
        self.direction * angle.sin()
    }
}

/// A track piece that moves on its own instead of joining the static body
#[derive(Debug, Clone)]
pub struct MovingPlatform {
    pub mesh: Mesh,
    /// Position captured when the mesh was built
    pub origin: Vec3,
    pub motion: PlatformMotion,
}

impl MovingPlatform {
    pub fn new(mesh: Mesh, motion: PlatformMotion) -> Self {
        Self {
            origin: mesh.position,
            mesh,
            motion,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.mesh.position
    }

    /// Move the mesh to where it belongs at `elapsed_ms`
    pub fn update(&mut self, elapsed_ms: f32) {
        self.mesh.position = advance(self, elapsed_ms);
    }

    pub fn raycast(&self, ray: &Ray) -> Option<RayHit> {
        self.mesh.raycast(ray, Vec3::ZERO)
    }
}

/// Where `platform` sits at `elapsed_ms`; pure, reads only the origin
pub fn advance(platform: &MovingPlatform, elapsed_ms: f32) -> Vec3 {
    platform.origin + platform.motion.offset(elapsed_ms)
}
