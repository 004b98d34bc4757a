//! Sweeping 2D cross-sections along centerlines
//!
//! The path is resampled at equal arc length into `steps + 1` rings. Each
//! ring is the cross-section placed in the plane spanned by the path's
//! normal and binormal at that point, so a profile point `(x, y)` lands at
//! `P + N·x + B·y`. Consecutive rings are stitched with quads.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::curve::SampledPath;
use super::mesh::Mesh;

/// Outward growth of the profile at full bevel
pub const BEVEL_SIZE: f32 = 0.1;
/// Rings added at each end of a bevelled extrusion
pub const BEVEL_SEGMENTS: usize = 3;

/// How a cross-section is swept along a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtrudeOptions {
    /// Rings along the path, minus one
    pub steps: usize,
    /// Taper the profile in at both ends
    pub bevel: bool,
}

impl Default for ExtrudeOptions {
    fn default() -> Self {
        Self {
            steps: 100,
            bevel: true,
        }
    }
}

/// A 2D profile, at least two points
///
/// Three or more points form a closed outline; two points are a flat strip.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    points: Vec<Vec2>,
    centroid: Vec2,
}

impl CrossSection {
    pub fn new(points: Vec<Vec2>) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let centroid = points.iter().copied().sum::<Vec2>() / points.len() as f32;
        Some(Self { points, centroid })
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        self.points.len() >= 3
    }

    /// Profile edges as index pairs
    fn edges(&self) -> Vec<(usize, usize)> {
        let n = self.points.len();
        let count = if self.is_closed() { n } else { n - 1 };
        (0..count).map(|i| (i, (i + 1) % n)).collect()
    }

    /// Profile grown away from its centroid by `amount`
    fn expanded(&self, amount: f32) -> Vec<Vec2> {
        self.points
            .iter()
            .map(|&p| p + (p - self.centroid).normalize_or_zero() * amount)
            .collect()
    }
}

/// Orthonormal basis carried along a path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub tangent: Vec3,
    pub normal: Vec3,
    pub binormal: Vec3,
}

/// Frames along a sequence of unit tangents
///
/// The first normal comes from the world axis the tangent is least aligned
/// with; later ones are parallel-transported so the profile does not spin.
/// On closed paths the leftover twist at the seam is spread evenly.
pub fn compute_frames(tangents: &[Vec3], closed: bool) -> Vec<Frame> {
    let Some(&first) = tangents.first() else {
        return Vec::new();
    };

    let abs = first.abs();
    let mut min = f32::MAX;
    let mut seed = Vec3::X;
    if abs.x <= min {
        min = abs.x;
        seed = Vec3::X;
    }
    if abs.y <= min {
        min = abs.y;
        seed = Vec3::Y;
    }
    if abs.z <= min {
        seed = Vec3::Z;
    }

    let side = first.cross(seed).normalize_or_zero();
    let normal = first.cross(side);
    let binormal = first.cross(normal);

    let mut normals = Vec::with_capacity(tangents.len());
    let mut binormals = Vec::with_capacity(tangents.len());
    normals.push(normal);
    binormals.push(binormal);

    for i in 1..tangents.len() {
        let mut normal = normals[i - 1];
        let axis = tangents[i - 1].cross(tangents[i]);
        if let Some(axis) = axis.try_normalize() {
            let angle = tangents[i - 1].dot(tangents[i]).clamp(-1.0, 1.0).acos();
            normal = Quat::from_axis_angle(axis, angle) * normal;
        }
        normals.push(normal);
        binormals.push(tangents[i].cross(normal));
    }

    if closed && tangents.len() > 1 {
        let last = tangents.len() - 1;
        let mut theta = normals[0].dot(normals[last]).clamp(-1.0, 1.0).acos() / last as f32;
        if tangents[0].dot(normals[0].cross(normals[last])) > 0.0 {
            theta = -theta;
        }
        for i in 1..=last {
            normals[i] = Quat::from_axis_angle(tangents[i], theta * i as f32) * normals[i];
            binormals[i] = tangents[i].cross(normals[i]);
        }
    }

    tangents
        .iter()
        .zip(normals)
        .zip(binormals)
        .map(|((&tangent, normal), binormal)| Frame {
            tangent,
            normal,
            binormal,
        })
        .collect()
}

/// Sweep `section` along `path` into a ribbon mesh
///
/// `options.steps` must be positive; track loading rejects zero.
pub fn extrude(path: &SampledPath, section: &CrossSection, options: ExtrudeOptions) -> Mesh {
    let steps = options.steps;
    debug_assert!(steps > 0, "extrude needs at least one step");
    let curve = &path.curve;

    let centers: Vec<Vec3> = (0..=steps)
        .map(|s| curve.point_at(s as f32 / steps as f32))
        .collect();
    let tangents: Vec<Vec3> = (0..=steps)
        .map(|s| curve.tangent_at(s as f32 / steps as f32))
        .collect();
    let frames = compute_frames(&tangents, curve.is_closed());

    let place = |profile: &[Vec2], center: Vec3, frame: &Frame| -> Vec<Vec3> {
        profile
            .iter()
            .map(|p| center + frame.normal * p.x + frame.binormal * p.y)
            .collect::<Vec<_>>()
    };

    let mut rings: Vec<Vec<Vec3>> = Vec::new();
    if options.bevel {
        let body = section.expanded(BEVEL_SIZE);
        for k in 0..BEVEL_SEGMENTS {
            let amount = bevel_amount(k);
            rings.push(place(&section.expanded(amount), centers[0], &frames[0]));
        }
        for (center, frame) in centers.iter().zip(&frames) {
            rings.push(place(&body, *center, frame));
        }
        for k in (0..BEVEL_SEGMENTS).rev() {
            let amount = bevel_amount(k);
            rings.push(place(&section.expanded(amount), centers[steps], &frames[steps]));
        }
    } else {
        for (center, frame) in centers.iter().zip(&frames) {
            rings.push(place(section.points(), *center, frame));
        }
    }

    let n = section.points().len();
    let positions: Vec<Vec3> = rings.iter().flatten().copied().collect();
    let mut triangles = Vec::new();

    for r in 0..rings.len().saturating_sub(1) {
        for &(i, j) in &section.edges() {
            let a = (r * n + i) as u32;
            let b = (r * n + j) as u32;
            let c = ((r + 1) * n + j) as u32;
            let d = ((r + 1) * n + i) as u32;
            triangles.push([a, b, d]);
            triangles.push([b, c, d]);
        }
    }

    // Fan caps close solid profiles; assumes convex outlines
    if section.is_closed() && !curve.is_closed() {
        let last = ((rings.len() - 1) * n) as u32;
        for i in 1..n as u32 - 1 {
            triangles.push([0, i + 1, i]);
            triangles.push([last, last + i, last + i + 1]);
        }
    }

    Mesh::new(positions, triangles)
}

fn bevel_amount(k: usize) -> f32 {
    let t = k as f32 / BEVEL_SEGMENTS as f32;
    BEVEL_SIZE * (t * std::f32::consts::FRAC_PI_2).sin()
}
