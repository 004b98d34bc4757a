//! Triangle meshes and ray queries
//!
//! Track pieces, platforms and checkpoint planes are plain triangle soups
//! with a world-space translation. Raycasts are double-sided: collision
//! ribbons are open surfaces and a ray may approach from either face.

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};

/// Rays shorter than this are not intersected
const RAY_EPSILON: f32 = 1e-7;
/// Padding applied to bounds so zero-thickness planes still pass the slab test
const BOUNDS_PADDING: f32 = 1e-3;

/// GPU-ready vertex: position and smooth normal
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// A half-line from `origin` along unit `direction`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Ray from `origin` toward `target`; `None` if they coincide
    pub fn towards(origin: Vec3, target: Vec3) -> Option<Self> {
        let direction = (target - origin).try_normalize()?;
        Some(Self { origin, direction })
    }

    #[inline]
    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Nearest intersection of a ray with a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub point: Vec3,
    /// Face normal from the triangle winding, not oriented toward the ray
    pub normal: Vec3,
}

/// Axis-aligned bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for &p in points {
            min = min.min(p);
            max = max.max(p);
        }
        Self { min, max }
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Slab test for a ray starting at distance zero
    pub fn intersects_ray(&self, ray: &Ray) -> bool {
        let min = self.min - Vec3::splat(BOUNDS_PADDING);
        let max = self.max + Vec3::splat(BOUNDS_PADDING);

        let mut t_min = 0.0_f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let origin = ray.origin[axis];
            let dir = ray.direction[axis];
            if dir.abs() < RAY_EPSILON {
                if origin < min[axis] || origin > max[axis] {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let mut t0 = (min[axis] - origin) * inv;
            let mut t1 = (max[axis] - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }
        true
    }
}

/// Möller-Trumbore intersection, accepting hits from both faces
///
/// Returns the distance along the ray for hits at or in front of the origin.
pub fn intersect_triangle(ray: &Ray, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let edge1 = b - a;
    let edge2 = c - a;
    let p = ray.direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < RAY_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    let s = ray.origin - a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(q) * inv_det;
    (t >= 0.0).then_some(t)
}

/// A triangle mesh with a world translation
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Local-space vertex positions
    positions: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    bounds: Aabb,
    /// Translation applied on top of any parent offset
    pub position: Vec3,
}

impl Mesh {
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        let bounds = Aabb::from_points(&positions);
        Self {
            positions,
            triangles,
            bounds,
            position: Vec3::ZERO,
        }
    }

    /// Flat rectangle in the local XY plane, facing +Z, rotated then placed
    /// at `center`
    pub fn plane(width: f32, height: f32, rotation: Quat, center: Vec3) -> Self {
        let hw = width * 0.5;
        let hh = height * 0.5;
        let corners = [
            Vec3::new(-hw, hh, 0.0),
            Vec3::new(hw, hh, 0.0),
            Vec3::new(-hw, -hh, 0.0),
            Vec3::new(hw, -hh, 0.0),
        ];
        let positions = corners.iter().map(|&c| rotation * c).collect();
        let mut mesh = Self::new(positions, vec![[0, 2, 1], [2, 3, 1]]);
        mesh.position = center;
        mesh
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// World-space bounds given the parent's offset
    pub fn world_bounds(&self, parent: Vec3) -> Aabb {
        self.bounds.translated(parent + self.position)
    }

    /// Nearest hit in world space, with `parent` added to this mesh's position
    pub fn raycast(&self, ray: &Ray, parent: Vec3) -> Option<RayHit> {
        if self.is_empty() {
            return None;
        }
        let offset = parent + self.position;
        if !self.bounds.translated(offset).intersects_ray(ray) {
            return None;
        }

        // Intersect in local space; translation does not change distances
        let local = Ray {
            origin: ray.origin - offset,
            direction: ray.direction,
        };

        let mut nearest: Option<(f32, usize)> = None;
        for (i, tri) in self.triangles.iter().enumerate() {
            let [a, b, c] = tri.map(|v| self.positions[v as usize]);
            if let Some(t) = intersect_triangle(&local, a, b, c) {
                if nearest.is_none_or(|(best, _)| t < best) {
                    nearest = Some((t, i));
                }
            }
        }

        nearest.map(|(distance, i)| {
            let [a, b, c] = self.triangles[i].map(|v| self.positions[v as usize]);
            RayHit {
                distance,
                point: ray.at(distance),
                normal: (b - a).cross(c - a).normalize_or_zero(),
            }
        })
    }

    /// Vertices with area-weighted smooth normals for GPU upload
    pub fn vertices(&self) -> Vec<MeshVertex> {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in &self.triangles {
            let [a, b, c] = tri.map(|v| self.positions[v as usize]);
            let face = (b - a).cross(c - a);
            for &v in tri {
                normals[v as usize] += face;
            }
        }
        self.positions
            .iter()
            .zip(normals)
            .map(|(p, n)| MeshVertex {
                position: p.to_array(),
                normal: n.normalize_or_zero().to_array(),
            })
            .collect()
    }

    /// Triangle indices flattened for an index buffer
    pub fn indices(&self) -> Vec<u32> {
        self.triangles.iter().flatten().copied().collect()
    }
}

/// A root mesh with children that move with it
///
/// The first piece is the root. Children's positions are relative to the
/// root's, so translating the root moves the whole body.
#[derive(Debug, Clone, Default)]
pub struct CompositeMesh {
    pieces: Vec<Mesh>,
}

impl CompositeMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mesh: Mesh) {
        self.pieces.push(mesh);
    }

    pub fn root(&self) -> Option<&Mesh> {
        self.pieces.first()
    }

    pub fn root_mut(&mut self) -> Option<&mut Mesh> {
        self.pieces.first_mut()
    }

    pub fn children(&self) -> &[Mesh] {
        self.pieces.get(1..).unwrap_or(&[])
    }

    /// Every piece with its world offset
    pub fn pieces(&self) -> impl Iterator<Item = (&Mesh, Vec3)> {
        let root_offset = self.root().map_or(Vec3::ZERO, |root| root.position);
        self.pieces
            .iter()
            .enumerate()
            .map(move |(i, mesh)| (mesh, if i == 0 { Vec3::ZERO } else { root_offset }))
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Nearest hit over every piece
    pub fn raycast(&self, ray: &Ray) -> Option<RayHit> {
        self.pieces()
            .filter_map(|(mesh, parent)| mesh.raycast(ray, parent))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}
