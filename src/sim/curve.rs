//! Track centerlines: smooth 3D paths through authored waypoints
//!
//! A segment is either a Catmull-Rom spline through its waypoints or a flat
//! elliptical arc around an origin. Both are sampled into a point list and
//! kept as a parametric curve so the extruder can resample them at equal
//! arc length.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::extrude::ExtrudeOptions;
use super::platform::PlatformMotion;
use crate::consts::ARC_LENGTH_DIVISIONS;

/// Catmull-Rom knot spacing below this is treated as a repeated point
const KNOT_EPSILON: f32 = 1e-4;
/// Step used for finite-difference tangents
const TANGENT_DELTA: f32 = 1e-4;

/// Flat elliptical arc lifted into 3D at the origin's height
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    pub origin: Vec3,
    /// Radii along world X and world Z
    pub radius: Vec2,
    pub start_angle: f32,
    pub end_angle: f32,
    pub clockwise: bool,
}

impl Ellipse {
    /// Signed angle swept from start to end
    ///
    /// The raw difference is wrapped into (0, 2π]; equal angles sweep
    /// nothing. Clockwise arcs go the other way round.
    pub fn sweep(&self) -> f32 {
        use std::f32::consts::TAU;

        let raw = self.end_angle - self.start_angle;
        let same_points = raw.abs() < f32::EPSILON;

        let mut delta = raw.rem_euclid(TAU);
        if delta < f32::EPSILON {
            delta = if same_points { 0.0 } else { TAU };
        }

        if self.clockwise && !same_points {
            delta = if delta == TAU { -TAU } else { delta - TAU };
        }
        delta
    }

    /// Point at `t` in [0, 1] along the sweep
    pub fn point(&self, t: f32) -> Vec3 {
        let angle = self.start_angle + t * self.sweep();
        Vec3::new(
            self.origin.x + self.radius.x * angle.cos(),
            self.origin.y,
            self.origin.z + self.radius.y * angle.sin(),
        )
    }
}

/// How a segment's centerline is generated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PathShape {
    /// Smooth interpolation through at least two waypoints
    Spline { points: Vec<Vec3>, closed: bool },
    Ellipse(Ellipse),
}

/// One validated piece of track centerline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSegment {
    pub shape: PathShape,
    /// Index into each layer's cross-section list
    pub cross_section: usize,
    /// Number of sample steps along the centerline
    pub divisions: usize,
    /// Overrides the track's extrusion options for this segment
    pub extrude: Option<ExtrudeOptions>,
    /// Present when the segment is a moving platform
    pub motion: Option<PlatformMotion>,
}

impl CurveSegment {
    pub fn is_closed(&self) -> bool {
        matches!(self.shape, PathShape::Spline { closed: true, .. })
    }
}

/// Centripetal Catmull-Rom spline
#[derive(Debug, Clone)]
pub struct CatmullRom {
    points: Vec<Vec3>,
    closed: bool,
}

impl CatmullRom {
    /// Needs at least two points
    pub fn new(points: Vec<Vec3>, closed: bool) -> Option<Self> {
        (points.len() >= 2).then_some(Self { points, closed })
    }

    /// Point at parameter `t` in [0, 1]; each waypoint span gets an equal
    /// share of the parameter range
    pub fn point(&self, t: f32) -> Vec3 {
        let points = &self.points;
        let l = points.len();
        let t = t.clamp(0.0, 1.0);

        let spans = if self.closed { l } else { l - 1 };
        let p = spans as f32 * t;
        let mut index = p.floor() as usize;
        let mut weight = p - index as f32;

        if !self.closed && index >= l - 1 {
            index = l - 2;
            weight = 1.0;
        }

        let p0 = if self.closed || index > 0 {
            points[(index + l - 1) % l]
        } else {
            2.0 * points[0] - points[1]
        };
        let p1 = points[index % l];
        let p2 = points[(index + 1) % l];
        let p3 = if self.closed || index + 2 < l {
            points[(index + 2) % l]
        } else {
            2.0 * points[l - 1] - points[l - 2]
        };

        centripetal(p0, p1, p2, p3, weight)
    }
}

/// Evaluate the span p1..p2 with knot spacing from squared distances^0.25
fn centripetal(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, w: f32) -> Vec3 {
    let mut dt0 = p0.distance_squared(p1).powf(0.25);
    let mut dt1 = p1.distance_squared(p2).powf(0.25);
    let mut dt2 = p2.distance_squared(p3).powf(0.25);

    if dt1 < KNOT_EPSILON {
        dt1 = 1.0;
    }
    if dt0 < KNOT_EPSILON {
        dt0 = dt1;
    }
    if dt2 < KNOT_EPSILON {
        dt2 = dt1;
    }

    let t1 = ((p1 - p0) / dt0 - (p2 - p0) / (dt0 + dt1) + (p2 - p1) / dt1) * dt1;
    let t2 = ((p2 - p1) / dt1 - (p3 - p1) / (dt1 + dt2) + (p3 - p2) / dt2) * dt1;

    let c0 = p1;
    let c1 = t1;
    let c2 = -3.0 * p1 + 3.0 * p2 - 2.0 * t1 - t2;
    let c3 = 2.0 * p1 - 2.0 * p2 + t1 + t2;

    c0 + w * (c1 + w * (c2 + w * c3))
}

/// Straight segments between consecutive points, parameterised by length
#[derive(Debug, Clone)]
pub struct Polyline {
    points: Vec<Vec3>,
    cumulative: Vec<f32>,
}

impl Polyline {
    pub fn new(points: Vec<Vec3>) -> Self {
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        for (i, point) in points.iter().enumerate() {
            if i > 0 {
                total += point.distance(points[i - 1]);
            }
            cumulative.push(total);
        }
        Self { points, cumulative }
    }

    pub fn point(&self, t: f32) -> Vec3 {
        let total = self.cumulative.last().copied().unwrap_or(0.0);
        if self.points.len() < 2 || total <= 0.0 {
            return self.points.first().copied().unwrap_or(Vec3::ZERO);
        }

        let target = t.clamp(0.0, 1.0) * total;
        let i = self
            .cumulative
            .partition_point(|&len| len <= target)
            .clamp(1, self.points.len() - 1);
        let span = self.cumulative[i] - self.cumulative[i - 1];
        let fraction = if span > 0.0 {
            (target - self.cumulative[i - 1]) / span
        } else {
            0.0
        };
        self.points[i - 1].lerp(self.points[i], fraction)
    }
}

#[derive(Debug, Clone)]
enum CurveKind {
    CatmullRom(CatmullRom),
    Polyline(Polyline),
}

/// A parametric centerline with a cached arc-length table
#[derive(Debug, Clone)]
pub struct PathCurve {
    kind: CurveKind,
    closed: bool,
    lengths: Vec<f32>,
}

impl PathCurve {
    fn new(kind: CurveKind, closed: bool) -> Self {
        let mut curve = Self {
            kind,
            closed,
            lengths: Vec::new(),
        };
        curve.lengths = curve.compute_lengths(ARC_LENGTH_DIVISIONS);
        curve
    }

    /// Catmull-Rom spline through `points`; `None` with fewer than two
    pub fn catmull_rom(points: Vec<Vec3>, closed: bool) -> Option<Self> {
        CatmullRom::new(points, closed).map(|spline| Self::new(CurveKind::CatmullRom(spline), closed))
    }

    pub fn polyline(points: Vec<Vec3>) -> Self {
        Self::new(CurveKind::Polyline(Polyline::new(points)), false)
    }

    /// Point at curve parameter `t` in [0, 1]
    pub fn point(&self, t: f32) -> Vec3 {
        match &self.kind {
            CurveKind::CatmullRom(spline) => spline.point(t),
            CurveKind::Polyline(line) => line.point(t),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Total length of the curve
    pub fn length(&self) -> f32 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    fn compute_lengths(&self, divisions: usize) -> Vec<f32> {
        let mut lengths = Vec::with_capacity(divisions + 1);
        let mut total = 0.0;
        let mut last = self.point(0.0);
        lengths.push(0.0);
        for i in 1..=divisions {
            let current = self.point(i as f32 / divisions as f32);
            total += current.distance(last);
            lengths.push(total);
            last = current;
        }
        lengths
    }

    /// Map an arc-length fraction `u` to the curve parameter `t`
    pub fn u_to_t(&self, u: f32) -> f32 {
        let total = self.length();
        if total <= 0.0 {
            return u.clamp(0.0, 1.0);
        }

        let target = u.clamp(0.0, 1.0) * total;
        let n = self.lengths.len();
        let i = self
            .lengths
            .partition_point(|&len| len <= target)
            .saturating_sub(1);
        if i >= n - 1 {
            return 1.0;
        }

        let before = self.lengths[i];
        let span = self.lengths[i + 1] - before;
        let fraction = if span > 0.0 {
            (target - before) / span
        } else {
            0.0
        };
        (i as f32 + fraction) / (n - 1) as f32
    }

    /// Point at arc-length fraction `u`
    pub fn point_at(&self, u: f32) -> Vec3 {
        self.point(self.u_to_t(u))
    }

    /// Unit tangent at curve parameter `t`
    pub fn tangent(&self, t: f32) -> Vec3 {
        let t1 = (t - TANGENT_DELTA).max(0.0);
        let t2 = (t + TANGENT_DELTA).min(1.0);
        (self.point(t2) - self.point(t1)).normalize_or_zero()
    }

    /// Unit tangent at arc-length fraction `u`
    pub fn tangent_at(&self, u: f32) -> Vec3 {
        self.tangent(self.u_to_t(u))
    }
}

/// A segment's centerline, sampled for steering and kept for extrusion
#[derive(Debug, Clone)]
pub struct SampledPath {
    pub points: Vec<Vec3>,
    pub curve: PathCurve,
}

impl SampledPath {
    /// Unit heading along the path at arc-length fraction `u`
    pub fn tangent_at(&self, u: f32) -> Vec3 {
        self.curve.tangent_at(u)
    }

    /// (point, unit direction to the next point) for each consecutive pair
    ///
    /// One shorter than `points`. Cloning the iterator restarts it.
    pub fn directions(&self) -> impl Iterator<Item = (Vec3, Vec3)> + Clone + '_ {
        self.points
            .windows(2)
            .map(|pair| (pair[0], (pair[1] - pair[0]).normalize_or_zero()))
    }
}

/// Build the centerline for a segment
pub fn build_path(segment: &CurveSegment) -> SampledPath {
    let divisions = segment.divisions.max(1);
    match &segment.shape {
        PathShape::Ellipse(ellipse) => {
            let points: Vec<Vec3> = (0..=divisions)
                .map(|i| ellipse.point(i as f32 / divisions as f32))
                .collect();
            SampledPath {
                curve: PathCurve::polyline(points.clone()),
                points,
            }
        }
        PathShape::Spline { points, closed } => {
            let curve = PathCurve::catmull_rom(points.clone(), *closed)
                .unwrap_or_else(|| PathCurve::polyline(points.clone()));
            let points = (0..=divisions)
                .map(|i| curve.point(i as f32 / divisions as f32))
                .collect();
            SampledPath { points, curve }
        }
    }
}
