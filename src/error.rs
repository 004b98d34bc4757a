//! Load-time configuration errors
//!
//! Malformed track or vehicle data aborts race setup. Nothing here is raised
//! during a race: per-tick anomalies are skipped, not reported.

use thiserror::Error;

/// Malformed static track/vehicle data
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Authoring data is not valid JSON for the schema
    #[error("failed to parse {what}: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Unsupported track schema version
    #[error("track `{track}` uses schema version {found}, expected {expected}")]
    SchemaVersion {
        track: String,
        found: u32,
        expected: u32,
    },

    /// A segment refers to a cross-section its layer does not have
    #[error("segment {segment} uses cross-section {index}, layer `{layer}` has only {available}")]
    CrossSectionIndex {
        layer: String,
        segment: usize,
        index: usize,
        available: usize,
    },

    /// A cross-section needs at least two points to sweep a surface
    #[error("cross-section {index} of layer `{layer}` has {points} point(s), need at least 2")]
    DegenerateCrossSection {
        layer: String,
        index: usize,
        points: usize,
    },

    /// Ellipse segment without its radius or angle range
    #[error("ellipse segment {segment} is missing `{field}`")]
    MissingEllipseField { segment: usize, field: &'static str },

    /// Ellipse angle that is infinite or NaN
    #[error("ellipse segment {segment} has non-finite angle {angle}")]
    NonFiniteAngle { segment: usize, angle: f32 },

    /// Spline segment without enough waypoints, or ellipse without an origin
    #[error("segment {segment} has {found} waypoint(s), need at least {needed}")]
    TooFewWaypoints {
        segment: usize,
        found: usize,
        needed: usize,
    },

    /// Moving segment without its oscillation parameters
    #[error("moving segment {segment} is missing `{field}`")]
    MissingPlatformField { segment: usize, field: &'static str },

    /// Moving segment whose period cannot drive an oscillation
    #[error("moving segment {segment} has period {period} ms, must be positive")]
    InvalidPlatformPeriod { segment: usize, period: f32 },

    /// Centerline with no length, e.g. an ellipse sweeping zero angle
    #[error("segment {segment} has a zero-length centerline")]
    DegeneratePath { segment: usize },

    /// Extrusion or sampling with zero steps
    #[error("segment {segment} requests {steps} extrusion step(s)")]
    InvalidExtrudeSteps { segment: usize, steps: usize },

    /// Vehicle hitbox with no volume can never touch the track
    #[error("vehicle `{vehicle}` has a degenerate hitbox {width}x{height}x{length}")]
    DegenerateHitbox {
        vehicle: String,
        width: f32,
        height: f32,
        length: f32,
    },

    /// Vehicle constants that would break the integrator
    #[error("vehicle `{vehicle}` has invalid {field}: {value}")]
    InvalidVehicleConstant {
        vehicle: String,
        field: &'static str,
        value: f32,
    },

    /// No built-in track with this name
    #[error("unknown track `{0}`")]
    UnknownTrack(String),

    /// No built-in vehicle with this name
    #[error("unknown vehicle `{0}`")]
    UnknownVehicle(String),
}
