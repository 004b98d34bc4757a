//! Static authoring data: tracks and vehicle profiles
//!
//! Tracks and vehicles are authored as JSON under `data/` and embedded at
//! compile time. Everything is validated once, at load, into the typed
//! simulation inputs; a malformed file aborts race setup with a
//! [`ConfigError`] instead of falling back to defaults.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::consts::{CHECKPOINT_HEIGHT, CHECKPOINT_WIDTH, DEFAULT_DIVISIONS, DEFAULT_GRAVITY};
use crate::error::ConfigError;
use crate::sim::curve::{CurveSegment, Ellipse, PathShape};
use crate::sim::extrude::{CrossSection, ExtrudeOptions};
use crate::sim::platform::PlatformMotion;

/// Track schema version understood by this build
pub const TRACK_SCHEMA_VERSION: u32 = 1;

const BUILTIN_TRACKS: &[(&str, &str)] = &[
    ("speedway", include_str!("../data/tracks/speedway.json")),
    ("figure_eight", include_str!("../data/tracks/figure_eight.json")),
    ("ring", include_str!("../data/tracks/ring.json")),
    ("stepping_stones", include_str!("../data/tracks/stepping_stones.json")),
];

const BUILTIN_VEHICLES: &str = include_str!("../data/vehicles.json");

/// Where vehicles line up before the countdown
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StartPose {
    pub point: Vec3,
    pub direction: Vec3,
    /// (pitch, yaw, roll), applied Y-Z-X
    pub rotation: Vec3,
}

/// Ellipse parameters as authored; missing fields are rejected at load
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EllipseData {
    pub radius: Option<[f32; 2]>,
    pub angles: Option<[f32; 2]>,
    #[serde(default)]
    pub clockwise: bool,
}

/// Moving-platform parameters as authored
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MotionData {
    pub direction: Option<Vec3>,
    /// Oscillation period in milliseconds
    pub period: Option<f32>,
    /// Phase offset in milliseconds
    #[serde(default)]
    pub phase: f32,
}

/// One piece of track centerline as authored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveData {
    pub points: Vec<Vec3>,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub ellipse: Option<EllipseData>,
    pub cross_section: usize,
    #[serde(default)]
    pub divisions: Option<usize>,
    #[serde(default)]
    pub extrude: Option<ExtrudeOptions>,
    #[serde(default)]
    pub moving: Option<MotionData>,
}

/// Material-like identity shared by a whole layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerStyle {
    /// 0xRRGGBB
    pub color: u32,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_opacity() -> f32 {
    1.0
}

fn default_visible() -> bool {
    true
}

impl LayerStyle {
    /// The collision layer is never drawn
    pub fn invisible() -> Self {
        Self {
            color: 0,
            opacity: 0.0,
            visible: false,
        }
    }
}

/// A rendering pass over the whole track
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerData {
    pub name: String,
    /// Cross-sections, indexed by each segment's `cross_section`
    pub shapes: Vec<Vec<Vec2>>,
    pub style: LayerStyle,
}

/// The collision layer is named explicitly rather than by list position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSet {
    pub collision: LayerData,
    #[serde(default)]
    pub visual: Vec<LayerData>,
}

/// A checkpoint trigger plane as authored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointData {
    pub position: Vec3,
    pub reset_direction: Vec3,
    pub reset_rotation: Vec3,
    /// Plane orientation; defaults to `reset_rotation` so the plane faces the
    /// direction of travel
    #[serde(default)]
    pub rotation: Option<Vec3>,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
}

impl CheckpointData {
    pub fn plane_rotation(&self) -> Vec3 {
        self.rotation.unwrap_or(self.reset_rotation)
    }

    pub fn size(&self) -> (f32, f32) {
        (
            self.width.unwrap_or(CHECKPOINT_WIDTH),
            self.height.unwrap_or(CHECKPOINT_HEIGHT),
        )
    }
}

/// A complete track description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackData {
    pub name: String,
    pub version: u32,
    pub start: StartPose,
    pub curves: Vec<CurveData>,
    pub layers: LayerSet,
    #[serde(default)]
    pub extrude: ExtrudeOptions,
    #[serde(default)]
    pub checkpoints: Vec<CheckpointData>,
    /// Presentation only
    #[serde(default)]
    pub background_colors: Vec<String>,
    /// Presentation only
    #[serde(default)]
    pub grid_color: Option<u32>,
}

impl TrackData {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let data: Self = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            what: "track",
            source,
        })?;
        if data.version != TRACK_SCHEMA_VERSION {
            return Err(ConfigError::SchemaVersion {
                track: data.name,
                found: data.version,
                expected: TRACK_SCHEMA_VERSION,
            });
        }
        Ok(data)
    }

    /// Validate every curve into a typed segment
    ///
    /// Track-wide extrusion options are checked against every segment that
    /// does not override them.
    pub fn segments(&self) -> Result<Vec<CurveSegment>, ConfigError> {
        self.curves
            .iter()
            .enumerate()
            .map(|(index, curve)| {
                let segment = curve.to_segment(index)?;
                if segment.extrude.is_none() && self.extrude.steps == 0 {
                    return Err(ConfigError::InvalidExtrudeSteps {
                        segment: index,
                        steps: 0,
                    });
                }
                Ok(segment)
            })
            .collect()
    }
}

impl CurveData {
    /// Check the authored fields and build the typed segment
    pub fn to_segment(&self, index: usize) -> Result<CurveSegment, ConfigError> {
        let shape = match &self.ellipse {
            Some(ellipse) => {
                let Some(&origin) = self.points.first() else {
                    return Err(ConfigError::TooFewWaypoints {
                        segment: index,
                        found: 0,
                        needed: 1,
                    });
                };
                let radius = ellipse.radius.ok_or(ConfigError::MissingEllipseField {
                    segment: index,
                    field: "radius",
                })?;
                let angles = ellipse.angles.ok_or(ConfigError::MissingEllipseField {
                    segment: index,
                    field: "angles",
                })?;
                if let Some(&angle) = angles.iter().find(|a| !a.is_finite()) {
                    return Err(ConfigError::NonFiniteAngle { segment: index, angle });
                }
                PathShape::Ellipse(Ellipse {
                    origin,
                    radius: Vec2::from(radius),
                    start_angle: angles[0],
                    end_angle: angles[1],
                    clockwise: ellipse.clockwise,
                })
            }
            None => {
                if self.points.len() < 2 {
                    return Err(ConfigError::TooFewWaypoints {
                        segment: index,
                        found: self.points.len(),
                        needed: 2,
                    });
                }
                PathShape::Spline {
                    points: self.points.clone(),
                    closed: self.closed,
                }
            }
        };

        let divisions = self.divisions.unwrap_or(DEFAULT_DIVISIONS);
        if divisions == 0 {
            return Err(ConfigError::InvalidExtrudeSteps {
                segment: index,
                steps: 0,
            });
        }
        if let Some(extrude) = &self.extrude {
            if extrude.steps == 0 {
                return Err(ConfigError::InvalidExtrudeSteps {
                    segment: index,
                    steps: 0,
                });
            }
        }

        let motion = match &self.moving {
            Some(moving) => {
                let direction = moving.direction.ok_or(ConfigError::MissingPlatformField {
                    segment: index,
                    field: "direction",
                })?;
                let period = moving.period.ok_or(ConfigError::MissingPlatformField {
                    segment: index,
                    field: "period",
                })?;
                if !(period > 0.0 && period.is_finite()) {
                    return Err(ConfigError::InvalidPlatformPeriod {
                        segment: index,
                        period,
                    });
                }
                Some(PlatformMotion {
                    direction,
                    period,
                    phase: moving.phase,
                })
            }
            None => None,
        };

        Ok(CurveSegment {
            shape,
            cross_section: self.cross_section,
            divisions,
            extrude: self.extrude,
            motion,
        })
    }
}

impl LayerData {
    /// Validate the layer's cross-sections
    pub fn cross_sections(&self) -> Result<Vec<CrossSection>, ConfigError> {
        self.shapes
            .iter()
            .enumerate()
            .map(|(index, points)| {
                CrossSection::new(points.clone()).ok_or_else(|| {
                    ConfigError::DegenerateCrossSection {
                        layer: self.name.clone(),
                        index,
                        points: points.len(),
                    }
                })
            })
            .collect()
    }
}

/// Static per-model vehicle constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleProfile {
    pub name: String,
    /// Opaque to the simulation; handed to the asset loader
    pub model_path: String,
    pub acceleration: f32,
    pub deceleration: f32,
    pub friction: f32,
    pub turn_rate: f32,
    pub max_roll: f32,
    #[serde(default)]
    pub gravity: Option<Vec3>,
    pub width: f32,
    pub height: f32,
    pub length: f32,
}

impl VehicleProfile {
    pub fn gravity(&self) -> Vec3 {
        self.gravity.unwrap_or(DEFAULT_GRAVITY)
    }

    /// Reject profiles the simulation cannot drive
    pub fn validate(&self) -> Result<(), ConfigError> {
        let dims = [self.width, self.height, self.length];
        if dims.iter().any(|d| !(*d > 0.0 && d.is_finite())) {
            return Err(ConfigError::DegenerateHitbox {
                vehicle: self.name.clone(),
                width: self.width,
                height: self.height,
                length: self.length,
            });
        }
        let constants = [
            ("acceleration", self.acceleration),
            ("deceleration", self.deceleration),
            ("friction", self.friction),
            ("turn_rate", self.turn_rate),
            ("max_roll", self.max_roll),
        ];
        for (field, value) in constants {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidVehicleConstant {
                    vehicle: self.name.clone(),
                    field,
                    value,
                });
            }
        }
        if self.friction > 1.0 {
            return Err(ConfigError::InvalidVehicleConstant {
                vehicle: self.name.clone(),
                field: "friction",
                value: self.friction,
            });
        }
        Ok(())
    }
}

/// Names of the tracks shipped with the game
pub fn builtin_track_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_TRACKS.iter().map(|(name, _)| *name)
}

/// Load a built-in track by name
pub fn builtin_track(name: &str) -> Result<TrackData, ConfigError> {
    let (_, json) = BUILTIN_TRACKS
        .iter()
        .find(|(track, _)| *track == name)
        .ok_or_else(|| ConfigError::UnknownTrack(name.to_string()))?;
    TrackData::from_json(json)
}

/// Load every built-in vehicle profile
pub fn builtin_vehicles() -> Result<Vec<VehicleProfile>, ConfigError> {
    let profiles: Vec<VehicleProfile> =
        serde_json::from_str(BUILTIN_VEHICLES).map_err(|source| ConfigError::Parse {
            what: "vehicles",
            source,
        })?;
    for profile in &profiles {
        profile.validate()?;
    }
    Ok(profiles)
}

/// Load a built-in vehicle profile by name
pub fn builtin_vehicle(name: &str) -> Result<VehicleProfile, ConfigError> {
    builtin_vehicles()?
        .into_iter()
        .find(|profile| profile.name == name)
        .ok_or_else(|| ConfigError::UnknownVehicle(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(points: Vec<Vec3>) -> CurveData {
        CurveData {
            points,
            closed: false,
            ellipse: None,
            cross_section: 0,
            divisions: None,
            extrude: None,
            moving: None,
        }
    }

    #[test]
    fn test_builtin_tracks_load() {
        for name in builtin_track_names() {
            let track = builtin_track(name).unwrap();
            assert_eq!(track.name, name);
            assert!(!track.curves.is_empty());
            track.segments().unwrap();
            track.layers.collision.cross_sections().unwrap();
        }
    }

    #[test]
    fn test_unknown_track() {
        assert!(matches!(
            builtin_track("nowhere"),
            Err(ConfigError::UnknownTrack(_))
        ));
    }

    #[test]
    fn test_builtin_vehicles_load() {
        let vehicles = builtin_vehicles().unwrap();
        assert!(vehicles.len() >= 3);
        let bike = builtin_vehicle("bike").unwrap();
        assert_eq!(bike.gravity(), DEFAULT_GRAVITY);
    }

    #[test]
    fn test_schema_version_checked() {
        let json = include_str!("../data/tracks/ring.json").replace("\"version\": 1", "\"version\": 7");
        assert!(matches!(
            TrackData::from_json(&json),
            Err(ConfigError::SchemaVersion { found: 7, .. })
        ));
    }

    #[test]
    fn test_spline_needs_two_points() {
        let err = curve(vec![Vec3::ZERO]).to_segment(3).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::TooFewWaypoints { segment: 3, found: 1, needed: 2 }
        ));
    }

    #[test]
    fn test_ellipse_missing_fields() {
        let mut data = curve(vec![Vec3::ZERO]);
        data.ellipse = Some(EllipseData {
            radius: Some([10.0, 10.0]),
            angles: None,
            clockwise: false,
        });
        assert!(matches!(
            data.to_segment(0),
            Err(ConfigError::MissingEllipseField { field: "angles", .. })
        ));

        data.ellipse = Some(EllipseData::default());
        assert!(matches!(
            data.to_segment(0),
            Err(ConfigError::MissingEllipseField { field: "radius", .. })
        ));
    }

    #[test]
    fn test_non_finite_ellipse_angle_rejected() {
        let json = r#"{
            "name": "broken",
            "version": 1,
            "start": { "point": [0.0, 0.0, 0.0], "direction": [1.0, 0.0, 0.0], "rotation": [0.0, 0.0, 0.0] },
            "curves": [ { "points": [[0.0, 0.0, 0.0]], "ellipse": { "radius": [20.0, 20.0], "angles": [0.0, 1e39] }, "cross_section": 0 } ],
            "layers": { "collision": { "name": "collision", "shapes": [[[0.0, 5.0], [0.0, -5.0]]], "style": { "color": 0 } } }
        }"#;
        let track = TrackData::from_json(json).unwrap();
        assert!(matches!(
            track.segments(),
            Err(ConfigError::NonFiniteAngle { segment: 0, .. })
        ));

        let mut data = curve(vec![Vec3::ZERO]);
        data.ellipse = Some(EllipseData {
            radius: Some([10.0, 10.0]),
            angles: Some([f32::NAN, 1.0]),
            clockwise: false,
        });
        assert!(matches!(data.to_segment(2), Err(ConfigError::NonFiniteAngle { segment: 2, .. })));
    }

    #[test]
    fn test_track_extrude_steps_checked() {
        let json = include_str!("../data/tracks/ring.json");
        let mut track = TrackData::from_json(json).unwrap();
        track.extrude.steps = 0;
        assert!(matches!(
            track.segments(),
            Err(ConfigError::InvalidExtrudeSteps { steps: 0, .. })
        ));
    }

    #[test]
    fn test_moving_segment_validation() {
        let mut data = curve(vec![Vec3::ZERO, Vec3::Z * 20.0]);
        data.moving = Some(MotionData {
            direction: Some(Vec3::X * 10.0),
            period: Some(0.0),
            phase: 0.0,
        });
        assert!(matches!(
            data.to_segment(1),
            Err(ConfigError::InvalidPlatformPeriod { segment: 1, .. })
        ));

        data.moving = Some(MotionData {
            direction: None,
            period: Some(8000.0),
            phase: 0.0,
        });
        assert!(matches!(
            data.to_segment(1),
            Err(ConfigError::MissingPlatformField { field: "direction", .. })
        ));
    }

    #[test]
    fn test_degenerate_cross_section_rejected() {
        let layer = LayerData {
            name: "collision".into(),
            shapes: vec![vec![Vec2::new(0.0, 5.0), Vec2::new(0.0, -5.0)], vec![Vec2::ZERO]],
            style: LayerStyle::invisible(),
        };
        assert!(matches!(
            layer.cross_sections(),
            Err(ConfigError::DegenerateCrossSection { index: 1, points: 1, .. })
        ));
    }

    #[test]
    fn test_degenerate_hitbox_rejected() {
        let mut profile = builtin_vehicle("speeder_1").unwrap();
        profile.height = 0.0;
        assert!(matches!(
            profile.validate(),
            Err(ConfigError::DegenerateHitbox { .. })
        ));
    }
}
