//! Track assembly
//!
//! Every layer sweeps its own cross-sections along the same segment
//! centerlines. Static segments merge into one composite body per layer;
//! moving segments are split out as platforms. The collision layer's body
//! and platforms are what vehicles raycast against; visual layers are
//! handed to the renderer untouched.

use glam::Vec3;

use super::checkpoint::{Checkpoint, build_checkpoints};
use super::curve::{CurveSegment, SampledPath, build_path};
use super::extrude::{CrossSection, ExtrudeOptions, extrude};
use super::mesh::{CompositeMesh, Ray, RayHit};
use super::platform::MovingPlatform;
use crate::data::{LayerData, LayerStyle, StartPose, TrackData};
use crate::error::ConfigError;

/// Centerlines shorter than this cannot be swept
const MIN_PATH_LENGTH: f32 = 1e-4;

/// One layer's worth of geometry
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    /// Static segments, first one as root
    pub body: CompositeMesh,
    /// Moving segments, in segment order
    pub platforms: Vec<MovingPlatform>,
    /// Centerline of every segment, in segment order
    pub paths: Vec<SampledPath>,
}

/// Sweep every segment with this layer's cross-sections
pub fn assemble(
    segments: &[CurveSegment],
    layer: &str,
    sections: &[CrossSection],
    defaults: ExtrudeOptions,
) -> Result<Assembly, ConfigError> {
    let mut assembly = Assembly::default();

    for (index, segment) in segments.iter().enumerate() {
        let section = sections
            .get(segment.cross_section)
            .ok_or_else(|| ConfigError::CrossSectionIndex {
                layer: layer.to_string(),
                segment: index,
                index: segment.cross_section,
                available: sections.len(),
            })?;

        let path = build_path(segment);
        if path.curve.length() < MIN_PATH_LENGTH {
            return Err(ConfigError::DegeneratePath { segment: index });
        }

        let mesh = extrude(&path, section, segment.extrude.unwrap_or(defaults));
        match segment.motion {
            Some(motion) => assembly.platforms.push(MovingPlatform::new(mesh, motion)),
            None => assembly.body.push(mesh),
        }
        assembly.paths.push(path);
    }

    Ok(assembly)
}

/// A drawable layer
#[derive(Debug, Clone)]
pub struct TrackLayer {
    pub name: String,
    pub style: LayerStyle,
    pub body: CompositeMesh,
    pub platforms: Vec<MovingPlatform>,
}

impl TrackLayer {
    fn build(
        data: &LayerData,
        style: LayerStyle,
        segments: &[CurveSegment],
        defaults: ExtrudeOptions,
    ) -> Result<(Self, Vec<SampledPath>), ConfigError> {
        let sections = data.cross_sections()?;
        let assembly = assemble(segments, &data.name, &sections, defaults)?;
        let layer = Self {
            name: data.name.clone(),
            style,
            body: assembly.body,
            platforms: assembly.platforms,
        };
        Ok((layer, assembly.paths))
    }

    fn update(&mut self, elapsed_ms: f32) {
        for platform in &mut self.platforms {
            platform.update(elapsed_ms);
        }
    }
}

/// A built track: collision geometry, visual layers and race markers
#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    pub start: StartPose,
    /// Invisible collision layer; its body and platforms are raycast
    pub collision: TrackLayer,
    pub visual: Vec<TrackLayer>,
    pub checkpoints: Vec<Checkpoint>,
    /// Sampled centerline points across all segments
    pub path_points: Vec<Vec3>,
    /// Unit heading from each path point to the next sample of its segment
    pub path_vectors: Vec<Vec3>,
    pub background_colors: Vec<String>,
    pub grid_color: Option<u32>,
}

impl Track {
    pub fn build(data: &TrackData) -> Result<Self, ConfigError> {
        let segments = data.segments()?;

        let (collision, paths) = TrackLayer::build(
            &data.layers.collision,
            LayerStyle::invisible(),
            &segments,
            data.extrude,
        )?;

        let visual = data
            .layers
            .visual
            .iter()
            .map(|layer| {
                TrackLayer::build(layer, layer.style.clone(), &segments, data.extrude)
                    .map(|(built, _)| built)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut path_points = Vec::new();
        let mut path_vectors = Vec::new();
        for path in &paths {
            for (point, direction) in path.directions() {
                path_points.push(point);
                path_vectors.push(direction);
            }
        }

        let track = Self {
            name: data.name.clone(),
            start: data.start,
            collision,
            visual,
            checkpoints: build_checkpoints(&data.checkpoints),
            path_points,
            path_vectors,
            background_colors: data.background_colors.clone(),
            grid_color: data.grid_color,
        };

        log::info!(
            "Built track '{}': {} static pieces, {} platforms, {} visual layers, {} checkpoints",
            track.name,
            track.collision.body.len(),
            track.collision.platforms.len(),
            track.visual.len(),
            track.checkpoints.len()
        );

        Ok(track)
    }

    /// Move every platform, collision and visual, to `elapsed_ms`
    pub fn update(&mut self, elapsed_ms: f32) {
        self.collision.update(elapsed_ms);
        for layer in &mut self.visual {
            layer.update(elapsed_ms);
        }
    }

    pub fn platforms(&self) -> &[MovingPlatform] {
        &self.collision.platforms
    }

    /// Nearest hit on the collision body or any platform
    pub fn raycast_ground(&self, ray: &Ray) -> Option<RayHit> {
        let body = self.collision.body.raycast(ray);
        self.collision
            .platforms
            .iter()
            .filter_map(|platform| platform.raycast(ray))
            .chain(body)
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    pub fn checkpoint_count(&self) -> usize {
        self.checkpoints.len()
    }

    /// Checkpoint by 1-based index
    pub fn checkpoint(&self, index: usize) -> Option<&Checkpoint> {
        index.checked_sub(1).and_then(|i| self.checkpoints.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::builtin_track;
    use crate::sim::curve::PathShape;
    use crate::sim::platform::PlatformMotion;
    use glam::Vec2;
    use proptest::prelude::*;

    fn segment(z: f32, cross_section: usize, moving: bool) -> CurveSegment {
        CurveSegment {
            shape: PathShape::Spline {
                points: vec![Vec3::new(0.0, 0.0, z), Vec3::new(0.0, 0.0, z + 20.0)],
                closed: false,
            },
            cross_section,
            divisions: 4,
            extrude: Some(ExtrudeOptions { steps: 2, bevel: false }),
            motion: moving.then_some(PlatformMotion {
                direction: Vec3::X * 10.0,
                period: 8000.0,
                phase: 0.0,
            }),
        }
    }

    fn sections() -> Vec<CrossSection> {
        vec![CrossSection::new(vec![Vec2::new(0.0, 5.0), Vec2::new(0.0, -5.0)]).unwrap()]
    }

    #[test]
    fn test_cross_section_out_of_range() {
        let segments = vec![segment(0.0, 0, false), segment(20.0, 3, false)];
        let err = assemble(&segments, "collision", &sections(), ExtrudeOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::CrossSectionIndex { segment: 1, index: 3, available: 1, .. }
        ));
    }

    #[test]
    fn test_zero_sweep_ellipse_rejected() {
        let segments = vec![CurveSegment {
            shape: PathShape::Ellipse(crate::sim::curve::Ellipse {
                origin: Vec3::ZERO,
                radius: Vec2::splat(10.0),
                start_angle: 1.0,
                end_angle: 1.0,
                clockwise: false,
            }),
            cross_section: 0,
            divisions: 8,
            extrude: None,
            motion: None,
        }];
        assert!(matches!(
            assemble(&segments, "collision", &sections(), ExtrudeOptions::default()),
            Err(ConfigError::DegeneratePath { segment: 0 })
        ));
    }

    #[test]
    fn test_first_static_piece_is_root() {
        let segments = vec![
            segment(0.0, 0, true),
            segment(20.0, 0, false),
            segment(40.0, 0, false),
        ];
        let assembly = assemble(&segments, "collision", &sections(), ExtrudeOptions::default()).unwrap();
        assert_eq!(assembly.body.len(), 2);
        assert_eq!(assembly.body.children().len(), 1);
        assert_eq!(assembly.platforms.len(), 1);
        assert_eq!(assembly.paths.len(), 3);
        assert_eq!(assembly.platforms[0].origin, Vec3::ZERO);
    }

    #[test]
    fn test_builtin_tracks_build() {
        for name in crate::data::builtin_track_names() {
            let data = builtin_track(name).unwrap();
            let track = Track::build(&data).unwrap();
            assert_eq!(track.checkpoint_count(), data.checkpoints.len());
            assert_eq!(track.path_points.len(), track.path_vectors.len());
            for layer in &track.visual {
                // Same segments, same split
                assert_eq!(layer.body.len(), track.collision.body.len());
                assert_eq!(layer.platforms.len(), track.collision.platforms.len());
            }
        }
    }

    #[test]
    fn test_zero_track_steps_rejected() {
        let mut data = builtin_track("ring").unwrap();
        data.extrude.steps = 0;
        assert!(matches!(
            Track::build(&data),
            Err(ConfigError::InvalidExtrudeSteps { steps: 0, .. })
        ));
    }

    #[test]
    fn test_stepping_stones_platforms_move() {
        let data = builtin_track("stepping_stones").unwrap();
        let mut track = Track::build(&data).unwrap();
        assert!(!track.platforms().is_empty());

        track.update(0.0);
        let before: Vec<Vec3> = track.platforms().iter().map(|p| p.position()).collect();
        track.update(2000.0);
        let moved = track
            .platforms()
            .iter()
            .zip(&before)
            .any(|(p, b)| p.position().distance(*b) > 1.0);
        assert!(moved);
        // Visual platforms stay in step with collision ones
        let visual = &track.visual[0].platforms;
        assert_eq!(visual[0].position(), track.platforms()[0].position());
    }

    #[test]
    fn test_ground_ray_on_ring() {
        let track = Track::build(&builtin_track("ring").unwrap()).unwrap();
        let ray = Ray {
            origin: track.start.point + Vec3::Y * 2.0,
            direction: -Vec3::Y,
        };
        let hit = track.raycast_ground(&ray).unwrap();
        assert!(hit.distance < 5.0);
        assert!(track.checkpoint(1).is_some());
        assert!(track.checkpoint(0).is_none());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_static_and_moving_split(moving in proptest::collection::vec(any::<bool>(), 0..12)) {
            let segments: Vec<CurveSegment> = moving
                .iter()
                .enumerate()
                .map(|(i, &m)| segment(i as f32 * 20.0, 0, m))
                .collect();
            let m = moving.iter().filter(|&&m| m).count();
            let n = segments.len();

            let assembly = assemble(&segments, "collision", &sections(), ExtrudeOptions::default()).unwrap();
            prop_assert_eq!(assembly.body.len(), n - m);
            prop_assert_eq!(assembly.platforms.len(), m);
        }
    }
}
