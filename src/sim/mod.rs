//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Stable iteration order (player first, then CPUs in grid order)
//! - No rendering or platform dependencies

pub mod checkpoint;
pub mod collision;
pub mod curve;
pub mod extrude;
pub mod mesh;
pub mod platform;
pub mod state;
pub mod tick;
pub mod track;
pub mod vehicle;

pub use checkpoint::{Checkpoint, LapProgress, Pass, build_checkpoints, register_pass};
pub use collision::{CollisionResult, GroundContact, align_to_surface, resolve};
pub use curve::{CurveSegment, Ellipse, PathShape, SampledPath, build_path};
pub use extrude::{CrossSection, ExtrudeOptions, extrude};
pub use mesh::{Aabb, CompositeMesh, Mesh, MeshVertex, Ray, RayHit};
pub use platform::{MovingPlatform, PlatformMotion, advance};
pub use state::{RaceEvent, RacePhase, RaceState};
pub use tick::{TickInput, ordinal, tick};
pub use track::{Track, TrackLayer, assemble};
pub use vehicle::{
    ChaseCamera, Controller, DriveInput, LifeEvent, LifeState, ResetTimings, StepReport, Vehicle,
    chase_camera, nearest_path_index,
};
