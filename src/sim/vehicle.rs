//! Vehicle kinematics
//!
//! Player and CPU vehicles share one body: the same collision, integration
//! and respawn logic. What differs is the controller, which decides how the
//! velocity and heading are driven each tick.

use glam::{Quat, Vec3};

use super::checkpoint::{LapProgress, Pass};
use super::collision::{CollisionResult, resolve};
use super::track::Track;
use crate::consts::{AIRBORNE_PITCH_DECAY, CPU_GRAVITY_FACTOR, CPU_SPEED_FACTOR, ROLL_DECAY};
use crate::data::{StartPose, VehicleProfile};
use crate::error::ConfigError;
use crate::settings::RaceSettings;
use crate::{UP, euler_yzx};

/// Hitbox corners as multiples of the half extents, in ray order
const CORNERS: [Vec3; 8] = [
    Vec3::new(1.0, 1.0, 1.0),
    Vec3::new(1.0, 1.0, -1.0),
    Vec3::new(1.0, -1.0, 1.0),
    Vec3::new(1.0, -1.0, -1.0),
    Vec3::new(-1.0, 1.0, -1.0),
    Vec3::new(-1.0, 1.0, 1.0),
    Vec3::new(-1.0, -1.0, -1.0),
    Vec3::new(-1.0, -1.0, 1.0),
];

/// Respawn delays and the fall limit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResetTimings {
    /// Fade-out before the teleport
    pub fade_ms: f32,
    /// Movement lock after the teleport
    pub lock_ms: f32,
    pub out_of_bounds_y: f32,
}

impl Default for ResetTimings {
    fn default() -> Self {
        Self::from(&RaceSettings::default())
    }
}

impl From<&RaceSettings> for ResetTimings {
    fn from(settings: &RaceSettings) -> Self {
        Self {
            fade_ms: settings.respawn_fade_ms,
            lock_ms: settings.respawn_lock_ms,
            out_of_bounds_y: settings.out_of_bounds_y,
        }
    }
}

/// Where a vehicle is in the out-of-bounds sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifeState {
    Alive,
    /// Fell out; still moving while the screen fades
    Dying { remaining_ms: f32 },
    /// Back on a checkpoint, held in place
    Locked { remaining_ms: f32 },
}

/// Transitions of [`LifeState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeEvent {
    OutOfBounds,
    Respawned,
    Unlocked,
}

/// Who drives the vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Controller {
    /// Keyboard-driven, thrust adjustable in [0, 1]
    Player { thrust: f32 },
    /// Follows the track's sampled path at constant thrust
    Cpu { path_index: usize, thrust: f32 },
}

impl Controller {
    pub fn thrust(&self) -> f32 {
        match *self {
            Controller::Player { thrust } | Controller::Cpu { thrust, .. } => thrust,
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self, Controller::Player { .. })
    }
}

/// Player commands for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveInput {
    pub throttle: bool,
    pub brake: bool,
    pub left: bool,
    pub right: bool,
    /// One-shot thrust nudges
    pub thrust_up: bool,
    pub thrust_down: bool,
}

/// What happened to a vehicle during one step
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    pub collision: CollisionResult,
    /// Checkpoint index and what passing it achieved
    pub pass: Option<(usize, Pass)>,
    /// New thrust when it changed this tick
    pub thrust: Option<f32>,
    pub life: Option<LifeEvent>,
}

/// Camera placement behind a vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChaseCamera {
    pub eye: Vec3,
    pub target: Vec3,
}

/// A racing vehicle
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub name: String,
    /// Opaque asset path for the renderer
    pub model_path: String,

    pub position: Vec3,
    /// Unit heading
    pub direction: Vec3,
    /// (pitch, yaw, roll), applied Y-Z-X
    pub rotation: Vec3,
    pub velocity: Vec3,
    /// Gravity for this tick; zeroed while grounded
    pub gravity: Vec3,
    default_gravity: Vec3,

    pub acceleration: f32,
    pub deceleration: f32,
    pub friction: f32,
    pub turn_rate: f32,
    pub max_roll: f32,

    pub width: f32,
    pub height: f32,
    pub length: f32,

    pub controller: Controller,
    pub life: LifeState,
    pub progress: LapProgress,
    /// Whether the last step found ground
    pub grounded: bool,
    timings: ResetTimings,
}

impl Vehicle {
    /// Place a vehicle from its profile; rejects profiles that cannot drive
    pub fn new(
        profile: &VehicleProfile,
        pose: StartPose,
        controller: Controller,
        timings: ResetTimings,
    ) -> Result<Self, ConfigError> {
        profile.validate()?;
        Ok(Self {
            name: profile.name.clone(),
            model_path: profile.model_path.clone(),
            position: pose.point,
            direction: pose.direction.normalize_or_zero(),
            rotation: pose.rotation,
            velocity: Vec3::ZERO,
            gravity: profile.gravity(),
            default_gravity: profile.gravity(),
            acceleration: profile.acceleration,
            deceleration: profile.deceleration,
            friction: profile.friction,
            turn_rate: profile.turn_rate,
            max_roll: profile.max_roll,
            width: profile.width,
            height: profile.height,
            length: profile.length,
            controller,
            life: LifeState::Alive,
            progress: LapProgress::default(),
            grounded: false,
            timings,
        })
    }

    pub fn is_alive(&self) -> bool {
        !matches!(self.life, LifeState::Dying { .. })
    }

    pub fn can_move(&self) -> bool {
        !matches!(self.life, LifeState::Locked { .. })
    }

    pub fn default_gravity(&self) -> Vec3 {
        self.default_gravity
    }

    /// Orientation of the hitbox; roll is left out so rays stay level
    pub fn hitbox_rotation(&self) -> Quat {
        euler_yzx(Vec3::new(self.rotation.x, self.rotation.y, 0.0))
    }

    /// World-space offsets from the center to each hitbox corner
    pub fn hitbox_offsets(&self) -> [Vec3; 8] {
        let half = Vec3::new(self.width, self.height, self.length) * 0.5;
        let rotation = self.hitbox_rotation();
        CORNERS.map(|corner| rotation * (corner * half))
    }

    /// Yaw by `angle`, banking into the turn up to `max_roll`
    pub fn turn(&mut self, angle: f32) {
        self.rotation.y += angle;

        let roll = self.rotation.z - angle;
        self.rotation.z = if angle < 0.0 {
            roll.min(self.max_roll)
        } else {
            roll.max(-self.max_roll)
        };

        self.direction = Quat::from_axis_angle(UP, angle) * self.direction;
    }

    /// Follow the ground, or ease the nose level while airborne
    pub fn apply_collision(&mut self, result: &CollisionResult) {
        match result.ground {
            Some(contact) => {
                self.gravity = Vec3::ZERO;
                if self.position.y < contact.point.y {
                    self.position.y = contact.point.y;
                }
                self.rotation.x = contact.pitch;
                self.direction = contact.direction;
            }
            None => self.rotation.x *= AIRBORNE_PITCH_DECAY,
        }
        self.grounded = result.grounded();
    }

    /// Friction, then gravity, then position
    pub fn integrate(&mut self) {
        self.velocity *= self.friction;
        self.velocity += self.gravity;
        self.position += self.velocity;
    }

    /// Advance one tick of `dt_ms` milliseconds
    ///
    /// Non-positive or non-finite `dt_ms` leaves the vehicle untouched.
    pub fn step(&mut self, track: &Track, input: &DriveInput, dt_ms: f32, thrust_step: f32) -> StepReport {
        let mut report = StepReport::default();
        if !(dt_ms > 0.0 && dt_ms.is_finite()) {
            log::trace!("skipping vehicle step with dt {dt_ms}");
            return report;
        }

        match self.controller {
            Controller::Player { .. } => report.thrust = self.drive(input, dt_ms, thrust_step),
            Controller::Cpu { .. } => self.follow_path(track, dt_ms),
        }

        self.gravity = self.default_gravity;
        report.collision = resolve(self, track);
        self.apply_collision(&report.collision);

        if let Some(pass) = self
            .progress
            .observe(report.collision.checkpoint, track.checkpoint_count())
        {
            report.pass = Some((self.progress.last_index, pass));
        }

        if self.can_move() {
            self.integrate();
        }

        if !self.controller.is_player() {
            self.face_heading();
        }

        report.life = self.update_life(track, dt_ms);
        if report.life == Some(LifeEvent::Respawned) && self.controller.is_player() {
            report.thrust = Some(0.0);
        }
        report
    }

    /// Keyboard control; returns the new thrust if it changed
    fn drive(&mut self, input: &DriveInput, dt: f32, thrust_step: f32) -> Option<f32> {
        let Controller::Player { mut thrust } = self.controller else {
            return None;
        };

        if input.thrust_up {
            thrust = (thrust + thrust_step).min(1.0);
        }
        if input.thrust_down {
            thrust = (thrust - thrust_step).max(0.0);
        }
        self.controller = Controller::Player { thrust };
        let changed = (input.thrust_up || input.thrust_down).then_some(thrust);

        if !self.can_move() {
            return changed;
        }

        if input.throttle {
            self.velocity += self.direction * (self.acceleration * thrust * dt);
        }
        if input.brake {
            self.velocity -= self.direction * (self.deceleration * thrust * dt);
        }
        if input.right {
            self.turn(-self.turn_rate * dt);
        }
        if input.left {
            self.turn(self.turn_rate * dt);
        }
        if !(input.left || input.right) {
            self.rotation.z *= ROLL_DECAY;
        }

        changed
    }

    /// Head along the nearest path sample ahead and set velocity directly
    fn follow_path(&mut self, track: &Track, dt: f32) {
        let Controller::Cpu { path_index, thrust } = self.controller else {
            return;
        };
        if track.path_points.is_empty() {
            return;
        }

        let index = nearest_path_index(&track.path_points, self.position, path_index);
        self.controller = Controller::Cpu { path_index: index, thrust };
        if let Some(&direction) = track.path_vectors.get(index) {
            self.direction = direction;
        }

        // Gravity as left by the previous tick: zero while grounded
        self.velocity = self.direction * (self.acceleration * thrust * dt * CPU_SPEED_FACTOR)
            + self.gravity * (dt * CPU_GRAVITY_FACTOR);
    }

    /// Point the model along its heading
    fn face_heading(&mut self) {
        let d = self.direction;
        if d.length_squared() == 0.0 {
            return;
        }
        self.rotation = Vec3::new(-d.y.clamp(-1.0, 1.0).asin(), d.x.atan2(d.z), 0.0);
    }

    fn update_life(&mut self, track: &Track, dt: f32) -> Option<LifeEvent> {
        match self.life {
            LifeState::Alive => {
                if self.position.y < self.timings.out_of_bounds_y {
                    log::debug!("{} fell out of bounds at {:?}", self.name, self.position);
                    self.life = LifeState::Dying {
                        remaining_ms: self.timings.fade_ms,
                    };
                    return Some(LifeEvent::OutOfBounds);
                }
                None
            }
            LifeState::Dying { remaining_ms } => {
                let remaining_ms = remaining_ms - dt;
                if remaining_ms > 0.0 {
                    self.life = LifeState::Dying { remaining_ms };
                    return None;
                }
                self.respawn(track);
                self.life = LifeState::Locked {
                    remaining_ms: self.timings.lock_ms,
                };
                Some(LifeEvent::Respawned)
            }
            LifeState::Locked { remaining_ms } => {
                let remaining_ms = remaining_ms - dt;
                if remaining_ms > 0.0 {
                    self.life = LifeState::Locked { remaining_ms };
                    return None;
                }
                self.life = LifeState::Alive;
                Some(LifeEvent::Unlocked)
            }
        }
    }

    /// Teleport to the last checkpoint reached, or the start line
    pub fn respawn(&mut self, track: &Track) {
        let checkpoint = self.progress.checkpoint.and_then(|index| track.checkpoint(index));
        let (position, direction, rotation) = match checkpoint {
            Some(cp) => {
                // Spawning inside the plane is not a fresh pass
                self.progress.touch(cp.index);
                (cp.position, cp.reset_direction, cp.reset_rotation)
            }
            None => (
                track.start.point,
                track.start.direction.normalize_or_zero(),
                track.start.rotation,
            ),
        };

        self.position = position;
        self.direction = direction;
        self.rotation = rotation;
        self.velocity = Vec3::ZERO;
        self.gravity = self.default_gravity;
        if let Controller::Player { .. } = self.controller {
            self.controller = Controller::Player { thrust: 0.0 };
        }
        log::debug!("{} respawned at {:?}", self.name, self.position);
    }
}

/// Index of the closest path point at or after `current`
///
/// Wraps to the start once the last point is reached.
pub fn nearest_path_index(points: &[Vec3], position: Vec3, current: usize) -> usize {
    if points.is_empty() {
        return 0;
    }
    let start = if current >= points.len() - 1 { 0 } else { current };
    points[start..]
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            a.distance_squared(position)
                .total_cmp(&b.distance_squared(position))
        })
        .map_or(0, |(i, _)| start + i)
}

/// Eye 3 units behind and 1.5 above, looking 1 unit ahead
///
/// `look_back` turns the camera around to face behind the vehicle.
pub fn chase_camera(vehicle: &Vehicle, look_back: bool) -> ChaseCamera {
    let mut facing = Vec3::new(vehicle.direction.x, 0.0, vehicle.direction.z).normalize_or_zero();
    if look_back {
        facing = -facing;
    }
    ChaseCamera {
        eye: vehicle.position - facing * 3.0 + UP * 1.5,
        target: vehicle.position + facing,
    }
}
