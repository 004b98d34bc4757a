//! Race state and presentation events
//!
//! Everything a race needs between ticks lives here. The simulation never
//! touches UI directly: it appends [`RaceEvent`]s that the presentation
//! layer drains after each frame.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::track::Track;
use super::vehicle::{ChaseCamera, Controller, ResetTimings, Vehicle, chase_camera};
use crate::UP;
use crate::data::{StartPose, TrackData, VehicleProfile, builtin_track, builtin_vehicle, builtin_vehicles};
use crate::error::ConfigError;
use crate::settings::RaceSettings;

/// Current phase of the race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    /// Fade-in and 3-2-1; nothing moves
    Countdown,
    /// Clock running
    Racing,
    /// Player completed the laps; vehicles coast, clock and platforms stop
    Finished,
}

/// One-way notifications for the HUD
#[derive(Debug, Clone, PartialEq)]
pub enum RaceEvent {
    /// Countdown text, `None` hides it
    CountdownChanged { label: Option<String> },
    RaceStarted,
    /// Player thrust gauge
    ThrustChanged { thrust: f32 },
    CheckpointReached { racer: usize, index: usize },
    /// `lap` is the lap now being driven
    LapChanged { racer: usize, lap: u32 },
    /// Player position in the standings, 1-based
    RankChanged { rank: usize },
    OutOfBounds { racer: usize },
    Respawned { racer: usize },
    Unlocked { racer: usize },
    RaceFinished { rank: usize, time_ms: f32 },
}

/// Complete race state
#[derive(Debug, Clone)]
pub struct RaceState {
    pub track: Track,
    /// Player first, then CPUs in grid order
    pub vehicles: Vec<Vehicle>,
    pub settings: RaceSettings,
    pub phase: RacePhase,
    /// Time since the race was loaded
    pub clock_ms: f32,
    /// Time since the start, frozen at the finish
    pub race_time_ms: f32,
    pub countdown_label: Option<String>,
    /// Player position in the standings
    pub rank: usize,
    pub camera: ChaseCamera,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Pending events, oldest first
    pub events: Vec<RaceEvent>,
}

impl RaceState {
    /// Build the track and line vehicles up on the grid
    ///
    /// Fails without a partial race if any track or vehicle data is invalid.
    pub fn new(
        track_data: &TrackData,
        player: &VehicleProfile,
        cpus: &[VehicleProfile],
        settings: RaceSettings,
    ) -> Result<Self, ConfigError> {
        let mut track = Track::build(track_data)?;
        // Platforms show their race-start pose during the countdown
        track.update(0.0);
        let timings = ResetTimings::from(&settings);

        let mut vehicles = Vec::with_capacity(cpus.len() + 1);
        vehicles.push(Vehicle::new(
            player,
            track.start,
            Controller::Player {
                thrust: settings.initial_thrust.clamp(0.0, 1.0),
            },
            timings,
        )?);
        for (slot, profile) in cpus.iter().enumerate() {
            vehicles.push(Vehicle::new(
                profile,
                grid_pose(track.start, slot, settings.grid_spacing),
                Controller::Cpu {
                    path_index: 0,
                    thrust: settings.cpu_thrust,
                },
                timings,
            )?);
        }

        let camera = chase_camera(&vehicles[0], false);
        let mut state = Self {
            track,
            vehicles,
            settings,
            phase: RacePhase::Countdown,
            clock_ms: 0.0,
            race_time_ms: 0.0,
            countdown_label: None,
            rank: 1,
            camera,
            time_ticks: 0,
            events: Vec::new(),
        };
        state.rank = state.player_rank();

        log::info!(
            "Race on '{}' with {} vehicle(s), {} lap(s)",
            state.track.name,
            state.vehicles.len(),
            state.settings.laps
        );
        Ok(state)
    }

    /// Race on the built-in track and vehicle named in `settings`
    ///
    /// CPUs drive the other speeders, cycling if there are more CPUs than
    /// models.
    pub fn from_settings(settings: RaceSettings) -> Result<Self, ConfigError> {
        let track = builtin_track(&settings.track)?;
        let player = builtin_vehicle(&settings.vehicle)?;
        let rivals: Vec<VehicleProfile> = builtin_vehicles()?
            .into_iter()
            .filter(|v| v.name != player.name && v.name.starts_with("speeder"))
            .collect();
        let cpus: Vec<VehicleProfile> = rivals.iter().cycle().take(settings.cpu_count).cloned().collect();
        Self::new(&track, &player, &cpus, settings)
    }

    pub fn player(&self) -> &Vehicle {
        &self.vehicles[0]
    }

    pub fn player_mut(&mut self) -> &mut Vehicle {
        &mut self.vehicles[0]
    }

    /// Vehicle indices, leader first: more laps, then higher checkpoint
    pub fn standings(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.vehicles.len()).collect();
        order.sort_by(|&a, &b| {
            let pa = &self.vehicles[a].progress;
            let pb = &self.vehicles[b].progress;
            (pb.laps, pb.last_index).cmp(&(pa.laps, pa.last_index))
        });
        order
    }

    pub fn player_rank(&self) -> usize {
        self.standings()
            .iter()
            .position(|&i| i == 0)
            .map_or(1, |p| p + 1)
    }

    /// Rank at the finish: one plus every CPU that also finished
    pub fn finish_rank(&self) -> usize {
        1 + self.vehicles[1..]
            .iter()
            .filter(|v| v.progress.laps > self.settings.laps)
            .count()
    }

    pub fn is_finished(&self) -> bool {
        self.phase == RacePhase::Finished
    }

    /// Take every pending event
    pub fn drain_events(&mut self) -> Vec<RaceEvent> {
        std::mem::take(&mut self.events)
    }

    /// Follow the player while alive; keep looking at it while it falls
    pub fn update_camera(&mut self, look_back: bool) {
        let player = &self.vehicles[0];
        if player.is_alive() {
            self.camera = chase_camera(player, look_back);
        } else {
            self.camera.target = player.position;
        }
    }
}

/// Grid slot `slot` beside the start line
///
/// Slots alternate sides of the player; every pair sits one row further
/// back along the start heading.
fn grid_pose(start: StartPose, slot: usize, spacing: f32) -> StartPose {
    let heading = start.direction.normalize_or_zero();
    let side = heading.cross(UP).try_normalize().unwrap_or(Vec3::Z);
    let sign = if slot % 2 == 0 { 1.0 } else { -1.0 };
    let row = (slot / 2) as f32;
    StartPose {
        point: start.point + side * (spacing * sign) - heading * (2.0 * spacing * row),
        ..start
    }
}
