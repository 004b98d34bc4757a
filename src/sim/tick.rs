//! Fixed timestep simulation tick
//!
//! Core race loop that advances simulation deterministically.

use super::checkpoint::Pass;
use super::state::{RaceEvent, RacePhase, RaceState};
use super::vehicle::{DriveInput, LifeEvent, StepReport};

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Accelerate along the heading (w)
    pub throttle: bool,
    /// Brake / reverse (s)
    pub brake: bool,
    /// Alternate brake (shift)
    pub shift: bool,
    /// Steer (a / d)
    pub left: bool,
    pub right: bool,
    /// Rear-view camera while held (r)
    pub look_back: bool,
    /// One-shot thrust nudges (arrows, mouse wheel)
    pub thrust_up: bool,
    pub thrust_down: bool,
}

impl TickInput {
    /// Record a key change by its lowercase DOM key name
    ///
    /// Returns `false` for keys the race does not use. Arrow keys only latch
    /// on press; they are cleared by [`TickInput::clear_one_shots`].
    pub fn set_key(&mut self, key: &str, pressed: bool) -> bool {
        match key {
            "w" => self.throttle = pressed,
            "s" => self.brake = pressed,
            "shift" => self.shift = pressed,
            "a" => self.left = pressed,
            "d" => self.right = pressed,
            "r" => self.look_back = pressed,
            "arrowup" => self.thrust_up |= pressed,
            "arrowdown" => self.thrust_down |= pressed,
            _ => return false,
        }
        true
    }

    /// Drop thrust nudges once a tick has consumed them
    pub fn clear_one_shots(&mut self) {
        self.thrust_up = false;
        self.thrust_down = false;
    }

    pub fn drive(&self) -> DriveInput {
        DriveInput {
            throttle: self.throttle,
            brake: self.brake || self.shift,
            left: self.left,
            right: self.right,
            thrust_up: self.thrust_up,
            thrust_down: self.thrust_down,
        }
    }
}

/// Advance the race by one fixed timestep of `dt_ms` milliseconds
pub fn tick(state: &mut RaceState, input: &TickInput, dt_ms: f32) {
    if !(dt_ms > 0.0 && dt_ms.is_finite()) {
        log::trace!("skipping tick with dt {dt_ms}");
        return;
    }

    state.clock_ms += dt_ms;
    state.time_ticks += 1;

    let label = state.settings.countdown_label(state.clock_ms);
    if label != state.countdown_label {
        state.countdown_label = label.clone();
        state.events.push(RaceEvent::CountdownChanged { label });
    }

    if state.phase == RacePhase::Countdown {
        if state.clock_ms < state.settings.start_ms() {
            state.update_camera(input.look_back);
            return;
        }
        state.phase = RacePhase::Racing;
        state.events.push(RaceEvent::RaceStarted);
        log::info!("Race started on '{}'", state.track.name);
    }

    if state.phase == RacePhase::Racing {
        state.race_time_ms += dt_ms;
        state.track.update(state.race_time_ms);
    }

    // Player first, then CPUs in grid order
    let drive = input.drive();
    let idle = DriveInput::default();
    let thrust_step = state.settings.thrust_step;
    for racer in 0..state.vehicles.len() {
        let input = if racer == 0 { &drive } else { &idle };
        let vehicle = &mut state.vehicles[racer];
        let report = vehicle.step(&state.track, input, dt_ms, thrust_step);
        push_step_events(&mut state.events, racer, vehicle.progress.laps, &report);
    }

    if state.phase == RacePhase::Racing && state.player().progress.laps > state.settings.laps {
        finish(state);
    }

    let rank = state.player_rank();
    if rank != state.rank && !state.is_finished() {
        state.rank = rank;
        state.events.push(RaceEvent::RankChanged { rank });
    }

    state.update_camera(input.look_back);
}

fn push_step_events(events: &mut Vec<RaceEvent>, racer: usize, lap: u32, report: &StepReport) {
    if let Some((index, pass)) = report.pass {
        events.push(RaceEvent::CheckpointReached { racer, index });
        if pass == Pass::Lap {
            events.push(RaceEvent::LapChanged { racer, lap });
        }
    }
    if let Some(thrust) = report.thrust.filter(|_| racer == 0) {
        events.push(RaceEvent::ThrustChanged { thrust });
    }
    match report.life {
        Some(LifeEvent::OutOfBounds) => events.push(RaceEvent::OutOfBounds { racer }),
        Some(LifeEvent::Respawned) => events.push(RaceEvent::Respawned { racer }),
        Some(LifeEvent::Unlocked) => events.push(RaceEvent::Unlocked { racer }),
        None => {}
    }
}

/// Freeze the clock and platforms and report the player's placing
fn finish(state: &mut RaceState) {
    let rank = state.finish_rank();
    state.phase = RacePhase::Finished;
    state.rank = rank;
    state.events.push(RaceEvent::RaceFinished {
        rank,
        time_ms: state.race_time_ms,
    });
    log::info!(
        "Race finished in {} ({})",
        crate::format_race_time(state.race_time_ms),
        ordinal(rank)
    );
}

/// `1` -> `"1st"`, `12` -> `"12th"`, `23` -> `"23rd"`
pub fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT_MS;
    use crate::data::{TrackData, builtin_vehicle};
    use crate::settings::RaceSettings;
    use crate::sim::vehicle::Controller;

    /// 100 units of flat road along +Z, 10 wide, with a gate at z = 40
    const STRAIGHT: &str = r#"{
        "name": "straight",
        "version": 1,
        "start": { "point": [0.0, 0.3, 10.0], "direction": [0.0, 0.0, 1.0], "rotation": [0.0, 0.0, 0.0] },
        "curves": [ { "points": [[0.0, 0.0, 0.0], [0.0, 0.0, 100.0]], "cross_section": 0 } ],
        "layers": {
            "collision": { "name": "collision", "shapes": [[[0.0, 5.0], [0.0, -5.0]]], "style": { "color": 0 } }
        },
        "extrude": { "steps": 4, "bevel": false },
        "checkpoints": [
            { "position": [0.0, 1.0, 40.0], "reset_direction": [0.0, 0.0, 1.0], "reset_rotation": [0.0, 0.0, 0.0] }
        ]
    }"#;

    fn quick_start() -> RaceSettings {
        RaceSettings {
            cpu_count: 0,
            fade_in_ms: 0.0,
            countdown_ms: 0.0,
            go_hidden_at_ms: 0.0,
            ..Default::default()
        }
    }

    fn straight_race(settings: RaceSettings) -> RaceState {
        let track = TrackData::from_json(STRAIGHT).unwrap();
        let player = builtin_vehicle("speeder_1").unwrap();
        RaceState::new(&track, &player, &[], settings).unwrap()
    }

    fn throttle() -> TickInput {
        TickInput {
            throttle: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_throttle_on_straight() {
        let mut state = straight_race(quick_start());
        let input = throttle();

        let mut last_z = state.player().position.z;
        for _ in 0..120 {
            tick(&mut state, &input, SIM_DT_MS);
            let player = state.player();
            assert!(player.grounded);
            assert!(player.position.z > last_z);
            last_z = player.position.z;
        }
        assert_eq!(state.phase, RacePhase::Racing);
        assert!(state.player().position.x.abs() < 1e-3);
        assert!(state.player().position.y.abs() < 0.5);
    }

    #[test]
    fn test_drop_settles_on_ground() {
        let mut state = straight_race(quick_start());
        state.player_mut().position = glam::Vec3::new(0.0, 50.0, 50.0);

        for _ in 0..400 {
            tick(&mut state, &TickInput::default(), SIM_DT_MS);
        }
        let player = state.player();
        assert!(player.grounded);
        assert!(player.position.y.abs() < 0.05);
        assert_eq!(player.position.x, 0.0);
        assert_eq!(player.position.z, 50.0);
    }

    #[test]
    fn test_countdown_holds_vehicles() {
        let mut state = straight_race(RaceSettings {
            cpu_count: 0,
            ..Default::default()
        });
        let start = state.player().position;
        let input = throttle();

        let mut labels = Vec::new();
        let mut started = 0;
        for _ in 0..450 {
            tick(&mut state, &input, SIM_DT_MS);
            if state.phase == RacePhase::Countdown {
                assert_eq!(state.player().position, start);
            }
            for event in state.drain_events() {
                match event {
                    RaceEvent::CountdownChanged { label } => labels.push(label),
                    RaceEvent::RaceStarted => started += 1,
                    _ => {}
                }
            }
        }

        let expected: Vec<Option<String>> = ["3", "2", "1", "GO!"]
            .iter()
            .map(|s| Some(s.to_string()))
            .chain([None])
            .collect();
        assert_eq!(labels, expected);
        assert_eq!(started, 1);
        assert!(state.player().position.z > start.z);
    }

    #[test]
    fn test_gate_counts_a_lap() {
        let mut state = straight_race(quick_start());
        let input = throttle();

        let mut events = Vec::new();
        for _ in 0..200 {
            tick(&mut state, &input, SIM_DT_MS);
            events.extend(state.drain_events());
        }
        // A single checkpoint completes a lap every time it is touched
        assert!(events.contains(&RaceEvent::CheckpointReached { racer: 0, index: 1 }));
        assert!(events.contains(&RaceEvent::LapChanged { racer: 0, lap: 2 }));
        assert_eq!(
            events.iter().filter(|e| matches!(e, RaceEvent::LapChanged { .. })).count(),
            1
        );
        assert_eq!(state.player().progress.checkpoint, Some(1));
    }

    #[test]
    fn test_respawn_on_gate_adds_no_lap() {
        let mut state = straight_race(quick_start());
        for _ in 0..200 {
            tick(&mut state, &throttle(), SIM_DT_MS);
        }
        assert_eq!(state.player().progress.laps, 2);
        state.drain_events();

        // Drive off the world; the respawn lands on the gate
        state.player_mut().position = glam::Vec3::new(500.0, -29.0, 0.0);
        for _ in 0..200 {
            tick(&mut state, &TickInput::default(), SIM_DT_MS);
        }
        let events = state.drain_events();
        assert!(events.contains(&RaceEvent::Respawned { racer: 0 }));
        assert!(!events.iter().any(|e| matches!(
            e,
            RaceEvent::CheckpointReached { .. } | RaceEvent::LapChanged { .. }
        )));
        assert_eq!(state.player().progress.laps, 2);
        assert!((state.player().position.z - 40.0).abs() < 1.0);
    }

    #[test]
    fn test_finish_freezes_clock() {
        let mut state = straight_race(quick_start());
        tick(&mut state, &TickInput::default(), SIM_DT_MS);
        state.drain_events();

        state.player_mut().progress.laps = state.settings.laps + 1;
        tick(&mut state, &throttle(), SIM_DT_MS);
        assert_eq!(state.phase, RacePhase::Finished);
        let events = state.drain_events();
        assert!(events.iter().any(|e| matches!(e, RaceEvent::RaceFinished { rank: 1, .. })));

        let time = state.race_time_ms;
        let z = state.player().position.z;
        for _ in 0..10 {
            tick(&mut state, &throttle(), SIM_DT_MS);
        }
        assert_eq!(state.race_time_ms, time);
        // Vehicles keep coasting after the flag
        assert!(state.player().position.z > z);
        assert!(!state.drain_events().iter().any(|e| matches!(e, RaceEvent::RaceFinished { .. })));
    }

    #[test]
    fn test_thrust_nudge_events() {
        let mut state = straight_race(quick_start());
        let mut input = TickInput::default();
        assert!(input.set_key("arrowup", true));
        tick(&mut state, &input, SIM_DT_MS);
        input.clear_one_shots();
        tick(&mut state, &input, SIM_DT_MS);

        let thrusts: Vec<f32> = state
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                RaceEvent::ThrustChanged { thrust } => Some(thrust),
                _ => None,
            })
            .collect();
        assert_eq!(thrusts.len(), 1);
        assert!((thrusts[0] - 0.52).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_dt_is_ignored() {
        let mut state = straight_race(quick_start());
        tick(&mut state, &throttle(), 0.0);
        tick(&mut state, &throttle(), f32::NAN);
        assert_eq!(state.time_ticks, 0);
        assert_eq!(state.clock_ms, 0.0);
        assert_eq!(state.phase, RacePhase::Countdown);
    }

    #[test]
    fn test_set_key_mapping() {
        let mut input = TickInput::default();
        for key in ["w", "shift", "a", "r"] {
            assert!(input.set_key(key, true));
        }
        assert!(!input.set_key("q", true));
        let drive = input.drive();
        assert!(drive.throttle && drive.brake && drive.left && !drive.right);
        assert!(input.look_back);

        // Arrow release does not cancel a pending nudge
        input.set_key("arrowdown", true);
        input.set_key("arrowdown", false);
        assert!(input.thrust_down);
        input.clear_one_shots();
        assert!(!input.thrust_down);
    }

    #[test]
    fn test_ordinal() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(22), "22nd");
    }

    #[test]
    fn test_cpus_race_on_ring() {
        let mut state = RaceState::from_settings(RaceSettings {
            track: "ring".into(),
            cpu_count: 3,
            ..quick_start()
        })
        .unwrap();
        assert_eq!(state.vehicles.len(), 4);
        for _ in 0..120 {
            tick(&mut state, &TickInput::default(), SIM_DT_MS);
        }
        assert_eq!(state.phase, RacePhase::Racing);
        for cpu in &state.vehicles[1..] {
            assert!(cpu.is_alive());
            assert!(matches!(cpu.controller, Controller::Cpu { path_index, .. } if path_index > 0));
        }
    }

    #[test]
    fn test_determinism() {
        let settings = RaceSettings {
            fade_in_ms: 0.0,
            countdown_ms: 0.0,
            ..Default::default()
        };
        let mut state1 = RaceState::from_settings(settings.clone()).unwrap();
        let mut state2 = RaceState::from_settings(settings).unwrap();

        let inputs = [
            throttle(),
            TickInput {
                throttle: true,
                left: true,
                ..Default::default()
            },
            TickInput {
                thrust_up: true,
                ..Default::default()
            },
            TickInput::default(),
        ];

        for input in inputs.iter().cycle().take(200) {
            tick(&mut state1, input, SIM_DT_MS);
            tick(&mut state2, input, SIM_DT_MS);
        }

        assert_eq!(state1.time_ticks, state2.time_ticks);
        for (a, b) in state1.vehicles.iter().zip(&state2.vehicles) {
            assert_eq!(a.position, b.position);
            assert_eq!(a.rotation, b.rotation);
        }
        assert_eq!(state1.drain_events(), state2.drain_events());
    }
}
