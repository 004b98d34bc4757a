//! Checkpoints and lap counting
//!
//! Checkpoints are numbered 1..=N in authoring order. A vehicle remembers the
//! highest index it has reached; reaching a higher one (modulo the count)
//! advances it, and reaching checkpoint 1 from the last one completes a lap.
//! Skipping intermediate checkpoints is allowed, passing checkpoint 1 twice
//! in a row is not.

use glam::Vec3;

use super::mesh::{Mesh, Ray, RayHit};
use crate::data::CheckpointData;
use crate::euler_yzx;

/// A trigger plane plus the pose a vehicle respawns at
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub plane: Mesh,
    pub position: Vec3,
    pub reset_direction: Vec3,
    pub reset_rotation: Vec3,
    /// 1-based sequence number
    pub index: usize,
}

impl Checkpoint {
    pub fn raycast(&self, ray: &Ray) -> Option<RayHit> {
        self.plane.raycast(ray, Vec3::ZERO)
    }
}

/// Build trigger planes in authoring order, indices 1..=N
pub fn build_checkpoints(data: &[CheckpointData]) -> Vec<Checkpoint> {
    data.iter()
        .enumerate()
        .map(|(i, cp)| {
            let (width, height) = cp.size();
            Checkpoint {
                plane: Mesh::plane(width, height, euler_yzx(cp.plane_rotation()), cp.position),
                position: cp.position,
                reset_direction: cp.reset_direction.normalize_or_zero(),
                reset_rotation: cp.reset_rotation,
                index: i + 1,
            }
        })
        .collect()
}

/// What a registered pass achieved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Checkpoint,
    Lap,
}

/// Per-vehicle checkpoint and lap counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LapProgress {
    /// Highest checkpoint reached this lap
    pub last_index: usize,
    /// Lap currently being driven, starting at 1
    pub laps: u32,
    /// Checkpoint to respawn at, 1-based; `None` until one is reached
    pub checkpoint: Option<usize>,
    /// Checkpoint touched on the previous resolve
    touching: Option<usize>,
}

impl Default for LapProgress {
    fn default() -> Self {
        Self {
            last_index: 1,
            laps: 1,
            checkpoint: None,
            touching: None,
        }
    }
}

impl LapProgress {
    /// Feed this tick's checkpoint contact; only a fresh touch registers
    pub fn observe(&mut self, hit: Option<usize>, count: usize) -> Option<Pass> {
        let previous = std::mem::replace(&mut self.touching, hit);
        match hit {
            Some(index) if previous != Some(index) => register_pass(self, index, count),
            _ => None,
        }
    }

    /// Treat checkpoint `index` as already touched, e.g. after respawning on it
    pub fn touch(&mut self, index: usize) {
        self.touching = Some(index);
    }
}

/// Apply the modulus rule for reaching checkpoint `index` of `count`
pub fn register_pass(progress: &mut LapProgress, index: usize, count: usize) -> Option<Pass> {
    if count == 0 || index == 0 || index > count {
        return None;
    }
    if index <= progress.last_index % count {
        return None;
    }

    progress.last_index = index;
    progress.checkpoint = Some(index);
    if index == 1 {
        progress.laps += 1;
        log::debug!("lap {} started", progress.laps);
        Some(Pass::Lap)
    } else {
        log::debug!("checkpoint {index}/{count}");
        Some(Pass::Checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn data(n: usize) -> Vec<CheckpointData> {
        (0..n)
            .map(|i| CheckpointData {
                position: Vec3::new(0.0, 1.0, i as f32 * 50.0),
                reset_direction: Vec3::Z * 2.0,
                reset_rotation: Vec3::ZERO,
                rotation: None,
                width: None,
                height: None,
            })
            .collect()
    }

    #[test]
    fn test_indices_follow_input_order() {
        let checkpoints = build_checkpoints(&data(4));
        let indices: Vec<_> = checkpoints.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert_eq!(checkpoints[2].position.z, 100.0);
        assert_eq!(checkpoints[0].reset_direction, Vec3::Z);
    }

    #[test]
    fn test_plane_blocks_travel_direction() {
        let checkpoints = build_checkpoints(&data(1));
        let ray = Ray {
            origin: Vec3::new(10.0, 2.0, -3.0),
            direction: Vec3::Z,
        };
        let hit = checkpoints[0].raycast(&ray).unwrap();
        assert!((hit.distance - 3.0).abs() < 1e-4);

        // Outside the default 48 wide plane
        let ray = Ray {
            origin: Vec3::new(30.0, 2.0, -3.0),
            direction: Vec3::Z,
        };
        assert!(checkpoints[0].raycast(&ray).is_none());
    }

    #[test]
    fn test_rotated_plane_faces_along_x() {
        let mut cps = data(1);
        cps[0].reset_rotation = Vec3::new(0.0, FRAC_PI_2, 0.0);
        let checkpoints = build_checkpoints(&cps);
        let ray = Ray {
            origin: Vec3::new(-3.0, 1.0, 0.0),
            direction: Vec3::X,
        };
        assert!(checkpoints[0].raycast(&ray).is_some());
    }

    #[test]
    fn test_full_cycle_counts_one_lap() {
        let mut progress = LapProgress::default();
        for index in 2..=4 {
            assert_eq!(register_pass(&mut progress, index, 4), Some(Pass::Checkpoint));
        }
        assert_eq!(progress.laps, 1);
        assert_eq!(register_pass(&mut progress, 1, 4), Some(Pass::Lap));
        assert_eq!(progress.laps, 2);
        assert_eq!(progress.last_index, 1);
    }

    #[test]
    fn test_checkpoint_one_without_last_is_ignored() {
        let mut progress = LapProgress::default();
        assert_eq!(register_pass(&mut progress, 1, 4), None);
        register_pass(&mut progress, 2, 4);
        register_pass(&mut progress, 3, 4);
        assert_eq!(register_pass(&mut progress, 1, 4), None);
        assert_eq!(progress.laps, 1);
    }

    #[test]
    fn test_skipping_ahead_is_allowed() {
        let mut progress = LapProgress::default();
        assert_eq!(register_pass(&mut progress, 4, 4), Some(Pass::Checkpoint));
        assert_eq!(register_pass(&mut progress, 1, 4), Some(Pass::Lap));
    }

    #[test]
    fn test_regression_is_ignored() {
        let mut progress = LapProgress::default();
        register_pass(&mut progress, 3, 4);
        assert_eq!(register_pass(&mut progress, 2, 4), None);
        assert_eq!(progress.last_index, 3);
        assert_eq!(progress.checkpoint, Some(3));
    }

    #[test]
    fn test_single_checkpoint_counts_each_fresh_pass() {
        let mut progress = LapProgress::default();
        // Touching for several ticks is one pass
        assert_eq!(progress.observe(Some(1), 1), Some(Pass::Lap));
        assert_eq!(progress.observe(Some(1), 1), None);
        assert_eq!(progress.observe(Some(1), 1), None);
        assert_eq!(progress.laps, 2);

        progress.observe(None, 1);
        assert_eq!(progress.observe(Some(1), 1), Some(Pass::Lap));
        assert_eq!(progress.laps, 3);
    }

    #[test]
    fn test_touched_checkpoint_needs_to_be_left_first() {
        let mut progress = LapProgress::default();
        progress.observe(Some(1), 1);
        progress.observe(None, 1);

        progress.touch(1);
        assert_eq!(progress.observe(Some(1), 1), None);
        assert_eq!(progress.laps, 2);
        progress.observe(None, 1);
        assert_eq!(progress.observe(Some(1), 1), Some(Pass::Lap));
    }

    #[test]
    fn test_out_of_range_index_ignored() {
        let mut progress = LapProgress::default();
        assert_eq!(register_pass(&mut progress, 5, 4), None);
        assert_eq!(register_pass(&mut progress, 1, 0), None);
        assert_eq!(progress, LapProgress::default());
    }
}
