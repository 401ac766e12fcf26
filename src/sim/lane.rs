//! Lateral lane snapping
//!
//! The player is confined to `lane_count` fixed x positions centred on 0.
//! Force-induced drift is corrected by snapping, never by easing.

use glam::Vec3;

use crate::tuning::LaneTuning;

#[derive(Debug, Clone, Copy)]
pub struct LaneTracker<'a> {
    tuning: &'a LaneTuning,
}

impl<'a> LaneTracker<'a> {
    pub fn new(tuning: &'a LaneTuning) -> Self {
        Self { tuning }
    }

    pub fn lane_count(&self) -> u32 {
        self.tuning.lane_count.max(1)
    }

    /// x coordinate of lane `index` (0 = leftmost)
    pub fn lane_x(&self, index: u32) -> f32 {
        let index = index.min(self.lane_count() - 1);
        let centre = (self.lane_count() - 1) as f32 * 0.5;
        (index as f32 - centre) * self.tuning.lane_width
    }

    /// Index of the lane nearest to `x`
    pub fn lane_index(&self, x: f32) -> u32 {
        let centre = (self.lane_count() - 1) as f32 * 0.5;
        let raw = (x / self.tuning.lane_width + centre).round();
        if raw.is_nan() || raw <= 0.0 {
            0
        } else {
            (raw as u32).min(self.lane_count() - 1)
        }
    }

    /// Snap x onto the nearest lane; exact lane positions come back unchanged
    pub fn correct_lane(&self, position: Vec3) -> Vec3 {
        let x = self.lane_x(self.lane_index(position.x));
        if position.x == x {
            position
        } else {
            Vec3::new(x, position.y, position.z)
        }
    }

    /// Move one lane left (`direction < 0`) or right (`direction > 0`),
    /// staying within the outermost lanes
    pub fn change_lane(&self, position: Vec3, direction: i32) -> Vec3 {
        let current = self.lane_index(position.x) as i64;
        let target = (current + direction.signum() as i64).clamp(0, self.lane_count() as i64 - 1);
        Vec3::new(self.lane_x(target as u32), position.y, position.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_lanes() {
        let tuning = LaneTuning::default();
        let lanes = LaneTracker::new(&tuning);
        assert_eq!(lanes.lane_x(0), -3.0);
        assert_eq!(lanes.lane_x(1), 0.0);
        assert_eq!(lanes.lane_x(2), 3.0);
        assert_eq!(lanes.lane_index(-3.0), 0);
        assert_eq!(lanes.lane_index(1.4), 1);
        assert_eq!(lanes.lane_index(1.6), 2);
        assert_eq!(lanes.lane_index(-40.0), 0);
        assert_eq!(lanes.lane_index(40.0), 2);
    }

    #[test]
    fn test_correct_snaps_to_nearest() {
        let tuning = LaneTuning::default();
        let lanes = LaneTracker::new(&tuning);
        let corrected = lanes.correct_lane(Vec3::new(2.2, 4.0, 10.0));
        assert_eq!(corrected, Vec3::new(3.0, 4.0, 10.0));
        let corrected = lanes.correct_lane(Vec3::new(-0.4, 0.0, 0.0));
        assert_eq!(corrected.x, 0.0);
    }

    #[test]
    fn test_change_lane_clamps_at_edges() {
        let tuning = LaneTuning::default();
        let lanes = LaneTracker::new(&tuning);
        let mut pos = Vec3::new(0.0, 1.0, 5.0);
        pos = lanes.change_lane(pos, 1);
        assert_eq!(pos.x, 3.0);
        pos = lanes.change_lane(pos, 1);
        assert_eq!(pos.x, 3.0);
        pos = lanes.change_lane(pos, -1);
        pos = lanes.change_lane(pos, -1);
        assert_eq!(pos.x, -3.0);
        pos = lanes.change_lane(pos, -1);
        assert_eq!(pos.x, -3.0);
        assert_eq!(pos.y, 1.0);
        assert_eq!(pos.z, 5.0);
    }

    #[test]
    fn test_even_lane_count_is_centred() {
        let tuning = LaneTuning {
            lane_width: 2.0,
            lane_count: 4,
        };
        let lanes = LaneTracker::new(&tuning);
        assert_eq!(lanes.lane_x(0), -3.0);
        assert_eq!(lanes.lane_x(3), 3.0);
        assert_eq!(lanes.lane_index(0.2), 2);
    }

    proptest! {
        #[test]
        fn correct_lane_is_idempotent(x in -20.0f32..20.0, y in -20.0f32..20.0, z in 0.0f32..1000.0) {
            let tuning = LaneTuning::default();
            let lanes = LaneTracker::new(&tuning);
            let once = lanes.correct_lane(Vec3::new(x, y, z));
            let twice = lanes.correct_lane(once);
            prop_assert_eq!(once, twice);
            prop_assert!([-3.0, 0.0, 3.0].contains(&once.x));
        }

        #[test]
        fn exact_lane_positions_unchanged(lane in 0u32..3, y in -20.0f32..20.0, z in 0.0f32..1000.0) {
            let tuning = LaneTuning::default();
            let lanes = LaneTracker::new(&tuning);
            let pos = Vec3::new(lanes.lane_x(lane), y, z);
            prop_assert_eq!(lanes.correct_lane(pos), pos);
        }
    }
}
