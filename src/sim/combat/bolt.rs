//! Lightning bolt geometry by recursive midpoint displacement
//!
//! The recursion is a pure function of its inputs and the RNG stream, so a
//! seeded RNG reproduces the exact polyline.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::tuning::BoltParams;

/// Main polyline plus short side branches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bolt {
    pub points: Vec<Vec2>,
    pub branches: Vec<Vec<Vec2>>,
}

/// Jagged polyline from `start` to `end`
///
/// Each level offsets the midpoint along the segment's perpendicular by
/// `(r - 0.5) * length * displacement * (detail / reference_depth)` and
/// recurses into both halves with one less level. Segments shorter than
/// `min_segment`, or `detail == 0`, stay straight. The first and last points
/// are always exactly `start` and `end`; a full recursion yields
/// `2^detail + 1` points.
pub fn midpoint_displacement<R: Rng + ?Sized>(
    start: Vec2,
    end: Vec2,
    detail: u32,
    params: &BoltParams,
    rng: &mut R,
) -> Vec<Vec2> {
    let delta = end - start;
    let length = delta.length();
    if detail == 0 || length < params.min_segment || length <= f32::EPSILON {
        return vec![start, end];
    }

    let perpendicular = Vec2::new(-delta.y, delta.x) / length;
    let scale = detail as f32 / params.reference_depth;
    let offset = (rng.random::<f32>() - 0.5) * length * params.displacement * scale;
    let mid = (start + end) * 0.5 + perpendicular * offset;

    let left = midpoint_displacement(start, mid, detail - 1, params, rng);
    let right = midpoint_displacement(mid, end, detail - 1, params, rng);

    let mut points = Vec::with_capacity(left.len() + right.len() - 1);
    points.extend_from_slice(&left[..left.len() - 1]);
    points.push(mid);
    points.extend_from_slice(&right[1..]);
    points
}

/// Bolt with up to `max_branches` forks off its segments
///
/// Each segment forks with `branch_probability`; the fork leaves the segment
/// start at the segment's angle plus a random offset within
/// `branch_angle_range`, spans `branch_length` of the segment, and uses one
/// less level of detail. Forks never fork again.
pub fn lightning_bolt<R: Rng + ?Sized>(start: Vec2, end: Vec2, params: &BoltParams, rng: &mut R) -> Bolt {
    let points = midpoint_displacement(start, end, params.detail, params, rng);
    let mut branches = Vec::new();
    if params.detail > 1 {
        for segment in points.windows(2) {
            if branches.len() >= params.max_branches {
                break;
            }
            if !rng.random_bool(params.branch_probability.clamp(0.0, 1.0)) {
                continue;
            }
            let (a, b) = (segment[0], segment[1]);
            let delta = b - a;
            let angle = delta.y.atan2(delta.x) + (rng.random::<f32>() - 0.5) * params.branch_angle_range;
            let branch_end = a + Vec2::from_angle(angle) * delta.length() * params.branch_length;
            branches.push(midpoint_displacement(a, branch_end, params.detail - 1, params, rng));
        }
    }
    Bolt { points, branches }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_full_recursion_point_count() {
        let mut rng = Pcg32::seed_from_u64(1);
        let params = BoltParams::default();
        // 1000px never drops below the 10px minimum within 6 levels
        let points = midpoint_displacement(Vec2::ZERO, Vec2::new(1000.0, 0.0), 6, &params, &mut rng);
        assert_eq!(points.len(), 65);
    }

    #[test]
    fn test_short_segment_is_straight() {
        let mut rng = Pcg32::seed_from_u64(1);
        let params = BoltParams::default();
        let points = midpoint_displacement(Vec2::ZERO, Vec2::new(5.0, 0.0), 6, &params, &mut rng);
        assert_eq!(points, vec![Vec2::ZERO, Vec2::new(5.0, 0.0)]);
    }

    #[test]
    fn test_coincident_endpoints() {
        let mut rng = Pcg32::seed_from_u64(1);
        let p = Vec2::new(3.0, 3.0);
        let points = midpoint_displacement(p, p, 6, &BoltParams::default(), &mut rng);
        assert_eq!(points, vec![p, p]);
        assert!(points.iter().all(|q| q.is_finite()));
    }

    #[test]
    fn test_same_seed_same_bolt() {
        let params = BoltParams::default();
        let a = lightning_bolt(Vec2::ZERO, Vec2::new(400.0, 120.0), &params, &mut Pcg32::seed_from_u64(42));
        let b = lightning_bolt(Vec2::ZERO, Vec2::new(400.0, 120.0), &params, &mut Pcg32::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_branch_limit_and_origin() {
        let params = BoltParams {
            branch_probability: 1.0,
            ..BoltParams::default()
        };
        let mut rng = Pcg32::seed_from_u64(8);
        let bolt = lightning_bolt(Vec2::ZERO, Vec2::new(600.0, 0.0), &params, &mut rng);
        assert_eq!(bolt.branches.len(), params.max_branches);
        for branch in &bolt.branches {
            assert!(bolt.points.contains(&branch[0]));
        }
    }

    #[test]
    fn test_displacement_bounded() {
        let mut rng = Pcg32::seed_from_u64(4);
        let params = BoltParams::default();
        let end = Vec2::new(500.0, 0.0);
        let points = midpoint_displacement(Vec2::ZERO, end, 1, &params, &mut rng);
        assert_eq!(points.len(), 3);
        // One level: |offset| <= 0.5 * 500 * 0.4 * (1 / 5)
        assert!(points[1].y.abs() <= 20.0 + 1e-3);
        assert!((points[1].x - 250.0).abs() < 1e-3);
    }

    proptest! {
        #[test]
        fn prop_endpoints_preserved_and_count_bounded(
            sx in -1000.0f32..1000.0, sy in -1000.0f32..1000.0,
            ex in -1000.0f32..1000.0, ey in -1000.0f32..1000.0,
            detail in 0u32..8, seed in any::<u64>()
        ) {
            let params = BoltParams::default();
            let start = Vec2::new(sx, sy);
            let end = Vec2::new(ex, ey);
            let mut rng = Pcg32::seed_from_u64(seed);
            let points = midpoint_displacement(start, end, detail, &params, &mut rng);
            prop_assert_eq!(points[0], start);
            prop_assert_eq!(*points.last().unwrap(), end);
            prop_assert!(points.len() >= 2);
            prop_assert!(points.len() <= (1usize << detail) + 1);
            prop_assert!(points.iter().all(|p| p.is_finite()));
        }
    }
}
