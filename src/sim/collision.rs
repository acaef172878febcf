//! Collision geometry shared by entities and weapons
//!
//! Everything in the arena is a circle; beams are line segments with a width.

use glam::Vec2;

/// Whether two circles overlap (touching counts as overlap)
#[inline]
pub fn circles_overlap(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> bool {
    let reach = a_radius + b_radius;
    a.distance_squared(b) <= reach * reach
}

/// Shortest distance from `p` to the segment `[a, b]`
///
/// Degenerate segments (a == b) fall back to point distance.
pub fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Index of the candidate closest to `from`
///
/// Strict comparison keeps the first candidate on ties, so results only
/// depend on iteration order.
pub fn nearest<I>(from: Vec2, candidates: I) -> Option<usize>
where
    I: IntoIterator<Item = (usize, Vec2)>,
{
    let mut best: Option<(usize, f32)> = None;
    for (idx, pos) in candidates {
        let d = from.distance_squared(pos);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((idx, d)),
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circles_overlap() {
        assert!(circles_overlap(Vec2::ZERO, 10.0, Vec2::new(15.0, 0.0), 5.0));
        assert!(!circles_overlap(Vec2::ZERO, 10.0, Vec2::new(15.1, 0.0), 5.0));
    }

    #[test]
    fn test_distance_to_segment_interior() {
        let d = distance_to_segment(Vec2::new(5.0, 3.0), Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert!((d - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_to_segment_behind_origin() {
        let d = distance_to_segment(Vec2::new(-4.0, 3.0), Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert!((d - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_to_degenerate_segment() {
        let d = distance_to_segment(Vec2::new(3.0, 4.0), Vec2::ZERO, Vec2::ZERO);
        assert!((d - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_prefers_first_on_tie() {
        let points = [Vec2::new(5.0, 0.0), Vec2::new(-5.0, 0.0), Vec2::new(9.0, 0.0)];
        let idx = nearest(Vec2::ZERO, points.iter().copied().enumerate());
        assert_eq!(idx, Some(0));
    }

    #[test]
    fn test_nearest_empty() {
        assert_eq!(nearest(Vec2::ZERO, std::iter::empty()), None);
    }
}
