//! Left/right correspondence by angular order around each view's centroid.
//!
//! Both cameras see the same rigid constellation from nearly the same vantage
//! point with a horizontal offset only, so the angular order of the markers
//! around their own centroid is the same in both views.

use std::cmp::Ordering;

use crate::types::{Correspondence, MarkerDetection};

fn centroid_2d(points: &[MarkerDetection]) -> Option<(f32, f32)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f32;
    let (sx, sy) = points
        .iter()
        .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some((sx / n, sy / n))
}

/// Detections sorted ascending by `atan2(y - cy, x - cx)` around their own
/// centroid.
pub fn sort_by_angle(points: &[MarkerDetection]) -> Vec<MarkerDetection> {
    let Some((cx, cy)) = centroid_2d(points) else {
        return Vec::new();
    };
    let mut keyed: Vec<(f32, MarkerDetection)> = points
        .iter()
        .map(|p| ((p.y - cy).atan2(p.x - cx), *p))
        .collect();
    keyed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    keyed.into_iter().map(|(_, p)| p).collect()
}

/// Pair left and right detections rank-wise after sorting each set by angle.
///
/// When the sets differ in size the surplus detections of the larger set are
/// dropped; no ambiguity is signalled.
pub fn match_correspondences(
    left: &[MarkerDetection],
    right: &[MarkerDetection],
) -> Vec<Correspondence> {
    if left.len() != right.len() {
        log::debug!(
            "unequal detection counts (left={}, right={}), truncating",
            left.len(),
            right.len()
        );
    }
    sort_by_angle(left)
        .into_iter()
        .zip(sort_by_angle(right))
        .map(|(left, right)| Correspondence { left, right })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Asymmetric constellation in the left view.
    fn left_view() -> [MarkerDetection; 3] {
        [
            MarkerDetection::new(10.0, 40.0, 5.0),
            MarkerDetection::new(-30.0, -20.0, 5.0),
            MarkerDetection::new(45.0, -25.0, 5.0),
        ]
    }

    /// Same markers seen by the right camera: shifted by per-marker disparity
    /// with a little vertical noise.
    fn right_of(l: &MarkerDetection, idx: usize) -> MarkerDetection {
        let disparity = [52.0, 47.0, 55.0][idx];
        let noise = [0.3, -0.2, 0.1][idx];
        MarkerDetection::new(l.x - disparity, l.y + noise, l.radius)
    }

    const PERMUTATIONS: [[usize; 3]; 6] = [
        [0, 1, 2],
        [1, 2, 0],
        [2, 0, 1],
        [0, 2, 1],
        [2, 1, 0],
        [1, 0, 2],
    ];

    #[test]
    fn recovers_pairing_for_every_input_order() {
        let left = left_view();
        let right: Vec<MarkerDetection> = left
            .iter()
            .enumerate()
            .map(|(i, l)| right_of(l, i))
            .collect();

        for lp in PERMUTATIONS {
            for rp in PERMUTATIONS {
                let l_in: Vec<_> = lp.iter().map(|&i| left[i]).collect();
                let r_in: Vec<_> = rp.iter().map(|&i| right[i]).collect();
                let pairs = match_correspondences(&l_in, &r_in);
                assert_eq!(pairs.len(), 3);
                for pair in pairs {
                    let li = left.iter().position(|m| *m == pair.left).unwrap();
                    let ri = right.iter().position(|m| *m == pair.right).unwrap();
                    assert_eq!(li, ri, "left order {lp:?}, right order {rp:?}");
                }
            }
        }
    }

    #[test]
    fn surplus_detections_are_dropped() {
        let left = left_view();
        let right: Vec<MarkerDetection> = left[..2]
            .iter()
            .enumerate()
            .map(|(i, l)| right_of(l, i))
            .collect();
        assert_eq!(match_correspondences(&left, &right).len(), 2);
        assert_eq!(match_correspondences(&right, &left).len(), 2);
    }

    #[test]
    fn empty_sets_give_no_pairs() {
        assert!(match_correspondences(&[], &left_view()).is_empty());
        assert!(match_correspondences(&[], &[]).is_empty());
    }

    #[test]
    fn angle_order_is_ascending() {
        let sorted = sort_by_angle(&left_view());
        // angles around centroid (8.33, -1.67): bottom-left, bottom-right, top
        assert_eq!(sorted[0], left_view()[1]);
        assert_eq!(sorted[1], left_view()[2]);
        assert_eq!(sorted[2], left_view()[0]);
    }
}
