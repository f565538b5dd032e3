//! Instrument pose from the three triangulated markers.
//!
//! The constellation is an isosceles triangle: one apex marker and two base
//! markers. The instrument position is the triangle centroid and its pointing
//! direction runs from the midpoint of the base pair to the apex.

use std::cmp::Ordering;
use std::fmt;

use marker_track_core::centroid;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::types::InstrumentPose;

/// Number of markers on the instrument.
pub const MARKER_COUNT: usize = 3;

/// How the apex marker is told apart from the base pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApexRule {
    /// The marker closest to the centroid.
    #[default]
    NearestToCentroid,
    /// The marker whose centroid distance is isolated from the other two,
    /// whether it is nearer or farther than the base pair.
    OddOneOut,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseParams {
    pub apex_rule: ApexRule,
    /// Markers closer than this (world units) count as coincident.
    pub min_separation: f64,
}

impl Default for PoseParams {
    fn default() -> Self {
        Self {
            apex_rule: ApexRule::NearestToCentroid,
            min_separation: 1e-6,
        }
    }
}

/// Why a cycle produced no pose. Never an error: the loop simply tries again
/// on the next frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NotDetected {
    /// No circles in at least one half.
    NoCircles,
    /// Fewer than three left/right pairs after matching.
    TooFewCorrespondences { found: usize },
    /// A pair had no usable horizontal disparity.
    ZeroDisparity,
    /// The estimator got a point count other than three.
    WrongPointCount { found: usize },
    /// Coincident markers or no definable direction.
    Degenerate,
}

impl fmt::Display for NotDetected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCircles => write!(f, "no circles detected"),
            Self::TooFewCorrespondences { found } => {
                write!(f, "too few correspondences ({found} of {MARKER_COUNT})")
            }
            Self::ZeroDisparity => write!(f, "zero disparity"),
            Self::WrongPointCount { found } => {
                write!(f, "expected {MARKER_COUNT} points, got {found}")
            }
            Self::Degenerate => write!(f, "degenerate constellation"),
        }
    }
}

/// Estimate the instrument pose from exactly three world points.
pub fn estimate_pose(
    points: &[Point3<f64>],
    params: &PoseParams,
) -> Result<InstrumentPose, NotDetected> {
    if points.len() != MARKER_COUNT {
        return Err(NotDetected::WrongPointCount {
            found: points.len(),
        });
    }
    for i in 0..MARKER_COUNT {
        for j in i + 1..MARKER_COUNT {
            if (points[i] - points[j]).norm() < params.min_separation {
                return Err(NotDetected::Degenerate);
            }
        }
    }

    let c = centroid(points).ok_or(NotDetected::Degenerate)?;

    let mut by_distance: Vec<(f64, Point3<f64>)> = points
        .iter()
        .map(|p| ((p - c).norm_squared(), *p))
        .collect();
    by_distance.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let (apex, base) = match params.apex_rule {
        ApexRule::NearestToCentroid => (by_distance[0].1, [by_distance[1].1, by_distance[2].1]),
        ApexRule::OddOneOut => {
            let d: Vec<f64> = by_distance.iter().map(|(d2, _)| d2.sqrt()).collect();
            if d[1] - d[0] > d[2] - d[1] {
                (by_distance[0].1, [by_distance[1].1, by_distance[2].1])
            } else {
                (by_distance[2].1, [by_distance[0].1, by_distance[1].1])
            }
        }
    };

    let base_mid = nalgebra::center(&base[0], &base[1]);
    let direction = (apex - base_mid)
        .try_normalize(f64::EPSILON)
        .ok_or(NotDetected::Degenerate)?;

    Ok(InstrumentPose {
        position: c,
        direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;

    fn odd_one_out() -> PoseParams {
        PoseParams {
            apex_rule: ApexRule::OddOneOut,
            ..PoseParams::default()
        }
    }

    #[test]
    fn far_apex_isosceles_with_odd_one_out() {
        let points = [
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
        ];
        let pose = estimate_pose(&points, &odd_one_out()).expect("pose");
        assert_abs_diff_eq!(pose.direction, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(
            pose.position,
            Point3::new(0.0, 2.0 / 3.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn near_apex_isosceles_with_either_rule() {
        let points = [
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 0.5, 0.0),
        ];
        for params in [PoseParams::default(), odd_one_out()] {
            let pose = estimate_pose(&points, &params).expect("pose");
            assert_abs_diff_eq!(pose.direction, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
            assert_abs_diff_eq!(
                pose.position,
                Point3::new(0.0, 0.5 / 3.0, 0.0),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn nearest_rule_takes_the_closest_vertex_literally() {
        // far apex: the nearest vertex is a base marker
        let points = [
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
        ];
        let pose = estimate_pose(&points, &PoseParams::default()).expect("pose");
        assert!(pose.direction.y < 0.0);
        assert_abs_diff_eq!(pose.direction.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn wrong_point_count_is_not_detected() {
        let two = [Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        assert_eq!(
            estimate_pose(&two, &PoseParams::default()),
            Err(NotDetected::WrongPointCount { found: 2 })
        );
        assert_eq!(
            estimate_pose(&[], &PoseParams::default()),
            Err(NotDetected::WrongPointCount { found: 0 })
        );
    }

    #[test]
    fn coincident_points_are_degenerate() {
        let p = Point3::new(0.3, 1.0, 2.0);
        assert_eq!(
            estimate_pose(&[p, p, Point3::new(1.0, 1.0, 2.0)], &PoseParams::default()),
            Err(NotDetected::Degenerate)
        );
        assert_eq!(
            estimate_pose(&[p, p, p], &odd_one_out()),
            Err(NotDetected::Degenerate)
        );
    }

    #[test]
    fn reasons_serialize_with_a_tag() {
        let json = serde_json::to_string(&NotDetected::TooFewCorrespondences { found: 2 }).unwrap();
        assert_eq!(json, r#"{"reason":"too_few_correspondences","found":2}"#);
    }
}
