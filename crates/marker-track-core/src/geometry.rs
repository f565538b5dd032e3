use nalgebra::{Matrix4, Point3, Rotation3, Unit, Vector3};

/// Inputs shorter than this cannot be normalized.
const MIN_NORM: f64 = 1e-12;
/// Below this `|from x to|` the two directions are treated as (anti)parallel.
const PARALLEL_EPS: f64 = 1e-9;

/// Rotation (no translation) that maps the direction of `from` onto the
/// direction of `to`.
///
/// Both inputs are normalized internally. The rotation axis is
/// `normalize(from x to)` and the angle is `acos(from . to)`.
///
/// Degenerate cases:
/// - `from` parallel to `to`: identity.
/// - `from` anti-parallel to `to`: half turn about an axis perpendicular to
///   `from`, built from the world basis axis least aligned with `from`.
///
/// Returns `None` when either input has (near) zero length.
pub fn rotation_between(from: &Vector3<f64>, to: &Vector3<f64>) -> Option<Matrix4<f64>> {
    let from = from.try_normalize(MIN_NORM)?;
    let to = to.try_normalize(MIN_NORM)?;

    let cos_angle = from.dot(&to).clamp(-1.0, 1.0);
    let angle = cos_angle.acos();

    let axis = match Unit::try_new(from.cross(&to), PARALLEL_EPS) {
        Some(axis) => axis,
        None if cos_angle > 0.0 => return Some(Matrix4::identity()),
        None => Unit::new_normalize(perpendicular_to(&from)),
    };

    Some(Rotation3::from_axis_angle(&axis, angle).to_homogeneous())
}

/// Some vector perpendicular to the unit vector `v`.
fn perpendicular_to(v: &Vector3<f64>) -> Vector3<f64> {
    let (ax, ay, az) = (v.x.abs(), v.y.abs(), v.z.abs());
    let basis = if ax <= ay && ax <= az {
        Vector3::x()
    } else if ay <= az {
        Vector3::y()
    } else {
        Vector3::z()
    };
    v.cross(&basis)
}

/// Apply the rotational part of a homogeneous transform to a direction
/// (`w = 0`, translation ignored).
#[inline]
pub fn rotate_direction(m: &Matrix4<f64>, v: &Vector3<f64>) -> Vector3<f64> {
    (m * v.to_homogeneous()).xyz()
}

/// Arithmetic mean of a non-empty set of 3D points.
pub fn centroid(points: &[Point3<f64>]) -> Option<Point3<f64>> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn apply(m: &Matrix4<f64>, v: Vector3<f64>) -> Vector3<f64> {
        rotate_direction(m, &v)
    }

    #[test]
    fn maps_from_onto_to() {
        let pairs = [
            (Vector3::new(0.0, 0.0, 1.0), Vector3::new(0.0, -0.6, 0.8)),
            (Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)),
            (Vector3::new(0.3, -0.2, 0.9), Vector3::new(-0.5, 0.4, 0.1)),
            (Vector3::new(2.0, 2.0, 2.0), Vector3::new(0.0, 0.0, -3.0)),
        ];
        for (a, b) in pairs {
            let m = rotation_between(&a, &b).expect("non-degenerate");
            let mapped = apply(&m, a.normalize());
            assert_abs_diff_eq!(mapped, b.normalize(), epsilon = 1e-9);
        }
    }

    #[test]
    fn same_direction_is_identity() {
        let a = Vector3::new(0.2, 0.5, -0.7);
        let m = rotation_between(&a, &(a * 4.0)).expect("non-degenerate");
        assert_abs_diff_eq!(m, Matrix4::identity(), epsilon = 1e-12);
    }

    #[test]
    fn opposite_directions_make_a_half_turn() {
        let a = Vector3::new(0.0, 0.0, 1.0);
        let m = rotation_between(&a, &-a).expect("non-degenerate");
        assert_abs_diff_eq!(apply(&m, a), -a, epsilon = 1e-9);
        // still a proper rotation
        let r = m.fixed_view::<3, 3>(0, 0).into_owned();
        assert_abs_diff_eq!(r.determinant(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn no_translation_component() {
        let m = rotation_between(&Vector3::x(), &Vector3::z()).expect("non-degenerate");
        assert_eq!(m[(0, 3)], 0.0);
        assert_eq!(m[(1, 3)], 0.0);
        assert_eq!(m[(2, 3)], 0.0);
        assert_eq!(m[(3, 3)], 1.0);
    }

    #[test]
    fn zero_length_input_is_rejected() {
        assert!(rotation_between(&Vector3::zeros(), &Vector3::x()).is_none());
        assert!(rotation_between(&Vector3::y(), &Vector3::zeros()).is_none());
    }

    #[test]
    fn centroid_of_empty_set_is_none() {
        assert!(centroid(&[]).is_none());
        let c = centroid(&[Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 4.0, -2.0)]).unwrap();
        assert_abs_diff_eq!(c, Point3::new(1.0, 2.0, -1.0), epsilon = 1e-12);
    }
}
