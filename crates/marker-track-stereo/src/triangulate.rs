use marker_track_core::StereoRigConfig;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::types::Correspondence;

/// Triangulation settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriangulationParams {
    /// Disparities below this (pixels) have no usable depth and are rejected.
    pub min_disparity: f64,
}

impl Default for TriangulationParams {
    fn default() -> Self {
        Self {
            min_disparity: 1e-3,
        }
    }
}

/// Camera-space point (rig center origin) from one correspondence, or `None`
/// when the disparity is too small for a depth.
///
/// Only the left `y` is used: the cameras are assumed vertically aligned.
pub fn triangulate_camera(
    c: &Correspondence,
    rig: &StereoRigConfig,
    params: &TriangulationParams,
) -> Option<Vector3<f64>> {
    let (lx, ly, rx) = (c.left.x as f64, c.left.y as f64, c.right.x as f64);
    let dx = (lx - rx).abs();
    if !(dx >= params.min_disparity) {
        return None;
    }
    let b = rig.baseline();
    Some(Vector3::new(
        b * (lx + rx) / (2.0 * dx),
        b * ly / dx,
        b * rig.focal_length() / dx,
    ))
}

/// World-space point from one correspondence, or `None` when rejected.
pub fn triangulate(
    c: &Correspondence,
    rig: &StereoRigConfig,
    params: &TriangulationParams,
) -> Option<Point3<f64>> {
    triangulate_camera(c, rig, params).map(|p_cam| rig.camera_to_world(&p_cam))
}
