use marker_track_core::{camera_forward, rotation_between};
use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// One marker seen by one camera, in the half-frame's centered, y-up
/// coordinates (origin at the half-frame center).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    pub x: f32,
    pub y: f32,
    /// Advisory only; not used by matching or triangulation.
    pub radius: f32,
}

impl MarkerDetection {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self { x, y, radius }
    }
}

/// Left/right detections believed to be the same physical marker.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub left: MarkerDetection,
    pub right: MarkerDetection,
}

impl Correspondence {
    /// Absolute horizontal disparity in pixels.
    pub fn disparity(&self) -> f32 {
        (self.left.x - self.right.x).abs()
    }
}

/// Instrument position (constellation centroid) and unit pointing direction
/// in world coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstrumentPose {
    pub position: Point3<f64>,
    pub direction: Vector3<f64>,
}

impl InstrumentPose {
    /// Rotation taking the instrument model's forward axis `(0, 0, 1)` onto
    /// `direction`. Roll about the direction is not observable and is left
    /// to the solver's minimal rotation.
    pub fn rotation(&self) -> Matrix4<f64> {
        rotation_between(&camera_forward(), &self.direction).unwrap_or_else(Matrix4::identity)
    }

    /// Rotation followed by translation to `position`, as applied to the
    /// instrument model.
    pub fn model_matrix(&self) -> Matrix4<f64> {
        let mut m = self.rotation();
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.position.coords);
        m
    }
}
