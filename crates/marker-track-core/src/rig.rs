//! Stereo rig description.
//!
//! [`RigParams`] is the serializable startup configuration. It is validated
//! once into an immutable [`StereoRigConfig`] that every pipeline call borrows.

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::geometry::rotation_between;

/// Camera-space forward axis; the configured camera pose is measured against it.
pub fn camera_forward() -> Vector3<f64> {
    Vector3::z()
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RigConfigError {
    #[error("invalid half-frame size (width={width}, height={height})")]
    InvalidFrameSize { width: u64, height: u64 },
    #[error("field of view must be in (0, 180) degrees, got {0}")]
    InvalidFieldOfView(f64),
    #[error("baseline must be positive and finite, got {0}")]
    InvalidBaseline(f64),
    #[error("camera pose vector has zero length")]
    DegenerateCameraPose,
}

/// Startup parameters of the stereo rig.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigParams {
    /// Width of one camera sensor in display pixels.
    pub sensor_width: u32,
    /// Height of one camera sensor in display pixels.
    pub sensor_height: u32,
    /// Framebuffer zoom applied to the sensor size when frames are produced.
    pub fb_zoom: u32,
    /// Horizontal field of view of each camera.
    pub fov_degrees: f64,
    /// Horizontal distance between the two camera centers.
    pub baseline: f64,
    /// Height of the rig center in world space.
    pub mount_y: f64,
    /// Depth of the rig center in world space.
    pub mount_z: f64,
    /// World-space viewing direction of the rig.
    pub camera_pose: [f64; 3],
}

impl Default for RigParams {
    fn default() -> Self {
        Self {
            sensor_width: 480,
            sensor_height: 480,
            fb_zoom: 1,
            fov_degrees: 60.0,
            baseline: 0.2,
            mount_y: 1.5,
            mount_z: -1.0,
            camera_pose: [0.0, -0.6, 0.8],
        }
    }
}

impl RigParams {
    /// Width of one half of the side-by-side stereo frame, `None` on overflow.
    pub fn half_width(&self) -> Option<u32> {
        self.sensor_width.checked_mul(self.fb_zoom)
    }

    pub fn half_height(&self) -> Option<u32> {
        self.sensor_height.checked_mul(self.fb_zoom)
    }

    /// Validate and derive the immutable rig configuration.
    pub fn build(&self) -> Result<StereoRigConfig, RigConfigError> {
        StereoRigConfig::from_params(self)
    }
}

/// Immutable stereo rig geometry shared read-only by every tracking cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct StereoRigConfig {
    half_width: u32,
    half_height: u32,
    baseline: f64,
    focal_length: f64,
    mount_position: Vector3<f64>,
    mount_rotation: Matrix4<f64>,
}

impl StereoRigConfig {
    /// Build a rig from explicit values. `mount_rotation` must be a pure
    /// rotation and `half_width` at most `u32::MAX / 2`.
    pub fn new(
        half_width: u32,
        half_height: u32,
        baseline: f64,
        focal_length: f64,
        mount_position: Vector3<f64>,
        mount_rotation: Matrix4<f64>,
    ) -> Self {
        Self {
            half_width,
            half_height,
            baseline,
            focal_length,
            mount_position,
            mount_rotation,
        }
    }

    pub fn from_params(params: &RigParams) -> Result<Self, RigConfigError> {
        // The full frame is two halves wide and its size must fit in u32.
        let size = params
            .half_width()
            .filter(|w| w.checked_mul(2).is_some())
            .zip(params.half_height())
            .filter(|&(w, h)| w > 0 && h > 0);
        let Some((half_width, half_height)) = size else {
            return Err(RigConfigError::InvalidFrameSize {
                width: u64::from(params.sensor_width) * u64::from(params.fb_zoom),
                height: u64::from(params.sensor_height) * u64::from(params.fb_zoom),
            });
        };
        if !(params.fov_degrees > 0.0 && params.fov_degrees < 180.0) {
            return Err(RigConfigError::InvalidFieldOfView(params.fov_degrees));
        }
        if !(params.baseline.is_finite() && params.baseline > 0.0) {
            return Err(RigConfigError::InvalidBaseline(params.baseline));
        }

        let fov = params.fov_degrees.to_radians();
        let focal_length = half_width as f64 / (2.0 * (fov / 2.0).tan());

        let [px, py, pz] = params.camera_pose;
        let mount_rotation = rotation_between(&camera_forward(), &Vector3::new(px, py, pz))
            .ok_or(RigConfigError::DegenerateCameraPose)?;

        // The rig is mounted symmetrically about the world x axis.
        let mount_position = Vector3::new(0.0, params.mount_y, params.mount_z);

        Ok(Self::new(
            half_width,
            half_height,
            params.baseline,
            focal_length,
            mount_position,
            mount_rotation,
        ))
    }

    pub fn half_width(&self) -> u32 {
        self.half_width
    }

    pub fn half_height(&self) -> u32 {
        self.half_height
    }

    /// Full side-by-side frame size `(2 * half_width, half_height)`.
    pub fn frame_size(&self) -> (u32, u32) {
        (self.half_width.saturating_mul(2), self.half_height)
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    /// Focal length in pixels.
    pub fn focal_length(&self) -> f64 {
        self.focal_length
    }

    pub fn mount_position(&self) -> Vector3<f64> {
        self.mount_position
    }

    pub fn mount_rotation(&self) -> &Matrix4<f64> {
        &self.mount_rotation
    }

    fn rotation3(&self) -> Matrix3<f64> {
        self.mount_rotation.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Map a camera-space point (rig center origin) into world space.
    pub fn camera_to_world(&self, p_cam: &Vector3<f64>) -> Point3<f64> {
        let rotated = (self.mount_rotation * p_cam.to_homogeneous()).xyz();
        Point3::from(rotated + self.mount_position)
    }

    /// Inverse of [`Self::camera_to_world`].
    pub fn world_to_camera(&self, p_world: &Point3<f64>) -> Vector3<f64> {
        self.rotation3().transpose() * (p_world.coords - self.mount_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn focal_length_from_fov() {
        let params = RigParams {
            sensor_width: 400,
            fov_degrees: 90.0,
            ..RigParams::default()
        };
        let rig = params.build().expect("valid rig");
        assert_abs_diff_eq!(rig.focal_length(), 200.0, epsilon = 1e-9);
        assert_eq!(rig.frame_size(), (800, 480));
    }

    #[test]
    fn fb_zoom_scales_half_frame() {
        let params = RigParams {
            fb_zoom: 2,
            ..RigParams::default()
        };
        let rig = params.build().expect("valid rig");
        assert_eq!(rig.half_width(), 960);
        assert_eq!(rig.half_height(), 960);
    }

    #[test]
    fn mount_rotation_points_forward_along_camera_pose() {
        let rig = RigParams::default().build().expect("valid rig");
        let p = rig.camera_to_world(&Vector3::new(0.0, 0.0, 1.0));
        let expected = Point3::new(0.0, 1.5 - 0.6, -1.0 + 0.8);
        assert_abs_diff_eq!(p, expected, epsilon = 1e-9);
    }

    #[test]
    fn world_to_camera_inverts_camera_to_world() {
        let rig = RigParams::default().build().expect("valid rig");
        let cam = Vector3::new(0.1, -0.2, 1.3);
        let back = rig.world_to_camera(&rig.camera_to_world(&cam));
        assert_abs_diff_eq!(back, cam, epsilon = 1e-9);
    }

    #[test]
    fn rejects_invalid_params() {
        let bad_pose = RigParams {
            camera_pose: [0.0, 0.0, 0.0],
            ..RigParams::default()
        };
        assert_eq!(bad_pose.build(), Err(RigConfigError::DegenerateCameraPose));

        let bad_fov = RigParams {
            fov_degrees: 180.0,
            ..RigParams::default()
        };
        assert!(matches!(
            bad_fov.build(),
            Err(RigConfigError::InvalidFieldOfView(_))
        ));

        let bad_baseline = RigParams {
            baseline: 0.0,
            ..RigParams::default()
        };
        assert!(matches!(
            bad_baseline.build(),
            Err(RigConfigError::InvalidBaseline(_))
        ));

        let bad_size = RigParams {
            sensor_width: 0,
            ..RigParams::default()
        };
        assert!(matches!(
            bad_size.build(),
            Err(RigConfigError::InvalidFrameSize { .. })
        ));

        let huge_zoom = RigParams {
            fb_zoom: 10_000_000,
            ..RigParams::default()
        };
        assert_eq!(huge_zoom.half_width(), None);
        assert_eq!(
            huge_zoom.build(),
            Err(RigConfigError::InvalidFrameSize {
                width: 4_800_000_000,
                height: 4_800_000_000,
            })
        );

        // fits in u32 per half, but not as a side-by-side frame
        let too_wide = RigParams {
            sensor_width: u32::MAX / 2 + 1,
            fb_zoom: 1,
            ..RigParams::default()
        };
        assert!(matches!(
            too_wide.build(),
            Err(RigConfigError::InvalidFrameSize { .. })
        ));
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let params: RigParams = serde_json::from_str(r#"{ "baseline": 0.3 }"#).unwrap();
        assert_eq!(params.baseline, 0.3);
        assert_eq!(params.sensor_width, 480);
    }
}
