//! Synthetic side-by-side stereo frames of a marker constellation.
//!
//! Used by the virtual camera server, the `render` command, tests and
//! benches. The projection is the exact inverse of triangulation: the left
//! camera sits at `-baseline / 2` and the right camera at `+baseline / 2`
//! along the rig's x axis.

use marker_track_core::{
    camera_forward, rotate_direction, rotation_between, BgrFrame, StereoRigConfig,
};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::split::to_raw;

const WHITE: [u8; 3] = [255, 255, 255];

/// Fixed isosceles marker triangle in instrument coordinates.
///
/// The base markers sit at `±base_half_width` across the instrument and the
/// apex marker `apex_offset` ahead of the base midpoint. Placed markers have
/// their centroid at the instrument position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constellation {
    pub apex_offset: f64,
    pub base_half_width: f64,
}

impl Default for Constellation {
    fn default() -> Self {
        Self {
            apex_offset: 0.08,
            base_half_width: 0.08,
        }
    }
}

impl Constellation {
    /// World positions `[apex, base_a, base_b]` for an instrument at
    /// `position` pointing along `direction`. `None` for a zero direction.
    pub fn markers(
        &self,
        position: &Point3<f64>,
        direction: &Vector3<f64>,
    ) -> Option<[Point3<f64>; 3]> {
        let r = rotation_between(&camera_forward(), direction)?;
        let h = self.apex_offset;
        let w = self.base_half_width;
        let local = [
            Vector3::new(0.0, 0.0, 2.0 * h / 3.0),
            Vector3::new(w, 0.0, -h / 3.0),
            Vector3::new(-w, 0.0, -h / 3.0),
        ];
        Some(local.map(|v| *position + rotate_direction(&r, &v)))
    }
}

/// Centered, y-up image coordinates of a world point in the left and right
/// cameras, or `None` when it is not in front of the rig.
pub fn project(rig: &StereoRigConfig, p: &Point3<f64>) -> Option<((f64, f64), (f64, f64))> {
    let cam = rig.world_to_camera(p);
    if cam.z <= 0.0 {
        return None;
    }
    let f = rig.focal_length();
    let half_b = rig.baseline() / 2.0;
    let y = f * cam.y / cam.z;
    Some((
        (f * (cam.x + half_b) / cam.z, y),
        (f * (cam.x - half_b) / cam.z, y),
    ))
}

/// White discs on black for every marker, drawn into both halves of a
/// side-by-side frame sized for `rig`.
pub fn render_stereo(rig: &StereoRigConfig, markers: &[Point3<f64>], radius_px: f64) -> BgrFrame {
    let (w, h) = rig.frame_size();
    let mut frame = BgrFrame::new(w as usize, h as usize);
    let (hw, hh) = (rig.half_width() as f32, rig.half_height() as f32);

    for p in markers {
        let Some(((lx, ly), (rx, ry))) = project(rig, p) else {
            log::debug!("marker {p:?} behind the rig, skipped");
            continue;
        };
        let (lx, ly) = to_raw(lx as f32, ly as f32, hw, hh);
        let (rx, ry) = to_raw(rx as f32, ry as f32, hw, hh);
        draw_disc(&mut frame, 0, lx as f64, ly as f64, radius_px);
        draw_disc(&mut frame, 1, rx as f64, ry as f64, radius_px);
    }
    frame
}

/// Wire blob of a frame (`f32` little-endian BGR in `[0, 1]`).
pub fn encode_f32_bgr(frame: &BgrFrame) -> Vec<u8> {
    frame.to_f32_le_bytes()
}

/// Fill pixels whose centers lie within `r` of `(cx, cy)`, clipped to the
/// given half of the frame.
fn draw_disc(frame: &mut BgrFrame, half: usize, cx: f64, cy: f64, r: f64) {
    let half_width = frame.width / 2;
    let x_off = half * half_width;
    let x0 = (cx - r).floor().max(0.0) as usize;
    let x1 = ((cx + r).ceil().max(0.0) as usize).min(half_width);
    let y0 = (cy - r).floor().max(0.0) as usize;
    let y1 = ((cy + r).ceil().max(0.0) as usize).min(frame.height);
    let r2 = r * r;
    for j in y0..y1 {
        for i in x0..x1 {
            let dx = i as f64 + 0.5 - cx;
            let dy = j as f64 + 0.5 - cy;
            if dx * dx + dy * dy <= r2 {
                frame.set_pixel(x_off + i, j, WHITE);
            }
        }
    }
}
