//! Side-by-side stereo frame splitting and half-frame coordinates.

use marker_track_core::{FrameError, GrayImage, GrayImageView};
use marker_track_detect::CircleCandidate;

use crate::types::MarkerDetection;

/// Cut a side-by-side frame at `half_width` into `(left, right)` halves.
///
/// The frame must be exactly `2 * half_width` by `half_height`; anything else
/// means the producer and the rig disagree on the frame layout.
pub fn split(
    frame: &GrayImageView<'_>,
    half_width: usize,
    half_height: usize,
) -> Result<(GrayImage, GrayImage), FrameError> {
    if frame.width != 2 * half_width || frame.height != half_height {
        return Err(FrameError::UnexpectedSize {
            expected_width: 2 * half_width,
            expected_height: half_height,
            width: frame.width,
            height: frame.height,
        });
    }
    Ok((
        frame.crop_columns(0, half_width),
        frame.crop_columns(half_width, half_width),
    ))
}

/// Raw half-frame pixel coordinates to centered, y-up coordinates.
#[inline]
pub fn to_centered(raw_x: f32, raw_y: f32, half_width: f32, half_height: f32) -> (f32, f32) {
    (raw_x - half_width / 2.0, half_height / 2.0 - raw_y)
}

/// Inverse of [`to_centered`].
#[inline]
pub fn to_raw(x: f32, y: f32, half_width: f32, half_height: f32) -> (f32, f32) {
    (x + half_width / 2.0, half_height / 2.0 - y)
}

/// Re-base circles found in one half into that half's centered coordinates.
pub fn rebase(candidates: &[CircleCandidate], half: &GrayImageView<'_>) -> Vec<MarkerDetection> {
    let (w, h) = (half.width as f32, half.height as f32);
    candidates
        .iter()
        .map(|c| {
            let (x, y) = to_centered(c.center_img.x, c.center_img.y, w, h);
            MarkerDetection::new(x, y, c.radius)
        })
        .collect()
}
