//! Side-by-side stereo pixel frames and their wire representation.
//!
//! On the wire a frame is `width * height * 3` little-endian `f32` samples,
//! row-major, BGR channel order, values in `[0, 1]`. In memory frames are
//! 8-bit BGR, converted with `round(v * 255)`.

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::image::GrayImage;

const CHANNELS: usize = 3;
const F32_BYTES: usize = 4;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("malformed frame: expected {expected} bytes, got {got}")]
    MalformedFrame { expected: usize, got: usize },
    #[error("invalid frame length prefix {0}")]
    InvalidLengthPrefix(i64),
    #[error("invalid frame dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
    #[error("frame is {width}x{height}, rig expects {expected_width}x{expected_height}")]
    UnexpectedSize {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },
}

/// 8-bit BGR frame, row-major, 3 bytes per pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct BgrFrame {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

/// Size in bytes of one serialized frame of the given dimensions.
pub fn wire_frame_len(width: usize, height: usize) -> Option<usize> {
    width
        .checked_mul(height)?
        .checked_mul(CHANNELS * F32_BYTES)
}

impl BgrFrame {
    /// Black frame.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * CHANNELS],
        }
    }

    /// Decode a serialized `f32` BGR blob.
    ///
    /// A length mismatch means producer and consumer disagree on the frame
    /// size and is reported as [`FrameError::MalformedFrame`].
    pub fn from_f32_le_bytes(width: usize, height: usize, bytes: &[u8]) -> Result<Self, FrameError> {
        let expected =
            wire_frame_len(width, height).ok_or(FrameError::InvalidDimensions { width, height })?;
        if bytes.len() != expected {
            return Err(FrameError::MalformedFrame {
                expected,
                got: bytes.len(),
            });
        }
        let data = bytes
            .chunks_exact(F32_BYTES)
            .map(|c| quantize(f32::from_le_bytes([c[0], c[1], c[2], c[3]])))
            .collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Serialize into the `f32` little-endian wire blob.
    pub fn to_f32_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * F32_BYTES);
        for &v in &self.data {
            out.extend_from_slice(&(v as f32 / 255.0).to_le_bytes());
        }
        out
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, bgr: [u8; 3]) {
        let idx = (y * self.width + x) * CHANNELS;
        self.data[idx..idx + CHANNELS].copy_from_slice(&bgr);
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let idx = (y * self.width + x) * CHANNELS;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Luma conversion (`0.299 R + 0.587 G + 0.114 B`).
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "trace", skip_all, fields(width = self.width, height = self.height))
    )]
    pub fn to_gray(&self) -> GrayImage {
        let data = self
            .data
            .chunks_exact(CHANNELS)
            .map(|bgr| {
                let (b, g, r) = (bgr[0] as f32, bgr[1] as f32, bgr[2] as f32);
                (0.114 * b + 0.587 * g + 0.299 * r).round().clamp(0.0, 255.0) as u8
            })
            .collect();
        GrayImage {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

#[inline]
fn quantize(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn decodes_and_rounds_samples() {
        // 2x1 frame: pixel 0 = (0, 0.5, 1), pixel 1 = (0.2, 0.999, 0.001)
        let bytes = blob(&[0.0, 0.5, 1.0, 0.2, 0.999, 0.001]);
        let frame = BgrFrame::from_f32_le_bytes(2, 1, &bytes).expect("valid frame");
        assert_eq!(frame.pixel(0, 0), [0, 128, 255]);
        assert_eq!(frame.pixel(1, 0), [51, 255, 0]);
    }

    #[test]
    fn out_of_range_samples_saturate() {
        let bytes = blob(&[-0.5, 1.5, f32::NAN]);
        let frame = BgrFrame::from_f32_le_bytes(1, 1, &bytes).expect("valid frame");
        assert_eq!(frame.pixel(0, 0), [0, 255, 0]);
    }

    #[test]
    fn wrong_size_is_malformed() {
        let bytes = blob(&[0.0; 5]);
        let err = BgrFrame::from_f32_le_bytes(2, 1, &bytes).unwrap_err();
        assert_eq!(
            err,
            FrameError::MalformedFrame {
                expected: 24,
                got: 20
            }
        );
    }

    #[test]
    fn wire_round_trip_preserves_bytes() {
        let mut frame = BgrFrame::new(3, 2);
        frame.set_pixel(1, 1, [10, 200, 255]);
        let back = BgrFrame::from_f32_le_bytes(3, 2, &frame.to_f32_le_bytes()).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn gray_uses_luma_weights() {
        let mut frame = BgrFrame::new(3, 1);
        frame.set_pixel(0, 0, [255, 255, 255]);
        frame.set_pixel(1, 0, [0, 0, 255]); // pure red
        frame.set_pixel(2, 0, [255, 0, 0]); // pure blue
        let gray = frame.to_gray();
        assert_eq!(gray.data, vec![255, 76, 29]);
    }
}
