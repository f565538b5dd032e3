//! Circle marker detection for stereo half-frames.
//!
//! The tracking pipeline only needs the [`CircleDetector`] capability:
//! unordered circle candidates with a sub-pixel center and a radius. The
//! built-in [`BlobCircleDetector`] targets bright reflective markers on a dark
//! background:
//! 1. optional 3x3 Gaussian pre-blur,
//! 2. global threshold (fixed or Otsu),
//! 3. 8-connected component labelling,
//! 4. radius, aspect and fill checks per blob,
//! 5. suppression of circles closer than `min_distance`.

mod blobs;
mod blur;
mod detector;
mod params;
mod threshold;

pub use detector::{BlobCircleDetector, CircleCandidate, CircleDetector};
pub use params::{CircleDetectorParams, ThresholdMode};
