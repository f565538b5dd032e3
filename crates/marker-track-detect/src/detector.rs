use std::f32::consts::PI;

use marker_track_core::GrayImageView;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::blobs::{find_blobs, Blob};
use crate::blur::gaussian_blur_3x3;
use crate::params::{CircleDetectorParams, ThresholdMode};
use crate::threshold::{histogram, intensity_range, otsu_threshold};

/// One detected circle in raw pixel coordinates of the searched image.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CircleCandidate {
    /// Sub-pixel center; pixel centers sit at `i + 0.5`.
    pub center_img: Point2<f32>,
    pub radius: f32,
    /// Mean intensity above the binarization level.
    pub contrast: f32,
}

/// Capability returning unordered candidate marker circles from a
/// monochrome image region.
pub trait CircleDetector {
    fn detect(&self, img: &GrayImageView<'_>) -> Vec<CircleCandidate>;
}

impl<T: CircleDetector + ?Sized> CircleDetector for &T {
    fn detect(&self, img: &GrayImageView<'_>) -> Vec<CircleCandidate> {
        (**self).detect(img)
    }
}

impl<T: CircleDetector + ?Sized> CircleDetector for Box<T> {
    fn detect(&self, img: &GrayImageView<'_>) -> Vec<CircleCandidate> {
        (**self).detect(img)
    }
}

/// Bright-disc detector: blur, global threshold, connected components, shape
/// checks and non-maximum suppression.
#[derive(Clone, Debug, Default)]
pub struct BlobCircleDetector {
    params: CircleDetectorParams,
}

impl BlobCircleDetector {
    pub fn new(params: CircleDetectorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CircleDetectorParams {
        &self.params
    }

    fn accept(&self, blob: &Blob) -> Option<CircleCandidate> {
        let p = &self.params;
        let radius = (blob.area as f32 / PI).sqrt();
        if radius < p.min_radius || radius > p.max_radius {
            return None;
        }

        let (bw, bh) = (blob.bbox_width() as f32, blob.bbox_height() as f32);
        if bw.max(bh) / bw.min(bh) > p.max_aspect {
            return None;
        }

        let r_box = 0.5 * bw.max(bh);
        let fill = blob.area as f32 / (PI * r_box * r_box);
        if fill < p.min_fill {
            return None;
        }

        Some(CircleCandidate {
            center_img: Point2::new(blob.cx, blob.cy),
            radius,
            contrast: blob.mean_excess,
        })
    }
}

impl CircleDetector for BlobCircleDetector {
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, img), fields(width = img.width, height = img.height))
    )]
    fn detect(&self, img: &GrayImageView<'_>) -> Vec<CircleCandidate> {
        if img.width == 0 || img.height == 0 {
            return Vec::new();
        }
        let p = &self.params;

        let blurred = gaussian_blur_3x3(img, p.blur_sigma);
        let view = blurred.view();

        let hist = histogram(&view);
        let Some((min_v, max_v)) = intensity_range(&hist) else {
            return Vec::new();
        };
        if max_v - min_v < p.min_contrast {
            return Vec::new();
        }

        let level = match p.threshold {
            ThresholdMode::Fixed(level) => level,
            ThresholdMode::Otsu => otsu_threshold(&hist),
        };

        let side = 2.0 * p.max_radius + 3.0;
        let max_area = (side * side).ceil() as usize;

        let mut candidates: Vec<CircleCandidate> = find_blobs(&view, level, max_area)
            .iter()
            .filter_map(|b| self.accept(b))
            .collect();
        let found = candidates.len();

        candidates = suppress_close(candidates, p.min_distance);
        log::trace!(
            "circles: level={level} blobs_accepted={found} kept={}",
            candidates.len()
        );
        candidates
    }
}

/// Keep larger circles first; drop any circle closer than `min_distance` to
/// an already kept one.
fn suppress_close(mut candidates: Vec<CircleCandidate>, min_distance: f32) -> Vec<CircleCandidate> {
    candidates.sort_by(|a, b| {
        b.radius
            .partial_cmp(&a.radius)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.contrast
                    .partial_cmp(&a.contrast)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });

    let min_d2 = min_distance * min_distance;
    let mut kept: Vec<CircleCandidate> = Vec::with_capacity(candidates.len());
    for c in candidates {
        let far = kept
            .iter()
            .all(|k| (k.center_img - c.center_img).norm_squared() >= min_d2);
        if far {
            kept.push(c);
        }
    }
    kept
}
