use serde::{Deserialize, Serialize};

/// How the binarization level for marker blobs is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Pixels strictly above this level are foreground.
    Fixed(u8),
    /// Otsu level computed per half-frame.
    Otsu,
}

/// Settings of the blob circle detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleDetectorParams {
    /// Sigma of the 3x3 Gaussian pre-blur; `0` disables it.
    pub blur_sigma: f32,
    pub threshold: ThresholdMode,
    /// Minimum `max - min` intensity of the image; flatter images have no markers.
    pub min_contrast: u8,
    /// Accepted equivalent radius range in pixels.
    pub min_radius: f32,
    pub max_radius: f32,
    /// Largest accepted `max(w, h) / min(w, h)` of the blob bounding box.
    pub max_aspect: f32,
    /// Smallest accepted `area / (pi * r_box^2)` where `r_box` is half the
    /// larger bounding-box side.
    pub min_fill: f32,
    /// Minimum distance between accepted circle centers in pixels.
    pub min_distance: f32,
}

impl Default for CircleDetectorParams {
    fn default() -> Self {
        Self {
            blur_sigma: 2.0,
            threshold: ThresholdMode::Otsu,
            min_contrast: 40,
            min_radius: 4.0,
            max_radius: 50.0,
            max_aspect: 1.6,
            min_fill: 0.6,
            min_distance: 30.0,
        }
    }
}
