//! JSON configuration of a tracking session.

use std::{fs, path::Path, time::Duration};

use marker_track_core::{RigConfigError, RigParams, StereoRigConfig};
use marker_track_detect::{BlobCircleDetector, CircleDetectorParams};
use marker_track_stereo::{Constellation, PoseParams, StereoTracker, TriangulationParams};
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Rig(#[from] RigConfigError),
}

/// Where frames come from and how often to retry when they do not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamParams {
    /// `host:port` of the frame server.
    pub address: String,
    /// Pause between attempts while no frame is available.
    pub retry_interval_ms: u64,
}

impl Default for StreamParams {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:5001".to_string(),
            retry_interval_ms: 500,
        }
    }
}

impl StreamParams {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

/// Virtual stereo camera settings used by `serve` and `render`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticParams {
    pub constellation: Constellation,
    pub marker_radius_px: f64,
    pub fps: f64,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            constellation: Constellation::default(),
            marker_radius_px: 6.0,
            fps: 30.0,
        }
    }
}

/// Complete tracker configuration. Every section falls back to defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub rig: RigParams,
    pub detector: CircleDetectorParams,
    pub triangulation: TriangulationParams,
    pub pose: PoseParams,
    pub stream: StreamParams,
    pub synthetic: SyntheticParams,
}

impl TrackerConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Validated rig geometry.
    pub fn build_rig(&self) -> Result<StereoRigConfig, ConfigError> {
        Ok(self.rig.build()?)
    }

    /// Tracker with the built-in blob circle detector.
    pub fn build_tracker(&self) -> Result<StereoTracker<BlobCircleDetector>, ConfigError> {
        Ok(StereoTracker::new(
            self.build_rig()?,
            BlobCircleDetector::new(self.detector.clone()),
            self.triangulation,
            self.pose,
        ))
    }
}
