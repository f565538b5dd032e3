//! High-level facade crate for the `marker-track-*` workspace.
//!
//! This crate provides:
//! - re-exports of the core, detector and stereo crates,
//! - frame sources feeding the tracking loop (single-slot hand-off, TCP
//!   stream client and the matching frame server),
//! - the JSON [`TrackerConfig`] and the [`run_tracking`] loop behind the
//!   `marker-track` CLI.
//!
//! ## Quickstart
//!
//! ```no_run
//! use marker_track::{run_tracking, RunOptions, StreamFrameSource, TrackerConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = TrackerConfig::load_json("tracker.json")?;
//! let tracker = cfg.build_tracker()?;
//! let (w, h) = tracker.rig().frame_size();
//! let mut source = StreamFrameSource::new(cfg.stream.address.clone(), w as usize, h as usize);
//! let options = RunOptions {
//!     retry_interval: cfg.stream.retry_interval(),
//!     max_frames: None,
//! };
//! run_tracking(&mut source, &tracker, &options, |report| {
//!     if let Some(pose) = report.pose() {
//!         println!("{:?} {:?}", pose.position, pose.direction);
//!     }
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `marker_track::core`: rig geometry, rotation solver, frames and images.
//! - `marker_track::detect`: circle detector trait and the blob detector.
//! - `marker_track::stereo`: split, match, triangulate, pose, synthetic frames.
//! - `marker_track::image_io` (feature `image`): frames from/to image files.

pub use marker_track_core as core;
pub use marker_track_detect as detect;
pub use marker_track_stereo as stereo;

pub use marker_track_core::{BgrFrame, FrameError, RigConfigError, RigParams, StereoRigConfig};
pub use marker_track_detect::{BlobCircleDetector, CircleDetector, CircleDetectorParams};
pub use marker_track_stereo::{
    InstrumentPose, NotDetected, PoseParams, StereoTracker, TrackingReport, TriangulationParams,
};

mod config;
mod run;
mod slot;
mod source;
mod stream;

#[cfg(feature = "image")]
pub mod image_io;

pub use config::{ConfigError, StreamParams, SyntheticParams, TrackerConfig};
pub use run::{analyze_blob, run_tracking, RunOptions, RunSummary};
pub use slot::{frame_slot, FrameSlot, SlotFrameSource, SlotPublisher, SlotRecv};
pub use source::{FrameSource, NextFrame, ReplaySource};
pub use stream::{
    read_message, spawn_stream_reader, write_message, FrameServer, StreamError,
    StreamFrameSource, StreamInterrupt, StreamReader,
};

/// Route `log` records into `tracing` and install the formatter from
/// `marker-track-core`.
///
/// Errors from an already installed logger or subscriber are ignored.
#[cfg(feature = "tracing")]
pub fn init_tracing(default_filter: &str, json: bool) {
    let _ = tracing_log::LogTracer::init();
    marker_track_core::init_tracing(default_filter, json);
}
