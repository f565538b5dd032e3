//! Stereo tracking of a three-marker instrument.
//!
//! One cycle:
//! - split the side-by-side frame into left and right halves,
//! - detect circles per half and re-base them into centered, y-up coordinates,
//! - pair left/right detections by angular order around each view's centroid,
//! - triangulate every pair into world space,
//! - derive the instrument position and direction from the three points.
//!
//! Circle detection itself lives in `marker-track-detect`.

mod matcher;
mod pipeline;
mod pose;
mod split;
mod synthetic;
mod triangulate;
mod types;

pub use matcher::{match_correspondences, sort_by_angle};
pub use pipeline::{StereoTracker, TrackingReport};
pub use pose::{estimate_pose, ApexRule, NotDetected, PoseParams, MARKER_COUNT};
pub use split::{rebase, split, to_centered, to_raw};
pub use synthetic::{encode_f32_bgr, project, render_stereo, Constellation};
pub use triangulate::{triangulate, triangulate_camera, TriangulationParams};
pub use types::{Correspondence, InstrumentPose, MarkerDetection};

pub use marker_track_core::{BgrFrame, FrameError, StereoRigConfig};
