//! The tracking loop: pull a frame, run one cycle, hand out the report.

use std::thread;
use std::time::Duration;

use marker_track_core::{BgrFrame, FrameError};
use marker_track_detect::CircleDetector;
use marker_track_stereo::{StereoTracker, TrackingReport};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::source::{FrameSource, NextFrame};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Sleep between polls while no frame is available.
    pub retry_interval: Duration,
    /// Stop after this many processed frames.
    pub max_frames: Option<u64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_millis(500),
            max_frames: None,
        }
    }
}

/// Counters of a finished run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub detected: u64,
    pub unavailable: u64,
}

/// Drive `tracker` with frames from `source` until the channel closes or
/// `max_frames` is reached.
///
/// A malformed or wrongly sized frame aborts the loop with the error; every
/// other shortfall is retried or reported through `on_report`.
pub fn run_tracking<S, D, F>(
    source: &mut S,
    tracker: &StereoTracker<D>,
    options: &RunOptions,
    mut on_report: F,
) -> Result<RunSummary, FrameError>
where
    S: FrameSource + ?Sized,
    D: CircleDetector,
    F: FnMut(&TrackingReport),
{
    let mut summary = RunSummary::default();
    loop {
        if options.max_frames.is_some_and(|max| summary.frames >= max) {
            log::info!("frame limit reached after {} frames", summary.frames);
            return Ok(summary);
        }
        let frame = match source.next_frame() {
            Ok(NextFrame::Frame(frame)) => frame,
            Ok(NextFrame::NotAvailable) => {
                summary.unavailable += 1;
                thread::sleep(options.retry_interval);
                continue;
            }
            Ok(NextFrame::Closed) => {
                log::info!("frame channel closed after {} frames", summary.frames);
                return Ok(summary);
            }
            Err(e) => {
                log::error!("aborting: {e}");
                return Err(e);
            }
        };

        let report = track_one(tracker, &frame, summary.frames)?;
        summary.frames += 1;
        if report.pose().is_some() {
            summary.detected += 1;
        }
        on_report(&report);
    }
}

#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(tracker, frame)))]
fn track_one<D: CircleDetector>(
    tracker: &StereoTracker<D>,
    frame: &BgrFrame,
    index: u64,
) -> Result<TrackingReport, FrameError> {
    let report = tracker.track(frame).inspect_err(|e| log::error!("aborting: {e}"))?;
    match report.outcome() {
        Ok(pose) => log::debug!(
            "frame {index}: position=({:.4}, {:.4}, {:.4}) direction=({:.3}, {:.3}, {:.3})",
            pose.position.x,
            pose.position.y,
            pose.position.z,
            pose.direction.x,
            pose.direction.y,
            pose.direction.z
        ),
        Err(reason) => log::debug!("frame {index}: not detected ({reason})"),
    }
    Ok(report)
}

/// Run one cycle on a raw wire blob of the rig's frame size.
pub fn analyze_blob<D: CircleDetector>(
    tracker: &StereoTracker<D>,
    blob: &[u8],
) -> Result<TrackingReport, FrameError> {
    let (w, h) = tracker.rig().frame_size();
    let frame = BgrFrame::from_f32_le_bytes(w as usize, h as usize, blob)?;
    tracker.track(&frame)
}
