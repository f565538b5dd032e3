//! One tracking cycle, from a side-by-side frame to an instrument pose.

use marker_track_core::{BgrFrame, FrameError, GrayImageView, StereoRigConfig};
use marker_track_detect::CircleDetector;
use nalgebra::Point3;
use serde::ser::{Serialize, SerializeStruct, Serializer};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::matcher::match_correspondences;
use crate::pose::{estimate_pose, NotDetected, PoseParams, MARKER_COUNT};
use crate::split::{rebase, split};
use crate::triangulate::{triangulate, TriangulationParams};
use crate::types::{Correspondence, InstrumentPose, MarkerDetection};

/// Everything one cycle produced, including the intermediate stages.
///
/// Serializes with a `pose` field and a `not_detected` field, exactly one of
/// which is non-null.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackingReport {
    pub left: Vec<MarkerDetection>,
    pub right: Vec<MarkerDetection>,
    pub correspondences: Vec<Correspondence>,
    pub points: Vec<Point3<f64>>,
    outcome: Result<InstrumentPose, NotDetected>,
}

impl TrackingReport {
    fn new(left: Vec<MarkerDetection>, right: Vec<MarkerDetection>) -> Self {
        Self {
            left,
            right,
            correspondences: Vec::new(),
            points: Vec::new(),
            outcome: Err(NotDetected::NoCircles),
        }
    }

    fn fail(mut self, reason: NotDetected) -> Self {
        self.outcome = Err(reason);
        self
    }

    /// Pose or the reason there is none.
    pub fn outcome(&self) -> Result<InstrumentPose, NotDetected> {
        self.outcome
    }

    pub fn pose(&self) -> Option<InstrumentPose> {
        self.outcome.ok()
    }

    pub fn not_detected(&self) -> Option<NotDetected> {
        self.outcome.err()
    }
}

impl Serialize for TrackingReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("TrackingReport", 6)?;
        s.serialize_field("left", &self.left)?;
        s.serialize_field("right", &self.right)?;
        s.serialize_field("correspondences", &self.correspondences)?;
        s.serialize_field("points", &self.points)?;
        s.serialize_field("pose", &self.pose())?;
        s.serialize_field("not_detected", &self.not_detected())?;
        s.end()
    }
}

/// Stateless per-frame tracker. Holds only immutable configuration, so the
/// same instance serves every cycle.
pub struct StereoTracker<D> {
    rig: StereoRigConfig,
    detector: D,
    triangulation: TriangulationParams,
    pose: PoseParams,
}

impl<D: CircleDetector> StereoTracker<D> {
    pub fn new(
        rig: StereoRigConfig,
        detector: D,
        triangulation: TriangulationParams,
        pose: PoseParams,
    ) -> Self {
        Self {
            rig,
            detector,
            triangulation,
            pose,
        }
    }

    pub fn rig(&self) -> &StereoRigConfig {
        &self.rig
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Run one cycle on a BGR frame.
    ///
    /// Only a frame whose size disagrees with the rig is an error; every
    /// detection shortfall is reported through [`TrackingReport::outcome`].
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(width = frame.width, height = frame.height))
    )]
    pub fn track(&self, frame: &BgrFrame) -> Result<TrackingReport, FrameError> {
        let gray = frame.to_gray();
        self.track_gray(&gray.view())
    }

    /// Run one cycle on an already grayscale frame.
    pub fn track_gray(&self, frame: &GrayImageView<'_>) -> Result<TrackingReport, FrameError> {
        let (left_img, right_img) = split(
            frame,
            self.rig.half_width() as usize,
            self.rig.half_height() as usize,
        )?;

        let mut report = TrackingReport::new(
            rebase(&self.detector.detect(&left_img.view()), &left_img.view()),
            rebase(&self.detector.detect(&right_img.view()), &right_img.view()),
        );
        log::trace!(
            "circles: left={}, right={}",
            report.left.len(),
            report.right.len()
        );
        if report.left.is_empty() || report.right.is_empty() {
            return Ok(report.fail(NotDetected::NoCircles));
        }

        report.correspondences = match_correspondences(&report.left, &report.right);
        if report.correspondences.len() < MARKER_COUNT {
            let found = report.correspondences.len();
            return Ok(report.fail(NotDetected::TooFewCorrespondences { found }));
        }

        let points: Option<Vec<_>> = report
            .correspondences
            .iter()
            .map(|c| triangulate(c, &self.rig, &self.triangulation))
            .collect();
        let Some(points) = points else {
            return Ok(report.fail(NotDetected::ZeroDisparity));
        };
        report.points = points;

        report.outcome = estimate_pose(&report.points, &self.pose);
        Ok(report)
    }
}
