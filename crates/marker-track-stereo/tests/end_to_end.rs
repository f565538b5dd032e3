use approx::assert_abs_diff_eq;
use marker_track_core::{BgrFrame, RigParams, StereoRigConfig};
use marker_track_detect::{BlobCircleDetector, CircleDetectorParams};
use marker_track_stereo::{
    encode_f32_bgr, render_stereo, Constellation, NotDetected, PoseParams, StereoTracker,
    TriangulationParams,
};
use nalgebra::{Point3, Vector3};

const MARKER_RADIUS_PX: f64 = 6.0;

fn rig() -> StereoRigConfig {
    RigParams::default().build().expect("valid rig")
}

fn tracker() -> StereoTracker<BlobCircleDetector> {
    let detector = BlobCircleDetector::new(CircleDetectorParams {
        min_distance: 15.0,
        ..CircleDetectorParams::default()
    });
    StereoTracker::new(
        rig(),
        detector,
        TriangulationParams::default(),
        PoseParams::default(),
    )
}

fn scene(position: Point3<f64>, direction: Vector3<f64>) -> BgrFrame {
    let markers = Constellation::default()
        .markers(&position, &direction)
        .expect("direction");
    render_stereo(&rig(), &markers, MARKER_RADIUS_PX)
}

fn assert_recovers(position: Point3<f64>, direction: Vector3<f64>) {
    let frame = scene(position, direction);
    let report = tracker().track(&frame).expect("frame matches rig");
    assert_eq!(report.left.len(), 3, "left detections: {:?}", report.left);
    assert_eq!(report.right.len(), 3, "right detections: {:?}", report.right);

    let pose = report.outcome().expect("pose");
    assert_abs_diff_eq!(pose.position, position, epsilon = 0.01);
    assert_abs_diff_eq!(pose.direction, direction.normalize(), epsilon = 0.05);
    assert_abs_diff_eq!(pose.direction.norm(), 1.0, epsilon = 1e-9);
}

#[test]
fn recovers_pose_straight_ahead() {
    let rig = rig();
    let position = rig.camera_to_world(&Vector3::new(0.0, 0.0, 1.0));
    assert_recovers(position, Vector3::x());
}

#[test]
fn recovers_pose_off_axis() {
    let rig = rig();
    let position = rig.camera_to_world(&Vector3::new(0.05, -0.03, 1.1));
    // perpendicular to the viewing direction (0, -0.6, 0.8)
    assert_recovers(position, Vector3::new(0.0, 0.8, 0.6));
}

#[test]
fn wire_blob_gives_the_same_report() {
    let rig = rig();
    let frame = scene(
        rig.camera_to_world(&Vector3::new(-0.04, 0.02, 0.9)),
        Vector3::new(-1.0, 0.0, 0.0),
    );
    let (w, h) = rig.frame_size();
    let decoded = BgrFrame::from_f32_le_bytes(w as usize, h as usize, &encode_f32_bgr(&frame))
        .expect("wire length");

    let tracker = tracker();
    let direct = tracker.track(&frame).unwrap();
    let via_wire = tracker.track(&decoded).unwrap();
    assert!(direct.pose().is_some());
    assert_eq!(direct, via_wire);
}

#[test]
fn occluded_marker_is_not_detected() {
    let rig = rig();
    let position = rig.camera_to_world(&Vector3::new(0.0, 0.0, 1.0));
    let markers = Constellation::default()
        .markers(&position, &Vector3::x())
        .expect("direction");
    let frame = render_stereo(&rig, &markers[..2], MARKER_RADIUS_PX);

    let report = tracker().track(&frame).unwrap();
    assert_eq!(
        report.outcome(),
        Err(NotDetected::TooFewCorrespondences { found: 2 })
    );
}

#[test]
fn blank_frame_has_no_circles() {
    let (w, h) = rig().frame_size();
    let report = tracker()
        .track(&BgrFrame::new(w as usize, h as usize))
        .unwrap();
    assert_eq!(report.outcome(), Err(NotDetected::NoCircles));
    assert!(report.correspondences.is_empty());
}

#[test]
fn report_serializes_to_json() {
    let rig = rig();
    let frame = scene(
        rig.camera_to_world(&Vector3::new(0.0, 0.0, 1.0)),
        Vector3::x(),
    );
    let report = tracker().track(&frame).unwrap();
    let json: serde_json::Value = serde_json::to_value(&report).unwrap();
    assert_eq!(json["correspondences"].as_array().map(Vec::len), Some(3));
    assert!(json["pose"]["direction"].is_array());
    assert!(json["not_detected"].is_null());
}
