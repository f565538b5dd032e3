use assert_cmd::Command;
use marker_track::TrackerConfig;
use predicates::prelude::*;
use serde_json::Value;

fn cli() -> Command {
    Command::cargo_bin("marker-track").expect("binary built")
}

#[test]
fn init_config_writes_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.json");
    cli()
        .args(["init-config", "--out"])
        .arg(&path)
        .assert()
        .success();
    assert_eq!(
        TrackerConfig::load_json(&path).unwrap(),
        TrackerConfig::default()
    );
}

#[test]
fn rendered_frame_is_analyzed() {
    let dir = tempfile::tempdir().unwrap();
    let frame = dir.path().join("frame.raw");
    cli()
        .args(["render", "--out"])
        .arg(&frame)
        .args(["--x", "0.02", "--y", "1.0", "--z", "-0.2"])
        .assert()
        .success();
    assert_eq!(std::fs::metadata(&frame).unwrap().len(), 960 * 480 * 3 * 4);

    let output = cli().arg("analyze").arg(&frame).assert().success();
    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let json: Value = serde_json::from_str(&stdout).unwrap();
    assert!(json["not_detected"].is_null(), "{stdout}");

    let position = &json["pose"]["position"];
    assert!((position[0].as_f64().unwrap() - 0.02).abs() < 0.01);
    assert!((position[1].as_f64().unwrap() - 1.0).abs() < 0.01);
    assert!((position[2].as_f64().unwrap() + 0.2).abs() < 0.01);
    assert!((json["pose"]["direction"][0].as_f64().unwrap() - 1.0).abs() < 0.05);
}

#[test]
fn analyze_uses_the_config_rig() {
    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("tracker.json");
    let mut cfg = TrackerConfig::default();
    cfg.rig.sensor_width = 320;
    cfg.rig.sensor_height = 240;
    // markers are closer together on the smaller sensor
    cfg.detector.min_distance = 15.0;
    cfg.write_json(&cfg_path).unwrap();

    let frame = dir.path().join("small.raw");
    cli()
        .args(["render", "--config"])
        .arg(&cfg_path)
        .arg("--out")
        .arg(&frame)
        .assert()
        .success();

    // default rig expects 960x480 frames
    cli()
        .arg("analyze")
        .arg(&frame)
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed frame"));

    let output = cli()
        .args(["analyze", "--config"])
        .arg(&cfg_path)
        .arg(&frame)
        .assert()
        .success();
    let report: Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(report["left"].as_array().map(Vec::len), Some(3));
}

#[test]
fn blank_frame_reports_no_circles() {
    let dir = tempfile::tempdir().unwrap();
    let frame = dir.path().join("blank.raw");
    std::fs::write(&frame, vec![0u8; 960 * 480 * 3 * 4]).unwrap();
    cli()
        .arg("analyze")
        .arg(&frame)
        .assert()
        .success()
        .stdout(predicate::str::contains("no_circles"));
}

#[test]
fn zero_direction_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .args(["render", "--dir-x", "0", "--out"])
        .arg(dir.path().join("f.raw"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("non-zero"));
}
