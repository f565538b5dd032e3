use std::{
    error::Error,
    fs,
    io::Write,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use marker_track::{
    analyze_blob, run_tracking, spawn_stream_reader, BgrFrame, FrameServer, RunOptions,
    SlotFrameSource, StreamFrameSource, TrackerConfig, TrackingReport,
};
use marker_track::stereo::{encode_f32_bgr, render_stereo};
use nalgebra::{Point3, Vector3};

/// Stereo tracking of a three-marker instrument.
#[derive(Debug, Parser)]
#[command(author, version, about = "Stereo marker tracking pipeline")]
struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log as JSON lines (requires the `tracing` feature).
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect to a frame stream and track every frame.
    Track {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print one JSON report per frame instead of a summary line.
        #[arg(long)]
        json: bool,
        /// Read the stream on a background thread and always track the newest frame.
        #[arg(long)]
        threaded: bool,
        /// Stop after this many frames.
        #[arg(long)]
        frames: Option<u64>,
    },
    /// Serve synthetic stereo frames of the instrument (virtual camera).
    Serve {
        #[arg(long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        pose: PoseArgs,
        /// Frames per second; defaults to the configured rate.
        #[arg(long)]
        fps: Option<f64>,
        /// Stop after publishing this many frames.
        #[arg(long)]
        frames: Option<u64>,
    },
    /// Run one tracking cycle on a frame file and print the JSON report.
    Analyze {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Raw f32 BGR frame blob, or an image file with the `image` feature.
        frame: PathBuf,
    },
    /// Render a synthetic frame to a file.
    Render {
        #[arg(long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        pose: PoseArgs,
        /// Output path; `.raw` writes the wire blob, other extensions need the
        /// `image` feature.
        #[arg(long)]
        out: PathBuf,
    },
    /// Write the default configuration as JSON.
    InitConfig {
        #[arg(long)]
        out: PathBuf,
    },
}

/// Instrument pose in world coordinates.
#[derive(Debug, Args)]
struct PoseArgs {
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    x: f64,
    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    y: f64,
    #[arg(long, default_value_t = -0.2, allow_hyphen_values = true)]
    z: f64,
    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    dir_x: f64,
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    dir_y: f64,
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    dir_z: f64,
}

impl PoseArgs {
    fn position(&self) -> Point3<f64> {
        Point3::new(self.x, self.y, self.z)
    }

    fn direction(&self) -> Vector3<f64> {
        Vector3::new(self.dir_x, self.dir_y, self.dir_z)
    }
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    match cli.command {
        Command::Track {
            config,
            json,
            threaded,
            frames,
        } => track(&load_config(config.as_deref())?, json, threaded, frames),
        Command::Serve {
            config,
            pose,
            fps,
            frames,
        } => serve(&load_config(config.as_deref())?, &pose, fps, frames),
        Command::Analyze { config, frame } => {
            let report = analyze(&load_config(config.as_deref())?, &frame)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Render { config, pose, out } => {
            let cfg = load_config(config.as_deref())?;
            write_frame(&render(&cfg, &pose)?, &out)
        }
        Command::InitConfig { out } => Ok(TrackerConfig::default().write_json(out)?),
    }
}

fn init_logging(verbose: u8, json: bool) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    #[cfg(feature = "tracing")]
    marker_track::init_tracing(&level.to_string().to_lowercase(), json);
    #[cfg(not(feature = "tracing"))]
    {
        if json {
            eprintln!("--log-json needs the `tracing` feature, using plain logs");
        }
        let level = marker_track::core::level_from_env(level);
        if let Err(e) = marker_track::core::init_with_level(level) {
            eprintln!("logger not installed: {e}");
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<TrackerConfig, Box<dyn Error>> {
    Ok(match path {
        Some(path) => TrackerConfig::load_json(path)?,
        None => TrackerConfig::default(),
    })
}

fn track(
    cfg: &TrackerConfig,
    json: bool,
    threaded: bool,
    frames: Option<u64>,
) -> Result<(), Box<dyn Error>> {
    let tracker = cfg.build_tracker()?;
    let (w, h) = tracker.rig().frame_size();
    let options = RunOptions {
        retry_interval: cfg.stream.retry_interval(),
        max_frames: frames,
    };
    let mut stdout = std::io::stdout().lock();
    let mut print = |report: &TrackingReport| {
        let line = if json {
            serde_json::to_string(report).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
        } else {
            match report.outcome() {
                Ok(pose) => format!(
                    "position {:.4} {:.4} {:.4} direction {:.4} {:.4} {:.4}",
                    pose.position.x,
                    pose.position.y,
                    pose.position.z,
                    pose.direction.x,
                    pose.direction.y,
                    pose.direction.z
                ),
                Err(reason) => format!("not detected: {reason}"),
            }
        };
        let _ = writeln!(stdout, "{line}");
    };

    let source = StreamFrameSource::new(cfg.stream.address.clone(), w as usize, h as usize);
    let summary = if threaded {
        let (reader, slot) = spawn_stream_reader(source, cfg.stream.retry_interval())?;
        let mut slot_source =
            SlotFrameSource::new(slot, w as usize, h as usize, cfg.stream.retry_interval());
        let result = run_tracking(&mut slot_source, &tracker, &options, &mut print);
        drop(slot_source);
        let stopped = reader.stop();
        let summary = result?;
        stopped?;
        summary
    } else {
        let mut source = source;
        run_tracking(&mut source, &tracker, &options, &mut print)?
    };
    log::info!(
        "tracked {} frames, pose found in {}",
        summary.frames,
        summary.detected
    );
    Ok(())
}

fn render(cfg: &TrackerConfig, pose: &PoseArgs) -> Result<BgrFrame, Box<dyn Error>> {
    let rig = cfg.build_rig()?;
    let markers = cfg
        .synthetic
        .constellation
        .markers(&pose.position(), &pose.direction())
        .ok_or("instrument direction must be non-zero")?;
    Ok(render_stereo(&rig, &markers, cfg.synthetic.marker_radius_px))
}

fn serve(
    cfg: &TrackerConfig,
    pose: &PoseArgs,
    fps: Option<f64>,
    frames: Option<u64>,
) -> Result<(), Box<dyn Error>> {
    let fps = fps.unwrap_or(cfg.synthetic.fps);
    if !(fps.is_finite() && fps > 0.0) {
        return Err(format!("fps must be positive, got {fps}").into());
    }
    let blob = encode_f32_bgr(&render(cfg, pose)?);
    let server = FrameServer::bind(&cfg.stream.address)?;
    println!("listening on {}", server.local_addr());

    let period = Duration::from_secs_f64(1.0 / fps);
    let mut sent = 0u64;
    while frames.is_none_or(|max| sent < max) {
        let started = Instant::now();
        server.publish(blob.clone());
        sent += 1;
        thread::sleep(period.saturating_sub(started.elapsed()));
    }
    Ok(())
}

fn is_raw(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("raw"))
}

fn analyze(cfg: &TrackerConfig, path: &Path) -> Result<TrackingReport, Box<dyn Error>> {
    let tracker = cfg.build_tracker()?;
    if is_raw(path) {
        return Ok(analyze_blob(&tracker, &fs::read(path)?)?);
    }
    Ok(tracker.track(&load_image_frame(path)?)?)
}

fn write_frame(frame: &BgrFrame, path: &Path) -> Result<(), Box<dyn Error>> {
    if is_raw(path) {
        fs::write(path, encode_f32_bgr(frame))?;
        return Ok(());
    }
    save_image_frame(frame, path)
}

#[cfg(feature = "image")]
fn load_image_frame(path: &Path) -> Result<BgrFrame, Box<dyn Error>> {
    Ok(marker_track::image_io::load_frame(path)?)
}

#[cfg(feature = "image")]
fn save_image_frame(frame: &BgrFrame, path: &Path) -> Result<(), Box<dyn Error>> {
    Ok(marker_track::image_io::save_frame(frame, path)?)
}

#[cfg(not(feature = "image"))]
fn load_image_frame(path: &Path) -> Result<BgrFrame, Box<dyn Error>> {
    Err(needs_image_feature(path))
}

#[cfg(not(feature = "image"))]
fn save_image_frame(_frame: &BgrFrame, path: &Path) -> Result<(), Box<dyn Error>> {
    Err(needs_image_feature(path))
}

#[cfg(not(feature = "image"))]
fn needs_image_feature(path: &Path) -> Box<dyn Error> {
    format!(
        "{} is not a .raw frame; image files need the `image` feature",
        path.display()
    )
    .into()
}
