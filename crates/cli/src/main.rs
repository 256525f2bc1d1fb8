use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;

use clap::Parser;
use crossbeam_channel::{select, Receiver};

use safe_distance_core::alert::domain::alert_snapshot::AlertSnapshot;
use safe_distance_core::alert::infrastructure::warning_sound_factory::open_warning_sound;
use safe_distance_core::capture::domain::frame_source::FrameSource;
use safe_distance_core::capture::infrastructure::ffmpeg_capture_source::FfmpegCaptureSource;
use safe_distance_core::capture::infrastructure::image_sequence_source::ImageSequenceSource;
use safe_distance_core::detection::domain::face_detector::FaceDetector;
use safe_distance_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use safe_distance_core::detection::infrastructure::replay_face_detector::ReplayFaceDetector;
use safe_distance_core::pipeline::face_policy::FacePolicy;
use safe_distance_core::pipeline::proximity_session::{ProximitySession, SessionComponents};
use safe_distance_core::pipeline::session_config::SessionConfig;
use safe_distance_core::pipeline::session_event::SessionEvent;
use safe_distance_core::pipeline::session_logger::StatsSessionLogger;
use safe_distance_core::proximity::domain::alert_direction::AlertDirection;
use safe_distance_core::proximity::domain::metric_strategy::MetricKind;
use safe_distance_core::shared::constants::{
    DEFAULT_WARNING_SOUND, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use safe_distance_core::shared::model_resolver;

const THRESHOLD_STEP: f64 = 0.01;
/// Slowest paced image playback accepted: one frame every 100 seconds.
const MIN_FPS: f64 = 0.01;

/// Warns when a viewer sits too close to the camera.
///
/// While running, type `+` or `-` to nudge the threshold, `t <value>` to
/// set it, and `q` to quit.
#[derive(Parser)]
#[command(name = "safe-distance")]
struct Cli {
    /// Camera device, video file, or directory of images.
    source: String,

    /// Capture input format for camera devices (v4l2, avfoundation, dshow).
    #[arg(long)]
    input_format: Option<String>,

    /// Demuxer option for the capture device, e.g. `framerate=30` or
    /// `video_size=1280x720`. Repeatable.
    #[arg(long = "device-option", value_name = "KEY=VALUE", value_parser = parse_device_option)]
    device_options: Vec<(String, String)>,

    /// Playback rate for image directories (0 = as fast as frames decode).
    #[arg(long, default_value = "30")]
    fps: f64,

    /// Replay recorded face observations (JSON) instead of running the model.
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Local face model; skips the download.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value = "0.5")]
    confidence: f64,

    /// JSON session config; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Closeness metric: area or landmark.
    #[arg(long)]
    metric: Option<MetricKind>,

    /// Proximity threshold (clamped to 0.01-0.5).
    #[arg(long)]
    threshold: Option<f64>,

    /// Frames skipped between two detections.
    #[arg(long)]
    frame_interval: Option<usize>,

    /// Which side of the threshold is too close: below or above.
    #[arg(long)]
    direction: Option<AlertDirection>,

    /// Multi-face policy: any-too-close or last-wins.
    #[arg(long)]
    face_policy: Option<FacePolicy>,

    /// Warning sound file [default: ./warning_audio.mp3 if present].
    #[arg(long)]
    sound: Option<PathBuf>,

    /// Warning volume (0.0-1.0).
    #[arg(long)]
    volume: Option<f32>,

    /// Process every frame instead of dropping frames while the detector is busy.
    #[arg(long)]
    no_drop: bool,

    /// Print states as JSON lines.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Nudge(f64),
    SetThreshold(f64),
    Quit,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = build_config(&cli)?;
    let components = SessionComponents {
        source: build_source(&cli),
        detector: build_detector(&cli)?,
        sound: open_warning_sound(warning_sound_path(&cli).as_deref()),
        logger: Box::new(StatsSessionLogger::new()),
    };

    let (mut session, events) = ProximitySession::new(&config, components);
    session.start()?;
    eprintln!(
        "Monitoring with the {} metric, threshold {:.2}. Commands: + - t <value> q",
        config.metric,
        session.threshold()
    );

    let commands = spawn_command_reader();
    let stdin_gone = crossbeam_channel::never();
    let mut stdin_open = true;
    loop {
        let pending = if stdin_open { &commands } else { &stdin_gone };
        select! {
            recv(events) -> event => match event {
                Ok(SessionEvent::State(snapshot)) => print_state(&snapshot, cli.json)?,
                Ok(SessionEvent::Error(message)) => log::error!("{message}"),
                Ok(SessionEvent::SourceEnded) => {
                    log::info!("Source ended");
                    break;
                }
                Ok(SessionEvent::Stopped) | Err(_) => break,
            },
            recv(pending) -> command => match command {
                Ok(Command::Nudge(step)) => {
                    let stored = session.set_threshold(session.threshold() + step);
                    eprintln!("Threshold: {stored:.2}");
                }
                Ok(Command::SetThreshold(value)) => {
                    let stored = session.set_threshold(value);
                    eprintln!("Threshold: {stored:.2}");
                }
                Ok(Command::Quit) => break,
                // stdin closed: keep monitoring until the source ends
                Err(_) => stdin_open = false,
            },
        }
    }

    session.stop()?;
    Ok(())
}

fn build_config(cli: &Cli) -> Result<SessionConfig, Box<dyn std::error::Error>> {
    let mut config = match (&cli.config, cli.metric) {
        (Some(path), _) => SessionConfig::load(path)?,
        (None, Some(MetricKind::Landmark)) => SessionConfig::landmark(),
        (None, _) => SessionConfig::area(),
    };

    if let Some(metric) = cli.metric {
        if metric != config.metric {
            config.metric = metric;
            // The other metric's threshold means nothing for this one.
            config.threshold = None;
        }
    }
    if let Some(threshold) = cli.threshold {
        config.threshold = Some(threshold);
    }
    if let Some(interval) = cli.frame_interval {
        config.frame_interval = interval;
    }
    if let Some(direction) = cli.direction {
        config.direction = direction;
    }
    if let Some(policy) = cli.face_policy {
        config.face_policy = policy;
    }
    if let Some(volume) = cli.volume {
        config.warning_volume = volume;
    }
    // Recorded sources have no real-time pace to keep up with.
    let recorded = Path::new(&cli.source).exists() && cli.input_format.is_none();
    config.block_when_busy |= cli.no_drop || recorded;

    config.validate()?;
    Ok(config)
}

fn build_source(cli: &Cli) -> Box<dyn FrameSource> {
    let path = Path::new(&cli.source);
    if path.is_dir() {
        Box::new(ImageSequenceSource::new(path).with_fps(cli.fps))
    } else {
        let source = cli.device_options.iter().fold(
            FfmpegCaptureSource::new(cli.source.clone(), cli.input_format.clone()),
            |source, (key, value)| source.with_option(key.as_str(), value.as_str()),
        );
        Box::new(source)
    }
}

fn parse_device_option(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("Expected KEY=VALUE, got '{raw}'")),
    }
}

fn build_detector(cli: &Cli) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    if let Some(path) = &cli.replay {
        let detector = ReplayFaceDetector::from_path(path)?;
        log::info!(
            "Replaying {} recorded frames from {}",
            detector.recorded_frames(),
            path.display()
        );
        return Ok(Box::new(detector));
    }

    let model_path = match &cli.model {
        Some(path) => path.clone(),
        None => {
            log::info!("Resolving model: {YOLO_MODEL_NAME}");
            let path = model_resolver::resolve(
                YOLO_MODEL_NAME,
                YOLO_MODEL_URL,
                Some(Box::new(download_progress)),
            )?;
            eprintln!();
            path
        }
    };
    Ok(Box::new(OnnxYoloDetector::new(&model_path, cli.confidence)?))
}

fn warning_sound_path(cli: &Cli) -> Option<PathBuf> {
    cli.sound.clone().or_else(|| {
        let fallback = PathBuf::from(DEFAULT_WARNING_SOUND);
        fallback.exists().then_some(fallback)
    })
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if cli.fps.is_nan() || cli.fps < 0.0 || (cli.fps > 0.0 && cli.fps < MIN_FPS) {
        return Err(format!("FPS must be 0 or at least {MIN_FPS}, got {}", cli.fps).into());
    }
    if let Some(model) = &cli.model {
        if !model.exists() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if cli.replay.is_some() && cli.model.is_some() {
        return Err("--replay and --model are mutually exclusive".into());
    }
    Ok(())
}

fn spawn_command_reader() -> Receiver<Command> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Ok(Some(command)) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => eprintln!("{e}"),
            }
        }
    });
    rx
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(None);
    };
    let command = match head {
        "+" => Command::Nudge(THRESHOLD_STEP),
        "-" => Command::Nudge(-THRESHOLD_STEP),
        "q" | "quit" => Command::Quit,
        "t" => {
            let value = parts.next().ok_or("Usage: t <value>")?;
            let value: f64 = value
                .parse()
                .map_err(|_| format!("Not a number: '{value}'"))?;
            Command::SetThreshold(value)
        }
        other => return Err(format!("Unknown command '{other}' (use + - t <value> q)")),
    };
    Ok(Some(command))
}

fn print_state(snapshot: &AlertSnapshot, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
    } else {
        let marker = if snapshot.is_alerting { "TOO CLOSE" } else { "ok" };
        println!("[{marker:>9}] {}", snapshot.display_label);
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
