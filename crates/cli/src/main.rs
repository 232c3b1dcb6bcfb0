mod settings;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveTime};
use clap::{Args, Parser, Subcommand, ValueEnum};

use agelens_core::annotation::frame_annotator::FrameAnnotator;
use agelens_core::classification::domain::demographics::{AGE_BUCKET_COUNT, GENDER_COUNT};
use agelens_core::classification::infrastructure::onnx_face_classifier::OnnxFaceClassifier;
use agelens_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use agelens_core::pipeline::capture_faces_use_case::CaptureFacesUseCase;
use agelens_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use agelens_core::prediction_log::domain::active_window::ActiveWindow;
use agelens_core::prediction_log::infrastructure::csv_log_store::{self, CsvLogStore};
use agelens_core::reporting::prediction_summary::{self, PredictionSummary};
use agelens_core::reporting::report_renderer::{render_json, render_text, ReportOptions};
use agelens_core::shared::clock::{Clock, SystemClock};
use agelens_core::shared::constants::{
    AGE_MODEL_NAME, GENDER_MODEL_NAME, OUTPUT_FPS, OUTPUT_HEIGHT, OUTPUT_WIDTH, YOLO_MODEL_NAME,
    YOLO_MODEL_URL,
};
use agelens_core::shared::model_resolver::{self, ModelSource};
use agelens_core::video::infrastructure::ffmpeg_capture_source::{CaptureInput, FfmpegCaptureSource};
use agelens_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use agelens_core::video::infrastructure::image_file_writer::ImageFileWriter;
use agelens_core::video::infrastructure::snapshot_live_view::SnapshotLiveView;

use settings::Settings;

/// Webcam age and gender capture with daily prediction logs.
#[derive(Parser)]
#[command(name = "agelens")]
struct Cli {
    /// Settings file (defaults to the user config directory).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture from a camera, classify faces and log predictions.
    Capture(CaptureArgs),
    /// Summarize prediction logs.
    Report(ReportArgs),
}

#[derive(Args)]
struct CaptureArgs {
    /// Camera device, e.g. /dev/video0.
    #[arg(long)]
    device: Option<String>,

    /// ffmpeg input device format (v4l2, avfoundation, dshow).
    #[arg(long)]
    device_format: Option<String>,

    /// Read from a video file instead of a camera.
    #[arg(long, conflicts_with = "device")]
    input: Option<PathBuf>,

    /// Directory for the daily prediction logs.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Recording of the annotated stream (default: timestamped file in the
    /// recordings directory).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Image file to keep updated with the latest annotated frame.
    #[arg(long)]
    live_view: Option<PathBuf>,

    /// Seconds a face must stay in view before it is logged.
    #[arg(long)]
    debounce: Option<f64>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Start of the daily logging window (HH:MM).
    #[arg(long, value_parser = parse_time)]
    window_start: Option<NaiveTime>,

    /// End of the daily logging window (HH:MM).
    #[arg(long, value_parser = parse_time)]
    window_end: Option<NaiveTime>,

    #[arg(long)]
    detector_model: Option<PathBuf>,

    #[arg(long)]
    age_model: Option<PathBuf>,

    #[arg(long)]
    gender_model: Option<PathBuf>,

    /// TrueType font for on-frame labels.
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Args)]
struct ReportArgs {
    /// Log files to summarize (default: the active day's log).
    files: Vec<PathBuf>,

    /// Summarize every log in the log directory.
    #[arg(long, conflicts_with = "files")]
    all: bool,

    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Number of most recent predictions to list.
    #[arg(long)]
    recent: Option<usize>,

    /// Sections to include (comma-separated).
    #[arg(long, value_enum, value_delimiter = ',')]
    sections: Option<Vec<Section>>,

    #[arg(long)]
    json: bool,

    /// Re-render every N seconds until interrupted.
    #[arg(long)]
    watch: Option<u64>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Section {
    Stats,
    Ages,
    Genders,
    Crosstab,
    Recent,
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

    let settings_path = cli
        .settings
        .clone()
        .or_else(Settings::config_path)
        .ok_or("Could not determine config directory")?;
    let settings = Settings::load_from(&settings_path)?;

    match cli.command {
        Command::Capture(args) => run_capture(args, settings),
        Command::Report(args) => run_report(args, settings),
    }
}

fn run_capture(args: CaptureArgs, mut settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    apply_capture_args(&args, &mut settings);
    settings.validate()?;

    let detector_path = resolve_model(
        &settings
            .detector_model
            .source(YOLO_MODEL_NAME, Some(YOLO_MODEL_URL)),
    )?;
    let age_path = resolve_model(&settings.age_model.source(AGE_MODEL_NAME, None))?;
    let gender_path = resolve_model(&settings.gender_model.source(GENDER_MODEL_NAME, None))?;

    let detector = OnnxYoloDetector::new(&detector_path, settings.confidence)?;
    let age_classifier = OnnxFaceClassifier::<AGE_BUCKET_COUNT>::new(&age_path)?;
    let gender_classifier = OnnxFaceClassifier::<GENDER_COUNT>::new(&gender_path)?;

    let mut config = settings.capture_config();
    config.crop_size = age_classifier.input_size();
    if gender_classifier.input_size() != config.crop_size {
        return Err(format!(
            "Age and gender models expect different input sizes ({} vs {})",
            config.crop_size,
            gender_classifier.input_size()
        )
        .into());
    }

    let input = match &args.input {
        Some(path) => CaptureInput::File(path.clone()),
        None => CaptureInput::Device {
            name: settings.device.clone(),
            format: settings.device_format.clone(),
        },
    };
    let source = FfmpegCaptureSource::new(input, OUTPUT_WIDTH, OUTPUT_HEIGHT, OUTPUT_FPS)
        .with_options(settings.device_options.clone().into_iter().collect());

    let store = CsvLogStore::new(&settings.log_dir, settings.window);
    let recording = match &args.output {
        Some(path) => path.clone(),
        None => {
            std::fs::create_dir_all(&settings.recordings_dir)?;
            settings.recordings_dir.join(format!(
                "session_{}.mp4",
                SystemClock.now().format("%Y%m%d_%H%M%S")
            ))
        }
    };

    let annotator = match &settings.font {
        Some(font) => FrameAnnotator::from_font_file(font)?,
        None => FrameAnnotator::new(),
    };
    if !annotator.draws_labels() {
        log::info!("No font configured, annotating boxes only");
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(cancelled.clone())?;

    let mut use_case = CaptureFacesUseCase::new(
        Box::new(source),
        Box::new(detector),
        Box::new(age_classifier),
        Box::new(gender_classifier),
        Box::new(store),
        Box::new(FfmpegWriter::new()),
        Box::new(SystemClock),
        Box::new(StdoutPipelineLogger::new(100)),
    )
    .with_config(config)
    .with_annotator(annotator)
    .with_cancellation(cancelled);

    if let Some(path) = &settings.live_view {
        use_case = use_case.with_live_view(Box::new(SnapshotLiveView::new(
            path.clone(),
            Box::new(ImageFileWriter::new()),
            settings.live_view_every,
        )));
    }

    log::info!(
        "Logging predictions to {} (active {} to {})",
        settings.log_dir.display(),
        settings.window.start,
        settings.window.end
    );
    let report = use_case.execute(&recording)?;

    eprintln!(
        "Captured {} frames, logged {} predictions ({} faces too small, {} classification failures, {} log failures)",
        report.frames,
        report.records_written,
        report.faces_skipped,
        report.classification_failures,
        report.log_failures
    );
    log::info!("Recording written to {}", recording.display());
    Ok(())
}

fn apply_capture_args(args: &CaptureArgs, settings: &mut Settings) {
    if let Some(device) = &args.device {
        settings.device = device.clone();
    }
    if let Some(format) = &args.device_format {
        settings.device_format = Some(format.clone());
    }
    if let Some(dir) = &args.log_dir {
        settings.log_dir = dir.clone();
    }
    if let Some(path) = &args.live_view {
        settings.live_view = Some(path.clone());
    }
    if let Some(debounce) = args.debounce {
        settings.debounce_seconds = debounce;
    }
    if let Some(confidence) = args.confidence {
        settings.confidence = confidence;
    }
    if let Some(start) = args.window_start {
        settings.window.start = start;
    }
    if let Some(end) = args.window_end {
        settings.window.end = end;
    }
    if let Some(path) = &args.detector_model {
        settings.detector_model.path = Some(path.clone());
    }
    if let Some(path) = &args.age_model {
        settings.age_model.path = Some(path.clone());
    }
    if let Some(path) = &args.gender_model {
        settings.gender_model.path = Some(path.clone());
    }
    if let Some(path) = &args.font {
        settings.font = Some(path.clone());
    }
}

fn run_report(args: ReportArgs, settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = args.log_dir.clone().unwrap_or(settings.log_dir.clone());
    let options = report_options(&args, settings.report);

    let cancelled = Arc::new(AtomicBool::new(false));
    if args.watch.is_some() {
        install_interrupt_handler(cancelled.clone())?;
    }

    loop {
        let files = if !args.files.is_empty() {
            args.files.clone()
        } else if args.all {
            prediction_summary::log_files_in(&log_dir)?
        } else {
            vec![active_log_file(&log_dir, &settings.window)]
        };

        let existing: Vec<PathBuf> = files.into_iter().filter(|p| p.exists()).collect();
        if existing.is_empty() && args.watch.is_none() {
            return Err(format!("No prediction logs found in {}", log_dir.display()).into());
        }

        let summary = PredictionSummary::load(&existing, options.recent_rows)?;
        let rendered = if args.json {
            render_json(&summary, &options)?
        } else {
            render_text(&summary, &options)
        };

        let Some(interval) = args.watch else {
            println!("{rendered}");
            return Ok(());
        };

        print!("\x1b[2J\x1b[H");
        println!("{rendered}");
        if sleep_unless_cancelled(Duration::from_secs(interval.max(1)), &cancelled) {
            return Ok(());
        }
    }
}

fn report_options(args: &ReportArgs, mut options: ReportOptions) -> ReportOptions {
    if let Some(recent) = args.recent {
        options.recent_rows = recent;
    }
    if let Some(sections) = &args.sections {
        let has = |s| sections.contains(&s);
        options.sections.stats = has(Section::Stats);
        options.sections.age_chart = has(Section::Ages);
        options.sections.gender_chart = has(Section::Genders);
        options.sections.crosstab = has(Section::Crosstab);
        options.sections.recent = has(Section::Recent);
    }
    options
}

/// The file today's captures are appended to.
fn active_log_file(dir: &Path, window: &ActiveWindow) -> PathBuf {
    let date = window.segment_date(Local::now().naive_local());
    dir.join(csv_log_store::file_name(date))
}

fn resolve_model(source: &ModelSource) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {}", source.name);
    let name = source.name.clone();
    let path = model_resolver::resolve(
        source,
        Some(Box::new(move |downloaded, total| {
            download_progress(&name, downloaded, total)
        })),
    )?;
    Ok(path)
}

fn install_interrupt_handler(flag: Arc<AtomicBool>) -> Result<(), Box<dyn std::error::Error>> {
    ctrlc::set_handler(move || {
        log::info!("Interrupt received, stopping");
        flag.store(true, Ordering::Relaxed);
    })?;
    Ok(())
}

/// Returns `true` if the flag was set while sleeping.
fn sleep_unless_cancelled(total: Duration, cancelled: &AtomicBool) -> bool {
    let step = Duration::from_millis(100);
    let mut slept = Duration::ZERO;
    while slept < total {
        if cancelled.load(Ordering::Relaxed) {
            return true;
        }
        std::thread::sleep(step);
        slept += step;
    }
    cancelled.load(Ordering::Relaxed)
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| format!("expected HH:MM, got '{s}'"))
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
}
