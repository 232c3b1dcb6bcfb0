use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use agelens_core::detection::infrastructure::onnx_yolo_detector::DEFAULT_CONFIDENCE;
use agelens_core::pipeline::capture_faces_use_case::CaptureConfig;
use agelens_core::prediction_log::domain::active_window::ActiveWindow;
use agelens_core::reporting::report_renderer::ReportOptions;
use agelens_core::shared::constants::{DEBOUNCE_SECONDS, MIN_FACE_SIZE};
use agelens_core::shared::model_resolver::ModelSource;

/// Where to find one model: a local file, a download URL, or neither (then
/// only the cache and bundled directory are searched).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub path: Option<PathBuf>,
    pub url: Option<String>,
}

impl ModelSettings {
    pub fn source(&self, name: &str, default_url: Option<&str>) -> ModelSource {
        ModelSource {
            path: self.path.clone(),
            url: self.url.clone().or(default_url.map(str::to_string)),
            bundled_dir: bundled_models_dir(),
            ..ModelSource::named(name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Camera name as understood by the input device format.
    pub device: String,
    /// ffmpeg input device format; platform default when unset.
    pub device_format: Option<String>,
    /// Extra device options such as `framerate` or `video_size`.
    pub device_options: BTreeMap<String, String>,
    pub log_dir: PathBuf,
    pub recordings_dir: PathBuf,
    pub window: ActiveWindow,
    pub debounce_seconds: f64,
    pub min_face_size: u32,
    pub confidence: f64,
    pub max_read_retries: u32,
    pub detector_model: ModelSettings,
    pub age_model: ModelSettings,
    pub gender_model: ModelSettings,
    /// TrueType font for the age and gender labels; boxes only when unset.
    pub font: Option<PathBuf>,
    /// Image file kept updated with the latest annotated frame.
    pub live_view: Option<PathBuf>,
    pub live_view_every: usize,
    pub report: ReportOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: default_device().to_string(),
            device_format: None,
            device_options: BTreeMap::new(),
            log_dir: PathBuf::from("."),
            recordings_dir: PathBuf::from("."),
            window: ActiveWindow::default(),
            debounce_seconds: DEBOUNCE_SECONDS,
            min_face_size: MIN_FACE_SIZE,
            confidence: DEFAULT_CONFIDENCE,
            max_read_retries: CaptureConfig::default().max_read_retries,
            detector_model: ModelSettings::default(),
            age_model: ModelSettings::default(),
            gender_model: ModelSettings::default(),
            font: None,
            live_view: None,
            live_view_every: 5,
            report: ReportOptions::default(),
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("AgeLens").join("settings.json"))
    }

    /// Loads settings from `path`, falling back to defaults when the file
    /// does not exist. A file that exists but does not parse is an error.
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !path.exists() {
            log::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&json)
            .map_err(|e| format!("invalid settings file {}: {e}", path.display()))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            debounce_seconds: self.debounce_seconds,
            min_face_size: self.min_face_size,
            max_read_retries: self.max_read_retries,
            ..CaptureConfig::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "Confidence must be between 0.0 and 1.0, got {}",
                self.confidence
            ));
        }
        if !self.debounce_seconds.is_finite() || self.debounce_seconds < 0.0 {
            return Err(format!(
                "Debounce must be a non-negative number of seconds, got {}",
                self.debounce_seconds
            ));
        }
        if self.min_face_size == 0 {
            return Err("Minimum face size must be at least 1 pixel".to_string());
        }
        if self.window.start >= self.window.end {
            return Err(format!(
                "Active window start {} must be before end {}",
                self.window.start, self.window.end
            ));
        }
        if self.device.trim().is_empty() {
            return Err("Capture device must not be empty".to_string());
        }
        Ok(())
    }
}

fn default_device() -> &'static str {
    if cfg!(target_os = "macos") {
        "0"
    } else if cfg!(target_os = "windows") {
        "video=Integrated Camera"
    } else {
        "/dev/video0"
    }
}

/// `models/` next to the executable, for packaged installs.
fn bundled_models_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")))
}
