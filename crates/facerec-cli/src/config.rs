use anyhow::{Context, Result};
use facerec_core::{
    CosineMatcher, DistanceMatcher, Matcher, DEFAULT_MAX_CAPTURE_FAILURES, DEFAULT_SAMPLE_COUNT,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which match decision to apply between encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMetric {
    Cosine,
    Euclidean,
}

impl FromStr for MatchMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            other => Err(format!("unknown match metric: {other}")),
        }
    }
}

/// CLI configuration: optional TOML file, overridden by `FACEREC_*` variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    pub match_metric: MatchMetric,
    /// Cosine similarity needed for a match when `match_metric = "cosine"`.
    pub similarity_threshold: f32,
    /// Maximum Euclidean distance when `match_metric = "euclidean"`.
    pub distance_tolerance: f32,
    /// Frames captured per enrollment burst.
    pub frames_per_enroll: usize,
    /// Frames discarded after opening the camera.
    pub warmup_frames: usize,
    /// Recognition tick period.
    pub tick_interval_ms: u64,
    /// Failed camera reads in a row before recognition gives up.
    pub max_capture_failures: u32,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            camera_device: "/dev/video0".to_string(),
            model_dir: data_dir.join("models"),
            db_path: data_dir.join("face_recognition.db"),
            match_metric: MatchMetric::Cosine,
            similarity_threshold: facerec_core::matcher::DEFAULT_SIMILARITY_THRESHOLD,
            distance_tolerance: facerec_core::matcher::DEFAULT_DISTANCE_TOLERANCE,
            frames_per_enroll: DEFAULT_SAMPLE_COUNT,
            warmup_frames: 4,
            tick_interval_ms: 20,
            max_capture_failures: DEFAULT_MAX_CAPTURE_FAILURES,
        }
    }
}

impl Config {
    /// Load from `FACEREC_CONFIG` (if set) and then the environment.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os("FACEREC_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Override fields from `FACEREC_*` variables; unparsable values are ignored.
    pub fn apply_env<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("FACEREC_CAMERA_DEVICE") {
            self.camera_device = v;
        }
        if let Some(v) = get("FACEREC_MODEL_DIR") {
            self.model_dir = PathBuf::from(v);
        }
        if let Some(v) = get("FACEREC_DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        override_parsed(&get, "FACEREC_MATCH_METRIC", &mut self.match_metric);
        override_parsed(&get, "FACEREC_SIMILARITY_THRESHOLD", &mut self.similarity_threshold);
        override_parsed(&get, "FACEREC_DISTANCE_TOLERANCE", &mut self.distance_tolerance);
        override_parsed(&get, "FACEREC_FRAMES_PER_ENROLL", &mut self.frames_per_enroll);
        override_parsed(&get, "FACEREC_WARMUP_FRAMES", &mut self.warmup_frames);
        override_parsed(&get, "FACEREC_TICK_INTERVAL_MS", &mut self.tick_interval_ms);
        override_parsed(&get, "FACEREC_MAX_CAPTURE_FAILURES", &mut self.max_capture_failures);
    }

    pub fn matcher(&self) -> Box<dyn Matcher> {
        match self.match_metric {
            MatchMetric::Cosine => Box::new(CosineMatcher { threshold: self.similarity_threshold }),
            MatchMetric::Euclidean => Box::new(DistanceMatcher { tolerance: self.distance_tolerance }),
        }
    }
}

fn override_parsed<F, T>(get: &F, key: &str, slot: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = get(key) {
        match raw.parse() {
            Ok(v) => *slot = v,
            Err(_) => tracing::warn!(key, value = %raw, "ignoring unparsable config value"),
        }
    }
}

fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facerec")
}
