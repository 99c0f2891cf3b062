use anyhow::{Context, Result};
use rollcall_core::recognizer::DEFAULT_MATCH_THRESHOLD;
use rollcall_core::{LocatorParams, MatchPolicy};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Resolved settings: defaults, then the TOML file, then `ROLLCALL_*`
/// environment variables, then command-line flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Root of the face store (default: `known_faces`).
    pub faces_dir: PathBuf,
    /// Camera device index (default: 0).
    pub camera_index: i32,
    /// Haar cascade XML. `None` means auto-discover at startup.
    pub cascade_path: Option<PathBuf>,
    /// Distances below this are accepted as a match.
    pub match_threshold: f64,
    /// Detection used by live camera enrollment.
    pub enroll_detection: LocatorParams,
    /// Detection used for still images and live recognition.
    pub detection: LocatorParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            faces_dir: PathBuf::from("known_faces"),
            camera_index: 0,
            cascade_path: None,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            enroll_detection: LocatorParams::LIVE_ENROLL,
            detection: LocatorParams::STANDARD,
        }
    }
}

/// On-disk config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    faces_dir: Option<PathBuf>,
    camera_index: Option<i32>,
    cascade_path: Option<PathBuf>,
    match_threshold: Option<f64>,
    enroll_detection: Option<LocatorParams>,
    detection: Option<LocatorParams>,
}

impl Config {
    /// Load the layered configuration.
    ///
    /// An explicit `path` must exist; the default location is used only when
    /// present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => Some(read_file(path)?),
            None => match default_config_path() {
                Some(path) if path.is_file() => Some(read_file(&path)?),
                _ => None,
            },
        };

        let mut config = Self::default();
        if let Some(file) = file {
            config.apply_file(file);
        }
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply command-line overrides.
    pub fn apply_flags(&mut self, faces_dir: Option<PathBuf>, camera: Option<i32>) {
        if let Some(dir) = faces_dir {
            self.faces_dir = dir;
        }
        if let Some(index) = camera {
            self.camera_index = index;
        }
    }

    pub fn match_policy(&self) -> MatchPolicy {
        MatchPolicy {
            threshold: self.match_threshold,
        }
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(dir) = file.faces_dir {
            self.faces_dir = dir;
        }
        if let Some(index) = file.camera_index {
            self.camera_index = index;
        }
        if file.cascade_path.is_some() {
            self.cascade_path = file.cascade_path;
        }
        if let Some(threshold) = file.match_threshold {
            self.set_threshold(threshold, "match_threshold");
        }
        if let Some(params) = file.enroll_detection {
            self.enroll_detection = params;
        }
        if let Some(params) = file.detection {
            self.detection = params;
        }
    }

    /// Unparseable values keep the previous layer's setting.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = var("ROLLCALL_FACES_DIR") {
            self.faces_dir = PathBuf::from(dir);
        }
        if let Some(path) = var("ROLLCALL_CASCADE_PATH") {
            self.cascade_path = Some(PathBuf::from(path));
        }
        self.camera_index = env_parse(&var, "ROLLCALL_CAMERA_INDEX", self.camera_index);
        let threshold = env_parse(&var, "ROLLCALL_MATCH_THRESHOLD", self.match_threshold);
        self.set_threshold(threshold, "ROLLCALL_MATCH_THRESHOLD");
    }

    /// Thresholds must be finite and positive; anything else keeps the
    /// current value.
    fn set_threshold(&mut self, threshold: f64, source: &str) {
        if threshold.is_finite() && threshold > 0.0 {
            self.match_threshold = threshold;
        } else {
            tracing::warn!(source, threshold, "ignoring invalid match threshold");
        }
    }
}

fn read_file(path: &Path) -> Result<FileConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let file = toml::from_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(file)
}

/// `$XDG_CONFIG_HOME/rollcall/config.toml`, falling back to `~/.config`.
fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|home| PathBuf::from(home).join(".config")))
        .ok()?;
    Some(base.join("rollcall").join("config.toml"))
}

fn env_parse<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    current: T,
) -> T {
    match var(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment value");
            current
        }),
        None => current,
    }
}
