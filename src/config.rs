use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Which detectors the engine registers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorToggles {
    pub lobby: bool,
    pub timer: bool,
    pub beginning: bool,
    pub go_sign: bool,
    pub objective: bool,
    pub team_colors: bool,
    pub finish: bool,
    /// Off unless a paint counter model has been trained
    pub paint_tracker: bool,
}

impl Default for DetectorToggles {
    fn default() -> Self {
        Self {
            lobby: true,
            timer: true,
            beginning: true,
            go_sign: true,
            objective: true,
            team_colors: true,
            finish: true,
            paint_tracker: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the reference masks, relative to the config file
    pub mask_root: String,

    /// Language subdirectories searched first, in order
    pub languages: Vec<String>,

    /// Language used as the last resort
    pub default_language: String,

    /// Trained timer glyph model, relative to the config file
    pub timer_model_path: String,

    /// Trained paint counter glyph model, relative to the config file
    pub paint_model_path: String,

    /// Logical stream time between two frames
    pub frame_interval_ms: u64,

    /// Let detectors draw on a debug canvas
    pub preview: bool,

    /// Number of frames to replay in benchmark mode
    pub bench_frames: usize,

    pub detectors: DetectorToggles,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mask_root: "masks".to_string(),
            languages: vec!["ja".to_string()],
            default_language: "ja".to_string(),
            timer_model_path: "models/timer.model.json".to_string(),
            paint_model_path: "models/paint.model.json".to_string(),
            frame_interval_ms: 100, // 10 fps replay
            preview: false,
            bench_frames: 500,
            detectors: DetectorToggles::default(),
        }
    }
}

impl Config {
    /// Load configuration from `<exe dir>/config/config.json`.
    /// Creates default config if file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing the defaults there first if
    /// the file is missing
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            tracing::info!("Created default config at: {}", path.display());
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|e| ConfigError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        config.validate()?;

        tracing::info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Save configuration to its default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::DirectoryCreationFailed {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        fs::write(path, json).map_err(|e| ConfigError::SaveFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::Invalid("frame_interval_ms must be positive".to_string()));
        }
        if self.languages.is_empty() {
            return Err(ConfigError::Invalid("languages must not be empty".to_string()));
        }
        if self.detectors.objective && !self.detectors.lobby {
            return Err(ConfigError::Invalid(
                "the objective tracker needs the lobby detector".to_string(),
            ));
        }
        if self.detectors.paint_tracker && !self.detectors.timer {
            return Err(ConfigError::Invalid(
                "the paint tracker needs the timer detector".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the config file path (in app's base directory)
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let not_found = |e: Box<dyn std::error::Error + Send + Sync>| ConfigError::LoadFailed {
            path: "<exe dir>/config/config.json".to_string(),
            source: e,
        };
        let exe_path = env::current_exe().map_err(|e| not_found(Box::new(e)))?;
        let exe_dir = exe_path
            .parent()
            .ok_or_else(|| not_found("Could not determine executable directory".into()))?;

        Ok(exe_dir.join("config").join("config.json"))
    }

    /// Mask directory, resolved against the config file's directory
    pub fn mask_root_in(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.mask_root)
    }

    /// Timer model, resolved against the config file's directory
    pub fn timer_model_in(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.timer_model_path)
    }

    pub fn paint_model_in(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.paint_model_path)
    }
}
