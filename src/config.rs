use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::evaluator::TypingPolicy;
use crate::session::TypingSession;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub strict: bool,
    /// Sessions shown in the recent trend
    pub trend_window: usize,
    /// Keys listed as problem keys
    pub top_keys: usize,
    /// WPM taken off the adjusted speed for every backspace
    pub backspace_penalty: f64,
    /// Fraction of an error each backspace counts for in adjusted accuracy
    pub backspace_accuracy_weight: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict: false,
            trend_window: 20,
            top_keys: 10,
            backspace_penalty: 3.0,
            backspace_accuracy_weight: 0.5,
        }
    }
}

impl Config {
    pub fn policy(&self) -> TypingPolicy {
        TypingPolicy::from_strict(self.strict)
    }

    /// Speed after the configured backspace penalty
    pub fn adjusted_wpm(&self, session: &TypingSession) -> f64 {
        session.adjusted_wpm(self.backspace_penalty)
    }

    /// Accuracy after the configured backspace weight
    pub fn adjusted_accuracy(&self, session: &TypingSession) -> f64 {
        session.adjusted_accuracy(self.backspace_accuracy_weight)
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("typecoach_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        let Ok(bytes) = fs::read(&self.path) else {
            return Config::default();
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable config");
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
