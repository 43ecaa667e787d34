//! Engine configuration and the TOML config file model

use crate::error::ConfigError;
use crate::target::WatchTarget;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default quiet window in milliseconds
pub const DEFAULT_QUIET_WINDOW_MS: u64 = 200;

/// Runtime configuration of an aggregation engine
///
/// A quiet window change applies from the next timer arm; a firing that is
/// already scheduled keeps its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Inactivity required before pending changes are delivered
    pub quiet_window: Duration,
    /// Report create-then-modify as a single Added
    pub prefer_added_on_create_modify: bool,
}

impl EngineConfig {
    pub fn new(quiet_window: Duration, prefer_added_on_create_modify: bool) -> Self {
        Self {
            quiet_window,
            prefer_added_on_create_modify,
        }
    }

    /// Build from a signed millisecond count, as found in config files
    pub fn from_millis(quiet_window_ms: i64, prefer_added: bool) -> Result<Self, ConfigError> {
        Ok(Self::new(quiet_window_from_millis(quiet_window_ms)?, prefer_added))
    }

    /// Update the quiet window from a signed millisecond count
    ///
    /// Negative values are rejected and leave the current window untouched.
    pub fn set_quiet_window_ms(&mut self, quiet_window_ms: i64) -> Result<(), ConfigError> {
        self.quiet_window = quiet_window_from_millis(quiet_window_ms)?;
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quiet_window: Duration::from_millis(DEFAULT_QUIET_WINDOW_MS),
            prefer_added_on_create_modify: true,
        }
    }
}

/// Validate a signed millisecond count as a quiet window
pub fn quiet_window_from_millis(quiet_window_ms: i64) -> Result<Duration, ConfigError> {
    u64::try_from(quiet_window_ms)
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::NegativeQuietWindow(quiet_window_ms))
}

/// `[engine]` section of the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSection {
    /// Quiet window in milliseconds (default: 200, 0 = flush almost immediately)
    #[serde(default = "default_quiet_window_ms")]
    pub quiet_window_ms: i64,

    /// Report create-then-modify as Added (default: true)
    #[serde(default = "default_true")]
    pub prefer_added_on_create_modify: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            quiet_window_ms: default_quiet_window_ms(),
            prefer_added_on_create_modify: true,
        }
    }
}

/// Whole config file: engine tuning plus the targets to watch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub targets: Vec<WatchTarget>,
}

impl WatchConfig {
    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate config text
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: WatchConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        quiet_window_from_millis(self.engine.quiet_window_ms)?;

        if self.targets.iter().any(|t| t.path.as_os_str().is_empty()) {
            return Err(ConfigError::EmptyTargetPath);
        }

        Ok(())
    }

    /// Engine configuration described by the `[engine]` section
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        EngineConfig::from_millis(
            self.engine.quiet_window_ms,
            self.engine.prefer_added_on_create_modify,
        )
    }

    /// Targets that will be registered on start
    pub fn enabled_targets(&self) -> impl Iterator<Item = &WatchTarget> {
        self.targets.iter().filter(|t| t.enabled)
    }
}

fn default_quiet_window_ms() -> i64 {
    DEFAULT_QUIET_WINDOW_MS as i64
}

fn default_true() -> bool {
    true
}

/// Example config file with every option spelled out
pub fn example_config() -> &'static str {
    r#"# quiesce configuration

[engine]
# Inactivity (ms) required before pending changes are delivered.
# 0 delivers almost immediately.
quiet_window_ms = 200

# A file that is created and then written within one quiet window
# is reported once as "added" instead of "modified".
prefer_added_on_create_modify = true

# A single file
[[targets]]
path = "config/app.toml"
is_file = true

# A directory tree
[[targets]]
path = "assets"
recursive = true
enabled = true

[targets.interest]
file_name = true
dir_name = true
attributes = false
size = true
last_write = true
last_access = false
creation = false
security = false
"#
}
