//! Server configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Configuration for the game server.
///
/// Every field has a default, so an empty TOML file (or no file at all)
/// yields a usable configuration.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP/WebSocket listener to.
    host: String,

    /// Port to bind the HTTP/WebSocket listener to.
    port: u16,

    /// Directory holding the category datasets.
    data_dir: PathBuf,

    /// Length of the prep window before each round, in seconds.
    prep_seconds: u64,

    /// Length of the post-round leaderboard window, in seconds.
    post_seconds: u64,

    /// Round count used when a host supplies none (or garbage).
    default_total_rounds: u32,

    /// Round duration used when a host supplies none (or garbage).
    default_round_seconds: u32,

    /// Random PIN draws before falling back to a scan of the keyspace.
    pin_attempts: u32,

    /// Capacity of each session's command queue.
    command_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5174,
            data_dir: PathBuf::from("data"),
            prep_seconds: 5,
            post_seconds: 5,
            default_total_rounds: 5,
            default_round_seconds: 60,
            pin_attempts: 64,
            command_buffer: 256,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        info!(host = %config.host, port = config.port, "Config loaded successfully");
        Ok(config)
    }

    /// Resolves the effective configuration.
    ///
    /// An explicit `path` must exist. Without one, `letter_rush.toml` in the
    /// working directory is used when present. Environment overrides are
    /// applied last.
    #[instrument]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = Path::new("letter_rush.toml");
                if fallback.exists() {
                    Self::from_file(fallback)?
                } else {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `LETTER_RUSH_*` (and `PORT`) environment overrides.
    #[instrument(skip(self))]
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("LETTER_RUSH_HOST") {
            debug!(host = %host, "Overriding host from environment");
            self.host = host;
        }

        let port = std::env::var("LETTER_RUSH_PORT").or_else(|_| std::env::var("PORT"));
        if let Ok(port) = port {
            self.port = port
                .parse()
                .map_err(|_| ConfigError::new(format!("Invalid port in environment: {}", port)))?;
            debug!(port = self.port, "Overriding port from environment");
        }

        if let Ok(dir) = std::env::var("LETTER_RUSH_DATA_DIR") {
            debug!(data_dir = %dir, "Overriding data directory from environment");
            self.data_dir = PathBuf::from(dir);
        }

        Ok(())
    }

    /// Rejects values the engine cannot run with.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prep_seconds == 0 || self.post_seconds == 0 {
            warn!(
                prep_seconds = self.prep_seconds,
                post_seconds = self.post_seconds,
                "Rejecting zero-length phase window"
            );
            return Err(ConfigError::new(
                "prep_seconds and post_seconds must be positive".to_string(),
            ));
        }
        if self.default_total_rounds == 0 {
            return Err(ConfigError::new(
                "default_total_rounds must be positive".to_string(),
            ));
        }
        if self.default_round_seconds < crate::settings::MIN_ROUND_SECONDS {
            return Err(ConfigError::new(format!(
                "default_round_seconds must be at least {}",
                crate::settings::MIN_ROUND_SECONDS
            )));
        }
        if self.command_buffer == 0 {
            return Err(ConfigError::new("command_buffer must be positive".to_string()));
        }
        Ok(())
    }

    /// Overrides the bind address.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Overrides the bind port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Overrides the dataset directory.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Overrides the prep and post windows.
    pub fn with_windows(mut self, prep_seconds: u64, post_seconds: u64) -> Self {
        self.prep_seconds = prep_seconds;
        self.post_seconds = post_seconds;
        self
    }

    /// Phase timings derived from this configuration.
    pub fn timings(&self) -> Timings {
        Timings {
            prep: Duration::from_secs(self.prep_seconds),
            post: Duration::from_secs(self.post_seconds),
        }
    }
}

/// Fixed-length phase windows shared by every session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Countdown before a round opens.
    pub prep: Duration,
    /// Leaderboard window after a round closes.
    pub post: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        ServerConfig::default().timings()
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
