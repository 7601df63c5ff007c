//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub channel: ChannelConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Leaderboard server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_url")]
    pub url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_server_url() -> String {
    "http://localhost:8003".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Transport used to carry the push channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Persistent bidirectional WebSocket
    Websocket,
    /// HTTP long-polling
    Polling,
}

impl TransportKind {
    /// Value of the `transport` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Websocket => "websocket",
            TransportKind::Polling => "polling",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "websocket" | "ws" => Ok(TransportKind::Websocket),
            "polling" => Ok(TransportKind::Polling),
            other => Err(ConfigError::Invalid(format!("unknown transport: {}", other))),
        }
    }
}

/// Push channel configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Mount path of the Socket.IO endpoint on the server
    #[serde(default = "default_channel_path")]
    pub path: String,

    /// Transports in order of preference
    #[serde(default = "default_transports")]
    pub transports: Vec<TransportKind>,

    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,

    #[serde(default = "default_reconnect_delay_max")]
    pub reconnect_delay_max_ms: u64,

    /// Unset means reconnect forever
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,

    #[serde(default = "default_event_capacity")]
    pub event_channel_capacity: usize,

    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_ms: u64,
}

fn default_channel_path() -> String {
    "socket.io".to_string()
}

fn default_transports() -> Vec<TransportKind> {
    vec![TransportKind::Websocket, TransportKind::Polling]
}

fn default_reconnect_delay() -> u64 {
    1000
}

fn default_reconnect_delay_max() -> u64 {
    5000
}

fn default_event_capacity() -> usize {
    256
}

fn default_shutdown_timeout() -> u64 {
    1000
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            path: default_channel_path(),
            transports: default_transports(),
            reconnect_delay_ms: default_reconnect_delay(),
            reconnect_delay_max_ms: default_reconnect_delay_max(),
            max_reconnect_attempts: None,
            event_channel_capacity: default_event_capacity(),
            shutdown_timeout_ms: default_shutdown_timeout(),
        }
    }
}

impl ChannelConfig {
    /// Delay before reconnect attempt number `attempt` (0-based)
    ///
    /// Doubles from `reconnect_delay_ms` and saturates at `reconnect_delay_max_ms`.
    pub fn reconnect_delay(&self, attempt: u32) -> Duration {
        let factor = 2_u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let delay = self
            .reconnect_delay_ms
            .saturating_mul(factor)
            .min(self.reconnect_delay_max_ms);
        Duration::from_millis(delay)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Terminal display configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_thousands_separator")]
    pub thousands_separator: String,

    /// Redraw the whole screen on every update
    #[serde(default = "default_clear_screen")]
    pub clear_screen: bool,
}

fn default_thousands_separator() -> String {
    ",".to_string()
}

fn default_clear_screen() -> bool {
    true
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            thousands_separator: default_thousands_separator(),
            clear_screen: default_clear_screen(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("podium").join("config.toml")),
            Some(PathBuf::from("/etc/podium/config.toml")),
            Some(PathBuf::from("./podium.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths)
    }

    /// Load the first existing file in `paths`, or fall back to the environment
    ///
    /// A file that exists but cannot be read or parsed is an error, not a
    /// reason to try the next location.
    pub fn load_first(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        match paths.iter().find(|path| path.exists()) {
            Some(path) => {
                let config = Self::load_with_env(path)?;
                tracing::info!("Loaded config from {:?}", path);
                Ok(config)
            }
            None => {
                tracing::info!("Using default config with environment overrides");
                Self::from_env()
            }
        }
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var("PODIUM_SERVER_URL") {
            self.server.url = url;
        }

        if let Ok(list) = std::env::var("PODIUM_TRANSPORTS") {
            self.channel.transports = parse_transport_list(&list)?;
        }

        if let Ok(level) = std::env::var("PODIUM_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("PODIUM_LOG_FORMAT") {
            self.logging.format = format;
        }

        self.validate()
    }

    /// Reject settings the client cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel.transports.is_empty() {
            return Err(ConfigError::Invalid(
                "channel.transports must list at least one transport".to_string(),
            ));
        }
        if !self.server.url.starts_with("http://") && !self.server.url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "server.url must be an http(s) URL, got {}",
                self.server.url
            )));
        }
        if self.channel.reconnect_delay_max_ms < self.channel.reconnect_delay_ms {
            return Err(ConfigError::Invalid(
                "channel.reconnect_delay_max_ms is below channel.reconnect_delay_ms".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse a comma-separated transport list such as `websocket,polling`
pub fn parse_transport_list(list: &str) -> Result<Vec<TransportKind>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Podium Configuration
#
# Environment variables override these settings:
# - PODIUM_SERVER_URL
# - PODIUM_TRANSPORTS (comma-separated, e.g. "websocket,polling")
# - PODIUM_LOG_LEVEL
# - PODIUM_LOG_FORMAT

[server]
# Leaderboard server base URL (REST and Socket.IO)
url = "http://localhost:8003"

# Snapshot request timeout in seconds
request_timeout_secs = 10

[channel]
# Socket.IO mount path
path = "socket.io"

# Transports in order of preference
transports = ["websocket", "polling"]

# Reconnect backoff: starts at reconnect_delay_ms, doubles, capped
reconnect_delay_ms = 1000
reconnect_delay_max_ms = 5000

# Give up after this many failed reconnects (omit to retry forever)
# max_reconnect_attempts = 10

# Buffered channel events before new ones are dropped
event_channel_capacity = 256

# Time allowed for a clean close on exit (ms)
shutdown_timeout_ms = 1000

[display]
# Digit group separator for scores
thousands_separator = ","

# Redraw the whole terminal on every update
clear_screen = true

[logging]
# Log level: trace, debug, info, warn, error
level = "warn"

# Log format: pretty or json
format = "pretty"

# Optional log file path (logs go to stderr otherwise)
# file = "/tmp/podium.log"
"#
    .to_string()
}
