//! Configuration for zprobe
//!
//! Provides configuration file handling and validation.
//! Supports JSON and TOML file formats; the default location is the
//! platform-specific config directory.
//!
//! Configuration is organized into sections:
//! - Connection settings (controller address, timeouts)
//! - Grid settings (survey area, heights, feeds)
//! - Streaming settings (pacing, alarm recovery)
//! - Output settings (where the heightmap goes)
//!
//! Every field has a default, so a file only needs the values it changes.

use crate::error::{ConfigError, SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use zprobe_communication::{ConnectionParams, SessionOptions, DEFAULT_PORT};
use zprobe_core::{GridConfig, GridCoverage, MAX_GRID_POINTS};

/// Directory under the platform config dir
pub const APP_DIR: &str = "zprobe";

/// File name of the default config
pub const CONFIG_FILE: &str = "config.toml";

/// Controller connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Controller hostname or IP address
    pub host: String,
    /// Controller TCP port
    pub port: u16,
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Upper bound on the reset/unlock handshake in milliseconds
    pub handshake_timeout_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: "192.168.5.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout_ms: 5000,
            handshake_timeout_ms: 30_000,
        }
    }
}

/// Command streaming settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    /// Delay between an acknowledgment and the next command
    pub pacing_ms: u64,
    /// Delay before the first survey command
    pub start_delay_ms: u64,
    /// Delay before unlocking after a recoverable alarm
    pub alarm_settle_ms: u64,
    /// Back-to-back recoverable alarms tolerated before aborting
    pub max_alarm_recoveries: u32,
    /// Upper bound on writing the heightmap
    pub persist_timeout_ms: u64,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            pacing_ms: 50,
            start_delay_ms: 100,
            alarm_settle_ms: 500,
            max_alarm_recoveries: 3,
            persist_timeout_ms: 5000,
        }
    }
}

/// Heightmap output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Directory the heightmap is written to
    pub directory: PathBuf,
    /// Explicit file name; derived from the grid when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            file_name: None,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Connection settings
    pub connection: ConnectionSettings,
    /// Survey grid
    pub grid: GridConfig,
    /// Streaming settings
    pub streaming: StreamingSettings,
    /// Output settings
    pub output: OutputSettings,
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(ConfigError::UnsupportedFormat(other.unwrap_or("<none>").to_string()).into()),
    }
}

fn require_positive_ms(key: &str, value: u64) -> SettingsResult<()> {
    if value == 0 {
        return Err(ConfigError::ValueOutOfRange {
            key: key.to_string(),
            value: value.to_string(),
        }
        .into());
    }
    Ok(())
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// `<config_dir>/zprobe/config.toml`
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no config directory on this platform".to_string())
            })
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| SettingsError::LoadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => self.to_toml_string()?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content).map_err(|e| SettingsError::SaveError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(())
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> SettingsResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        // Connection
        if self.connection.host.trim().is_empty() {
            return Err(SettingsError::invalid("connection.host", "must not be empty"));
        }
        if self.connection.port == 0 {
            return Err(SettingsError::invalid("connection.port", "must be > 0"));
        }
        require_positive_ms("connection.connect_timeout_ms", self.connection.connect_timeout_ms)?;
        require_positive_ms(
            "connection.handshake_timeout_ms",
            self.connection.handshake_timeout_ms,
        )?;

        // Grid
        let g = &self.grid;
        let coordinates = [
            ("grid.x_start", g.x_start),
            ("grid.y_start", g.y_start),
            ("grid.x_end", g.x_end),
            ("grid.y_end", g.y_end),
            ("grid.x_step", g.x_step),
            ("grid.y_step", g.y_step),
            ("grid.probe_depth", g.probe_depth),
            ("grid.retract_height", g.retract_height),
            ("grid.probe_feed", g.probe_feed),
            ("grid.travel_feed", g.travel_feed),
            ("grid.missed_probe_sentinel", g.missed_probe_sentinel),
            ("grid.dwell_seconds", g.dwell_seconds),
        ];
        for (key, value) in coordinates {
            if !value.is_finite() {
                return Err(SettingsError::invalid(key, "must be a finite number"));
            }
        }
        if g.x_end < g.x_start {
            return Err(SettingsError::invalid("grid.x_end", "must not be below x_start"));
        }
        if g.y_end < g.y_start {
            return Err(SettingsError::invalid("grid.y_end", "must not be below y_start"));
        }
        if g.x_step < 0.0 || g.y_step < 0.0 {
            return Err(SettingsError::invalid("grid.x_step", "steps must not be negative"));
        }
        if g.probe_feed <= 0.0 {
            return Err(SettingsError::invalid("grid.probe_feed", "must be > 0"));
        }
        if g.travel_feed <= 0.0 {
            return Err(SettingsError::invalid("grid.travel_feed", "must be > 0"));
        }
        if g.retract_height <= g.probe_depth {
            return Err(SettingsError::invalid(
                "grid.retract_height",
                "must be above probe_depth",
            ));
        }
        if g.dwell_seconds < 0.0 {
            return Err(SettingsError::invalid("grid.dwell_seconds", "must not be negative"));
        }
        if !g.within_point_limit() {
            return Err(ConfigError::ValueOutOfRange {
                key: "grid".to_string(),
                value: format!(
                    "{} points (at most {} allowed)",
                    g.requested_points(),
                    MAX_GRID_POINTS
                ),
            }
            .into());
        }

        // Streaming
        require_positive_ms("streaming.pacing_ms", self.streaming.pacing_ms)?;
        require_positive_ms("streaming.persist_timeout_ms", self.streaming.persist_timeout_ms)?;

        Ok(())
    }

    /// Connection parameters for the transport
    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            host: self.connection.host.clone(),
            port: self.connection.port,
            connect_timeout_ms: self.connection.connect_timeout_ms,
        }
    }

    /// Timing options for the session
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            pacing: Duration::from_millis(self.streaming.pacing_ms),
            start_delay: Duration::from_millis(self.streaming.start_delay_ms),
            alarm_settle: Duration::from_millis(self.streaming.alarm_settle_ms),
            max_alarm_recoveries: self.streaming.max_alarm_recoveries,
            handshake_timeout: Duration::from_millis(self.connection.handshake_timeout_ms),
            persist_timeout: Duration::from_millis(self.streaming.persist_timeout_ms),
        }
    }

    /// Where the heightmap for `coverage` is written
    pub fn output_path(&self, coverage: &GridCoverage) -> PathBuf {
        let name = self
            .output
            .file_name
            .clone()
            .unwrap_or_else(|| coverage.default_file_name());
        self.output.directory.join(name)
    }
}
