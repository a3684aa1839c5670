//! Configuration management for the e-paper driver.
//!
//! Handles loading, saving, and validating configuration from JSON files.

use crate::display::Model;
use crate::image_proc::{Placement, TransformOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/etc/epaper-stream/config.json";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pins and SPI device the panel is wired to (BCM numbering)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransportConfig {
    /// SPI bus number (0 = SPI0)
    pub spi_bus: u8,

    /// Hardware chip select line on that bus
    pub slave_select: u8,

    /// SPI clock in Hz
    pub clock_speed_hz: u32,

    pub reset_pin: u8,
    pub dc_pin: u8,
    pub busy_pin: u8,

    /// Manually driven CS pin; `None` leaves CS to the SPI controller
    pub cs_pin: Option<u8>,

    /// Panel power switch, present on some HATs
    pub power_pin: Option<u8>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            spi_bus: 0,
            slave_select: 0,
            clock_speed_hz: 4_000_000,
            reset_pin: 17,
            dc_pin: 25,
            busy_pin: 24,
            cs_pin: None,
            power_pin: None,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Panel model
    pub model: Model,

    /// Dither images by default
    pub dither: bool,

    /// Busy-wait deadline in milliseconds
    pub busy_timeout_ms: u64,

    /// Display rotation in degrees (0, 90, 180, 270)
    pub rotation: u16,

    /// Horizontal mirror
    pub mirror_h: bool,

    /// Vertical mirror
    pub mirror_v: bool,

    /// How images are sized against the panel
    pub placement: Placement,

    pub transport: TransportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: Model::default(),
            dither: true,
            busy_timeout_ms: 50_000,
            rotation: 0,
            mirror_h: false,
            mirror_v: false,
            placement: Placement::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or return the defaults if that fails
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config from {}: {}, using defaults", path.display(), e);
            Self::default()
        })
    }

    /// Save configuration to a JSON file atomically
    ///
    /// Writes a temporary file next to the target and renames it over, so a
    /// power cut leaves either the old or the new file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)?;

        std::fs::rename(&tmp_path, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            ConfigError::ReadError(e)
        })?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.rotation, 0 | 90 | 180 | 270) {
            return Err(ConfigError::ValidationError(
                "rotation must be 0, 90, 180, or 270".to_string(),
            ));
        }

        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "busy_timeout_ms must be greater than 0".to_string(),
            ));
        }

        let t = &self.transport;
        if t.spi_bus > 2 || t.slave_select > 2 {
            return Err(ConfigError::ValidationError(
                "spi_bus and slave_select must be between 0 and 2".to_string(),
            ));
        }

        if t.clock_speed_hz == 0 || t.clock_speed_hz > 32_000_000 {
            return Err(ConfigError::ValidationError(
                "clock_speed_hz must be between 1 and 32000000".to_string(),
            ));
        }

        let mut pins = vec![t.reset_pin, t.dc_pin, t.busy_pin];
        pins.extend(t.cs_pin);
        pins.extend(t.power_pin);
        if let Some(&pin) = pins.iter().find(|&&p| p > 27) {
            return Err(ConfigError::ValidationError(format!(
                "GPIO {} is not on the 40-pin header",
                pin
            )));
        }
        let mut sorted = pins.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != pins.len() {
            return Err(ConfigError::ValidationError(
                "transport pins must all be different".to_string(),
            ));
        }

        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Image preparation options for a panel of the given resolution
    pub fn transform_options(&self, width: u32, height: u32) -> TransformOptions {
        TransformOptions {
            rotation: self.rotation.into(),
            mirror_h: self.mirror_h,
            mirror_v: self.mirror_v,
            placement: self.placement,
            ..TransformOptions::for_panel(width, height)
        }
    }
}
