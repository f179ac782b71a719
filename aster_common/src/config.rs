//! TOML configuration loading and validation.
//!
//! Every section has serde defaults so the controller runs with no
//! config file at all; a file only overrides what it names.
//!
//! # TOML Example
//!
//! ```toml
//! [link]
//! device = "/dev/ttyAMA0"
//! baud = 9600
//!
//! [mount]
//! gear_ratio_x = 28.5714285714
//!
//! [motion]
//! step_interval_us = 1000
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::axis::Axis;
use crate::consts;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parsing failed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log verbosity, serialized as lowercase strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Serial link settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    /// Serial device path.
    pub device: String,
    /// Line rate [baud] (8N1).
    pub baud: u32,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            device: "/dev/ttyAMA0".to_string(),
            baud: consts::BAUD_RATE,
        }
    }
}

/// Mechanical parameters of the mount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MountParams {
    pub steps_per_rev: u32,
    pub microstepping: u32,
    pub gear_ratio_x: f32,
    pub gear_ratio_y: f32,
    pub gear_ratio_z: f32,
}

impl Default for MountParams {
    fn default() -> Self {
        Self {
            steps_per_rev: consts::STEPS_PER_REV,
            microstepping: consts::MICROSTEPPING,
            gear_ratio_x: consts::X_GEAR_RATIO,
            gear_ratio_y: consts::Y_GEAR_RATIO,
            gear_ratio_z: consts::Z_GEAR_RATIO,
        }
    }
}

impl MountParams {
    /// Gear ratio for the given axis.
    #[inline]
    pub const fn gear_ratio(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.gear_ratio_x,
            Axis::Y => self.gear_ratio_y,
            Axis::Z => self.gear_ratio_z,
        }
    }
}

/// Motion scheduler timing. Compile-time defaults from [`consts`];
/// overridable for slow mechanics or bench setups.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionTiming {
    /// Interval between static-mode steps [µs].
    pub step_interval_us: u32,
    /// Settle time after a direction change [µs].
    pub dir_setup_us: u32,
    /// Step pulse high time [µs].
    pub step_pulse_us: u32,
}

impl Default for MotionTiming {
    fn default() -> Self {
        Self {
            step_interval_us: consts::STEP_INTERVAL_US,
            dir_setup_us: consts::DIR_SETUP_US,
            step_pulse_us: consts::STEP_PULSE_US,
        }
    }
}

/// Telemetry settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Interval between periodic STATUS frames [ms].
    pub status_interval_ms: u64,
    /// Fan duty reported in STATUS [percent]. There is no wire command
    /// for this yet; the field is the configuration hook.
    pub fan_duty_percent: u8,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            status_interval_ms: consts::STATUS_INTERVAL_MS,
            fan_duty_percent: 100,
        }
    }
}

/// Top-level controller configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AsterConfig {
    pub log_level: Option<LogLevel>,
    pub link: LinkSettings,
    pub mount: MountParams,
    pub motion: MotionTiming,
    pub telemetry: TelemetrySettings,
}

impl AsterConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` when a field is outside
    /// its physical range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.link.device.is_empty() {
            return Err(ConfigError::ValidationError(
                "link.device cannot be empty".to_string(),
            ));
        }
        if self.link.baud == 0 {
            return Err(ConfigError::ValidationError(
                "link.baud must be non-zero".to_string(),
            ));
        }
        if self.mount.steps_per_rev == 0 || self.mount.microstepping == 0 {
            return Err(ConfigError::ValidationError(
                "mount.steps_per_rev and mount.microstepping must be non-zero".to_string(),
            ));
        }
        for axis in Axis::ALL {
            let g = self.mount.gear_ratio(axis);
            if !(g.is_finite() && g > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "gear ratio for {axis:?} must be finite and positive, got {g}"
                )));
            }
        }
        if self.motion.step_pulse_us == 0 || self.motion.dir_setup_us == 0 {
            return Err(ConfigError::ValidationError(
                "motion pulse and direction setup times must be at least 1 µs".to_string(),
            ));
        }
        if self.motion.step_interval_us < self.motion.step_pulse_us {
            return Err(ConfigError::ValidationError(
                "motion.step_interval_us must cover the step pulse".to_string(),
            ));
        }
        if self.telemetry.fan_duty_percent > 100 {
            return Err(ConfigError::ValidationError(
                "telemetry.fan_duty_percent must be 0..=100".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        toml::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl ConfigLoader for AsterConfig {}
