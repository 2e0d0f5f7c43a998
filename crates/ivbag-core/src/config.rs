//! Device configuration
//!
//! All values are static startup data. [`Config::default`] carries the
//! constants the device ships with; credentials are empty and are filled in
//! by the firmware (from `.env` at build time) or the simulator.

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// Upper bound on the number of raw reads averaged into one sample.
pub const MAX_AVERAGE_WINDOW: usize = 32;

/// ThingSpeak API host.
pub const THINGSPEAK_HOST: &str = "api.thingspeak.com";

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy)]
#[serde(bound(deserialize = "'de: 'a"))]
#[serde(default)]
pub struct Config<'a> {
    pub internet: InternetConfig<'a>,
    pub telemetry: TelemetryConfig<'a>,
    pub scale: ScaleConfig,
    pub reconnect: ReconnectConfig,
    pub alarm: AlarmConfig,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy)]
#[serde(default)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

/// Where and how often measurements are published.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct TelemetryConfig<'a> {
    pub host: &'a str,
    pub channel_id: u32,
    pub write_key: &'a str,
    /// Minimum spacing between two upload attempts.
    pub interval_ms: u64,
    /// Upper bound for a single upload round trip at the transport.
    pub request_timeout_ms: u64,
}

impl Default for TelemetryConfig<'_> {
    fn default() -> Self {
        Self {
            host: THINGSPEAK_HOST,
            channel_id: 0,
            write_key: "",
            interval_ms: 16_000,
            request_timeout_ms: 5_000,
        }
    }
}

/// Load cell calibration and the weight to volume conversion.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ScaleConfig {
    /// Raw counts per weight unit (kilogram with the shipped load cell).
    pub calibration_factor: f32,
    /// Raw reads averaged into one sample.
    pub average_window: usize,
    /// Raw reads averaged when taring at startup.
    pub tare_samples: usize,
    /// Millilitres per weight unit for the infused fluid.
    pub ml_per_unit: f32,
    /// Volume reported as 100 %.
    pub full_volume_ml: i32,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            calibration_factor: 102_500.0,
            average_window: 5,
            tare_samples: 10,
            ml_per_unit: 1000.0,
            full_volume_ml: 505,
        }
    }
}

/// Bounded reconnect budget.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ReconnectConfig {
    pub max_attempts: u32,
    pub poll_interval_ms: u32,
    /// Upper bound for the link's own reconnect request.
    pub reconnect_timeout_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            poll_interval_ms: 1_000,
            reconnect_timeout_ms: 10_000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct AlarmConfig {
    /// Buzzer sounds at or below this fill level.
    pub threshold_percent: u8,
    /// Fill level must rise this far above the threshold to silence it.
    pub hysteresis_percent: u8,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            threshold_percent: 10,
            hysteresis_percent: 3,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    #[error("calibration factor must be finite and non-zero, got {0}")]
    CalibrationFactor(f32),
    #[error("average window must be between 1 and 32, got {0}")]
    AverageWindow(usize),
    #[error("tare samples must be between 1 and 32, got {0}")]
    TareSamples(usize),
    #[error("millilitres per unit must be finite and positive, got {0}")]
    MlPerUnit(f32),
    #[error("full volume must be positive, got {0} mL")]
    FullVolume(i32),
    #[error("upload interval must be non-zero")]
    UploadInterval,
    #[error("reconnect budget needs at least one attempt")]
    ReconnectAttempts,
}

impl Config<'_> {
    /// Check the invariants the conversion pipeline and the scheduler rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scale = &self.scale;
        if !scale.calibration_factor.is_finite() || scale.calibration_factor == 0.0 {
            return Err(ConfigError::CalibrationFactor(scale.calibration_factor));
        }
        if !(1..=MAX_AVERAGE_WINDOW).contains(&scale.average_window) {
            return Err(ConfigError::AverageWindow(scale.average_window));
        }
        if !(1..=MAX_AVERAGE_WINDOW).contains(&scale.tare_samples) {
            return Err(ConfigError::TareSamples(scale.tare_samples));
        }
        if !scale.ml_per_unit.is_finite() || scale.ml_per_unit <= 0.0 {
            return Err(ConfigError::MlPerUnit(scale.ml_per_unit));
        }
        if scale.full_volume_ml <= 0 {
            return Err(ConfigError::FullVolume(scale.full_volume_ml));
        }
        if self.telemetry.interval_ms == 0 {
            return Err(ConfigError::UploadInterval);
        }
        if self.reconnect.max_attempts == 0 {
            return Err(ConfigError::ReconnectAttempts);
        }
        Ok(())
    }
}
