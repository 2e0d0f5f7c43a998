//! Application run state and error types

use thiserror_no_std::Error;

use crate::config::ConfigError;
use crate::sensors::SensorError;

pub const ERROR_MESSAGE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRunState {
    Booting,
    Taring,
    WifiConnecting,
    Monitoring,
}

impl AppRunState {
    /// Text for the display status row during startup.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Booting => "Booting...",
            Self::Taring => "Remove all weight",
            Self::WifiConnecting => "Connecting WiFi...",
            Self::Monitoring => "Monitoring",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Sensor error: {0}")]
    Sensor(SensorError),
    #[error("Invalid configuration: {0}")]
    Config(ConfigError),
    #[error("Hardware error: {0}")]
    Hardware(heapless::String<ERROR_MESSAGE_CAPACITY>),
}

impl AppError {
    /// Hardware error with `message` cut to fit the buffer.
    pub fn hardware(message: &str) -> Self {
        AppError::Hardware(truncated(message))
    }
}

impl From<SensorError> for AppError {
    fn from(e: SensorError) -> Self {
        AppError::Sensor(e)
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}

/// Copy of `text` cut at the last char boundary that fits `N` bytes.
pub fn truncated<const N: usize>(text: &str) -> heapless::String<N> {
    let mut end = text.len().min(N);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = heapless::String::new();
    // cannot fail, `end <= N`
    let _ = out.push_str(&text[..end]);
    out
}
