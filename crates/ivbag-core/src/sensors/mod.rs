//! Load cell abstraction and drivers

pub mod hx711;

pub use hx711::{Hx711, Hx711Error, Hx711Gain};

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: {operation} failed ({details})")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: initialization failed ({details})")]
    InitializationFailed {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: timed out waiting for {operation}")]
    Timeout {
        sensor: &'static str,
        operation: &'static str,
    },
}

/// A strain gauge amplifier producing raw signed counts.
pub trait LoadCell {
    /// Smallest value the converter can report. A reading at this value is saturated.
    const RAW_MIN: i32 = i32::MIN;
    /// Largest value the converter can report. A reading at this value is saturated.
    const RAW_MAX: i32 = i32::MAX;

    /// Take one conversion from the amplifier.
    fn read_raw(&mut self) -> impl Future<Output = Result<i32, SensorError>>;
}
