//! Load cell to volume conversion
//!
//! [`Scale`] turns averaged raw load cell counts into a [`Measurement`]:
//!
//! ```text
//! raw average ─► (raw - tare) / calibration ─► clamp ≥ 0 ─► weight units
//! weight units × ml per unit ─► round ─► volume (mL)
//! volume rescaled [0, full] → [0, 100] ─► clamp ─► fill percent
//! ```
//!
//! Sampling never fails. A failed read reuses the last good raw average so
//! the display keeps showing a best-effort value.

use log::{debug, info, warn};
use micromath::F32Ext;

use crate::config::{MAX_AVERAGE_WINDOW, ScaleConfig};
use crate::sensors::{LoadCell, SensorError};

/// One derived reading of the bag.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Calibrated weight, never negative.
    pub weight_units: f32,
    pub volume_ml: i32,
    /// Always within `0..=100`.
    pub fill_percent: u8,
}

/// Calibrated weight for a raw average. Negative (and NaN) results clamp to zero.
pub fn weight_units(raw_average: i32, tare_offset: i32, calibration_factor: f32) -> f32 {
    let tared = (i64::from(raw_average) - i64::from(tare_offset)) as f32;
    let weight = tared / calibration_factor;
    if weight > 0.0 { weight } else { 0.0 }
}

/// Volume for a weight, rounded to the nearest millilitre.
pub fn volume_ml(weight_units: f32, ml_per_unit: f32) -> i32 {
    // `as` saturates at the i32 bounds
    F32Ext::round(weight_units * ml_per_unit) as i32
}

/// Integer rescale of `volume_ml` from `[0, full_volume_ml]` to `[0, 100]`, clamped.
pub fn fill_percent(volume_ml: i32, full_volume_ml: i32) -> u8 {
    if full_volume_ml <= 0 {
        return 0;
    }
    let percent = i64::from(volume_ml) * 100 / i64::from(full_volume_ml);
    percent.clamp(0, 100) as u8
}

pub struct Scale<L> {
    load_cell: L,
    tare_offset: i32,
    calibration_factor: f32,
    average_window: usize,
    tare_samples: usize,
    ml_per_unit: f32,
    full_volume_ml: i32,
    last_raw: Option<i32>,
}

impl<L: LoadCell> Scale<L> {
    pub fn new(load_cell: L, config: &ScaleConfig) -> Self {
        Self {
            load_cell,
            tare_offset: 0,
            calibration_factor: config.calibration_factor,
            average_window: config.average_window.clamp(1, MAX_AVERAGE_WINDOW),
            tare_samples: config.tare_samples.clamp(1, MAX_AVERAGE_WINDOW),
            ml_per_unit: config.ml_per_unit,
            full_volume_ml: config.full_volume_ml,
            last_raw: None,
        }
    }

    pub fn tare_offset(&self) -> i32 {
        self.tare_offset
    }

    pub fn calibration_factor(&self) -> f32 {
        self.calibration_factor
    }

    pub fn set_calibration_factor(&mut self, calibration_factor: f32) {
        self.calibration_factor = calibration_factor;
    }

    /// Integer mean of `samples` consecutive reads.
    pub async fn read_average(&mut self, samples: usize) -> Result<i32, SensorError> {
        let samples = samples.clamp(1, MAX_AVERAGE_WINDOW);
        let mut sum: i64 = 0;
        for _ in 0..samples {
            let raw = self.load_cell.read_raw().await?;
            if raw <= L::RAW_MIN || raw >= L::RAW_MAX {
                warn!("Load cell saturated: raw = {}", raw);
            }
            sum += i64::from(raw);
        }
        Ok((sum / samples as i64) as i32)
    }

    /// Zero the scale with nothing on it. Returns the new tare offset.
    pub async fn tare(&mut self) -> Result<i32, SensorError> {
        let offset = self.read_average(self.tare_samples).await?;
        self.tare_offset = offset;
        self.last_raw = Some(offset);
        debug!("Tare offset = {}", offset);
        Ok(offset)
    }

    /// Derive the calibration factor from a known reference weight on the scale.
    pub async fn calibrate(&mut self, reference_weight_units: f32) -> Result<f32, SensorError> {
        if reference_weight_units.is_nan() || reference_weight_units <= 0.0 {
            return Err(SensorError::ReadFailed {
                sensor: "scale",
                operation: "calibrate",
                details: "reference weight must be positive",
            });
        }
        let raw = self.read_average(self.tare_samples).await?;
        let counts = (i64::from(raw) - i64::from(self.tare_offset)) as f32;
        let factor = counts / reference_weight_units;
        if !factor.is_finite() || factor <= 0.0 {
            return Err(SensorError::ReadFailed {
                sensor: "scale",
                operation: "calibrate",
                details: "reference weight did not register",
            });
        }
        info!("Calibration factor = {}", factor);
        self.calibration_factor = factor;
        Ok(factor)
    }

    /// Pure conversion of an averaged raw reading.
    pub fn convert(&self, raw_average: i32) -> Measurement {
        let weight_units = weight_units(raw_average, self.tare_offset, self.calibration_factor);
        let volume_ml = volume_ml(weight_units, self.ml_per_unit);
        Measurement {
            weight_units,
            volume_ml,
            fill_percent: fill_percent(volume_ml, self.full_volume_ml),
        }
    }

    pub async fn sample(&mut self) -> Measurement {
        let raw = match self.read_average(self.average_window).await {
            Ok(raw) => {
                self.last_raw = Some(raw);
                raw
            }
            Err(e) => {
                let fallback = self.last_raw.unwrap_or(self.tare_offset);
                warn!("Load cell read failed ({}), reusing raw = {}", e, fallback);
                fallback
            }
        };
        self.convert(raw)
    }
}
