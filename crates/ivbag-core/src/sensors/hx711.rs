//! Bit-banged driver for the HX711 24-bit load cell amplifier
//!
//! The HX711 pulls DOUT low when a conversion is ready. The value is then
//! clocked out MSB first on PD_SCK, followed by 1 to 3 extra pulses that
//! select the channel and gain of the *next* conversion.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;
use log::error;
use thiserror_no_std::Error;

use super::{LoadCell, SensorError};

/// Holding PD_SCK high this long powers the chip down.
const POWER_MODE_CHANGE_DELAY_US: u32 = 60;
const CLK_HALF_PERIOD_US: u32 = 1;
const VALID_DATA_BITS: usize = 24;

/// DOUT polling cadence while waiting for a conversion.
const READY_POLL_INTERVAL_US: u32 = 1_000;
/// A conversion takes 100 ms at 10 SPS and up to 400 ms after power-up.
const READY_POLL_LIMIT: u32 = 500;

pub const RAW_MAX: i32 = 0x7F_FFFF;
pub const RAW_MIN: i32 = -0x80_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hx711Gain {
    Gain128,
    Gain64,
    Gain32ChannelB,
}

impl Hx711Gain {
    /// Total clock pulses per read: 24 data bits plus the gain selection pulses.
    const fn tick_count(self) -> usize {
        match self {
            Hx711Gain::Gain128 => 25,
            Hx711Gain::Gain64 => 27,
            Hx711Gain::Gain32ChannelB => 26,
        }
    }
}

#[derive(Error, Debug)]
pub enum Hx711Error<OutPinE, InPinE> {
    #[error("clock pin error: {0:?}")]
    OutPin(OutPinE),
    #[error("data pin error: {0:?}")]
    InPin(InPinE),
    /// DOUT never went low within the polling budget.
    #[error("no conversion ready")]
    NotReady,
}

pub struct Hx711<CLK, DATA, D> {
    clock_pin: CLK,
    data_pin: DATA,
    delay: D,
    gain_clocks: usize,
    powered_up: bool,
}

impl<CLK, DATA, D, ClkE, DataE> Hx711<CLK, DATA, D>
where
    CLK: OutputPin<Error = ClkE>,
    DATA: InputPin<Error = DataE>,
    D: DelayNs,
{
    pub fn new(clock_pin: CLK, data_pin: DATA, delay: D, gain: Hx711Gain) -> Self {
        Self {
            clock_pin,
            data_pin,
            delay,
            gain_clocks: gain.tick_count(),
            powered_up: false,
        }
    }

    pub fn is_powered_up(&self) -> bool {
        self.powered_up
    }

    /// Waits for DOUT to go low, giving up after a bounded number of polls.
    async fn wait_ready(&mut self) -> Result<(), Hx711Error<ClkE, DataE>> {
        for _ in 0..READY_POLL_LIMIT {
            if self.data_pin.is_low().map_err(Hx711Error::InPin)? {
                return Ok(());
            }
            self.delay.delay_us(READY_POLL_INTERVAL_US).await;
        }
        Err(Hx711Error::NotReady)
    }

    /// Clock out one 24-bit two's complement conversion.
    pub async fn read(&mut self) -> Result<i32, Hx711Error<ClkE, DataE>> {
        if !self.powered_up {
            self.power_up().await?;
        }

        self.wait_ready().await?;

        let mut data: i32 = 0;
        for _ in 0..self.gain_clocks {
            data <<= 1;
            self.clock_pin.set_high().map_err(Hx711Error::OutPin)?;
            self.delay.delay_us(CLK_HALF_PERIOD_US).await;
            self.clock_pin.set_low().map_err(Hx711Error::OutPin)?;
            if self.data_pin.is_high().map_err(Hx711Error::InPin)? {
                data |= 0x1;
            }
            self.delay.delay_us(CLK_HALF_PERIOD_US).await;
        }

        data >>= self.gain_clocks - VALID_DATA_BITS;
        data &= (1 << VALID_DATA_BITS) - 1;
        // extend sign if bit 24 is 1
        if (data >> 23) & 0x1 == 0x1 {
            data |= 0xFF00_0000_u32 as i32;
        }
        Ok(data)
    }

    pub async fn power_down(&mut self) -> Result<(), Hx711Error<ClkE, DataE>> {
        self.clock_pin.set_high().map_err(Hx711Error::OutPin)?;
        self.delay.delay_us(POWER_MODE_CHANGE_DELAY_US).await;
        self.powered_up = false;
        Ok(())
    }

    pub async fn power_up(&mut self) -> Result<(), Hx711Error<ClkE, DataE>> {
        self.clock_pin.set_low().map_err(Hx711Error::OutPin)?;
        self.delay.delay_us(POWER_MODE_CHANGE_DELAY_US).await;
        self.powered_up = true;
        Ok(())
    }
}

impl<CLK, DATA, D, ClkE, DataE> LoadCell for Hx711<CLK, DATA, D>
where
    CLK: OutputPin<Error = ClkE>,
    DATA: InputPin<Error = DataE>,
    D: DelayNs,
    ClkE: core::fmt::Debug,
    DataE: core::fmt::Debug,
{
    const RAW_MIN: i32 = RAW_MIN;
    const RAW_MAX: i32 = RAW_MAX;

    async fn read_raw(&mut self) -> Result<i32, SensorError> {
        self.read().await.map_err(|e| match e {
            Hx711Error::NotReady => SensorError::Timeout {
                sensor: "HX711",
                operation: "conversion ready",
            },
            other => {
                error!("HX711 read failed: {}", other);
                SensorError::ReadFailed {
                    sensor: "HX711",
                    operation: "clock out conversion",
                    details: "GPIO error",
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockDelay, MockInputPin, MockOutputPin};
    use embassy_futures::block_on;
    use std::vec::Vec;

    /// DOUT levels for a ready conversion of `value` followed by `extra` gain pulses.
    fn conversion(value: i32, extra: usize) -> Vec<bool> {
        let mut levels = Vec::new();
        levels.push(false); // DOUT low: ready
        for bit in (0..24).rev() {
            levels.push((value >> bit) & 1 == 1);
        }
        levels.extend(core::iter::repeat_n(true, extra));
        levels
    }

    #[test]
    fn reads_positive_value() {
        let data = MockInputPin::with_levels(conversion(0x01_2345, 1), true);
        let mut hx = Hx711::new(
            MockOutputPin::default(),
            data,
            MockDelay::default(),
            Hx711Gain::Gain128,
        );

        assert_eq!(block_on(hx.read()).unwrap(), 0x01_2345);
        assert!(hx.is_powered_up());
    }

    #[test]
    fn sign_extends_negative_value() {
        let data = MockInputPin::with_levels(conversion(-1234 & 0xFF_FFFF, 1), true);
        let mut hx = Hx711::new(
            MockOutputPin::default(),
            data,
            MockDelay::default(),
            Hx711Gain::Gain128,
        );

        assert_eq!(block_on(hx.read()).unwrap(), -1234);
    }

    #[test]
    fn gain_selects_pulse_count() {
        let data = MockInputPin::with_levels(conversion(RAW_MAX, 3), true);
        let mut hx = Hx711::new(
            MockOutputPin::default(),
            data,
            MockDelay::default(),
            Hx711Gain::Gain64,
        );

        assert_eq!(block_on(hx.read()).unwrap(), RAW_MAX);
        assert_eq!(hx.clock_pin.rising_edges, 27);
    }

    #[test]
    fn gives_up_when_never_ready() {
        // DOUT stays high: the chip never finishes a conversion
        let data = MockInputPin::with_levels([], true);
        let mut hx = Hx711::new(
            MockOutputPin::default(),
            data,
            MockDelay::default(),
            Hx711Gain::Gain128,
        );

        let err = block_on(hx.read_raw()).unwrap_err();
        assert!(matches!(err, SensorError::Timeout { sensor: "HX711", .. }));
        assert_eq!(hx.data_pin.reads, READY_POLL_LIMIT as usize);
        assert_eq!(hx.clock_pin.rising_edges, 0);
    }

    #[test]
    fn power_down_holds_clock_high() {
        let mut hx = Hx711::new(
            MockOutputPin::default(),
            MockInputPin::default(),
            MockDelay::default(),
            Hx711Gain::Gain128,
        );
        block_on(hx.power_down()).unwrap();

        assert!(hx.clock_pin.high);
        assert!(!hx.is_powered_up());
        assert!(hx.delay.total_ns >= u64::from(POWER_MODE_CHANGE_DELAY_US) * 1_000);
    }

    #[test]
    fn errors_describe_the_failure() {
        assert_eq!(Hx711Error::<(), ()>::NotReady.to_string(), "no conversion ready");
        assert_eq!(
            Hx711Error::<(), u8>::InPin(3).to_string(),
            "data pin error: 3"
        );
    }
}
