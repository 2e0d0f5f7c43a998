//! Test doubles for the hardware seams.

use core::cell::Cell;
use core::convert::Infallible;
use std::collections::VecDeque;
use std::string::String;
use std::vec::Vec;

use embassy_time::{Duration, Instant};
use embedded_hal::digital::{ErrorType as DigitalErrorType, InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{ErrorType as I2cErrorType, I2c, Operation};

use crate::connectivity::Link;
use crate::display::DisplaySink;
use crate::sensors::{LoadCell, SensorError};
use crate::telemetry::{ChannelCredentials, TelemetryPayload, TelemetryTransport};
use crate::time::Clock;

/// Delay that returns immediately and records how long it was asked to wait.
#[derive(Debug, Default)]
pub struct MockDelay {
    pub total_ns: u64,
    pub calls: usize,
}

impl MockDelay {
    pub fn total_ms(&self) -> u64 {
        self.total_ns / 1_000_000
    }
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
        self.calls += 1;
    }
}

#[derive(Debug, Default)]
pub struct MockOutputPin {
    pub high: bool,
    pub rising_edges: usize,
}

impl DigitalErrorType for MockOutputPin {
    type Error = Infallible;
}

impl OutputPin for MockOutputPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if !self.high {
            self.rising_edges += 1;
        }
        self.high = true;
        Ok(())
    }
}

/// Input pin replaying a scripted sequence of levels, one per read.
#[derive(Debug, Default)]
pub struct MockInputPin {
    pub levels: VecDeque<bool>,
    pub idle_level: bool,
    pub reads: usize,
}

impl MockInputPin {
    pub fn with_levels(levels: impl IntoIterator<Item = bool>, idle_level: bool) -> Self {
        Self {
            levels: levels.into_iter().collect(),
            idle_level,
            reads: 0,
        }
    }

    fn next_level(&mut self) -> bool {
        self.reads += 1;
        self.levels.pop_front().unwrap_or(self.idle_level)
    }
}

impl DigitalErrorType for MockInputPin {
    type Error = Infallible;
}

impl InputPin for MockInputPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.next_level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.next_level())
    }
}

/// Load cell replaying scripted readings, then repeating `fallback`.
#[derive(Debug, Default)]
pub struct MockLoadCell {
    pub readings: VecDeque<Result<i32, SensorError>>,
    pub fallback: i32,
    pub reads: usize,
}

impl MockLoadCell {
    pub fn constant(raw: i32) -> Self {
        Self {
            fallback: raw,
            ..Default::default()
        }
    }

    pub fn scripted(readings: impl IntoIterator<Item = Result<i32, SensorError>>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
            ..Default::default()
        }
    }
}

pub const MOCK_READ_ERROR: SensorError = SensorError::ReadFailed {
    sensor: "mock",
    operation: "read",
    details: "scripted failure",
};

impl LoadCell for MockLoadCell {
    const RAW_MIN: i32 = -0x80_0000;
    const RAW_MAX: i32 = 0x7F_FFFF;

    async fn read_raw(&mut self) -> Result<i32, SensorError> {
        self.reads += 1;
        self.readings.pop_front().unwrap_or(Ok(self.fallback))
    }
}

/// Link whose liveness answers are scripted; `idle` is returned once the script runs out.
#[derive(Debug, Default)]
pub struct MockLink {
    pub liveness: VecDeque<bool>,
    pub idle: bool,
    pub liveness_checks: usize,
    pub disconnects: usize,
    pub reconnects: usize,
    pub fail_requests: bool,
}

impl MockLink {
    pub fn up() -> Self {
        Self {
            idle: true,
            ..Default::default()
        }
    }

    pub fn down() -> Self {
        Self::default()
    }

    pub fn scripted(liveness: impl IntoIterator<Item = bool>, idle: bool) -> Self {
        Self {
            liveness: liveness.into_iter().collect(),
            idle,
            ..Default::default()
        }
    }
}

impl Link for MockLink {
    type Error = &'static str;

    fn is_connected(&mut self) -> bool {
        self.liveness_checks += 1;
        self.liveness.pop_front().unwrap_or(self.idle)
    }

    async fn disconnect(&mut self) -> Result<(), Self::Error> {
        self.disconnects += 1;
        if self.fail_requests {
            Err("disconnect refused")
        } else {
            Ok(())
        }
    }

    async fn reconnect(&mut self) -> Result<(), Self::Error> {
        self.reconnects += 1;
        if self.fail_requests {
            Err("reconnect refused")
        } else {
            Ok(())
        }
    }
}

/// Transport answering with scripted statuses; `Err(())` simulates a transport failure.
#[derive(Debug, Default)]
pub struct MockTransport {
    pub responses: VecDeque<Result<i32, ()>>,
    pub writes: usize,
    pub last_payload: Option<TelemetryPayload>,
    pub last_channel: Option<u32>,
}

impl MockTransport {
    pub fn answering(responses: impl IntoIterator<Item = Result<i32, ()>>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
            ..Default::default()
        }
    }
}

impl TelemetryTransport for MockTransport {
    type Error = &'static str;

    async fn write_fields(
        &mut self,
        credentials: &ChannelCredentials<'_>,
        payload: &TelemetryPayload,
    ) -> Result<i32, Self::Error> {
        self.writes += 1;
        self.last_payload = Some(payload.clone());
        self.last_channel = Some(credentials.channel_id);
        match self.responses.pop_front().unwrap_or(Ok(200)) {
            Ok(status) => Ok(status),
            Err(()) => Err("connection reset"),
        }
    }
}

#[derive(Debug)]
pub struct MockClock {
    now: Cell<Instant>,
}

impl MockClock {
    pub fn at_ms(ms: u64) -> Self {
        Self {
            now: Cell::new(Instant::from_millis(ms)),
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now.set(self.now.get() + Duration::from_millis(ms));
    }
}

impl Clock for &MockClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

#[derive(Debug, Default)]
pub struct MockDisplay {
    pub clears: usize,
    pub lines: Vec<(u8, u8, String)>,
}

impl MockDisplay {
    pub fn text_at(&self, column: u8, row: u8) -> Option<&str> {
        self.lines
            .iter()
            .rev()
            .find(|(c, r, _)| *c == column && *r == row)
            .map(|(_, _, text)| text.as_str())
    }
}

impl DisplaySink for MockDisplay {
    async fn clear(&mut self) {
        self.clears += 1;
        self.lines.clear();
    }

    async fn write_at(&mut self, column: u8, row: u8, text: &str) {
        self.lines.push((column, row, String::from(text)));
    }
}

/// I2C bus that records every written byte per address.
#[derive(Debug, Default)]
pub struct MockI2c {
    pub writes: Vec<(u8, Vec<u8>)>,
}

impl MockI2c {
    pub fn written_bytes(&self) -> Vec<u8> {
        self.writes.iter().flat_map(|(_, bytes)| bytes.iter().copied()).collect()
    }
}

impl I2cErrorType for MockI2c {
    type Error = Infallible;
}

impl I2c for MockI2c {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for operation in operations {
            match operation {
                Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                Operation::Read(buffer) => buffer.fill(0),
            }
        }
        Ok(())
    }
}
