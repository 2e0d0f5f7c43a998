//! Hardware-independent core library for ivbag
//!
//! This crate contains all platform-agnostic logic for the IV bag monitor:
//! load cell conversion, WiFi supervision, ThingSpeak telemetry scheduling,
//! the 20x4 character display layout and the main monitoring loop, plus the
//! trait seams the firmware and the simulator plug their hardware into.
//!
//! It is `#![no_std]` so it compiles on both embedded targets (ESP32) and
//! desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

pub mod alarm;
pub mod app_state;
pub mod config;
pub mod connectivity;
pub mod display;
pub mod monitor;
pub mod scale;
pub mod sensors;
pub mod telemetry;
pub mod time;

#[cfg(test)]
pub(crate) mod testing;
