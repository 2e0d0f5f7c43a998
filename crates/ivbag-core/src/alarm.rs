//! Buzzer warning when the bag runs low

use embedded_hal::digital::OutputPin;
use log::{error, info, warn};

use crate::config::AlarmConfig;

pub struct LowLevelAlarm<P> {
    pin: P,
    threshold_percent: u8,
    release_percent: u8,
    active: bool,
}

impl<P: OutputPin> LowLevelAlarm<P> {
    pub fn new(pin: P, config: &AlarmConfig) -> Self {
        Self {
            pin,
            threshold_percent: config.threshold_percent,
            release_percent: config
                .threshold_percent
                .saturating_add(config.hysteresis_percent),
            active: false,
        }
    }

    /// Feed the latest fill level. Returns whether the buzzer is on.
    pub fn update(&mut self, fill_percent: u8) -> bool {
        let active = if self.active {
            fill_percent <= self.release_percent
        } else {
            fill_percent <= self.threshold_percent
        };

        if active != self.active {
            if active {
                warn!("IV bag low: {}%", fill_percent);
            } else {
                info!("IV bag level restored: {}%", fill_percent);
            }
            self.active = active;
        }

        // driven every update so a missed edge is corrected on the next one
        let result = if active {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(e) = result {
            error!("Buzzer pin error: {:?}", e);
        }
        self.active
    }
}
