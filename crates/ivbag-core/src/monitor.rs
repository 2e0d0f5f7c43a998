//! The monitoring loop
//!
//! One [`Monitor`] owns every part of the device. After [`Monitor::start`]
//! each call to [`Monitor::run_once`] performs exactly one iteration:
//!
//! 1. connectivity check (may block for the bounded reconnect budget)
//! 2. averaged load cell sample
//! 3. display refresh and low-level alarm update
//! 4. upload attempt if online and due
//!
//! [`Monitor::run`] repeats that forever with no extra delay; the load cell
//! conversion time paces the loop.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use log::{info, warn};

use crate::alarm::LowLevelAlarm;
use crate::app_state::{AppError, AppRunState};
use crate::config::Config;
use crate::connectivity::{ConnectionState, ConnectivitySupervisor, Link};
use crate::display::{DisplaySink, render_measurement, render_message};
use crate::scale::{Measurement, Scale};
use crate::sensors::LoadCell;
use crate::telemetry::{TelemetryTransport, TelemetryUploader, UploadOutcome};
use crate::time::Clock;

/// Hardware handed to [`Monitor::new`].
pub struct Peripherals<L, N, D, T, S, P> {
    pub load_cell: L,
    pub link: N,
    /// Delay used between reconnect polls.
    pub delay: D,
    pub transport: T,
    pub display: S,
    pub buzzer: P,
}

/// What one loop iteration saw and did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationReport {
    pub connection: ConnectionState,
    pub measurement: Measurement,
    pub upload: UploadOutcome,
    pub alarm_active: bool,
}

pub struct Monitor<'a, L, N, D, T, S, P, C> {
    scale: Scale<L>,
    connectivity: ConnectivitySupervisor<N, D>,
    uploader: TelemetryUploader<'a, T>,
    display: S,
    alarm: LowLevelAlarm<P>,
    clock: C,
    run_state: AppRunState,
}

impl<'a, L, N, D, T, S, P, C> Monitor<'a, L, N, D, T, S, P, C>
where
    L: LoadCell,
    N: Link,
    D: DelayNs,
    T: TelemetryTransport,
    S: DisplaySink,
    P: OutputPin,
    C: Clock,
{
    pub fn new(
        peripherals: Peripherals<L, N, D, T, S, P>,
        clock: C,
        config: &Config<'a>,
    ) -> Result<Self, AppError> {
        config.validate()?;

        let now = clock.now();
        Ok(Self {
            scale: Scale::new(peripherals.load_cell, &config.scale),
            connectivity: ConnectivitySupervisor::new(
                peripherals.link,
                peripherals.delay,
                &config.reconnect,
            ),
            uploader: TelemetryUploader::new(peripherals.transport, &config.telemetry, now),
            display: peripherals.display,
            alarm: LowLevelAlarm::new(peripherals.buzzer, &config.alarm),
            clock,
            run_state: AppRunState::Booting,
        })
    }

    pub fn run_state(&self) -> AppRunState {
        self.run_state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connectivity.state()
    }

    pub fn scale(&self) -> &Scale<L> {
        &self.scale
    }

    pub fn display(&self) -> &S {
        &self.display
    }

    pub fn uploader(&self) -> &TelemetryUploader<'a, T> {
        &self.uploader
    }

    async fn enter(&mut self, state: AppRunState) {
        info!("Run state: {:?}", state);
        self.run_state = state;
        render_message(&mut self.display, state.label()).await;
    }

    /// Splash, tare, then join the network.
    ///
    /// Only a failed tare is an error; the monitor starts offline if the
    /// network cannot be joined within the reconnect budget.
    pub async fn start(&mut self) -> Result<(), AppError> {
        self.enter(AppRunState::Booting).await;

        self.enter(AppRunState::Taring).await;
        info!("Remove all weight from scale");
        let zero = self.scale.tare().await?;
        info!("Zero factor: {}", zero);
        info!("Calibration factor: {}", self.scale.calibration_factor());

        self.enter(AppRunState::WifiConnecting).await;
        let connection = self.connectivity.connect_initial().await;
        if connection.is_connected() {
            info!("Connected to WiFi");
        } else {
            warn!("WiFi {}, monitoring offline", connection.label());
        }
        render_message(&mut self.display, connection.label()).await;

        self.uploader.reset_schedule(self.clock.now());
        self.run_state = AppRunState::Monitoring;
        info!("Run state: {:?}", self.run_state);
        Ok(())
    }

    pub async fn run_once(&mut self) -> IterationReport {
        let connection = self.connectivity.check_and_maybe_reconnect().await;

        let measurement = self.scale.sample().await;
        info!(
            "IV Bottle: {} mL, IV Bag Percent: {}%",
            measurement.volume_ml, measurement.fill_percent
        );

        render_measurement(&mut self.display, &measurement, connection).await;
        let alarm_active = self.alarm.update(measurement.fill_percent);

        let now = self.clock.now();
        let upload = self
            .uploader
            .maybe_upload(now, &measurement, connection)
            .await;

        IterationReport {
            connection,
            measurement,
            upload,
            alarm_active,
        }
    }

    pub async fn run(&mut self) {
        loop {
            self.run_once().await;
        }
    }
}
