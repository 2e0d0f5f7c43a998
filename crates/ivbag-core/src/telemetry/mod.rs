//! Rate-limited upload of measurements to a ThingSpeak channel

pub mod http;
pub mod payload;

pub use payload::{PayloadError, TelemetryPayload};

use embassy_time::{Duration, Instant};
use log::{debug, error, info};

use crate::config::TelemetryConfig;
use crate::connectivity::ConnectionState;
use crate::scale::Measurement;

/// Status code of an accepted write.
pub const STATUS_OK: i32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCredentials<'a> {
    pub channel_id: u32,
    pub write_key: &'a str,
}

/// Something that can push field values to a channel.
pub trait TelemetryTransport {
    type Error: core::fmt::Debug;

    /// Returns the service's status code; [`STATUS_OK`] means the entry was stored.
    fn write_fields(
        &mut self,
        credentials: &ChannelCredentials<'_>,
        payload: &TelemetryPayload,
    ) -> impl Future<Output = Result<i32, Self::Error>>;
}

/// Earliest time the next upload may happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSchedule {
    last_upload: Instant,
    interval: Duration,
}

impl UploadSchedule {
    pub fn new(start: Instant, interval: Duration) -> Self {
        Self {
            last_upload: start,
            interval,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        // a clock that went backwards reads as "not due"
        now.saturating_duration_since(self.last_upload) >= self.interval
    }

    pub fn mark(&mut self, now: Instant) {
        self.last_upload = now;
    }

    pub fn last_upload(&self) -> Instant {
        self.last_upload
    }

    pub fn next_due(&self) -> Instant {
        self.last_upload + self.interval
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Offline,
    NotDue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFailure {
    /// The service answered with something other than [`STATUS_OK`].
    Status(i32),
    Transport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Skipped(SkipReason),
    Uploaded,
    Failed(UploadFailure),
}

pub struct TelemetryUploader<'a, T> {
    transport: T,
    credentials: ChannelCredentials<'a>,
    schedule: UploadSchedule,
}

impl<'a, T: TelemetryTransport> TelemetryUploader<'a, T> {
    pub fn new(transport: T, config: &TelemetryConfig<'a>, start: Instant) -> Self {
        Self {
            transport,
            credentials: ChannelCredentials {
                channel_id: config.channel_id,
                write_key: config.write_key,
            },
            schedule: UploadSchedule::new(start, Duration::from_millis(config.interval_ms)),
        }
    }

    pub fn schedule(&self) -> &UploadSchedule {
        &self.schedule
    }

    /// Restart the interval from `now`, e.g. once startup has finished.
    pub fn reset_schedule(&mut self, now: Instant) {
        self.schedule.mark(now);
    }

    /// Uploads `measurement` if online and due. At most one write per call.
    pub async fn maybe_upload(
        &mut self,
        now: Instant,
        measurement: &Measurement,
        state: ConnectionState,
    ) -> UploadOutcome {
        if !state.is_connected() {
            return UploadOutcome::Skipped(SkipReason::Offline);
        }
        if !self.schedule.is_due(now) {
            return UploadOutcome::Skipped(SkipReason::NotDue);
        }

        let payload = TelemetryPayload::from_measurement(measurement);
        debug!(
            "Uploading to channel {}: {} mL, {}%",
            self.credentials.channel_id, measurement.volume_ml, measurement.fill_percent
        );
        let result = self.transport.write_fields(&self.credentials, &payload).await;
        // failed attempts also wait a full interval
        self.schedule.mark(now);

        match result {
            Ok(STATUS_OK) => {
                info!("Data sent to ThingSpeak");
                UploadOutcome::Uploaded
            }
            Ok(status) => {
                error!("Error sending data to ThingSpeak: HTTP status {}", status);
                UploadOutcome::Failed(UploadFailure::Status(status))
            }
            Err(e) => {
                error!("Error sending data to ThingSpeak: {:?}", e);
                UploadOutcome::Failed(UploadFailure::Transport)
            }
        }
    }
}
