//! WiFi connection supervision with a bounded reconnect budget
//!
//! ```text
//!            liveness ok
//!   ┌──────────────────────────────┐
//!   ▼                              │
//! Connected ──check fails──► Disconnected ──► Reconnecting ──poll ok──► Connected
//!                                                 │
//!                                    budget spent ▼
//!                                          ReconnectFailed
//! ```
//!
//! `ReconnectFailed` is not sticky: the next check that finds the link down
//! starts a fresh recovery, and a check that finds it up goes straight back
//! to `Connected`.

use embedded_hal_async::delay::DelayNs;
use log::{debug, error, info, warn};

use crate::config::ReconnectConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Reconnecting,
    ReconnectFailed,
}

impl ConnectionState {
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Reconnecting => "reconnecting",
            Self::ReconnectFailed => "reconnect failed",
        }
    }
}

/// Liveness and reconnect primitives of a network stack.
///
/// All operations are idempotent; the supervisor may call them repeatedly.
/// `reconnect` must itself be bounded in time.
pub trait Link {
    type Error: core::fmt::Debug;

    fn is_connected(&mut self) -> bool;

    fn disconnect(&mut self) -> impl Future<Output = Result<(), Self::Error>>;

    fn reconnect(&mut self) -> impl Future<Output = Result<(), Self::Error>>;
}

pub struct ConnectivitySupervisor<L, D> {
    link: L,
    delay: D,
    state: ConnectionState,
    max_attempts: u32,
    poll_interval_ms: u32,
}

impl<L: Link, D: DelayNs> ConnectivitySupervisor<L, D> {
    /// Starts out `Connected`: bring-up is expected to have joined the network.
    pub fn new(link: L, delay: D, config: &ReconnectConfig) -> Self {
        Self {
            link,
            delay,
            state: ConnectionState::Connected,
            max_attempts: config.max_attempts.max(1),
            poll_interval_ms: config.poll_interval_ms,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Worst case time spent polling in one recovery.
    pub fn max_poll_time_ms(&self) -> u64 {
        u64::from(self.max_attempts) * u64::from(self.poll_interval_ms)
    }

    /// Join the network at startup, with the same bounded budget as a recovery.
    pub async fn connect_initial(&mut self) -> ConnectionState {
        if self.link.is_connected() {
            self.state = ConnectionState::Connected;
            return self.state;
        }

        info!("Connecting to WiFi...");
        self.state = ConnectionState::Reconnecting;
        self.request_reconnect().await;
        self.poll_until_connected().await
    }

    /// Called once per loop iteration.
    pub async fn check_and_maybe_reconnect(&mut self) -> ConnectionState {
        if self.link.is_connected() {
            if self.state != ConnectionState::Connected {
                info!("WiFi link is up again");
            }
            self.state = ConnectionState::Connected;
            return self.state;
        }

        self.state = ConnectionState::Disconnected;
        warn!("WiFi disconnected! Reconnecting...");
        self.recover().await
    }

    async fn recover(&mut self) -> ConnectionState {
        self.state = ConnectionState::Reconnecting;
        if let Err(e) = self.link.disconnect().await {
            warn!("WiFi disconnect request failed: {:?}", e);
        }
        self.request_reconnect().await;
        self.poll_until_connected().await
    }

    async fn request_reconnect(&mut self) {
        if let Err(e) = self.link.reconnect().await {
            warn!("WiFi reconnect request failed: {:?}", e);
        }
    }

    async fn poll_until_connected(&mut self) -> ConnectionState {
        for attempt in 1..=self.max_attempts {
            self.delay.delay_ms(self.poll_interval_ms).await;
            if self.link.is_connected() {
                info!("Reconnected to WiFi after {} polls", attempt);
                self.state = ConnectionState::Connected;
                return self.state;
            }
            debug!("WiFi still down ({}/{})", attempt, self.max_attempts);
        }

        error!("WiFi reconnect failed after {} polls", self.max_attempts);
        self.state = ConnectionState::ReconnectFailed;
        self.state
    }
}
