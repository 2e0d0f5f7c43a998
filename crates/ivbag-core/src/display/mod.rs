//! 20x4 character display output

pub mod lcd;

pub use lcd::{Lcd, LcdError};

use core::fmt::Write;

use heapless::String;

use crate::connectivity::ConnectionState;
use crate::scale::Measurement;

pub const DISPLAY_COLUMNS: u8 = 20;
pub const DISPLAY_ROWS: u8 = 4;

pub const TITLE: &str = "IOT Based IV Bag";
pub const SUBTITLE: &str = "Monitoring System";
pub const OFFLINE_MARKER: &str = "!";

/// Character grid sink. Failures stay inside the implementation.
pub trait DisplaySink {
    fn clear(&mut self) -> impl Future<Output = ()>;

    /// Writes `text` starting at `(column, row)`. Text past the last column is dropped.
    fn write_at(&mut self, column: u8, row: u8, text: &str) -> impl Future<Output = ()>;
}

/// Room for the widest formatted row; the sink clips to the grid.
type Line = String<32>;

/// Title rows shown from boot onwards.
pub async fn render_splash<S: DisplaySink>(display: &mut S) {
    display.clear().await;
    display.write_at(1, 0, TITLE).await;
    display.write_at(2, 1, SUBTITLE).await;
}

/// A status line on the measurement rows, used during startup.
pub async fn render_message<S: DisplaySink>(display: &mut S, message: &str) {
    render_splash(display).await;
    display.write_at(1, 2, message).await;
}

pub async fn render_measurement<S: DisplaySink>(
    display: &mut S,
    measurement: &Measurement,
    connection: ConnectionState,
) {
    render_splash(display).await;

    let mut line = Line::new();
    let _ = write!(line, "IV Bottle = {} mL", measurement.volume_ml);
    display.write_at(1, 2, &line).await;

    line.clear();
    let _ = write!(line, "IV Bag Percent={}%", measurement.fill_percent);
    display.write_at(1, 3, &line).await;

    if !connection.is_connected() {
        display.write_at(DISPLAY_COLUMNS - 1, 0, OFFLINE_MARKER).await;
    }
}
