//! HD44780 character LCD behind a PCF8574 I2C backpack
//!
//! The expander drives the LCD in 4-bit mode:
//!
//! | P7..P4 | P3        | P2 | P1 | P0 |
//! |--------|-----------|----|----|----|
//! | D7..D4 | backlight | EN | RW | RS |

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::error;
use thiserror_no_std::Error;

use super::{DISPLAY_COLUMNS, DISPLAY_ROWS, DisplaySink};

/// Address of the common backpack with A0..A2 pulled high.
pub const DEFAULT_ADDRESS: u8 = 0x27;

const BACKLIGHT: u8 = 0x08;
const ENABLE: u8 = 0x04;
const REGISTER_SELECT: u8 = 0x01;

const CMD_CLEAR_DISPLAY: u8 = 0x01;
const CMD_RETURN_HOME: u8 = 0x02;
const CMD_ENTRY_MODE_SET: u8 = 0x04;
const CMD_DISPLAY_CONTROL: u8 = 0x08;
const CMD_FUNCTION_SET: u8 = 0x20;
const CMD_SET_DDRAM_ADDR: u8 = 0x80;

const ENTRY_LEFT: u8 = 0x02;
const DISPLAY_ON: u8 = 0x04;
const TWO_LINE: u8 = 0x08;

/// DDRAM address of the first cell of each row on a 20x4 panel.
const ROW_OFFSETS: [u8; DISPLAY_ROWS as usize] = [0x00, 0x40, 0x14, 0x54];

#[derive(Error, Debug)]
pub enum LcdError<E> {
    #[error("I2C transfer failed: {0:?}")]
    I2c(E),
    #[error("cell ({column}, {row}) is outside the display")]
    OutOfRange { column: u8, row: u8 },
}

pub struct Lcd<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    backlight: u8,
}

impl<I2C: I2c, D: DelayNs> Lcd<I2C, D> {
    pub fn new(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
            backlight: BACKLIGHT,
        }
    }

    /// Power-on initialisation into 4-bit, two-line mode with the cursor hidden.
    pub async fn init(&mut self) -> Result<(), LcdError<I2C::Error>> {
        // controller needs >40 ms after Vcc rises
        self.delay.delay_ms(50).await;
        self.expander_write(0).await?;
        self.delay.delay_ms(1).await;

        // forced reset into 8-bit mode, then switch to 4-bit
        self.write_nibble(0x30).await?;
        self.delay.delay_us(4_500).await;
        self.write_nibble(0x30).await?;
        self.delay.delay_us(4_500).await;
        self.write_nibble(0x30).await?;
        self.delay.delay_us(150).await;
        self.write_nibble(0x20).await?;

        self.command(CMD_FUNCTION_SET | TWO_LINE).await?;
        self.command(CMD_DISPLAY_CONTROL | DISPLAY_ON).await?;
        self.clear().await?;
        self.command(CMD_ENTRY_MODE_SET | ENTRY_LEFT).await?;
        self.command(CMD_RETURN_HOME).await?;
        self.delay.delay_ms(2).await;
        Ok(())
    }

    pub async fn clear(&mut self) -> Result<(), LcdError<I2C::Error>> {
        self.command(CMD_CLEAR_DISPLAY).await?;
        self.delay.delay_ms(2).await;
        Ok(())
    }

    pub async fn set_cursor(&mut self, column: u8, row: u8) -> Result<(), LcdError<I2C::Error>> {
        if column >= DISPLAY_COLUMNS || row >= DISPLAY_ROWS {
            return Err(LcdError::OutOfRange { column, row });
        }
        self.command(CMD_SET_DDRAM_ADDR | (ROW_OFFSETS[row as usize] + column))
            .await
    }

    /// Characters outside printable ASCII are shown as `?`.
    pub async fn print(&mut self, text: &str) -> Result<(), LcdError<I2C::Error>> {
        for c in text.chars() {
            let byte = if c.is_ascii() && !c.is_ascii_control() {
                c as u8
            } else {
                b'?'
            };
            self.send(byte, REGISTER_SELECT).await?;
        }
        Ok(())
    }

    pub async fn set_backlight(&mut self, on: bool) -> Result<(), LcdError<I2C::Error>> {
        self.backlight = if on { BACKLIGHT } else { 0 };
        self.expander_write(0).await
    }

    async fn command(&mut self, value: u8) -> Result<(), LcdError<I2C::Error>> {
        self.send(value, 0).await
    }

    async fn send(&mut self, value: u8, mode: u8) -> Result<(), LcdError<I2C::Error>> {
        self.write_nibble((value & 0xF0) | mode).await?;
        self.write_nibble(((value << 4) & 0xF0) | mode).await
    }

    async fn write_nibble(&mut self, value: u8) -> Result<(), LcdError<I2C::Error>> {
        self.expander_write(value).await?;
        self.expander_write(value | ENABLE).await?;
        self.delay.delay_us(1).await;
        self.expander_write(value & !ENABLE).await?;
        // commands need >37 us to settle
        self.delay.delay_us(50).await;
        Ok(())
    }

    async fn expander_write(&mut self, value: u8) -> Result<(), LcdError<I2C::Error>> {
        self.i2c
            .write(self.address, &[value | self.backlight])
            .await
            .map_err(LcdError::I2c)
    }
}

impl<I2C: I2c, D: DelayNs> DisplaySink for Lcd<I2C, D> {
    async fn clear(&mut self) {
        if let Err(e) = Lcd::clear(self).await {
            error!("LCD clear failed: {}", e);
        }
    }

    async fn write_at(&mut self, column: u8, row: u8, text: &str) {
        if let Err(e) = self.set_cursor(column, row).await {
            error!("LCD cursor move failed: {}", e);
            return;
        }

        let room = usize::from(DISPLAY_COLUMNS - column);
        let end = text
            .char_indices()
            .nth(room)
            .map_or(text.len(), |(index, _)| index);
        if let Err(e) = self.print(&text[..end]).await {
            error!("LCD write failed: {}", e);
        }
    }
}
