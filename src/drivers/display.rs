//! Character Display Driver
//!
//! HD44780 16x2 module behind a PCF8574 I2C backpack, driven in
//! 4-bit mode. Backpack wiring: P0=RS, P1=RW, P2=E, P3=backlight,
//! P4..P7=D4..D7.

use embassy_time::{Duration, Timer};
use embedded_hal_async::i2c::I2c;

use crate::hal::i2c::{I2cAddress, I2cBus};

/// Characters per line
pub const COLUMNS: usize = 16;

/// Number of lines
pub const ROWS: usize = 2;

/// PCF8574 bit masks
mod mask {
    pub const RS: u8 = 0x01;
    pub const ENABLE: u8 = 0x04;
    pub const BACKLIGHT: u8 = 0x08;
}

/// HD44780 commands
mod cmd {
    pub const CLEAR: u8 = 0x01;
    pub const ENTRY_MODE_INCREMENT: u8 = 0x06;
    pub const DISPLAY_ON: u8 = 0x0C;
    pub const FUNCTION_4BIT_2LINE: u8 = 0x28;
    pub const SET_DDRAM_ADDR: u8 = 0x80;
}

/// DDRAM base address per row
const ROW_OFFSETS: [u8; ROWS] = [0x00, 0x40];

/// Character LCD driver
pub struct Lcd<B> {
    bus: I2cBus<B>,
    address: I2cAddress,
    backlight: u8,
}

impl<B: I2c> Lcd<B> {
    /// Create a driver owning its bus, backlight on
    #[must_use]
    pub fn new(bus: I2cBus<B>, address: I2cAddress) -> Self {
        Self {
            bus,
            address,
            backlight: mask::BACKLIGHT,
        }
    }

    /// Initialize the controller into 4-bit mode
    pub async fn init(&mut self) -> Result<(), B::Error> {
        Timer::after(Duration::from_millis(50)).await;

        // Force 8-bit mode three times, then drop to 4-bit
        self.write_nibble(0x30, false).await?;
        Timer::after(Duration::from_millis(5)).await;
        self.write_nibble(0x30, false).await?;
        Timer::after(Duration::from_micros(150)).await;
        self.write_nibble(0x30, false).await?;
        Timer::after(Duration::from_micros(150)).await;
        self.write_nibble(0x20, false).await?;
        Timer::after(Duration::from_micros(150)).await;

        self.command(cmd::FUNCTION_4BIT_2LINE).await?;
        self.command(cmd::DISPLAY_ON).await?;
        self.command(cmd::ENTRY_MODE_INCREMENT).await?;
        self.clear().await
    }

    /// Clear the display
    pub async fn clear(&mut self) -> Result<(), B::Error> {
        self.command(cmd::CLEAR).await?;
        Timer::after(Duration::from_millis(2)).await;
        Ok(())
    }

    /// Write one row, padded or truncated to the full width
    pub async fn write_line(&mut self, row: usize, text: &str) -> Result<(), B::Error> {
        let row = row.min(ROWS - 1);
        self.command(cmd::SET_DDRAM_ADDR | ROW_OFFSETS[row]).await?;
        for byte in text.bytes().chain(core::iter::repeat(b' ')).take(COLUMNS) {
            self.data(byte).await?;
        }
        Ok(())
    }

    async fn command(&mut self, value: u8) -> Result<(), B::Error> {
        self.send(value, false).await
    }

    async fn data(&mut self, value: u8) -> Result<(), B::Error> {
        self.send(value, true).await
    }

    /// Send a byte as high nibble then low nibble
    async fn send(&mut self, value: u8, rs: bool) -> Result<(), B::Error> {
        self.write_nibble(value & 0xF0, rs).await?;
        self.write_nibble(value << 4, rs).await
    }

    /// Latch one nibble with an enable pulse
    ///
    /// The bus transaction time at 400 kHz already exceeds the E pulse
    /// and hold requirements; only the post-latch settle is explicit.
    async fn write_nibble(&mut self, nibble: u8, rs: bool) -> Result<(), B::Error> {
        let data = (nibble & 0xF0) | self.backlight | if rs { mask::RS } else { 0 };
        self.bus.write(self.address, &[data | mask::ENABLE]).await?;
        self.bus.write(self.address, &[data]).await?;
        Timer::after(Duration::from_micros(50)).await;
        Ok(())
    }
}
