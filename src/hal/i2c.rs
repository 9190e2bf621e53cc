//! I2C Bus Abstractions
//!
//! Thin wrapper used by the ADS1115 and display drivers. Generic over
//! the async `embedded-hal` I2C trait so the drivers stay independent
//! of the concrete RP2040 controller instance behind them.

use embedded_hal_async::i2c::I2c;

use crate::config;

/// I2C device address wrapper
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct I2cAddress(u8);

impl I2cAddress {
    /// ADS1115 precision ADC address (ADDR pin to GND)
    pub const ADS1115: Self = Self(config::ADS1115_I2C_ADDR);

    /// PCF8574 display backpack address
    pub const LCD_BACKPACK: Self = Self(config::LCD_I2C_ADDR);

    /// Create from 7-bit address
    #[must_use]
    pub const fn new(addr: u8) -> Self {
        Self(addr & 0x7F)
    }

    /// Get the 7-bit address
    #[must_use]
    pub const fn addr(self) -> u8 {
        self.0
    }
}

impl defmt::Format for I2cAddress {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "0x{:02X}", self.0);
    }
}

/// I2C bus wrapper
pub struct I2cBus<B> {
    i2c: B,
}

impl<B: I2c> I2cBus<B> {
    /// Create a new I2C bus wrapper
    #[must_use]
    pub fn new(i2c: B) -> Self {
        Self { i2c }
    }

    /// Write bytes to a device
    pub async fn write(&mut self, addr: I2cAddress, data: &[u8]) -> Result<(), B::Error> {
        self.i2c.write(addr.addr(), data).await
    }

    /// Write then read (combined transaction)
    pub async fn write_read(
        &mut self,
        addr: I2cAddress,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), B::Error> {
        self.i2c.write_read(addr.addr(), write, read).await
    }

    /// Write a 16-bit big-endian register
    pub async fn write_reg16(
        &mut self,
        addr: I2cAddress,
        reg: u8,
        value: u16,
    ) -> Result<(), B::Error> {
        let bytes = value.to_be_bytes();
        self.i2c.write(addr.addr(), &[reg, bytes[0], bytes[1]]).await
    }

    /// Read a 16-bit big-endian register
    pub async fn read_reg16(&mut self, addr: I2cAddress, reg: u8) -> Result<u16, B::Error> {
        let mut buf = [0u8; 2];
        self.i2c.write_read(addr.addr(), &[reg], &mut buf).await?;
        Ok(u16::from_be_bytes(buf))
    }
}
