//! ADS1115 Precision ADC Driver
//!
//! Single-shot driver for the 16-bit four-channel ADC carrying the
//! directional coupler detectors and the heat spreader thermistor.
//! Each conversion is started on demand and completion is polled
//! through the OS bit; the comparator stays disabled throughout.

use embassy_time::{Duration, Timer};
use embedded_hal_async::i2c::I2c;

use crate::hal::i2c::{I2cAddress, I2cBus};

/// ADS1115 register addresses
mod reg {
    pub const CONVERSION: u8 = 0x00;
    pub const CONFIG: u8 = 0x01;
}

/// Config register fields
mod cfg {
    /// Start a single conversion / conversion complete flag
    pub const OS: u16 = 0x8000;
    /// Single-ended MUX base (AIN0 against ground)
    pub const MUX_SINGLE: u16 = 0x4000;
    /// PGA full scale 4.096 V
    pub const PGA_4_096V: u16 = 0x0200;
    /// Single-shot mode
    pub const MODE_SINGLE: u16 = 0x0100;
    /// 250 samples per second
    pub const DR_250SPS: u16 = 0x00A0;
    /// Comparator disabled
    pub const COMP_DISABLE: u16 = 0x0003;
}

/// One conversion period at 250 SPS, plus margin
const CONVERSION_DELAY: Duration = Duration::from_millis(5);

/// Single-ended input channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdsChannel {
    /// AIN0
    A0,
    /// AIN1
    A1,
    /// AIN2
    A2,
    /// AIN3
    A3,
}

impl AdsChannel {
    /// MUX field selecting this channel against ground
    const fn mux(self) -> u16 {
        let index = match self {
            Self::A0 => 0,
            Self::A1 => 1,
            Self::A2 => 2,
            Self::A3 => 3,
        };
        cfg::MUX_SINGLE | (index << 12)
    }
}

impl defmt::Format for AdsChannel {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::A0 => defmt::write!(f, "AIN0"),
            Self::A1 => defmt::write!(f, "AIN1"),
            Self::A2 => defmt::write!(f, "AIN2"),
            Self::A3 => defmt::write!(f, "AIN3"),
        }
    }
}

/// ADS1115 single-shot driver
pub struct Ads1115<B> {
    bus: I2cBus<B>,
    address: I2cAddress,
}

impl<B: I2c> Ads1115<B> {
    /// Create a driver owning its bus
    #[must_use]
    pub fn new(bus: I2cBus<B>, address: I2cAddress) -> Self {
        Self { bus, address }
    }

    /// Check the device responds to a config register read
    pub async fn probe(&mut self) -> bool {
        self.bus.read_reg16(self.address, reg::CONFIG).await.is_ok()
    }

    /// Run one single-shot conversion and return the signed code
    pub async fn read_raw(&mut self, channel: AdsChannel) -> Result<i16, B::Error> {
        let config = cfg::OS
            | channel.mux()
            | cfg::PGA_4_096V
            | cfg::MODE_SINGLE
            | cfg::DR_250SPS
            | cfg::COMP_DISABLE;
        self.bus.write_reg16(self.address, reg::CONFIG, config).await?;

        Timer::after(CONVERSION_DELAY).await;
        while self.bus.read_reg16(self.address, reg::CONFIG).await? & cfg::OS == 0 {
            Timer::after(Duration::from_millis(1)).await;
        }

        let mut buf = [0u8; 2];
        self.bus
            .write_read(self.address, &[reg::CONVERSION], &mut buf)
            .await?;
        Ok(i16::from_be_bytes(buf))
    }
}
