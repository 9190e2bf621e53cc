//! On-chip ADC Driver
//!
//! Reads the three supervisor rails sampled every control tick:
//! drain voltage, drain current, and the supply rail. These are the
//! fast protection inputs; the slow detector and thermistor channels
//! go through the external ADS1115 instead.

use embassy_rp::adc::{Adc, Async, Channel, Error};

/// Raw codes from one supervisor scan
#[derive(Clone, Copy, Debug)]
pub struct SupervisorScan {
    /// Drain voltage divider code
    pub drain_voltage: u16,
    /// Drain current hall sensor code
    pub drain_current: u16,
    /// Supply rail divider code
    pub supply_voltage: u16,
}

impl defmt::Format for SupervisorScan {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "Scan(vd={} id={} vcc={})",
            self.drain_voltage,
            self.drain_current,
            self.supply_voltage
        );
    }
}

/// Supervisor ADC driver for the fast protection channels
pub struct SupervisorAdc<'d> {
    adc: Adc<'d, Async>,
    drain_voltage: Channel<'d>,
    drain_current: Channel<'d>,
    supply_voltage: Channel<'d>,
}

impl<'d> SupervisorAdc<'d> {
    /// Create a supervisor ADC over the three analog channels
    #[must_use]
    pub fn new(
        adc: Adc<'d, Async>,
        drain_voltage: Channel<'d>,
        drain_current: Channel<'d>,
        supply_voltage: Channel<'d>,
    ) -> Self {
        Self {
            adc,
            drain_voltage,
            drain_current,
            supply_voltage,
        }
    }

    /// Read all three channels back to back
    pub async fn scan(&mut self) -> Result<SupervisorScan, Error> {
        Ok(SupervisorScan {
            drain_voltage: self.adc.read(&mut self.drain_voltage).await?,
            drain_current: self.adc.read(&mut self.drain_current).await?,
            supply_voltage: self.adc.read(&mut self.supply_voltage).await?,
        })
    }
}
