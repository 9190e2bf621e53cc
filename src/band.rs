//! Band and filter selection
//!
//! Owns the band selection and the rules around changing it: never
//! while the amplifier is away from receive, and never faster than
//! the relay settle interval. The relay image derived from the
//! selection is strictly one-hot over the filter banks.

use crate::config;
use crate::types::{Band, Tick, TransmitState};

/// Why a band change request was refused
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BandChangeRejected {
    /// The sequencer is away from receive; filter relays never switch
    /// under drive
    Transmitting,
    /// The previous change is still inside the settle interval
    SettleInterval,
}

#[cfg(feature = "embedded")]
impl defmt::Format for BandChangeRejected {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Transmitting => defmt::write!(f, "transmitting"),
            Self::SettleInterval => defmt::write!(f, "settle interval"),
        }
    }
}

/// Band selection controller
#[derive(Clone, Copy, Debug)]
pub struct BandController {
    /// Current selection
    selected: Band,
    /// Tick of the last applied change
    last_change: Option<Tick>,
}

impl BandController {
    /// Create a controller with the given startup band
    #[must_use]
    pub const fn new(initial: Band) -> Self {
        Self {
            selected: initial,
            last_change: None,
        }
    }

    /// Get the current selection
    #[must_use]
    pub const fn selected(&self) -> Band {
        self.selected
    }

    /// Request a specific band
    ///
    /// Re-selecting the current band succeeds without restarting the
    /// settle interval.
    pub fn request(
        &mut self,
        band: Band,
        transmit: TransmitState,
        now: Tick,
    ) -> Result<(), BandChangeRejected> {
        if !transmit.is_receive() {
            return Err(BandChangeRejected::Transmitting);
        }
        if band == self.selected {
            return Ok(());
        }
        if let Some(last) = self.last_change {
            if now.millis_since(last) < config::BAND_SETTLE_MS {
                return Err(BandChangeRejected::SettleInterval);
            }
        }
        self.selected = band;
        self.last_change = Some(now);
        Ok(())
    }

    /// Advance to the next band (front panel button)
    pub fn advance(
        &mut self,
        transmit: TransmitState,
        now: Tick,
    ) -> Result<(), BandChangeRejected> {
        self.request(self.selected.next(), transmit, now)
    }
}

impl Default for BandController {
    fn default() -> Self {
        Self::new(config::DEFAULT_BAND)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for BandController {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "band={}", self.selected);
    }
}
