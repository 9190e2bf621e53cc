//! Telemetry rendering
//!
//! Turns a state snapshot into a 16x2 character frame for the front
//! panel display. Rendering is pure and side-effect free: it never
//! feeds back into protection, and a skipped refresh changes nothing
//! but the panel.

use core::fmt::Write;

use crate::types::{Band, ErrorCode, FaultState, LatchCause, SensorSample, TransmitState};

#[cfg(feature = "embedded")]
use micromath::F32Ext;

/// One rendered display frame
///
/// Fields are pre-rounded to display resolution so frames compare
/// equal whenever the panel content would be identical. The shell
/// uses that to skip redundant I2C writes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayFrame {
    /// Drain voltage, rounded to 0.1 V
    pub drain_voltage: f32,
    /// Drain current, rounded to 0.1 A
    pub drain_current: f32,
    /// Forward power, rounded to 1 W
    pub forward_power: f32,
    /// Input SWR, clamped at format time
    pub swr: f32,
    /// Selected band
    pub band: Band,
    /// Transmit sequencer state
    pub transmit: TransmitState,
    /// Active error code
    pub code: ErrorCode,
    /// Cause mnemonic when latched on an electrical fault
    pub latch_label: Option<&'static str>,
}

#[cfg(feature = "embedded")]
impl defmt::Format for DisplayFrame {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "Frame(E{} {}V {}A {}W)",
            self.code.code(),
            self.drain_voltage,
            self.drain_current,
            self.forward_power
        );
    }
}

/// Render a frame from the current state snapshot
#[must_use]
pub fn render(
    sample: &SensorSample,
    band: Band,
    transmit: TransmitState,
    fault: FaultState,
) -> DisplayFrame {
    let latch_label = match fault {
        FaultState::Latched(LatchCause::Electrical(kind)) => Some(kind.error_code().label()),
        _ => None,
    };
    DisplayFrame {
        drain_voltage: round_tenths(sample.drain_voltage),
        drain_current: round_tenths(sample.drain_current),
        forward_power: sample.forward_power.round(),
        swr: sample.swr(),
        band,
        transmit,
        code: fault.error_code(),
        latch_label,
    }
}

fn round_tenths(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

impl DisplayFrame {
    /// Render the two 16-column lines
    ///
    /// Lines are space-padded to full width so a frame overwrites its
    /// predecessor without a clear. Content past column 16 is dropped.
    #[must_use]
    pub fn lines(&self) -> [heapless::String<16>; 2] {
        let mut line0 = heapless::String::new();
        let mut line1 = heapless::String::new();

        let _ = write!(line0, "S:");
        write_swr(&mut line0, self.swr);
        let _ = write!(
            line0,
            " P:{:.0} {}{}",
            self.forward_power,
            self.band.label(),
            self.transmit.symbol()
        );

        if self.code == ErrorCode::Ok {
            let _ = write!(line1, "D:{:.1}V I:{:.1}A", self.drain_voltage, self.drain_current);
        } else {
            let label = self.latch_label.unwrap_or_else(|| self.code.label());
            let _ = write!(line1, "E{} {}", self.code.code(), label);
        }

        pad(&mut line0);
        pad(&mut line1);
        [line0, line1]
    }
}

/// Format an SWR value into at most three columns
fn write_swr(line: &mut heapless::String<16>, swr: f32) {
    if swr.is_infinite() {
        let _ = line.push_str("INF");
    } else if swr > 9.9 {
        let _ = line.push_str("9.9");
    } else {
        let _ = write!(line, "{swr:.1}");
    }
}

fn pad(line: &mut heapless::String<16>) {
    while line.push(' ').is_ok() {}
}
