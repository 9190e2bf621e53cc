//! Protection actuator mapping
//!
//! Maps `{fault, transmit, band, temperature}` to the full hardware
//! output set. Stateless: the same state tuple always yields the same
//! command, and every state that does not permit transmit collapses
//! to one fail-safe path with no per-fault branching.

use crate::config;
use crate::sensor;
use crate::types::{ActuatorCommand, Band, FanDuty, FaultState, TransmitState};
#[cfg(feature = "embedded")]
use micromath::F32Ext;

/// Compute the hardware outputs for one tick
///
/// The fail-safe path cuts bias, opens the RF path, inhibits PTT and
/// forces the fan to full. The filter relays follow the band in both
/// paths; mutual exclusion holds regardless of faults.
#[must_use]
pub fn apply(
    fault: FaultState,
    transmit: TransmitState,
    band: Band,
    temperature_c: f32,
) -> ActuatorCommand {
    let relays = band.relay_image();

    if !fault.permits_transmit() {
        return ActuatorCommand {
            bias_enable: false,
            rf_connect: false,
            ptt_inhibit: true,
            fan_duty: FanDuty::MAX,
            relays,
        };
    }

    ActuatorCommand {
        bias_enable: transmit.requires_bias(),
        rf_connect: matches!(transmit, TransmitState::KeyedTransmitting),
        ptt_inhibit: false,
        fan_duty: fan_duty(temperature_c),
        relays,
    }
}

/// Temperature-proportional fan drive
///
/// Follows [`config::FAN_CURVE`]: the idle floor below the curve, full
/// blast at the top end.
#[must_use]
pub fn fan_duty(temperature_c: f32) -> FanDuty {
    let percent = sensor::interp(config::FAN_CURVE, temperature_c);
    FanDuty::from_percent(percent.round() as u8)
}
