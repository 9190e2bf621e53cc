//! Actuator Outputs
//!
//! Drives the GPIO and PWM outputs from an `ActuatorCommand` image.
//! Wiring polarity lives in `config`; this module is a mechanical
//! level mapping with no policy of its own.

use embassy_rp::gpio::Output;
use embassy_rp::pwm::{Config as PwmConfig, Pwm};

use crate::config;
use crate::types::{ActuatorCommand, FanDuty, FILTER_BANKS};

/// Drive one output pin honoring active-low wiring
fn drive(pin: &mut Output<'_>, on: bool, active_low: bool) {
    if on != active_low {
        pin.set_high();
    } else {
        pin.set_low();
    }
}

/// Fan PWM output
pub struct FanPwm<'d> {
    pwm: Pwm<'d>,
    config: PwmConfig,
}

impl<'d> FanPwm<'d> {
    /// Wrap a configured PWM slice, starting with the fan stopped
    #[must_use]
    pub fn new(pwm: Pwm<'d>) -> Self {
        let mut config = PwmConfig::default();
        config.top = 0xFFFF;
        config.compare_a = 0;
        Self { pwm, config }
    }

    /// Set the fan duty
    pub fn set(&mut self, duty: FanDuty) {
        self.config.compare_a = duty.as_pwm_duty();
        self.pwm.set_config(&self.config);
    }
}

/// All amplifier control outputs
///
/// Repeated identical commands are coalesced; the pins only move when
/// the image changes.
pub struct OutputBank<'d> {
    bias_enable: Output<'d>,
    tr_relay: Output<'d>,
    ptt_inhibit: Output<'d>,
    band_relays: [Output<'d>; FILTER_BANKS],
    fan: FanPwm<'d>,
    applied: Option<ActuatorCommand>,
}

impl<'d> OutputBank<'d> {
    /// Assemble the output bank from pre-initialized pins
    ///
    /// Callers construct the pins at their de-energized levels; the
    /// first `apply` establishes the real image.
    #[must_use]
    pub fn new(
        bias_enable: Output<'d>,
        tr_relay: Output<'d>,
        ptt_inhibit: Output<'d>,
        band_relays: [Output<'d>; FILTER_BANKS],
        fan: FanPwm<'d>,
    ) -> Self {
        Self {
            bias_enable,
            tr_relay,
            ptt_inhibit,
            band_relays,
            fan,
            applied: None,
        }
    }

    /// Drive every output to match the command image
    pub fn apply(&mut self, command: &ActuatorCommand) {
        if self.applied.as_ref() == Some(command) {
            return;
        }

        // Pin updates land microseconds apart; the sequencer's settle
        // and drop delays provide the real relay spacing.
        drive(&mut self.bias_enable, command.bias_enable, false);
        drive(&mut self.tr_relay, command.rf_connect, false);
        drive(&mut self.ptt_inhibit, command.ptt_inhibit, false);
        for (pin, &on) in self.band_relays.iter_mut().zip(command.relays.iter()) {
            drive(pin, on, config::BAND_RELAY_ACTIVE_LOW);
        }
        self.fan.set(command.fan_duty);

        self.applied = Some(*command);
    }
}
