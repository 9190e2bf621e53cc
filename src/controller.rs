//! Control loop scheduler
//!
//! One `Controller` owns every stage of the protection loop and runs
//! them in a fixed order each 1 ms tick:
//!
//! 1. acquire and calibrate the raw readings
//! 2. evaluate faults (and apply a pending operator reset)
//! 3. derive the actuator command
//! 4. service the transmit sequencer
//! 5. service band selection
//! 6. render telemetry, throttled to the display refresh rate
//!
//! Acquisition, evaluation, and actuation run unconditionally every
//! tick. Telemetry is the only throttled stage and feeds nothing back
//! into the earlier stages.
//!
//! The command returned from a tick reflects that tick's fault state
//! and the transmit and band state entering the tick, so a trip cuts
//! bias on the tick it is detected while sequencer and band changes
//! take effect on the following tick's command.

use crate::actuator;
use crate::band::{BandChangeRejected, BandController};
use crate::config;
use crate::fault::{FaultEvaluator, ThresholdProfile};
use crate::input::{asserted, Debouncer, PressLatch};
use crate::sensor::{Calibration, RawSensorReadings, SensorFrontEnd};
use crate::sequencer::{Sequencer, SequencerEvent};
use crate::telemetry::{self, DisplayFrame};
use crate::types::{
    ActuatorCommand, Band, FaultState, QskMode, SelfTestCode, SensorSample, Tick, TransmitState,
};

/// Raw inputs captured at the top of one tick
#[derive(Clone, Copy, Debug)]
pub struct TickInputs {
    /// ADC codes read this tick
    pub raw: RawSensorReadings,
    /// Key line level, before polarity and debounce
    pub key_level: bool,
    /// Reset button level, before polarity and debounce
    pub reset_level: bool,
    /// Band button level, before polarity and debounce
    pub band_button_level: bool,
    /// Bias rail comparator level, before polarity; `None` where the
    /// line is not fitted
    pub bias_feedback: Option<bool>,
}

/// Outputs produced by one tick
#[derive(Clone, Copy, Debug)]
pub struct TickOutputs {
    /// Hardware command for this tick
    pub command: ActuatorCommand,
    /// Telemetry frame, present only on refresh ticks
    pub frame: Option<DisplayFrame>,
    /// Sequencer event raised this tick
    pub event: SequencerEvent,
}

/// The complete protection and operation controller
///
/// Construction never fails: an invalid profile or calibration arms
/// the evaluator pre-latched so the amplifier powers up locked out
/// instead of unprotected.
#[derive(Debug)]
pub struct Controller {
    sensors: SensorFrontEnd,
    fault: FaultEvaluator,
    band: BandController,
    sequencer: Sequencer,
    key_input: Debouncer,
    reset_input: PressLatch,
    band_input: PressLatch,
    last_sample: Option<SensorSample>,
}

impl Controller {
    /// Build a controller from a threshold profile and calibration
    #[must_use]
    pub fn new(profile: ThresholdProfile, calibration: Calibration, qsk: QskMode) -> Self {
        let fault = if calibration.validate().is_err() {
            FaultEvaluator::latched(profile, SelfTestCode::CalibrationMissing)
        } else {
            match FaultEvaluator::new(profile) {
                Ok(evaluator) => evaluator,
                Err(_) => FaultEvaluator::latched(profile, SelfTestCode::CalibrationMissing),
            }
        };
        Self {
            sensors: SensorFrontEnd::new(calibration),
            fault,
            band: BandController::new(config::DEFAULT_BAND),
            sequencer: Sequencer::new(qsk),
            key_input: Debouncer::new(false, config::INPUT_DEBOUNCE_MS),
            reset_input: PressLatch::new(config::INPUT_DEBOUNCE_MS),
            band_input: PressLatch::new(config::INPUT_DEBOUNCE_MS),
            last_sample: None,
        }
    }

    /// Run one tick of the control loop
    pub fn tick(&mut self, now: Tick, inputs: &TickInputs) -> TickOutputs {
        let sample = self.sensors.sample(&inputs.raw, now);

        let mut fault = self.fault.evaluate(&sample, now);
        let reset_pressed = self
            .reset_input
            .update(asserted(inputs.reset_level, config::RESET_ACTIVE_LOW), now);
        if reset_pressed && self.fault.operator_reset(&sample, now) {
            fault = self.fault.state();
        }

        let command = actuator::apply(
            fault,
            self.sequencer.state(),
            self.band.selected(),
            sample.temperature,
        );

        let key = self
            .key_input
            .update(asserted(inputs.key_level, config::KEY_ACTIVE_LOW), now);
        let bias_feedback = inputs
            .bias_feedback
            .map(|level| asserted(level, config::BIAS_FEEDBACK_ACTIVE_LOW));
        let event = self.sequencer.service(key, fault, bias_feedback, now);
        if matches!(event, SequencerEvent::SettleTimeout) {
            self.fault.notify_self_test(SelfTestCode::BiasSettleTimeout);
        }

        let band_pressed = self.band_input.update(
            asserted(inputs.band_button_level, config::BAND_BUTTON_ACTIVE_LOW),
            now,
        );
        if band_pressed {
            // Rejections surface on the next telemetry frame through
            // the unchanged band field.
            let _ = self.band.advance(self.sequencer.state(), now);
        }

        self.last_sample = Some(sample);
        let frame = if now.as_ticks() % config::DISPLAY_REFRESH_TICKS == 0 {
            Some(self.render(&sample))
        } else {
            None
        };

        TickOutputs { command, frame, event }
    }

    /// Request a specific band, as from a remote command
    pub fn request_band(&mut self, band: Band, now: Tick) -> Result<(), BandChangeRejected> {
        self.band.request(band, self.sequencer.state(), now)
    }

    /// Render a telemetry frame outside the refresh schedule
    #[must_use]
    pub fn render_now(&self) -> Option<DisplayFrame> {
        self.last_sample.as_ref().map(|sample| self.render(sample))
    }

    /// Current fault state
    #[must_use]
    pub const fn fault_state(&self) -> FaultState {
        self.fault.state()
    }

    /// Current transmit state
    #[must_use]
    pub const fn transmit_state(&self) -> TransmitState {
        self.sequencer.state()
    }

    /// Currently selected band
    #[must_use]
    pub const fn band(&self) -> Band {
        self.band.selected()
    }

    fn render(&self, sample: &SensorSample) -> DisplayFrame {
        telemetry::render(
            sample,
            self.band.selected(),
            self.sequencer.state(),
            self.fault.state(),
        )
    }
}
