//! Sensor acquisition front end
//!
//! Converts raw ADC codes into one calibrated [`SensorSample`] per
//! scheduler tick. Per-channel calibration is offset + gain for the
//! linear channels and a piecewise-linear table for the detector and
//! thermistor channels. Every channel declares an electrical
//! plausibility window; a reading outside it is clamped to the window
//! edge and flagged as a self-test failure.

use crate::config;
use crate::types::{SelfTestCode, SensorChannel, SensorSample, Tick};

/// Raw ADC codes captured for one tick
///
/// Pico channels are 12-bit unsigned codes; ADS1115 channels are the
/// signed 16-bit conversion registers.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawSensorReadings {
    /// Drain voltage divider (Pico ADC0)
    pub drain_voltage: u16,
    /// Drain current hall sensor (Pico ADC1)
    pub drain_current: u16,
    /// Supply rail divider (Pico ADC2)
    pub supply_voltage: u16,
    /// Forward power detector (ADS1115)
    pub forward_power: i16,
    /// Reflected power detector (ADS1115)
    pub reflected_power: i16,
    /// Thermistor divider (ADS1115)
    pub thermistor: i16,
}

/// Electrical plausibility window in volts at the pin
#[derive(Clone, Copy, Debug)]
pub struct Window {
    /// Lowest believable pin voltage
    pub min_v: f32,
    /// Highest believable pin voltage
    pub max_v: f32,
}

impl Window {
    /// Check a pin voltage against the window
    #[must_use]
    pub fn contains(&self, volts: f32) -> bool {
        volts >= self.min_v && volts <= self.max_v
    }
}

/// Calibration for a linear channel: value = (volts - offset) * gain
#[derive(Clone, Copy, Debug)]
pub struct LinearChannel {
    /// Sensor output at zero, in volts
    pub offset_v: f32,
    /// Engineering units per volt
    pub gain: f32,
    /// Plausibility window
    pub window: Window,
}

impl LinearChannel {
    fn convert(&self, volts: f32) -> f32 {
        (volts - self.offset_v) * self.gain
    }
}

/// Calibration for a table-interpolated channel
#[derive(Clone, Copy, Debug)]
pub struct TableChannel {
    /// Transfer curve as (volts, value) pairs, volts strictly increasing
    pub table: &'static [(f32, f32)],
    /// Plausibility window
    pub window: Window,
}

/// Full calibration set for every analog channel
#[derive(Clone, Copy, Debug)]
pub struct Calibration {
    /// Drain voltage divider
    pub drain_voltage: LinearChannel,
    /// Drain current hall sensor
    pub drain_current: LinearChannel,
    /// Supply rail divider
    pub supply_voltage: LinearChannel,
    /// Forward power detector curve
    pub forward_power: TableChannel,
    /// Reflected power detector curve
    pub reflected_power: TableChannel,
    /// Thermistor divider curve
    pub thermistor: TableChannel,
}

/// Why a calibration set failed validation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationError {
    /// Interpolation table has fewer than two points
    TableTooShort(SensorChannel),
    /// Table abscissas are not strictly increasing
    TableNotMonotonic(SensorChannel),
    /// Plausibility window is inverted or empty
    InvalidWindow(SensorChannel),
}

impl Calibration {
    /// Validate every table and window
    ///
    /// Runs once at controller construction; a failing set refuses to
    /// arm rather than producing garbage engineering units.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        check_window(&self.drain_voltage.window, SensorChannel::DrainVoltage)?;
        check_window(&self.drain_current.window, SensorChannel::DrainCurrent)?;
        check_window(&self.supply_voltage.window, SensorChannel::SupplyVoltage)?;
        check_table(&self.forward_power, SensorChannel::ForwardPower)?;
        check_table(&self.reflected_power, SensorChannel::ReflectedPower)?;
        check_table(&self.thermistor, SensorChannel::Temperature)?;
        Ok(())
    }
}

fn check_window(window: &Window, channel: SensorChannel) -> Result<(), CalibrationError> {
    if window.min_v < window.max_v {
        Ok(())
    } else {
        Err(CalibrationError::InvalidWindow(channel))
    }
}

fn check_table(channel_cal: &TableChannel, channel: SensorChannel) -> Result<(), CalibrationError> {
    check_window(&channel_cal.window, channel)?;
    if channel_cal.table.len() < 2 {
        return Err(CalibrationError::TableTooShort(channel));
    }
    for pair in channel_cal.table.windows(2) {
        if pair[0].0 >= pair[1].0 {
            return Err(CalibrationError::TableNotMonotonic(channel));
        }
    }
    Ok(())
}

/// Piecewise-linear interpolation with end clamping
///
/// Below the first point returns the first ordinate, above the last
/// returns the last; an empty table returns zero.
pub(crate) fn interp(table: &[(f32, f32)], x: f32) -> f32 {
    let Some(&(first_x, first_y)) = table.first() else {
        return 0.0;
    };
    let Some(&(last_x, last_y)) = table.last() else {
        return 0.0;
    };
    if x <= first_x {
        return first_y;
    }
    if x >= last_x {
        return last_y;
    }
    for pair in table.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x <= x1 {
            let t = (x - x0) / (x1 - x0);
            return y0 + t * (y1 - y0);
        }
    }
    last_y
}

/// Convert a Pico ADC code to pin volts
fn pico_volts(code: u16) -> f32 {
    f32::from(code) * config::ADC_VREF_V / f32::from(config::ADC_FULL_SCALE)
}

/// Convert an ADS1115 conversion register to pin volts
fn ads_volts(code: i16) -> f32 {
    f32::from(code) * config::ADS1115_FS_V / 32768.0
}

/// Clamp a pin voltage into its plausibility window, recording the
/// first offending channel
fn clamp_checked(
    volts: f32,
    window: &Window,
    channel: SensorChannel,
    fault: &mut Option<SelfTestCode>,
) -> f32 {
    if window.contains(volts) {
        return volts;
    }
    if fault.is_none() {
        *fault = Some(SelfTestCode::SensorOutOfRange(channel));
    }
    if volts < window.min_v {
        window.min_v
    } else {
        window.max_v
    }
}

/// Sensor front end
///
/// Holds the calibration set and the last thermistor conversion; the
/// thermistor runs decimated because the heat spreader moves orders of
/// magnitude slower than the electrical channels.
#[derive(Clone, Debug)]
pub struct SensorFrontEnd {
    /// Calibration set
    calibration: Calibration,
    /// Last converted temperature, carried between conversions
    held_temperature: f32,
}

impl SensorFrontEnd {
    /// Assumed temperature before the first thermistor conversion
    const STARTUP_TEMPERATURE_C: f32 = 25.0;

    /// Create a front end with the given calibration
    #[must_use]
    pub const fn new(calibration: Calibration) -> Self {
        Self {
            calibration,
            held_temperature: Self::STARTUP_TEMPERATURE_C,
        }
    }

    /// Convert one set of raw codes into a calibrated sample
    ///
    /// Called once per scheduler tick. Negative drain current inside
    /// the plausibility window clamps to zero; the hall sensor reads
    /// slightly below its offset at rest.
    pub fn sample(&mut self, raw: &RawSensorReadings, tick: Tick) -> SensorSample {
        let cal = &self.calibration;
        let mut fault = None;

        let vd = clamp_checked(
            pico_volts(raw.drain_voltage),
            &cal.drain_voltage.window,
            SensorChannel::DrainVoltage,
            &mut fault,
        );
        let id = clamp_checked(
            pico_volts(raw.drain_current),
            &cal.drain_current.window,
            SensorChannel::DrainCurrent,
            &mut fault,
        );
        let vcc = clamp_checked(
            pico_volts(raw.supply_voltage),
            &cal.supply_voltage.window,
            SensorChannel::SupplyVoltage,
            &mut fault,
        );
        let fwd = clamp_checked(
            ads_volts(raw.forward_power),
            &cal.forward_power.window,
            SensorChannel::ForwardPower,
            &mut fault,
        );
        let rfl = clamp_checked(
            ads_volts(raw.reflected_power),
            &cal.reflected_power.window,
            SensorChannel::ReflectedPower,
            &mut fault,
        );

        if tick.as_ticks() % config::TEMPERATURE_DECIMATION_TICKS == 0 {
            let therm = clamp_checked(
                ads_volts(raw.thermistor),
                &cal.thermistor.window,
                SensorChannel::Temperature,
                &mut fault,
            );
            self.held_temperature = interp(cal.thermistor.table, therm);
        }

        SensorSample {
            drain_voltage: cal.drain_voltage.convert(vd),
            drain_current: cal.drain_current.convert(id).max(0.0),
            supply_voltage: cal.supply_voltage.convert(vcc),
            temperature: self.held_temperature,
            forward_power: interp(cal.forward_power.table, fwd),
            reflected_power: interp(cal.reflected_power.table, rfl),
            tick,
            self_test: fault,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
