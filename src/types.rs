//! Shared types used across the amplifier firmware
//!
//! This module defines domain-specific types that enforce invariants
//! at compile time and provide type safety throughout the codebase.

#[cfg(feature = "embedded")]
use micromath::F32Ext;

/// Number of low-pass filter banks behind the antenna relay tree
pub const FILTER_BANKS: usize = 3;

/// Monotonic scheduler tick count
///
/// The control loop advances one tick per millisecond, so a tick
/// difference is a millisecond difference. Ticks never wrap in
/// practice (u64 at 1 kHz outlives the hardware).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Tick(u64);

impl Tick {
    /// Tick zero, the instant the controller armed
    pub const ZERO: Self = Self(0);

    /// Create a tick from a raw count
    #[must_use]
    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Get the raw tick count
    #[must_use]
    pub const fn as_ticks(self) -> u64 {
        self.0
    }

    /// The tick `n` ticks after this one
    #[must_use]
    pub const fn advance(self, ticks: u64) -> Self {
        Self(self.0.saturating_add(ticks))
    }

    /// Milliseconds elapsed since an earlier tick (saturating)
    #[must_use]
    pub const fn millis_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Tick {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "t+{}ms", self.0);
    }
}

/// Operating band of the amplifier
///
/// Four bands share three low-pass filter banks; 15m and 10m run
/// through the same bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Band {
    /// 40 meters (7.0 - 7.3 MHz)
    #[default]
    M40,
    /// 20 meters (14.0 - 14.35 MHz)
    M20,
    /// 15 meters (21.0 - 21.45 MHz)
    M15,
    /// 10 meters (28.0 - 29.7 MHz)
    M10,
}

impl Band {
    /// Get the filter bank index driven for this band
    #[must_use]
    pub const fn filter_bank(self) -> usize {
        match self {
            Self::M40 => 0,
            Self::M20 => 1,
            Self::M15 | Self::M10 => 2,
        }
    }

    /// Cycle to the next band (front panel button order)
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::M40 => Self::M20,
            Self::M20 => Self::M15,
            Self::M15 => Self::M10,
            Self::M10 => Self::M40, // Wrap around
        }
    }

    /// Display label for this band
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::M40 => "40m",
            Self::M20 => "20m",
            Self::M15 => "15m",
            Self::M10 => "10m",
        }
    }

    /// One-hot relay image for this band's filter bank
    #[must_use]
    pub const fn relay_image(self) -> [bool; FILTER_BANKS] {
        let mut image = [false; FILTER_BANKS];
        image[self.filter_bank()] = true;
        image
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Band {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.label());
    }
}

/// Transmit/receive sequencing state
///
/// Owned by the sequencer; every other component reads it and none
/// may write it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TransmitState {
    /// Receiving, RF path bypassed, bias off
    #[default]
    Receive,
    /// Key asserted, bias settling before the RF path closes
    SequencingUp,
    /// Bias on and RF path closed, carrier may flow
    KeyedTransmitting,
    /// RF path opened, bias draining before return to receive
    SequencingDown,
}

impl TransmitState {
    /// Check if the amplifier is idle in receive
    #[must_use]
    pub const fn is_receive(self) -> bool {
        matches!(self, Self::Receive)
    }

    /// Check if this state holds gate bias on the LDMOS pair
    #[must_use]
    pub const fn requires_bias(self) -> bool {
        !self.is_receive()
    }

    /// Single-character state mark for the display
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Receive => 'R',
            Self::SequencingUp => '^',
            Self::KeyedTransmitting => 'T',
            Self::SequencingDown => 'v',
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for TransmitState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Receive => defmt::write!(f, "RX"),
            Self::SequencingUp => defmt::write!(f, "SEQ-UP"),
            Self::KeyedTransmitting => defmt::write!(f, "TX"),
            Self::SequencingDown => defmt::write!(f, "SEQ-DOWN"),
        }
    }
}

/// Electrical fault categories that can escalate to a latch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultKind {
    /// Drain voltage above the device maximum
    OverVoltage,
    /// Drain current above the device maximum
    OverCurrent,
    /// Heat spreader temperature above the thermal limit
    OverTemperature,
    /// Spurious oscillation signature detected
    Oscillation,
}

impl FaultKind {
    /// Error code reported while this fault is active
    #[must_use]
    pub const fn error_code(self) -> ErrorCode {
        match self {
            Self::OverVoltage => ErrorCode::OverVolt,
            Self::OverCurrent => ErrorCode::OverCurr,
            Self::OverTemperature => ErrorCode::OverTemp,
            Self::Oscillation => ErrorCode::Oscillation,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for FaultKind {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.error_code().label());
    }
}

/// Analog acquisition channels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorChannel {
    /// LDMOS drain voltage via resistive divider (Pico ADC0)
    DrainVoltage,
    /// Drain current via hall sensor (Pico ADC1)
    DrainCurrent,
    /// PA supply rail via resistive divider (Pico ADC2)
    SupplyVoltage,
    /// Forward power detector (ADS1115 AIN1)
    ForwardPower,
    /// Reflected power detector (ADS1115 AIN0)
    ReflectedPower,
    /// Heat spreader thermistor divider (ADS1115 AIN2)
    Temperature,
}

#[cfg(feature = "embedded")]
impl defmt::Format for SensorChannel {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::DrainVoltage => defmt::write!(f, "vdrain"),
            Self::DrainCurrent => defmt::write!(f, "idrain"),
            Self::SupplyVoltage => defmt::write!(f, "vcc"),
            Self::ForwardPower => defmt::write!(f, "pfwd"),
            Self::ReflectedPower => defmt::write!(f, "prfl"),
            Self::Temperature => defmt::write!(f, "temp"),
        }
    }
}

/// Internal consistency failures detected by the firmware itself
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelfTestCode {
    /// A channel read outside its electrical plausibility window
    SensorOutOfRange(SensorChannel),
    /// Threshold profile or calibration table failed validation
    CalibrationMissing,
    /// Bias feedback did not confirm within the settle watchdog
    BiasSettleTimeout,
}

impl SelfTestCode {
    /// Error code reported for this self-test failure
    #[must_use]
    pub const fn error_code(self) -> ErrorCode {
        match self {
            Self::SensorOutOfRange(_) => ErrorCode::SensorRange,
            Self::CalibrationMissing => ErrorCode::CalMissing,
            Self::BiasSettleTimeout => ErrorCode::BiasSettle,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for SelfTestCode {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::SensorOutOfRange(ch) => defmt::write!(f, "sensor range ({})", ch),
            Self::CalibrationMissing => defmt::write!(f, "calibration missing"),
            Self::BiasSettleTimeout => defmt::write!(f, "bias settle timeout"),
        }
    }
}

/// Why the protection latch engaged
///
/// Retained inside [`FaultState::Latched`] so the operator can read
/// the cause off the display before resetting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatchCause {
    /// An electrical fault struck out
    Electrical(FaultKind),
    /// The firmware failed its own consistency checks
    SelfTest(SelfTestCode),
}

impl LatchCause {
    /// Display mnemonic naming the cause
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Electrical(kind) => kind.error_code().label(),
            Self::SelfTest(code) => code.error_code().label(),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for LatchCause {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Electrical(kind) => defmt::write!(f, "electrical: {}", kind),
            Self::SelfTest(code) => defmt::write!(f, "self-test: {}", code),
        }
    }
}

/// Protection fault state
///
/// Exactly one value is active at any instant. Transitions happen
/// only inside the fault evaluator; `Latched` is terminal until the
/// operator resets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FaultState {
    /// All measurements inside limits
    #[default]
    Normal,
    /// Drain voltage excursion
    OverVoltage,
    /// Drain current excursion
    OverCurrent,
    /// Thermal excursion
    OverTemperature,
    /// Oscillation signature active
    Oscillation,
    /// Input SWR above limit (advisory, never removes capability)
    InputSwr,
    /// Terminal latch, cleared only by operator reset
    Latched(LatchCause),
}

impl FaultState {
    /// Check whether keying the amplifier is allowed in this state
    ///
    /// `InputSwr` is advisory: the operator is warned but transmit
    /// capability is never removed by it.
    #[must_use]
    pub const fn permits_transmit(self) -> bool {
        matches!(self, Self::Normal | Self::InputSwr)
    }

    /// Check if the terminal latch is engaged
    #[must_use]
    pub const fn is_latched(self) -> bool {
        matches!(self, Self::Latched(_))
    }

    /// The electrical fault kind active in this state, if any
    #[must_use]
    pub const fn electrical_kind(self) -> Option<FaultKind> {
        match self {
            Self::OverVoltage => Some(FaultKind::OverVoltage),
            Self::OverCurrent => Some(FaultKind::OverCurrent),
            Self::OverTemperature => Some(FaultKind::OverTemperature),
            Self::Oscillation => Some(FaultKind::Oscillation),
            Self::Latched(LatchCause::Electrical(kind)) => Some(kind),
            Self::Normal | Self::InputSwr | Self::Latched(LatchCause::SelfTest(_)) => None,
        }
    }

    /// Error code reported for this state
    #[must_use]
    pub const fn error_code(self) -> ErrorCode {
        match self {
            Self::Normal => ErrorCode::Ok,
            Self::OverVoltage => ErrorCode::OverVolt,
            Self::OverCurrent => ErrorCode::OverCurr,
            Self::OverTemperature => ErrorCode::OverTemp,
            Self::Oscillation => ErrorCode::Oscillation,
            Self::InputSwr => ErrorCode::HighSwr,
            Self::Latched(LatchCause::Electrical(_)) => ErrorCode::Latched,
            Self::Latched(LatchCause::SelfTest(code)) => code.error_code(),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for FaultState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Normal => defmt::write!(f, "NORMAL"),
            Self::OverVoltage => defmt::write!(f, "OVER-VOLTAGE"),
            Self::OverCurrent => defmt::write!(f, "OVER-CURRENT"),
            Self::OverTemperature => defmt::write!(f, "OVER-TEMPERATURE"),
            Self::Oscillation => defmt::write!(f, "OSCILLATION"),
            Self::InputSwr => defmt::write!(f, "HIGH-SWR"),
            Self::Latched(cause) => defmt::write!(f, "LATCHED ({})", cause),
        }
    }
}

/// Stable error vocabulary shown on the display and logged
///
/// The numeric codes are part of the operator interface and must not
/// be renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    /// No fault active
    Ok = 0,
    /// Drain over-voltage
    OverVolt = 1,
    /// Drain over-current
    OverCurr = 2,
    /// Over-temperature
    OverTemp = 3,
    /// Oscillation signature
    Oscillation = 4,
    /// Input SWR above limit (advisory)
    HighSwr = 5,
    /// Protection latch engaged
    Latched = 6,
    /// Sensor reading outside its plausibility window
    SensorRange = 7,
    /// Configuration failed validation at startup
    CalMissing = 8,
    /// Bias settle watchdog expired
    BiasSettle = 9,
}

impl ErrorCode {
    /// Numeric code for the display ("E3" style)
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Short mnemonic fitting the 16-column display
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::OverVolt => "OVER VOLT",
            Self::OverCurr => "OVER CURR",
            Self::OverTemp => "OVER TEMP",
            Self::Oscillation => "OSC",
            Self::HighSwr => "HI SWR",
            Self::Latched => "LATCHED",
            Self::SensorRange => "SENSOR RANGE",
            Self::CalMissing => "CAL MISSING",
            Self::BiasSettle => "BIAS SETTLE",
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ErrorCode {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "E{} {}", self.code(), self.label());
    }
}

/// One calibrated snapshot of every analog channel
///
/// Produced once per scheduler tick and immutable after creation;
/// a new tick supersedes it, nothing mutates it.
#[derive(Clone, Copy, Debug)]
pub struct SensorSample {
    /// LDMOS drain voltage in volts
    pub drain_voltage: f32,
    /// Combined drain current in amps
    pub drain_current: f32,
    /// PA supply rail in volts
    pub supply_voltage: f32,
    /// Heat spreader temperature in degrees Celsius
    pub temperature: f32,
    /// Forward power at the coupler in watts
    pub forward_power: f32,
    /// Reflected power at the coupler in watts
    pub reflected_power: f32,
    /// Tick at which the snapshot was taken
    pub tick: Tick,
    /// Plausibility failure detected during acquisition, if any
    pub self_test: Option<SelfTestCode>,
}

impl SensorSample {
    /// Input standing wave ratio from the coupler pair
    ///
    /// Returns infinity when forward power is zero or reflected
    /// meets or exceeds forward (open or shorted feedline).
    #[must_use]
    pub fn swr(&self) -> f32 {
        if self.forward_power <= 0.0 {
            return f32::INFINITY;
        }
        let ratio = self.reflected_power / self.forward_power;
        if ratio >= 1.0 {
            return f32::INFINITY;
        }
        let rho = ratio.sqrt();
        (1.0 + rho) / (1.0 - rho)
    }

    /// DC input power drawn from the supply in watts
    #[must_use]
    pub fn dc_input_power(&self) -> f32 {
        self.supply_voltage * self.drain_current
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for SensorSample {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "vd={} id={} vcc={} t={} pf={} pr={}",
            self.drain_voltage,
            self.drain_current,
            self.supply_voltage,
            self.temperature,
            self.forward_power,
            self.reflected_power,
        );
    }
}

/// Cooling fan duty in percent
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct FanDuty(u8);

impl FanDuty {
    /// Fan stopped
    pub const OFF: Self = Self(0);

    /// Full blast
    pub const MAX: Self = Self(100);

    /// Create a duty from percent, clamping above 100
    #[must_use]
    pub const fn from_percent(percent: u8) -> Self {
        if percent > 100 {
            Self(100)
        } else {
            Self(percent)
        }
    }

    /// Get the duty as a percentage
    #[must_use]
    pub const fn as_percent(self) -> u8 {
        self.0
    }

    /// PWM compare value for a 16-bit timer
    #[must_use]
    pub const fn as_pwm_duty(self) -> u16 {
        // Map 0-100% to PWM range (0-65535)
        (self.0 as u16) * 655
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for FanDuty {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}%", self.0);
    }
}

/// Full set of hardware outputs for one tick
///
/// A pure function of fault state, transmit state, band and
/// temperature. The struct exists so that invariant is checkable in
/// one place; no output is driven from anywhere else.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActuatorCommand {
    /// Gate bias supply to the LDMOS pair
    pub bias_enable: bool,
    /// T/R path closed through the amplifier
    pub rf_connect: bool,
    /// Inhibit line towards the exciter's PTT chain
    pub ptt_inhibit: bool,
    /// Cooling fan drive
    pub fan_duty: FanDuty,
    /// Filter bank relay image, always one-hot
    pub relays: [bool; FILTER_BANKS],
}

impl ActuatorCommand {
    /// Check the relay image drives exactly one bank
    #[must_use]
    pub fn relays_one_hot(&self) -> bool {
        self.relays.iter().filter(|&&on| on).count() == 1
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ActuatorCommand {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "bias={} rf={} inhibit={} fan={}",
            self.bias_enable,
            self.rf_connect,
            self.ptt_inhibit,
            self.fan_duty,
        );
    }
}

/// Break-in style for the keyer sequencer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum QskMode {
    /// Full break-in: drop to receive immediately on key release
    #[default]
    Full,
    /// Semi break-in: hold transmit through a hang interval
    Semi,
}

#[cfg(feature = "embedded")]
impl defmt::Format for QskMode {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Full => defmt::write!(f, "full QSK"),
            Self::Semi => defmt::write!(f, "semi QSK"),
        }
    }
}
