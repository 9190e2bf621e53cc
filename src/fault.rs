//! Fault evaluation state machine
//!
//! Owns the [`FaultState`] and every transition into and out of it.
//! Trip decisions are debounced per fault kind, clearing goes through
//! hysteresis release bands, and repeated or sustained trips escalate
//! to the terminal latch through a strike counter.

use crate::types::{FaultKind, FaultState, LatchCause, SelfTestCode, SensorSample, Tick};
#[cfg(feature = "embedded")]
use micromath::F32Ext;

/// Fault kinds in evaluation priority order, highest first
const PRIORITY: [FaultKind; 4] = [
    FaultKind::OverVoltage,
    FaultKind::OverCurrent,
    FaultKind::Oscillation,
    FaultKind::OverTemperature,
];

/// Array index (and priority rank) for a fault kind
const fn kind_index(kind: FaultKind) -> usize {
    match kind {
        FaultKind::OverVoltage => 0,
        FaultKind::OverCurrent => 1,
        FaultKind::Oscillation => 2,
        FaultKind::OverTemperature => 3,
    }
}

/// Fault state for an active (not latched) kind
const fn kind_state(kind: FaultKind) -> FaultState {
    match kind {
        FaultKind::OverVoltage => FaultState::OverVoltage,
        FaultKind::OverCurrent => FaultState::OverCurrent,
        FaultKind::Oscillation => FaultState::Oscillation,
        FaultKind::OverTemperature => FaultState::OverTemperature,
    }
}

/// Static protection thresholds, margins and windows
///
/// Fixed at build time ([`crate::config::PROFILE`]) and validated
/// once at controller construction. Every release threshold
/// (trip minus margin) sits strictly inside its trip threshold.
#[derive(Clone, Copy, Debug)]
pub struct ThresholdProfile {
    /// Drain over-voltage trip, in volts
    pub max_drain_voltage_v: f32,
    /// Drain over-current trip, in amps
    pub max_drain_current_a: f32,
    /// Thermal trip, in degrees C
    pub max_temperature_c: f32,
    /// Input SWR advisory trip
    pub max_input_swr: f32,
    /// Voltage hysteresis below the trip for release
    pub voltage_release_margin_v: f32,
    /// Current hysteresis below the trip for release
    pub current_release_margin_a: f32,
    /// Temperature hysteresis below the trip for release
    pub temperature_release_margin_c: f32,
    /// SWR hysteresis below the trip for release
    pub swr_release_margin: f32,
    /// Forward power floor below which SWR is not evaluated, in watts
    pub swr_forward_floor_w: f32,
    /// Electrical debounce window, in milliseconds
    pub debounce_window_ms: u64,
    /// Thermal debounce window, in milliseconds
    pub thermal_debounce_ms: u64,
    /// Reflected/forward ratio treated as an oscillation signature
    pub osc_reflection_ratio: f32,
    /// Forward power floor for the reflection signature, in watts
    pub osc_forward_floor_w: f32,
    /// Drain current ripple envelope treated as oscillation, in amps
    pub osc_ripple_max_a: f32,
    /// Per-tick decay of the ripple envelope peak-hold
    pub osc_ripple_decay: f32,
    /// Minimum forward power as a fraction of DC input power
    pub osc_forward_min_fraction: f32,
    /// Drain current floor for the efficiency-collapse signature
    pub osc_min_current_a: f32,
    /// DC input power floor for the efficiency-collapse signature
    pub osc_min_dc_power_w: f32,
    /// Strike memory: trips further apart than this do not accumulate
    pub strike_decay_ms: u64,
    /// Strikes before an over-voltage fault latches
    pub overvoltage_strike_limit: u8,
    /// Strikes before any other electrical fault latches
    pub strike_limit: u8,
}

/// Why a threshold profile failed validation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProfileError {
    /// A trip threshold is zero or negative
    NonPositiveThreshold,
    /// A release margin is zero or negative
    NonPositiveMargin,
    /// A release margin swallows its whole threshold
    MarginTooWide,
    /// The electrical debounce window is zero
    ZeroDebounce,
    /// A strike limit is zero
    ZeroStrikeLimit,
    /// An oscillation parameter is outside its meaningful range
    InvalidOscillationParams,
}

impl ThresholdProfile {
    /// Validate thresholds, margins and windows
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.max_drain_voltage_v <= 0.0
            || self.max_drain_current_a <= 0.0
            || self.max_temperature_c <= 0.0
            || self.max_input_swr <= 1.0
        {
            return Err(ProfileError::NonPositiveThreshold);
        }
        if self.voltage_release_margin_v <= 0.0
            || self.current_release_margin_a <= 0.0
            || self.temperature_release_margin_c <= 0.0
            || self.swr_release_margin <= 0.0
        {
            return Err(ProfileError::NonPositiveMargin);
        }
        if self.voltage_release_margin_v >= self.max_drain_voltage_v
            || self.current_release_margin_a >= self.max_drain_current_a
            || self.temperature_release_margin_c >= self.max_temperature_c
            || self.swr_release_margin >= self.max_input_swr - 1.0
        {
            return Err(ProfileError::MarginTooWide);
        }
        if self.debounce_window_ms == 0 || self.thermal_debounce_ms < self.debounce_window_ms {
            return Err(ProfileError::ZeroDebounce);
        }
        if self.overvoltage_strike_limit == 0 || self.strike_limit == 0 {
            return Err(ProfileError::ZeroStrikeLimit);
        }
        if self.osc_reflection_ratio <= 0.0
            || self.osc_reflection_ratio > 1.0
            || self.osc_forward_floor_w < 0.0
            || self.osc_ripple_max_a <= 0.0
            || self.osc_ripple_decay <= 0.0
            || self.osc_ripple_decay >= 1.0
            || self.osc_forward_min_fraction <= 0.0
            || self.osc_forward_min_fraction >= 1.0
            || self.osc_min_current_a < 0.0
            || self.osc_min_dc_power_w < 0.0
            || self.swr_forward_floor_w < 0.0
        {
            return Err(ProfileError::InvalidOscillationParams);
        }
        Ok(())
    }

    /// Debounce window before a kind trips
    ///
    /// Over-voltage trips without debounce; thermal faults get the
    /// long window; everything else uses the electrical window.
    #[must_use]
    pub const fn trip_debounce_ms(&self, kind: FaultKind) -> u64 {
        match kind {
            FaultKind::OverVoltage => 0,
            FaultKind::OverTemperature => self.thermal_debounce_ms,
            FaultKind::OverCurrent | FaultKind::Oscillation => self.debounce_window_ms,
        }
    }

    /// Window length used when counting persistence strikes
    #[must_use]
    pub const fn persist_window_ms(&self, kind: FaultKind) -> u64 {
        let trip = self.trip_debounce_ms(kind);
        if trip < self.debounce_window_ms {
            self.debounce_window_ms
        } else {
            trip
        }
    }

    /// Strike limit before a kind promotes to the latch
    #[must_use]
    pub const fn strike_limit_for(&self, kind: FaultKind) -> u8 {
        match kind {
            FaultKind::OverVoltage => self.overvoltage_strike_limit,
            FaultKind::OverCurrent | FaultKind::Oscillation | FaultKind::OverTemperature => {
                self.strike_limit
            }
        }
    }
}

/// Fault evaluator
///
/// Serviced once per tick with the fresh sample. Holds the only
/// mutable fault state in the system; everything else reads the
/// returned value.
#[derive(Clone, Debug)]
pub struct FaultEvaluator {
    /// Threshold profile
    profile: ThresholdProfile,
    /// Current fault state
    state: FaultState,
    /// Per-kind tick at which the trip condition was first seen
    over_since: [Option<Tick>; 4],
    /// Per-kind accumulated strikes
    strikes: [u8; 4],
    /// Per-kind tick of the most recent strike
    last_strike: [Option<Tick>; 4],
    /// Tick the active fault tripped
    active_entry: Option<Tick>,
    /// Persistence windows already struck for the active fault
    struck_windows: u64,
    /// Tick the active fault's measurement entered the release band
    clear_since: Option<Tick>,
    /// Tick the SWR advisory condition was first seen
    swr_over_since: Option<Tick>,
    /// Tick the SWR advisory release condition was first seen
    swr_clear_since: Option<Tick>,
    /// Drain current ripple envelope (peak-hold with decay)
    ripple_env: f32,
    /// Previous drain current and its tick, for the ripple delta
    prev_current: Option<(f32, Tick)>,
    /// Oscillation signature result for the current tick
    osc_active: bool,
}

impl FaultEvaluator {
    /// Create an evaluator, validating the profile first
    pub fn new(profile: ThresholdProfile) -> Result<Self, ProfileError> {
        profile.validate()?;
        Ok(Self::with_state(profile, FaultState::Normal))
    }

    /// Create an evaluator armed directly into the terminal latch
    ///
    /// Used when configuration validation fails at startup: the
    /// firmware keeps running so telemetry and the reset input stay
    /// alive, but the amplifier never leaves the fail-safe state.
    #[must_use]
    pub fn latched(profile: ThresholdProfile, code: SelfTestCode) -> Self {
        Self::with_state(profile, FaultState::Latched(LatchCause::SelfTest(code)))
    }

    fn with_state(profile: ThresholdProfile, state: FaultState) -> Self {
        Self {
            profile,
            state,
            over_since: [None; 4],
            strikes: [0; 4],
            last_strike: [None; 4],
            active_entry: None,
            struck_windows: 0,
            clear_since: None,
            swr_over_since: None,
            swr_clear_since: None,
            ripple_env: 0.0,
            prev_current: None,
            osc_active: false,
        }
    }

    /// Get the current fault state
    #[must_use]
    pub const fn state(&self) -> FaultState {
        self.state
    }

    /// Get the threshold profile in force
    #[must_use]
    pub const fn profile(&self) -> &ThresholdProfile {
        &self.profile
    }

    /// Evaluate one sample, returning the fault state for this tick
    pub fn evaluate(&mut self, sample: &SensorSample, now: Tick) -> FaultState {
        if let Some(code) = sample.self_test {
            if !self.state.is_latched() {
                self.state = FaultState::Latched(LatchCause::SelfTest(code));
            }
            return self.state;
        }

        // Signal tracking continues while latched so the ripple
        // envelope decays and a later reset sees current conditions.
        self.track_signals(sample, now);

        if self.state.is_latched() {
            return self.state;
        }

        let candidate = self.debounced_candidate(now);

        match self.state.electrical_kind() {
            None => {
                if let Some(kind) = candidate {
                    self.enter_fault(kind, now);
                } else {
                    self.state = self.idle_state(now);
                }
            }
            Some(active) => {
                if let Some(kind) = candidate {
                    if kind_index(kind) < kind_index(active) {
                        self.enter_fault(kind, now);
                        return self.state;
                    }
                }
                if self.inside_release_band(active, sample) {
                    match self.clear_since {
                        Some(since)
                            if now.millis_since(since) >= self.profile.debounce_window_ms =>
                        {
                            self.exit_fault(active, now);
                            // Hand over in the same tick when another
                            // kind's trip debounce elapsed during the
                            // release window.
                            if let Some(next) = self.debounced_candidate(now) {
                                self.enter_fault(next, now);
                            }
                        }
                        Some(_) => {}
                        None => self.clear_since = Some(now),
                    }
                } else {
                    self.clear_since = None;
                    self.accrue_persistence(active, now);
                }
            }
        }

        self.state
    }

    /// Latch on a self-test failure raised outside acquisition
    ///
    /// The sequencer reports its settle watchdog through this path.
    pub fn notify_self_test(&mut self, code: SelfTestCode) {
        if !self.state.is_latched() {
            self.state = FaultState::Latched(LatchCause::SelfTest(code));
        }
    }

    /// Operator reset of the terminal latch
    ///
    /// Clears only when the latched cause's measurement sits inside
    /// its release band; otherwise the latch holds and `false` is
    /// returned. A calibration latch never clears at runtime.
    pub fn operator_reset(&mut self, sample: &SensorSample, now: Tick) -> bool {
        let FaultState::Latched(cause) = self.state else {
            return false;
        };
        let clearable = match cause {
            LatchCause::Electrical(kind) => self.inside_release_band(kind, sample),
            LatchCause::SelfTest(SelfTestCode::CalibrationMissing) => false,
            LatchCause::SelfTest(_) => sample.self_test.is_none(),
        };
        if !clearable {
            return false;
        }
        self.over_since = [None; 4];
        self.strikes = [0; 4];
        self.last_strike = [None; 4];
        self.active_entry = None;
        self.struck_windows = 0;
        self.clear_since = None;
        self.state = self.idle_state(now);
        true
    }

    /// Update ripple envelope, per-kind trip timers and SWR timers
    ///
    /// The envelope decay is per elapsed millisecond, so the peak-hold
    /// tracks wall time rather than call count.
    fn track_signals(&mut self, sample: &SensorSample, now: Tick) {
        let (ripple, decay) = match self.prev_current {
            Some((prev, at)) => (
                (sample.drain_current - prev).abs(),
                self.profile
                    .osc_ripple_decay
                    .powf(now.millis_since(at) as f32),
            ),
            None => (0.0, 0.0),
        };
        self.prev_current = Some((sample.drain_current, now));
        self.ripple_env = ripple.max(self.ripple_env * decay);
        self.osc_active = self.oscillation_signature(sample);

        let over = [
            sample.drain_voltage > self.profile.max_drain_voltage_v,
            sample.drain_current > self.profile.max_drain_current_a,
            self.osc_active,
            sample.temperature > self.profile.max_temperature_c,
        ];
        for (idx, &is_over) in over.iter().enumerate() {
            if is_over {
                if self.over_since[idx].is_none() {
                    self.over_since[idx] = Some(now);
                }
            } else {
                self.over_since[idx] = None;
            }
        }

        let swr_meaningful = sample.forward_power >= self.profile.swr_forward_floor_w;
        let swr_over = swr_meaningful && sample.swr() > self.profile.max_input_swr;
        let swr_released = !swr_meaningful
            || sample.swr() <= self.profile.max_input_swr - self.profile.swr_release_margin;
        if swr_over {
            if self.swr_over_since.is_none() {
                self.swr_over_since = Some(now);
            }
        } else {
            self.swr_over_since = None;
        }
        if swr_released {
            if self.swr_clear_since.is_none() {
                self.swr_clear_since = Some(now);
            }
        } else {
            self.swr_clear_since = None;
        }
    }

    /// Combined oscillation heuristic for the current tick
    fn oscillation_signature(&self, sample: &SensorSample) -> bool {
        let p = &self.profile;

        // Reflected power dominating forward with real drive present;
        // the forward floor keeps the quotient away from zero
        let reflection = sample.forward_power >= p.osc_forward_floor_w
            && sample.reflected_power / sample.forward_power >= p.osc_reflection_ratio;

        // Drain current ripple envelope above the slew limit
        let ripple = self.ripple_env > p.osc_ripple_max_a;

        // Efficiency collapse: drawing DC power without producing RF
        let dc_power = sample.dc_input_power();
        let collapse = sample.drain_current >= p.osc_min_current_a
            && dc_power >= p.osc_min_dc_power_w
            && sample.forward_power < p.osc_forward_min_fraction * dc_power;

        reflection || ripple || collapse
    }

    /// Highest-priority kind whose trip debounce has elapsed
    fn debounced_candidate(&self, now: Tick) -> Option<FaultKind> {
        for kind in PRIORITY {
            if let Some(since) = self.over_since[kind_index(kind)] {
                if now.millis_since(since) >= self.profile.trip_debounce_ms(kind) {
                    return Some(kind);
                }
            }
        }
        None
    }

    /// Check the active kind's measurement against its release band
    fn inside_release_band(&self, kind: FaultKind, sample: &SensorSample) -> bool {
        let p = &self.profile;
        match kind {
            FaultKind::OverVoltage => {
                sample.drain_voltage <= p.max_drain_voltage_v - p.voltage_release_margin_v
            }
            FaultKind::OverCurrent => {
                sample.drain_current <= p.max_drain_current_a - p.current_release_margin_a
            }
            FaultKind::OverTemperature => {
                sample.temperature <= p.max_temperature_c - p.temperature_release_margin_c
            }
            // The envelope decay is the hysteresis for oscillation
            FaultKind::Oscillation => !self.osc_active,
        }
    }

    /// Idle state when no electrical fault is active: Normal, or the
    /// SWR advisory when its condition has held for the window
    fn idle_state(&self, now: Tick) -> FaultState {
        if self.state == FaultState::InputSwr {
            if let Some(since) = self.swr_clear_since {
                if now.millis_since(since) >= self.profile.debounce_window_ms {
                    return FaultState::Normal;
                }
            }
            FaultState::InputSwr
        } else {
            if let Some(since) = self.swr_over_since {
                if now.millis_since(since) >= self.profile.debounce_window_ms {
                    return FaultState::InputSwr;
                }
            }
            FaultState::Normal
        }
    }

    /// Enter an electrical fault state and take the entry strike
    fn enter_fault(&mut self, kind: FaultKind, now: Tick) {
        self.state = kind_state(kind);
        self.active_entry = Some(now);
        self.struck_windows = 0;
        self.clear_since = None;
        self.strike(kind, now);
    }

    /// Leave the active fault after a full release window
    fn exit_fault(&mut self, kind: FaultKind, now: Tick) {
        self.over_since[kind_index(kind)] = None;
        self.active_entry = None;
        self.struck_windows = 0;
        self.clear_since = None;
        self.state = self.idle_state(now);
    }

    /// Count one strike against a kind, promoting to the latch at the
    /// limit
    fn strike(&mut self, kind: FaultKind, now: Tick) {
        let idx = kind_index(kind);
        if let Some(last) = self.last_strike[idx] {
            if now.millis_since(last) >= self.profile.strike_decay_ms {
                self.strikes[idx] = 0;
            }
        }
        self.strikes[idx] = self.strikes[idx].saturating_add(1);
        self.last_strike[idx] = Some(now);
        if self.strikes[idx] >= self.profile.strike_limit_for(kind) {
            self.state = FaultState::Latched(LatchCause::Electrical(kind));
        }
    }

    /// Strike one per additional full persistence window while the
    /// active fault's condition holds
    fn accrue_persistence(&mut self, kind: FaultKind, now: Tick) {
        let Some(entry) = self.active_entry else {
            return;
        };
        let window = self.profile.persist_window_ms(kind);
        let windows = now.millis_since(entry) / window;
        while self.struck_windows < windows {
            self.struck_windows += 1;
            self.strike(kind, now);
            if self.state.is_latched() {
                return;
            }
        }
    }
}
