//! Fault Evaluator Tests
//!
//! Trip debounce, hysteresis release, strike escalation to the latch
//! and the oscillation signatures.
//! Run with: cargo test --test fault_tests

use hfamp_firmware::config::PROFILE;
use hfamp_firmware::fault::{FaultEvaluator, ProfileError};
use hfamp_firmware::types::{
    FaultKind, FaultState, LatchCause, SelfTestCode, SensorChannel, SensorSample, Tick,
};

fn t(ms: u64) -> Tick {
    Tick::from_ticks(ms)
}

/// Sample on a 28 V rail; drive only the channels under test
///
/// Tests that exercise one fault kind pick the other channels so no
/// second signature fires (over-current vectors carry enough forward
/// power to stay clear of the efficiency-collapse check).
fn sample(vd: f32, id: f32, fwd: f32, rfl: f32, temp: f32) -> SensorSample {
    SensorSample {
        drain_voltage: vd,
        drain_current: id,
        supply_voltage: 28.0,
        temperature: temp,
        forward_power: fwd,
        reflected_power: rfl,
        tick: Tick::ZERO,
        self_test: None,
    }
}

fn quiet() -> SensorSample {
    sample(28.0, 0.5, 0.0, 0.0, 25.0)
}

fn evaluator() -> FaultEvaluator {
    FaultEvaluator::new(PROFILE).unwrap()
}

// =============================================================================
// Profile Validation Tests
// =============================================================================

#[test]
fn test_startup_profile_validates() {
    assert!(PROFILE.validate().is_ok());
}

#[test]
fn test_profile_rejects_non_positive_margin() {
    let mut p = PROFILE;
    p.voltage_release_margin_v = 0.0;
    assert_eq!(p.validate(), Err(ProfileError::NonPositiveMargin));
}

#[test]
fn test_profile_rejects_margin_wider_than_threshold() {
    let mut p = PROFILE;
    p.current_release_margin_a = 20.0;
    assert_eq!(p.validate(), Err(ProfileError::MarginTooWide));
}

#[test]
fn test_profile_rejects_zero_strike_limit() {
    let mut p = PROFILE;
    p.strike_limit = 0;
    assert_eq!(p.validate(), Err(ProfileError::ZeroStrikeLimit));
}

#[test]
fn test_profile_rejects_ripple_decay_of_one() {
    // A decay of 1.0 would hold the envelope peak forever
    let mut p = PROFILE;
    p.osc_ripple_decay = 1.0;
    assert_eq!(p.validate(), Err(ProfileError::InvalidOscillationParams));
}

// =============================================================================
// Over-Voltage Tests
// =============================================================================

#[test]
fn test_quiet_sample_stays_normal() {
    let mut ev = evaluator();
    assert_eq!(ev.evaluate(&quiet(), t(0)), FaultState::Normal);
    assert_eq!(ev.evaluate(&quiet(), t(1000)), FaultState::Normal);
}

#[test]
fn test_overvoltage_trips_without_debounce() {
    // 36 V against the 35 V limit must cut on the same tick
    let mut ev = evaluator();
    let state = ev.evaluate(&sample(36.0, 0.5, 0.0, 0.0, 25.0), t(0));
    assert_eq!(state, FaultState::OverVoltage);
}

#[test]
fn test_overvoltage_latches_on_second_strike() {
    let mut ev = evaluator();
    // First excursion trips and takes strike one
    assert_eq!(
        ev.evaluate(&sample(36.0, 0.5, 0.0, 0.0, 25.0), t(0)),
        FaultState::OverVoltage
    );
    // Back inside the release band (35 - 2 = 33 V), clears after 50 ms
    ev.evaluate(&sample(30.0, 0.5, 0.0, 0.0, 25.0), t(1));
    assert_eq!(
        ev.evaluate(&sample(30.0, 0.5, 0.0, 0.0, 25.0), t(51)),
        FaultState::Normal
    );
    // Second excursion inside the strike memory latches immediately
    assert_eq!(
        ev.evaluate(&sample(36.0, 0.5, 0.0, 0.0, 25.0), t(60)),
        FaultState::Latched(LatchCause::Electrical(FaultKind::OverVoltage))
    );
}

#[test]
fn test_strikes_decay_after_the_memory_interval() {
    let mut ev = evaluator();
    ev.evaluate(&sample(36.0, 0.5, 0.0, 0.0, 25.0), t(0));
    ev.evaluate(&sample(30.0, 0.5, 0.0, 0.0, 25.0), t(1));
    ev.evaluate(&sample(30.0, 0.5, 0.0, 0.0, 25.0), t(51));
    // 11 s later is past the 10 s strike memory: trip again, no latch
    let state = ev.evaluate(&sample(36.0, 0.5, 0.0, 0.0, 25.0), t(11_000));
    assert_eq!(state, FaultState::OverVoltage);
}

// =============================================================================
// Over-Current Tests
// =============================================================================

#[test]
fn test_overcurrent_needs_the_debounce_window() {
    let mut ev = evaluator();
    // 10 A against the 9 A limit; forward power keeps efficiency sane
    assert_eq!(
        ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(0)),
        FaultState::Normal
    );
    assert_eq!(
        ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(49)),
        FaultState::Normal
    );
    assert_eq!(
        ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(50)),
        FaultState::OverCurrent
    );
}

#[test]
fn test_overcurrent_glitch_does_not_trip() {
    let mut ev = evaluator();
    ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(0));
    // Condition gone before the window elapses; timer must restart
    assert_eq!(ev.evaluate(&quiet(), t(20)), FaultState::Normal);
    assert_eq!(ev.evaluate(&quiet(), t(60)), FaultState::Normal);
}

#[test]
fn test_sustained_overcurrent_latches_by_persistence() {
    let mut ev = evaluator();
    ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(0));
    // Trip at 50 ms is strike one
    assert_eq!(
        ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(50)),
        FaultState::OverCurrent
    );
    // Each further full window held adds a strike; three strikes latch
    assert_eq!(
        ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(100)),
        FaultState::OverCurrent
    );
    assert_eq!(
        ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(150)),
        FaultState::Latched(LatchCause::Electrical(FaultKind::OverCurrent))
    );
}

#[test]
fn test_overcurrent_releases_through_hysteresis() {
    let mut ev = evaluator();
    ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(0));
    ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(50));
    // 8.0 A sits below the 8.5 A release threshold
    ev.evaluate(&sample(28.0, 8.0, 100.0, 0.0, 25.0), t(60));
    assert_eq!(
        ev.evaluate(&sample(28.0, 8.0, 100.0, 0.0, 25.0), t(109)),
        FaultState::OverCurrent
    );
    assert_eq!(
        ev.evaluate(&sample(28.0, 8.0, 100.0, 0.0, 25.0), t(110)),
        FaultState::Normal
    );
}

#[test]
fn test_holding_inside_the_hysteresis_band_latches() {
    let mut ev = evaluator();
    ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(0));
    ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(50));
    // 8.7 A is under the trip but above the release threshold: the
    // fault neither clears nor re-debounces, and persistence strikes
    // keep accruing until the latch
    ev.evaluate(&sample(28.0, 8.7, 100.0, 0.0, 25.0), t(60));
    assert_eq!(
        ev.evaluate(&sample(28.0, 8.7, 100.0, 0.0, 25.0), t(100)),
        FaultState::OverCurrent
    );
    assert_eq!(
        ev.evaluate(&sample(28.0, 8.7, 100.0, 0.0, 25.0), t(150)),
        FaultState::Latched(LatchCause::Electrical(FaultKind::OverCurrent))
    );
}

// =============================================================================
// Thermal Tests
// =============================================================================

#[test]
fn test_thermal_trip_needs_sustained_overtemperature() {
    let mut ev = evaluator();
    assert_eq!(
        ev.evaluate(&sample(28.0, 0.5, 0.0, 0.0, 45.0), t(0)),
        FaultState::Normal
    );
    assert_eq!(
        ev.evaluate(&sample(28.0, 0.5, 0.0, 0.0, 45.0), t(4999)),
        FaultState::Normal
    );
    assert_eq!(
        ev.evaluate(&sample(28.0, 0.5, 0.0, 0.0, 45.0), t(5000)),
        FaultState::OverTemperature
    );
}

#[test]
fn test_sustained_overtemperature_latches() {
    let mut ev = evaluator();
    ev.evaluate(&sample(28.0, 0.5, 0.0, 0.0, 45.0), t(0));
    ev.evaluate(&sample(28.0, 0.5, 0.0, 0.0, 45.0), t(5000));
    assert_eq!(
        ev.evaluate(&sample(28.0, 0.5, 0.0, 0.0, 45.0), t(10_000)),
        FaultState::OverTemperature
    );
    assert_eq!(
        ev.evaluate(&sample(28.0, 0.5, 0.0, 0.0, 45.0), t(15_000)),
        FaultState::Latched(LatchCause::Electrical(FaultKind::OverTemperature))
    );
}

#[test]
fn test_thermal_releases_below_the_margin() {
    let mut ev = evaluator();
    ev.evaluate(&sample(28.0, 0.5, 0.0, 0.0, 45.0), t(0));
    ev.evaluate(&sample(28.0, 0.5, 0.0, 0.0, 45.0), t(5000));
    // 36 C is below the 37 C release threshold (40 - 3)
    ev.evaluate(&sample(28.0, 0.5, 0.0, 0.0, 36.0), t(5100));
    assert_eq!(
        ev.evaluate(&sample(28.0, 0.5, 0.0, 0.0, 36.0), t(5150)),
        FaultState::Normal
    );
}

// =============================================================================
// Oscillation Signature Tests
// =============================================================================

#[test]
fn test_reflection_signature_trips_and_releases() {
    let mut ev = evaluator();
    // 31 W reflected on a 50 W carrier, clear of the 60% threshold
    ev.evaluate(&sample(28.0, 6.0, 50.0, 31.0, 25.0), t(0));
    assert_eq!(
        ev.evaluate(&sample(28.0, 6.0, 50.0, 31.0, 25.0), t(50)),
        FaultState::Oscillation
    );
    // Reflection back to normal: the signature clears, then the
    // release window runs
    ev.evaluate(&sample(28.0, 6.0, 50.0, 5.0, 25.0), t(60));
    assert_eq!(
        ev.evaluate(&sample(28.0, 6.0, 50.0, 5.0, 25.0), t(110)),
        FaultState::Normal
    );
}

#[test]
fn test_efficiency_collapse_trips() {
    let mut ev = evaluator();
    // 6 A from 28 V is 168 W in; 10 W out is far under the 25% floor
    ev.evaluate(&sample(28.0, 6.0, 10.0, 0.0, 25.0), t(0));
    assert_eq!(
        ev.evaluate(&sample(28.0, 6.0, 10.0, 0.0, 25.0), t(50)),
        FaultState::Oscillation
    );
}

#[test]
fn test_recovery_step_ripple_decays_with_elapsed_time() {
    let mut ev = evaluator();
    ev.evaluate(&sample(28.0, 6.0, 60.0, 5.0, 25.0), t(0));
    // A single 3 A step loads the peak-hold, then nothing for 59 ms;
    // the envelope decays across the gap, not per call, so the ripple
    // signature never completes its debounce
    ev.evaluate(&sample(28.0, 3.0, 60.0, 5.0, 25.0), t(1));
    assert_eq!(
        ev.evaluate(&sample(28.0, 3.0, 60.0, 5.0, 25.0), t(60)),
        FaultState::Normal
    );
}

#[test]
fn test_ripple_envelope_trips_and_decays() {
    let mut ev = evaluator();
    let mut state = FaultState::Normal;
    // 3 A of tick-to-tick drain current swing with healthy RF out
    for ms in 0..=51 {
        let id = if ms % 2 == 0 { 3.0 } else { 6.0 };
        state = ev.evaluate(&sample(28.0, id, 60.0, 5.0, 25.0), t(ms));
    }
    assert_eq!(state, FaultState::Oscillation);
    // Steady current lets the peak-hold envelope decay below the
    // limit; release then runs the normal clear window
    for ms in 52..=140 {
        state = ev.evaluate(&sample(28.0, 4.5, 60.0, 5.0, 25.0), t(ms));
    }
    assert_eq!(state, FaultState::Normal);
}

// =============================================================================
// Input SWR Advisory Tests
// =============================================================================

#[test]
fn test_high_swr_is_advisory_only() {
    let mut ev = evaluator();
    // 20 W forward, 10 W reflected is SWR 5.8
    ev.evaluate(&sample(28.0, 1.5, 20.0, 10.0, 25.0), t(0));
    let state = ev.evaluate(&sample(28.0, 1.5, 20.0, 10.0, 25.0), t(50));
    assert_eq!(state, FaultState::InputSwr);
    assert!(state.permits_transmit());
}

#[test]
fn test_swr_advisory_releases_with_hysteresis() {
    let mut ev = evaluator();
    ev.evaluate(&sample(28.0, 1.5, 20.0, 10.0, 25.0), t(0));
    ev.evaluate(&sample(28.0, 1.5, 20.0, 10.0, 25.0), t(50));
    // SWR 1.4 sits below the 2.7 release threshold
    ev.evaluate(&sample(28.0, 1.5, 20.0, 0.5, 25.0), t(60));
    assert_eq!(
        ev.evaluate(&sample(28.0, 1.5, 20.0, 0.5, 25.0), t(110)),
        FaultState::Normal
    );
}

#[test]
fn test_swr_ignored_below_the_forward_floor() {
    let mut ev = evaluator();
    // Terrible match but only 2 W forward: below the 5 W floor the
    // bridge reads noise, so no advisory
    ev.evaluate(&sample(28.0, 0.5, 2.0, 1.9, 25.0), t(0));
    assert_eq!(
        ev.evaluate(&sample(28.0, 0.5, 2.0, 1.9, 25.0), t(100)),
        FaultState::Normal
    );
}

// =============================================================================
// Self-Test and Latch Tests
// =============================================================================

#[test]
fn test_acquisition_self_test_latches_immediately() {
    let mut ev = evaluator();
    let mut bad = quiet();
    bad.self_test = Some(SelfTestCode::SensorOutOfRange(SensorChannel::DrainCurrent));
    assert_eq!(
        ev.evaluate(&bad, t(0)),
        FaultState::Latched(LatchCause::SelfTest(SelfTestCode::SensorOutOfRange(
            SensorChannel::DrainCurrent
        )))
    );
}

#[test]
fn test_latch_is_terminal_without_reset() {
    let mut ev = evaluator();
    ev.evaluate(&sample(36.0, 0.5, 0.0, 0.0, 25.0), t(0));
    ev.evaluate(&sample(30.0, 0.5, 0.0, 0.0, 25.0), t(1));
    ev.evaluate(&sample(30.0, 0.5, 0.0, 0.0, 25.0), t(51));
    ev.evaluate(&sample(36.0, 0.5, 0.0, 0.0, 25.0), t(60));
    assert!(ev.state().is_latched());
    // Quiet samples do not clear a latch, no matter how long
    assert!(ev.evaluate(&quiet(), t(60_000)).is_latched());
}

#[test]
fn test_operator_reset_clears_a_recovered_latch() {
    let mut ev = evaluator();
    for ms in [0, 50, 100, 150] {
        ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(ms));
    }
    assert!(ev.state().is_latched());
    assert!(ev.operator_reset(&quiet(), t(200)));
    assert_eq!(ev.state(), FaultState::Normal);
}

#[test]
fn test_operator_reset_refuses_while_condition_holds() {
    let mut ev = evaluator();
    for ms in [0, 50, 100, 150] {
        ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(ms));
    }
    assert!(!ev.operator_reset(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(200)));
    assert!(ev.state().is_latched());
}

#[test]
fn test_calibration_latch_never_resets() {
    let mut ev = FaultEvaluator::latched(PROFILE, SelfTestCode::CalibrationMissing);
    assert!(ev.state().is_latched());
    assert!(!ev.operator_reset(&quiet(), t(1000)));
    assert!(ev.state().is_latched());
}

#[test]
fn test_settle_watchdog_latch_resets_once_clear() {
    let mut ev = evaluator();
    ev.notify_self_test(SelfTestCode::BiasSettleTimeout);
    assert_eq!(
        ev.state(),
        FaultState::Latched(LatchCause::SelfTest(SelfTestCode::BiasSettleTimeout))
    );
    assert!(ev.operator_reset(&quiet(), t(500)));
    assert_eq!(ev.state(), FaultState::Normal);
}

#[test]
fn test_reset_clears_strike_memory() {
    let mut ev = evaluator();
    for ms in [0, 50, 100, 150] {
        ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(ms));
    }
    assert!(ev.operator_reset(&quiet(), t(200)));
    // A fresh trip after reset starts the strike count over
    ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(300));
    assert_eq!(
        ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(350)),
        FaultState::OverCurrent
    );
}

// =============================================================================
// Priority Tests
// =============================================================================

#[test]
fn test_overvoltage_preempts_active_overcurrent() {
    let mut ev = evaluator();
    ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(0));
    assert_eq!(
        ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(50)),
        FaultState::OverCurrent
    );
    // Voltage excursion on top of the current fault takes over on the
    // same tick; over-voltage carries no debounce
    assert_eq!(
        ev.evaluate(&sample(36.0, 10.0, 100.0, 0.0, 25.0), t(60)),
        FaultState::OverVoltage
    );
}

#[test]
fn test_release_hands_over_to_a_pending_lower_priority_fault() {
    let mut ev = evaluator();
    ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(0));
    assert_eq!(
        ev.evaluate(&sample(28.0, 10.0, 100.0, 0.0, 25.0), t(50)),
        FaultState::OverCurrent
    );
    // Current drops into its release band while the reflection
    // signature comes up; both windows run concurrently
    ev.evaluate(&sample(28.0, 8.0, 50.0, 31.0, 25.0), t(60));
    // The over-current release and the oscillation trip debounce both
    // complete at t=110; the handover happens on that tick with no
    // intervening Normal
    assert_eq!(
        ev.evaluate(&sample(28.0, 8.0, 50.0, 31.0, 25.0), t(110)),
        FaultState::Oscillation
    );
}
