//! Keyer Sequencer Tests
//!
//! Bias-before-RF ordering, the settle watchdog, break-in styles and
//! fault preemption.
//! Run with: cargo test --test sequencer_tests

use hfamp_firmware::sequencer::{Sequencer, SequencerEvent};
use hfamp_firmware::types::{
    ErrorCode, FaultKind, FaultState, LatchCause, QskMode, SelfTestCode, Tick, TransmitState,
};

fn t(ms: u64) -> Tick {
    Tick::from_ticks(ms)
}

const NORMAL: FaultState = FaultState::Normal;

// =============================================================================
// Key-Up Sequencing Tests
// =============================================================================

#[test]
fn test_starts_in_receive() {
    let seq = Sequencer::new(QskMode::Full);
    assert_eq!(seq.state(), TransmitState::Receive);
}

#[test]
fn test_key_walks_up_through_bias_settle() {
    let mut seq = Sequencer::new(QskMode::Full);
    seq.service(true, NORMAL, None, t(0));
    assert_eq!(seq.state(), TransmitState::SequencingUp);
    // Bias settle is 15 ms; the RF path must not close early
    seq.service(true, NORMAL, None, t(14));
    assert_eq!(seq.state(), TransmitState::SequencingUp);
    seq.service(true, NORMAL, None, t(15));
    assert_eq!(seq.state(), TransmitState::KeyedTransmitting);
}

#[test]
fn test_confirmed_feedback_closes_at_the_settle_delay() {
    let mut seq = Sequencer::new(QskMode::Full);
    seq.service(true, NORMAL, Some(true), t(0));
    // Early confirmation does not shortcut the fixed settle delay
    seq.service(true, NORMAL, Some(true), t(5));
    assert_eq!(seq.state(), TransmitState::SequencingUp);
    seq.service(true, NORMAL, Some(true), t(15));
    assert_eq!(seq.state(), TransmitState::KeyedTransmitting);
}

#[test]
fn test_unconfirmed_feedback_holds_the_sequence() {
    let mut seq = Sequencer::new(QskMode::Full);
    seq.service(true, NORMAL, Some(false), t(0));
    // Rail never confirms: well past the settle delay, still waiting
    seq.service(true, NORMAL, Some(false), t(50));
    assert_eq!(seq.state(), TransmitState::SequencingUp);
}

#[test]
fn test_settle_watchdog_aborts_the_sequence() {
    let mut seq = Sequencer::new(QskMode::Full);
    seq.service(true, NORMAL, Some(false), t(0));
    seq.service(true, NORMAL, Some(false), t(99));
    assert_eq!(seq.state(), TransmitState::SequencingUp);
    let event = seq.service(true, NORMAL, Some(false), t(100));
    assert_eq!(event, SequencerEvent::SettleTimeout);
    assert_eq!(seq.state(), TransmitState::SequencingDown);
}

#[test]
fn test_late_confirmation_beats_the_watchdog() {
    let mut seq = Sequencer::new(QskMode::Full);
    seq.service(true, NORMAL, Some(false), t(0));
    seq.service(true, NORMAL, Some(false), t(60));
    // Rail comes up at 70 ms, inside the 100 ms watchdog
    let event = seq.service(true, NORMAL, Some(true), t(70));
    assert_eq!(event, SequencerEvent::None);
    assert_eq!(seq.state(), TransmitState::KeyedTransmitting);
}

#[test]
fn test_key_release_mid_sequence_aborts() {
    let mut seq = Sequencer::new(QskMode::Full);
    seq.service(true, NORMAL, None, t(0));
    assert_eq!(seq.state(), TransmitState::SequencingUp);
    // Operator lets go before the RF path ever closed
    seq.service(false, NORMAL, None, t(5));
    assert_eq!(seq.state(), TransmitState::SequencingDown);
}

// =============================================================================
// Key-Down Sequencing Tests
// =============================================================================

#[test]
fn test_full_qsk_drops_immediately() {
    let mut seq = Sequencer::new(QskMode::Full);
    seq.service(true, NORMAL, None, t(0));
    seq.service(true, NORMAL, None, t(15));
    assert_eq!(seq.state(), TransmitState::KeyedTransmitting);
    seq.service(false, NORMAL, None, t(100));
    assert_eq!(seq.state(), TransmitState::SequencingDown);
}

#[test]
fn test_bias_drop_delay_before_receive() {
    let mut seq = Sequencer::new(QskMode::Full);
    seq.service(true, NORMAL, None, t(0));
    seq.service(true, NORMAL, None, t(15));
    seq.service(false, NORMAL, None, t(100));
    // Bias drains for 10 ms after the RF path opens
    seq.service(false, NORMAL, None, t(109));
    assert_eq!(seq.state(), TransmitState::SequencingDown);
    seq.service(false, NORMAL, None, t(110));
    assert_eq!(seq.state(), TransmitState::Receive);
}

#[test]
fn test_semi_qsk_hangs_through_the_interval() {
    let mut seq = Sequencer::new(QskMode::Semi);
    seq.service(true, NORMAL, None, t(0));
    seq.service(true, NORMAL, None, t(15));
    seq.service(false, NORMAL, None, t(100));
    // Hang interval is 300 ms from release
    seq.service(false, NORMAL, None, t(399));
    assert_eq!(seq.state(), TransmitState::KeyedTransmitting);
    seq.service(false, NORMAL, None, t(400));
    assert_eq!(seq.state(), TransmitState::SequencingDown);
}

#[test]
fn test_rekey_during_hang_cancels_the_drop() {
    let mut seq = Sequencer::new(QskMode::Semi);
    seq.service(true, NORMAL, None, t(0));
    seq.service(true, NORMAL, None, t(15));
    seq.service(false, NORMAL, None, t(100));
    // Next element of the same over arrives inside the hang: no
    // re-sequencing, the transmit state never drops
    seq.service(true, NORMAL, None, t(250));
    assert_eq!(seq.state(), TransmitState::KeyedTransmitting);
    // The hang restarts from the later release
    seq.service(false, NORMAL, None, t(300));
    seq.service(false, NORMAL, None, t(599));
    assert_eq!(seq.state(), TransmitState::KeyedTransmitting);
    seq.service(false, NORMAL, None, t(600));
    assert_eq!(seq.state(), TransmitState::SequencingDown);
}

// =============================================================================
// Fault Interaction Tests
// =============================================================================

#[test]
fn test_key_blocked_reports_once_per_press() {
    let mut seq = Sequencer::new(QskMode::Full);
    let latched = FaultState::Latched(LatchCause::Electrical(FaultKind::OverCurrent));
    let event = seq.service(true, latched, None, t(0));
    assert_eq!(event, SequencerEvent::KeyBlocked(ErrorCode::Latched));
    assert_eq!(seq.state(), TransmitState::Receive);
    // Key held: the refusal does not repeat every tick
    assert_eq!(seq.service(true, latched, None, t(1)), SequencerEvent::None);
    // A fresh press reports again
    seq.service(false, latched, None, t(10));
    assert_eq!(
        seq.service(true, latched, None, t(20)),
        SequencerEvent::KeyBlocked(ErrorCode::Latched)
    );
}

#[test]
fn test_blocked_key_reports_the_active_code() {
    let mut seq = Sequencer::new(QskMode::Full);
    assert_eq!(
        seq.service(true, FaultState::OverTemperature, None, t(0)),
        SequencerEvent::KeyBlocked(ErrorCode::OverTemp)
    );
    let mut seq = Sequencer::new(QskMode::Full);
    let cal = FaultState::Latched(LatchCause::SelfTest(SelfTestCode::CalibrationMissing));
    assert_eq!(
        seq.service(true, cal, None, t(0)),
        SequencerEvent::KeyBlocked(ErrorCode::CalMissing)
    );
}

#[test]
fn test_swr_advisory_does_not_block_keying() {
    let mut seq = Sequencer::new(QskMode::Full);
    seq.service(true, FaultState::InputSwr, None, t(0));
    assert_eq!(seq.state(), TransmitState::SequencingUp);
    seq.service(true, FaultState::InputSwr, None, t(15));
    assert_eq!(seq.state(), TransmitState::KeyedTransmitting);
}

#[test]
fn test_fault_preempts_mid_transmit() {
    let mut seq = Sequencer::new(QskMode::Full);
    seq.service(true, NORMAL, None, t(0));
    seq.service(true, NORMAL, None, t(15));
    assert_eq!(seq.state(), TransmitState::KeyedTransmitting);
    // Key still down; the fault overrides it on the same tick
    seq.service(true, FaultState::OverVoltage, None, t(20));
    assert_eq!(seq.state(), TransmitState::SequencingDown);
}

#[test]
fn test_fault_preempts_the_hang_interval() {
    let mut seq = Sequencer::new(QskMode::Semi);
    seq.service(true, NORMAL, None, t(0));
    seq.service(true, NORMAL, None, t(15));
    seq.service(false, NORMAL, None, t(100));
    assert_eq!(seq.state(), TransmitState::KeyedTransmitting);
    // Hanging, not keyed: the fault still tears the sequence down
    seq.service(false, FaultState::OverCurrent, None, t(150));
    assert_eq!(seq.state(), TransmitState::SequencingDown);
}

#[test]
fn test_fault_aborts_sequencing_up() {
    let mut seq = Sequencer::new(QskMode::Full);
    seq.service(true, NORMAL, None, t(0));
    assert_eq!(seq.state(), TransmitState::SequencingUp);
    seq.service(true, FaultState::OverCurrent, None, t(5));
    assert_eq!(seq.state(), TransmitState::SequencingDown);
}

#[test]
fn test_recovery_requires_a_fresh_key() {
    let mut seq = Sequencer::new(QskMode::Full);
    seq.service(true, NORMAL, None, t(0));
    seq.service(true, NORMAL, None, t(15));
    seq.service(true, FaultState::OverVoltage, None, t(20));
    seq.service(true, FaultState::OverVoltage, None, t(30));
    assert_eq!(seq.state(), TransmitState::Receive);
    // Fault cleared, key still held from before the teardown: keying
    // resumes from receive on the level, walking the full sequence
    seq.service(true, NORMAL, None, t(40));
    assert_eq!(seq.state(), TransmitState::SequencingUp);
}
