//! Keyer sequencer
//!
//! Walks the amplifier through `Receive -> SequencingUp ->
//! KeyedTransmitting -> SequencingDown` with the ordering the LDMOS
//! pair needs: bias established before the RF path closes on the way
//! up, RF path opened before bias drops on the way down. A protective
//! fault preempts the sequence immediately, bypassing hang time and
//! the normal release order.

use crate::config;
use crate::types::{ErrorCode, FaultState, QskMode, Tick, TransmitState};

/// Notable outcome of one sequencer service call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencerEvent {
    /// Nothing to report
    None,
    /// Key asserted while the fault state blocks transmit
    KeyBlocked(ErrorCode),
    /// Bias feedback missed the settle watchdog
    SettleTimeout,
}

#[cfg(feature = "embedded")]
impl defmt::Format for SequencerEvent {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::None => defmt::write!(f, "none"),
            Self::KeyBlocked(code) => defmt::write!(f, "key blocked ({})", code),
            Self::SettleTimeout => defmt::write!(f, "settle timeout"),
        }
    }
}

/// Transmit/receive sequencer
///
/// Owns [`TransmitState`]; serviced once per tick with the debounced
/// key level and the fresh fault state.
#[derive(Clone, Copy, Debug)]
pub struct Sequencer {
    /// Current state
    state: TransmitState,
    /// Break-in style
    qsk: QskMode,
    /// Tick the current state was entered
    state_entered: Tick,
    /// Semi break-in: tick the key was released, while hanging
    hang_release_since: Option<Tick>,
    /// Key level at the previous service call
    prev_key: bool,
}

impl Sequencer {
    /// Create a sequencer at receive
    #[must_use]
    pub const fn new(qsk: QskMode) -> Self {
        Self {
            state: TransmitState::Receive,
            qsk,
            state_entered: Tick::ZERO,
            hang_release_since: None,
            prev_key: false,
        }
    }

    /// Get the current state
    #[must_use]
    pub const fn state(&self) -> TransmitState {
        self.state
    }

    /// Get the break-in style
    #[must_use]
    pub const fn qsk_mode(&self) -> QskMode {
        self.qsk
    }

    /// Service the state machine for one tick
    ///
    /// `bias_feedback` is the bias rail comparator where wired
    /// (`None` when the line is not fitted; the fixed settle delay
    /// alone governs then).
    pub fn service(
        &mut self,
        key: bool,
        fault: FaultState,
        bias_feedback: Option<bool>,
        now: Tick,
    ) -> SequencerEvent {
        let key_edge = key && !self.prev_key;
        self.prev_key = key;

        match self.state {
            TransmitState::Receive => {
                if key {
                    if fault.permits_transmit() {
                        self.enter(TransmitState::SequencingUp, now);
                    } else if key_edge {
                        return SequencerEvent::KeyBlocked(fault.error_code());
                    }
                }
            }

            TransmitState::SequencingUp => {
                if !fault.permits_transmit() || !key {
                    // Aborted before the RF path ever closed
                    self.enter(TransmitState::SequencingDown, now);
                    return SequencerEvent::None;
                }
                let elapsed = now.millis_since(self.state_entered);
                if bias_feedback == Some(false) {
                    if elapsed >= config::SETTLE_WATCHDOG_MS {
                        self.enter(TransmitState::SequencingDown, now);
                        return SequencerEvent::SettleTimeout;
                    }
                } else if elapsed >= config::BIAS_SETTLE_MS {
                    self.enter(TransmitState::KeyedTransmitting, now);
                }
            }

            TransmitState::KeyedTransmitting => {
                if !fault.permits_transmit() {
                    self.enter(TransmitState::SequencingDown, now);
                    return SequencerEvent::None;
                }
                if key {
                    self.hang_release_since = None;
                } else {
                    match self.qsk {
                        QskMode::Full => self.enter(TransmitState::SequencingDown, now),
                        QskMode::Semi => {
                            let released = *self.hang_release_since.get_or_insert(now);
                            if now.millis_since(released) >= config::QSK_HANG_MS {
                                self.enter(TransmitState::SequencingDown, now);
                            }
                        }
                    }
                }
            }

            TransmitState::SequencingDown => {
                if now.millis_since(self.state_entered) >= config::BIAS_DROP_MS {
                    self.enter(TransmitState::Receive, now);
                }
            }
        }

        SequencerEvent::None
    }

    fn enter(&mut self, state: TransmitState, now: Tick) {
        self.state = state;
        self.state_entered = now;
        self.hang_release_since = None;
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(config::DEFAULT_QSK_MODE)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Sequencer {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Seq({}, {})", self.state, self.qsk);
    }
}
