//! Debounced operator inputs
//!
//! Level debouncing for the key line and one-shot press detection for
//! the reset and band buttons. Raw levels arrive once per tick from
//! the shell's GPIO reads; nothing in here touches hardware.

use crate::types::Tick;

/// Map a raw pin level to its logical assertion
#[must_use]
pub const fn asserted(level: bool, active_low: bool) -> bool {
    level != active_low
}

/// Level debouncer
///
/// The output follows the input only after the new level has held for
/// the full debounce window.
#[derive(Clone, Copy, Debug)]
pub struct Debouncer {
    /// Accepted level
    stable: bool,
    /// Tick a differing level was first seen
    pending_since: Option<Tick>,
    /// Debounce window in milliseconds
    window_ms: u64,
}

impl Debouncer {
    /// Create a debouncer resting at `initial`
    #[must_use]
    pub const fn new(initial: bool, window_ms: u64) -> Self {
        Self {
            stable: initial,
            pending_since: None,
            window_ms,
        }
    }

    /// Feed one raw level, returning the debounced level
    pub fn update(&mut self, level: bool, now: Tick) -> bool {
        if level == self.stable {
            self.pending_since = None;
        } else if let Some(since) = self.pending_since {
            if now.millis_since(since) >= self.window_ms {
                self.stable = level;
                self.pending_since = None;
            }
        } else {
            self.pending_since = Some(now);
        }
        self.stable
    }

    /// Get the debounced level without feeding a new reading
    #[must_use]
    pub const fn level(&self) -> bool {
        self.stable
    }
}

/// One-shot press detector for momentary buttons
///
/// Debounces the level and reports `true` exactly once per press, on
/// the tick the debounced level rises.
#[derive(Clone, Copy, Debug)]
pub struct PressLatch {
    debouncer: Debouncer,
    prev: bool,
}

impl PressLatch {
    /// Create a press latch with the button released
    #[must_use]
    pub const fn new(window_ms: u64) -> Self {
        Self {
            debouncer: Debouncer::new(false, window_ms),
            prev: false,
        }
    }

    /// Feed one raw level, returning `true` on a debounced press edge
    pub fn update(&mut self, level: bool, now: Tick) -> bool {
        let stable = self.debouncer.update(level, now);
        let pressed = stable && !self.prev;
        self.prev = stable;
        pressed
    }
}

// ============================================================================
// Tests
// ============================================================================
