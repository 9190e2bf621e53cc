//! HF Power Amplifier Protection Firmware Library
//!
//! This library provides the protection and operation control core
//! for an RP2040-based solid-state HF amplifier built around a pair
//! of LDMOS devices. It keeps the transistors inside their safe
//! operating area across drain overvoltage, overcurrent, thermal,
//! oscillation, and antenna mismatch conditions while sequencing
//! transmit/receive switching and band filter selection.
//!
//! # Architecture
//!
//! The firmware is organized in layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CONTROL LAYER                            │
//! │        Controller (1 ms fixed-order tick scheduler)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    PROTECTION CORE                           │
//! │  Sensors │ Fault Eval │ Sequencer │ Band │ Actuator │ Telem  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   HAL / DRIVER LAYER                         │
//! │  On-chip ADC  │  ADS1115  │  GPIO / PWM  │  I2C display      │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    RTOS / SCHEDULER                          │
//! │           embassy-rs (async/await executor)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Outputs are a function of state**: every hardware command is
//!   derived from the current fault, transmit, and band state alone
//! - **Fail safe**: invalid configuration and sensor failures latch
//!   the amplifier into its de-energized state
//! - **Type-driven design**: custom types enforce invariants at
//!   compile time
//! - **No unsafe in application code**
//! - **Functional core, imperative shell**: the protection core is
//!   pure and host-testable; all I/O lives in the shell
//! - **Explicit error handling**: all fallible operations return
//!   `Result`

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_rp;
#[cfg(feature = "embedded")]
pub use embassy_time;

/// Hardware Abstraction Layer
///
/// Safe abstractions over RP2040 peripherals.
#[cfg(feature = "embedded")]
pub mod hal;

/// Peripheral Drivers
///
/// Drivers for the external ICs: the ADS1115 precision ADC and the
/// character display.
#[cfg(feature = "embedded")]
pub mod drivers;

/// Sensor Acquisition
///
/// Calibration, range checking, and engineering-unit conversion of
/// the raw ADC readings.
pub mod sensor;

/// Fault Evaluation
///
/// Debounced threshold detection, oscillation signatures, strike
/// escalation, and the latch.
pub mod fault;

/// Actuator Policy
///
/// Maps fault, transmit, band, and temperature state to hardware
/// commands.
pub mod actuator;

/// Band Selection
///
/// Mutually exclusive low-pass filter bank switching.
pub mod band;

/// Transmit/Receive Sequencing
///
/// Keying state machine with bias settle, QSK hang, and the settle
/// watchdog.
pub mod sequencer;

/// Operator Inputs
///
/// Debouncing and edge detection for the key and panel buttons.
pub mod input;

/// Telemetry Rendering
///
/// 16x2 display frames and error code presentation.
pub mod telemetry;

/// Control Loop
///
/// The tick scheduler that drives every stage in fixed order.
pub mod controller;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
#[cfg(feature = "embedded")]
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::types::*;

    // Common traits
    pub use embedded_hal_async::i2c::I2c;

    // Embassy
    pub use embassy_time::{Duration, Instant, Timer};

    // Error handling
    pub use core::result::Result;

    // Logging
    pub use defmt::{debug, error, info, trace, warn};
}
