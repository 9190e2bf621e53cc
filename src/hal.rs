//! Hardware Abstraction Layer
//!
//! Provides safe abstractions over RP2040 peripherals.
//! This module isolates hardware-specific code; drivers for the
//! external ICs live in `crate::drivers`.

pub mod adc;
pub mod i2c;
pub mod outputs;
