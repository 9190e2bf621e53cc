//! System configuration and hardware constants
//!
//! This module defines compile-time constants for the amplifier controller
//! hardware. Pin mappings, protection thresholds, calibration tables and
//! scheduling cadences are all centralized here.

use crate::fault::ThresholdProfile;
use crate::sensor::{Calibration, LinearChannel, TableChannel, Window};
use crate::types::{Band, QskMode};

/// Control loop tick period in milliseconds
pub const TICK_MS: u64 = 1;

/// Thermistor conversion cadence in ticks (500 ms; thermal mass is slow)
pub const TEMPERATURE_DECIMATION_TICKS: u64 = 500;

/// Display refresh cadence in ticks (250 ms)
pub const DISPLAY_REFRESH_TICKS: u64 = 250;

/// Operator input debounce window in milliseconds
pub const INPUT_DEBOUNCE_MS: u64 = 10;

/// Maximum LDMOS drain voltage before an over-voltage trip
pub const MAX_DRAIN_VOLTAGE_V: f32 = 35.0;

/// Maximum combined drain current before an over-current trip
pub const MAX_DRAIN_CURRENT_A: f32 = 9.0;

/// Maximum heat spreader temperature before a thermal trip
pub const MAX_TEMPERATURE_C: f32 = 40.0;

/// Maximum input SWR before the advisory warning
pub const MAX_INPUT_SWR: f32 = 3.0;

/// Electrical fault debounce window in milliseconds
pub const DEBOUNCE_WINDOW_MS: u64 = 50;

/// Thermal fault debounce window in milliseconds (sustained over-temp)
pub const THERMAL_DEBOUNCE_MS: u64 = 5_000;

/// Strike memory: trips further apart than this do not accumulate
pub const STRIKE_DECAY_MS: u64 = 10_000;

/// Bias settle delay before the RF path closes, in milliseconds
pub const BIAS_SETTLE_MS: u64 = 15;

/// Bias feedback watchdog during sequencing up, in milliseconds
pub const SETTLE_WATCHDOG_MS: u64 = 100;

/// Bias drain delay after the RF path opens, in milliseconds
pub const BIAS_DROP_MS: u64 = 10;

/// Semi break-in hang interval in milliseconds
pub const QSK_HANG_MS: u64 = 300;

// TODO confirm the sequencing delays above against the BLF188XR SOA
// data before the first keyed test at full drive

/// Default break-in style
pub const DEFAULT_QSK_MODE: QskMode = QskMode::Full;

/// Minimum interval between applied band changes, in milliseconds
pub const BAND_SETTLE_MS: u64 = 250;

/// Band selected at power-up
pub const DEFAULT_BAND: Band = Band::M40;

/// Fan duty curve over heat spreader temperature (degrees C, percent)
///
/// Linear interpolation between points; clamped to the first entry
/// below the curve and the last entry above it.
pub const FAN_CURVE: &[(f32, f32)] = &[(28.0, 20.0), (30.0, 40.0), (34.0, 70.0), (38.0, 100.0)];

/// Pico ADC reference voltage
pub const ADC_VREF_V: f32 = 3.3;

/// Pico ADC full-scale code (12-bit)
pub const ADC_FULL_SCALE: u16 = 4095;

/// ADS1115 full-scale voltage at the configured PGA setting
pub const ADS1115_FS_V: f32 = 4.096;

/// Drain voltage divider ratio (volts at the drain per volt at the pin)
pub const VDRAIN_SCALE: f32 = 16.6666;

/// Hall sensor output at zero current, in volts
pub const CURRENT_OFFSET_V: f32 = 0.5;

/// Hall sensor sensitivity in volts per amp
pub const CURRENT_V_PER_A: f32 = 0.1;

/// Supply rail divider ratio
pub const VCC_SCALE: f32 = 15.05;

/// I2C bus frequency for the ADS1115 and the display
pub const I2C_FREQUENCY_HZ: u32 = 400_000;

/// ADS1115 I2C address (ADDR pin to GND)
pub const ADS1115_I2C_ADDR: u8 = 0x48;

/// 16x2 character LCD I2C address (PCF8574 backpack)
pub const LCD_I2C_ADDR: u8 = 0x27;

/// ADS1115 input multiplexer channel for the forward power detector
pub const ADS_FORWARD_CH: u8 = 1;

/// ADS1115 input multiplexer channel for the reflected power detector
pub const ADS_REFLECTED_CH: u8 = 0;

/// ADS1115 input multiplexer channel for the thermistor divider
pub const ADS_THERMISTOR_CH: u8 = 2;

/// Directional coupler detector transfer curve (volts, watts)
///
/// Diode detector response measured against a reference wattmeter;
/// square-law near the origin, close to linear once the diode is
/// well forward biased.
pub const DETECTOR_TABLE: &[(f32, f32)] = &[
    (0.00, 0.0),
    (0.10, 0.5),
    (0.25, 2.0),
    (0.50, 8.0),
    (1.00, 30.0),
    (1.50, 70.0),
    (2.00, 130.0),
    (2.50, 200.0),
    (3.00, 290.0),
    (3.50, 400.0),
    (4.00, 520.0),
];

/// Thermistor divider transfer curve (volts, degrees C)
///
/// 3.3 V rail through a 4.7 k fixed resistor into a 10 k B3950 NTC to
/// ground; node voltage falls as the heat spreader warms up.
pub const THERMISTOR_TABLE: &[(f32, f32)] = &[
    (0.70, 80.0),
    (1.14, 60.0),
    (1.43, 50.0),
    (1.75, 40.0),
    (2.08, 30.0),
    (2.25, 25.0),
    (2.40, 20.0),
    (2.68, 10.0),
    (2.90, 0.0),
];

/// Protection threshold profile applied at startup
pub const PROFILE: ThresholdProfile = ThresholdProfile {
    max_drain_voltage_v: MAX_DRAIN_VOLTAGE_V,
    max_drain_current_a: MAX_DRAIN_CURRENT_A,
    max_temperature_c: MAX_TEMPERATURE_C,
    max_input_swr: MAX_INPUT_SWR,
    voltage_release_margin_v: 2.0,
    current_release_margin_a: 0.5,
    temperature_release_margin_c: 3.0,
    swr_release_margin: 0.3,
    swr_forward_floor_w: 5.0,
    debounce_window_ms: DEBOUNCE_WINDOW_MS,
    thermal_debounce_ms: THERMAL_DEBOUNCE_MS,
    osc_reflection_ratio: 0.6,
    osc_forward_floor_w: 5.0,
    osc_ripple_max_a: 1.5,
    osc_ripple_decay: 0.95,
    osc_forward_min_fraction: 0.25,
    osc_min_current_a: 2.0,
    osc_min_dc_power_w: 10.0,
    strike_decay_ms: STRIKE_DECAY_MS,
    overvoltage_strike_limit: 2,
    strike_limit: 3,
};

/// Channel calibration applied at startup
pub const CALIBRATION: Calibration = Calibration {
    drain_voltage: LinearChannel {
        offset_v: 0.0,
        gain: VDRAIN_SCALE,
        window: Window {
            min_v: 0.0,
            max_v: 3.2,
        },
    },
    drain_current: LinearChannel {
        offset_v: CURRENT_OFFSET_V,
        gain: 1.0 / CURRENT_V_PER_A,
        window: Window {
            min_v: 0.3,
            max_v: 3.2,
        },
    },
    supply_voltage: LinearChannel {
        offset_v: 0.0,
        gain: VCC_SCALE,
        window: Window {
            min_v: 0.2,
            max_v: 3.25,
        },
    },
    forward_power: TableChannel {
        table: DETECTOR_TABLE,
        window: Window {
            min_v: -0.05,
            max_v: 4.1,
        },
    },
    reflected_power: TableChannel {
        table: DETECTOR_TABLE,
        window: Window {
            min_v: -0.05,
            max_v: 4.1,
        },
    },
    thermistor: TableChannel {
        table: THERMISTOR_TABLE,
        window: Window {
            min_v: 0.15,
            max_v: 3.15,
        },
    },
};

/// Key line is a closure to ground
pub const KEY_ACTIVE_LOW: bool = true;

/// Reset button shorts the pin to ground
pub const RESET_ACTIVE_LOW: bool = true;

/// Band advance button shorts the pin to ground
pub const BAND_BUTTON_ACTIVE_LOW: bool = true;

/// Filter relays are driven through PNP bases, on when low
pub const BAND_RELAY_ACTIVE_LOW: bool = true;

/// Bias feedback comparator output is high when the rail is up
pub const BIAS_FEEDBACK_ACTIVE_LOW: bool = false;

/// Pin assignments for GPIO
pub mod pins {
    //! GPIO pin assignments matching the schematic (GP numbering)

    /// I2C0 SDA (ADS1115)
    pub const I2C_SDA: u8 = 16;

    /// I2C0 SCL (ADS1115)
    pub const I2C_SCL: u8 = 17;

    /// I2C1 SDA (display backpack)
    pub const LCD_SDA: u8 = 2;

    /// I2C1 SCL (display backpack)
    pub const LCD_SCL: u8 = 3;

    /// Drain voltage divider (ADC0)
    pub const VDRAIN_ADC: u8 = 26;

    /// Drain current hall sensor (ADC1)
    pub const CURRENT_ADC: u8 = 27;

    /// Supply rail divider (ADC2)
    pub const VCC_ADC: u8 = 28;

    /// Filter bank 0 relay (40m low-pass)
    pub const BAND_RELAY_0: u8 = 4;

    /// Filter bank 1 relay (20m low-pass)
    pub const BAND_RELAY_1: u8 = 5;

    /// Filter bank 2 relay (15m/10m low-pass)
    pub const BAND_RELAY_2: u8 = 6;

    /// Band advance pushbutton (internal pull-up)
    pub const BAND_BUTTON: u8 = 7;

    /// T/R path relay drive
    pub const TR_RELAY: u8 = 8;

    /// PTT inhibit line to the exciter
    pub const PTT_INHIBIT: u8 = 9;

    /// Fan PWM output (PWM5 A)
    pub const FAN_PWM: u8 = 10;

    /// Key line input (internal pull-up)
    pub const KEY_IN: u8 = 11;

    /// Bias rail feedback comparator input
    pub const BIAS_FEEDBACK: u8 = 12;

    /// Latch reset pushbutton (internal pull-up)
    pub const RESET_BUTTON: u8 = 13;

    /// Bias rail enable (NPN into the P-channel rail switch)
    pub const BIAS_ENABLE: u8 = 14;

    /// Status LED (Pico on-board)
    pub const LED_STATUS: u8 = 25;
}
