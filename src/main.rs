//! HF Amplifier Controller Main Application
//!
//! Entry point for the RP2040-based amplifier protection firmware.
//! Initializes hardware and spawns the control, acquisition, display,
//! and heartbeat tasks.

#![no_std]
#![no_main]

use core::sync::atomic::{AtomicI16, Ordering};

use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Channel, Config as AdcConfig};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::i2c::{self, Config as I2cConfig, I2c};
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use embassy_rp::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Ticker;
use {defmt_rtt as _, panic_probe as _};

use hfamp_firmware::controller::{Controller, TickInputs};
use hfamp_firmware::drivers::ads1115::{Ads1115, AdsChannel};
use hfamp_firmware::drivers::display::Lcd;
use hfamp_firmware::hal::adc::SupervisorAdc;
use hfamp_firmware::hal::i2c::{I2cAddress, I2cBus};
use hfamp_firmware::hal::outputs::{FanPwm, OutputBank};
use hfamp_firmware::prelude::*;
use hfamp_firmware::sensor::RawSensorReadings;
use hfamp_firmware::sequencer::SequencerEvent;
use hfamp_firmware::telemetry::DisplayFrame;

// Bind interrupt handlers
bind_interrupts!(struct Irqs {
    ADC_IRQ_FIFO => embassy_rp::adc::InterruptHandler;
    I2C0_IRQ => embassy_rp::i2c::InterruptHandler<peripherals::I2C0>;
    I2C1_IRQ => embassy_rp::i2c::InterruptHandler<peripherals::I2C1>;
});

/// ADS1115 MUX assignment for the forward power detector
const FORWARD_CHANNEL: AdsChannel = AdsChannel::A1;

/// ADS1115 MUX assignment for the reflected power detector
const REFLECTED_CHANNEL: AdsChannel = AdsChannel::A0;

/// ADS1115 MUX assignment for the thermistor divider
const THERMISTOR_CHANNEL: AdsChannel = AdsChannel::A2;

/// Latest detector codes, written by the acquisition task
static FORWARD_CODE: AtomicI16 = AtomicI16::new(0);
static REFLECTED_CODE: AtomicI16 = AtomicI16::new(0);
/// Boot value reads as 2.25 V, 25 C, until the first conversion lands
static THERMISTOR_CODE: AtomicI16 = AtomicI16::new(18000);

/// Telemetry frames from the control task to the display task
static FRAME: Signal<CriticalSectionRawMutex, DisplayFrame> = Signal::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("HF amplifier controller v{}", env!("CARGO_PKG_VERSION"));

    let p = embassy_rp::init(Default::default());

    info!("Peripherals initialized");

    // Supervisor ADC channels: GP26 = drain voltage, GP27 = drain
    // current, GP28 = supply rail
    let adc = Adc::new(p.ADC, Irqs, AdcConfig::default());
    let supervisor = SupervisorAdc::new(
        adc,
        Channel::new_pin(p.PIN_26, Pull::None),
        Channel::new_pin(p.PIN_27, Pull::None),
        Channel::new_pin(p.PIN_28, Pull::None),
    );

    // ADS1115 on I2C0: GP17 = SCL, GP16 = SDA
    let mut ads_config = I2cConfig::default();
    ads_config.frequency = I2C_FREQUENCY_HZ;
    let ads_i2c = I2c::new_async(p.I2C0, p.PIN_17, p.PIN_16, Irqs, ads_config);
    let ads = Ads1115::new(I2cBus::new(ads_i2c), I2cAddress::ADS1115);

    // Display on I2C1: GP3 = SCL, GP2 = SDA
    let mut lcd_config = I2cConfig::default();
    lcd_config.frequency = I2C_FREQUENCY_HZ;
    let lcd_i2c = I2c::new_async(p.I2C1, p.PIN_3, p.PIN_2, Irqs, lcd_config);
    let lcd = Lcd::new(I2cBus::new(lcd_i2c), I2cAddress::LCD_BACKPACK);

    info!("I2C buses initialized at {}Hz", I2C_FREQUENCY_HZ);

    // Control outputs, all de-energized: bias off, RF path open, PTT
    // inhibited, band relays released (active low)
    let bias_enable = Output::new(p.PIN_14, Level::Low);
    let tr_relay = Output::new(p.PIN_8, Level::Low);
    let ptt_inhibit = Output::new(p.PIN_9, Level::High);
    let band_relays = [
        Output::new(p.PIN_4, Level::High),
        Output::new(p.PIN_5, Level::High),
        Output::new(p.PIN_6, Level::High),
    ];
    let fan = FanPwm::new(Pwm::new_output_a(p.PWM_SLICE5, p.PIN_10, PwmConfig::default()));
    let outputs = OutputBank::new(bias_enable, tr_relay, ptt_inhibit, band_relays, fan);

    // Operator inputs
    let key = Input::new(p.PIN_11, Pull::Up);
    let bias_feedback = Input::new(p.PIN_12, Pull::None);
    let reset_button = Input::new(p.PIN_13, Pull::Up);
    let band_button = Input::new(p.PIN_7, Pull::Up);

    let led = Output::new(p.PIN_25, Level::Low);

    spawner
        .spawn(control_task(
            supervisor,
            outputs,
            key,
            reset_button,
            band_button,
            bias_feedback,
        ))
        .unwrap();
    spawner.spawn(acquisition_task(ads)).unwrap();
    spawner.spawn(display_task(lcd)).unwrap();
    spawner.spawn(heartbeat_task(led)).unwrap();

    info!("Tasks spawned, control loop running");
}

/// Control task - runs the protection loop at the fixed tick rate
#[embassy_executor::task]
async fn control_task(
    mut supervisor: SupervisorAdc<'static>,
    mut outputs: OutputBank<'static>,
    key: Input<'static>,
    reset_button: Input<'static>,
    band_button: Input<'static>,
    bias_feedback: Input<'static>,
) {
    let mut controller = Controller::new(PROFILE, CALIBRATION, DEFAULT_QSK_MODE);
    let mut raw = RawSensorReadings::default();
    let mut now = Tick::ZERO;
    let mut ticker = Ticker::every(Duration::from_millis(TICK_MS));

    info!("Controller armed: fault={}", controller.fault_state());

    loop {
        ticker.next().await;

        match supervisor.scan().await {
            Ok(scan) => {
                raw.drain_voltage = scan.drain_voltage;
                raw.drain_current = scan.drain_current;
                raw.supply_voltage = scan.supply_voltage;
            }
            // Keep the previous codes; a stuck converter will show up
            // through the plausibility windows
            Err(e) => warn!("supervisor scan failed: {}", e),
        }
        raw.forward_power = FORWARD_CODE.load(Ordering::Relaxed);
        raw.reflected_power = REFLECTED_CODE.load(Ordering::Relaxed);
        raw.thermistor = THERMISTOR_CODE.load(Ordering::Relaxed);

        let inputs = TickInputs {
            raw,
            key_level: key.is_high(),
            reset_level: reset_button.is_high(),
            band_button_level: band_button.is_high(),
            bias_feedback: Some(bias_feedback.is_high()),
        };

        let tick = controller.tick(now, &inputs);
        outputs.apply(&tick.command);

        match tick.event {
            SequencerEvent::KeyBlocked(code) => warn!("key blocked: E{}", code.code()),
            SequencerEvent::SettleTimeout => warn!("bias settle timeout, latching"),
            SequencerEvent::None => {}
        }
        if let Some(frame) = tick.frame {
            FRAME.signal(frame);
        }

        if now.as_ticks() % 10_000 == 0 {
            info!(
                "fault={} tx={} band={}",
                controller.fault_state(),
                controller.transmit_state(),
                controller.band()
            );
        }

        now = now.advance(1);
    }
}

/// Acquisition task - cycles the ADS1115 through its three channels
#[embassy_executor::task]
async fn acquisition_task(mut ads: Ads1115<I2c<'static, peripherals::I2C0, i2c::Async>>) {
    if !ads.probe().await {
        warn!("ADS1115 not responding at {}", I2cAddress::ADS1115);
    }

    loop {
        match ads.read_raw(FORWARD_CHANNEL).await {
            Ok(code) => FORWARD_CODE.store(code, Ordering::Relaxed),
            Err(e) => warn!("forward detector read failed: {}", e),
        }
        match ads.read_raw(REFLECTED_CHANNEL).await {
            Ok(code) => REFLECTED_CODE.store(code, Ordering::Relaxed),
            Err(e) => warn!("reflected detector read failed: {}", e),
        }
        match ads.read_raw(THERMISTOR_CHANNEL).await {
            Ok(code) => THERMISTOR_CODE.store(code, Ordering::Relaxed),
            Err(e) => warn!("thermistor read failed: {}", e),
        }
    }
}

/// Display task - writes frames to the LCD as they arrive
#[embassy_executor::task]
async fn display_task(mut lcd: Lcd<I2c<'static, peripherals::I2C1, i2c::Async>>) {
    if let Err(e) = lcd.init().await {
        warn!("display init failed: {}", e);
    }

    let mut last: Option<DisplayFrame> = None;
    loop {
        let frame = FRAME.wait().await;
        if last == Some(frame) {
            continue;
        }

        let lines = frame.lines();
        let mut written = true;
        for (row, line) in lines.iter().enumerate() {
            if let Err(e) = lcd.write_line(row, line).await {
                warn!("display write failed: {}", e);
                written = false;
                break;
            }
        }
        // A failed write forgets the frame so the next one retries
        last = written.then_some(frame);
    }
}

/// Heartbeat task - blinks LED to show system is running
#[embassy_executor::task]
async fn heartbeat_task(mut led: Output<'static>) {
    loop {
        led.set_high();
        Timer::after(Duration::from_millis(100)).await;
        led.set_low();
        Timer::after(Duration::from_millis(900)).await;
    }
}
