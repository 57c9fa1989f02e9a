//! Tavolo Firmware: Main Entry Point
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  WeightSensor<Hx711>  LedActuator<Ledc>  DisplayManager<Lcd> │
//! │  EdgeLink<EspMqttTransport, WifiAdapter>   LogEventSink      │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ────────────────        │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │           Orchestrator (pure logic)                │      │
//! │  │  FSM · hysteresis · report throttle                │      │
//! │  └────────────────────────────────────────────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Peripheral      | Pins / bus                |
//! |-----------------|---------------------------|
//! | HX711 load cell | DT = GPIO16, SCK = GPIO4  |
//! | Status LED      | GPIO2, LEDC channel 0     |
//! | LCD (PCF8574)   | I2C0 SDA = 21, SCL = 22   |
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, config::TimerConfig};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;
use log::{debug, info, warn};

use tavolo::adapters::device_id;
use tavolo::adapters::edge_link::EdgeLink;
use tavolo::adapters::log_sink::LogEventSink;
use tavolo::adapters::mqtt::EspMqttTransport;
use tavolo::adapters::time::SystemClock;
use tavolo::adapters::wifi::{ConnectivityPort, WifiAdapter};
use tavolo::app::events::AppEvent;
use tavolo::app::ports::EventSink;
use tavolo::app::service::Orchestrator;
use tavolo::config::{LinkConfig, SystemConfig};
use tavolo::drivers::display::DisplayManager;
use tavolo::drivers::lcd::{DEFAULT_ADDRESS, Pcf8574Lcd};
use tavolo::drivers::status_led::LedActuator;
use tavolo::sensors::hx711::Hx711;
use tavolo::sensors::weight::WeightSensor;

/// Control loop period.  Short enough for the 20 ms LED pulse step.
const LOOP_PERIOD_MS: u32 = 20;
/// Interval between status summaries on the serial log.
const STATUS_LOG_INTERVAL_MS: u64 = 10_000;

const LED_PWM_HZ: u32 = 5_000;
const LCD_I2C_HZ: u32 = 100_000;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Tavolo v{}                          ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let clock = SystemClock::new();
    let config = SystemConfig::default();

    // ── 2. Load cell ──────────────────────────────────────────
    let sck = PinDriver::output(peripherals.pins.gpio4)?;
    let dt = PinDriver::input(peripherals.pins.gpio16)?;
    let sensor = WeightSensor::new(Hx711::new(sck, dt, Ets), config.calibration_factor);

    // ── 3. Status LED ─────────────────────────────────────────
    let timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::default().frequency(Hertz(LED_PWM_HZ)),
    )?;
    let pwm = LedcDriver::new(peripherals.ledc.channel0, timer, peripherals.pins.gpio2)?;
    let mut led = LedActuator::new(pwm);
    led.set_state_listener(Box::new(|on| debug!("LED {}", if on { "on" } else { "off" })));

    // ── 4. LCD ────────────────────────────────────────────────
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        &I2cConfig::new().baudrate(Hertz(LCD_I2C_HZ)),
    )?;
    let display = DisplayManager::new(Pcf8574Lcd::new(i2c, Ets, DEFAULT_ADDRESS));

    // ── 5. Network + edge link ────────────────────────────────
    let mut wifi = WifiAdapter::new(EspWifi::new(peripherals.modem, sysloop, Some(nvs))?);
    match option_env!("TAVOLO_WIFI_SSID") {
        Some(ssid) => {
            let password = option_env!("TAVOLO_WIFI_PASSWORD").unwrap_or("");
            if let Err(e) = wifi.set_credentials(ssid, password) {
                warn!("WiFi credentials rejected: {}", e);
            }
        }
        None => warn!("No WiFi credentials compiled in; running offline"),
    }

    let device_id = device_id::device_id(&device_id::read_mac());
    info!("Device ID: {}", device_id);
    let link = EdgeLink::new(
        EspMqttTransport::new(),
        wifi,
        &device_id,
        LinkConfig::default(),
    );

    // ── 6. Orchestrator ───────────────────────────────────────
    let mut orchestrator = Orchestrator::new(sensor, led, display, link, &device_id, config);
    let mut sink = LogEventSink::new();
    orchestrator.start(clock.uptime_ms(), &mut sink);

    let mut last_status_ms = 0;
    loop {
        let now_ms = clock.uptime_ms();
        orchestrator.tick(now_ms, &mut sink);

        if now_ms.saturating_sub(last_status_ms) >= STATUS_LOG_INTERVAL_MS {
            last_status_ms = now_ms;
            sink.emit(&AppEvent::Status(orchestrator.status_report()));
        }

        FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}
