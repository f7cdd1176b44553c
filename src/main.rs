//! imubus firmware: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  I2C factory       LogEventSink   LogPublisher   MonotonicClock│
//! │  (BusRegistry)     (EventSink)    (PublishPort)  (Clock)       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  ModuleHost ─▶ ImuModule ─▶ BusSystem ─▶ I2cBus        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  ChangePublisher (time-or-change, fingerprint gated)           │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use log::{info, warn};

use imubus::adapters::i2c;
use imubus::adapters::log_sink::{LogEventSink, LogPublisher};
use imubus::adapters::time::MonotonicClock;
use imubus::app::host::ModuleHost;
use imubus::app::module::ImuModule;
use imubus::app::ports::Clock;
use imubus::bus::BusRegistry;
use imubus::config::SystemConfig;
use imubus::publish::ChangePublisher;

/// Compiled-in systype document.
const SYSTYPE_JSON: &str = include_str!("../systypes/imu.json");

/// Main loop period.  Bus service budgets are a few ms, so 1 ms keeps the
/// 10 ms IMU poll interval honest while still yielding to FreeRTOS.
const LOOP_DELAY_MS: u32 = 1;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  imubus v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration (compiled-in, or defaults) ───────────
    let config = SystemConfig::from_json(SYSTYPE_JSON).unwrap_or_else(|e| {
        warn!("systype: {}, running with defaults", e);
        SystemConfig::default()
    });

    // ── 3. Bus drivers ────────────────────────────────────────
    let mut registry = BusRegistry::new();
    i2c::register(&mut registry);

    // ── 4. Modules ────────────────────────────────────────────
    let mut host = ModuleHost::new();
    host.add(Box::new(ImuModule::new(registry)));
    host.initialize_all(&config)?;

    let clock = MonotonicClock::new();
    let mut sink = LogEventSink::new();
    let mut port = LogPublisher;
    let mut publisher = ChangePublisher::default();

    // ── 5. Main loop ──────────────────────────────────────────
    loop {
        let now_ms = clock.now_ms();
        host.tick_all(now_ms, &mut sink);

        if let Some(source) = host.data_source(&config.data_source) {
            publisher.poll(now_ms, source, &mut port);
        }

        FreeRtos::delay_ms(LOOP_DELAY_MS);
    }
}
