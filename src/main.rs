//! TogglePub Firmware: Main Entry Point
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                      │
//! │                                                                 │
//! │  ButtonIsr ──try_send──▶ CommandQueue ──▶ publisher task        │
//! │  (shared GPIO line)      (depth 3)        PublishCoordinator    │
//! │                                               │  SessionPort    │
//! │                                               ▼                 │
//! │  supervisor task ◀── EscalationQueue ◀── publish failure        │
//! │  ConnectionSupervisor    (depth 1)                              │
//! │        │ ConnectionPort                                         │
//! │        ▼                                                        │
//! │  SharedSession<EspSession | SimSession>                         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! On the host the same wiring runs against a simulated button line and an
//! in-memory broker.
#![deny(unused_must_use)]

use anyhow::{Context, Result};
use log::info;

use togglepub::app::device_state::DeviceState;
use togglepub::app::service::PublishCoordinator;
use togglepub::app::supervisor::ConnectionSupervisor;
use togglepub::config::PublisherConfig;
use togglepub::drivers::hw_init;
use togglepub::drivers::task_pin::{spawn_on_core, PUBLISHER_TASK, SUPERVISOR_TASK};
use togglepub::queue::{CommandQueue, EscalationQueue};

/// Last known state of the remote device, shared by the ISR and the session.
static DEVICE: DeviceState = DeviceState::new();

fn banner() {
    info!("╔══════════════════════════════════════╗");
    info!("║  TogglePub v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");
}

fn parse_config(json: Option<&[u8]>) -> Result<PublisherConfig> {
    let config = match json {
        Some(bytes) => PublisherConfig::from_json(bytes).context("config override rejected")?,
        None => PublisherConfig::default(),
    };
    config.validate().context("invalid configuration")?;
    info!(
        "Config: broker={} topic={} qos={} debounce={}ms",
        config.broker_url(),
        config.publish_topic,
        config.qos,
        config.debounce_ms
    );
    Ok(config)
}

/// Queues live for the whole program; the ISR holds a reference.
fn leak_queues() -> (&'static CommandQueue, &'static EscalationQueue) {
    (
        Box::leak(Box::new(CommandQueue::new())),
        Box::leak(Box::new(EscalationQueue::new())),
    )
}

// ── Firmware ──────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    use esp_idf_hal::delay::FreeRtos;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;

    use togglepub::adapters::session::{EspSession, SharedSession};
    use togglepub::adapters::time::MonotonicClock;
    use togglepub::adapters::wifi::{WifiCredentials, WifiLink};
    use togglepub::drivers::button::ButtonIsr;
    use togglepub::drivers::hw_init::{ButtonIrqControl, ButtonStatusLine, IsrYield};

    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    banner();

    let config = parse_config(option_env!("TOGGLEPUB_CONFIG_JSON").map(str::as_bytes))?;
    let (inbound, escalation) = leak_queues();

    // ── 2. Button line (fatal on failure) ─────────────────────
    if let Err(e) = hw_init::init_buttons() {
        hw_init::halt(&e);
    }
    let isr = ButtonIsr::new(
        ButtonStatusLine,
        MonotonicClock::new(),
        IsrYield,
        config.debounce_ms,
        &DEVICE,
        inbound,
    );
    if let Err(e) = hw_init::install_button_isr(isr) {
        hw_init::halt(&e);
    }

    // ── 3. Network link + broker session ──────────────────────
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let creds = WifiCredentials::from_config(&config)?;
    let wifi = WifiLink::connect(peripherals.modem, sys_loop, Some(nvs), &creds)?;
    let session = SharedSession::new(EspSession::connect(&config, &DEVICE)?);

    // ── 4. Tasks ──────────────────────────────────────────────
    let coordinator = PublishCoordinator::new(session.clone(), ButtonIrqControl, &config)?;
    let supervisor = ConnectionSupervisor::new(session, FreeRtos, &config);

    spawn_on_core(&SUPERVISOR_TASK, move || {
        supervisor.run(escalation);
    })?;
    spawn_on_core(&PUBLISHER_TASK, move || {
        let fatal = coordinator.run(inbound, escalation);
        hw_init::halt(&fatal);
    })?;

    info!("TogglePub running (wifi up: {})", wifi.is_up());

    // The link goes down when `wifi` is dropped.
    loop {
        std::thread::park();
    }
}

// ── Host simulation ───────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    use std::thread;
    use std::time::Duration;

    use togglepub::adapters::session::{SharedSession, SimSession};
    use togglepub::adapters::time::{MonotonicClock, StdDelay};
    use togglepub::adapters::wifi::WifiCredentials;
    use togglepub::drivers::button::ButtonIsr;
    use togglepub::drivers::hw_init::{IsrYield, SimButtonLine};

    const PRESSES: u32 = 6;
    /// Press that finds the broker link dropped.
    const LINK_DROP_AT: u32 = 3;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    banner();

    let override_json = match std::env::var("TOGGLEPUB_CONFIG") {
        Ok(path) => Some(std::fs::read(&path).with_context(|| format!("reading {path}"))?),
        Err(_) => None,
    };
    let config = parse_config(override_json.as_deref())?;
    match WifiCredentials::from_config(&config) {
        Ok(creds) => info!("WiFi(sim): would join '{}'", creds.ssid()),
        Err(e) => info!("WiFi(sim): {}", e),
    }
    let (inbound, escalation) = leak_queues();

    hw_init::init_buttons()?;
    let line = SimButtonLine::new();
    let session = SharedSession::new(SimSession::new().with_echo(&DEVICE));

    let coordinator = PublishCoordinator::new(session.clone(), line.control(), &config)?;
    let supervisor = ConnectionSupervisor::new(session.clone(), StdDelay, &config);

    spawn_on_core(&SUPERVISOR_TASK, move || {
        supervisor.run(escalation);
    })?;
    spawn_on_core(&PUBLISHER_TASK, move || {
        let fatal = coordinator.run(inbound, escalation);
        hw_init::halt(&fatal);
    })?;

    // This thread plays the interrupt controller.
    let mut isr = ButtonIsr::new(
        line.clone(),
        MonotonicClock::new(),
        IsrYield,
        config.debounce_ms,
        &DEVICE,
        inbound,
    );
    while !line.is_armed() {
        thread::sleep(Duration::from_millis(1));
    }

    let settle = Duration::from_millis(u64::from(config.debounce_ms) * 4);
    for press in 1..=PRESSES {
        if press == LINK_DROP_AT {
            session.lock().drop_link();
        }
        // A bouncy press: down, up, down inside the window, then release.
        for level in [true, false, true] {
            if line.drive(level) {
                isr.on_interrupt();
            }
        }
        thread::sleep(settle);
        if line.drive(false) {
            isr.on_interrupt();
        }
        thread::sleep(Duration::from_millis(200));
    }

    let s = session.lock();
    info!(
        "Simulation done: {} presses, {} published, {} reconnects, device {}",
        PRESSES,
        s.published().len(),
        s.reconnects(),
        if DEVICE.is_on() { "on" } else { "off" }
    );
    Ok(())
}
