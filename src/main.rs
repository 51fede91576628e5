//! GrowCtl host simulation.
//!
//! Runs the full controller against simulated hardware: clock sources
//! with a lagging RTC, a pump with a runtime cutoff, noisy soil probes
//! and a log-backed telemetry sink.
//!
//! ```text
//!   main loop ──▶ AppService::tick ──▶ TimeAuthority ──▶ SimBoard
//!                          │
//!                          └─────────▶ AutomationScheduler ──▶ SimActuator
//!                                                │                SimSoilHub
//!                                                └──▶ LogTelemetry
//! ```
//!
//! `RUST_LOG=debug` shows dropped-event decisions; the default level
//! prints sync results, actuator transitions and a periodic status line.

use std::thread;
use std::time::Duration;

use log::info;

use growctl::adapters::device_id::{device_id, hostname, read_mac};
use growctl::adapters::sim::{InMemoryConfigStore, LogTelemetry, SimActuator, SimBoard, SimSoilHub};
use growctl::adapters::time::MonotonicClock;
use growctl::app::ports::{ActuatorPort, ConfigStore};
use growctl::app::service::AppService;

const TICK_MS: u64 = 10;
const STATUS_INTERVAL_MS: u64 = 10_000;

/// Demo scenarios: water port 0 below 30 %, a daily 07:30 slot, and a
/// grow light from 18:00 to 02:00 overnight.
const DEMO_SCENARIOS: &[u8] = br#"{
  "schema_version": 1,
  "watering": {
    "by_moisture": {
      "enabled": true,
      "min_time_between_watering_s": 600,
      "per_sensor": [
        { "port": 0, "enabled": true, "threshold_percent": 30, "duration_s": 20 }
      ]
    },
    "by_schedule": {
      "enabled": true,
      "entries": [
        { "start_hhmm": 730, "duration_s": 15, "days_mask": 127 }
      ]
    }
  },
  "light": {
    "by_schedule": {
      "enabled": true,
      "entries": [
        { "start_hhmm": 1800, "end_hhmm": 200, "days_mask": 127 }
      ]
    }
  }
}"#;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("GrowCtl v{} (simulation)", env!("CARGO_PKG_VERSION"));

    let mac = read_mac();
    let dev_id = device_id(&mac);
    info!("Device: id={} hostname={}", dev_id.as_str(), hostname(&mac).as_str());

    let clock = MonotonicClock::new();
    // RTC lags two minutes so the first accepted sync shows a real delta.
    let mut board = SimBoard::new(-120);
    let mut actuator = SimActuator::new();
    let mut soil = SimSoilHub::new();
    let mut telemetry = LogTelemetry::new();

    let mut store = InMemoryConfigStore::new();
    if !store.apply_json(DEMO_SCENARIOS) {
        anyhow::bail!("demo scenarios rejected");
    }

    let mut app = AppService::new(store.scenarios(), dev_id.as_str());
    app.init(clock.uptime_ms(), &mut board);

    let mut next_status_ms = STATUS_INTERVAL_MS;
    loop {
        thread::sleep(Duration::from_millis(TICK_MS));
        let now_ms = clock.uptime_ms();

        soil.step();
        if actuator.is_pump_running() {
            soil.on_watered(0, 0.05);
        }

        app.tick(now_ms, &mut board, &mut actuator, &soil, &mut telemetry);

        if now_ms >= next_status_ms {
            next_status_ms = now_ms + STATUS_INTERVAL_MS;
            let stats = app.sync_stats();
            match app.time(now_ms) {
                Some(t) => info!(
                    "STATUS | {:04}-{:02}-{:02} {:02}:{:02}:{:02}Z synced=true syncs={} delta={} s events={}",
                    t.year, t.month, t.day, t.hour, t.minute, t.second,
                    stats.attempts, stats.last_delta_s, telemetry.published()
                ),
                None => info!(
                    "STATUS | unsynced syncs={} last_failure={:?} events={}",
                    stats.attempts, stats.last_failure, telemetry.published()
                ),
            }
        }
    }
}
