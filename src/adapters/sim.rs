//! Simulated hardware for the host binary.
//!
//! Faithful enough to exercise every domain path: an RTC that drifts by a
//! configurable offset from host time, a blocking NTP client that answers
//! with host time when the link is up, a pump with a self-enforced runtime
//! cutoff, a soil hub with noisy drying curves, a keep-last-good scenario
//! store and a telemetry sink that prints to the log.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use log::{info, warn};

use crate::app::ports::{
    ActuatorPort, ConfigStore, ConnectivityPort, NtpPort, RtcError, RtcPort, SoilSensorHub,
    TelemetrySink,
};
use crate::config::ScenariosConfig;

/// Wall-clock seconds of the host.
fn host_utc() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

// ═══════════════════════════════════════════════════════════════
//  Clock sources and link
// ═══════════════════════════════════════════════════════════════

/// RTC, NTP and connectivity in one board-shaped struct.
pub struct SimBoard {
    /// Signed drift of the simulated RTC relative to host time.
    rtc_offset_s: i64,
    link_up: bool,
    started: bool,
    last_fetch: Option<u64>,
}

impl SimBoard {
    pub fn new(rtc_offset_s: i64) -> Self {
        Self {
            rtc_offset_s,
            link_up: true,
            started: false,
            last_fetch: None,
        }
    }

    pub fn set_link(&mut self, up: bool) {
        if up != self.link_up {
            info!("Sim: link {}", if up { "UP" } else { "DOWN" });
        }
        self.link_up = up;
    }
}

impl RtcPort for SimBoard {
    fn utc(&mut self) -> Result<u64, RtcError> {
        let secs = host_utc() as i64 + self.rtc_offset_s;
        u64::try_from(secs).map_err(|_| RtcError::TimeInvalid)
    }

    fn set_utc(&mut self, secs: u64) -> Result<(), RtcError> {
        self.rtc_offset_s = secs as i64 - host_utc() as i64;
        Ok(())
    }
}

impl NtpPort for SimBoard {
    fn begin(&mut self) -> bool {
        self.started = true;
        true
    }

    fn sync_once(&mut self, _timeout_ms: u32) -> bool {
        if !self.started || !self.link_up {
            return false;
        }
        self.last_fetch = Some(host_utc());
        true
    }

    fn last_utc(&self) -> Option<u64> {
        self.last_fetch
    }

    fn is_sync_in_progress(&self) -> bool {
        false
    }
}

impl ConnectivityPort for SimBoard {
    fn is_connected(&self) -> bool {
        self.link_up
    }
}

// ═══════════════════════════════════════════════════════════════
//  Actuators
// ═══════════════════════════════════════════════════════════════

/// Pump and light.  The pump enforces its own runtime cutoff: once the
/// deadline passes, the next `is_pump_running` observes the stop.
pub struct SimActuator {
    pump_until: Option<Instant>,
    light_on: bool,
}

impl Default for SimActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl SimActuator {
    pub fn new() -> Self {
        Self {
            pump_until: None,
            light_on: false,
        }
    }
}

impl ActuatorPort for SimActuator {
    fn start_pump(&mut self, duration_s: u32, reason: &str) -> bool {
        if duration_s == 0 {
            warn!("Sim: pump start refused, zero duration ({})", reason);
            return false;
        }
        if self.is_pump_running() {
            return false;
        }
        self.pump_until = Some(Instant::now() + Duration::from_secs(u64::from(duration_s)));
        info!("Sim: pump ON for {} s ({})", duration_s, reason);
        true
    }

    fn stop_pump(&mut self, reason: &str) {
        if self.pump_until.take().is_some() {
            info!("Sim: pump OFF ({})", reason);
        }
    }

    fn is_pump_running(&mut self) -> bool {
        match self.pump_until {
            Some(until) if Instant::now() >= until => {
                self.pump_until = None;
                info!("Sim: pump OFF (runtime cutoff)");
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    fn set_light(&mut self, on: bool) {
        if on != self.light_on {
            info!("Sim: light {}", if on { "ON" } else { "OFF" });
        }
        self.light_on = on;
    }

    fn is_light_on(&mut self) -> bool {
        self.light_on
    }
}

// ═══════════════════════════════════════════════════════════════
//  Soil sensors
// ═══════════════════════════════════════════════════════════════

pub const SOIL_PORTS: usize = 4;

/// Four simulated capacitive probes.  Soil dries slowly with a little
/// noise and recovers when watered.
pub struct SimSoilHub {
    percent: [f32; SOIL_PORTS],
    detected: [bool; SOIL_PORTS],
}

impl Default for SimSoilHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SimSoilHub {
    pub fn new() -> Self {
        let mut percent = [0.0; SOIL_PORTS];
        for p in &mut percent {
            *p = 35.0 + fastrand::f32() * 30.0;
        }
        Self {
            percent,
            detected: [true; SOIL_PORTS],
        }
    }

    /// Advance the drying model by one tick.
    pub fn step(&mut self) {
        for p in &mut self.percent {
            let noise = (fastrand::f32() - 0.5) * 0.05;
            *p = (*p - 0.02 + noise).clamp(0.0, 100.0);
        }
    }

    /// Watering response: moisture rises while the pump runs.
    pub fn on_watered(&mut self, port: u8, amount: f32) {
        if let Some(p) = self.percent.get_mut(usize::from(port)) {
            *p = (*p + amount).clamp(0.0, 100.0);
        }
    }

    pub fn set_detected(&mut self, port: u8, detected: bool) {
        if let Some(d) = self.detected.get_mut(usize::from(port)) {
            *d = detected;
        }
    }
}

impl SoilSensorHub for SimSoilHub {
    fn is_detected(&self, port: u8) -> bool {
        self.detected.get(usize::from(port)).copied().unwrap_or(false)
    }

    fn last_percent(&self, port: u8) -> u8 {
        self.percent
            .get(usize::from(port))
            .map_or(0, |p| p.round() as u8)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scenario store
// ═══════════════════════════════════════════════════════════════

/// Keep-last-good scenario store: a document that fails validation never
/// replaces the active configuration.
pub struct InMemoryConfigStore {
    active: ScenariosConfig,
}

impl Default for InMemoryConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self {
            active: ScenariosConfig::default(),
        }
    }

    /// Parse and validate, then swap.  Returns whether the document was
    /// accepted.
    pub fn apply_json(&mut self, raw: &[u8]) -> bool {
        match ScenariosConfig::from_json(raw) {
            Ok(cfg) => {
                self.active = cfg;
                info!("Store: scenarios accepted ({} bytes)", raw.len());
                true
            }
            Err(e) => {
                warn!("Store: scenarios rejected, keeping active set: {}", e);
                false
            }
        }
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn scenarios(&self) -> ScenariosConfig {
        self.active.clone()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Telemetry
// ═══════════════════════════════════════════════════════════════

/// Telemetry sink that prints events to the log and accepts everything.
pub struct LogTelemetry {
    published: u64,
}

impl Default for LogTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl LogTelemetry {
    pub fn new() -> Self {
        Self { published: 0 }
    }

    pub fn published(&self) -> u64 {
        self.published
    }
}

impl TelemetrySink for LogTelemetry {
    fn publish(&mut self, topic: &str, payload: &[u8], qos: u8) -> bool {
        info!("TELEM | {} qos={} {}", topic, qos, String::from_utf8_lossy(payload));
        self.published += 1;
        true
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
