//! Automation scheduler.
//!
//! Evaluates the active scenarios against soil readings and the time
//! authority each tick, and drives the pump and grow light through the
//! actuator port.  Three rule families run in a fixed order per tick:
//! moisture-triggered watering, clock-scheduled watering, then the light
//! window.  At most one watering start happens per tick.
//!
//! Watering starts are announced on the telemetry sink as JSON events,
//! throttled to one per second and silently dropped while the clock is
//! unsynced (an event without a real timestamp is worse than none).

use log::{debug, info, warn};

use crate::app::events::{
    WateringEvent, WateringMode, WATERING_AUTO, WATERING_EVENT_QOS, WATERING_EVENT_TOPIC,
};
use crate::app::ports::{ActuatorPort, SoilSensorHub, TelemetrySink};
use crate::clock::{TimeAuthority, TimeFields};
use crate::config::{
    hhmm_to_minutes, LightScheduleEntry, ScenariosConfig, MAX_SCHEDULE_ENTRIES,
};

// ═══════════════════════════════════════════════════════════════
//  Policy constants
// ═══════════════════════════════════════════════════════════════

/// Minimum spacing between published watering events.
const EVENT_MIN_SPACING_MS: u64 = 1_000;

/// Reason strings handed to the actuator, for its own logs.
const REASON_MOISTURE: &str = "auto.moisture";
const REASON_SCHEDULE: &str = "auto.schedule";

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

/// Per-boot automation state.  Owns the active configuration; all runtime
/// state is reset when a new configuration is applied.
pub struct AutomationScheduler {
    config: ScenariosConfig,
    device_id: String,
    /// Monotonic timestamp of the last automatic watering start, shared by
    /// the moisture and schedule rules (anti-flood spacing).
    last_auto_water: Option<u64>,
    /// Monotonic timestamp of the last successfully published event.
    last_event: Option<u64>,
    /// Fire key per schedule slot, 0 = never fired.  Keys embed the
    /// absolute day, so a key can never legitimately be 0.
    schedule_fired: [u64; MAX_SCHEDULE_ENTRIES],
    /// Last light state this scheduler wrote, to avoid rewriting the
    /// actuator every tick.
    last_light_on: bool,
}

impl AutomationScheduler {
    pub fn new(config: ScenariosConfig, device_id: &str) -> Self {
        Self {
            config,
            device_id: device_id.to_owned(),
            last_auto_water: None,
            last_event: None,
            schedule_fired: [0; MAX_SCHEDULE_ENTRIES],
            last_light_on: false,
        }
    }

    /// Swap in a new configuration and reset all runtime state.  Fire keys
    /// are cleared, so a slot whose minute is still current may fire again
    /// under the new configuration.
    pub fn apply_config(&mut self, config: ScenariosConfig) {
        self.config = config;
        self.last_auto_water = None;
        self.last_event = None;
        self.schedule_fired = [0; MAX_SCHEDULE_ENTRIES];
        self.last_light_on = false;
        info!("Automation: scenarios applied, runtime state reset");
    }

    /// Evaluate all rule families once.  Call at tick rate.
    pub fn on_tick(
        &mut self,
        now_ms: u64,
        time: &TimeAuthority,
        hw: &mut impl ActuatorPort,
        soil: &impl SoilSensorHub,
        telemetry: &mut impl TelemetrySink,
    ) {
        self.handle_moisture(now_ms, time, hw, soil, telemetry);
        self.handle_water_schedule(now_ms, time, hw, telemetry);
        self.handle_light_schedule(now_ms, time, hw);
    }

    /// Force every actuator off and forget the mirrored light state.
    pub fn all_stop(&mut self, hw: &mut impl ActuatorPort) {
        hw.stop_pump("shutdown");
        if hw.is_light_on() {
            hw.set_light(false);
        }
        self.last_light_on = false;
    }

    // ── Moisture-triggered watering ───────────────────────────

    fn handle_moisture(
        &mut self,
        now_ms: u64,
        time: &TimeAuthority,
        hw: &mut impl ActuatorPort,
        soil: &impl SoilSensorHub,
        telemetry: &mut impl TelemetrySink,
    ) {
        let rule = &self.config.watering.by_moisture;
        if !rule.enabled || !self.can_water_now(now_ms, hw) {
            return;
        }

        let n = rule.per_sensor.len();
        for i in 0..n {
            let sensor = self.config.watering.by_moisture.per_sensor[i];
            if !sensor.enabled || !soil.is_detected(sensor.port) {
                continue;
            }
            let percent = soil.last_percent(sensor.port);
            if percent >= sensor.threshold_percent {
                continue;
            }
            if hw.start_pump(sensor.duration_s, REASON_MOISTURE) {
                info!(
                    "Automation: moisture watering, port={} soil={}% < {}% for {} s",
                    sensor.port, percent, sensor.threshold_percent, sensor.duration_s
                );
                self.last_auto_water = Some(now_ms);
                self.publish_watering(
                    now_ms,
                    time,
                    telemetry,
                    WateringMode::Moisture,
                    sensor.port,
                    sensor.duration_s,
                    percent,
                );
                return;
            }
        }
    }

    // ── Clock-scheduled watering ──────────────────────────────

    fn handle_water_schedule(
        &mut self,
        now_ms: u64,
        time: &TimeAuthority,
        hw: &mut impl ActuatorPort,
        telemetry: &mut impl TelemetrySink,
    ) {
        if !self.config.watering.by_schedule.enabled {
            return;
        }
        let Some(t) = time.get_time(now_ms) else {
            return;
        };
        if !self.can_water_now(now_ms, hw) {
            return;
        }

        let day = day_key(&t);
        let now_minutes = u16::from(t.hour) * 60 + u16::from(t.minute);

        let n = self.config.watering.by_schedule.entries.len();
        for i in 0..n {
            let entry = self.config.watering.by_schedule.entries[i];
            if entry.days_mask & (1 << t.weekday) == 0 {
                continue;
            }
            if hhmm_to_minutes(entry.start_hhmm) != now_minutes {
                continue;
            }
            let key = fire_key(day, entry.start_hhmm);
            if self.schedule_fired[i] == key {
                continue;
            }
            if hw.start_pump(entry.duration_s, REASON_SCHEDULE) {
                info!(
                    "Automation: scheduled watering, slot={} start={:04} for {} s",
                    i, entry.start_hhmm, entry.duration_s
                );
                self.schedule_fired[i] = key;
                self.last_auto_water = Some(now_ms);
                self.publish_watering(
                    now_ms,
                    time,
                    telemetry,
                    WateringMode::Schedule,
                    0,
                    entry.duration_s,
                    0,
                );
                return;
            }
        }
    }

    // ── Light window ──────────────────────────────────────────

    fn handle_light_schedule(&mut self, now_ms: u64, time: &TimeAuthority, hw: &mut impl ActuatorPort) {
        if !self.config.light.by_schedule.enabled {
            return;
        }
        let Some(t) = time.get_time(now_ms) else {
            return;
        };

        let now_minutes = u16::from(t.hour) * 60 + u16::from(t.minute);
        let desired = self
            .config
            .light
            .by_schedule
            .entries
            .iter()
            .any(|e| light_window_matches(e, t.weekday, now_minutes));

        if desired != self.last_light_on {
            info!("Automation: light {}", if desired { "ON" } else { "OFF" });
            hw.set_light(desired);
            self.last_light_on = desired;
        }
    }

    // ── Shared gates ──────────────────────────────────────────

    /// Anti-flood gate shared by both watering rules: never while the pump
    /// runs, and respect the configured spacing since the last automatic
    /// start.  A spacing of 0 disables the gate.
    fn can_water_now(&self, now_ms: u64, hw: &mut impl ActuatorPort) -> bool {
        if hw.is_pump_running() {
            return false;
        }
        let min_ms = u64::from(self.config.watering.by_moisture.min_time_between_watering_s) * 1000;
        if min_ms == 0 {
            return true;
        }
        match self.last_auto_water {
            Some(at) => now_ms.saturating_sub(at) >= min_ms,
            None => true,
        }
    }

    // ── Telemetry ─────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn publish_watering(
        &mut self,
        now_ms: u64,
        time: &TimeAuthority,
        telemetry: &mut impl TelemetrySink,
        mode: WateringMode,
        port: u8,
        duration_s: u32,
        soil_percent: u8,
    ) {
        let Some(unix_ms) = time.unix_millis(now_ms) else {
            debug!("Automation: watering event dropped, clock not synced");
            return;
        };
        if let Some(at) = self.last_event {
            if now_ms.saturating_sub(at) < EVENT_MIN_SPACING_MS {
                debug!("Automation: watering event dropped, throttled");
                return;
            }
        }

        let ts = time.get_time(now_ms).map(|t| {
            format!(
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
                t.year, t.month, t.day, t.hour, t.minute, t.second
            )
        });
        let event = WateringEvent {
            kind: WATERING_AUTO,
            mode,
            port,
            duration_s,
            soil_percent,
            ts,
            event_id: format!("{}-{}", self.device_id, unix_ms),
        };
        let Ok(payload) = serde_json::to_vec(&event) else {
            warn!("Automation: watering event serialisation failed");
            return;
        };
        if telemetry.publish(WATERING_EVENT_TOPIC, &payload, WATERING_EVENT_QOS) {
            self.last_event = Some(now_ms);
        } else {
            warn!("Automation: telemetry publish refused");
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Window arithmetic
// ═══════════════════════════════════════════════════════════════

/// Whether `now_minutes` on `weekday` (0 = Sunday) falls inside the
/// entry's window.  A daytime window is the half-open span
/// `[start, end)`.  An overnight window (`start > end`) matches
/// `now >= start || now < end`; for ticks past midnight the mask is
/// checked against the previous weekday, the one the window started on.
/// `start == end` is an empty window.
pub fn light_window_matches(entry: &LightScheduleEntry, weekday: u8, now_minutes: u16) -> bool {
    let start = hhmm_to_minutes(entry.start_hhmm);
    let end = hhmm_to_minutes(entry.end_hhmm);

    let overnight_tail = start > end && now_minutes < end;
    let effective_weekday = if overnight_tail { (weekday + 6) % 7 } else { weekday };
    if entry.days_mask & (1 << effective_weekday) == 0 {
        return false;
    }

    if start <= end {
        now_minutes >= start && now_minutes < end
    } else {
        now_minutes >= start || now_minutes < end
    }
}

/// Key identifying one calendar occurrence of one schedule slot.
pub fn fire_key(day_key: u64, start_hhmm: u16) -> u64 {
    day_key * 10_000 + u64::from(start_hhmm)
}

/// Absolute day as a decimal key, e.g. 2030-06-04 → 20300604.
pub fn day_key(t: &TimeFields) -> u64 {
    u64::from(t.year) * 10_000 + u64::from(t.month) * 100 + u64::from(t.day)
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
