//! Scheduler behaviour: moisture triggers, schedule slots, the overnight
//! light window, anti-flood spacing and telemetry gating.

use chrono::{TimeZone, Utc};

use growctl::app::ports::ConfigStore;
use growctl::app::service::AppService;
use growctl::automation::AutomationScheduler;
use growctl::clock::TimeAuthority;
use growctl::config::{
    LightScheduleEntry, MoistureSensorConfig, ScenariosConfig, WaterScheduleEntry,
};

use crate::mock_hw::{MockActuator, MockClockIo, MockSoil, MockStore, MockTelemetry};

fn epoch(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> u64 {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap().timestamp() as u64
}

/// Authority synced at monotonic zero so wall time is `utc + now_ms/1000`.
fn synced_clock(utc: u64) -> (TimeAuthority, MockClockIo) {
    let mut io = MockClockIo::synced_at(utc);
    let mut auth = TimeAuthority::new();
    auth.init(0, &mut io);
    assert!(auth.is_synced(0));
    (auth, io)
}

fn moisture_config(threshold: u8, duration_s: u32, spacing_s: u32) -> ScenariosConfig {
    let mut cfg = ScenariosConfig::default();
    cfg.watering.by_moisture.enabled = true;
    cfg.watering.by_moisture.min_time_between_watering_s = spacing_s;
    cfg.watering
        .by_moisture
        .per_sensor
        .push(MoistureSensorConfig {
            port: 0,
            enabled: true,
            threshold_percent: threshold,
            duration_s,
        })
        .unwrap();
    cfg
}

fn schedule_config(start_hhmm: u16, duration_s: u32, days_mask: u8) -> ScenariosConfig {
    let mut cfg = ScenariosConfig::default();
    cfg.watering.by_schedule.enabled = true;
    cfg.watering
        .by_schedule
        .entries
        .push(WaterScheduleEntry {
            start_hhmm,
            duration_s,
            days_mask,
        })
        .unwrap();
    cfg
}

fn light_config(start_hhmm: u16, end_hhmm: u16, days_mask: u8) -> ScenariosConfig {
    let mut cfg = ScenariosConfig::default();
    cfg.light.by_schedule.enabled = true;
    cfg.light
        .by_schedule
        .entries
        .push(LightScheduleEntry {
            start_hhmm,
            end_hhmm,
            days_mask,
        })
        .unwrap();
    cfg
}

// ── Moisture rule ─────────────────────────────────────────────

#[test]
fn dry_soil_starts_pump_and_publishes_event() {
    let utc = epoch(2030, 6, 4, 7, 0, 0);
    let (auth, _io) = synced_clock(utc);
    let mut sched = AutomationScheduler::new(moisture_config(25, 20, 600), "GC-TEST01");
    let mut hw = MockActuator::new();
    let soil = MockSoil::new().with_reading(0, 7);
    let mut telemetry = MockTelemetry::new();

    sched.on_tick(1_000, &auth, &mut hw, &soil, &mut telemetry);

    assert_eq!(hw.starts(), vec![(20, "auto.moisture".to_owned())]);
    assert_eq!(telemetry.published.len(), 1);
    let (topic, _, qos) = &telemetry.published[0];
    assert_eq!(topic, "growctl/events/watering");
    assert_eq!(*qos, 1);
    let v = telemetry.payload_json(0);
    assert_eq!(v["type"], "watering.auto");
    assert_eq!(v["mode"], "moisture");
    assert_eq!(v["port"], 0);
    assert_eq!(v["duration_s"], 20);
    assert_eq!(v["soil_percent"], 7);
    assert_eq!(v["ts"], "2030-06-04T07:00:01Z");
    assert_eq!(v["event_id"], format!("GC-TEST01-{}", utc * 1000 + 1_000));

    // Pump still running: the next tick must not retrigger.
    sched.on_tick(1_500, &auth, &mut hw, &soil, &mut telemetry);
    assert_eq!(hw.starts().len(), 1);
    assert_eq!(telemetry.published.len(), 1);
}

#[test]
fn reading_at_threshold_does_not_trigger() {
    let (auth, _io) = synced_clock(epoch(2030, 6, 4, 7, 0, 0));
    let mut sched = AutomationScheduler::new(moisture_config(25, 20, 0), "GC-TEST01");
    let mut hw = MockActuator::new();
    let soil = MockSoil::new().with_reading(0, 25);
    let mut telemetry = MockTelemetry::new();

    sched.on_tick(1_000, &auth, &mut hw, &soil, &mut telemetry);

    assert!(hw.starts().is_empty());
    assert!(telemetry.published.is_empty());
}

#[test]
fn undetected_probe_is_skipped() {
    let (auth, _io) = synced_clock(epoch(2030, 6, 4, 7, 0, 0));
    let mut sched = AutomationScheduler::new(moisture_config(25, 20, 0), "GC-TEST01");
    let mut hw = MockActuator::new();
    let mut soil = MockSoil::new();
    soil.percent[0] = 5;
    let mut telemetry = MockTelemetry::new();

    sched.on_tick(1_000, &auth, &mut hw, &soil, &mut telemetry);

    assert!(hw.starts().is_empty());
}

#[test]
fn unsynced_clock_waters_but_drops_the_event() {
    let auth = TimeAuthority::new();
    let mut sched = AutomationScheduler::new(moisture_config(30, 10, 0), "GC-TEST01");
    let mut hw = MockActuator::new();
    let soil = MockSoil::new().with_reading(0, 5);
    let mut telemetry = MockTelemetry::new();

    sched.on_tick(1_000, &auth, &mut hw, &soil, &mut telemetry);

    assert_eq!(hw.starts().len(), 1, "watering must not depend on wall time");
    assert!(telemetry.published.is_empty());
}

// ── Schedule rule ─────────────────────────────────────────────

#[test]
fn schedule_slot_fires_once_per_minute_occurrence() {
    // Tuesday 07:30, Tuesday-only slot.
    let (auth, _io) = synced_clock(epoch(2030, 6, 4, 7, 30, 0));
    let mut sched = AutomationScheduler::new(schedule_config(730, 12, 1 << 2), "GC-TEST01");
    let mut hw = MockActuator::new();
    let soil = MockSoil::new();
    let mut telemetry = MockTelemetry::new();

    sched.on_tick(2_000, &auth, &mut hw, &soil, &mut telemetry);
    assert_eq!(hw.starts(), vec![(12, "auto.schedule".to_owned())]);
    let v = telemetry.payload_json(0);
    assert_eq!(v["mode"], "schedule");
    assert_eq!(v["port"], 0);
    assert_eq!(v["soil_percent"], 0);

    hw.pump_running = false;
    sched.on_tick(2_500, &auth, &mut hw, &soil, &mut telemetry);
    assert_eq!(hw.starts().len(), 1, "same slot minute must not fire twice");
    assert_eq!(telemetry.published.len(), 1);
}

#[test]
fn schedule_slot_fires_again_next_day() {
    let (auth, _io) = synced_clock(epoch(2030, 6, 4, 7, 30, 0));
    let mut sched = AutomationScheduler::new(schedule_config(730, 15, 127), "GC-TEST01");
    let mut hw = MockActuator::new();
    let soil = MockSoil::new();
    let mut telemetry = MockTelemetry::new();

    sched.on_tick(1_000, &auth, &mut hw, &soil, &mut telemetry);
    hw.pump_running = false;
    sched.on_tick(86_400_000 + 1_000, &auth, &mut hw, &soil, &mut telemetry);

    assert_eq!(hw.starts().len(), 2);
}

#[test]
fn missed_minute_does_not_fire_late() {
    // Booted at 07:31:30, slot at 07:30: the minute is gone.
    let (auth, _io) = synced_clock(epoch(2030, 6, 4, 7, 31, 30));
    let mut sched = AutomationScheduler::new(schedule_config(730, 15, 127), "GC-TEST01");
    let mut hw = MockActuator::new();
    let soil = MockSoil::new();
    let mut telemetry = MockTelemetry::new();

    sched.on_tick(1_000, &auth, &mut hw, &soil, &mut telemetry);

    assert!(hw.starts().is_empty());
}

#[test]
fn schedule_requires_synced_clock() {
    let auth = TimeAuthority::new();
    let mut sched = AutomationScheduler::new(schedule_config(730, 15, 127), "GC-TEST01");
    let mut hw = MockActuator::new();
    let soil = MockSoil::new();
    let mut telemetry = MockTelemetry::new();

    sched.on_tick(1_000, &auth, &mut hw, &soil, &mut telemetry);

    assert!(hw.starts().is_empty());
}

#[test]
fn at_most_one_watering_start_per_tick() {
    // Moisture and a due slot in the same tick: moisture wins, the slot
    // fires on a later tick of the same minute.
    let (auth, _io) = synced_clock(epoch(2030, 6, 4, 7, 30, 0));
    let mut cfg = moisture_config(30, 10, 0);
    cfg.watering.by_schedule.enabled = true;
    cfg.watering
        .by_schedule
        .entries
        .push(WaterScheduleEntry {
            start_hhmm: 730,
            duration_s: 15,
            days_mask: 127,
        })
        .unwrap();
    let mut sched = AutomationScheduler::new(cfg, "GC-TEST01");
    let mut hw = MockActuator::new();
    let mut soil = MockSoil::new().with_reading(0, 5);
    let mut telemetry = MockTelemetry::new();

    sched.on_tick(1_000, &auth, &mut hw, &soil, &mut telemetry);
    assert_eq!(hw.starts(), vec![(10, "auto.moisture".to_owned())]);

    hw.pump_running = false;
    soil.percent[0] = 50;
    sched.on_tick(1_500, &auth, &mut hw, &soil, &mut telemetry);
    assert_eq!(hw.starts().len(), 2);
    assert_eq!(hw.starts()[1], (15, "auto.schedule".to_owned()));
}

// ── Light rule ────────────────────────────────────────────────

#[test]
fn overnight_light_window_spans_midnight_on_masked_day() {
    // Monday 23:00, window 22:00 -> 06:00, Monday-only.
    let (auth, _io) = synced_clock(epoch(2030, 6, 3, 23, 0, 0));
    let mut sched = AutomationScheduler::new(light_config(2200, 600, 1 << 1), "GC-TEST01");
    let mut hw = MockActuator::new();
    let soil = MockSoil::new();
    let mut telemetry = MockTelemetry::new();

    sched.on_tick(0, &auth, &mut hw, &soil, &mut telemetry);
    assert_eq!(hw.light_writes(), vec![true]);

    // Tuesday 01:00 is still the Monday window; state holds, no rewrite.
    sched.on_tick(2 * 3_600_000, &auth, &mut hw, &soil, &mut telemetry);
    assert_eq!(hw.light_writes(), vec![true]);

    // Tuesday 07:00 is outside.
    sched.on_tick(8 * 3_600_000, &auth, &mut hw, &soil, &mut telemetry);
    assert_eq!(hw.light_writes(), vec![true, false]);
}

#[test]
fn light_holds_state_while_clock_unsynced() {
    let auth = TimeAuthority::new();
    let mut sched = AutomationScheduler::new(light_config(800, 1700, 127), "GC-TEST01");
    let mut hw = MockActuator::new();
    let soil = MockSoil::new();
    let mut telemetry = MockTelemetry::new();

    sched.on_tick(1_000, &auth, &mut hw, &soil, &mut telemetry);

    assert!(hw.light_writes().is_empty());
}

// ── Anti-flood spacing ────────────────────────────────────────

#[test]
fn spacing_blocks_rapid_retrigger_including_at_time_zero() {
    let (auth, _io) = synced_clock(epoch(2030, 6, 4, 7, 0, 0));
    let mut sched = AutomationScheduler::new(moisture_config(30, 10, 60), "GC-TEST01");
    let mut hw = MockActuator::new();
    let soil = MockSoil::new().with_reading(0, 5);
    let mut telemetry = MockTelemetry::new();

    sched.on_tick(0, &auth, &mut hw, &soil, &mut telemetry);
    assert_eq!(hw.starts().len(), 1, "a trigger at monotonic zero is a real trigger");

    hw.pump_running = false;
    sched.on_tick(1_000, &auth, &mut hw, &soil, &mut telemetry);
    assert_eq!(hw.starts().len(), 1, "1 s elapsed of a 60 s spacing");
    assert_eq!(telemetry.published.len(), 1);

    sched.on_tick(60_000, &auth, &mut hw, &soil, &mut telemetry);
    assert_eq!(hw.starts().len(), 2);
}

// ── Telemetry gating ──────────────────────────────────────────

#[test]
fn events_are_throttled_to_one_per_second() {
    let (auth, _io) = synced_clock(epoch(2030, 6, 4, 7, 0, 0));
    let mut sched = AutomationScheduler::new(moisture_config(30, 10, 0), "GC-TEST01");
    let mut hw = MockActuator::new();
    let soil = MockSoil::new().with_reading(0, 5);
    let mut telemetry = MockTelemetry::new();

    sched.on_tick(0, &auth, &mut hw, &soil, &mut telemetry);
    hw.pump_running = false;
    sched.on_tick(500, &auth, &mut hw, &soil, &mut telemetry);
    hw.pump_running = false;
    sched.on_tick(1_600, &auth, &mut hw, &soil, &mut telemetry);

    assert_eq!(hw.starts().len(), 3, "throttling drops events, not waterings");
    assert_eq!(telemetry.published.len(), 2);
}

#[test]
fn refused_publish_leaves_throttle_unarmed() {
    let (auth, _io) = synced_clock(epoch(2030, 6, 4, 7, 0, 0));
    let mut sched = AutomationScheduler::new(moisture_config(30, 10, 0), "GC-TEST01");
    let mut hw = MockActuator::new();
    let soil = MockSoil::new().with_reading(0, 5);
    let mut telemetry = MockTelemetry::new();
    telemetry.refuse = true;

    sched.on_tick(0, &auth, &mut hw, &soil, &mut telemetry);
    assert!(telemetry.published.is_empty());

    telemetry.refuse = false;
    hw.pump_running = false;
    sched.on_tick(200, &auth, &mut hw, &soil, &mut telemetry);
    assert_eq!(telemetry.published.len(), 1, "a refused publish must not start the throttle");
}

// ── Reload semantics ──────────────────────────────────────────

#[test]
fn reload_clears_fire_keys_and_slot_can_refire() {
    let mut io = MockClockIo::synced_at(epoch(2030, 6, 4, 7, 30, 0));
    let store = MockStore {
        config: schedule_config(730, 15, 127),
    };
    let mut app = AppService::new(store.scenarios(), "GC-TEST01");
    app.init(0, &mut io);

    let mut hw = MockActuator::new();
    let soil = MockSoil::new();
    let mut telemetry = MockTelemetry::new();

    app.tick(2_000, &mut io, &mut hw, &soil, &mut telemetry);
    assert_eq!(hw.starts().len(), 1);

    hw.pump_running = false;
    app.reload_scenarios(&store);
    app.tick(2_500, &mut io, &mut hw, &soil, &mut telemetry);
    assert_eq!(hw.starts().len(), 2, "fresh runtime state may refire the current minute");
}
