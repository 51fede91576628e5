//! Time authority behaviour through the public surface: retry and resync
//! cadence, plausibility rejection, drift rejection and RTC write-back.

use chrono::{TimeZone, Utc};

use growctl::clock::{SyncFailure, TimeAuthority};

use crate::mock_hw::MockClockIo;

fn epoch(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> u64 {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap().timestamp() as u64
}

#[test]
fn failed_startup_schedules_retry_after_30s() {
    let mut io = MockClockIo::new();

    let mut auth = TimeAuthority::new();
    auth.init(0, &mut io);
    assert_eq!(io.sync_calls, 3, "three back-to-back startup attempts");
    assert!(!auth.is_synced(0));

    auth.tick(29_999, &mut io);
    assert_eq!(io.sync_calls, 3, "retry must not fire early");

    auth.tick(30_000, &mut io);
    assert_eq!(io.sync_calls, 4);
}

#[test]
fn success_schedules_resync_after_6h() {
    let mut io = MockClockIo::new();

    let mut auth = TimeAuthority::new();
    auth.init(0, &mut io);

    io.ntp_time = Some(epoch(2030, 6, 4, 12, 0, 0));
    auth.tick(30_000, &mut io);
    assert_eq!(io.sync_calls, 4);
    assert!(auth.is_synced(30_000));

    auth.tick(30_000 + 21_599_999, &mut io);
    assert_eq!(io.sync_calls, 4, "resync must not fire early");

    auth.tick(30_000 + 21_600_000, &mut io);
    assert_eq!(io.sync_calls, 5);
}

#[test]
fn fetched_year_below_window_is_rejected() {
    let mut io = MockClockIo::new();
    io.ntp_time = Some(epoch(2024, 12, 31, 23, 59, 59));

    let mut auth = TimeAuthority::new();
    auth.init(0, &mut io);

    assert!(!auth.is_synced(0));
    assert_eq!(auth.stats().last_failure, Some(SyncFailure::ImplausibleYear));
    assert!(io.rtc_written.is_empty(), "rejected value must not reach the RTC");
}

#[test]
fn fetched_year_above_window_is_rejected() {
    let mut io = MockClockIo::new();
    io.ntp_time = Some(epoch(2041, 1, 1, 0, 0, 0));

    let mut auth = TimeAuthority::new();
    auth.init(0, &mut io);

    assert!(!auth.is_synced(0));
    assert_eq!(auth.stats().last_failure, Some(SyncFailure::ImplausibleYear));
    assert!(io.rtc_written.is_empty());
}

#[test]
fn forty_day_drift_is_rejected_and_rtc_time_kept() {
    let t = epoch(2030, 6, 4, 7, 0, 0);
    let mut io = MockClockIo::new();
    io.rtc = Some(t);
    io.ntp_time = Some(t + 40 * 86_400);

    let mut auth = TimeAuthority::new();
    auth.init(0, &mut io);

    assert_eq!(auth.stats().last_failure, Some(SyncFailure::SuspiciousDrift));
    assert!(io.rtc_written.is_empty());
    assert!(auth.is_synced(0), "the RTC seed stays authoritative");
    let fields = auth.get_time(0).unwrap();
    assert_eq!((fields.month, fields.day), (6, 4));
}

#[test]
fn accepted_sync_writes_back_and_reports_delta() {
    let t = epoch(2030, 6, 4, 7, 0, 0);
    let mut io = MockClockIo::new();
    io.rtc = Some(t);
    io.ntp_time = Some(t + 100);

    let mut auth = TimeAuthority::new();
    auth.init(0, &mut io);

    assert_eq!(io.rtc_written, vec![t + 100]);
    let stats = auth.stats();
    assert!(stats.last_ok);
    assert_eq!(stats.last_delta_s, 100);
    assert_eq!(auth.get_time(0).unwrap().second, 40);
}

#[test]
fn link_restored_after_outage_syncs_on_retry() {
    let mut io = MockClockIo::new();
    io.link_up = false;

    let mut auth = TimeAuthority::new();
    auth.init(0, &mut io);
    assert_eq!(io.sync_calls, 0, "no round-trips are spent while offline");
    assert_eq!(auth.stats().last_failure, Some(SyncFailure::NoLink));

    io.link_up = true;
    io.ntp_time = Some(epoch(2030, 6, 4, 12, 0, 0));
    auth.tick(30_000, &mut io);
    assert!(auth.is_synced(30_000));
    assert_eq!(io.sync_calls, 1);
}
