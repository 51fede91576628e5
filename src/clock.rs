//! Time authority.
//!
//! Owns the single authoritative UTC value for the controller, fused from
//! two unreliable sources: a battery-backed RTC (present at boot, drifts
//! over weeks) and an NTP client (accurate, needs a link).  A candidate
//! value must pass a calendar-year plausibility window and a suspicious-
//! drift cross-check before it is trusted; accepted values are written back
//! to the RTC and extrapolated between syncs from the monotonic tick clock.
//!
//! ```text
//!   RTC ──seed───▶ ┌───────────────┐
//!                  │ TimeAuthority │──▶ get_time() / unix_millis()
//!   NTP ──sync───▶ └───────────────┘
//!            retry: 30 s fixed · resync: 6 h
//! ```
//!
//! The authority never panics and never surfaces an error type: every sync
//! branch logs a human-readable reason and the outcome is visible through
//! [`SyncStats`].

use log::{info, warn};

use chrono::{DateTime, Datelike, Timelike};

use crate::app::ports::{ConnectivityPort, NtpPort, RtcPort};

// ═══════════════════════════════════════════════════════════════
//  Policy constants
// ═══════════════════════════════════════════════════════════════

/// Back-to-back sync attempts made during [`TimeAuthority::init`].
const STARTUP_SYNC_ATTEMPTS: u32 = 3;

/// One-shot NTP timeout.  Blocks the calling tick for up to this long.
const SYNC_TIMEOUT_MS: u32 = 5_000;

/// Fixed spacing before retrying after a failed sync.
const RETRY_BACKOFF_MS: u64 = 30_000;

/// Spacing between periodic resyncs after a success.
const RESYNC_INTERVAL_MS: u64 = 21_600_000;

/// Candidate values further than this from the trusted reference are
/// rejected as suspicious.
const MAX_DRIFT_SECS: u64 = 31 * 86_400;

/// Inclusive calendar-year plausibility window.  No value outside it is
/// ever trusted, regardless of source.
const PLAUSIBLE_YEAR_MIN: i32 = 2025;
const PLAUSIBLE_YEAR_MAX: i32 = 2040;

// ═══════════════════════════════════════════════════════════════
//  Public types
// ═══════════════════════════════════════════════════════════════

/// Why the last sync attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncFailure {
    /// No network link; the NTP client was not called.
    NoLink,
    /// The one-shot sync timed out.
    Timeout,
    /// The client reported success but returned no time.
    NoTime,
    /// Fetched year outside the plausibility window.
    ImplausibleYear,
    /// Fetched value too far from the trusted reference.
    SuspiciousDrift,
}

impl core::fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoLink => write!(f, "no network link"),
            Self::Timeout => write!(f, "sync timed out"),
            Self::NoTime => write!(f, "no time returned"),
            Self::ImplausibleYear => write!(f, "year outside plausibility window"),
            Self::SuspiciousDrift => write!(f, "drift beyond suspicious threshold"),
        }
    }
}

/// Broken-down UTC fields.  `weekday` uses 0 = Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFields {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub weekday: u8,
}

/// Diagnostics snapshot for status reporting.
#[derive(Debug, Clone, Copy)]
pub struct SyncStats {
    /// Total sync attempts since boot (including fail-fast ones).
    pub attempts: u32,
    /// Whether the most recent attempt accepted a value.
    pub last_ok: bool,
    /// Signed seconds the accepted value moved us from the reference.
    pub last_delta_s: i64,
    /// Monotonic timestamp of the most recent attempt.
    pub last_attempt_ms: u64,
    /// Failure reason of the most recent attempt, if it failed.
    pub last_failure: Option<SyncFailure>,
}

// ═══════════════════════════════════════════════════════════════
//  Time authority
// ═══════════════════════════════════════════════════════════════

/// Process-lifetime clock state.  Mutated only from the tick path.
pub struct TimeAuthority {
    /// Last accepted UTC value in seconds.
    cached_utc: u64,
    time_valid: bool,
    /// Monotonic anchor: the `now_ms` at which `cached_utc` was accepted.
    /// Reads extrapolate from here, so they never touch the RTC bus.
    cached_at_ms: u64,
    /// Deadline for the next retry after a failure.  At most one of
    /// `retry_at_ms`/`resync_at_ms` is pending at a time.
    retry_at_ms: Option<u64>,
    /// Deadline for the next periodic resync after a success.
    resync_at_ms: Option<u64>,
    sync_attempts: u32,
    last_sync_ok: bool,
    last_sync_delta_s: i64,
    last_sync_ms: u64,
    last_failure: Option<SyncFailure>,
}

impl Default for TimeAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeAuthority {
    pub fn new() -> Self {
        Self {
            cached_utc: 0,
            time_valid: false,
            cached_at_ms: 0,
            retry_at_ms: None,
            resync_at_ms: None,
            sync_attempts: 0,
            last_sync_ok: false,
            last_sync_delta_s: 0,
            last_sync_ms: 0,
            last_failure: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot-time initialisation: seed from the RTC (best-effort), start the
    /// NTP client, then make up to 3 back-to-back sync attempts.  The first
    /// success schedules a resync in 6 h; otherwise a retry in 30 s.
    pub fn init(&mut self, now_ms: u64, io: &mut (impl RtcPort + NtpPort + ConnectivityPort)) {
        match io.utc() {
            Ok(secs) if plausible(secs) => {
                self.cached_utc = secs;
                self.cached_at_ms = now_ms;
                self.time_valid = true;
                info!("Clock: RTC seed accepted, utc={}", secs);
            }
            Ok(secs) => {
                warn!("Clock: RTC value {} implausible, ignored", secs);
            }
            Err(e) => {
                warn!("Clock: RTC read failed: {}", e);
            }
        }

        if !io.begin() {
            warn!("Clock: NTP client failed to start");
        }

        let mut synced = false;
        for attempt in 1..=STARTUP_SYNC_ATTEMPTS {
            info!("Clock: startup sync attempt {}/{}", attempt, STARTUP_SYNC_ATTEMPTS);
            if self.attempt_sync(now_ms, io) {
                synced = true;
                break;
            }
        }
        if synced {
            self.resync_at_ms = Some(now_ms + RESYNC_INTERVAL_MS);
            self.retry_at_ms = None;
        } else {
            self.retry_at_ms = Some(now_ms + RETRY_BACKOFF_MS);
            self.resync_at_ms = None;
        }
    }

    /// Periodic maintenance.  Runs at most one sync attempt when the
    /// pending retry or resync deadline has passed, then reschedules
    /// (success: resync in 6 h; failure: retry in 30 s, fixed backoff).
    pub fn tick(&mut self, now_ms: u64, io: &mut (impl RtcPort + NtpPort + ConnectivityPort)) {
        if io.is_sync_in_progress() {
            return;
        }

        let due = self.retry_at_ms.is_some_and(|at| now_ms >= at)
            || self.resync_at_ms.is_some_and(|at| now_ms >= at);
        if !due {
            return;
        }

        if self.attempt_sync(now_ms, io) {
            self.retry_at_ms = None;
            self.resync_at_ms = Some(now_ms + RESYNC_INTERVAL_MS);
        } else {
            self.resync_at_ms = None;
            self.retry_at_ms = Some(now_ms + RETRY_BACKOFF_MS);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Broken-down UTC fields, or `None` when no trusted value exists.
    pub fn get_time(&self, now_ms: u64) -> Option<TimeFields> {
        let secs = self.trusted_utc(now_ms)?;
        let dt = DateTime::from_timestamp(secs as i64, 0)?;
        Some(TimeFields {
            year: dt.year() as u16,
            month: dt.month() as u8,
            day: dt.day() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: dt.second() as u8,
            weekday: dt.weekday().num_days_from_sunday() as u8,
        })
    }

    /// Unix time in milliseconds, or `None` when no trusted value exists.
    pub fn unix_millis(&self, now_ms: u64) -> Option<u64> {
        self.trusted_utc(now_ms)?;
        Some(self.cached_utc * 1000 + now_ms.saturating_sub(self.cached_at_ms))
    }

    /// Whether a trusted time value currently exists (from RTC seed or
    /// network; the source does not matter, plausibility does).
    pub fn is_synced(&self, now_ms: u64) -> bool {
        self.trusted_utc(now_ms).is_some()
    }

    /// Diagnostics snapshot.
    pub fn stats(&self) -> SyncStats {
        SyncStats {
            attempts: self.sync_attempts,
            last_ok: self.last_sync_ok,
            last_delta_s: self.last_sync_delta_s,
            last_attempt_ms: self.last_sync_ms,
            last_failure: self.last_failure,
        }
    }

    // ── Fuse-and-validate ─────────────────────────────────────

    /// One sync attempt.  Returns `true` when a fetched value was accepted
    /// as authoritative.  Every failure branch logs its reason and records
    /// it in the diagnostics fields; nothing here panics.
    fn attempt_sync(
        &mut self,
        now_ms: u64,
        io: &mut (impl RtcPort + NtpPort + ConnectivityPort),
    ) -> bool {
        self.sync_attempts += 1;
        self.last_sync_ms = now_ms;

        // 1. Fail fast without a link; no NTP round-trip is spent.
        if !io.is_connected() {
            info!("Clock: sync skipped, no network link");
            return self.fail(SyncFailure::NoLink);
        }

        // 2. One-shot sync, bounded by the timeout.
        if !io.sync_once(SYNC_TIMEOUT_MS) {
            warn!("Clock: sync attempt failed within {} ms", SYNC_TIMEOUT_MS);
            return self.fail(SyncFailure::Timeout);
        }
        let Some(fetched) = io.last_utc() else {
            warn!("Clock: sync reported ok but returned no time");
            return self.fail(SyncFailure::NoTime);
        };

        // 3. Plausibility window on the fetched year.
        if !plausible(fetched) {
            warn!("Clock: fetched utc {} outside plausibility window, rejected", fetched);
            return self.fail(SyncFailure::ImplausibleYear);
        }

        // 4. Suspicious-drift cross-check against the RTC when it is itself
        //    plausible, else against the current cached value.
        let reference = match io.utc() {
            Ok(rtc) if plausible(rtc) => Some(rtc),
            _ if self.time_valid => Some(self.current_utc(now_ms)),
            _ => None,
        };
        if let Some(reference) = reference {
            let drift = fetched.abs_diff(reference);
            if drift > MAX_DRIFT_SECS {
                warn!(
                    "Clock: fetched utc {} drifts {} s from reference {}, rejected as suspicious",
                    fetched, drift, reference
                );
                return self.fail(SyncFailure::SuspiciousDrift);
            }
        }

        // 5. Accept: best-effort RTC write-back, then adopt the value.
        if let Err(e) = io.set_utc(fetched) {
            warn!("Clock: RTC write-back failed: {}", e);
        }
        let delta = reference.map_or(0, |r| fetched as i64 - r as i64);
        self.cached_utc = fetched;
        self.cached_at_ms = now_ms;
        self.time_valid = true;
        self.last_sync_ok = true;
        self.last_sync_delta_s = delta;
        self.last_failure = None;
        info!("Clock: sync accepted, utc={} delta={} s", fetched, delta);
        true
    }

    fn fail(&mut self, why: SyncFailure) -> bool {
        self.last_sync_ok = false;
        self.last_failure = Some(why);
        false
    }

    // ── Internal ──────────────────────────────────────────────

    /// Extrapolate the cached value to `now_ms` via the monotonic anchor.
    fn current_utc(&self, now_ms: u64) -> u64 {
        self.cached_utc + now_ms.saturating_sub(self.cached_at_ms) / 1000
    }

    /// The extrapolated value, gated on validity and plausibility.
    fn trusted_utc(&self, now_ms: u64) -> Option<u64> {
        if !self.time_valid {
            return None;
        }
        let secs = self.current_utc(now_ms);
        plausible(secs).then_some(secs)
    }
}

/// Calendar-year plausibility check applied to every candidate value.
fn plausible(secs: u64) -> bool {
    i64::try_from(secs)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .is_some_and(|dt| (PLAUSIBLE_YEAR_MIN..=PLAUSIBLE_YEAR_MAX).contains(&dt.year()))
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
