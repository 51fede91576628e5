//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (clock sources, actuators, the soil-moisture hub,
//! telemetry, config storage) implement these traits.  The
//! [`AppService`](super::service::AppService) consumes them via generics,
//! so the domain core never touches hardware directly.
//!
//! ## Contract notes
//!
//! - **NtpPort::sync_once** is a bounded-duration one-shot: it may block the
//!   caller for up to `timeout_ms` while polling for a result.  The time
//!   authority only invokes it when a sync is actually due.
//! - **ActuatorPort** implementations enforce their own maximum-runtime
//!   cutoff for the pump; the domain never assumes an unbounded run.
//! - All port errors are typed; callers must handle every variant explicitly.

use crate::config::ScenariosConfig;

// ───────────────────────────────────────────────────────────────
// RTC port (driven adapter: battery-backed clock ↔ domain)
// ───────────────────────────────────────────────────────────────

/// Battery-backed hardware clock.  Survives power loss, drifts over weeks.
pub trait RtcPort {
    /// Read the current UTC value in seconds since the epoch.
    fn utc(&mut self) -> Result<u64, RtcError>;

    /// Write a UTC value back to the hardware clock.
    fn set_utc(&mut self, secs: u64) -> Result<(), RtcError>;
}

// ───────────────────────────────────────────────────────────────
// NTP port (driven adapter: network time ↔ domain)
// ───────────────────────────────────────────────────────────────

/// One-shot network time client.
pub trait NtpPort {
    /// Start the client.  Returns `false` if it could not be brought up.
    fn begin(&mut self) -> bool;

    /// Perform one sync attempt, blocking for up to `timeout_ms` while
    /// polling for a result.  Returns `true` when a time was fetched.
    fn sync_once(&mut self, timeout_ms: u32) -> bool;

    /// The last fetched UTC value, if any.
    fn last_utc(&self) -> Option<u64>;

    /// Whether an asynchronous sync is still running.  The time authority
    /// defers maintenance while this reports `true`.
    fn is_sync_in_progress(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Connectivity port (driven adapter: network link state)
// ───────────────────────────────────────────────────────────────

/// Network link presence.  Checked before any sync attempt so no NTP
/// round-trip is spent while offline.
pub trait ConnectivityPort {
    fn is_connected(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → pump / light relays)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to command actuators.
pub trait ActuatorPort {
    /// Run the pump for `duration_s` seconds.  Returns `false` when the
    /// pump is already running or the duration is zero.  The `reason` tag
    /// is carried into the adapter's logs.
    fn start_pump(&mut self, duration_s: u32, reason: &str) -> bool;

    /// Immediately stop the pump.
    fn stop_pump(&mut self, reason: &str);

    /// Query whether the pump is currently running.  Takes `&mut self`
    /// because adapters observe their runtime cutoff here.
    fn is_pump_running(&mut self) -> bool;

    /// Switch the grow-light relay.
    fn set_light(&mut self, on: bool);

    /// Query the grow-light relay state.
    fn is_light_on(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Soil sensor hub (driven adapter: moisture scan → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port over the analog moisture scan.  The hub owns probe
/// detection and raw-to-percent conversion; the domain only sees percents.
pub trait SoilSensorHub {
    /// Whether a probe is currently detected on `port`.
    fn is_detected(&self, port: u8) -> bool;

    /// Last converted reading for `port` (0–100).
    fn last_percent(&self, port: u8) -> u8;
}

// ───────────────────────────────────────────────────────────────
// Config store (driven adapter: domain ↔ persisted scenarios)
// ───────────────────────────────────────────────────────────────

/// Holds the automation scenarios configuration.
///
/// Implementations MUST only ever hand out a config that passed
/// [`ScenariosConfig::validate`]; on any decode or validation failure the
/// previous config (or the fully-disabled default) stays in force.
pub trait ConfigStore {
    /// The last-validated scenarios config.
    fn scenarios(&self) -> ScenariosConfig;
}

// ───────────────────────────────────────────────────────────────
// Telemetry sink (driven adapter: domain → pub/sub transport)
// ───────────────────────────────────────────────────────────────

/// The domain publishes structured event payloads through this port.
/// Adapters decide where they go (MQTT in production, a log line or a
/// recording mock elsewhere).
pub trait TelemetrySink {
    /// Publish `payload` on `topic`.  Returns `false` when the transport
    /// refused the message (offline, queue full).
    fn publish(&mut self, topic: &str, payload: &[u8], qos: u8) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`RtcPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcError {
    /// No RTC chip responded on the bus.
    NotPresent,
    /// Bus transaction failed mid-transfer.
    Bus,
    /// The chip reports its time as invalid (oscillator stop flag).
    TimeInvalid,
}

impl core::fmt::Display for RtcError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotPresent => write!(f, "RTC not present"),
            Self::Bus => write!(f, "RTC bus error"),
            Self::TimeInvalid => write!(f, "RTC time invalid"),
        }
    }
}
