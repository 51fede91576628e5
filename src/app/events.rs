//! Outbound telemetry events.
//!
//! The [`AutomationScheduler`](crate::automation::AutomationScheduler) emits
//! these through the [`TelemetrySink`](super::ports::TelemetrySink) port.
//! Adapters on the other side decide what to do with them: publish over
//! MQTT in production, log to the console in simulation.
//!
//! Field names are wire-stable; downstream consumers key on them.

use serde::Serialize;

/// Topic for automatic-watering events.
pub const WATERING_EVENT_TOPIC: &str = "growctl/events/watering";

/// QoS for watering events (at-least-once).
pub const WATERING_EVENT_QOS: u8 = 1;

/// Event discriminator carried in the `type` field.
pub const WATERING_AUTO: &str = "watering.auto";

/// Trigger source of an automatic watering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WateringMode {
    Moisture,
    Schedule,
}

/// Wire payload for one automatic watering.
#[derive(Debug, Clone, Serialize)]
pub struct WateringEvent {
    /// Always [`WATERING_AUTO`].
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub mode: WateringMode,
    /// Triggering sensor port; 0 for schedule-triggered waterings.
    pub port: u8,
    pub duration_s: u32,
    /// Reading that tripped the threshold; 0 for schedule-triggered waterings.
    pub soil_percent: u8,
    /// ISO-8601 UTC timestamp, `null` when the clock is not synced.
    pub ts: Option<String>,
    /// Per-device dedupe key: `<device_id>-<unix_millis>`.
    pub event_id: String,
}
