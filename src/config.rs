//! Automation scenarios configuration.
//!
//! The declarative watering/lighting policy consumed by the automation
//! scheduler. Documents are decoded tolerantly (missing sections fall back
//! to defaults, unknown keys are ignored) and then strictly validated;
//! an invalid document is rejected wholesale and the previous (or default,
//! fully-disabled) config stays in force. [`ScenariosConfig::from_json`]
//! is the only acceptance path.

use heapless::Vec;
use serde::{Deserialize, Serialize};

/// Compiled-in schema version; decoded documents must match exactly.
pub const SCENARIOS_SCHEMA_VERSION: u32 = 1;

/// Moisture sensor ports the hardware scan supports.
pub const MAX_MOISTURE_SENSORS: usize = 4;

/// Water/light schedule entries per scenario.
pub const MAX_SCHEDULE_ENTRIES: usize = 8;

// ═══════════════════════════════════════════════════════════════
//  Config data model (field names are wire-stable)
// ═══════════════════════════════════════════════════════════════

/// Versioned automation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenariosConfig {
    pub schema_version: u32,
    pub watering: WateringConfig,
    pub light: LightConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WateringConfig {
    pub by_moisture: WaterByMoisture,
    pub by_schedule: WaterBySchedule,
}

/// Moisture-triggered watering: fire when a probe reads below its threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WaterByMoisture {
    pub enabled: bool,
    /// Anti-flood spacing applied to every automatic watering, regardless
    /// of trigger source.  0 disables the gate.
    pub min_time_between_watering_s: u32,
    pub per_sensor: Vec<MoistureSensorConfig, MAX_MOISTURE_SENSORS>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MoistureSensorConfig {
    /// Sensor port; must equal the entry's array index.
    pub port: u8,
    pub enabled: bool,
    /// Fire when the reading drops below this (0–100).
    pub threshold_percent: u8,
    pub duration_s: u32,
}

/// Time-of-day watering slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WaterBySchedule {
    pub enabled: bool,
    pub entries: Vec<WaterScheduleEntry, MAX_SCHEDULE_ENTRIES>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WaterScheduleEntry {
    pub start_hhmm: u16,
    pub duration_s: u32,
    /// Bit k = weekday k, 0 = Sunday.
    pub days_mask: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LightConfig {
    pub by_schedule: LightBySchedule,
}

/// Grow-light windows, wrap-aware (a window may cross midnight).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LightBySchedule {
    pub enabled: bool,
    pub entries: Vec<LightScheduleEntry, MAX_SCHEDULE_ENTRIES>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LightScheduleEntry {
    pub start_hhmm: u16,
    pub end_hhmm: u16,
    /// Bit k = weekday k, 0 = Sunday.  For midnight-crossing windows the
    /// bit refers to the day the window *starts*.
    pub days_mask: u8,
}

impl Default for ScenariosConfig {
    /// Fully disabled, current schema version.  This is the config in force
    /// until a document passes acceptance.
    fn default() -> Self {
        Self {
            schema_version: SCENARIOS_SCHEMA_VERSION,
            watering: WateringConfig::default(),
            light: LightConfig::default(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Acceptance: tolerant decode, then strict validation
// ═══════════════════════════════════════════════════════════════

/// Errors from scenarios-config decode and validation.
#[derive(Debug)]
pub enum ConfigError {
    /// JSON decode failed (malformed document, wrong types, or more entries
    /// than the compiled-in capacity).
    Malformed,
    /// `schema_version` does not match [`SCENARIOS_SCHEMA_VERSION`].
    SchemaVersion(u32),
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed config document"),
            Self::SchemaVersion(v) => write!(f, "unsupported schema_version {}", v),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl ScenariosConfig {
    /// Decode a JSON document and validate it.  The only acceptance path;
    /// a failure leaves the caller's previous config untouched.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_slice(bytes).map_err(|_| ConfigError::Malformed)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Strict range validation, run after the tolerant decode.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schema_version != SCENARIOS_SCHEMA_VERSION {
            return Err(ConfigError::SchemaVersion(self.schema_version));
        }

        for (i, sensor) in self.watering.by_moisture.per_sensor.iter().enumerate() {
            if usize::from(sensor.port) != i {
                return Err(ConfigError::ValidationFailed(
                    "per_sensor port must equal its array index",
                ));
            }
            if sensor.threshold_percent > 100 {
                return Err(ConfigError::ValidationFailed("threshold_percent above 100"));
            }
            if sensor.duration_s == 0 {
                return Err(ConfigError::ValidationFailed("moisture duration_s is zero"));
            }
        }

        for entry in &self.watering.by_schedule.entries {
            if !hhmm_valid(entry.start_hhmm) {
                return Err(ConfigError::ValidationFailed(
                    "water schedule start_hhmm out of range",
                ));
            }
            if entry.duration_s == 0 {
                return Err(ConfigError::ValidationFailed("water schedule duration_s is zero"));
            }
            if entry.days_mask > 0x7F {
                return Err(ConfigError::ValidationFailed("water schedule days_mask above 7 bits"));
            }
        }

        for entry in &self.light.by_schedule.entries {
            if !hhmm_valid(entry.start_hhmm) || !hhmm_valid(entry.end_hhmm) {
                return Err(ConfigError::ValidationFailed("light schedule HHMM out of range"));
            }
            if entry.days_mask > 0x7F {
                return Err(ConfigError::ValidationFailed("light schedule days_mask above 7 bits"));
            }
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════
//  HHMM helpers
// ═══════════════════════════════════════════════════════════════

/// Whether `hhmm` is a well-formed `hour*100 + minute` time of day.
pub fn hhmm_valid(hhmm: u16) -> bool {
    hhmm <= 2359 && hhmm % 100 < 60
}

/// Convert a (valid) HHMM value to minutes since midnight.
pub fn hhmm_to_minutes(hhmm: u16) -> u16 {
    (hhmm / 100) * 60 + hhmm % 100
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
