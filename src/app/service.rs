//! Application service.
//!
//! Composition root for the domain: owns the time authority and the
//! automation scheduler and threads the hardware ports through to them.
//! The embedding (firmware main or host simulation) owns the port
//! implementations and calls [`AppService::tick`] from its loop.
//!
//! Ports are grouped per call rather than bundled in one trait object so
//! the clock sources and the actuators can live in different adapter
//! structs without borrow conflicts.

use log::info;

use crate::app::ports::{
    ActuatorPort, ConfigStore, ConnectivityPort, NtpPort, RtcPort, SoilSensorHub, TelemetrySink,
};
use crate::automation::AutomationScheduler;
use crate::clock::{SyncStats, TimeAuthority, TimeFields};
use crate::config::ScenariosConfig;

pub struct AppService {
    clock: TimeAuthority,
    automation: AutomationScheduler,
}

impl AppService {
    pub fn new(scenarios: ScenariosConfig, device_id: &str) -> Self {
        Self {
            clock: TimeAuthority::new(),
            automation: AutomationScheduler::new(scenarios, device_id),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot: seed and sync the clock.  Blocks for up to a few seconds
    /// while the startup sync attempts run.
    pub fn init(&mut self, now_ms: u64, io: &mut (impl RtcPort + NtpPort + ConnectivityPort)) {
        self.clock.init(now_ms, io);
        info!("AppService started, synced={}", self.clock.is_synced(now_ms));
    }

    /// One scheduler pass: clock maintenance first, then automation, so
    /// rules within a tick see the freshest accepted time.
    pub fn tick(
        &mut self,
        now_ms: u64,
        io: &mut (impl RtcPort + NtpPort + ConnectivityPort),
        hw: &mut impl ActuatorPort,
        soil: &impl SoilSensorHub,
        telemetry: &mut impl TelemetrySink,
    ) {
        self.clock.tick(now_ms, io);
        self.automation.on_tick(now_ms, &self.clock, hw, soil, telemetry);
    }

    /// Re-read scenarios from the store and reset automation runtime
    /// state.
    pub fn reload_scenarios(&mut self, store: &impl ConfigStore) {
        self.automation.apply_config(store.scenarios());
    }

    /// Force all actuators off (shutdown and fault paths).
    pub fn all_stop(&mut self, hw: &mut impl ActuatorPort) {
        self.automation.all_stop(hw);
        info!("AppService: all actuators stopped");
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_synced(&self, now_ms: u64) -> bool {
        self.clock.is_synced(now_ms)
    }

    pub fn time(&self, now_ms: u64) -> Option<TimeFields> {
        self.clock.get_time(now_ms)
    }

    pub fn sync_stats(&self) -> SyncStats {
        self.clock.stats()
    }
}
