//! GrowCtl firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. Everything hardware-facing (RTC, SNTP, relays, the moisture
//! scan, MQTT) lives behind the port traits in [`app::ports`]; this crate
//! ships host simulation adapters only.

#![deny(unused_must_use)]

pub mod app;
pub mod automation;
pub mod clock;
pub mod config;

pub mod adapters;
