//! Fuzz target: `ScenariosConfig::from_json`
//!
//! Drives arbitrary bytes through the config acceptance path and asserts
//! that it never panics, that every accepted document still validates,
//! and that accepted documents survive a serialise/re-accept round trip.
//!
//! cargo fuzz run fuzz_scenarios_config

#![no_main]

use libfuzzer_sys::fuzz_target;
use growctl::config::ScenariosConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(cfg) = ScenariosConfig::from_json(data) else {
        return;
    };

    // Acceptance implies validity.
    cfg.validate().expect("accepted config must validate");

    // And the accepted document must round-trip through our own encoder.
    let json = serde_json::to_vec(&cfg).expect("accepted config must serialise");
    let back = ScenariosConfig::from_json(&json).expect("re-accept of own output");
    assert_eq!(back, cfg);
});
