//! Fuzz target: `light_window_matches`
//!
//! Feeds arbitrary window definitions and clock positions to the
//! wrap-aware evaluator and checks it against a straightforward
//! absolute-timeline model. Also proves the evaluator total: no panic
//! for any input, including degenerate windows.
//!
//! cargo fuzz run fuzz_light_window

#![no_main]

use libfuzzer_sys::fuzz_target;
use growctl::automation::light_window_matches;
use growctl::config::{hhmm_to_minutes, hhmm_valid, LightScheduleEntry};

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }
    let start_hhmm = u16::from_le_bytes([data[0], data[1]]) % 2400;
    let end_hhmm = u16::from_le_bytes([data[2], data[3]]) % 2400;
    let weekday = data[4] % 7;
    let now_minutes = u16::from_le_bytes([data[5], data[6]]) % 1440;
    let days_mask = data[7] & 0x7F;

    if !hhmm_valid(start_hhmm) || !hhmm_valid(end_hhmm) {
        return;
    }

    let entry = LightScheduleEntry {
        start_hhmm,
        end_hhmm,
        days_mask,
    };
    let got = light_window_matches(&entry, weekday, now_minutes);

    // Independent model on an absolute weekly timeline.
    let s = u32::from(hhmm_to_minutes(start_hhmm));
    let e = u32::from(hhmm_to_minutes(end_hhmm));
    let len = (1440 + e - s) % 1440;
    const WEEK: u32 = 7 * 1440;
    let abs_now = u32::from(weekday) * 1440 + u32::from(now_minutes);
    let mut expect = false;
    for day in 0..7u32 {
        if days_mask & (1 << day) == 0 {
            continue;
        }
        let open = day * 1440 + s;
        if (WEEK + abs_now - open) % WEEK < len {
            expect = true;
        }
    }
    assert_eq!(got, expect);
});
