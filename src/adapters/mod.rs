//! Host-side adapters.
//!
//! Concrete implementations of the [`crate::app::ports`] traits for the
//! simulation binary, plus identity helpers shared with real firmware.
//!
//! | Module      | Implements                                      |
//! |-------------|-------------------------------------------------|
//! | `device_id` | MAC-derived device id and hostname formatting   |
//! | `sim`       | RTC/NTP/link, actuators, soil hub, store, sink  |
//! | `time`      | Monotonic milliseconds since process start      |

pub mod device_id;
pub mod sim;
pub mod time;
