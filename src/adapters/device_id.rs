//! Device identity derived from the MAC address.
//!
//! The id is stable across reboots and printable on a label: `GC-` plus
//! the last three MAC octets in uppercase hex.  The hostname variant is
//! lowercase for mDNS friendliness.

use core::fmt::Write;

pub type MacAddress = [u8; 6];

/// Fixed-capacity id string, e.g. `GC-A1B2C3`.
pub type DeviceIdString = heapless::String<16>;

/// Simulation MAC.  Real firmware reads the factory-programmed one.
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// `GC-XXYYZZ` from the last three MAC octets.
pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut s = DeviceIdString::new();
    // Capacity is sized for the format, write cannot fail.
    let _ = write!(s, "GC-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    s
}

/// `growctl-xxyyzz`, the mDNS hostname.
pub fn hostname(mac: &MacAddress) -> heapless::String<24> {
    let mut s = heapless::String::new();
    let _ = write!(s, "growctl-{:02x}{:02x}{:02x}", mac[3], mac[4], mac[5]);
    s
}
