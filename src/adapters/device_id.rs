//! Device identity derived from the ESP32 factory MAC address.
//!
//! The station ID is `TAVOLO_` followed by all six MAC bytes in uppercase
//! hex (e.g. `TAVOLO_DEADBEEFCAFE`).  It names the station's topics and,
//! lower-cased with a `tavolo_` prefix, its broker client id.

use core::fmt::Write;

use crate::app::events::DeviceId;

pub type ClientId = heapless::String<48>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

pub fn device_id(mac: &MacAddress) -> DeviceId {
    let mut id = DeviceId::new();
    let _ = id.push_str("TAVOLO_");
    for byte in mac {
        let _ = write!(id, "{:02X}", byte);
    }
    id
}

/// Broker client id: `tavolo_<device id>`.
pub fn client_id(device_id: &str) -> ClientId {
    let mut id = ClientId::new();
    let _ = write!(id, "tavolo_{}", device_id);
    id
}
