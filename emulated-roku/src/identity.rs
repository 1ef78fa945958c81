use roku_ssdp::Advertisement;
use std::net::Ipv4Addr;

/// Who the emulated device says it is
///
/// Built once, when the network first comes up, and never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// The user-configured name
    pub display_name: String,
    /// The USN, e.g. `ESP32-DEADBEEF`
    pub unique_service_name: String,
    /// The device UUID, e.g. `roku-ecp-DEADBEEF`
    pub device_uuid: String,
    /// The station MAC, e.g. `AA:BB:CC:DD:EE:FF`
    pub mac_address: String,
    /// The address the ECP server is advertised on
    pub local_ip: Ipv4Addr,
    /// The ECP HTTP port
    pub service_port: u16,
}

impl DeviceIdentity {
    /// Derive an identity from the station MAC address
    ///
    /// The UUID and USN carry the low 32 bits of the MAC packed
    /// little-endian (so the first octet is least significant), as
    /// eight upper-case hex digits.
    #[must_use]
    pub fn from_network(
        display_name: &str,
        mac: [u8; 6],
        local_ip: Ipv4Addr,
        service_port: u16,
    ) -> Self {
        let id = u32::from_le_bytes([mac[0], mac[1], mac[2], mac[3]]);
        Self {
            display_name: display_name.to_string(),
            unique_service_name: format!("ESP32-{id:08X}"),
            device_uuid: format!("roku-ecp-{id:08X}"),
            mac_address: format_mac(&mac),
            local_ip,
            service_port,
        }
    }

    /// What the SSDP engine should advertise for this device
    #[must_use]
    pub fn advertisement(&self) -> Advertisement {
        Advertisement {
            local_ip: self.local_ip,
            port: self.service_port,
            unique_service_name: self.unique_service_name.clone(),
        }
    }
}

fn format_mac(mac: &[u8; 6]) -> String {
    mac.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(":")
}
