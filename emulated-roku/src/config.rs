use roku_ssdp::AnnounceTargets;
use std::net::Ipv4Addr;

/// How the emulated device presents itself
///
/// Supplied once at construction and not re-validated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The user-visible device name
    pub device_name: String,
    /// The ECP HTTP port
    pub port: u16,
    /// Where broadcast announcements go, if anywhere
    pub broadcast_address: Option<Ipv4Addr>,
    /// A hub to send announcements to directly, if any
    pub unicast_target: Option<Ipv4Addr>,
    /// The UDP port to listen for searches on
    pub discovery_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_name: "Emulated Roku".to_string(),
            port: 8060,
            broadcast_address: Some(Ipv4Addr::BROADCAST),
            unicast_target: None,
            discovery_port: roku_ssdp::SSDP_PORT,
        }
    }
}

impl Config {
    /// Announcement destinations beyond the multicast group
    #[must_use]
    pub fn announce_targets(&self) -> AnnounceTargets {
        AnnounceTargets {
            broadcast: self.broadcast_address,
            unicast: self.unicast_target,
        }
    }
}
