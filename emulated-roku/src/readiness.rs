use crate::config::Config;
use crate::identity::DeviceIdentity;
use std::net::{IpAddr, Ipv4Addr};

/// What the host network layer can tell us
pub trait NetworkState {
    /// Whether there is link-level connectivity
    fn is_connected(&self) -> bool;

    /// The host's addresses, preferred first
    fn local_ip_addresses(&self) -> Vec<IpAddr>;

    /// A secondary source for the local address, used if
    /// [`local_ip_addresses`](Self::local_ip_addresses) has nothing usable
    fn fallback_local_ip(&self) -> Option<Ipv4Addr>;

    /// The station MAC address
    fn station_mac(&self) -> [u8; 6];
}

/// Holds protocol activity back until the network is up
///
/// [`poll`](Self::poll) is called every cycle. The first time the
/// network reports connectivity it captures the address and MAC and
/// returns the device identity; after that it never does so again.
/// Lack of connectivity is normal, not an error.
#[derive(Debug, Default)]
pub struct ReadinessGate {
    started: bool,
}

impl ReadinessGate {
    /// Create a gate that has not yet opened
    #[must_use]
    pub const fn new() -> Self {
        Self { started: false }
    }

    /// Whether the gate has opened
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }

    /// Check connectivity; returns the identity exactly once, when it
    /// first becomes available
    pub fn poll<N: NetworkState + ?Sized>(
        &mut self,
        network: &N,
        config: &Config,
    ) -> Option<DeviceIdentity> {
        if self.started || !network.is_connected() {
            return None;
        }
        self.started = true;

        let local_ip = choose_local_ip(network);
        let identity = DeviceIdentity::from_network(
            &config.device_name,
            network.station_mac(),
            local_ip,
            config.port,
        );
        log::info!(
            "Network connected, starting '{}' on {}:{} (MAC: {})",
            identity.display_name,
            identity.local_ip,
            identity.service_port,
            identity.mac_address
        );
        Some(identity)
    }
}

fn choose_local_ip<N: NetworkState + ?Sized>(network: &N) -> Ipv4Addr {
    // Only the first address counts: it's the one the host prefers
    let primary = match network.local_ip_addresses().first() {
        Some(IpAddr::V4(ip)) if !ip.is_unspecified() => Some(*ip),
        _ => None,
    };
    primary
        .or_else(|| network.fallback_local_ip())
        .unwrap_or_else(|| {
            log::warn!("No local IPv4 address found, advertising 0.0.0.0");
            Ipv4Addr::UNSPECIFIED
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;

    mock! {
        Network {}
        impl NetworkState for Network {
            fn is_connected(&self) -> bool;
            fn local_ip_addresses(&self) -> Vec<IpAddr>;
            fn fallback_local_ip(&self) -> Option<Ipv4Addr>;
            fn station_mac(&self) -> [u8; 6];
        }
    }

    const MAC: [u8; 6] = [0xEF, 0xBE, 0xAD, 0xDE, 0x00, 0x01];

    fn connected(addresses: Vec<IpAddr>) -> MockNetwork {
        let mut n = MockNetwork::new();
        n.expect_is_connected().return_const(true);
        n.expect_local_ip_addresses().return_const(addresses);
        n.expect_station_mac().return_const(MAC);
        n
    }

    #[test]
    fn waits_for_connectivity() {
        let mut n = MockNetwork::new();
        n.expect_is_connected().times(3).return_const(false);
        n.expect_station_mac().never();
        let mut gate = ReadinessGate::new();

        for _ in 0..3 {
            assert!(gate.poll(&n, &Config::default()).is_none());
        }
        assert!(!gate.is_started());
    }

    #[test]
    fn opens_exactly_once() {
        let n = connected(vec![IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50))]);
        let mut gate = ReadinessGate::new();

        let id = gate.poll(&n, &Config::default()).unwrap();
        assert_eq!(id.local_ip, Ipv4Addr::new(192, 168, 1, 50));
        assert_eq!(id.unique_service_name, "ESP32-DEADBEEF");
        assert_eq!(id.service_port, 8060);
        assert_eq!(id.display_name, "Emulated Roku");
        assert!(gate.is_started());

        assert!(gate.poll(&n, &Config::default()).is_none());
        assert!(gate.poll(&n, &Config::default()).is_none());
    }

    #[test]
    fn falls_back_when_no_addresses() {
        let mut n = connected(Vec::new());
        n.expect_fallback_local_ip()
            .times(1)
            .return_const(Some(Ipv4Addr::new(10, 0, 0, 9)));

        let id = ReadinessGate::new().poll(&n, &Config::default()).unwrap();
        assert_eq!(id.local_ip, Ipv4Addr::new(10, 0, 0, 9));
    }

    #[test]
    fn falls_back_when_first_address_unset() {
        let mut n = connected(vec![
            IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50)),
        ]);
        n.expect_fallback_local_ip()
            .return_const(Some(Ipv4Addr::new(10, 0, 0, 9)));

        let id = ReadinessGate::new().poll(&n, &Config::default()).unwrap();
        assert_eq!(id.local_ip, Ipv4Addr::new(10, 0, 0, 9));
    }

    #[test]
    fn falls_back_when_first_address_ipv6() {
        let mut n = connected(vec![IpAddr::V6(std::net::Ipv6Addr::LOCALHOST)]);
        n.expect_fallback_local_ip()
            .return_const(Some(Ipv4Addr::new(10, 0, 0, 9)));

        let id = ReadinessGate::new().poll(&n, &Config::default()).unwrap();
        assert_eq!(id.local_ip, Ipv4Addr::new(10, 0, 0, 9));
    }

    #[test]
    fn unspecified_when_nothing_known() {
        let mut n = connected(Vec::new());
        n.expect_fallback_local_ip().return_const(None::<Ipv4Addr>);

        let id = ReadinessGate::new().poll(&n, &Config::default()).unwrap();
        assert_eq!(id.local_ip, Ipv4Addr::UNSPECIFIED);
    }

    #[test]
    fn uses_configured_name_and_port() {
        let n = connected(vec![IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50))]);
        let config = Config {
            device_name: "Living Room".to_string(),
            port: 8061,
            ..Default::default()
        };

        let id = ReadinessGate::new().poll(&n, &config).unwrap();
        assert_eq!(id.display_name, "Living Room");
        assert_eq!(id.service_port, 8061);
    }
}
