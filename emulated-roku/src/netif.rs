use crate::readiness::NetworkState;
use nix::ifaddrs;
use nix::net::if_::InterfaceFlags;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

type GetIfAddrsFn = fn() -> nix::Result<ifaddrs::InterfaceAddressIterator>;

/// The host's own network interfaces, read with `getifaddrs`
///
/// Loopback interfaces are ignored throughout: an emulated Roku that
/// is only reachable from itself is no use to anybody.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostNetwork;

/// What `getifaddrs` told us, boiled down
#[derive(Debug, Default, PartialEq, Eq)]
struct Snapshot {
    connected: bool,
    addresses: Vec<Ipv4Addr>,
    mac: Option<[u8; 6]>,
}

impl Snapshot {
    fn from_interfaces<I>(interfaces: I) -> Self
    where
        I: IntoIterator<Item = ifaddrs::InterfaceAddress>,
    {
        let mut snapshot = Self::default();
        for ifaddr in interfaces {
            if ifaddr.flags.contains(InterfaceFlags::IFF_LOOPBACK) {
                continue;
            }
            let Some(address) = ifaddr.address else {
                continue;
            };
            if let Some(sin) = address.as_sockaddr_in() {
                let ip = Ipv4Addr::from(sin.ip());
                snapshot.addresses.push(ip);
                if ifaddr
                    .flags
                    .contains(InterfaceFlags::IFF_UP | InterfaceFlags::IFF_RUNNING)
                {
                    snapshot.connected = true;
                }
            } else if let Some(link) = address.as_link_addr() {
                if snapshot.mac.is_none() {
                    snapshot.mac = link.addr().filter(|m| *m != [0u8; 6]);
                }
            }
        }
        snapshot
    }
}

fn snapshot_inner(getifaddrs: GetIfAddrsFn) -> Snapshot {
    match getifaddrs() {
        Ok(interfaces) => Snapshot::from_interfaces(interfaces),
        Err(e) => {
            log::warn!("getifaddrs: {e}");
            Snapshot::default()
        }
    }
}

fn snapshot() -> Snapshot {
    snapshot_inner(ifaddrs::getifaddrs)
}

/// The source address the kernel would use to reach the SSDP group
///
/// Connecting a UDP socket sends nothing; it just picks a route.
fn routed_local_ip() -> std::io::Result<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect(roku_ssdp::multicast_destination())?;
    match socket.local_addr()? {
        SocketAddr::V4(a) if !a.ip().is_unspecified() => Ok(*a.ip()),
        _ => Err(std::io::Error::from(std::io::ErrorKind::AddrNotAvailable)),
    }
}

impl NetworkState for HostNetwork {
    fn is_connected(&self) -> bool {
        snapshot().connected
    }

    fn local_ip_addresses(&self) -> Vec<IpAddr> {
        snapshot().addresses.into_iter().map(IpAddr::V4).collect()
    }

    fn fallback_local_ip(&self) -> Option<Ipv4Addr> {
        routed_local_ip()
            .map_err(|e| log::warn!("No route to SSDP group: {e}"))
            .ok()
    }

    fn station_mac(&self) -> [u8; 6] {
        snapshot().mac.unwrap_or_else(|| {
            log::warn!("No link-layer address found, using zero MAC");
            [0u8; 6]
        })
    }
}
