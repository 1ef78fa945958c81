//! Self-healing SSDP discovery for an emulated Roku ECP device
//!
//! The roku-ssdp crate answers SSDP (Simple Service Discovery
//! Protocol) searches for the `roku:ecp` service type, and announces
//! the device's presence every few seconds, so that control hubs and
//! phone apps find it on the local network exactly as they would a
//! real Roku player.
//!
//! It is built for long uptimes on unreliable network stacks: the
//! [`MulticastSocketManager`] periodically re-asserts multicast group
//! membership (some stacks silently let it lapse), and recreates the
//! socket from scratch if anything goes wrong, retrying for as long as
//! it takes.
//!
//! Nothing here blocks or spawns threads. The owner calls into the
//! [`MulticastSocketManager`] and [`Engine`] from its own poll loop,
//! passing the current time; see `emulated_roku::Service` for one such
//! loop.
//!
//! Socket system calls sit behind the traits in [`udp`], so the whole
//! join/refresh/recover state machine can be driven in tests by the
//! in-memory sockets in `fake` (enable the `fake` feature).

#![warn(rustdoc::missing_crate_level_docs)]

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

/// The well-known SSDP port
pub const SSDP_PORT: u16 = 1900;

/// The well-known SSDP multicast group
pub const SSDP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// How often the "alive" announcement is sent
pub const NOTIFY_INTERVAL: Duration = Duration::from_secs(5);

/// How often multicast group membership is dropped and re-joined
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// How often socket setup is retried while there is no socket
pub const RECOVERY_INTERVAL: Duration = Duration::from_secs(10);

/// The SSDP multicast group and port, as a destination
#[must_use]
pub const fn multicast_destination() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(SSDP_MULTICAST_ADDR, SSDP_PORT))
}

/// What we advertise: where the ECP HTTP server is, and what it is called
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// The address the ECP HTTP server is reachable on
    pub local_ip: Ipv4Addr,
    /// The port the ECP HTTP server listens on
    pub port: u16,
    /// The device's Unique Service Name (without the `uuid:roku:ecp:` prefix)
    pub unique_service_name: String,
}

impl Advertisement {
    /// The callback URL sent in `Location` headers
    #[must_use]
    pub fn location(&self) -> String {
        format!("http://{}:{}/", self.local_ip, self.port)
    }
}

mod engine;
pub mod message;
mod socket_manager;
pub mod timer;
pub mod udp;

#[cfg(any(test, feature = "fake"))]
pub mod fake;

pub use engine::{AnnounceTargets, Engine};
pub use socket_manager::MulticastSocketManager;
pub use udp::mio::MioBinder;
pub use udp::{SetupStep, SocketError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_url() {
        let a = Advertisement {
            local_ip: Ipv4Addr::new(10, 0, 0, 7),
            port: 8060,
            unique_service_name: "ESP32-01020304".to_string(),
        };
        assert_eq!(a.location(), "http://10.0.0.7:8060/");
    }

    #[test]
    fn can_debug_and_clone() {
        let a = Advertisement {
            local_ip: Ipv4Addr::LOCALHOST,
            port: 1,
            unique_service_name: String::new(),
        };
        let b = a.clone();
        assert_eq!(a, b);
        assert!(format!("{b:?}").starts_with("Advertisement"));
    }

    #[test]
    fn multicast_destination_is_well_known() {
        assert_eq!(
            multicast_destination(),
            "239.255.255.250:1900".parse::<SocketAddr>().unwrap()
        );
    }
}
