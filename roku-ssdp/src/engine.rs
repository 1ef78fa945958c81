use crate::message::{self, Classification};
use crate::timer::IntervalTimer;
use crate::udp::{DatagramReceive, DatagramSend};
use crate::{Advertisement, NOTIFY_INTERVAL, SSDP_PORT};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::{Duration, Instant};

/// Where "alive" announcements go, besides the SSDP multicast group
///
/// Some networks and hubs don't forward multicast, so announcements
/// can also go to a subnet broadcast address and straight to a known
/// hub. Both use the SSDP port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnounceTargets {
    /// A broadcast address such as 192.168.1.255 (or 255.255.255.255)
    pub broadcast: Option<Ipv4Addr>,
    /// A single host to announce to directly
    pub unicast: Option<Ipv4Addr>,
}

impl AnnounceTargets {
    /// Every destination, multicast group first
    #[must_use]
    pub fn destinations(&self) -> Vec<SocketAddr> {
        std::iter::once(crate::multicast_destination())
            .chain(
                [self.broadcast, self.unicast]
                    .into_iter()
                    .flatten()
                    .map(|ip| SocketAddr::V4(SocketAddrV4::new(ip, SSDP_PORT))),
            )
            .collect()
    }
}

/// The SSDP protocol engine: answers searches and sends announcements
///
/// The engine holds no socket of its own; every call borrows whichever
/// socket the [`crate::MulticastSocketManager`] currently holds. Apart
/// from the announce timer it is stateless between datagrams.
///
pub struct Engine {
    advertisement: Advertisement,
    destinations: Vec<SocketAddr>,
    announce: IntervalTimer,
}

impl Engine {
    /// Create a new engine; the first announcement is due immediately
    #[must_use]
    pub fn new(advertisement: Advertisement, targets: &AnnounceTargets) -> Self {
        Self {
            advertisement,
            destinations: targets.destinations(),
            announce: IntervalTimer::new(NOTIFY_INTERVAL),
        }
    }

    /// What this engine advertises
    #[must_use]
    pub const fn advertisement(&self) -> &Advertisement {
        &self.advertisement
    }

    /// Where announcements are sent
    #[must_use]
    pub fn destinations(&self) -> &[SocketAddr] {
        &self.destinations
    }

    /// Receive one datagram, if one is pending
    ///
    /// Receive errors are logged and treated as "nothing pending".
    pub fn poll_incoming<S: DatagramReceive>(
        &self,
        socket: &S,
    ) -> Option<(Vec<u8>, SocketAddr)> {
        let mut buffer = [0u8; 512];
        match socket.receive_from(&mut buffer) {
            Ok(Some((n, sender))) => Some((buffer[0..n].to_vec(), sender)),
            Ok(None) => None,
            Err(e) => {
                log::warn!("SSDP receive: {e}");
                None
            }
        }
    }

    /// Deal with one received datagram; returns whether it was a search
    pub fn on_data<S: DatagramSend>(
        &self,
        payload: &[u8],
        sender: SocketAddr,
        socket: &S,
    ) -> bool {
        match message::classify(payload) {
            Classification::Search => {
                self.respond_to_search(sender, socket);
                true
            }
            Classification::Ignore => false,
        }
    }

    /// Send the search response to whoever asked
    pub fn respond_to_search<S: DatagramSend>(
        &self,
        sender: SocketAddr,
        socket: &S,
    ) {
        let response = message::build_search_response(&self.advertisement);
        match socket.send_to(response.as_bytes(), &sender) {
            Ok(()) => log::info!("SSDP search from {sender} answered"),
            Err(e) => log::warn!("SSDP response to {sender}: {e}"),
        }
    }

    /// Send "alive" to every destination if the announce interval has
    /// elapsed; returns whether it did
    ///
    /// A send failure to one destination doesn't stop the others, and
    /// the timer advances regardless.
    pub fn announce_if_due<S: DatagramSend>(
        &mut self,
        now: Instant,
        socket: &S,
    ) -> bool {
        if !self.announce.is_due(now) {
            return false;
        }
        self.announce.mark(now);
        let notify = message::build_notify_alive(&self.advertisement);
        for destination in &self.destinations {
            if let Err(e) = socket.send_to(notify.as_bytes(), destination) {
                log::warn!("SSDP announce to {destination}: {e}");
            }
        }
        log::debug!("SSDP alive sent to {} destinations", self.destinations.len());
        true
    }

    /// Send "byebye" to every destination
    pub fn byebye<S: DatagramSend>(&self, socket: &S) {
        let notify = message::build_notify_byebye(&self.advertisement);
        for destination in &self.destinations {
            if let Err(e) = socket.send_to(notify.as_bytes(), destination) {
                log::warn!("SSDP byebye to {destination}: {e}");
            }
        }
    }

    /// How long until the next announcement is due
    #[must_use]
    pub fn until_announce(&self, now: Instant) -> Duration {
        self.announce.until_due(now)
    }
}
