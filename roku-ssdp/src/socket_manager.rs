use crate::timer::IntervalTimer;
use crate::udp::{Bind, Multicast, SetupStep, SocketError};
use crate::{RECOVERY_INTERVAL, REFRESH_INTERVAL, SSDP_MULTICAST_ADDR};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

/// Owns the SSDP socket and keeps it joined to the multicast group
///
/// The socket is either absent ("unset") or bound to the discovery
/// port on the wildcard address and joined to the SSDP group on
/// `local_ip`. Nothing else may create, close or re-join it.
///
/// Three things keep discovery alive over long uptimes:
///  - [`create_and_join`](Self::create_and_join) sets the socket up from
///    scratch, closing whatever was there before;
///  - [`refresh_if_due`](Self::refresh_if_due) drops and re-adds group
///    membership every [`REFRESH_INTERVAL`], escalating to a full
///    recreation if the re-join fails;
///  - [`recover_if_needed`](Self::recover_if_needed) retries setup every
///    [`RECOVERY_INTERVAL`] for as long as there is no socket.
///
/// Every change of socket bumps [`generation`](Self::generation), so an
/// owner that registered the old socket with a poller knows to register
/// the new one.
///
pub struct MulticastSocketManager<B: Bind> {
    binder: B,
    socket: Option<B::Socket>,
    local_ip: Ipv4Addr,
    port: u16,
    refresh: IntervalTimer,
    recovery: IntervalTimer,
    generation: u64,
}

impl<B: Bind> MulticastSocketManager<B> {
    /// Create a new manager, with no socket yet
    ///
    /// Membership is reported on `local_ip`; `port` is the discovery
    /// port to bind (normally [`crate::SSDP_PORT`]).
    pub const fn new(binder: B, local_ip: Ipv4Addr, port: u16) -> Self {
        Self {
            binder,
            socket: None,
            local_ip,
            port,
            refresh: IntervalTimer::new(REFRESH_INTERVAL),
            recovery: IntervalTimer::new(RECOVERY_INTERVAL),
            generation: 0,
        }
    }

    /// (Re)create the socket and join the SSDP multicast group
    ///
    /// Any existing socket is closed first. On success the refresh
    /// timer restarts from `now`. Whatever the outcome, `now` counts as
    /// a setup attempt for the purposes of recovery.
    ///
    /// # Errors
    ///
    /// Returns a [`SocketError`] naming the step that failed; the
    /// socket is then closed and left unset.
    ///
    pub fn create_and_join(&mut self, now: Instant) -> Result<(), SocketError> {
        self.recovery.mark(now);
        self.socket = None;

        let socket = self.binder.bind(self.port)?;
        socket
            .join_multicast_group(&SSDP_MULTICAST_ADDR, &self.local_ip)
            .map_err(|e| SocketError {
                step: SetupStep::Join,
                source: e,
            })?;

        self.socket = Some(socket);
        self.refresh.mark(now);
        self.generation += 1;
        log::info!(
            "SSDP socket bound to port {} and joined {} on {}",
            self.port,
            SSDP_MULTICAST_ADDR,
            self.local_ip
        );
        Ok(())
    }

    /// Drop and re-join the multicast group if the refresh interval has
    /// elapsed
    ///
    /// Does nothing without a socket. If the re-join fails, the socket
    /// is recreated from scratch, once.
    pub fn refresh_if_due(&mut self, now: Instant) {
        let Some(socket) = self.socket.as_ref() else {
            return;
        };
        if !self.refresh.is_due(now) {
            return;
        }
        self.refresh.mark(now);

        // Leaving can fail if membership already lapsed; that's fine
        if let Err(e) =
            socket.leave_multicast_group(&SSDP_MULTICAST_ADDR, &self.local_ip)
        {
            log::debug!("SSDP leave before refresh: {e}");
        }
        match socket.join_multicast_group(&SSDP_MULTICAST_ADDR, &self.local_ip)
        {
            Ok(()) => log::debug!("SSDP membership refreshed"),
            Err(e) => {
                log::warn!("SSDP re-join failed ({e}), recreating socket");
                if let Err(e) = self.create_and_join(now) {
                    log::error!("SSDP socket recreation: {e}: {}", e.source);
                }
            }
        }
    }

    /// Retry setup if there is no socket and the recovery interval has
    /// elapsed since the last attempt
    pub fn recover_if_needed(&mut self, now: Instant) {
        if self.socket.is_some() || !self.recovery.is_due(now) {
            return;
        }
        log::info!("SSDP socket recovery attempt");
        if let Err(e) = self.create_and_join(now) {
            log::warn!(
                "SSDP socket recovery: {e}: {}, retrying in {}s",
                e.source,
                RECOVERY_INTERVAL.as_secs()
            );
        }
    }

    /// Leave the multicast group (best-effort) and close the socket
    pub fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            if let Err(e) = socket
                .leave_multicast_group(&SSDP_MULTICAST_ADDR, &self.local_ip)
            {
                log::debug!("SSDP leave on close: {e}");
            }
            log::info!("SSDP socket closed");
        }
    }

    /// The socket, if there is one
    pub const fn socket(&self) -> Option<&B::Socket> {
        self.socket.as_ref()
    }

    /// The socket, mutably (for registering with a poller)
    pub fn socket_mut(&mut self) -> Option<&mut B::Socket> {
        self.socket.as_mut()
    }

    /// Whether the socket is currently set up and joined
    pub const fn is_joined(&self) -> bool {
        self.socket.is_some()
    }

    /// Incremented every time a new socket is successfully set up
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// The interface address membership is reported on
    pub const fn local_ip(&self) -> Ipv4Addr {
        self.local_ip
    }

    /// How long until this manager next has work to do
    pub fn next_wakeup(&self, now: Instant) -> Duration {
        if self.socket.is_some() {
            self.refresh.until_due(now)
        } else {
            self.recovery.until_due(now)
        }
    }
}
