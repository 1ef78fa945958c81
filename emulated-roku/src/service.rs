use crate::config::Config;
use crate::dispatcher::{Callback, Dispatcher};
use crate::ecp::server::MAX_REQUESTS_PER_CYCLE;
use crate::ecp::{EcpServer, Router};
use crate::identity::DeviceIdentity;
use crate::readiness::{NetworkState, ReadinessGate};
use roku_ssdp::timer::IntervalTimer;
use roku_ssdp::udp::Bind;
use roku_ssdp::{Engine, MulticastSocketManager, RECOVERY_INTERVAL};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

/// mio token for the ECP HTTP listener
pub const HTTP_TOKEN: mio::Token = mio::Token(0);

/// mio token for the SSDP socket
pub const SSDP_TOKEN: mio::Token = mio::Token(1);

/// Most datagrams handled per poll cycle
pub const MAX_DATAGRAMS_PER_CYCLE: usize = 8;

/// How often to check for connectivity before the network is up
pub const READINESS_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How often to service HTTP connections that are part-way through
pub const IN_FLIGHT_POLL_INTERVAL: Duration = Duration::from_millis(20);

struct Running<B: Bind> {
    router: Router,
    http: Option<EcpServer>,
    http_retry: IntervalTimer,
    listener_registered: bool,
    sockets: MulticastSocketManager<B>,
    registered_generation: u64,
    engine: Engine,
    backlog: bool,
}

/// The whole emulated Roku: readiness gate, ECP server and SSDP
///
/// Drive it by calling [`poll_cycle`](Self::poll_cycle) repeatedly
/// from a single thread, sleeping (or waiting on a [`mio::Poll`]) for
/// up to [`next_wakeup`](Self::next_wakeup) in between. Nothing
/// happens until the network reports connectivity; then the HTTP
/// listener and SSDP socket are started, once.
///
/// Within each cycle, HTTP requests are handled first, then SSDP
/// socket maintenance, then incoming datagrams, then the periodic
/// announcement. HTTP and datagram handling are both bounded per
/// cycle so that neither can starve what follows.
///
pub struct Service<N: NetworkState, B: Bind> {
    config: Config,
    network: N,
    binder: Option<B>,
    dispatcher: Dispatcher,
    gate: ReadinessGate,
    running: Option<Running<B>>,
}

impl<N: NetworkState, B: Bind> Service<N, B> {
    /// Create a new service, not yet started
    pub fn new(config: Config, network: N, binder: B) -> Self {
        Self {
            config,
            network,
            binder: Some(binder),
            dispatcher: Dispatcher::new(),
            gate: ReadinessGate::new(),
            running: None,
        }
    }

    /// Register an observer for key events
    pub fn subscribe(&mut self, observer: Box<dyn Callback>) {
        self.dispatcher.register(observer);
    }

    /// The device identity, once the network has come up
    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.running.as_ref().map(|r| r.router.identity())
    }

    /// Where the ECP HTTP server is listening, if it is
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.running
            .as_ref()
            .and_then(|r| r.http.as_ref())
            .and_then(|h| h.local_addr().ok())
    }

    /// Whether the SSDP socket is currently joined to the multicast group
    pub fn is_joined(&self) -> bool {
        self.running.as_ref().is_some_and(|r| r.sockets.is_joined())
    }

    fn start(&mut self, identity: DeviceIdentity, now: Instant) {
        let Some(binder) = self.binder.take() else {
            return;
        };
        let mut sockets = MulticastSocketManager::new(
            binder,
            identity.local_ip,
            self.config.discovery_port,
        );
        if let Err(e) = sockets.create_and_join(now) {
            log::error!(
                "SSDP socket setup: {e}: {}, retrying in {}s",
                e.source,
                RECOVERY_INTERVAL.as_secs()
            );
        }
        let engine =
            Engine::new(identity.advertisement(), &self.config.announce_targets());
        self.running = Some(Running {
            router: Router::new(identity),
            http: None,
            http_retry: IntervalTimer::new(RECOVERY_INTERVAL),
            listener_registered: false,
            sockets,
            registered_generation: 0,
            engine,
            backlog: false,
        });
        log::info!("Emulated Roku started");
    }

    /// Do everything that is due, without blocking
    pub fn poll_cycle(&mut self, now: Instant) {
        if self.running.is_none() {
            let Some(identity) = self.gate.poll(&self.network, &self.config)
            else {
                return;
            };
            self.start(identity, now);
        }
        let Some(r) = self.running.as_mut() else {
            return;
        };
        r.backlog = false;

        if r.http.is_none() && r.http_retry.is_due(now) {
            r.http_retry.mark(now);
            let address =
                SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), self.config.port);
            match EcpServer::bind(address) {
                Ok(server) => r.http = Some(server),
                Err(e) => log::error!(
                    "ECP HTTP bind to {address}: {e}, retrying in {}s",
                    RECOVERY_INTERVAL.as_secs()
                ),
            }
        }
        if let Some(http) = r.http.as_mut() {
            let answered = http.handle_pending(now, &r.router, &self.dispatcher);
            if answered >= MAX_REQUESTS_PER_CYCLE || http.has_backlog() {
                r.backlog = true;
            }
        }

        r.sockets.recover_if_needed(now);
        r.sockets.refresh_if_due(now);
        let Some(socket) = r.sockets.socket() else {
            return;
        };

        let mut handled = 0;
        while let Some((payload, sender)) = r.engine.poll_incoming(socket) {
            r.engine.on_data(&payload, sender, socket);
            handled += 1;
            if handled == MAX_DATAGRAMS_PER_CYCLE {
                // There may be more; readiness won't tell us again
                r.backlog = true;
                break;
            }
        }

        r.engine.announce_if_due(now, socket);
    }

    /// How long the caller may wait before the next
    /// [`poll_cycle`](Self::poll_cycle)
    pub fn next_wakeup(&self, now: Instant) -> Duration {
        let Some(r) = self.running.as_ref() else {
            return READINESS_POLL_INTERVAL;
        };
        if r.backlog {
            return Duration::ZERO;
        }
        let mut wakeup = r.sockets.next_wakeup(now);
        if r.sockets.is_joined() {
            wakeup = wakeup.min(r.engine.until_announce(now));
        }
        match &r.http {
            None => wakeup = wakeup.min(r.http_retry.until_due(now)),
            Some(http) if http.has_in_flight() => {
                wakeup = wakeup.min(IN_FLIGHT_POLL_INTERVAL);
            }
            Some(_) => {}
        }
        wakeup
    }

    /// Send "byebye", leave the multicast group and stop listening
    ///
    /// The service does nothing further after this.
    pub fn shutdown(&mut self) {
        let Some(mut r) = self.running.take() else {
            return;
        };
        if let Some(socket) = r.sockets.socket() {
            r.engine.byebye(socket);
        }
        r.sockets.close();
        if r.http.take().is_some() {
            log::info!("ECP HTTP server closed");
        }
    }
}

impl<N: NetworkState, B: Bind> Service<N, B>
where
    B::Socket: mio::event::Source,
{
    /// Register any new listener or socket with a [`mio::Poll`]
    ///
    /// Call after every [`poll_cycle`](Self::poll_cycle): the SSDP
    /// socket may have been recreated.
    ///
    /// # Errors
    ///
    /// Passes on errors from [`mio::Registry::register`].
    ///
    pub fn register(&mut self, registry: &mio::Registry) -> std::io::Result<()> {
        let Some(r) = self.running.as_mut() else {
            return Ok(());
        };
        if !r.listener_registered {
            if let Some(http) = r.http.as_mut() {
                registry.register(
                    http.listener_mut(),
                    HTTP_TOKEN,
                    mio::Interest::READABLE,
                )?;
                r.listener_registered = true;
            }
        }
        let generation = r.sockets.generation();
        if generation != r.registered_generation {
            if let Some(socket) = r.sockets.socket_mut() {
                registry.register(socket, SSDP_TOKEN, mio::Interest::READABLE)?;
                r.registered_generation = generation;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::KeyAction;
    use roku_ssdp::fake::{FakeBinder, FakeNetwork};
    use roku_ssdp::message;
    use roku_ssdp::SSDP_MULTICAST_ADDR;
    use std::cell::{Cell, RefCell};
    use std::net::IpAddr;
    use std::rc::Rc;

    const LOCAL: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 50);
    const HUB: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 10);

    /// A network which comes up when told to
    #[derive(Clone, Default)]
    struct StaticNetwork {
        connected: Rc<Cell<bool>>,
    }

    impl NetworkState for StaticNetwork {
        fn is_connected(&self) -> bool {
            self.connected.get()
        }
        fn local_ip_addresses(&self) -> Vec<IpAddr> {
            vec![IpAddr::V4(LOCAL)]
        }
        fn fallback_local_ip(&self) -> Option<Ipv4Addr> {
            None
        }
        fn station_mac(&self) -> [u8; 6] {
            [0xEF, 0xBE, 0xAD, 0xDE, 0x01, 0x02]
        }
    }

    struct Fixture {
        net: FakeNetwork,
        host: StaticNetwork,
        service: Service<StaticNetwork, FakeBinder>,
        now: Instant,
    }

    impl Fixture {
        fn new() -> Self {
            let net = FakeNetwork::new();
            let host = StaticNetwork::default();
            let config = Config {
                port: 0,
                unicast_target: Some(HUB),
                ..Default::default()
            };
            let service = Service::new(config, host.clone(), net.binder());
            Self {
                net,
                host,
                service,
                now: Instant::now(),
            }
        }

        fn started() -> Self {
            let mut f = Self::new();
            f.host.connected.set(true);
            f.service.poll_cycle(f.now);
            f
        }

        fn at(&mut self, secs: u64) {
            self.service.poll_cycle(self.now + Duration::from_secs(secs));
        }
    }

    fn search() -> &'static [u8] {
        b"M-SEARCH * HTTP/1.1\r\nST: roku:ecp\r\nMX: 1\r\n\r\n"
    }

    #[test]
    fn nothing_before_connectivity() {
        let mut f = Fixture::new();
        for i in 0..5 {
            f.at(i);
        }
        assert_eq!(f.net.create_count(), 0);
        assert!(f.service.identity().is_none());
        assert!(f.service.http_addr().is_none());
        assert_eq!(f.service.next_wakeup(f.now), READINESS_POLL_INTERVAL);
    }

    #[test]
    fn starts_once_connected() {
        let f = Fixture::started();

        let id = f.service.identity().unwrap();
        assert_eq!(id.local_ip, LOCAL);
        assert_eq!(id.unique_service_name, "ESP32-DEADBEEF");
        assert!(f.service.http_addr().is_some());
        assert!(f.service.is_joined());
        assert_eq!(f.net.binds(), vec![1900]);
        assert_eq!(f.net.joins(), vec![(SSDP_MULTICAST_ADDR, LOCAL)]);
    }

    #[test]
    fn startup_never_repeated() {
        let mut f = Fixture::started();
        for i in 1..30 {
            f.at(i);
        }
        assert_eq!(f.net.create_count(), 1);
    }

    #[test]
    fn first_cycle_announces_to_three_destinations() {
        let f = Fixture::started();
        let alive = message::build_notify_alive(
            &f.service.identity().unwrap().advertisement(),
        )
        .into_bytes();

        let sends = f.net.sends();
        assert_eq!(sends.len(), 3);
        assert!(sends.iter().all(|(_, p)| *p == alive));
        assert_eq!(sends[2].0, SocketAddr::new(HUB.into(), 1900));
    }

    #[test]
    fn announces_every_five_seconds() {
        let mut f = Fixture::started();
        f.at(4);
        assert_eq!(f.net.sends().len(), 3);
        f.at(5);
        assert_eq!(f.net.sends().len(), 6);
        f.at(7);
        assert_eq!(f.net.sends().len(), 6);
    }

    #[test]
    fn search_answered() {
        let mut f = Fixture::started();
        f.net.clear();
        let sender: SocketAddr = "192.168.1.77:43210".parse().unwrap();
        f.net.inject(search(), sender);
        f.net.inject(b"NOTIFY * HTTP/1.1\r\nNT: upnp:rootdevice\r\n\r\n", sender);

        f.at(1);

        let sends = f.net.sends();
        assert_eq!(sends.len(), 1);
        assert_eq!(sends[0].0, sender);
        assert!(String::from_utf8_lossy(&sends[0].1)
            .contains("Location: http://192.168.1.50:0/\r\n"));
    }

    #[test]
    fn datagrams_bounded_per_cycle() {
        let mut f = Fixture::started();
        f.net.clear();
        let sender: SocketAddr = "192.168.1.77:1900".parse().unwrap();
        for _ in 0..(MAX_DATAGRAMS_PER_CYCLE + 2) {
            f.net.inject(search(), sender);
        }

        f.at(1);
        assert_eq!(f.net.sends().len(), MAX_DATAGRAMS_PER_CYCLE);
        assert_eq!(
            f.service.next_wakeup(f.now + Duration::from_secs(1)),
            Duration::ZERO
        );

        f.at(1);
        assert_eq!(f.net.sends().len(), MAX_DATAGRAMS_PER_CYCLE + 2);
        assert_ne!(
            f.service.next_wakeup(f.now + Duration::from_secs(1)),
            Duration::ZERO
        );
    }

    #[test]
    fn recovers_socket_after_failed_start() {
        let mut f = Fixture::new();
        f.net.fail_bind(true);
        f.host.connected.set(true);
        f.service.poll_cycle(f.now);

        assert!(!f.service.is_joined());
        assert!(f.net.sends().is_empty());
        assert!(f.service.http_addr().is_some());
        assert_eq!(
            f.service.next_wakeup(f.now + Duration::from_secs(3)),
            Duration::from_secs(7)
        );

        f.net.fail_bind(false);
        f.at(9);
        assert!(!f.service.is_joined());
        f.at(10);
        assert!(f.service.is_joined());
        assert_eq!(f.net.sends().len(), 3);
    }

    #[test]
    fn membership_refreshed_every_minute() {
        let mut f = Fixture::started();
        f.net.clear();

        f.at(59);
        assert!(f.net.leaves().is_empty());
        f.at(60);
        assert_eq!(f.net.leaves(), vec![(SSDP_MULTICAST_ADDR, LOCAL)]);
        assert_eq!(f.net.joins(), vec![(SSDP_MULTICAST_ADDR, LOCAL)]);
        assert_eq!(f.net.create_count(), 1);
    }

    #[test]
    fn failed_refresh_recreates_socket() {
        let mut f = Fixture::started();
        f.net.fail_joins(1);

        f.at(60);

        assert_eq!(f.net.create_count(), 2);
        assert_eq!(f.net.open_count(), 1);
        assert!(f.service.is_joined());
    }

    #[test]
    fn next_wakeup_is_next_announce() {
        let mut f = Fixture::started();
        f.at(2);
        assert_eq!(
            f.service.next_wakeup(f.now + Duration::from_secs(2)),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn shutdown_says_goodbye() {
        let mut f = Fixture::started();
        f.net.clear();

        f.service.shutdown();

        let sends = f.net.sends();
        assert_eq!(sends.len(), 3);
        assert!(sends
            .iter()
            .all(|(_, p)| String::from_utf8_lossy(p).contains("NTS: ssdp:byebye")));
        assert_eq!(f.net.leaves(), vec![(SSDP_MULTICAST_ADDR, LOCAL)]);
        assert_eq!(f.net.open_count(), 0);
        assert!(f.service.http_addr().is_none());

        f.at(100);
        assert_eq!(f.net.create_count(), 1);
        f.service.shutdown();
    }

    #[test]
    fn subscribers_registered() {
        let mut f = Fixture::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        f.service.subscribe(Box::new(move |a: KeyAction, k: &str| {
            seen2.borrow_mut().push((a, k.to_string()));
        }));
        f.service.dispatcher.dispatch(&crate::dispatcher::KeyEvent {
            action: KeyAction::Up,
            key: "Back".to_string(),
        });
        assert_eq!(*seen.borrow(), vec![(KeyAction::Up, "Back".to_string())]);
    }
}
