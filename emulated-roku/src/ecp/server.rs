use super::request::{self, Response};
use super::router::Router;
use crate::dispatcher::Dispatcher;
use mio::net::{TcpListener, TcpStream};
use std::io::{Read, Write};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Most new connections accepted per call to
/// [`EcpServer::handle_pending`]
pub const MAX_ACCEPTS_PER_CYCLE: usize = 8;

/// Most requests answered per call to [`EcpServer::handle_pending`]
pub const MAX_REQUESTS_PER_CYCLE: usize = 8;

/// Connections quiet for this long are dropped
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

enum State {
    Reading,
    Writing { response: Vec<u8>, written: usize },
}

struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    buffer: Vec<u8>,
    state: State,
    last_activity: Instant,
}

enum Progress {
    Open,
    Closed,
}

impl Connection {
    fn new(stream: TcpStream, peer: SocketAddr, now: Instant) -> Self {
        Self {
            stream,
            peer,
            buffer: Vec::new(),
            state: State::Reading,
            last_activity: now,
        }
    }

    /// Read whatever has arrived; returns false once the peer has
    /// closed its end (or the connection has failed)
    fn fill(&mut self, now: Instant) -> bool {
        let mut chunk = [0u8; 1024];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => return false,
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[0..n]);
                    self.last_activity = now;
                    if self.buffer.len() > request::MAX_HEAD + request::MAX_BODY {
                        return true;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    return true
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    log::debug!("HTTP read from {}: {e}", self.peer);
                    return false;
                }
            }
        }
    }

    fn respond(&mut self, response: &Response) {
        self.state = State::Writing {
            response: response.to_bytes(),
            written: 0,
        };
    }

    fn flush(&mut self, now: Instant) -> Progress {
        let State::Writing { response, written } = &mut self.state else {
            return Progress::Open;
        };
        while *written < response.len() {
            match self.stream.write(&response[*written..]) {
                Ok(0) => return Progress::Closed,
                Ok(n) => {
                    *written += n;
                    self.last_activity = now;
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    return Progress::Open
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    log::debug!("HTTP write to {}: {e}", self.peer);
                    return Progress::Closed;
                }
            }
        }
        let _ = self.stream.shutdown(std::net::Shutdown::Write);
        Progress::Closed
    }
}

/// The ECP HTTP listener and its in-flight connections
///
/// Nothing here blocks: [`handle_pending`](Self::handle_pending)
/// accepts what is waiting, answers what has fully arrived, and
/// returns. Each connection carries one request; responses say
/// `Connection: close`.
///
pub struct EcpServer {
    listener: TcpListener,
    connections: Vec<Connection>,
    more_to_accept: bool,
}

impl EcpServer {
    /// Start listening on `address`
    ///
    /// # Errors
    ///
    /// Passes on any error from binding the listener.
    ///
    pub fn bind(address: SocketAddr) -> std::io::Result<Self> {
        let listener = TcpListener::bind(address)?;
        log::info!("ECP HTTP server listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            connections: Vec::new(),
            more_to_accept: false,
        })
    }

    /// The address actually bound (useful after binding port 0)
    ///
    /// # Errors
    ///
    /// Passes on any error from the underlying getsockname call.
    ///
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Whether any connection is still being read or written
    #[must_use]
    pub fn has_in_flight(&self) -> bool {
        !self.connections.is_empty()
    }

    /// The listener, for registering with a [`mio::Poll`]
    pub fn listener_mut(&mut self) -> &mut TcpListener {
        &mut self.listener
    }

    fn accept_pending(&mut self, now: Instant) {
        // Readiness is edge-triggered, so remember if we stopped early
        self.more_to_accept = true;
        for _ in 0..MAX_ACCEPTS_PER_CYCLE {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    log::debug!("HTTP connection from {peer}");
                    self.connections.push(Connection::new(stream, peer, now));
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    self.more_to_accept = false;
                    break;
                }
                Err(e) => {
                    log::warn!("HTTP accept: {e}");
                    self.more_to_accept = false;
                    break;
                }
            }
        }
    }

    /// Accept new connections and answer complete requests; returns
    /// how many requests were answered
    ///
    /// At most [`MAX_REQUESTS_PER_CYCLE`] requests are answered per
    /// call, so a flood of HTTP traffic can't starve the SSDP work
    /// which follows in the same cycle. Unanswered requests wait for
    /// the next call.
    pub fn handle_pending(
        &mut self,
        now: Instant,
        router: &Router,
        dispatcher: &Dispatcher,
    ) -> usize {
        self.accept_pending(now);

        let mut answered = 0;
        self.connections.retain_mut(|c| {
            if matches!(c.state, State::Reading) {
                if answered >= MAX_REQUESTS_PER_CYCLE {
                    return true;
                }
                let open = c.fill(now);
                match request::parse(&c.buffer) {
                    Ok(Some(r)) => {
                        answered += 1;
                        c.respond(&router.route(&r, dispatcher));
                    }
                    Ok(None) if !open => return false,
                    Ok(None) => {
                        if now.saturating_duration_since(c.last_activity)
                            >= IDLE_TIMEOUT
                        {
                            log::debug!("HTTP connection from {} timed out", c.peer);
                            return false;
                        }
                        return true;
                    }
                    Err(e) => {
                        log::debug!("HTTP request from {}: {e}", c.peer);
                        answered += 1;
                        c.respond(&Response::empty());
                    }
                }
            }
            match c.flush(now) {
                Progress::Open => {
                    now.saturating_duration_since(c.last_activity)
                        < IDLE_TIMEOUT
                }
                Progress::Closed => false,
            }
        });
        answered
    }

    /// Whether a request is waiting that the last
    /// [`handle_pending`](Self::handle_pending) didn't get round to
    #[must_use]
    pub fn has_backlog(&self) -> bool {
        self.more_to_accept
            || self.connections.iter().any(|c| {
                matches!(c.state, State::Reading)
                    && matches!(request::parse(&c.buffer), Ok(Some(_)) | Err(_))
            })
    }
}
