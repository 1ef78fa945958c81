//! In-memory sockets for driving the SSDP state machines in tests
//!
//! A [`FakeNetwork`] records every socket created, bound, joined,
//! left, sent on and closed, and lets a test queue inbound datagrams
//! and inject failures at any setup step.

use crate::udp::{
    Bind, DatagramReceive, DatagramSend, Error, Multicast, SetupStep,
    SocketError, Syscall,
};
use std::collections::VecDeque;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard};

fn injected(kind: std::io::ErrorKind) -> std::io::Error {
    std::io::Error::new(kind, "injected")
}

#[derive(Debug, Default)]
struct State {
    creates: usize,
    closes: usize,
    binds: Vec<u16>,
    joins: Vec<(Ipv4Addr, Ipv4Addr)>,
    leaves: Vec<(Ipv4Addr, Ipv4Addr)>,
    sends: Vec<(SocketAddr, Vec<u8>)>,
    inbound: VecDeque<(Vec<u8>, SocketAddr)>,
    fail_create: bool,
    fail_bind: bool,
    join_failures: usize,
    fail_sends: bool,
    fail_receives: bool,
}

/// The shared record behind a [`FakeBinder`] and its sockets
#[derive(Debug, Default, Clone)]
pub struct FakeNetwork {
    state: Arc<Mutex<State>>,
}

impl FakeNetwork {
    /// Create an empty network
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A test which panicked while holding the lock has failed anyway
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// A binder whose sockets live on this network
    #[must_use]
    pub fn binder(&self) -> FakeBinder {
        FakeBinder {
            network: self.clone(),
        }
    }

    /// Queue a datagram for the next receive on any socket
    pub fn inject(&self, payload: &[u8], from: SocketAddr) {
        self.lock().inbound.push_back((payload.to_vec(), from));
    }

    /// Make socket creation fail (or succeed again)
    pub fn fail_create(&self, fail: bool) {
        self.lock().fail_create = fail;
    }

    /// Make binding fail (or succeed again)
    pub fn fail_bind(&self, fail: bool) {
        self.lock().fail_bind = fail;
    }

    /// Make the next `n` multicast joins fail
    pub fn fail_joins(&self, n: usize) {
        self.lock().join_failures = n;
    }

    /// Make every send fail (or succeed again)
    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    /// Make every receive fail (or succeed again)
    pub fn fail_receives(&self, fail: bool) {
        self.lock().fail_receives = fail;
    }

    /// How many sockets have been created
    #[must_use]
    pub fn create_count(&self) -> usize {
        self.lock().creates
    }

    /// How many sockets are currently open
    #[must_use]
    pub fn open_count(&self) -> usize {
        let s = self.lock();
        s.creates - s.closes
    }

    /// The ports sockets were bound to, in order
    #[must_use]
    pub fn binds(&self) -> Vec<u16> {
        self.lock().binds.clone()
    }

    /// Successful joins, as (group, interface)
    #[must_use]
    pub fn joins(&self) -> Vec<(Ipv4Addr, Ipv4Addr)> {
        self.lock().joins.clone()
    }

    /// Leaves, as (group, interface)
    #[must_use]
    pub fn leaves(&self) -> Vec<(Ipv4Addr, Ipv4Addr)> {
        self.lock().leaves.clone()
    }

    /// Successful sends, as (destination, payload)
    #[must_use]
    pub fn sends(&self) -> Vec<(SocketAddr, Vec<u8>)> {
        self.lock().sends.clone()
    }

    /// Forget all recorded sends, joins and leaves
    pub fn clear(&self) {
        let mut s = self.lock();
        s.sends.clear();
        s.joins.clear();
        s.leaves.clear();
        s.binds.clear();
    }
}

/// Creates [`FakeSocket`]s on a [`FakeNetwork`]
#[derive(Debug, Clone)]
pub struct FakeBinder {
    network: FakeNetwork,
}

impl Bind for FakeBinder {
    type Socket = FakeSocket;

    fn bind(&self, port: u16) -> Result<FakeSocket, SocketError> {
        let mut s = self.network.lock();
        if s.fail_create {
            return Err(SocketError {
                step: SetupStep::Create,
                source: Error::Syscall(
                    Syscall::Socket,
                    injected(std::io::ErrorKind::Other),
                ),
            });
        }
        s.creates += 1;
        let socket = FakeSocket {
            network: self.network.clone(),
        };
        if s.fail_bind {
            drop(s);
            // dropping the socket counts the close
            drop(socket);
            return Err(SocketError {
                step: SetupStep::Bind,
                source: Error::Syscall(
                    Syscall::Bind,
                    injected(std::io::ErrorKind::AddrInUse),
                ),
            });
        }
        s.binds.push(port);
        Ok(socket)
    }
}

/// One socket on a [`FakeNetwork`]; closed when dropped
#[derive(Debug)]
pub struct FakeSocket {
    network: FakeNetwork,
}

impl Drop for FakeSocket {
    fn drop(&mut self) {
        self.network.lock().closes += 1;
    }
}

impl DatagramSend for FakeSocket {
    fn send_to(&self, buffer: &[u8], to: &SocketAddr) -> Result<(), Error> {
        let mut s = self.network.lock();
        if s.fail_sends {
            return Err(Error::Syscall(
                Syscall::Sendto,
                injected(std::io::ErrorKind::Other),
            ));
        }
        s.sends.push((*to, buffer.to_vec()));
        Ok(())
    }
}

impl DatagramReceive for FakeSocket {
    fn receive_from(
        &self,
        buffer: &mut [u8],
    ) -> Result<Option<(usize, SocketAddr)>, Error> {
        let mut s = self.network.lock();
        if s.fail_receives {
            return Err(Error::Syscall(
                Syscall::Recvfrom,
                injected(std::io::ErrorKind::Other),
            ));
        }
        Ok(s.inbound.pop_front().map(|(payload, from)| {
            // Truncate like a real datagram socket would
            let n = payload.len().min(buffer.len());
            buffer[0..n].copy_from_slice(&payload[0..n]);
            (n, from)
        }))
    }
}

impl Multicast for FakeSocket {
    fn join_multicast_group(
        &self,
        multicast_address: &Ipv4Addr,
        interface: &Ipv4Addr,
    ) -> Result<(), Error> {
        let mut s = self.network.lock();
        if s.join_failures > 0 {
            s.join_failures -= 1;
            return Err(Error::Syscall(
                Syscall::JoinMulticast,
                injected(std::io::ErrorKind::Other),
            ));
        }
        s.joins.push((*multicast_address, *interface));
        Ok(())
    }

    fn leave_multicast_group(
        &self,
        multicast_address: &Ipv4Addr,
        interface: &Ipv4Addr,
    ) -> Result<(), Error> {
        self.network
            .lock()
            .leaves
            .push((*multicast_address, *interface));
        Ok(())
    }
}
