use std::net::{Ipv4Addr, SocketAddr};

/// The list of system calls which can return errors
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    /// socket() returned an error
    Socket,
    /// setsockopt() (other than multicast membership) returned an error
    Setsockopt,
    /// bind() returned an error
    Bind,
    /// sendto() returned an error
    Sendto,
    /// recvfrom() returned an error
    Recvfrom,
    /// setsockopt(IP_ADD_MEMBERSHIP) returned an error
    JoinMulticast,
    /// setsockopt(IP_DROP_MEMBERSHIP) returned an error
    LeaveMulticast,
}

/// The errors which can be returned from UDP trait methods
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A system call returned an error
    #[error("error from syscall {0:?}")]
    Syscall(Syscall, #[source] std::io::Error),
}

/// The stage of multicast socket setup which failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    /// Opening the socket, or configuring its options
    Create,
    /// Binding to the discovery port on the wildcard address
    Bind,
    /// Joining the discovery multicast group
    Join,
}

impl ::core::fmt::Display for SetupStep {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Bind => "bind",
            Self::Join => "join",
        })
    }
}

/// Setting up the SSDP socket failed; the socket has been closed
#[derive(Debug, thiserror::Error)]
#[error("multicast socket {step} failed")]
pub struct SocketError {
    /// Which step failed
    pub step: SetupStep,
    /// The underlying failure
    #[source]
    pub source: Error,
}

impl SocketError {
    pub(crate) fn new(
        step: SetupStep,
        syscall: Syscall,
        e: std::io::Error,
    ) -> Self {
        Self {
            step,
            source: Error::Syscall(syscall, e),
        }
    }
}

/// Sending UDP datagrams
pub trait DatagramSend {
    /// Send one datagram to `to`
    ///
    /// # Errors
    ///
    /// Returns `Err` if the underlying sendto call fails (including
    /// when it would block).
    ///
    fn send_to(&self, buffer: &[u8], to: &SocketAddr) -> Result<(), Error>;
}

/// Receiving UDP datagrams without blocking
pub trait DatagramReceive {
    /// Receive one datagram if one is pending
    ///
    /// Returns `Ok(None)` if nothing is waiting.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the underlying recvfrom call fails for any
    /// reason other than there being no datagram pending.
    ///
    fn receive_from(
        &self,
        buffer: &mut [u8],
    ) -> Result<Option<(usize, SocketAddr)>, Error>;
}

/// Joining and leaving multicast groups (by interface address)
pub trait Multicast {
    /// Join a multicast group, reporting membership on `interface`
    ///
    /// # Errors
    ///
    /// Can only fail if the underlying system call fails.
    ///
    fn join_multicast_group(
        &self,
        multicast_address: &Ipv4Addr,
        interface: &Ipv4Addr,
    ) -> Result<(), Error>;

    /// Leave a multicast group previously joined on `interface`
    ///
    /// # Errors
    ///
    /// Can only fail if the underlying system call fails.
    ///
    fn leave_multicast_group(
        &self,
        multicast_address: &Ipv4Addr,
        interface: &Ipv4Addr,
    ) -> Result<(), Error>;
}

/// Creating sockets suitable for SSDP
///
/// A `Bind` implementation opens a UDP socket, enables address reuse
/// and broadcast, makes it non-blocking, and binds it to `port` on the
/// wildcard address. Closing is dropping.
pub trait Bind {
    /// The type of socket produced
    type Socket: DatagramSend + DatagramReceive + Multicast;

    /// Open and bind a new socket
    ///
    /// # Errors
    ///
    /// Returns a [`SocketError`] naming the step ([`SetupStep::Create`]
    /// or [`SetupStep::Bind`]) that failed.
    ///
    fn bind(&self, port: u16) -> Result<Self::Socket, SocketError>;
}

/// Trait implementations for MIO sockets, set up with socket2
pub mod mio;
