use super::{Bind, Error, SetupStep, SocketError, Syscall};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

type NewSocketFn = fn() -> std::io::Result<socket2::Socket>;
type SockoptFn = fn(&socket2::Socket, bool) -> std::io::Result<()>;
type BindFn = fn(&socket2::Socket, SocketAddrV4) -> std::io::Result<()>;

fn setup_socket_inner(
    port: u16,
    new_socket: NewSocketFn,
    reuse_address: SockoptFn,
    broadcast: SockoptFn,
    nonblocking: SockoptFn,
    bind: BindFn,
) -> Result<std::net::UdpSocket, SocketError> {
    let create = |syscall: Syscall| {
        move |e: std::io::Error| {
            SocketError::new(SetupStep::Create, syscall, e)
        }
    };
    let socket = new_socket().map_err(create(Syscall::Socket))?;
    reuse_address(&socket, true).map_err(create(Syscall::Setsockopt))?;
    broadcast(&socket, true).map_err(create(Syscall::Setsockopt))?;
    nonblocking(&socket, true).map_err(create(Syscall::Setsockopt))?;

    // Must be the wildcard address: a socket bound to the local IP
    // does not see datagrams addressed to the multicast group
    bind(&socket, SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))
        .map_err(|e| SocketError::new(SetupStep::Bind, Syscall::Bind, e))?;
    Ok(socket.into())
}

/// Creates real SSDP sockets as [`mio::net::UdpSocket`]s
///
/// The sockets can be registered with a [`mio::Poll`] to wake a poll
/// loop when datagrams arrive.
#[derive(Debug, Default, Clone, Copy)]
pub struct MioBinder;

impl Bind for MioBinder {
    type Socket = mio::net::UdpSocket;

    fn bind(&self, port: u16) -> Result<Self::Socket, SocketError> {
        let socket = setup_socket_inner(
            port,
            || {
                socket2::Socket::new(
                    socket2::Domain::IPV4,
                    socket2::Type::DGRAM,
                    Some(socket2::Protocol::UDP),
                )
            },
            socket2::Socket::set_reuse_address,
            socket2::Socket::set_broadcast,
            socket2::Socket::set_nonblocking,
            |s, a| s.bind(&socket2::SockAddr::from(a)),
        )?;
        Ok(mio::net::UdpSocket::from_std(socket))
    }
}

impl super::DatagramSend for mio::net::UdpSocket {
    fn send_to(&self, buffer: &[u8], to: &SocketAddr) -> Result<(), Error> {
        mio::net::UdpSocket::send_to(self, buffer, *to)
            .map(|_| ())
            .map_err(|e| Error::Syscall(Syscall::Sendto, e))
    }
}

impl super::DatagramReceive for mio::net::UdpSocket {
    fn receive_from(
        &self,
        buffer: &mut [u8],
    ) -> Result<Option<(usize, SocketAddr)>, Error> {
        match self.recv_from(buffer) {
            Ok(r) => Ok(Some(r)),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(Error::Syscall(Syscall::Recvfrom, e)),
        }
    }
}

impl super::Multicast for mio::net::UdpSocket {
    fn join_multicast_group(
        &self,
        multicast_address: &Ipv4Addr,
        interface: &Ipv4Addr,
    ) -> Result<(), Error> {
        self.join_multicast_v4(multicast_address, interface)
            .map_err(|e| Error::Syscall(Syscall::JoinMulticast, e))
    }

    fn leave_multicast_group(
        &self,
        multicast_address: &Ipv4Addr,
        interface: &Ipv4Addr,
    ) -> Result<(), Error> {
        self.leave_multicast_v4(multicast_address, interface)
            .map_err(|e| Error::Syscall(Syscall::LeaveMulticast, e))
    }
}
