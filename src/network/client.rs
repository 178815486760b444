//! UDP Client
//!
//! Sends one command datagram and waits for its response.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::error::{CncError, Result};
use crate::protocol::{CommandCodec, CommandPacket, PacketLimits, ResponseCodec, ResponsePacket};

/// Client for a C&C node
pub struct Client {
    socket: UdpSocket,
    server: SocketAddr,
    command_codec: CommandCodec,
    response_codec: ResponseCodec,
    timeout: Duration,
}

impl Client {
    /// Connect to `server` using the given profile
    ///
    /// `timeout` bounds how long [`Client::send`] waits for a response.
    pub fn connect(
        server: impl ToSocketAddrs,
        limits: PacketLimits,
        timeout: Duration,
    ) -> Result<Self> {
        let server = server
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| CncError::Network("server address did not resolve".to_string()))?;

        let local: SocketAddr = if server.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local)?;
        socket.connect(server)?;
        socket.set_read_timeout(Some(timeout))?;

        Ok(Self {
            socket,
            server,
            command_codec: CommandCodec::new(limits),
            response_codec: ResponseCodec::new(limits),
            timeout,
        })
    }

    /// Send a command and wait for the response
    pub fn send(&self, command: &CommandPacket) -> Result<ResponsePacket> {
        let request = self.command_codec.encode(command)?;
        self.socket.send(&request)?;
        tracing::debug!("Sent {} bytes to {}", request.len(), self.server);

        let mut buf = vec![0u8; self.response_codec.limits().mtu() + 1];
        let len = match self.socket.recv(&mut buf) {
            Ok(len) => len,
            Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Err(CncError::Network(format!(
                    "no response from {} within {}ms",
                    self.server,
                    self.timeout.as_millis()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(self.response_codec.decode(&buf[..len])?)
    }

    /// Address of the server
    pub fn server_addr(&self) -> SocketAddr {
        self.server
    }
}
