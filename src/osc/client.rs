//! OSC over UDP.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::{Mutex, PoisonError};

use rosc::{encoder, OscMessage, OscPacket, OscType};

use super::error::OscError;

/// Value carried by an outbound OSC message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscValue {
    Bool(bool),
    Int(i32),
}

impl From<OscValue> for OscType {
    fn from(value: OscValue) -> Self {
        match value {
            OscValue::Bool(b) => OscType::Bool(b),
            OscValue::Int(i) => OscType::Int(i),
        }
    }
}

/// Fire-and-forget outbound protocol.
///
/// Implementations must never panic or block for long; undeliverable
/// messages are dropped.
pub trait OscTransport: Send + Sync {
    fn send(&self, address: &str, value: OscValue);

    /// Release the underlying resources. Later sends are dropped.
    fn close(&self) {}
}

/// Transport used when no OSC client could be created.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledTransport;

impl OscTransport for DisabledTransport {
    fn send(&self, address: &str, value: OscValue) {
        tracing::trace!(address, ?value, "OSC disabled, dropping message");
    }
}

/// OSC client sending single-message packets over a connected UDP socket.
#[derive(Debug)]
pub struct UdpOscClient {
    target: SocketAddr,
    socket: Mutex<Option<UdpSocket>>,
}

impl UdpOscClient {
    /// Bind an ephemeral local socket and connect it to `host:port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the target does not resolve or the socket cannot
    /// be bound or connected.
    pub fn connect(host: &str, port: u16) -> Result<Self, OscError> {
        let target = (host, port)
            .to_socket_addrs()
            .map_err(|e| OscError::Resolve(format!("{host}:{port} ({e})")))?
            .next()
            .ok_or_else(|| OscError::Resolve(format!("{host}:{port}")))?;

        let local: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local)?;
        socket.connect(target)?;

        tracing::debug!(%target, "OSC client connected");
        Ok(Self {
            target,
            socket: Mutex::new(Some(socket)),
        })
    }

    /// Address messages are sent to.
    #[must_use]
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Encode and send one message.
    ///
    /// # Errors
    ///
    /// Returns an error if the client is closed, encoding fails, or the
    /// datagram cannot be sent.
    pub fn try_send(&self, address: &str, value: OscValue) -> Result<(), OscError> {
        let packet = OscPacket::Message(OscMessage {
            addr: address.to_string(),
            args: vec![value.into()],
        });
        let bytes = encoder::encode(&packet).map_err(|e| OscError::Encode(format!("{e:?}")))?;

        let guard = self.socket.lock().unwrap_or_else(PoisonError::into_inner);
        let socket = guard.as_ref().ok_or(OscError::Closed)?;
        socket.send(&bytes)?;
        Ok(())
    }
}

impl OscTransport for UdpOscClient {
    fn send(&self, address: &str, value: OscValue) {
        match self.try_send(address, value) {
            Ok(()) => tracing::trace!(address, ?value, "OSC message sent"),
            Err(OscError::Closed) => {}
            Err(e) => tracing::debug!(address, ?value, error = %e, "Dropping OSC message"),
        }
    }

    fn close(&self) {
        let mut guard = self.socket.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.take().is_some() {
            tracing::debug!(target = %self.target, "OSC client closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn listener() -> UdpSocket {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        socket
    }

    fn receive(socket: &UdpSocket) -> OscMessage {
        let mut buf = [0u8; 1024];
        let len = socket.recv(&mut buf).unwrap();
        match rosc::decoder::decode_udp(&buf[..len]).unwrap().1 {
            OscPacket::Message(msg) => msg,
            OscPacket::Bundle(_) => panic!("expected a message"),
        }
    }

    #[test]
    fn test_sends_bool_and_int() {
        let server = listener();
        let port = server.local_addr().unwrap().port();
        let client = UdpOscClient::connect("127.0.0.1", port).unwrap();
        assert_eq!(client.target().port(), port);

        client.send("/avatar/parameters/Test", OscValue::Bool(true));
        let msg = receive(&server);
        assert_eq!(msg.addr, "/avatar/parameters/Test");
        assert_eq!(msg.args, vec![OscType::Bool(true)]);

        client.send("/avatar/parameters/Hours", OscValue::Int(23));
        let msg = receive(&server);
        assert_eq!(msg.addr, "/avatar/parameters/Hours");
        assert_eq!(msg.args, vec![OscType::Int(23)]);
    }

    #[test]
    fn test_closed_client_drops_silently() {
        let server = listener();
        let port = server.local_addr().unwrap().port();
        let client = UdpOscClient::connect("127.0.0.1", port).unwrap();

        client.close();
        client.close();
        client.send("/a", OscValue::Bool(true));
        assert!(matches!(
            client.try_send("/a", OscValue::Bool(true)),
            Err(OscError::Closed)
        ));
    }

    #[test]
    fn test_unresolvable_host() {
        let result = UdpOscClient::connect("host.invalid", 9000);
        assert!(matches!(result, Err(OscError::Resolve(_))));
    }

    #[test]
    fn test_disabled_transport_accepts_anything() {
        let transport = DisabledTransport;
        transport.send("/x", OscValue::Int(1));
        transport.close();
    }
}
