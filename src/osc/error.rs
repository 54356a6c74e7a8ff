//! OSC transport errors.

/// Errors that can occur while setting up or using the OSC transport.
///
/// These never escape [`OscTransport::send`](super::OscTransport::send);
/// they are only visible from [`UdpOscClient`](super::UdpOscClient)
/// construction and its fallible send.
#[derive(Debug, thiserror::Error)]
pub enum OscError {
    /// The target host and port did not resolve to an address.
    #[error("Cannot resolve OSC target {0}")]
    Resolve(String),

    /// Failed to bind or connect the local UDP socket.
    #[error("Failed to open UDP socket: {0}")]
    Socket(#[from] std::io::Error),

    /// The message could not be encoded.
    #[error("Failed to encode OSC message: {0}")]
    Encode(String),

    /// The transport was closed.
    #[error("OSC transport closed")]
    Closed,
}
