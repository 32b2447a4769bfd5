use std::net::SocketAddr;

/// Where a request came from, as seen by the transport.
///
/// Administrative operations are restricted to [`CallerOrigin::Local`]. The
/// value must be derived from the peer address of the connection and never
/// from anything the client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallerOrigin {
    /// The peer is on the operator machine (loopback address).
    Local,
    /// Any other peer, or a peer whose address is unknown.
    Remote,
}

impl CallerOrigin {
    pub fn from_peer(peer: SocketAddr) -> Self {
        if peer.ip().is_loopback() {
            Self::Local
        } else {
            Self::Remote
        }
    }

    pub fn is_local(self) -> bool {
        matches!(self, Self::Local)
    }
}
