use tokio_util::bytes::Bytes;

/// Public projection of the session state machine: everything between the
/// first DNS lookup and NetStream.Publish.Start is Connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    ClientRequest,
    ServerRequest,
    NetworkError,
    Refused,
    AlreadyInUse,
    Timeout,
    InternalError,
    Unknown,
}

/// Event surface supplied at construction. Only `connection_state` carries
/// information every caller needs; the rest default to no-ops.
pub trait SessionHandler {
    fn connection_state(&mut self, state: ConnectionState, reason: Option<DisconnectReason>);

    /// The server moved the bandwidth limit (Set Peer Bandwidth accepted).
    fn peer_bandwidth_changed(&mut self, _bandwidth: u32) {}

    /// A caller-supplied payload left the framer, one call per accepted
    /// media or metadata send. After this the buffer is the caller's again.
    fn message_released(&mut self, _payload: Bytes) {}

    /// TCP established, before the handshake starts.
    fn socket_connected(&mut self) {}
}
