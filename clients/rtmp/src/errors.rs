use std::io;

use rtmp_formats::{
    chunk::errors::ChunkMessageError, commands::errors::CommandMessageError,
    handshake::errors::HandshakeError, protocol_control::errors::ProtocolControlMessageError,
    user_control::errors::UserControlEventError,
};
use thiserror::Error;

use crate::handler::DisconnectReason;

#[derive(Debug, Error)]
pub enum RtmpClientError {
    #[error("invalid rtmp url: {0}")]
    InvalidUrl(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),
    #[error("chunk layer: {0}")]
    Chunk(#[from] ChunkMessageError),
    #[error("command message: {0}")]
    Command(#[from] CommandMessageError),
    #[error("protocol control message: {0}")]
    ProtocolControl(#[from] ProtocolControlMessageError),
    #[error("user control event: {0}")]
    UserControl(#[from] UserControlEventError),
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("server rejected the session: {code} ({description})")]
    ServerRejected {
        reason: DisconnectReason,
        code: String,
        description: String,
    },
    #[error("server requested close")]
    ServerClose,
    #[error("session already connected")]
    AlreadyConnected,
    #[error("session is not publishing")]
    NotReady,
    #[error("audio configuration must be sent before audio data")]
    AudioConfigMissing,
    #[error("malformed media payload: {0}")]
    MalformedMedia(String),
}

pub type RtmpClientResult<T> = Result<T, RtmpClientError>;

impl RtmpClientError {
    /// Which reason a failure surfaces as on the connection-state callback.
    pub fn disconnect_reason(&self) -> DisconnectReason {
        match self {
            RtmpClientError::Timeout(_) => DisconnectReason::Timeout,
            RtmpClientError::Io(_) | RtmpClientError::Handshake(_) => {
                DisconnectReason::NetworkError
            }
            RtmpClientError::ServerRejected { reason, .. } => *reason,
            RtmpClientError::ServerClose => DisconnectReason::ServerRequest,
            RtmpClientError::Chunk(_)
            | RtmpClientError::Command(_)
            | RtmpClientError::ProtocolControl(_)
            | RtmpClientError::UserControl(_) => DisconnectReason::Unknown,
            _ => DisconnectReason::InternalError,
        }
    }
}
