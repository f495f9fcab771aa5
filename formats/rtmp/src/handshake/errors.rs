use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("peer offered rtmp version {0}, only version 3 is spoken")]
    UnsupportedVersion(u8),
}

pub type HandshakeResult<T> = Result<T, HandshakeError>;
