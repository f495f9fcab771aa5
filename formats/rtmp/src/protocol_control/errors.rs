use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolControlMessageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("message type {0} is not protocol control")]
    NotProtocolControl(u8),
}

pub type ProtocolControlMessageResult<T> = Result<T, ProtocolControlMessageError>;
