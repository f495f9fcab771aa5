use std::io;

use thiserror::Error;

use crate::{
    protocol_control::errors::ProtocolControlMessageError,
    user_control::errors::UserControlEventError,
};

#[derive(Debug, Error)]
pub enum ChunkMessageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("protocol control message: {0}")]
    ProtocolControl(#[from] ProtocolControlMessageError),
    #[error("user control event: {0}")]
    UserControl(#[from] UserControlEventError),
    #[error("unexpected fmt bits: {0:#b}")]
    UnexpectedFmt(u8),
    #[error("unknown message type: {0}")]
    UnknownMessageType(u8),
    #[error("invalid csid: {0}")]
    InvalidBasicHeader(String),
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("transmit queue full for csid {csid}")]
    QueueFull { csid: u32 },
}

pub type ChunkMessageResult<T> = Result<T, ChunkMessageError>;
