use amf_formats::errors::AmfError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandMessageError {
    #[error("amf error: {0}")]
    Amf(#[from] AmfError),
    #[error("invalid command message: {0}")]
    InvalidMessage(String),
}

pub type CommandMessageResult<T> = Result<T, CommandMessageError>;
