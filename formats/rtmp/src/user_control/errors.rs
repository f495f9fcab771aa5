use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserControlEventError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unknown user control event type: {0}")]
    UnknownEventType(u16),
}

pub type UserControlEventResult<T> = Result<T, UserControlEventError>;
