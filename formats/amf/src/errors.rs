use std::{io, string};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AmfError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid utf8 data: {0}")]
    InvalidUtf8(#[from] string::FromUtf8Error),
    #[error("unsupported amf value marker: {marker}")]
    Unsupported { marker: u8 },
    #[error("unknown marker: {marker}")]
    Unknown { marker: u8 },
    #[error("string too long for amf encoding: {length}")]
    StringTooLong { length: usize },
}

pub type AmfResult<T> = Result<T, AmfError>;
