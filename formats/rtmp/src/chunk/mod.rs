use tokio_util::bytes::{Bytes, BytesMut};

use errors::{ChunkMessageError, ChunkMessageResult};

pub mod consts;
pub mod errors;
pub mod reader;
pub mod writer;

#[cfg(test)]
mod chunk_test;

pub type Csid = u32;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkBasicHeaderForm {
    OneByte,
    TwoByte,
    ThreeByte,
}

///! @see: 5.3.1.1. Chunk Basic Header
///! 1, 2 or 3 bytes: 2-bit fmt plus the chunk stream id, inline for
///! 2..=63, one extra byte for 64..=319, two extra bytes up to 65599.
#[derive(Debug, Clone)]
pub struct ChunkBasicHeader {
    form: ChunkBasicHeaderForm,
    pub fmt: u8,
    pub chunk_stream_id: Csid,
}

impl ChunkBasicHeader {
    pub fn new(fmt: u8, csid: Csid) -> ChunkMessageResult<Self> {
        let form = match csid {
            id if id > 1 && id < 64 => ChunkBasicHeaderForm::OneByte,
            id if id > 63 && id < 320 => ChunkBasicHeaderForm::TwoByte,
            id if id > 319 && id < 65600 => ChunkBasicHeaderForm::ThreeByte,
            _ => {
                return Err(ChunkMessageError::InvalidBasicHeader(format!(
                    "invalid csid: {}",
                    csid
                )));
            }
        };

        Ok(Self {
            form,
            fmt,
            chunk_stream_id: csid,
        })
    }

    pub fn encoded_len(&self) -> usize {
        match self.form {
            ChunkBasicHeaderForm::OneByte => 1,
            ChunkBasicHeaderForm::TwoByte => 2,
            ChunkBasicHeaderForm::ThreeByte => 3,
        }
    }
}

///! @see: 5.3.1.2. Chunk Message Header
/// Message header sizes by fmt: 11, 7, 3, 0 bytes. Types 0/1/2 carry a
/// 24-bit timestamp field which overflows into a trailing 32-bit extended
/// timestamp when the value does not fit; type 3 has no timestamp bytes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageHeaderType {
    Type0 = 0,
    Type1 = 1,
    Type2 = 2,
    Type3 = 3,
}

impl MessageHeaderType {
    pub fn encoded_len(&self) -> usize {
        match self {
            MessageHeaderType::Type0 => 11,
            MessageHeaderType::Type1 => 7,
            MessageHeaderType::Type2 => 3,
            MessageHeaderType::Type3 => 0,
        }
    }
}

impl TryFrom<u8> for MessageHeaderType {
    type Error = ChunkMessageError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageHeaderType::Type0),
            1 => Ok(MessageHeaderType::Type1),
            2 => Ok(MessageHeaderType::Type2),
            3 => Ok(MessageHeaderType::Type3),
            _ => Err(ChunkMessageError::UnexpectedFmt(value)),
        }
    }
}

/// A message handed to the transmit framer. The payload is the caller's
/// buffer; `data_header` is a framer-owned prefix emitted before it (AMF
/// `@setDataFrame`, FLV audio/video tag bytes). The reported message length
/// is the sum of both.
#[derive(Debug)]
pub struct OutgoingMessage {
    pub data_header: Option<Vec<u8>>,
    pub payload: Bytes,
    pub message_type_id: u8,
    pub message_stream_id: u32,
    pub timestamp: u32,
    /// Internal messages (protocol control, dialogue commands) are not
    /// reported back through the release notification.
    pub internal: bool,
    /// New transmit chunk size to latch once this message is fully on the
    /// wire, for SetChunkSize.
    pub next_chunk_size: Option<usize>,
}

impl OutgoingMessage {
    pub fn total_len(&self) -> usize {
        self.data_header.as_ref().map_or(0, |h| h.len()) + self.payload.len()
    }
}

/// A fully reassembled inbound message.
#[derive(Debug)]
pub struct ReceivedMessage {
    pub chunk_stream_id: Csid,
    pub message_type_id: u8,
    pub message_stream_id: u32,
    pub timestamp: u32,
    pub payload: BytesMut,
}

/// Completion record for one transmitted message: the payload goes back to
/// its owner unless the message was framer-internal.
#[derive(Debug)]
pub struct CompletedSend {
    pub chunk_stream_id: Csid,
    pub payload: Bytes,
    pub internal: bool,
}
