pub mod errors;
pub mod reader;
pub mod writer;

use errors::UserControlEventError;

///! @see: 7.1.7. User Control Message Events
/// The publishing client answers PingRequest and otherwise only observes
/// these; StreamBegin arrives right after createStream succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserControlEvent {
    StreamBegin { stream_id: u32 },
    StreamEof { stream_id: u32 },
    StreamDry { stream_id: u32 },
    SetBufferLength { stream_id: u32, buffer_length: u32 },
    StreamIsRecorded { stream_id: u32 },
    PingRequest { timestamp: u32 },
    PingResponse { timestamp: u32 },
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserControlEventType {
    StreamBegin = 0,
    StreamEof = 1,
    StreamDry = 2,
    SetBufferLength = 3,
    StreamIsRecorded = 4,
    PingRequest = 6,
    PingResponse = 7,
}

impl From<UserControlEventType> for u16 {
    fn from(value: UserControlEventType) -> Self {
        value as u16
    }
}

impl TryFrom<u16> for UserControlEventType {
    type Error = UserControlEventError;
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(UserControlEventType::StreamBegin),
            1 => Ok(UserControlEventType::StreamEof),
            2 => Ok(UserControlEventType::StreamDry),
            3 => Ok(UserControlEventType::SetBufferLength),
            4 => Ok(UserControlEventType::StreamIsRecorded),
            6 => Ok(UserControlEventType::PingRequest),
            7 => Ok(UserControlEventType::PingResponse),
            _ => Err(UserControlEventError::UnknownEventType(value)),
        }
    }
}

impl UserControlEvent {
    pub fn event_type(&self) -> UserControlEventType {
        match self {
            UserControlEvent::StreamBegin { .. } => UserControlEventType::StreamBegin,
            UserControlEvent::StreamEof { .. } => UserControlEventType::StreamEof,
            UserControlEvent::StreamDry { .. } => UserControlEventType::StreamDry,
            UserControlEvent::SetBufferLength { .. } => UserControlEventType::SetBufferLength,
            UserControlEvent::StreamIsRecorded { .. } => UserControlEventType::StreamIsRecorded,
            UserControlEvent::PingRequest { .. } => UserControlEventType::PingRequest,
            UserControlEvent::PingResponse { .. } => UserControlEventType::PingResponse,
        }
    }
}
