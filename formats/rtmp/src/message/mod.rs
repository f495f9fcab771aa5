use crate::chunk::errors::ChunkMessageError;

///! @see: 5.4. Protocol Control Messages / 7.1. Types of Messages
/// One byte of message type id selects how a completed message payload is
/// interpreted. Values 1-6 are connection-level control, the rest carry
/// user data.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtmpMessageType {
    SetChunkSize = 1,
    Abort = 2,
    Acknowledgement = 3,
    UserControl = 4,
    WindowAckSize = 5,
    SetPeerBandwidth = 6,
    Audio = 8,
    Video = 9,
    AMF0Data = 18,
    AMF0Command = 20,
}

impl From<RtmpMessageType> for u8 {
    fn from(value: RtmpMessageType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for RtmpMessageType {
    type Error = ChunkMessageError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RtmpMessageType::SetChunkSize),
            2 => Ok(RtmpMessageType::Abort),
            3 => Ok(RtmpMessageType::Acknowledgement),
            4 => Ok(RtmpMessageType::UserControl),
            5 => Ok(RtmpMessageType::WindowAckSize),
            6 => Ok(RtmpMessageType::SetPeerBandwidth),
            8 => Ok(RtmpMessageType::Audio),
            9 => Ok(RtmpMessageType::Video),
            18 => Ok(RtmpMessageType::AMF0Data),
            20 => Ok(RtmpMessageType::AMF0Command),
            _ => Err(ChunkMessageError::UnknownMessageType(value)),
        }
    }
}

impl RtmpMessageType {
    /// Control messages travel on chunk stream 2 and message stream 0.
    pub fn is_protocol_control(&self) -> bool {
        matches!(
            self,
            RtmpMessageType::SetChunkSize
                | RtmpMessageType::Abort
                | RtmpMessageType::Acknowledgement
                | RtmpMessageType::WindowAckSize
                | RtmpMessageType::SetPeerBandwidth
        )
    }
}
