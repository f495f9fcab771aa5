use std::io;

use crate::message::RtmpMessageType;

pub mod errors;
pub mod reader;
pub mod writer;

use errors::{ProtocolControlMessageError, ProtocolControlMessageResult};
use utils::traits::reader::ReadRemainingFrom;

///! @see: 5.4.1. Set Chunk Size (1)
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |0|                     chunk size (31 bits)                    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, Clone, Copy)]
pub struct SetChunkSize {
    pub chunk_size: u32, // 31 bits
}

///! @see: 5.4.2. Abort Message (2)
/// Carries the csid whose partially assembled message the peer should drop.
#[derive(Debug, Clone, Copy)]
pub struct AbortMessage {
    pub chunk_stream_id: u32,
}

///! @see: 5.4.3. Acknowledgement (3)
/// Sequence number is the cumulative count of received bytes.
#[derive(Debug, Clone, Copy)]
pub struct Acknowledgement {
    pub sequence_number: u32,
}

///! @see: 5.4.4. Window Acknowledgement Size (5)
#[derive(Debug, Clone, Copy)]
pub struct WindowAckSize {
    pub size: u32,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetPeerBandwidthLimitType {
    // The peer SHOULD limit its output bandwidth to the indicated window size.
    Hard = 0,
    // The peer SHOULD limit its output bandwidth to the window indicated in
    // this message or the limit already in effect, whichever is smaller.
    Soft = 1,
    // If the previous limit type was Hard, treat this message as though it
    // was marked Hard, otherwise ignore it.
    Dynamic = 2,
}

impl TryFrom<u8> for SetPeerBandwidthLimitType {
    type Error = ProtocolControlMessageError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SetPeerBandwidthLimitType::Hard),
            1 => Ok(SetPeerBandwidthLimitType::Soft),
            2 => Ok(SetPeerBandwidthLimitType::Dynamic),
            _ => Err(ProtocolControlMessageError::InvalidMessage(format!(
                "unknown set peer bandwidth limit type: {}",
                value
            ))),
        }
    }
}

///! @see: 5.4.5. Set Peer Bandwidth (6)
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                  Acknowledgement Window size                  |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Limit Type   |
/// +-+-+-+-+-+-+-+-+
#[derive(Debug, Clone, Copy)]
pub struct SetPeerBandwidth {
    pub size: u32,
    pub limit_type: SetPeerBandwidthLimitType,
}

#[derive(Debug, Clone, Copy)]
pub enum ProtocolControlMessage {
    SetChunkSize(SetChunkSize),
    Abort(AbortMessage),
    Ack(Acknowledgement),
    WindowAckSize(WindowAckSize),
    SetPeerBandwidth(SetPeerBandwidth),
}

impl ProtocolControlMessage {
    pub fn message_type(&self) -> RtmpMessageType {
        match self {
            ProtocolControlMessage::SetChunkSize(_) => RtmpMessageType::SetChunkSize,
            ProtocolControlMessage::Abort(_) => RtmpMessageType::Abort,
            ProtocolControlMessage::Ack(_) => RtmpMessageType::Acknowledgement,
            ProtocolControlMessage::WindowAckSize(_) => RtmpMessageType::WindowAckSize,
            ProtocolControlMessage::SetPeerBandwidth(_) => RtmpMessageType::SetPeerBandwidth,
        }
    }

    pub fn read_from<R>(
        inner: R,
        message_type: RtmpMessageType,
    ) -> ProtocolControlMessageResult<ProtocolControlMessage>
    where
        R: io::Read,
    {
        Self::read_remaining_from(message_type, inner)
    }
}
