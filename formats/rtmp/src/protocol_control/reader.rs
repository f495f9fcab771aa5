use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use utils::traits::reader::ReadRemainingFrom;

use crate::message::RtmpMessageType;

use super::{
    AbortMessage, Acknowledgement, ProtocolControlMessage, SetChunkSize, SetPeerBandwidth,
    SetPeerBandwidthLimitType, WindowAckSize,
    errors::ProtocolControlMessageError,
};

impl<R: io::Read> ReadRemainingFrom<RtmpMessageType, R> for ProtocolControlMessage {
    type Error = ProtocolControlMessageError;
    fn read_remaining_from(header: RtmpMessageType, mut reader: R) -> Result<Self, Self::Error> {
        match header {
            RtmpMessageType::SetChunkSize => {
                let chunk_size = reader.read_u32::<BigEndian>()? & 0x7FFF_FFFF;
                if chunk_size == 0 {
                    return Err(ProtocolControlMessageError::InvalidMessage(
                        "set chunk size of zero".to_string(),
                    ));
                }
                Ok(ProtocolControlMessage::SetChunkSize(SetChunkSize {
                    chunk_size,
                }))
            }
            RtmpMessageType::Abort => {
                let chunk_stream_id = reader.read_u32::<BigEndian>()?;
                Ok(ProtocolControlMessage::Abort(AbortMessage {
                    chunk_stream_id,
                }))
            }
            RtmpMessageType::Acknowledgement => {
                let sequence_number = reader.read_u32::<BigEndian>()?;
                Ok(ProtocolControlMessage::Ack(Acknowledgement {
                    sequence_number,
                }))
            }
            RtmpMessageType::WindowAckSize => {
                let size = reader.read_u32::<BigEndian>()?;
                Ok(ProtocolControlMessage::WindowAckSize(WindowAckSize {
                    size,
                }))
            }
            RtmpMessageType::SetPeerBandwidth => {
                let size = reader.read_u32::<BigEndian>()?;
                let limit_type = SetPeerBandwidthLimitType::try_from(reader.read_u8()?)?;
                Ok(ProtocolControlMessage::SetPeerBandwidth(SetPeerBandwidth {
                    size,
                    limit_type,
                }))
            }
            other => Err(ProtocolControlMessageError::NotProtocolControl(
                other.into(),
            )),
        }
    }
}
