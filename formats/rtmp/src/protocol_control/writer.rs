use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use utils::traits::writer::WriteTo;

use super::{ProtocolControlMessage, errors::ProtocolControlMessageError};

impl<W: io::Write> WriteTo<W> for ProtocolControlMessage {
    type Error = ProtocolControlMessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        match self {
            ProtocolControlMessage::SetChunkSize(v) => {
                writer.write_u32::<BigEndian>(v.chunk_size & 0x7FFF_FFFF)?;
            }
            ProtocolControlMessage::Abort(v) => {
                writer.write_u32::<BigEndian>(v.chunk_stream_id)?;
            }
            ProtocolControlMessage::Ack(v) => {
                writer.write_u32::<BigEndian>(v.sequence_number)?;
            }
            ProtocolControlMessage::WindowAckSize(v) => {
                writer.write_u32::<BigEndian>(v.size)?;
            }
            ProtocolControlMessage::SetPeerBandwidth(v) => {
                writer.write_u32::<BigEndian>(v.size)?;
                writer.write_u8(v.limit_type as u8)?;
            }
        }
        Ok(())
    }
}
