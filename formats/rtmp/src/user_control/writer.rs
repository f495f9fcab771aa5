use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use utils::traits::writer::WriteTo;

use super::{UserControlEvent, errors::UserControlEventError};

impl<W: io::Write> WriteTo<W> for UserControlEvent {
    type Error = UserControlEventError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        writer.write_u16::<BigEndian>(self.event_type().into())?;
        match self {
            UserControlEvent::StreamBegin { stream_id }
            | UserControlEvent::StreamEof { stream_id }
            | UserControlEvent::StreamDry { stream_id }
            | UserControlEvent::StreamIsRecorded { stream_id } => {
                writer.write_u32::<BigEndian>(*stream_id)?;
            }
            UserControlEvent::SetBufferLength {
                stream_id,
                buffer_length,
            } => {
                writer.write_u32::<BigEndian>(*stream_id)?;
                writer.write_u32::<BigEndian>(*buffer_length)?;
            }
            UserControlEvent::PingRequest { timestamp }
            | UserControlEvent::PingResponse { timestamp } => {
                writer.write_u32::<BigEndian>(*timestamp)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use utils::traits::writer::WriteTo;

    use super::UserControlEvent;

    #[test]
    fn ping_response() {
        let mut buf = Vec::new();
        UserControlEvent::PingResponse { timestamp: 12345 }
            .write_to(&mut buf)
            .unwrap();
        assert_eq!(buf, [0x00, 0x07, 0x00, 0x00, 0x30, 0x39]);
    }
}
