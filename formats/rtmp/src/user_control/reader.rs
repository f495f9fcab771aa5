use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use utils::traits::reader::ReadFrom;

use super::{UserControlEvent, UserControlEventType, errors::UserControlEventError};

impl<R: io::Read> ReadFrom<R> for UserControlEvent {
    type Error = UserControlEventError;
    fn read_from(mut reader: R) -> Result<Self, Self::Error> {
        let event_type = UserControlEventType::try_from(reader.read_u16::<BigEndian>()?)?;
        let event = match event_type {
            UserControlEventType::StreamBegin => UserControlEvent::StreamBegin {
                stream_id: reader.read_u32::<BigEndian>()?,
            },
            UserControlEventType::StreamEof => UserControlEvent::StreamEof {
                stream_id: reader.read_u32::<BigEndian>()?,
            },
            UserControlEventType::StreamDry => UserControlEvent::StreamDry {
                stream_id: reader.read_u32::<BigEndian>()?,
            },
            UserControlEventType::SetBufferLength => UserControlEvent::SetBufferLength {
                stream_id: reader.read_u32::<BigEndian>()?,
                buffer_length: reader.read_u32::<BigEndian>()?,
            },
            UserControlEventType::StreamIsRecorded => UserControlEvent::StreamIsRecorded {
                stream_id: reader.read_u32::<BigEndian>()?,
            },
            UserControlEventType::PingRequest => UserControlEvent::PingRequest {
                timestamp: reader.read_u32::<BigEndian>()?,
            },
            UserControlEventType::PingResponse => UserControlEvent::PingResponse {
                timestamp: reader.read_u32::<BigEndian>()?,
            },
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use utils::traits::reader::ReadFrom;

    use super::{UserControlEvent, UserControlEventError};

    #[test]
    fn ping_request() {
        let bytes = [0x00, 0x06, 0x00, 0x00, 0x30, 0x39];
        assert_eq!(
            UserControlEvent::read_from(&bytes[..]).unwrap(),
            UserControlEvent::PingRequest { timestamp: 12345 }
        );
    }

    #[test]
    fn stream_begin() {
        let bytes = [0x00, 0x00, 0x00, 0x00, 0x00, 0x01];
        assert_eq!(
            UserControlEvent::read_from(&bytes[..]).unwrap(),
            UserControlEvent::StreamBegin { stream_id: 1 }
        );
    }

    #[test]
    fn unknown_event_type() {
        let bytes = [0x00, 0x09, 0x00, 0x00, 0x00, 0x00];
        assert!(matches!(
            UserControlEvent::read_from(&bytes[..]).unwrap_err(),
            UserControlEventError::UnknownEventType(9)
        ));
    }
}
