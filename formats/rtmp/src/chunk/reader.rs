use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::{
    cmp::min,
    collections::HashMap,
    io::{Cursor, Read},
};
use tokio_util::bytes::BytesMut;

use super::{
    Csid, MessageHeaderType, ReceivedMessage,
    consts::{INITIAL_CHUNK_SIZE, MAX_TIMESTAMP, csid},
    errors::ChunkMessageResult,
};

#[derive(Debug, Default)]
struct RxChannel {
    accumulator: BytesMut,
    message_length: usize,
    message_type_id: u8,
    message_stream_id: u32,
    timestamp: u32,
    timestamp_delta: u32,
}

/// Parsed message-header fields of a single inbound chunk, before they are
/// committed to the channel state.
#[derive(Debug)]
enum ParsedHeader {
    Type0 {
        timestamp: u32,
        message_length: usize,
        message_type_id: u8,
        message_stream_id: u32,
    },
    Type1 {
        timestamp_delta: u32,
        message_length: usize,
        message_type_id: u8,
    },
    Type2 {
        timestamp_delta: u32,
    },
    Type3,
}

/// Receive side of the chunk stream: reassembles interleaved chunks back
/// into messages. Parsing is incremental: when the input holds less than
/// one whole chunk the cursor is rewound and nothing is consumed, so the
/// caller can retry once more bytes arrive.
#[derive(Debug)]
pub struct ChunkReader {
    channels: HashMap<Csid, RxChannel>,
    chunk_size: usize,
    total_bytes: u64,
    bytes_since_ack: u64,
}

impl ChunkReader {
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
            chunk_size: INITIAL_CHUNK_SIZE,
            total_bytes: 0,
            bytes_since_ack: 0,
        }
    }

    /// Applies a peer SetChunkSize; effective for every following chunk.
    pub fn set_chunk_size(&mut self, size: usize) {
        if size > 0 {
            self.chunk_size = size;
        }
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[inline]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// An Ack is due once half the window has accumulated since the last
    /// one; it carries the cumulative byte count.
    pub fn ack_due(&self, window_ack_size: u32) -> Option<u32> {
        if window_ack_size > 0 && self.bytes_since_ack * 2 >= window_ack_size as u64 {
            Some(self.total_bytes as u32)
        } else {
            None
        }
    }

    pub fn mark_acknowledged(&mut self) {
        self.bytes_since_ack = 0;
    }

    /// Drops a partially assembled message, for a peer Abort. A csid of 2
    /// would abort the control stream the Abort itself arrived on, so it is
    /// ignored.
    pub fn abort(&mut self, chunk_stream_id: Csid) {
        if chunk_stream_id == csid::PROTOCOL_CONTROL {
            return;
        }
        if let Some(channel) = self.channels.get_mut(&chunk_stream_id) {
            channel.accumulator.clear();
        }
    }

    /// Consumes at most one chunk from the cursor. `Ok(Some)` when that
    /// chunk completed a message; `Ok(None)` either because the chunk only
    /// extended a partial message (cursor advanced) or because the input is
    /// short of one parse step (cursor untouched — feed more bytes).
    pub fn read(&mut self, cursor: &mut Cursor<&[u8]>) -> ChunkMessageResult<Option<ReceivedMessage>> {
        let start = cursor.position();

        macro_rules! need {
            ($n:expr) => {
                if (cursor.get_ref().len() as u64 - cursor.position()) < $n as u64 {
                    cursor.set_position(start);
                    return Ok(None);
                }
            };
        }

        need!(1);
        let first = cursor.read_u8()?;
        let fmt = first >> 6;
        let chunk_stream_id: Csid = match first & 0x3F {
            0 => {
                need!(1);
                cursor.read_u8()? as Csid + 64
            }
            1 => {
                need!(2);
                let low = cursor.read_u8()? as Csid;
                let high = cursor.read_u8()? as Csid;
                low + high * 256 + 64
            }
            inline => inline as Csid,
        };

        let header_type = MessageHeaderType::try_from(fmt)?;
        need!(header_type.encoded_len());
        let parsed = match header_type {
            MessageHeaderType::Type0 => {
                let mut timestamp = cursor.read_u24::<BigEndian>()?;
                let message_length = cursor.read_u24::<BigEndian>()? as usize;
                let message_type_id = cursor.read_u8()?;
                let message_stream_id = cursor.read_u32::<LittleEndian>()?;
                if timestamp == MAX_TIMESTAMP {
                    need!(4);
                    timestamp = cursor.read_u32::<BigEndian>()?;
                }
                ParsedHeader::Type0 {
                    timestamp,
                    message_length,
                    message_type_id,
                    message_stream_id,
                }
            }
            MessageHeaderType::Type1 => {
                let mut timestamp_delta = cursor.read_u24::<BigEndian>()?;
                let message_length = cursor.read_u24::<BigEndian>()? as usize;
                let message_type_id = cursor.read_u8()?;
                if timestamp_delta == MAX_TIMESTAMP {
                    need!(4);
                    timestamp_delta = cursor.read_u32::<BigEndian>()?;
                }
                ParsedHeader::Type1 {
                    timestamp_delta,
                    message_length,
                    message_type_id,
                }
            }
            MessageHeaderType::Type2 => {
                let mut timestamp_delta = cursor.read_u24::<BigEndian>()?;
                if timestamp_delta == MAX_TIMESTAMP {
                    need!(4);
                    timestamp_delta = cursor.read_u32::<BigEndian>()?;
                }
                ParsedHeader::Type2 { timestamp_delta }
            }
            MessageHeaderType::Type3 => ParsedHeader::Type3,
        };

        if !self.channels.contains_key(&chunk_stream_id) {
            if fmt != 0 {
                tracing::error!(
                    "chunk stream {} opened with header type {}, expected a full header",
                    chunk_stream_id,
                    fmt
                );
            }
            self.channels.insert(chunk_stream_id, RxChannel::default());
        }
        let channel = self
            .channels
            .get_mut(&chunk_stream_id)
            .expect("channel just ensured");

        // Everything below first works out how many payload bytes this
        // chunk must carry, without touching channel state: a short input
        // has to leave the channel exactly as it was.
        let in_progress = !channel.accumulator.is_empty();
        let restart = in_progress && Self::disagrees(channel, &parsed);
        let starts_message = !in_progress || restart;

        let message_length = match &parsed {
            ParsedHeader::Type0 { message_length, .. }
            | ParsedHeader::Type1 { message_length, .. } => *message_length,
            _ => channel.message_length,
        };
        let already = if starts_message {
            0
        } else {
            channel.accumulator.len()
        };
        let chunk_bytes = min(self.chunk_size, message_length - already);
        need!(chunk_bytes);

        // Commit the header to the channel state. The timestamp delta of
        // types 1/2/3 only applies when a new message begins.
        if restart {
            tracing::debug!(
                "chunk stream {}: header disagrees with partial message, discarding {} bytes",
                chunk_stream_id,
                channel.accumulator.len()
            );
            channel.accumulator.clear();
        }
        match parsed {
            ParsedHeader::Type0 {
                timestamp,
                message_length,
                message_type_id,
                message_stream_id,
            } => {
                channel.timestamp = timestamp;
                channel.timestamp_delta = 0;
                channel.message_length = message_length;
                channel.message_type_id = message_type_id;
                channel.message_stream_id = message_stream_id;
            }
            ParsedHeader::Type1 {
                timestamp_delta,
                message_length,
                message_type_id,
            } => {
                channel.timestamp_delta = timestamp_delta;
                channel.message_length = message_length;
                channel.message_type_id = message_type_id;
                if starts_message {
                    channel.timestamp = channel.timestamp.wrapping_add(timestamp_delta);
                }
            }
            ParsedHeader::Type2 { timestamp_delta } => {
                channel.timestamp_delta = timestamp_delta;
                if starts_message {
                    channel.timestamp = channel.timestamp.wrapping_add(timestamp_delta);
                }
            }
            ParsedHeader::Type3 => {
                if starts_message {
                    channel.timestamp = channel.timestamp.wrapping_add(channel.timestamp_delta);
                }
            }
        }

        if channel.accumulator.capacity() < channel.message_length {
            channel
                .accumulator
                .reserve(channel.message_length - channel.accumulator.len());
        }
        let mut data = vec![0u8; chunk_bytes];
        cursor.read_exact(&mut data)?;
        channel.accumulator.extend_from_slice(&data);

        let consumed = cursor.position() - start;
        self.total_bytes = self.total_bytes.wrapping_add(consumed);
        self.bytes_since_ack += consumed;

        if channel.accumulator.len() < channel.message_length {
            return Ok(None);
        }

        let payload = std::mem::take(&mut channel.accumulator);
        Ok(Some(ReceivedMessage {
            chunk_stream_id,
            message_type_id: channel.message_type_id,
            message_stream_id: channel.message_stream_id,
            timestamp: channel.timestamp,
            payload,
        }))
    }

    /// §4.2.5 step 6: a header carrying values that contradict the message
    /// being assembled invalidates the partial.
    fn disagrees(channel: &RxChannel, parsed: &ParsedHeader) -> bool {
        match parsed {
            ParsedHeader::Type0 {
                timestamp,
                message_length,
                message_type_id,
                message_stream_id,
            } => {
                *timestamp != channel.timestamp
                    || *message_length != channel.message_length
                    || *message_type_id != channel.message_type_id
                    || *message_stream_id != channel.message_stream_id
            }
            ParsedHeader::Type1 {
                timestamp_delta,
                message_length,
                message_type_id,
            } => {
                *timestamp_delta != channel.timestamp_delta
                    || *message_length != channel.message_length
                    || *message_type_id != channel.message_type_id
            }
            ParsedHeader::Type2 { timestamp_delta } => {
                *timestamp_delta != channel.timestamp_delta
            }
            ParsedHeader::Type3 => false,
        }
    }
}

impl Default for ChunkReader {
    fn default() -> Self {
        Self::new()
    }
}
