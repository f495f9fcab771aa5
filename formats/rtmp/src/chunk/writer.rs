use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use std::{cmp::min, collections::VecDeque, io};

use tokio_util::bytes::Bytes;
use utils::traits::writer::WriteTo;

use crate::{
    message::RtmpMessageType,
    protocol_control::{
        AbortMessage, Acknowledgement, ProtocolControlMessage, SetChunkSize, WindowAckSize,
    },
    user_control::UserControlEvent,
};

use super::{
    ChunkBasicHeader, CompletedSend, Csid, MessageHeaderType, OutgoingMessage,
    consts::{DEFAULT_QUEUE_CAPACITY, INITIAL_CHUNK_SIZE, MAX_CHUNK_HEADER_SIZE, MAX_TIMESTAMP, csid},
    errors::{ChunkMessageError, ChunkMessageResult},
};

#[derive(Debug)]
struct PreviousHeader {
    message_type_id: u8,
    message_stream_id: u32,
    message_length: usize,
    timestamp: u32,
    timestamp_delta: u32,
}

#[derive(Debug)]
struct TxChannel {
    csid: Csid,
    queue: VecDeque<OutgoingMessage>,
    previous: Option<PreviousHeader>,

    // progress of the message at the queue front
    message_offset: usize,
    // current chunk: header scratch plus a data window of chunk_len bytes
    header: Vec<u8>,
    header_written: usize,
    chunk_len: usize,
    chunk_written: usize,
    chunk_prepared: bool,
}

impl TxChannel {
    fn new(csid: Csid) -> Self {
        Self {
            csid,
            queue: VecDeque::with_capacity(DEFAULT_QUEUE_CAPACITY),
            previous: None,
            message_offset: 0,
            header: Vec::with_capacity(MAX_CHUNK_HEADER_SIZE),
            header_written: 0,
            chunk_len: 0,
            chunk_written: 0,
            chunk_prepared: false,
        }
    }
}

/// Transmit side of the chunk stream: per-csid bounded queues, compressed
/// header selection, and chunk emission that survives partial writes.
///
/// Channels are visited in insertion order and a begun message is finished
/// (all its chunks) before another channel is scheduled. The partial-write
/// offset lives inside the current chunk; `current_slices`/`consume` let the
/// caller push the three chunk segments (header, data header, payload) into
/// any sink that may accept fewer bytes than offered.
#[derive(Debug)]
pub struct ChunkWriter {
    channels: Vec<TxChannel>,
    chunk_size: usize,
    pending_chunk_size: Option<usize>,
    in_progress: Option<Csid>,
    queue_capacity: usize,
    scan_from: usize,
}

impl ChunkWriter {
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self {
            channels: Vec::new(),
            chunk_size: INITIAL_CHUNK_SIZE,
            pending_chunk_size: None,
            in_progress: None,
            queue_capacity,
            scan_from: 0,
        }
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Adopts a chunk size announced by the peer. Takes effect at the next
    /// message boundary, never inside a chunk in flight.
    pub fn set_chunk_size(&mut self, size: usize) {
        if size == 0 {
            return;
        }
        if self.in_progress.is_none() {
            self.chunk_size = size;
        } else {
            self.pending_chunk_size = Some(size);
        }
    }

    /// Queues a message. Returns how many messages were already waiting on
    /// the same channel (0 = goes out with the next write), or `QueueFull`
    /// when the channel ring is saturated.
    pub fn enqueue(&mut self, csid: Csid, message: OutgoingMessage) -> ChunkMessageResult<usize> {
        // validates the csid range before the channel is created
        ChunkBasicHeader::new(0, csid)?;

        let capacity = self.queue_capacity;
        let channel = self.channel_mut(csid);
        if channel.queue.len() >= capacity {
            return Err(ChunkMessageError::QueueFull { csid });
        }
        let ahead = channel.queue.len();
        channel.queue.push_back(message);
        Ok(ahead)
    }

    pub fn has_pending(&self) -> bool {
        self.channels.iter().any(|c| !c.queue.is_empty())
    }

    /// The csid whose chunk is partially on the wire, if any.
    pub fn in_progress(&self) -> Option<Csid> {
        self.in_progress
    }

    fn channel_mut(&mut self, csid: Csid) -> &mut TxChannel {
        if let Some(index) = self.channels.iter().position(|c| c.csid == csid) {
            return &mut self.channels[index];
        }
        self.channels.push(TxChannel::new(csid));
        self.channels.last_mut().expect("just pushed")
    }

    /// Index of the channel to write next: a partially-sent channel always
    /// resumes first, otherwise the scan continues in insertion order from
    /// the last serviced channel.
    fn schedule(&self) -> Option<usize> {
        if let Some(csid) = self.in_progress {
            return self.channels.iter().position(|c| c.csid == csid);
        }
        let n = self.channels.len();
        (0..n)
            .map(|offset| (self.scan_from + offset) % n)
            .find(|&index| !self.channels[index].queue.is_empty())
    }

    /// The gathered-write segments of the current chunk: header remainder,
    /// data-header remainder, payload remainder. `None` when all queues are
    /// drained. Prepares the next chunk lazily.
    pub fn current_slices(&mut self) -> ChunkMessageResult<Option<[&[u8]; 3]>> {
        let Some(index) = self.schedule() else {
            return Ok(None);
        };
        if !self.channels[index].chunk_prepared {
            self.prepare_chunk(index)?;
        }

        let channel = &self.channels[index];
        let message = channel.queue.front().expect("scheduled channel has a message");

        let header_rem = &channel.header[channel.header_written..];

        let data_header: &[u8] = message.data_header.as_deref().unwrap_or(&[]);
        let pos = channel.message_offset + channel.chunk_written;
        let end = channel.message_offset + channel.chunk_len;

        let dh_rem = if pos < data_header.len() {
            &data_header[pos..min(end, data_header.len())]
        } else {
            &[]
        };
        let payload_rem = if end > data_header.len() {
            let start = pos.max(data_header.len()) - data_header.len();
            &message.payload[start..end - data_header.len()]
        } else {
            &[]
        };

        Ok(Some([header_rem, dh_rem, payload_rem]))
    }

    /// Advances the current chunk by `written` wire bytes (as accepted by
    /// the sink). Returns the completion record when this finishes the
    /// message at the queue front.
    pub fn consume(&mut self, written: usize) -> Option<CompletedSend> {
        let index = self.schedule()?;
        let channel = &mut self.channels[index];
        debug_assert!(channel.chunk_prepared);

        let mut remaining = written;
        let header_take = min(remaining, channel.header.len() - channel.header_written);
        channel.header_written += header_take;
        remaining -= header_take;

        let data_take = min(remaining, channel.chunk_len - channel.chunk_written);
        channel.chunk_written += data_take;
        remaining -= data_take;
        debug_assert_eq!(remaining, 0, "consumed past the current chunk");

        let header_done = channel.header_written == channel.header.len();
        let chunk_done = header_done && channel.chunk_written == channel.chunk_len;
        if !chunk_done {
            self.in_progress = Some(channel.csid);
            return None;
        }

        channel.message_offset += channel.chunk_len;
        channel.chunk_written = 0;
        channel.header.clear();
        channel.header_written = 0;
        channel.chunk_prepared = false;

        let total = channel
            .queue
            .front()
            .expect("scheduled channel has a message")
            .total_len();
        if channel.message_offset < total {
            // more chunks of the same message follow
            self.in_progress = Some(channel.csid);
            return None;
        }

        let message = channel.queue.pop_front().expect("message present");
        channel.message_offset = 0;
        let csid = channel.csid;
        self.in_progress = None;
        self.scan_from = (index + 1) % self.channels.len();

        if let Some(size) = message.next_chunk_size {
            // message boundary, safe to latch
            self.chunk_size = size;
            self.pending_chunk_size = None;
        }

        Some(CompletedSend {
            chunk_stream_id: csid,
            payload: message.payload,
            internal: message.internal,
        })
    }

    fn prepare_chunk(&mut self, index: usize) -> ChunkMessageResult<()> {
        let starting_message =
            self.channels[index].message_offset == 0 && self.in_progress.is_none();
        if starting_message {
            if let Some(size) = self.pending_chunk_size.take() {
                self.chunk_size = size;
            }
        }

        let chunk_size = self.chunk_size;
        let channel = &mut self.channels[index];
        let message = channel.queue.front().expect("scheduled channel has a message");
        let total = message.total_len();

        channel.header.clear();
        channel.header_written = 0;
        channel.chunk_written = 0;

        if channel.message_offset == 0 {
            let header_type = Self::pick_header_type(channel.previous.as_ref(), message, total);
            Self::encode_header(channel, header_type, total)?;
            Self::store_previous(channel, header_type, total);
        } else {
            // continuation chunks always use a bare type 3 basic header
            Self::encode_basic_header(
                &mut channel.header,
                MessageHeaderType::Type3,
                channel.csid,
            )?;
        }

        channel.chunk_len = min(chunk_size, total - channel.message_offset);
        channel.chunk_prepared = true;
        Ok(())
    }

    /// §5.3.1.2 header compression, conservative variant: a full header on
    /// any change of message type or stream, or when the timestamp goes
    /// backwards; the zero timestamp doubles as the "absolute" marker for
    /// types 1 and 2; type 3 only once the delta repeats itself.
    fn pick_header_type(
        previous: Option<&PreviousHeader>,
        message: &OutgoingMessage,
        total: usize,
    ) -> MessageHeaderType {
        let Some(prev) = previous else {
            return MessageHeaderType::Type0;
        };
        if message.message_type_id != prev.message_type_id
            || message.message_stream_id != prev.message_stream_id
            || message.timestamp < prev.timestamp
        {
            return MessageHeaderType::Type0;
        }
        let delta = message.timestamp - prev.timestamp;
        if total == prev.message_length {
            if delta == prev.timestamp_delta {
                return MessageHeaderType::Type3;
            }
            if message.timestamp == 0 {
                return MessageHeaderType::Type2;
            }
        } else if message.timestamp == 0 {
            return MessageHeaderType::Type1;
        }
        MessageHeaderType::Type0
    }

    fn store_previous(channel: &mut TxChannel, header_type: MessageHeaderType, total: usize) {
        let message = channel.queue.front().expect("message present");
        let delta = match header_type {
            MessageHeaderType::Type0 => 0,
            MessageHeaderType::Type3 => channel
                .previous
                .as_ref()
                .map_or(0, |p| p.timestamp_delta),
            _ => {
                message.timestamp
                    - channel.previous.as_ref().map_or(0, |p| p.timestamp)
            }
        };
        channel.previous = Some(PreviousHeader {
            message_type_id: message.message_type_id,
            message_stream_id: message.message_stream_id,
            message_length: total,
            timestamp: message.timestamp,
            timestamp_delta: delta,
        });
    }

    fn encode_basic_header(
        out: &mut Vec<u8>,
        header_type: MessageHeaderType,
        chunk_stream_id: Csid,
    ) -> ChunkMessageResult<()> {
        let basic = ChunkBasicHeader::new(header_type as u8, chunk_stream_id)?;
        let fmt_bits = basic.fmt << 6;
        match basic.encoded_len() {
            1 => out.write_u8(fmt_bits | chunk_stream_id as u8)?,
            2 => {
                out.write_u8(fmt_bits)?;
                out.write_u8((chunk_stream_id - 64) as u8)?;
            }
            _ => {
                out.write_u8(fmt_bits | 1)?;
                out.write_u16::<LittleEndian>((chunk_stream_id - 64) as u16)?;
            }
        }
        Ok(())
    }

    fn encode_header(
        channel: &mut TxChannel,
        header_type: MessageHeaderType,
        total: usize,
    ) -> ChunkMessageResult<()> {
        let csid = channel.csid;
        let message = channel.queue.front().expect("message present");
        let (timestamp, message_type_id, message_stream_id) = (
            message.timestamp,
            message.message_type_id,
            message.message_stream_id,
        );
        let previous_timestamp = channel.previous.as_ref().map_or(0, |p| p.timestamp);

        let mut header = std::mem::take(&mut channel.header);
        Self::encode_basic_header(&mut header, header_type, csid)?;

        // types 1 and 2 carry the delta, type 0 the absolute value
        let field_value = match header_type {
            MessageHeaderType::Type0 => timestamp,
            _ => timestamp - previous_timestamp,
        };
        let extended = field_value > MAX_TIMESTAMP;
        let field = if extended { MAX_TIMESTAMP } else { field_value };

        match header_type {
            MessageHeaderType::Type0 => {
                header.write_u24::<BigEndian>(field)?;
                header.write_u24::<BigEndian>(total as u32)?;
                header.write_u8(message_type_id)?;
                header.write_u32::<LittleEndian>(message_stream_id)?;
            }
            MessageHeaderType::Type1 => {
                header.write_u24::<BigEndian>(field)?;
                header.write_u24::<BigEndian>(total as u32)?;
                header.write_u8(message_type_id)?;
            }
            MessageHeaderType::Type2 => {
                header.write_u24::<BigEndian>(field)?;
            }
            MessageHeaderType::Type3 => {}
        }
        if extended && header_type != MessageHeaderType::Type3 {
            header.write_u32::<BigEndian>(field_value)?;
        }

        channel.header = header;
        Ok(())
    }

    /// Drains as much as the sink accepts, tolerating short writes. Stops
    /// on `WouldBlock` or a zero-byte write; the partial chunk resumes on
    /// the next call.
    pub fn write_some<W: io::Write>(
        &mut self,
        io: &mut W,
    ) -> ChunkMessageResult<Vec<CompletedSend>> {
        let mut completed = Vec::new();
        loop {
            let Some(slices) = self.current_slices()? else {
                break;
            };
            let offered: usize = slices.iter().map(|s| s.len()).sum();
            let io_slices = [
                io::IoSlice::new(slices[0]),
                io::IoSlice::new(slices[1]),
                io::IoSlice::new(slices[2]),
            ];
            let written = match io.write_vectored(&io_slices) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) => return Err(err.into()),
            };
            if let Some(done) = self.consume(written) {
                completed.push(done);
            }
            if written < offered {
                break;
            }
        }
        Ok(completed)
    }

    /// Tears the queues down, handing every pending payload back so the
    /// owner can be notified on disconnect.
    pub fn release_pending(&mut self) -> Vec<CompletedSend> {
        let mut released = Vec::new();
        for channel in &mut self.channels {
            channel.message_offset = 0;
            channel.chunk_written = 0;
            channel.header.clear();
            channel.header_written = 0;
            channel.chunk_prepared = false;
            while let Some(message) = channel.queue.pop_front() {
                released.push(CompletedSend {
                    chunk_stream_id: channel.csid,
                    payload: message.payload,
                    internal: message.internal,
                });
            }
        }
        self.in_progress = None;
        self.pending_chunk_size = None;
        released
    }

    // protocol control conveniences, all on csid 2 / message stream 0

    fn enqueue_protocol_control(
        &mut self,
        message: ProtocolControlMessage,
        next_chunk_size: Option<usize>,
    ) -> ChunkMessageResult<()> {
        let mut payload = Vec::new();
        message.write_to(&mut payload)?;
        self.enqueue(
            csid::PROTOCOL_CONTROL,
            OutgoingMessage {
                data_header: None,
                payload: Bytes::from(payload),
                message_type_id: message.message_type().into(),
                message_stream_id: 0,
                timestamp: 0,
                internal: true,
                next_chunk_size,
            },
        )?;
        Ok(())
    }

    /// Announces a new transmit chunk size; latched once the announcement
    /// itself is on the wire.
    pub fn send_set_chunk_size(&mut self, chunk_size: usize) -> ChunkMessageResult<()> {
        self.enqueue_protocol_control(
            ProtocolControlMessage::SetChunkSize(SetChunkSize {
                chunk_size: chunk_size as u32 & 0x7FFF_FFFF,
            }),
            Some(chunk_size),
        )
    }

    pub fn send_acknowledgement(&mut self, sequence_number: u32) -> ChunkMessageResult<()> {
        self.enqueue_protocol_control(
            ProtocolControlMessage::Ack(Acknowledgement { sequence_number }),
            None,
        )
    }

    pub fn send_window_ack_size(&mut self, size: u32) -> ChunkMessageResult<()> {
        self.enqueue_protocol_control(
            ProtocolControlMessage::WindowAckSize(WindowAckSize { size }),
            None,
        )
    }

    pub fn send_abort(&mut self, chunk_stream_id: u32) -> ChunkMessageResult<()> {
        self.enqueue_protocol_control(
            ProtocolControlMessage::Abort(AbortMessage { chunk_stream_id }),
            None,
        )
    }

    pub fn send_user_control(&mut self, event: UserControlEvent) -> ChunkMessageResult<()> {
        let mut payload = Vec::new();
        event.write_to(&mut payload)?;
        self.enqueue(
            csid::PROTOCOL_CONTROL,
            OutgoingMessage {
                data_header: None,
                payload: Bytes::from(payload),
                message_type_id: RtmpMessageType::UserControl.into(),
                message_stream_id: 0,
                timestamp: 0,
                internal: true,
                next_chunk_size: None,
            },
        )?;
        Ok(())
    }
}

impl Default for ChunkWriter {
    fn default() -> Self {
        Self::new()
    }
}
