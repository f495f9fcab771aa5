use std::{cmp::min, io, io::Cursor};

use tokio_util::bytes::Bytes;

use crate::message::RtmpMessageType;

use super::{
    OutgoingMessage, ReceivedMessage,
    errors::ChunkMessageError,
    reader::ChunkReader,
    writer::ChunkWriter,
};

fn media_message(
    message_type_id: u8,
    message_stream_id: u32,
    timestamp: u32,
    payload: Vec<u8>,
) -> OutgoingMessage {
    OutgoingMessage {
        data_header: None,
        payload: Bytes::from(payload),
        message_type_id,
        message_stream_id,
        timestamp,
        internal: false,
        next_chunk_size: None,
    }
}

/// An io::Write that accepts at most `cap` bytes per call, to model a
/// socket whose send buffer keeps filling up.
struct ShortWriter {
    out: Vec<u8>,
    cap: usize,
}

impl io::Write for ShortWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = min(self.cap, buf.len());
        self.out.extend_from_slice(&buf[..n]);
        Ok(n)
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn drain(writer: &mut ChunkWriter) -> Vec<u8> {
    let mut out = Vec::new();
    writer.write_some(&mut out).unwrap();
    assert!(!writer.has_pending());
    out
}

fn decode_all(reader: &mut ChunkReader, bytes: &[u8]) -> Vec<ReceivedMessage> {
    let mut cursor = Cursor::new(bytes);
    let mut messages = Vec::new();
    loop {
        let before = cursor.position();
        match reader.read(&mut cursor).unwrap() {
            Some(message) => messages.push(message),
            None => {
                if cursor.position() == before {
                    break;
                }
            }
        }
    }
    assert_eq!(cursor.position(), bytes.len() as u64, "trailing bytes");
    messages
}

#[test]
fn header_types_follow_the_compression_rules() {
    let mut writer = ChunkWriter::new();
    // (mtid, msid, ts, len) -> expected header type
    let sequence: &[(u8, u32, u32, usize, u8)] = &[
        (9, 1, 0, 10, 0),  // first message on the channel
        (9, 1, 0, 20, 1),  // length changed at the zero timestamp
        (9, 1, 0, 20, 3),  // delta repeats (0 == 0)
        (9, 1, 40, 20, 0), // non-zero timestamp with a fresh delta
        (8, 1, 40, 20, 0), // message type changed
        (8, 1, 20, 20, 0), // timestamp going backwards
    ];
    for (mtid, msid, ts, len, _) in sequence {
        writer
            .enqueue(4, media_message(*mtid, *msid, *ts, vec![0xAB; *len]))
            .unwrap();
    }
    let bytes = drain(&mut writer);

    // walk the emission, one single-chunk message at a time
    let mut pos = 0;
    for (index, (_, _, _, len, expected_fmt)) in sequence.iter().enumerate() {
        let fmt = bytes[pos] >> 6;
        assert_eq!(fmt, *expected_fmt, "message {} header type", index);
        let header_len = match fmt {
            0 => 11,
            1 => 7,
            2 => 3,
            _ => 0,
        };
        pos += 1 + header_len + len;
    }
    assert_eq!(pos, bytes.len());

    // a peer chunk reader reproduces the original sequence
    let mut reader = ChunkReader::new();
    let messages = decode_all(&mut reader, &bytes);
    assert_eq!(messages.len(), sequence.len());
    for (message, (mtid, msid, ts, len, _)) in messages.iter().zip(sequence) {
        assert_eq!(message.message_type_id, *mtid);
        assert_eq!(message.message_stream_id, *msid);
        assert_eq!(message.timestamp, *ts);
        assert_eq!(message.payload.len(), *len);
    }
}

#[test]
fn chunking_splits_and_reassembles() {
    let payload: Vec<u8> = (0..300u32).map(|i| (i % 251) as u8).collect();
    let mut writer = ChunkWriter::new();
    writer
        .enqueue(4, media_message(9, 1, 0, payload.clone()))
        .unwrap();
    let bytes = drain(&mut writer);

    // ceil(300 / 128) = 3 chunks: 12 + 128, 1 + 128, 1 + 44
    assert_eq!(bytes.len(), (1 + 11 + 128) + (1 + 128) + (1 + 44));
    assert_eq!(bytes[0] >> 6, 0);
    assert_eq!(bytes[140] >> 6, 3);
    assert_eq!(bytes[140] & 0x3F, 4);
    assert_eq!(bytes[269] >> 6, 3);

    let mut data = Vec::new();
    data.extend_from_slice(&bytes[12..140]);
    data.extend_from_slice(&bytes[141..269]);
    data.extend_from_slice(&bytes[270..]);
    assert_eq!(data, payload);

    let mut reader = ChunkReader::new();
    let messages = decode_all(&mut reader, &bytes);
    assert_eq!(messages.len(), 1);
    assert_eq!(&messages[0].payload[..], &payload[..]);
}

#[test]
fn data_header_counts_into_the_message_length() {
    let mut writer = ChunkWriter::new();
    writer
        .enqueue(
            4,
            OutgoingMessage {
                data_header: Some(vec![0x17, 0x00, 0x00, 0x00, 0x00]),
                payload: Bytes::from(vec![0x42; 100]),
                message_type_id: 9,
                message_stream_id: 1,
                timestamp: 0,
                internal: false,
                next_chunk_size: None,
            },
        )
        .unwrap();
    let bytes = drain(&mut writer);

    let mut reader = ChunkReader::new();
    let messages = decode_all(&mut reader, &bytes);
    assert_eq!(messages[0].payload.len(), 105);
    assert_eq!(&messages[0].payload[..5], &[0x17, 0x00, 0x00, 0x00, 0x00]);
    assert_eq!(&messages[0].payload[5..], &[0x42; 100][..]);
}

#[test]
fn partial_writes_do_not_change_the_byte_stream() {
    let build = || {
        let mut writer = ChunkWriter::new();
        for i in 0..4u32 {
            writer
                .enqueue(
                    4,
                    media_message(9, 1, i * 33, vec![(i % 256) as u8; 150 + i as usize]),
                )
                .unwrap();
            writer
                .enqueue(3, media_message(8, 1, i * 23, vec![0xA0; 40]))
                .unwrap();
        }
        writer
    };

    let reference = drain(&mut build());
    let total = reference.len();

    for cap in [1usize, 17, 128, total] {
        let mut writer = build();
        let mut sink = ShortWriter {
            out: Vec::new(),
            cap,
        };
        while writer.has_pending() {
            writer.write_some(&mut sink).unwrap();
        }
        assert_eq!(sink.out, reference, "cap {}", cap);
    }
}

#[test]
fn partially_sent_channel_resumes_first() {
    let mut writer = ChunkWriter::new();
    writer
        .enqueue(4, media_message(9, 1, 0, vec![0x11; 100]))
        .unwrap();

    // stall mid-chunk, then queue another channel
    let mut sink = ShortWriter {
        out: Vec::new(),
        cap: 5,
    };
    for _ in 0..4 {
        writer.write_some(&mut sink).unwrap();
    }
    assert_eq!(sink.out.len(), 20);
    assert_eq!(writer.in_progress(), Some(4));
    writer
        .enqueue(3, media_message(8, 1, 0, vec![0x22; 10]))
        .unwrap();

    sink.cap = usize::MAX;
    while writer.has_pending() {
        writer.write_some(&mut sink).unwrap();
    }

    // channel 4's message is contiguous and complete before channel 3 starts
    let expected_first = 1 + 11 + 100;
    assert_eq!(sink.out[0] & 0x3F, 4);
    assert_eq!(sink.out[expected_first] & 0x3F, 3);
    assert_eq!(&sink.out[12..expected_first], &[0x11; 100][..]);
}

#[test]
fn interleaved_channels_reassemble_in_order() {
    // two channels, two 300-byte messages each, interleaved chunk by chunk
    let chunks_of = |csid: u32, timestamps: &[u32], fill: u8| -> Vec<Vec<u8>> {
        let mut writer = ChunkWriter::new();
        for (i, ts) in timestamps.iter().enumerate() {
            writer
                .enqueue(
                    csid,
                    media_message(9, 7, *ts, vec![fill + i as u8; 300]),
                )
                .unwrap();
        }
        let bytes = drain(&mut writer);
        // each 300-byte message splits into chunks of 128, 128, 44; a full
        // header opens each message, bare type-3 headers continue it
        let mut chunks = Vec::new();
        let mut pos = 0;
        let mut remaining = 0;
        while pos < bytes.len() {
            let fmt = bytes[pos] >> 6;
            let header_len = match fmt {
                0 => 11,
                1 => 7,
                2 => 3,
                _ => 0,
            };
            if fmt == 0 {
                remaining = 300;
            }
            let data_len = min(128, remaining);
            remaining -= data_len;
            let end = pos + 1 + header_len + data_len;
            chunks.push(bytes[pos..end].to_vec());
            pos = end;
        }
        chunks
    };

    let left = chunks_of(4, &[0, 100], 0x10);
    let right = chunks_of(5, &[0, 200], 0x80);
    assert_eq!(left.len(), 6);
    assert_eq!(right.len(), 6);

    let mut wire = Vec::new();
    for (a, b) in left.iter().zip(right.iter()) {
        wire.extend_from_slice(a);
        wire.extend_from_slice(b);
    }

    let mut reader = ChunkReader::new();
    let messages = decode_all(&mut reader, &wire);
    assert_eq!(messages.len(), 4);

    let on = |csid: u32| -> Vec<&ReceivedMessage> {
        messages.iter().filter(|m| m.chunk_stream_id == csid).collect()
    };
    let left_messages = on(4);
    assert_eq!(left_messages[0].timestamp, 0);
    assert_eq!(left_messages[1].timestamp, 100);
    assert!(left_messages.iter().all(|m| m.payload.len() == 300));
    assert!(left_messages.iter().all(|m| m.message_stream_id == 7));
    let right_messages = on(5);
    assert_eq!(right_messages[0].timestamp, 0);
    assert_eq!(right_messages[1].timestamp, 200);
    assert_eq!(right_messages[0].payload[0], 0x80);
    assert_eq!(right_messages[1].payload[0], 0x81);
}

#[test]
fn ack_cadence_counts_half_windows() {
    // wire sizes: first message 12 + 38, then type-3 repeats of 1 + 38
    let mut writer = ChunkWriter::new();
    let count = 10;
    for _ in 0..count {
        writer
            .enqueue(4, media_message(9, 1, 0, vec![0x55; 38]))
            .unwrap();
    }
    let bytes = drain(&mut writer);
    let n = bytes.len() as u64;
    assert_eq!(n, 50 + 9 * 39);

    let window = 78u32;
    let mut reader = ChunkReader::new();
    let mut cursor = Cursor::new(&bytes[..]);
    let mut acks = 0u64;
    loop {
        let before = cursor.position();
        let progressed = match reader.read(&mut cursor).unwrap() {
            Some(_) => true,
            None => cursor.position() != before,
        };
        if let Some(sequence) = reader.ack_due(window) {
            assert_eq!(sequence as u64, reader.total_bytes());
            reader.mark_acknowledged();
            acks += 1;
        }
        if !progressed {
            break;
        }
    }
    assert_eq!(acks, 2 * n / window as u64);
}

#[test]
fn queue_saturates_at_capacity() {
    let mut writer = ChunkWriter::new();
    for i in 0..10 {
        let ahead = writer
            .enqueue(4, media_message(9, 1, 0, vec![0; 16]))
            .unwrap();
        assert_eq!(ahead, i);
    }
    let err = writer
        .enqueue(4, media_message(9, 1, 0, vec![0; 16]))
        .unwrap_err();
    assert!(matches!(err, ChunkMessageError::QueueFull { csid: 4 }));
    // a different channel still has room
    assert_eq!(writer.enqueue(3, media_message(8, 1, 0, vec![0; 16])).unwrap(), 0);
}

#[test]
fn set_chunk_size_latches_at_message_completion() {
    let mut writer = ChunkWriter::new();
    writer.send_set_chunk_size(256).unwrap();
    let payload: Vec<u8> = (0..600u32).map(|i| (i % 251) as u8).collect();
    writer
        .enqueue(4, media_message(9, 1, 0, payload.clone()))
        .unwrap();
    let bytes = drain(&mut writer);
    assert_eq!(writer.chunk_size(), 256);

    let mut reader = ChunkReader::new();
    let mut cursor = Cursor::new(&bytes[..]);
    let mut payloads = Vec::new();
    loop {
        let before = cursor.position();
        match reader.read(&mut cursor).unwrap() {
            Some(message) => {
                if message.message_type_id == u8::from(RtmpMessageType::SetChunkSize) {
                    // the defining message switches the receive size too
                    reader.set_chunk_size(256);
                } else {
                    payloads.push(message);
                }
            }
            None => {
                if cursor.position() == before {
                    break;
                }
            }
        }
    }
    assert_eq!(cursor.position(), bytes.len() as u64);
    assert_eq!(payloads.len(), 1);
    assert_eq!(&payloads[0].payload[..], &payload[..]);
    // ceil(600 / 256) = 3 chunks after the 16-byte control message
    assert_eq!(bytes.len(), 16 + (1 + 11 + 256) + (1 + 256) + (1 + 88));
}

#[test]
fn extended_timestamp_roundtrip() {
    let mut writer = ChunkWriter::new();
    let timestamp = 0x0100_0000u32;
    writer
        .enqueue(4, media_message(9, 1, timestamp, vec![0x99; 200]))
        .unwrap();
    let bytes = drain(&mut writer);

    // type 0 header grows by the 4-byte extended timestamp; the type 3
    // continuation stays bare
    assert_eq!(bytes.len(), (1 + 11 + 4 + 128) + (1 + 72));
    assert_eq!(&bytes[1..4], &[0xFF, 0xFF, 0xFF]);

    let mut reader = ChunkReader::new();
    let messages = decode_all(&mut reader, &bytes);
    assert_eq!(messages[0].timestamp, timestamp);
    assert_eq!(messages[0].payload.len(), 200);
}

#[test]
fn release_hands_back_queued_payloads() {
    let mut writer = ChunkWriter::new();
    writer
        .enqueue(4, media_message(9, 1, 0, vec![0x01; 8]))
        .unwrap();
    writer.send_acknowledgement(42).unwrap();
    let released = writer.release_pending();
    assert_eq!(released.len(), 2);
    assert!(!released[0].internal);
    assert!(released[1].internal);
    assert!(!writer.has_pending());
}
