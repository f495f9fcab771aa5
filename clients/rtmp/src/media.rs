use amf_formats::{Value, amf0};
use byteorder::{BigEndian, ByteOrder};

use crate::errors::{RtmpClientError, RtmpClientResult};

/// FLV video tag bytes for an AVC sequence header: key frame + AVC codec
/// nibble, packet type 0, zero composition time.
pub const VIDEO_TAG_AVC_SEQUENCE_HEADER: [u8; 5] = [0x17, 0x00, 0x00, 0x00, 0x00];

const VIDEO_TAG_AVC_KEY_FRAME: u8 = 0x17;
const VIDEO_TAG_AVC_INTER_FRAME: u8 = 0x27;
const VIDEO_PACKET_NALU: u8 = 0x01;

/// Second byte of the audio tag: AudioSpecificConfig vs raw AAC frames.
pub const AUDIO_PACKET_SEQUENCE_HEADER: u8 = 0x00;
pub const AUDIO_PACKET_RAW: u8 = 0x01;

const AUDIO_FORMAT_AAC: u8 = 0xA0;
const AUDIO_SAMPLE_SIZE_16BIT: u8 = 0x02;
const AUDIO_STEREO: u8 = 0x01;

/// ISO/IEC 14496-3 sampling frequency index table; indexes above 12 are
/// reserved or escape values.
const AAC_SAMPLE_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

const DEFAULT_FRAMERATE: f64 = 29.97;
const DEFAULT_ASPECT_RATIO: f64 = 1.0;
const VIDEO_CODEC_H264: f64 = 7.0;
const AUDIO_CODEC_AAC: f64 = 10.0;

/// Fields carried by the `onMetaData` frame. Zero framerate and aspect
/// ratio components fall back to their conventional defaults on encode.
#[derive(Debug, Clone, Default)]
pub struct StreamMetadata {
    pub duration: f64,
    pub width: f64,
    pub height: f64,
    pub framerate: f64,
    pub audio_sample_rate: f64,
    pub audio_sample_size: f64,
    pub aspect_ratio_x: f64,
    pub aspect_ratio_y: f64,
}

/// AMF0 string `@setDataFrame`, prepended to the metadata payload so the
/// server re-broadcasts it to late subscribers.
pub fn set_data_frame_header() -> RtmpClientResult<Vec<u8>> {
    let mut bytes = Vec::new();
    amf0::Writer::new(&mut bytes)
        .write_string("@setDataFrame")
        .map_err(|err| RtmpClientError::MalformedMedia(err.to_string()))?;
    Ok(bytes)
}

/// `onMetaData` + ECMA array, the payload of the metadata message.
pub fn metadata_payload(metadata: &StreamMetadata) -> RtmpClientResult<Vec<u8>> {
    let or_default = |value: f64, default: f64| if value == 0.0 { default } else { value };
    let entries = vec![
        ("duration".to_string(), Value::Number(metadata.duration)),
        ("width".to_string(), Value::Number(metadata.width)),
        ("height".to_string(), Value::Number(metadata.height)),
        (
            "framerate".to_string(),
            Value::Number(or_default(metadata.framerate, DEFAULT_FRAMERATE)),
        ),
        ("videocodecid".to_string(), Value::Number(VIDEO_CODEC_H264)),
        (
            "audiosamplerate".to_string(),
            Value::Number(metadata.audio_sample_rate),
        ),
        (
            "audiosamplesize".to_string(),
            Value::Number(metadata.audio_sample_size),
        ),
        ("stereo".to_string(), Value::Boolean(true)),
        ("audiocodecid".to_string(), Value::Number(AUDIO_CODEC_AAC)),
        (
            "AspectRatioX".to_string(),
            Value::Number(or_default(metadata.aspect_ratio_x, DEFAULT_ASPECT_RATIO)),
        ),
        (
            "AspectRatioY".to_string(),
            Value::Number(or_default(metadata.aspect_ratio_y, DEFAULT_ASPECT_RATIO)),
        ),
    ];
    amf0::writer::encode_all(&[Value::String("onMetaData".to_string()), Value::EcmaArray(entries)])
        .map_err(|err| RtmpClientError::MalformedMedia(err.to_string()))
}

/// FLV video tag for a coded frame; the key-frame nibble is decided by
/// scanning the AVCC payload for an IDR NAL.
pub fn video_frame_tag(frame: &[u8]) -> [u8; 5] {
    let frame_type = if contains_idr_nal(frame) {
        VIDEO_TAG_AVC_KEY_FRAME
    } else {
        VIDEO_TAG_AVC_INTER_FRAME
    };
    [frame_type, VIDEO_PACKET_NALU, 0x00, 0x00, 0x00]
}

/// Walks AVCC framing (4-byte big-endian NAL length, then the NAL) looking
/// for nal_unit_type 5. A length field running past the buffer ends the
/// scan; such a frame is treated as a non-key frame.
pub fn contains_idr_nal(frame: &[u8]) -> bool {
    let mut offset = 0;
    while offset + 4 <= frame.len() {
        let nal_length = BigEndian::read_u32(&frame[offset..offset + 4]) as usize;
        offset += 4;
        if nal_length == 0 || offset + nal_length > frame.len() {
            return false;
        }
        if frame[offset] & 0x1F == 5 {
            return true;
        }
        offset += nal_length;
    }
    false
}

/// First byte of every audio tag, derived once from the
/// AudioSpecificConfig: AAC, 16-bit samples, the nearest FLV sample rate
/// and the channel bit.
pub fn audio_tag_byte(asc: &[u8]) -> RtmpClientResult<u8> {
    if asc.len() < 2 {
        return Err(RtmpClientError::MalformedMedia(
            "audio specific config shorter than 2 bytes".to_string(),
        ));
    }
    let frequency_index = (((asc[0] & 0x07) << 1) | (asc[1] >> 7)) as usize;
    let sample_rate = *AAC_SAMPLE_RATES.get(frequency_index).ok_or_else(|| {
        RtmpClientError::MalformedMedia(format!(
            "reserved sampling frequency index: {}",
            frequency_index
        ))
    })?;
    let channels = (asc[1] >> 3) & 0x0F;

    let rate_bits = if sample_rate >= 44100 {
        0x0C
    } else if sample_rate >= 22050 {
        0x08
    } else if sample_rate >= 11025 {
        0x04
    } else {
        0x00
    };
    let channel_bit = if channels > 1 { AUDIO_STEREO } else { 0x00 };
    Ok(AUDIO_FORMAT_AAC | AUDIO_SAMPLE_SIZE_16BIT | rate_bits | channel_bit)
}

#[cfg(test)]
mod tests {
    use amf_formats::{Value, amf0::Reader};

    use super::*;

    fn avcc(nals: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for nal in nals {
            out.extend_from_slice(&(nal.len() as u32).to_be_bytes());
            out.extend_from_slice(nal);
        }
        out
    }

    #[test]
    fn idr_detection() {
        // SPS + PPS + IDR slice
        assert!(contains_idr_nal(&avcc(&[
            &[0x67, 0x42],
            &[0x68, 0xCE],
            &[0x65, 0x88, 0x80]
        ])));
        // non-IDR slice only
        assert!(!contains_idr_nal(&avcc(&[&[0x41, 0x9A]])));
        // truncated length field ends the scan
        assert!(!contains_idr_nal(&[0x00, 0x00, 0x10, 0x00, 0x65]));
        assert!(!contains_idr_nal(&[]));
    }

    #[test]
    fn frame_tag_keyframe_bit() {
        assert_eq!(
            video_frame_tag(&avcc(&[&[0x65, 0x88]])),
            [0x17, 0x01, 0x00, 0x00, 0x00]
        );
        assert_eq!(
            video_frame_tag(&avcc(&[&[0x41, 0x9A]])),
            [0x27, 0x01, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn audio_tag_from_asc() {
        // AAC-LC, 44100 Hz (index 4), stereo: 0b00010_0100_0010_000
        let asc = [0x12, 0x10];
        assert_eq!(audio_tag_byte(&asc).unwrap(), 0xAF);
        // AAC-LC, 22050 Hz (index 7), mono
        let asc = [0x13, 0x88];
        assert_eq!(audio_tag_byte(&asc).unwrap(), 0xAA);
        // 8000 Hz (index 11) maps to the lowest FLV rate bits
        let asc = [0x15, 0x88];
        assert_eq!(audio_tag_byte(&asc).unwrap(), 0xA2);
    }

    #[test]
    fn audio_tag_rejects_bad_asc() {
        assert!(audio_tag_byte(&[0x12]).is_err());
        // frequency index 13 is reserved
        assert!(audio_tag_byte(&[0x16, 0x88]).is_err());
    }

    #[test]
    fn metadata_payload_shape() {
        let payload = metadata_payload(&StreamMetadata {
            duration: 0.0,
            width: 1280.0,
            height: 720.0,
            framerate: 0.0,
            audio_sample_rate: 44100.0,
            audio_sample_size: 16.0,
            aspect_ratio_x: 0.0,
            aspect_ratio_y: 0.0,
        })
        .unwrap();
        let values = Reader::new(&payload[..]).read_all().unwrap();
        assert_eq!(values[0], Value::String("onMetaData".to_string()));
        let array = &values[1];
        assert_eq!(array.property("width"), Some(&Value::Number(1280.0)));
        assert_eq!(array.property("framerate"), Some(&Value::Number(29.97)));
        assert_eq!(array.property("videocodecid"), Some(&Value::Number(7.0)));
        assert_eq!(array.property("audiocodecid"), Some(&Value::Number(10.0)));
        assert_eq!(array.property("stereo"), Some(&Value::Boolean(true)));
        assert_eq!(array.property("AspectRatioX"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn set_data_frame_header_bytes() {
        assert_eq!(
            set_data_frame_header().unwrap(),
            [&[0x02, 0x00, 0x0D][..], b"@setDataFrame".as_slice()].concat()
        );
    }
}
