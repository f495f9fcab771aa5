use std::io;

use byteorder::{BigEndian, WriteBytesExt};
use utils::traits::writer::WriteTo;

use crate::errors::{AmfError, AmfResult};

use super::{Value, amf0_marker};

#[derive(Debug)]
pub struct Writer<W> {
    inner: W,
}

impl<W> Writer<W> {
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W> Writer<W>
where
    W: io::Write,
{
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write(&mut self, value: &Value) -> AmfResult<()> {
        match value {
            Value::Number(n) => self.write_number(*n),
            Value::Boolean(b) => self.write_boolean(*b),
            Value::String(s) => self.write_string(s),
            Value::Object(entries) => self.write_object(entries),
            Value::EcmaArray(entries) => self.write_ecma_array(entries),
            Value::Null => self.write_null(),
            Value::Undefined => self.write_undefined(),
            Value::ObjectEnd => self.write_object_end(),
        }
    }

    pub fn write_number(&mut self, v: f64) -> AmfResult<()> {
        self.inner.write_u8(amf0_marker::NUMBER)?;
        self.inner.write_f64::<BigEndian>(v)?;
        Ok(())
    }

    pub fn write_boolean(&mut self, v: bool) -> AmfResult<()> {
        self.inner.write_u8(amf0_marker::BOOLEAN)?;
        self.inner.write_u8(v as u8)?;
        Ok(())
    }

    fn write_short_string_inner(&mut self, v: &str) -> AmfResult<()> {
        if v.len() > 0xFFFF {
            return Err(AmfError::StringTooLong { length: v.len() });
        }
        self.inner.write_u16::<BigEndian>(v.len() as u16)?;
        self.inner.write_all(v.as_bytes())?;
        Ok(())
    }

    fn write_long_string_inner(&mut self, v: &str) -> AmfResult<()> {
        if v.len() > 0xFFFF_FFFF {
            return Err(AmfError::StringTooLong { length: v.len() });
        }
        self.inner.write_u32::<BigEndian>(v.len() as u32)?;
        self.inner.write_all(v.as_bytes())?;
        Ok(())
    }

    /// Picks the short or long string marker by length.
    pub fn write_string(&mut self, v: &str) -> AmfResult<()> {
        if v.len() > 0xFFFF {
            self.inner.write_u8(amf0_marker::LONG_STRING)?;
            self.write_long_string_inner(v)
        } else {
            self.inner.write_u8(amf0_marker::STRING)?;
            self.write_short_string_inner(v)
        }
    }

    fn write_pairs_inner(&mut self, entries: &[(String, Value)]) -> AmfResult<()> {
        for (key, value) in entries {
            self.write_short_string_inner(key)?;
            self.write(value)?;
        }
        self.inner.write_u16::<BigEndian>(0)?;
        self.inner.write_u8(amf0_marker::OBJECT_END)?;
        Ok(())
    }

    pub fn write_object(&mut self, entries: &[(String, Value)]) -> AmfResult<()> {
        self.inner.write_u8(amf0_marker::OBJECT)?;
        self.write_pairs_inner(entries)?;
        Ok(())
    }

    pub fn write_ecma_array(&mut self, entries: &[(String, Value)]) -> AmfResult<()> {
        self.inner.write_u8(amf0_marker::ECMA_ARRAY)?;
        self.inner.write_u32::<BigEndian>(entries.len() as u32)?;
        self.write_pairs_inner(entries)?;
        Ok(())
    }

    pub fn write_null(&mut self) -> AmfResult<()> {
        self.inner.write_u8(amf0_marker::NULL)?;
        Ok(())
    }

    pub fn write_undefined(&mut self) -> AmfResult<()> {
        self.inner.write_u8(amf0_marker::UNDEFINED)?;
        Ok(())
    }

    fn write_object_end(&mut self) -> AmfResult<()> {
        self.inner.write_u8(amf0_marker::OBJECT_END)?;
        Ok(())
    }
}

impl<W: io::Write> WriteTo<W> for Value {
    type Error = AmfError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        Writer::new(writer).write(self)
    }
}

/// Encodes a sequence of values into a fresh buffer.
pub fn encode_all(values: &[Value]) -> AmfResult<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut writer = Writer::new(&mut bytes);
    for value in values {
        writer.write(value)?;
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use crate::amf0::{Reader, Value, amf0_marker};

    use super::Writer;

    macro_rules! encode {
        ($value:expr) => {{
            let mut buf = Vec::new();
            Writer::new(&mut buf).write(&$value).unwrap();
            buf
        }};
    }

    macro_rules! roundtrip {
        ($value:expr) => {{
            let buf = encode!($value);
            let decoded = Reader::new(&buf[..]).read().unwrap().unwrap();
            assert_eq!(decoded, $value);
            buf
        }};
    }

    #[test]
    fn number() {
        let buf = roundtrip!(Value::Number(29.97));
        assert_eq!(buf[0], amf0_marker::NUMBER);
        assert_eq!(buf.len(), 9);
    }

    #[test]
    fn boolean() {
        assert_eq!(roundtrip!(Value::Boolean(true)), vec![0x01, 0x01]);
        assert_eq!(roundtrip!(Value::Boolean(false)), vec![0x01, 0x00]);
    }

    #[test]
    fn string() {
        let buf = roundtrip!(Value::String("@setDataFrame".to_string()));
        assert_eq!(
            buf,
            [
                &[amf0_marker::STRING, 0x00, 0x0d][..],
                b"@setDataFrame".as_slice()
            ]
            .concat()
        );
    }

    #[test]
    fn long_string_marker_over_u16() {
        let buf = encode!(Value::String("x".repeat(0x10000)));
        assert_eq!(buf[0], amf0_marker::LONG_STRING);
        assert_eq!(&buf[1..5], &[0x00, 0x01, 0x00, 0x00]);
        roundtrip!(Value::String("x".repeat(0x10000)));
    }

    #[test]
    fn null() {
        assert_eq!(roundtrip!(Value::Null), vec![amf0_marker::NULL]);
    }

    #[test]
    fn object_preserves_entry_order() {
        let value = Value::Object(vec![
            ("app".to_string(), Value::String("live2".to_string())),
            ("tcUrl".to_string(), Value::String("rtmp://h/live2".to_string())),
            ("fpad".to_string(), Value::Boolean(false)),
        ]);
        let buf = roundtrip!(value);
        assert_eq!(buf[0], amf0_marker::OBJECT);
        // terminator: empty key + object end marker
        assert_eq!(&buf[buf.len() - 3..], &[0x00, 0x00, amf0_marker::OBJECT_END]);
        let app = buf.windows(3).position(|w| w == b"app").unwrap();
        let tc_url = buf.windows(5).position(|w| w == b"tcUrl").unwrap();
        assert!(app < tc_url);
    }

    #[test]
    fn ecma_array_carries_count() {
        let value = Value::EcmaArray(vec![
            ("duration".to_string(), Value::Number(0.0)),
            ("width".to_string(), Value::Number(1280.0)),
        ]);
        let buf = roundtrip!(value);
        assert_eq!(buf[0], amf0_marker::ECMA_ARRAY);
        assert_eq!(&buf[1..5], &[0x00, 0x00, 0x00, 0x02]);
    }

    #[test]
    fn nested_structures_roundtrip() {
        let value = Value::Object(vec![
            (
                "info".to_string(),
                Value::Object(vec![(
                    "code".to_string(),
                    Value::String("NetStream.Publish.Start".to_string()),
                )]),
            ),
            ("count".to_string(), Value::Number(2.0)),
            ("flag".to_string(), Value::Boolean(true)),
            ("nothing".to_string(), Value::Null),
        ]);
        roundtrip!(value);
    }

    #[test]
    fn value_sequence_roundtrip() {
        let values = vec![
            Value::String("connect".to_string()),
            Value::Number(1.0),
            Value::Object(vec![(
                "app".to_string(),
                Value::String("live2".to_string()),
            )]),
        ];
        let bytes = super::encode_all(&values).unwrap();
        let decoded = Reader::new(&bytes[..]).read_all().unwrap();
        assert_eq!(decoded, values);
    }
}
