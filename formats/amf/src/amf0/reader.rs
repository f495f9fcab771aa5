use std::io;

use byteorder::{BigEndian, ReadBytesExt};
use utils::traits::reader::ReadFrom;

use crate::errors::{AmfError, AmfResult};

use super::{Value, amf0_marker};

#[derive(Debug)]
pub struct Reader<R> {
    inner: R,
}

impl<R> Reader<R> {
    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

impl<R> Reader<R>
where
    R: io::Read,
{
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads one value, `None` when the input is already exhausted.
    pub fn read(&mut self) -> AmfResult<Option<Value>> {
        let marker = match self.inner.read_u8() {
            Ok(marker) => marker,
            Err(_) => return Ok(None),
        };
        let value = match marker {
            amf0_marker::NUMBER => self.read_number(),
            amf0_marker::BOOLEAN => self.read_boolean(),
            amf0_marker::STRING => self.read_string(),
            amf0_marker::OBJECT => self.read_object(),
            amf0_marker::NULL => Ok(Value::Null),
            amf0_marker::UNDEFINED => Ok(Value::Undefined),
            amf0_marker::ECMA_ARRAY => self.read_ecma_array(),
            amf0_marker::OBJECT_END => Ok(Value::ObjectEnd),
            amf0_marker::LONG_STRING => self.read_long_string(),
            amf0_marker::MOVIECLIP
            | amf0_marker::REFERENCE
            | amf0_marker::STRICT_ARRAY
            | amf0_marker::DATE
            | amf0_marker::UNSUPPORTED
            | amf0_marker::RECORDSET
            | amf0_marker::XML_DOCUMENT
            | amf0_marker::TYPED_OBJECT
            | amf0_marker::AVMPLUS_OBJECT => Err(AmfError::Unsupported { marker }),
            _ => Err(AmfError::Unknown { marker }),
        };
        value.map(Some)
    }

    /// Reads until the input runs out.
    pub fn read_all(&mut self) -> AmfResult<Vec<Value>> {
        let mut result = Vec::new();
        while let Some(value) = self.read()? {
            result.push(value);
        }
        Ok(result)
    }

    pub fn read_number(&mut self) -> AmfResult<Value> {
        let number = self.inner.read_f64::<BigEndian>()?;
        Ok(Value::Number(number))
    }

    pub fn read_boolean(&mut self) -> AmfResult<Value> {
        let byte = self.inner.read_u8()?;
        Ok(Value::Boolean(byte != 0))
    }

    fn read_utf8_inner(&mut self, len: usize) -> AmfResult<String> {
        let mut buffer = vec![0; len];
        self.inner.read_exact(&mut buffer)?;
        let result = String::from_utf8(buffer)?;
        Ok(result)
    }

    pub fn read_string(&mut self) -> AmfResult<Value> {
        let len = self.inner.read_u16::<BigEndian>()?;
        self.read_utf8_inner(len as usize).map(Value::String)
    }

    pub fn read_long_string(&mut self) -> AmfResult<Value> {
        let len = self.inner.read_u32::<BigEndian>()?;
        self.read_utf8_inner(len as usize).map(Value::String)
    }

    fn read_key_value_pairs_inner(&mut self) -> AmfResult<Vec<(String, Value)>> {
        let mut result: Vec<(String, Value)> = Vec::new();
        loop {
            let len = self.inner.read_u16::<BigEndian>()?;
            let key = self.read_utf8_inner(len as usize)?;
            match self.read()? {
                Some(Value::ObjectEnd) if key.is_empty() => break,
                Some(value) => result.push((key, value)),
                None => {
                    return Err(AmfError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "unexpected eof",
                    )));
                }
            }
        }
        Ok(result)
    }

    pub fn read_object(&mut self) -> AmfResult<Value> {
        let pairs = self.read_key_value_pairs_inner()?;
        Ok(Value::Object(pairs))
    }

    pub fn read_ecma_array(&mut self) -> AmfResult<Value> {
        // the element count is advisory, the terminator is authoritative
        let _len = self.inner.read_u32::<BigEndian>()? as usize;
        let pairs = self.read_key_value_pairs_inner()?;
        Ok(Value::EcmaArray(pairs))
    }
}

impl<R: io::Read> ReadFrom<R> for Value {
    type Error = AmfError;
    fn read_from(reader: R) -> Result<Self, Self::Error> {
        match Reader::new(reader).read()? {
            Some(value) => Ok(value),
            None => Err(AmfError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "unexpected eof",
            ))),
        }
    }
}
