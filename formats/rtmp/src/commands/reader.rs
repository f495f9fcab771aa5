use std::io;

use amf_formats::{Value, amf0};
use utils::traits::reader::ReadFrom;

use super::{
    RtmpS2CCommands, StatusInfo, consts::s2c_command_names, errors::CommandMessageError,
};

impl<R: io::Read> ReadFrom<R> for RtmpS2CCommands {
    type Error = CommandMessageError;
    fn read_from(reader: R) -> Result<Self, <Self as ReadFrom<R>>::Error> {
        let mut values = amf0::Reader::new(reader).read_all()?.into_iter();

        let command_name = match values.next() {
            Some(Value::String(name)) => name,
            other => {
                return Err(CommandMessageError::InvalidMessage(format!(
                    "expected a command name string, got {:?}",
                    other
                )));
            }
        };
        let transaction_id = values
            .next()
            .and_then(|v| v.try_as_f64())
            .unwrap_or_default();
        let arguments: Vec<Value> = values.collect();

        let command = match command_name.as_str() {
            s2c_command_names::RESULT => RtmpS2CCommands::Result {
                transaction_id,
                arguments,
            },
            s2c_command_names::ERROR => RtmpS2CCommands::Error {
                transaction_id,
                info: arguments
                    .iter()
                    .find(|v| matches!(v, Value::Object(_) | Value::EcmaArray(_)))
                    .map(StatusInfo::from_value),
            },
            s2c_command_names::ON_STATUS => {
                let info = arguments
                    .iter()
                    .find(|v| matches!(v, Value::Object(_) | Value::EcmaArray(_)))
                    .map(StatusInfo::from_value)
                    .ok_or_else(|| {
                        CommandMessageError::InvalidMessage(
                            "onStatus without an info object".to_string(),
                        )
                    })?;
                RtmpS2CCommands::OnStatus { info }
            }
            s2c_command_names::ON_BW_DONE => RtmpS2CCommands::OnBwDone,
            s2c_command_names::CLOSE => RtmpS2CCommands::Close,
            _ => RtmpS2CCommands::Unhandled {
                command_name,
            },
        };
        Ok(command)
    }
}

impl RtmpS2CCommands {
    /// The stream id a createStream `_result` carries: the first plain
    /// number among the response arguments.
    pub fn result_stream_id(arguments: &[Value]) -> Option<f64> {
        arguments.iter().find_map(Value::try_as_f64)
    }
}

#[cfg(test)]
mod tests {
    use amf_formats::{Value, amf0::Writer};
    use utils::traits::reader::ReadFrom;

    use crate::commands::RtmpS2CCommands;

    fn encode(values: &[Value]) -> Vec<u8> {
        let mut bytes = Vec::new();
        let mut writer = Writer::new(&mut bytes);
        for value in values {
            writer.write(value).unwrap();
        }
        bytes
    }

    #[test]
    fn create_stream_result() {
        let bytes = encode(&[
            Value::String("_result".to_string()),
            Value::Number(4.0),
            Value::Null,
            Value::Number(1.0),
        ]);
        match RtmpS2CCommands::read_from(&bytes[..]).unwrap() {
            RtmpS2CCommands::Result {
                transaction_id,
                arguments,
            } => {
                assert_eq!(transaction_id, 4.0);
                assert_eq!(RtmpS2CCommands::result_stream_id(&arguments), Some(1.0));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn on_status_info() {
        let bytes = encode(&[
            Value::String("onStatus".to_string()),
            Value::Number(0.0),
            Value::Null,
            Value::Object(vec![
                ("level".to_string(), Value::String("status".to_string())),
                (
                    "code".to_string(),
                    Value::String("NetStream.Publish.Start".to_string()),
                ),
                (
                    "description".to_string(),
                    Value::String("publishing".to_string()),
                ),
            ]),
        ]);
        match RtmpS2CCommands::read_from(&bytes[..]).unwrap() {
            RtmpS2CCommands::OnStatus { info } => {
                assert_eq!(info.level, "status");
                assert_eq!(info.code, "NetStream.Publish.Start");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn unknown_command_is_passed_through() {
        let bytes = encode(&[
            Value::String("onFCPublish".to_string()),
            Value::Number(0.0),
        ]);
        match RtmpS2CCommands::read_from(&bytes[..]).unwrap() {
            RtmpS2CCommands::Unhandled { command_name } => {
                assert_eq!(command_name, "onFCPublish");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
