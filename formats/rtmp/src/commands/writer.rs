use std::io;

use amf_formats::{Value, amf0};
use utils::traits::writer::WriteTo;

use super::{RtmpC2SCommands, consts::c2s_command_names, errors::CommandMessageError};

impl RtmpC2SCommands {
    fn command_name(&self) -> &'static str {
        match self {
            RtmpC2SCommands::Connect(_) => c2s_command_names::CONNECT,
            RtmpC2SCommands::ReleaseStream(_) => c2s_command_names::RELEASE_STREAM,
            RtmpC2SCommands::FcPublish(_) => c2s_command_names::FC_PUBLISH,
            RtmpC2SCommands::CreateStream(_) => c2s_command_names::CREATE_STREAM,
            RtmpC2SCommands::Publish(_) => c2s_command_names::PUBLISH,
            RtmpC2SCommands::DeleteStream(_) => c2s_command_names::DELETE_STREAM,
            RtmpC2SCommands::CheckBandwidth(_) => c2s_command_names::CHECK_BW,
        }
    }

    fn transaction_id(&self) -> f64 {
        match self {
            RtmpC2SCommands::Connect(c) => c.transaction_id,
            RtmpC2SCommands::ReleaseStream(c) | RtmpC2SCommands::FcPublish(c) => c.transaction_id,
            RtmpC2SCommands::CreateStream(c) => c.transaction_id,
            RtmpC2SCommands::Publish(c) => c.transaction_id,
            RtmpC2SCommands::DeleteStream(c) => c.transaction_id,
            RtmpC2SCommands::CheckBandwidth(c) => c.transaction_id,
        }
    }
}

impl<W: io::Write> WriteTo<W> for RtmpC2SCommands {
    type Error = CommandMessageError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        let mut amf = amf0::Writer::new(writer);
        amf.write_string(self.command_name())?;
        amf.write_number(self.transaction_id())?;
        match self {
            RtmpC2SCommands::Connect(request) => {
                amf.write_object(&[
                    ("app".to_string(), Value::from(request.app.as_str())),
                    (
                        "type".to_string(),
                        Value::from(request.connection_type.as_str()),
                    ),
                    (
                        "flashVer".to_string(),
                        Value::from(request.flash_version.as_str()),
                    ),
                    ("tcUrl".to_string(), Value::from(request.tc_url.as_str())),
                ])?;
            }
            RtmpC2SCommands::ReleaseStream(command) | RtmpC2SCommands::FcPublish(command) => {
                amf.write_null()?;
                amf.write_string(&command.stream_key)?;
            }
            RtmpC2SCommands::CreateStream(_) => {
                amf.write_null()?;
            }
            RtmpC2SCommands::Publish(command) => {
                amf.write_null()?;
                amf.write_string(&command.stream_key)?;
                amf.write_string(&command.publish_type)?;
            }
            RtmpC2SCommands::DeleteStream(command) => {
                amf.write_null()?;
                amf.write_number(command.stream_id)?;
            }
            RtmpC2SCommands::CheckBandwidth(_) => {
                amf.write_null()?;
            }
        }
        Ok(())
    }
}
