use amf_formats::Value;

pub mod consts;
pub mod errors;
pub mod reader;
pub mod writer;

///! @see: 7.2.1.1. connect
/// Only the object fields a publishing encoder announces; the audio and
/// video capability fields of the full connect object belong to the play
/// flow.
#[derive(Debug, Clone)]
pub struct ConnectCommandRequest {
    pub transaction_id: f64,
    pub app: String,
    pub connection_type: String,
    pub flash_version: String,
    pub tc_url: String,
}

///! releaseStream / FCPublish: name, transaction id, null, stream key.
#[derive(Debug, Clone)]
pub struct StreamKeyCommand {
    pub transaction_id: f64,
    pub stream_key: String,
}

///! @see: 7.2.1.3. createStream
#[derive(Debug, Clone)]
pub struct CreateStreamCommandRequest {
    pub transaction_id: f64,
}

///! @see: 7.2.2.6. publish
#[derive(Debug, Clone)]
pub struct PublishCommand {
    pub transaction_id: f64,
    pub stream_key: String,
    pub publish_type: String,
}

///! @see: 7.2.2.3. deleteStream
#[derive(Debug, Clone)]
pub struct DeleteStreamCommand {
    pub transaction_id: f64,
    pub stream_id: f64,
}

///! The `_checkbw` call answers the server's onBWDone notification.
#[derive(Debug, Clone)]
pub struct CheckBandwidthCommand {
    pub transaction_id: f64,
}

/// Client-to-server commands of the publishing dialogue.
#[derive(Debug, Clone)]
pub enum RtmpC2SCommands {
    Connect(ConnectCommandRequest),
    ReleaseStream(StreamKeyCommand),
    FcPublish(StreamKeyCommand),
    CreateStream(CreateStreamCommandRequest),
    Publish(PublishCommand),
    DeleteStream(DeleteStreamCommand),
    CheckBandwidth(CheckBandwidthCommand),
}

/// The level/code/description triple carried by onStatus and _error info
/// objects. Servers omit fields freely, absent ones decode empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusInfo {
    pub level: String,
    pub code: String,
    pub description: String,
}

impl StatusInfo {
    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str| {
            value
                .property(name)
                .and_then(Value::try_as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            level: field("level"),
            code: field("code"),
            description: field("description"),
        }
    }
}

/// Server-to-client commands the publishing dialogue reacts to. `_result`
/// keeps its raw argument values: which request it answers is only known
/// once the transaction id is matched.
#[derive(Debug, Clone)]
pub enum RtmpS2CCommands {
    Result {
        transaction_id: f64,
        arguments: Vec<Value>,
    },
    Error {
        transaction_id: f64,
        info: Option<StatusInfo>,
    },
    OnStatus {
        info: StatusInfo,
    },
    OnBwDone,
    Close,
    Unhandled {
        command_name: String,
    },
}
