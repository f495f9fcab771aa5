pub mod c2s_command_names {
    pub const CONNECT: &str = "connect";
    pub const RELEASE_STREAM: &str = "releaseStream";
    pub const FC_PUBLISH: &str = "FCPublish";
    pub const CREATE_STREAM: &str = "createStream";
    pub const PUBLISH: &str = "publish";
    pub const DELETE_STREAM: &str = "deleteStream";
    pub const CHECK_BW: &str = "_checkbw";
}

pub mod s2c_command_names {
    pub const RESULT: &str = "_result";
    pub const ERROR: &str = "_error";
    pub const ON_STATUS: &str = "onStatus";
    pub const ON_BW_DONE: &str = "onBWDone";
    pub const CLOSE: &str = "close";
}

pub mod status_level {
    pub const STATUS: &str = "status";
    pub const WARNING: &str = "warning";
    pub const ERROR: &str = "error";
}

pub mod status_code {
    pub const PUBLISH_START: &str = "NetStream.Publish.Start";
    pub const CONNECT_REJECTED_PREFIX: &str = "NetConnection.Connect.Rejected";
    pub const NAME_IN_USE_DESCRIPTION: &str = "Stream name is already in use";
}

/// Only publishing in live mode is spoken.
pub const PUBLISH_TYPE_LIVE: &str = "live";

/// Connection type announced in the connect object.
pub const CONNECTION_TYPE_NONPRIVATE: &str = "nonprivate";
