use std::time::Duration;

/// Version string announced in the connect object, kept to what RTMP
/// servers have seen from encoders for years.
pub const FLASH_VERSION: &str = "FMLE/3.0 (compatible; librtmp)";

/// Chunk size announced right after the connect command is queued.
pub const OUTBOUND_CHUNK_SIZE: usize = 256;

pub const DEFAULT_RTMP_PORT: u16 = 1935;

pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(10);
