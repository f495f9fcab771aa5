use std::time::Duration;

use rtmp_formats::chunk::consts::DEFAULT_QUEUE_CAPACITY;

use crate::consts::{
    DEFAULT_DNS_TIMEOUT, DEFAULT_IO_TIMEOUT, FLASH_VERSION, OUTBOUND_CHUNK_SIZE,
};

#[derive(Debug, Clone)]
pub struct RtmpClientConfig {
    /// flashVer field of the connect object.
    pub flash_version: String,
    /// Chunk size announced right after connect.
    pub chunk_size: usize,
    /// Name resolution watchdog.
    pub dns_timeout: Duration,
    /// Socket watchdog, re-armed on every read or write event.
    pub io_timeout: Duration,
    /// Per-channel transmit queue depth.
    pub queue_capacity: usize,
}

impl Default for RtmpClientConfig {
    fn default() -> Self {
        Self {
            flash_version: FLASH_VERSION.to_string(),
            chunk_size: OUTBOUND_CHUNK_SIZE,
            dns_timeout: DEFAULT_DNS_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}
