use std::fmt;

use bytes::Bytes;

/// First byte of an interleaved frame (`$`).
pub const MAGIC: u8 = 0x24;

/// Length of the frame header: magic, channel and u16 length.
pub const HEADER_LEN: usize = 4;

pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

pub type ChannelId = u8;

/// Binary payload carried over the control connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Data {
    pub channel: ChannelId,
    pub payload: Bytes,
}

impl Data {
    #[must_use]
    pub fn new(channel: ChannelId, payload: impl Into<Bytes>) -> Self {
        Self {
            channel,
            payload: payload.into(),
        }
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "interleaved payload over channel: {}, size: {}",
            self.channel,
            self.payload.len()
        )
    }
}
