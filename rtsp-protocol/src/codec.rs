use tokio_util::codec::{Decoder, Encoder};

use bytes::BytesMut;

use super::{error::Error, message::Message, parse::Parser, serialize::Serialize};

/// `tokio_util` codec over [`Message`].
///
/// An [`Error::MethodUnknown`] from `decode` leaves the codec in sync with
/// the stream, so callers that drive the decoder themselves can answer it
/// and keep going.
pub struct Codec {
    parser: Parser,
}

impl Codec {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    #[must_use]
    pub fn with_content_length_limit(limit: usize) -> Self {
        Self {
            parser: Parser::with_content_length_limit(limit),
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for Codec {
    type Item = Message;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.parser.decode(src)
    }
}

impl<M: Into<Message>> Encoder<M> for Codec {
    type Error = Error;

    fn encode(&mut self, item: M, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.into().serialize(dst)
    }
}
