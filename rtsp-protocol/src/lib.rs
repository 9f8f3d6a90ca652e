mod connection;
mod error;
mod header;
mod interleaved;
mod message;
mod method;
mod parse;
mod range;
mod request;
mod response;
mod serialize;
mod session;
mod status;
mod transport;

#[cfg(feature = "tokio-codec")]
mod codec;

pub use connection::{Connection, ShutdownHandle, Stream, DEFAULT_PORT};
pub use error::{Error, ErrorKind, Result};
pub use header::{Header, Headers};
pub use interleaved::{ChannelId, Data, MAX_PAYLOAD_LEN};
pub use message::{Bytes, Message, Uri, Version};
pub use method::{Method, MethodSet};
pub use parse::{Parser, Status as ParserStatus, MAX_LINE_LEN};
pub use range::{NptTime, Range};
pub use request::Request;
pub use response::{Response, ResponseBuilder};
pub use serialize::Serialize;
pub use session::SessionHeader;
pub use status::{status_text, Status, StatusCategory, StatusCode};
pub use transport::{Channel, Lower, Parameter, Port, Profile, Transport};

#[cfg(feature = "tokio-codec")]
pub use codec::Codec;
