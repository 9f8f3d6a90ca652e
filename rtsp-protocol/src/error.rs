use std::convert;
use std::error;
use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// An error occurred decoding the head due to incorrect usage of text
    /// encoding by the sender.
    Encoding,
    /// A line in the head exceeds the maximum line length.
    LineTooLong { max: usize },
    /// The request line of the head part is malformed.
    RequestLineMalformed { line: String },
    /// The response status line is malformed.
    StatusLineMalformed { line: String },
    /// The header first line does have a method and target URI, but it does
    /// not have a version, which is the required third part of the first
    /// line of the head.
    VersionMissing { line: String },
    /// The version specifier is incorrect or not supported. It should be
    /// "RTSP/1.0" or "RTSP/2.0" (or an HTTP version for tunneling).
    VersionMalformed { line: String, version: String },
    /// The request line has a method, but no target URI.
    UriMissing { line: String },
    /// The request URI could not be parsed.
    UriMalformed { line: String, uri: String },
    /// The response status line does have a version, but does not have a
    /// status code which is required.
    StatusCodeMissing { line: String },
    /// The provided status code is not a three digit unsigned integer.
    StatusCodeNotInteger { line: String, status_code: String },
    /// Header line is malformed.
    HeaderMalformed { line: String },
    /// The Content-Length header is not an integer value, or cannot be
    /// converted to an unsigned integer.
    ContentLengthNotInteger { value: String },
    /// The Content-Length header exceeds the configured limit.
    ContentLengthTooLarge { length: usize, limit: usize },
    /// The request line carries a method that is not known. The complete
    /// message was consumed, so the stream is still in sync and the peer
    /// can be answered.
    MethodUnknown { method: String, cseq: Option<u32> },
    /// A `Session` header value is empty or malformed.
    SessionMalformed { value: String },
    /// The URL passed to open a connection could not be used.
    UrlInvalid { url: String },
    /// Host name of the URL did not resolve to any address.
    AddressUnresolved { host: String },
    /// Interleaved data payload larger than 65535 bytes.
    InterleavedPayloadTooLarge,
    /// Interleaved header does not start with `$`.
    InterleavedInvalid,
    TransportProtocolProfileMissing { value: String },
    TransportLowerUnknown { value: String },
    TransportParameterUnknown { var: String },
    TransportParameterValueMissing { var: String },
    TransportParameterValueInvalid { var: String, val: String },
    TransportParameterInvalid { parameter: String },
    TransportChannelMalformed { value: String },
    TransportPortMalformed { value: String },
    RangeMalformed { value: String },
    RangeUnitNotSupported { value: String },
    RangeTimeNotSupported { value: String },
    RangeNptTimeMalformed { value: String },
    /// The parser was asked for a message before it finished one.
    MessageIncomplete,
    /// The connection was already closed locally.
    ConnectionClosed,
    /// Every `CSeq` value was used on this connection.
    CSeqExhausted,
    /// The peer closed the connection.
    Shutdown,
    /// I/O error occurred.
    Io(io::Error),
}

/// Coarse classification that tells the caller what to do with the
/// connection after an error.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    /// Socket level failure. The connection is dead.
    Transport,
    /// Malformed input. Framing is lost and the connection should be closed.
    Parse,
    /// Well-formed message with unknown semantics. Answer with an error
    /// status and keep the connection.
    Protocol,
}

impl Error {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_)
            | Error::Shutdown
            | Error::ConnectionClosed
            | Error::CSeqExhausted
            | Error::AddressUnresolved { .. } => {
                ErrorKind::Transport
            }
            Error::MethodUnknown { .. } => ErrorKind::Protocol,
            _ => ErrorKind::Parse,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Encoding => write!(f, "encoding incorrect"),
            Error::LineTooLong { max } => write!(f, "line exceeds maximum length of {max} bytes"),
            Error::RequestLineMalformed { line } => write!(f, "request line malformed: {line}"),
            Error::StatusLineMalformed { line } => write!(f, "status line malformed: {line}"),
            Error::VersionMissing { line } => write!(f, "version missing in request line: {line}"),
            Error::VersionMalformed { line, version } => {
                write!(f, "version malformed: {version} (in line: {line})")
            }
            Error::UriMissing { line } => write!(f, "uri missing in request line: {line}"),
            Error::UriMalformed { line, uri } => write!(f, "uri malformed: {uri} (in line: {line})"),
            Error::StatusCodeMissing { line } => {
                write!(f, "status code missing in response line: {line}")
            }
            Error::StatusCodeNotInteger { line, status_code } => write!(
                f,
                "response has invalid status code: {status_code} (in response line: {line})"
            ),
            Error::HeaderMalformed { line } => write!(f, "header line malformed: {line}"),
            Error::ContentLengthNotInteger { value } => {
                write!(f, "message has invalid value for Content-Length: {value}")
            }
            Error::ContentLengthTooLarge { length, limit } => {
                write!(f, "Content-Length of {length} exceeds limit of {limit}")
            }
            Error::MethodUnknown { method, .. } => write!(f, "method unknown: {method}"),
            Error::SessionMalformed { value } => write!(f, "session header malformed: {value}"),
            Error::UrlInvalid { url } => write!(f, "url invalid: {url}"),
            Error::AddressUnresolved { host } => write!(f, "failed to resolve host: {host}"),
            Error::InterleavedPayloadTooLarge => write!(f, "interleaved payload too large"),
            Error::InterleavedInvalid => write!(f, "interleaved header invalid"),
            Error::TransportProtocolProfileMissing { value } => {
                write!(f, "transport protocol and profile missing: {value}")
            }
            Error::TransportLowerUnknown { value } => {
                write!(f, "transport lower protocol unknown: {value}")
            }
            Error::TransportParameterUnknown { var } => {
                write!(f, "transport parameter unknown: {var}")
            }
            Error::TransportParameterValueMissing { var } => {
                write!(f, "transport parameter should have value but does not (var: {var})")
            }
            Error::TransportParameterValueInvalid { var, val } => {
                write!(f, "transport parameter value is invalid (var: {var}, val: {val})")
            }
            Error::TransportParameterInvalid { parameter } => {
                write!(f, "transport parameter invalid: {parameter}")
            }
            Error::TransportChannelMalformed { value } => {
                write!(f, "transport channel malformed: {value}")
            }
            Error::TransportPortMalformed { value } => write!(f, "transport port malformed: {value}"),
            Error::RangeMalformed { value } => write!(f, "range malformed: {value}"),
            Error::RangeUnitNotSupported { value } => write!(
                f,
                "range unit not supported (only \"npt\" is supported): {value}"
            ),
            Error::RangeTimeNotSupported { value } => {
                write!(f, "range \"time\" parameter not supported: {value}")
            }
            Error::RangeNptTimeMalformed { value } => write!(f, "range npt time malformed: {value}"),
            Error::MessageIncomplete => write!(f, "message incomplete"),
            Error::ConnectionClosed => write!(f, "connection closed"),
            Error::CSeqExhausted => write!(f, "no CSeq left on connection"),
            Error::Shutdown => write!(f, "peer closed connection"),
            Error::Io(err) => write!(f, "{err}"),
        }
    }
}

impl convert::From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {

    use std::io;

    use super::{Error, ErrorKind};

    #[test]
    fn kinds() {
        assert_eq!(Error::Shutdown.kind(), ErrorKind::Transport);
        assert_eq!(
            Error::from(io::Error::new(io::ErrorKind::BrokenPipe, "pipe")).kind(),
            ErrorKind::Transport,
        );
        assert_eq!(
            Error::MethodUnknown {
                method: "FOO".to_string(),
                cseq: Some(3)
            }
            .kind(),
            ErrorKind::Protocol,
        );
        assert_eq!(
            Error::HeaderMalformed {
                line: "x".to_string()
            }
            .kind(),
            ErrorKind::Parse,
        );
    }
}
