use std::fmt;

pub use bytes::Bytes;
pub use http::uri::Uri;

use super::{
    header::{Header, Headers},
    interleaved::Data,
    request::Request,
    response::Response,
};

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum Version {
    #[default]
    V1,
    V2,
    /// HTTP/1.0, only used when tunneling.
    Http10,
    /// HTTP/1.1, only used when tunneling.
    Http11,
}

impl Version {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Version::V1 => "RTSP/1.0",
            Version::V2 => "RTSP/2.0",
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "RTSP/1.0" => Some(Version::V1),
            "RTSP/2.0" => Some(Version::V2),
            "HTTP/1.0" => Some(Version::Http10),
            "HTTP/1.1" => Some(Version::Http11),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_http(self) -> bool {
        matches!(self, Version::Http10 | Version::Http11)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any message that can travel over an RTSP connection.
#[derive(Clone, Debug)]
pub enum Message {
    Request(Request),
    Response(Response),
    /// Interleaved binary data (`$` framing).
    Data(Data),
}

impl Message {
    /// Headers of a request or response. Data messages have none.
    #[must_use]
    pub fn headers(&self) -> Option<&Headers> {
        match self {
            Message::Request(request) => Some(&request.headers),
            Message::Response(response) => Some(&response.headers),
            Message::Data(_) => None,
        }
    }

    #[must_use]
    pub fn cseq(&self) -> Option<u32> {
        self.headers()?.get(Header::CSeq)?.trim().parse().ok()
    }

    #[must_use]
    pub fn into_request(self) -> Option<Request> {
        match self {
            Message::Request(request) => Some(request),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_response(self) -> Option<Response> {
        match self {
            Message::Response(response) => Some(response),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_data(self) -> Option<Data> {
        match self {
            Message::Data(data) => Some(data),
            _ => None,
        }
    }
}

impl From<Request> for Message {
    fn from(request: Request) -> Self {
        Message::Request(request)
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Message::Response(response)
    }
}

impl From<Data> for Message {
    fn from(data: Data) -> Self {
        Message::Data(data)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Message::Request(request) => write!(f, "{request}"),
            Message::Response(response) => write!(f, "{response}"),
            Message::Data(data) => write!(f, "{data}"),
        }
    }
}
