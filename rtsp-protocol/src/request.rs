use std::fmt;

use super::{
    header::{split_list, Header, Headers},
    message::{Bytes, Uri, Version},
    method::Method,
    range::Range,
    session::SessionHeader,
    transport::Transport,
    Error,
};

#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: Headers,
    pub body: Option<Bytes>,
}

impl Request {
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            version: Version::V1,
            headers: Headers::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, header: Header, value: impl Into<String>) -> Self {
        self.headers.append(header, value);
        self
    }

    /// Attach a body. Also sets `Content-Length` so the header map matches
    /// what ends up on the wire.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        if body.is_empty() {
            self.headers.remove(Header::ContentLength);
            self.body = None;
        } else {
            self.headers.insert(Header::ContentLength, body.len().to_string());
            self.body = Some(body);
        }
        self
    }

    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path().trim_end_matches('/')
    }

    pub fn cseq(&self) -> Option<u32> {
        self.headers.get(Header::CSeq)?.trim().parse().ok()
    }

    pub fn require(&self) -> Vec<&str> {
        self.headers
            .get_all(Header::Require)
            .iter()
            .map(String::as_str)
            .collect()
    }

    pub fn accept(&self) -> Vec<&str> {
        self.headers
            .get_all(Header::Accept)
            .iter()
            .map(String::as_str)
            .collect()
    }

    /// Raw `Session` header value, including parameters.
    pub fn session(&self) -> Option<&str> {
        self.headers.get(Header::Session)
    }

    pub fn session_header(&self) -> Option<Result<SessionHeader, Error>> {
        self.session().map(str::parse)
    }

    /// All transport candidates in preference order. Fails if any of them
    /// does not parse; see [`Request::transport_candidates`] to skip those.
    #[allow(clippy::missing_errors_doc)]
    pub fn transport(&self) -> Result<Vec<Transport>, Error> {
        self.transport_candidates().collect()
    }

    /// Parse every transport candidate on its own, in preference order.
    pub fn transport_candidates(&self) -> impl Iterator<Item = Result<Transport, Error>> + '_ {
        self.headers
            .get_all(Header::Transport)
            .iter()
            .flat_map(|value| split_list(value))
            .map(|value| value.parse::<Transport>())
    }

    pub fn range(&self) -> Option<Result<Range, Error>> {
        self.headers.get(Header::Range).map(str::parse)
    }

    pub fn has_body(&self) -> bool {
        self.body.as_ref().is_some_and(|body| !body.is_empty())
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Version: {}, Method: {}, Uri: {}",
            self.version, self.method, self.uri
        )?;

        if !self.headers.is_empty() {
            writeln!(f, "\nHeaders:")?;
            for (var, val) in self.headers.iter() {
                writeln!(f, " - {}: {}", var, val)?;
            }
        }

        if let Some(body) = &self.body {
            writeln!(f, "[{} bytes]", body.len())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::{Error, Header, Method, Request, Uri};
    use crate::transport::{Lower, Parameter, Port, Transport};

    fn request(method: Method) -> Request {
        Request::new(method, Uri::from_static("rtsp://example.com/media/"))
    }

    #[test]
    fn path_trims_trailing_slash() {
        assert_eq!(request(Method::Options).path(), "/media");
    }

    #[test]
    fn with_body_sets_content_length() {
        let request = request(Method::SetParameter).with_body(&b"param: 1\r\n"[..]);
        assert_eq!(request.headers.get(Header::ContentLength), Some("10"));
        assert!(request.has_body());

        let request = request.with_body(&b""[..]);
        assert_eq!(request.headers.get(Header::ContentLength), None);
        assert!(!request.has_body());
    }

    #[test]
    fn transport_parses_every_value() {
        let request = request(Method::Setup)
            .with_header(Header::Transport, "RTP/AVP/TCP;interleaved=0-1")
            .with_header(Header::Transport, "RTP/AVP;unicast;client_port=5000-5001");
        let transports = request.transport().unwrap();
        assert_eq!(transports.len(), 2);
        assert_eq!(transports[0].lower_protocol(), Some(&Lower::Tcp));
        assert_eq!(
            transports[1],
            Transport::new()
                .with_parameter(Parameter::Unicast)
                .with_parameter(Parameter::ClientPort(Port::Range(5000, 5001))),
        );
    }

    #[test]
    fn transport_candidates_parse_independently() {
        let request = request(Method::Setup).with_header(
            Header::Transport,
            "RTP/AVP;unicast;client_port=5000-5001;x-vendor=1,RTP/AVP;unicast;client_port=5002-5003",
        );
        assert!(request.transport().is_err());
        let candidates = request.transport_candidates().collect::<Vec<_>>();
        assert_eq!(candidates.len(), 2);
        assert!(matches!(
            candidates[0],
            Err(Error::TransportParameterUnknown { .. })
        ));
        assert_eq!(
            candidates[1].as_ref().unwrap().client_port(),
            Some(&Port::Range(5002, 5003))
        );
    }

    #[test]
    fn session_header_strips_parameters() {
        let request = request(Method::Play).with_header(Header::Session, "abcd1234;timeout=30");
        assert_eq!(request.session(), Some("abcd1234;timeout=30"));
        assert_eq!(request.session_header().unwrap().unwrap().id(), "abcd1234");
    }

    #[test]
    fn cseq_parses() {
        let request = request(Method::Play).with_header(Header::CSeq, " 42");
        assert_eq!(request.cseq(), Some(42));
    }
}
