use std::fmt;

use super::{
    header::{Header, Headers},
    message::{Bytes, Version},
    request::Request,
    session::SessionHeader,
    status::{status_text, Status, StatusCategory, StatusCode},
};

#[derive(Clone, Debug)]
pub struct Response {
    pub version: Version,
    pub status: StatusCode,
    pub reason: String,
    pub headers: Headers,
    pub body: Option<Bytes>,
}

impl Response {
    #[must_use]
    pub fn ok() -> ResponseBuilder {
        ResponseBuilder::new(Status::Ok)
    }

    #[must_use]
    pub fn error(status: Status) -> ResponseBuilder {
        ResponseBuilder::new(status)
    }

    /// Response with a code that is not in the status table. The reason is
    /// still looked up so known codes get their canonical phrase.
    #[must_use]
    pub fn with_code(status: StatusCode) -> ResponseBuilder {
        ResponseBuilder {
            response: Response {
                version: Version::V1,
                status,
                reason: status_text(status).unwrap_or("Unknown").to_string(),
                headers: Headers::new(),
                body: None,
            },
        }
    }

    #[must_use]
    pub const fn category(&self) -> StatusCategory {
        StatusCategory::of(self.status)
    }

    pub fn is_success(&self) -> bool {
        self.category() == StatusCategory::Success
    }

    pub fn cseq(&self) -> Option<u32> {
        self.headers.get(Header::CSeq)?.trim().parse().ok()
    }

    pub fn session(&self) -> Option<&str> {
        self.headers.get(Header::Session)
    }

    pub fn session_header(&self) -> Option<SessionHeader> {
        self.session().and_then(|value| value.parse().ok())
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Version: {}, Status Code: {}, Reason Phrase: {}",
            self.version, self.status, &self.reason
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

pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    fn new(status: Status) -> Self {
        Self {
            response: Response {
                version: Version::V1,
                status: status.code(),
                reason: status.reason().to_string(),
                headers: Headers::new(),
                body: None,
            },
        }
    }

    /// Echo the `CSeq` of the request being answered.
    #[must_use]
    pub fn with_cseq_of(self, request: &Request) -> Self {
        match request.headers.get(Header::CSeq) {
            Some(cseq) => self.with_header(Header::CSeq, cseq.to_string()),
            None => self,
        }
    }

    #[must_use]
    pub fn with_cseq(mut self, cseq: u32) -> Self {
        self.response.headers.insert(Header::CSeq, cseq.to_string());
        self
    }

    #[must_use]
    pub fn with_header(mut self, header: Header, value: impl Into<String>) -> Self {
        self.response.headers.append(header, value);
        self
    }

    #[must_use]
    pub fn with_session(self, session: SessionHeader) -> Self {
        self.with_header(Header::Session, session.to_string())
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        if body.is_empty() {
            self.response.headers.remove(Header::ContentLength);
            self.response.body = None;
        } else {
            self.response
                .headers
                .insert(Header::ContentLength, body.len().to_string());
            self.response.body = Some(body);
        }
        self
    }

    #[must_use]
    pub fn build(self) -> Response {
        self.response
    }
}
