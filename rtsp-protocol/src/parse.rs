use bytes::{Buf, BytesMut};

use super::{
    error::{Error, Result},
    header::{split_list, Header, Headers},
    interleaved::{ChannelId, Data, HEADER_LEN, MAGIC},
    message::{Bytes, Message, Uri, Version},
    method::Method,
    request::Request,
    response::Response,
    status::StatusCode,
};

/// Longest accepted line in the head of a message, excluding the line ending.
pub const MAX_LINE_LEN: usize = 8192;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Status {
    Hungry,
    Done,
}

/// Incremental parser for one message.
///
/// Bytes are consumed from the buffer passed to [`Parser::parse`] as soon as
/// they are processed. Whatever follows the message stays in the buffer, so
/// the same buffer can be handed to a fresh parser for the next message.
pub struct Parser {
    state: State,
    first_line: Option<FirstLine>,
    headers: Headers,
    body: Option<Bytes>,
    data: Option<Data>,
    content_length_limit: usize,
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self::with_content_length_limit(usize::MAX)
    }

    #[must_use]
    pub fn with_content_length_limit(content_length_limit: usize) -> Self {
        Self {
            state: State::Start,
            first_line: None,
            headers: Headers::new(),
            body: None,
            data: None,
            content_length_limit,
        }
    }

    pub fn set_content_length_limit(&mut self, limit: usize) {
        self.content_length_limit = limit;
    }

    #[must_use]
    pub const fn content_length_limit(&self) -> usize {
        self.content_length_limit
    }

    /// Feed the parser. Returns [`Status::Done`] once a complete message has
    /// been consumed from `buf`.
    pub fn parse(&mut self, buf: &mut BytesMut) -> Result<Status> {
        loop {
            let state = self.state;
            self.state = match state {
                State::Start => {
                    let skip = buf
                        .iter()
                        .take_while(|byte| matches!(byte, b'\r' | b'\n'))
                        .count();
                    buf.advance(skip);
                    match buf.first() {
                        None => return Ok(Status::Hungry),
                        Some(&MAGIC) => State::DataHeader,
                        Some(_) => State::FirstLine,
                    }
                }
                State::DataHeader => {
                    if buf.len() < HEADER_LEN {
                        return Ok(Status::Hungry);
                    }
                    let header = buf.split_to(HEADER_LEN);
                    if header[0] != MAGIC {
                        return Err(Error::InterleavedInvalid);
                    }
                    State::DataPayload {
                        channel: header[1],
                        len: usize::from(u16::from_be_bytes([header[2], header[3]])),
                    }
                }
                State::DataPayload { channel, len } => {
                    if buf.len() < len {
                        return Ok(Status::Hungry);
                    }
                    self.data = Some(Data {
                        channel,
                        payload: buf.split_to(len).freeze(),
                    });
                    State::Done
                }
                State::FirstLine => match take_line(buf)? {
                    Some(line) => {
                        self.first_line = Some(parse_first_line(&line)?);
                        State::Header
                    }
                    None => return Ok(Status::Hungry),
                },
                State::Header => match take_line(buf)? {
                    Some(line) if line.is_empty() => self.end_of_head()?,
                    Some(line) => {
                        self.parse_header(&line)?;
                        State::Header
                    }
                    None => return Ok(Status::Hungry),
                },
                State::Body { len } => {
                    if buf.len() < len {
                        return Ok(Status::Hungry);
                    }
                    self.body = Some(buf.split_to(len).freeze());
                    State::Done
                }
                State::Done => return Ok(Status::Done),
            };
        }
    }

    /// Parse and, if a message is complete, return it and reset the parser
    /// for the next one.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Message>> {
        match self.parse(buf)? {
            Status::Hungry => Ok(None),
            Status::Done => {
                let limit = self.content_length_limit;
                let parser = std::mem::replace(self, Parser::with_content_length_limit(limit));
                parser.into_message().map(Some)
            }
        }
    }

    /// Turn a finished parser into the message it parsed.
    ///
    /// A request with an unknown method was consumed completely but yields
    /// [`Error::MethodUnknown`] carrying its `CSeq`.
    pub fn into_message(self) -> Result<Message> {
        if self.state != State::Done {
            return Err(Error::MessageIncomplete);
        }

        if let Some(data) = self.data {
            return Ok(Message::Data(data));
        }

        match self.first_line {
            Some(FirstLine::Request {
                method,
                uri,
                version,
            }) => Ok(Message::Request(Request {
                method,
                uri,
                version,
                headers: self.headers,
                body: self.body,
            })),
            Some(FirstLine::Response {
                version,
                status,
                reason,
            }) => Ok(Message::Response(Response {
                version,
                status,
                reason,
                headers: self.headers,
                body: self.body,
            })),
            Some(FirstLine::UnknownMethod { method }) => Err(Error::MethodUnknown {
                method,
                cseq: self
                    .headers
                    .get(Header::CSeq)
                    .and_then(|cseq| cseq.trim().parse().ok()),
            }),
            None => Err(Error::MessageIncomplete),
        }
    }

    fn parse_header(&mut self, line: &str) -> Result<()> {
        let (var, val) = line
            .split_once(':')
            .ok_or_else(|| Error::HeaderMalformed {
                line: line.to_string(),
            })?;
        let (var, val) = (var.trim(), val.trim());

        let Some(header) = Header::from_name(var) else {
            tracing::trace!(header = var, "ignoring unknown header");
            return Ok(());
        };

        if header.splits_on_comma() {
            for value in split_list(val) {
                self.headers.append(header, value);
            }
        } else if self.headers.append(header, val) {
            tracing::warn!(%header, value = val, "header repeated, keeping last value");
        }

        Ok(())
    }

    fn end_of_head(&self) -> Result<State> {
        let len = match self.headers.get(Header::ContentLength) {
            Some(value) => {
                value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| Error::ContentLengthNotInteger {
                        value: value.to_string(),
                    })?
            }
            None => 0,
        };

        if len > self.content_length_limit {
            return Err(Error::ContentLengthTooLarge {
                length: len,
                limit: self.content_length_limit,
            });
        }

        Ok(if len > 0 {
            State::Body { len }
        } else {
            State::Done
        })
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    Start,
    DataHeader,
    DataPayload { channel: ChannelId, len: usize },
    FirstLine,
    Header,
    Body { len: usize },
    Done,
}

enum FirstLine {
    Request {
        method: Method,
        uri: Uri,
        version: Version,
    },
    UnknownMethod {
        method: String,
    },
    Response {
        version: Version,
        status: StatusCode,
        reason: String,
    },
}

/// Take one line ending in LF off the buffer. A CR before the LF is stripped.
fn take_line(buf: &mut BytesMut) -> Result<Option<String>> {
    match buf.iter().position(|byte| *byte == b'\n') {
        Some(pos) if pos > MAX_LINE_LEN => Err(Error::LineTooLong { max: MAX_LINE_LEN }),
        Some(pos) => {
            let line = buf.split_to(pos + 1);
            let line = &line[..pos];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            std::str::from_utf8(line)
                .map(|line| Some(line.to_string()))
                .map_err(|_| Error::Encoding)
        }
        None if buf.len() > MAX_LINE_LEN => Err(Error::LineTooLong { max: MAX_LINE_LEN }),
        None => Ok(None),
    }
}

fn parse_first_line(line: &str) -> Result<FirstLine> {
    if line.starts_with("RTSP/") || line.starts_with("HTTP/") {
        parse_status_line(line)
    } else {
        parse_request_line(line)
    }
}

fn parse_request_line(line: &str) -> Result<FirstLine> {
    let mut parts = line.split_whitespace();

    let method = parts.next().ok_or_else(|| Error::RequestLineMalformed {
        line: line.to_string(),
    })?;

    let uri = parts.next().ok_or_else(|| Error::UriMissing {
        line: line.to_string(),
    })?;

    let version = parts.next().ok_or_else(|| Error::VersionMissing {
        line: line.to_string(),
    })?;

    if parts.next().is_some() {
        return Err(Error::RequestLineMalformed {
            line: line.to_string(),
        });
    }

    let version = parse_version(version, line)?;

    let Some(method) = Method::from_name(method) else {
        return Ok(FirstLine::UnknownMethod {
            method: method.to_string(),
        });
    };

    let uri = uri.parse::<Uri>().map_err(|_| Error::UriMalformed {
        line: line.to_string(),
        uri: uri.to_string(),
    })?;

    Ok(FirstLine::Request {
        method,
        uri,
        version,
    })
}

fn parse_status_line(line: &str) -> Result<FirstLine> {
    let (version, rest) = line
        .split_once(' ')
        .ok_or_else(|| Error::StatusCodeMissing {
            line: line.to_string(),
        })?;

    let version = parse_version(version, line)?;

    let rest = rest.trim_start();
    let (status, reason) = rest.split_once(' ').unwrap_or((rest, ""));
    if status.is_empty() {
        return Err(Error::StatusCodeMissing {
            line: line.to_string(),
        });
    }

    let status_code_not_integer = || Error::StatusCodeNotInteger {
        line: line.to_string(),
        status_code: status.to_string(),
    };
    if status.len() != 3 || !status.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(status_code_not_integer());
    }
    let status = status
        .parse::<StatusCode>()
        .map_err(|_| status_code_not_integer())?;

    Ok(FirstLine::Response {
        version,
        status,
        reason: reason.trim().to_string(),
    })
}

fn parse_version(part: &str, line: &str) -> Result<Version> {
    Version::from_name(part).ok_or_else(|| Error::VersionMalformed {
        line: line.to_string(),
        version: part.to_string(),
    })
}
