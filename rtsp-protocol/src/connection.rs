use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;

use bytes::BytesMut;

use super::{
    error::{Error, Result},
    header::Header,
    message::{Message, Uri},
    parse::Parser,
    serialize::Serialize,
    session::SessionHeader,
};

pub const DEFAULT_PORT: u16 = 554;

const READ_CHUNK_SIZE: usize = 4096;

/// Byte stream a [`Connection`] runs over.
pub trait Stream: Read + Write {
    /// Shut down both directions. Must unblock a concurrent read.
    fn shutdown(&self) -> io::Result<()>;
}

impl Stream for TcpStream {
    fn shutdown(&self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

/// Blocking RTSP connection.
///
/// Requests sent over the connection are stamped with an increasing `CSeq`
/// and, once a response carried one, the session id. One reader and one
/// writer at a time.
pub struct Connection<S: Stream = TcpStream> {
    stream: Option<S>,
    parser: Parser,
    buf: BytesMut,
    cseq: u32,
    session_id: Option<String>,
    session_timeout: Option<u64>,
    remember_session_id: bool,
}

impl Connection<TcpStream> {
    /// Connect to the host and port in `url`. The port defaults to 554.
    pub fn open(url: &str) -> Result<Self> {
        let url_invalid = || Error::UrlInvalid {
            url: url.to_string(),
        };

        let uri = url.parse::<Uri>().map_err(|_| url_invalid())?;
        if !uri
            .scheme_str()
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("rtsp"))
        {
            return Err(url_invalid());
        }

        let host = uri.host().ok_or_else(url_invalid)?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = uri.port_u16().unwrap_or(DEFAULT_PORT);

        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|_| Error::AddressUnresolved {
                host: host.to_string(),
            })?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect(addr) {
                Ok(stream) => {
                    tracing::debug!(%addr, "connected");
                    return Ok(Self::new(stream));
                }
                Err(err) => {
                    tracing::debug!(%addr, %err, "failed to connect");
                    last_err = Some(err);
                }
            }
        }

        Err(match last_err {
            Some(err) => Error::Io(err),
            None => Error::AddressUnresolved {
                host: host.to_string(),
            },
        })
    }

    /// Handle that can shut the socket down from another thread.
    pub fn shutdown_handle(&self) -> Result<ShutdownHandle> {
        let stream = self.stream.as_ref().ok_or(Error::ConnectionClosed)?;
        Ok(ShutdownHandle(Arc::new(stream.try_clone()?)))
    }
}

impl<S: Stream> Connection<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
            parser: Parser::new(),
            buf: BytesMut::new(),
            cseq: 1,
            session_id: None,
            session_timeout: None,
            remember_session_id: true,
        }
    }

    /// Send a message.
    ///
    /// Requests get the next `CSeq` and the latched session id (unless they
    /// already carry a `Session` header). Responses and data are written
    /// as they are. The `CSeq` is only used up once the request was written.
    pub fn send(&mut self, message: impl Into<Message>) -> Result<()> {
        let mut message = message.into();
        let mut next_cseq = None;
        if let Message::Request(request) = &mut message {
            next_cseq = Some(self.cseq.checked_add(1).ok_or(Error::CSeqExhausted)?);
            request.headers.insert(Header::CSeq, self.cseq.to_string());
            if let Some(session_id) = &self.session_id {
                if !request.headers.contains(Header::Session) {
                    request.headers.insert(Header::Session, session_id.clone());
                }
            }
        }

        tracing::trace!(%message, "send");

        let mut buf = BytesMut::new();
        message.serialize(&mut buf)?;

        let stream = self.stream.as_mut().ok_or(Error::ConnectionClosed)?;
        stream.write_all(&buf)?;
        stream.flush()?;
        if let Some(next_cseq) = next_cseq {
            self.cseq = next_cseq;
        }
        Ok(())
    }

    /// Block until a complete message arrived.
    pub fn receive(&mut self) -> Result<Message> {
        let mut chunk = [0_u8; READ_CHUNK_SIZE];
        loop {
            if let Some(message) = self.parser.decode(&mut self.buf)? {
                tracing::trace!(%message, "receive");
                if let Message::Response(response) = &message {
                    if let Some(value) = response.session() {
                        self.latch_session(value);
                    }
                }
                return Ok(message);
            }

            let stream = self.stream.as_mut().ok_or(Error::ConnectionClosed)?;
            match stream.read(&mut chunk) {
                Ok(0) => return Err(Error::Shutdown),
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(Error::Io(err)),
            }
        }
    }

    /// Close the socket. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            match stream.shutdown() {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotConnected => {}
                Err(err) => return Err(Error::Io(err)),
            }
        }
        Ok(())
    }

    pub const fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    pub const fn get_ref(&self) -> Option<&S> {
        self.stream.as_ref()
    }

    /// `CSeq` the next request will carry.
    pub const fn next_cseq(&self) -> u32 {
        self.cseq
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub const fn session_timeout(&self) -> Option<u64> {
        self.session_timeout
    }

    pub fn set_remember_session_id(&mut self, remember: bool) {
        self.remember_session_id = remember;
        if !remember {
            self.session_id = None;
            self.session_timeout = None;
        }
    }

    pub fn set_content_length_limit(&mut self, limit: usize) {
        self.parser.set_content_length_limit(limit);
    }

    fn latch_session(&mut self, value: &str) {
        if !self.remember_session_id {
            return;
        }
        let id = value.split(';').next().unwrap_or_default().trim();
        if id.is_empty() {
            tracing::warn!(value, "ignoring session header without id");
            return;
        }
        // The id is latched even if its parameters are malformed.
        match value.parse::<SessionHeader>() {
            Ok(session) => self.session_timeout = session.timeout(),
            Err(err) => tracing::warn!(%err, "ignoring session header parameters"),
        }
        self.session_id = Some(id.to_string());
    }
}

impl<S: Stream> Drop for Connection<S> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::debug!(%err, "failed to close connection");
        }
    }
}

/// Shuts down the socket of a [`Connection`] from another thread. A blocked
/// `receive` then returns a transport error.
#[derive(Clone)]
pub struct ShutdownHandle(Arc<TcpStream>);

impl ShutdownHandle {
    pub fn shutdown(&self) -> Result<()> {
        match self.0.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(err) => Err(Error::Io(err)),
        }
    }
}
