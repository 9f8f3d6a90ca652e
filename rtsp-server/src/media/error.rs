use std::error;
use std::fmt;
use std::io;

use rtsp_protocol::Status;

#[derive(Debug)]
pub enum MediaError {
    UrlInvalid { url: String },
    NotFound { path: String },
    NoStreams { path: String },
    NotPrepared,
    Pipeline(PipelineError),
}

impl MediaError {
    pub fn status(&self) -> Status {
        match self {
            MediaError::UrlInvalid { .. } => Status::BadRequest,
            MediaError::NotFound { .. } => Status::NotFound,
            MediaError::NoStreams { .. } | MediaError::NotPrepared | MediaError::Pipeline(_) => {
                Status::ServiceUnavailable
            }
        }
    }
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MediaError::UrlInvalid { url } => write!(f, "invalid media url: {url}"),
            MediaError::NotFound { path } => write!(f, "no media mounted at: {path}"),
            MediaError::NoStreams { path } => write!(f, "media has no streams: {path}"),
            MediaError::NotPrepared => write!(f, "media not prepared"),
            MediaError::Pipeline(err) => write!(f, "failed to build pipeline: {err}"),
        }
    }
}

impl error::Error for MediaError {}

#[derive(Debug)]
pub enum PipelineError {
    StreamNotFound { index: usize },
    TransportNotSupported { reason: &'static str },
    SinkClosed,
    Io(io::Error),
}

impl PipelineError {
    pub fn status(&self) -> Status {
        match self {
            PipelineError::StreamNotFound { .. } => Status::NotFound,
            PipelineError::TransportNotSupported { .. } => Status::UnsupportedTransport,
            PipelineError::SinkClosed | PipelineError::Io(_) => Status::ServiceUnavailable,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineError::StreamNotFound { index } => write!(f, "stream not found: {index}"),
            PipelineError::TransportNotSupported { reason } => {
                write!(f, "transport not supported: {reason}")
            }
            PipelineError::SinkClosed => write!(f, "sink closed"),
            PipelineError::Io(err) => write!(f, "{err}"),
        }
    }
}

impl From<io::Error> for PipelineError {
    fn from(err: io::Error) -> Self {
        PipelineError::Io(err)
    }
}

impl error::Error for PipelineError {}
