pub mod error;
pub mod udp;

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, OnceLock};

use tokio::sync::mpsc;

use rtsp_protocol as rtsp;

pub use error::{MediaError, PipelineError};

pub type MediaPath = String;
pub type MediaPathRef = str;

/// Outbound half of a client connection.
pub type MessageTx = mpsc::UnboundedSender<rtsp::Message>;

/// Static description of one stream as the factory knows it before any data
/// flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub media: String,
    pub encoding: String,
    pub payload_type: u8,
    pub clock_rate: u32,
}

impl fmt::Display for StreamInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {}/{} (pt {})",
            self.media, self.encoding, self.clock_rate, self.payload_type,
        )
    }
}

/// Capabilities a pipeline settled on for a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caps {
    pub encoding: String,
    pub clock_rate: u32,
    pub parameters: Option<String>,
}

impl From<&StreamInfo> for Caps {
    fn from(info: &StreamInfo) -> Self {
        Caps {
            encoding: info.encoding.clone(),
            clock_rate: info.clock_rate,
            parameters: None,
        }
    }
}

impl fmt::Display for Caps {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.encoding, self.clock_rate)?;
        if let Some(parameters) = self.parameters.as_ref() {
            write!(f, ";{parameters}")?;
        }
        Ok(())
    }
}

pub struct Stream {
    index: usize,
    info: StreamInfo,
    caps: OnceLock<Caps>,
}

impl Stream {
    pub fn new(index: usize, info: StreamInfo) -> Self {
        Self {
            index,
            info,
            caps: OnceLock::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    /// Publish negotiated capabilities. Only the first call has an effect,
    /// later calls return `false`.
    pub fn set_caps(&self, caps: Caps) -> bool {
        tracing::debug!(stream_index = self.index, %caps, "publishing stream caps");
        self.caps.set(caps).is_ok()
    }

    /// Unset until the pipeline has seen the first buffer for this stream.
    pub fn caps(&self) -> Option<&Caps> {
        self.caps.get()
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Stream")
            .field("index", &self.index)
            .field("info", &self.info)
            .field("caps", &self.caps.get())
            .finish()
    }
}

/// One playable resource. Starts out unprepared, and only knows its streams
/// after [`Media::prepare`].
pub struct Media {
    url: rtsp::Uri,
    path: MediaPath,
    factory: Option<Arc<dyn MediaFactory>>,
    streams: Vec<Arc<Stream>>,
}

impl Media {
    pub fn new(url: &str) -> Result<Self, MediaError> {
        let parsed = url
            .parse::<rtsp::Uri>()
            .map_err(|_| MediaError::UrlInvalid {
                url: url.to_string(),
            })?;
        let path = normalize_path(parsed.path());
        Ok(Self {
            url: parsed,
            path,
            factory: None,
            streams: Vec::new(),
        })
    }

    pub fn url(&self) -> &rtsp::Uri {
        &self.url
    }

    pub fn path(&self) -> &MediaPathRef {
        &self.path
    }

    pub fn is_prepared(&self) -> bool {
        self.factory.is_some()
    }

    /// Resolve the media through `mounts` and populate its streams. Does
    /// nothing if already prepared.
    pub fn prepare(&mut self, mounts: &Mounts) -> Result<(), MediaError> {
        if self.is_prepared() {
            return Ok(());
        }

        let factory = mounts.get(&self.path).ok_or_else(|| MediaError::NotFound {
            path: self.path.clone(),
        })?;
        let streams = factory.streams()?;
        if streams.is_empty() {
            return Err(MediaError::NoStreams {
                path: self.path.clone(),
            });
        }

        self.streams = streams
            .into_iter()
            .enumerate()
            .map(|(index, info)| Arc::new(Stream::new(index, info)))
            .collect();
        self.factory = Some(factory);
        tracing::debug!(path = %self.path, streams = self.streams.len(), "prepared media");
        Ok(())
    }

    pub fn streams(&self) -> &[Arc<Stream>] {
        &self.streams
    }

    pub fn stream(&self, index: usize) -> Option<&Arc<Stream>> {
        self.streams.get(index)
    }

    pub fn build_pipeline(&self) -> Result<Box<dyn Pipeline>, MediaError> {
        let factory = self.factory.as_ref().ok_or(MediaError::NotPrepared)?;
        factory.build(&self.streams).map_err(MediaError::Pipeline)
    }
}

impl fmt::Display for Media {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({} streams)", self.url, self.streams.len())
    }
}

/// Produces pipelines for one mounted path.
pub trait MediaFactory: Send + Sync {
    /// Streams a pipeline built by this factory will carry.
    fn streams(&self) -> Result<Vec<StreamInfo>, MediaError>;

    fn build(&self, streams: &[Arc<Stream>]) -> Result<Box<dyn Pipeline>, PipelineError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Stopped,
    Paused,
    Playing,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineState::Stopped => write!(f, "stopped"),
            PipelineState::Paused => write!(f, "paused"),
            PipelineState::Playing => write!(f, "playing"),
        }
    }
}

/// A running producer for one media. Owned by exactly one session media.
pub trait Pipeline: Send {
    fn state(&self) -> PipelineState;

    fn set_state(&mut self, state: PipelineState) -> Result<(), PipelineError>;

    /// Turn a transport requested by the client into a concrete one and
    /// route the stream there. Replaces an earlier grant for the same stream.
    fn grant_transport(
        &mut self,
        stream_index: usize,
        requested: &rtsp::Transport,
        destination: &Destination,
    ) -> Result<rtsp::Transport, PipelineError>;

    fn release_transport(&mut self, stream_index: usize);

    /// Send a buffer belonging to `stream_index` downstream.
    fn push(&mut self, stream_index: usize, payload: rtsp::Bytes) -> Result<(), PipelineError>;
}

/// Where a client can be reached.
#[derive(Debug, Clone)]
pub struct Destination {
    pub peer: IpAddr,
    /// Control connection, for RTP over TCP.
    pub sink: Option<MessageTx>,
}

/// Factories by mount path.
#[derive(Clone, Default)]
pub struct Mounts {
    factories: HashMap<MediaPath, Arc<dyn MediaFactory>>,
}

impl Mounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `factory` at `path`, returning the factory it replaces.
    pub fn add(
        &mut self,
        path: &MediaPathRef,
        factory: Arc<dyn MediaFactory>,
    ) -> Option<Arc<dyn MediaFactory>> {
        self.factories.insert(normalize_path(path), factory)
    }

    pub fn get(&self, path: &MediaPathRef) -> Option<Arc<dyn MediaFactory>> {
        self.factories.get(&normalize_path(path)).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

/// Leading slash, no trailing slash.
pub fn normalize_path(path: &MediaPathRef) -> MediaPath {
    let path = path.trim_end_matches('/');
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// Split a trailing `stream=N` control segment off a URL or path.
pub fn split_control(url: &str) -> (&str, Option<usize>) {
    let url = url.trim_end_matches('/');
    let control = url.rsplit_once('/').and_then(|(resource, control)| {
        control
            .strip_prefix("stream=")
            .and_then(|index| index.parse::<usize>().ok())
            .map(|index| (resource, index))
    });
    match control {
        Some((resource, index)) => (resource, Some(index)),
        None => (url, None),
    }
}
