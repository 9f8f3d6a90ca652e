use std::fmt;

use rtsp_protocol as rtsp;

use crate::media::{Destination, Media, MediaError, Pipeline, PipelineError, PipelineState};
use crate::session::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Unconfigured,
    Ready,
    Playing,
    Paused,
    Stopped,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StreamState::Unconfigured => write!(f, "unconfigured"),
            StreamState::Ready => write!(f, "ready"),
            StreamState::Playing => write!(f, "playing"),
            StreamState::Paused => write!(f, "paused"),
            StreamState::Stopped => write!(f, "stopped"),
        }
    }
}

/// Transport negotiated for one stream of a session media.
#[derive(Debug)]
pub struct SessionStream {
    index: usize,
    state: StreamState,
    destination: Destination,
    requested: rtsp::Transport,
    granted: rtsp::Transport,
}

impl SessionStream {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn requested_transport(&self) -> &rtsp::Transport {
        &self.requested
    }

    pub fn granted_transport(&self) -> &rtsp::Transport {
        &self.granted
    }
}

/// A media bound to a session, with the pipeline producing it.
///
/// Dropping it stops the pipeline.
pub struct SessionMedia {
    media: Media,
    pipeline: Box<dyn Pipeline>,
    streams: Vec<Option<SessionStream>>,
}

impl SessionMedia {
    /// `media` must be prepared.
    pub fn new(media: Media) -> Result<Self, MediaError> {
        let pipeline = media.build_pipeline()?;
        let streams = media.streams().iter().map(|_| None).collect();
        tracing::trace!(path = media.path(), "created session media");
        Ok(Self {
            media,
            pipeline,
            streams,
        })
    }

    pub fn media(&self) -> &Media {
        &self.media
    }

    pub fn pipeline_state(&self) -> PipelineState {
        self.pipeline.state()
    }

    pub fn stream(&self, index: usize) -> Option<&SessionStream> {
        self.streams.get(index).and_then(Option::as_ref)
    }

    pub fn stream_state(&self, index: usize) -> StreamState {
        self.stream(index)
            .map(SessionStream::state)
            .unwrap_or(StreamState::Unconfigured)
    }

    pub fn streams(&self) -> impl Iterator<Item = &SessionStream> {
        self.streams.iter().flatten()
    }

    /// Whether any stream is still set up and not torn down.
    pub fn is_active(&self) -> bool {
        self.streams()
            .any(|stream| stream.state != StreamState::Stopped)
    }

    /// Hand a payload to stream `index`. Returns whether it was delivered,
    /// only playing streams are.
    pub fn push(&mut self, index: usize, payload: rtsp::Bytes) -> Result<bool, PipelineError> {
        if self.stream_state(index) != StreamState::Playing {
            return Ok(false);
        }
        self.pipeline.push(index, payload)?;
        Ok(true)
    }

    /// Negotiate a transport for stream `index` from the client's candidates,
    /// in order of preference. Renegotiating keeps the play state.
    pub(super) fn setup(
        &mut self,
        index: usize,
        candidates: &[rtsp::Transport],
        destination: Destination,
    ) -> Result<rtsp::Transport, SessionError> {
        if index >= self.streams.len() {
            return Err(SessionError::StreamNotFound { index });
        }

        let state = match self.stream_state(index) {
            StreamState::Unconfigured | StreamState::Stopped => StreamState::Ready,
            state => state,
        };
        if let Some(previous) = self.stream(index) {
            tracing::trace!(
                stream_index = index,
                requested = %previous.requested_transport(),
                granted = %previous.granted_transport(),
                "replacing transport",
            );
        }

        for requested in candidates {
            match self.pipeline.grant_transport(index, requested, &destination) {
                Ok(granted) => {
                    self.streams[index] = Some(SessionStream {
                        index,
                        state,
                        destination,
                        requested: requested.clone(),
                        granted: granted.clone(),
                    });
                    return Ok(granted);
                }
                Err(PipelineError::TransportNotSupported { reason }) => {
                    tracing::trace!(%requested, reason, "transport candidate rejected");
                }
                Err(err) => return Err(SessionError::Pipeline(err)),
            }
        }

        Err(SessionError::TransportNotSupported)
    }

    pub(super) fn play(&mut self, target: Option<usize>) -> Result<(), SessionError> {
        let targets = self.targets(target)?;
        if self.pipeline.state() != PipelineState::Playing {
            self.pipeline
                .set_state(PipelineState::Playing)
                .map_err(SessionError::Pipeline)?;
        }
        self.set_state(&targets, StreamState::Playing);
        Ok(())
    }

    pub(super) fn pause(&mut self, target: Option<usize>) -> Result<(), SessionError> {
        let targets = self.targets(target)?;
        if self.pipeline.state() == PipelineState::Playing {
            self.pipeline
                .set_state(PipelineState::Paused)
                .map_err(SessionError::Pipeline)?;
        }
        // Streams that are only ready stay ready.
        let playing = targets
            .into_iter()
            .filter(|index| self.stream_state(*index) == StreamState::Playing)
            .collect::<Vec<_>>();
        self.set_state(&playing, StreamState::Paused);
        Ok(())
    }

    /// Detach the targeted streams. Streams that are already stopped or were
    /// never set up are left alone.
    pub(super) fn teardown(&mut self, target: Option<usize>) -> Result<(), SessionError> {
        let targets = match target {
            Some(index) if index >= self.streams.len() => {
                return Err(SessionError::StreamNotFound { index });
            }
            Some(index) => vec![index],
            None => (0..self.streams.len()).collect(),
        };
        for index in targets {
            if let Some(stream) = self.streams[index].as_mut() {
                if stream.state != StreamState::Stopped {
                    self.pipeline.release_transport(index);
                    stream.state = StreamState::Stopped;
                    tracing::trace!(path = self.media.path(), stream_index = index, "stream torn down");
                }
            }
        }
        Ok(())
    }

    /// Streams addressed by a PLAY or PAUSE: every live stream. A single
    /// stream can only be addressed when the media has no other.
    fn targets(&self, target: Option<usize>) -> Result<Vec<usize>, SessionError> {
        let is_live = |state: StreamState| {
            matches!(
                state,
                StreamState::Ready | StreamState::Playing | StreamState::Paused
            )
        };
        match target {
            Some(index) if index >= self.streams.len() => {
                Err(SessionError::StreamNotFound { index })
            }
            Some(_) if self.streams.len() > 1 => Err(SessionError::OnlyAggregateAllowed),
            Some(index) => {
                let state = self.stream_state(index);
                if is_live(state) {
                    Ok(vec![index])
                } else {
                    Err(SessionError::InvalidState { state })
                }
            }
            None => {
                let targets = self
                    .streams()
                    .filter(|stream| is_live(stream.state))
                    .map(SessionStream::index)
                    .collect::<Vec<_>>();
                if targets.is_empty() {
                    Err(SessionError::InvalidState {
                        state: StreamState::Stopped,
                    })
                } else {
                    Ok(targets)
                }
            }
        }
    }

    fn set_state(&mut self, targets: &[usize], state: StreamState) {
        for index in targets {
            if let Some(stream) = self.streams[*index].as_mut() {
                stream.state = state;
            }
        }
    }
}

impl Drop for SessionMedia {
    fn drop(&mut self) {
        if self.pipeline.state() != PipelineState::Stopped {
            if let Err(err) = self.pipeline.set_state(PipelineState::Stopped) {
                tracing::warn!(path = self.media.path(), %err, "failed to stop pipeline");
            }
        }
        tracing::trace!(path = self.media.path(), "destroyed session media");
    }
}
