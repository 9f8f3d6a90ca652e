pub mod session_manager;
pub mod session_media;

use std::collections::hash_map::{Entry, HashMap};
use std::error;
use std::fmt;
use std::time::{Duration, Instant};

use rand::distributions::Alphanumeric;
use rand::Rng;

use rtsp_protocol as rtsp;

use crate::media::{self, Destination, Media, MediaError, MediaPath, Mounts, PipelineError};

pub use session_media::{SessionMedia, SessionStream, StreamState};

/// Per-client state, reachable from any connection through its id.
pub struct Session {
    id: SessionId,
    timeout: Duration,
    last_activity: Instant,
    medias: HashMap<MediaPath, SessionMedia>,
}

impl Session {
    pub fn new(id: SessionId, timeout: Duration) -> Self {
        Self {
            id,
            timeout,
            last_activity: Instant::now(),
            medias: HashMap::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Value for the `Session` response header.
    pub fn header(&self) -> rtsp::SessionHeader {
        rtsp::SessionHeader::new(self.id.as_str()).with_timeout(self.timeout.as_secs())
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_activity) > self.timeout
    }

    pub fn media(&self, path: &str) -> Option<&SessionMedia> {
        self.medias.get(&media::normalize_path(path))
    }

    pub fn media_mut(&mut self, path: &str) -> Option<&mut SessionMedia> {
        self.medias.get_mut(&media::normalize_path(path))
    }

    /// No media left, the session has nothing to play.
    pub fn is_empty(&self) -> bool {
        self.medias.is_empty()
    }

    /// Set up the stream addressed by `url`. The media and its pipeline are
    /// created on the first setup. Nothing changes if this fails.
    ///
    /// Without a `stream=N` suffix the media must have exactly one stream.
    pub fn setup(
        &mut self,
        url: &str,
        mounts: &Mounts,
        candidates: &[rtsp::Transport],
        destination: Destination,
    ) -> Result<rtsp::Transport, SessionError> {
        let (url, stream_index) = media::split_control(url);
        let media = Media::new(url)?;
        let id = &self.id;
        match self.medias.entry(media.path().to_string()) {
            Entry::Occupied(entry) => {
                let session_media = entry.into_mut();
                let index = resolve_stream_index(session_media.media(), stream_index)?;
                tracing::trace!(session_id = %id, path = session_media.media().path(), stream_index = index, "renegotiating stream");
                session_media.setup(index, candidates, destination)
            }
            Entry::Vacant(entry) => {
                let mut media = media;
                media.prepare(mounts)?;
                let index = resolve_stream_index(&media, stream_index)?;
                let mut session_media = SessionMedia::new(media)?;
                let granted = session_media.setup(index, candidates, destination)?;
                tracing::debug!(session_id = %id, path = entry.key().as_str(), stream_index = index, "media set up");
                entry.insert(session_media);
                Ok(granted)
            }
        }
    }

    /// Start or resume the streams addressed by `path`. Only live ranges are
    /// honored.
    pub fn play(&mut self, path: &str, range: Option<&rtsp::Range>) -> Result<(), SessionError> {
        let (path, stream_index) = media::split_control(path);
        let session_media = self.media_mut(path).ok_or(SessionError::InvalidState {
            state: StreamState::Unconfigured,
        })?;
        if let Some(range) = range {
            if !range.is_live() {
                tracing::debug!(%range, "session does not support playing with this range");
                return Err(SessionError::RangeNotSupported);
            }
        }
        session_media.play(stream_index)?;
        let pipeline_state = session_media.pipeline_state();
        tracing::debug!(session_id = %self.id, path, ?pipeline_state, "playing");
        Ok(())
    }

    pub fn pause(&mut self, path: &str) -> Result<(), SessionError> {
        let (path, stream_index) = media::split_control(path);
        let session_media = self.media_mut(path).ok_or(SessionError::InvalidState {
            state: StreamState::Unconfigured,
        })?;
        session_media.pause(stream_index)?;
        let pipeline_state = session_media.pipeline_state();
        tracing::debug!(session_id = %self.id, path, ?pipeline_state, "paused");
        Ok(())
    }

    /// Tear down the streams addressed by `path`, destroying the media once
    /// none of its streams is left. Tearing down what is already gone
    /// succeeds.
    pub fn teardown(&mut self, path: &str) -> Result<StreamState, SessionError> {
        let (path, stream_index) = media::split_control(path);
        let path = media::normalize_path(path);
        if let Some(session_media) = self.medias.get_mut(&path) {
            session_media.teardown(stream_index)?;
            if !session_media.is_active() {
                self.medias.remove(&path);
            }
            tracing::debug!(session_id = %self.id, %path, "torn down");
        } else {
            tracing::trace!(session_id = %self.id, %path, "nothing to tear down");
        }
        Ok(StreamState::Stopped)
    }

    pub fn teardown_all(&mut self) {
        tracing::trace!(session_id = %self.id, medias = self.medias.len(), "tearing down session");
        self.medias.clear();
    }
}

fn resolve_stream_index(media: &Media, stream_index: Option<usize>) -> Result<usize, SessionError> {
    match stream_index {
        Some(index) if media.stream(index).is_some() => Ok(index),
        Some(index) => Err(SessionError::StreamNotFound { index }),
        None if media.streams().len() == 1 => Ok(0),
        None => Err(SessionError::AggregateNotAllowed),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    const SESSION_ID_LEN: usize = 16;

    pub fn generate() -> SessionId {
        SessionId(
            rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(Self::SESSION_ID_LEN)
                .map(char::from)
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for SessionId {
    fn from(session_id: &str) -> Self {
        SessionId(session_id.to_string())
    }
}

#[derive(Debug)]
pub enum SessionError {
    Media(MediaError),
    Pipeline(PipelineError),
    StreamNotFound { index: usize },
    TransportNotSupported,
    AggregateNotAllowed,
    OnlyAggregateAllowed,
    InvalidState { state: StreamState },
    RangeNotSupported,
}

impl SessionError {
    pub fn status(&self) -> rtsp::Status {
        match self {
            SessionError::Media(err) => err.status(),
            SessionError::Pipeline(err) => err.status(),
            SessionError::StreamNotFound { .. } => rtsp::Status::NotFound,
            SessionError::TransportNotSupported => rtsp::Status::UnsupportedTransport,
            SessionError::AggregateNotAllowed => rtsp::Status::AggregateOperationNotAllowed,
            SessionError::OnlyAggregateAllowed => rtsp::Status::OnlyAggregateOperationAllowed,
            SessionError::InvalidState { .. } => rtsp::Status::MethodNotValidInThisState,
            SessionError::RangeNotSupported => rtsp::Status::InvalidRange,
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SessionError::Media(err) => write!(f, "{err}"),
            SessionError::Pipeline(err) => write!(f, "pipeline: {err}"),
            SessionError::StreamNotFound { index } => write!(f, "stream not found: {index}"),
            SessionError::TransportNotSupported => write!(f, "none of the transports is supported"),
            SessionError::AggregateNotAllowed => {
                write!(f, "media has multiple streams, set up one at a time")
            }
            SessionError::OnlyAggregateAllowed => {
                write!(f, "media has multiple streams, control them together")
            }
            SessionError::InvalidState { state } => {
                write!(f, "method not valid in state: {state}")
            }
            SessionError::RangeNotSupported => write!(f, "range not supported"),
        }
    }
}

impl From<MediaError> for SessionError {
    fn from(err: MediaError) -> Self {
        SessionError::Media(err)
    }
}

impl error::Error for SessionError {}

#[cfg(test)]
mod tests {

    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use rtsp_protocol as rtsp;

    use super::{Session, SessionError, SessionId, StreamState};
    use crate::media::{
        Destination, MediaError, MediaFactory, Mounts, Pipeline, PipelineError, PipelineState,
        Stream, StreamInfo,
    };

    const URL: &str = "rtsp://example.com/live";
    const STREAM_0: &str = "rtsp://example.com/live/stream=0";
    const STREAM_1: &str = "rtsp://example.com/live/stream=1";

    /// Records every state the pipeline is asked to go to.
    #[derive(Default)]
    struct Recorder {
        states: Mutex<Vec<PipelineState>>,
        builds: Mutex<usize>,
        fail_play: bool,
        fail_build: bool,
    }

    struct TestFactory {
        streams: usize,
        recorder: Arc<Recorder>,
    }

    impl MediaFactory for TestFactory {
        fn streams(&self) -> Result<Vec<StreamInfo>, MediaError> {
            Ok((0..self.streams)
                .map(|index| StreamInfo {
                    media: if index == 0 { "video" } else { "audio" }.to_string(),
                    encoding: "H264".to_string(),
                    payload_type: 96 + index as u8,
                    clock_rate: 90000,
                })
                .collect())
        }

        fn build(&self, streams: &[Arc<Stream>]) -> Result<Box<dyn Pipeline>, PipelineError> {
            if self.recorder.fail_build {
                return Err(PipelineError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "no resources",
                )));
            }
            *self.recorder.builds.lock().unwrap() += 1;
            Ok(Box::new(TestPipeline {
                streams: streams.len(),
                state: PipelineState::Stopped,
                recorder: self.recorder.clone(),
            }))
        }
    }

    struct TestPipeline {
        streams: usize,
        state: PipelineState,
        recorder: Arc<Recorder>,
    }

    impl Pipeline for TestPipeline {
        fn state(&self) -> PipelineState {
            self.state
        }

        fn set_state(&mut self, state: PipelineState) -> Result<(), PipelineError> {
            if state == PipelineState::Playing && self.recorder.fail_play {
                return Err(PipelineError::SinkClosed);
            }
            self.recorder.states.lock().unwrap().push(state);
            self.state = state;
            Ok(())
        }

        fn grant_transport(
            &mut self,
            stream_index: usize,
            requested: &rtsp::Transport,
            _destination: &Destination,
        ) -> Result<rtsp::Transport, PipelineError> {
            if requested.is_tcp() {
                return Err(PipelineError::TransportNotSupported { reason: "tcp" });
            }
            let client_port = *requested.client_port().ok_or(
                PipelineError::TransportNotSupported {
                    reason: "client_port missing",
                },
            )?;
            let server_port = 6000 + 2 * stream_index as u16;
            Ok(rtsp::Transport::new()
                .with_parameter(rtsp::Parameter::Unicast)
                .with_parameter(rtsp::Parameter::ClientPort(client_port))
                .with_parameter(rtsp::Parameter::ServerPort(rtsp::Port::Range(
                    server_port,
                    server_port + 1,
                ))))
        }

        fn release_transport(&mut self, _stream_index: usize) {}

        fn push(&mut self, stream_index: usize, _payload: rtsp::Bytes) -> Result<(), PipelineError> {
            if stream_index < self.streams {
                Ok(())
            } else {
                Err(PipelineError::StreamNotFound {
                    index: stream_index,
                })
            }
        }
    }

    fn mounts(recorder: Arc<Recorder>) -> Mounts {
        let mut mounts = Mounts::new();
        mounts.add(
            "/live",
            Arc::new(TestFactory {
                streams: 2,
                recorder,
            }),
        );
        mounts
    }

    fn single(recorder: Arc<Recorder>) -> Mounts {
        let mut mounts = Mounts::new();
        mounts.add(
            "/live",
            Arc::new(TestFactory {
                streams: 1,
                recorder,
            }),
        );
        mounts
    }

    fn session() -> Session {
        Session::new(SessionId::generate(), Duration::from_secs(60))
    }

    fn destination() -> Destination {
        Destination {
            peer: IpAddr::V4(Ipv4Addr::LOCALHOST),
            sink: None,
        }
    }

    fn udp(client_port: &str) -> Vec<rtsp::Transport> {
        vec![format!("RTP/AVP;unicast;client_port={client_port}")
            .parse()
            .unwrap()]
    }

    #[test]
    fn setup_play_pause_teardown() {
        let recorder = Arc::new(Recorder::default());
        let mounts = mounts(recorder.clone());
        let mut session = session();

        let granted = session
            .setup(STREAM_0, &mounts, &udp("5000-5001"), destination())
            .unwrap();
        assert_eq!(granted.server_port(), Some(&rtsp::Port::Range(6000, 6001)));
        let media = session.media("/live").unwrap();
        assert_eq!(media.media().streams().len(), 2);
        assert_eq!(media.stream_state(0), StreamState::Ready);
        assert_eq!(media.stream_state(1), StreamState::Unconfigured);
        assert_eq!(
            media.stream(0).unwrap().requested_transport().client_port(),
            Some(&rtsp::Port::Range(5000, 5001)),
        );
        assert_eq!(media.stream(0).unwrap().granted_transport(), &granted);

        session.play("/live", None).unwrap();
        let media = session.media("/live").unwrap();
        assert_eq!(media.stream_state(0), StreamState::Playing);
        assert_eq!(media.pipeline_state(), PipelineState::Playing);

        session.pause("/live").unwrap();
        let media = session.media("/live").unwrap();
        assert_eq!(media.stream_state(0), StreamState::Paused);
        assert_eq!(media.pipeline_state(), PipelineState::Paused);

        assert_eq!(
            session.teardown("/live").unwrap(),
            StreamState::Stopped
        );
        assert!(session.media("/live").is_none());
        assert!(session.is_empty());
        assert_eq!(
            *recorder.states.lock().unwrap(),
            vec![
                PipelineState::Playing,
                PipelineState::Paused,
                PipelineState::Stopped,
            ],
        );
    }

    #[test]
    fn play_before_setup_is_state_error() {
        let recorder = Arc::new(Recorder::default());
        let mut session = session();
        let err = session.play("/live", None).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidState {
                state: StreamState::Unconfigured
            },
        ));
        assert_eq!(err.status(), rtsp::Status::MethodNotValidInThisState);
        assert!(recorder.states.lock().unwrap().is_empty());
        assert_eq!(*recorder.builds.lock().unwrap(), 0);
    }

    #[test]
    fn play_unknown_stream_is_not_found() {
        let recorder = Arc::new(Recorder::default());
        let mounts = mounts(recorder.clone());
        let mut session = session();
        session
            .setup(STREAM_0, &mounts, &udp("5000-5001"), destination())
            .unwrap();
        assert!(matches!(
            session.play("/live/stream=2", None),
            Err(SessionError::StreamNotFound { index: 2 }),
        ));
        assert!(recorder.states.lock().unwrap().is_empty());

        let mut session = Session::new(SessionId::generate(), Duration::from_secs(60));
        session
            .setup(URL, &single(recorder.clone()), &udp("5000-5001"), destination())
            .unwrap();
        // A single stream may be addressed on its own.
        session.play("/live/stream=0", None).unwrap();
        assert_eq!(
            session.media("/live").unwrap().stream_state(0),
            StreamState::Playing
        );
        assert!(matches!(
            session.play("/live/stream=1", None),
            Err(SessionError::StreamNotFound { index: 1 }),
        ));
    }

    #[test]
    fn multi_stream_media_is_controlled_as_a_whole() {
        let recorder = Arc::new(Recorder::default());
        let mounts = mounts(recorder.clone());
        let mut session = session();
        session
            .setup(STREAM_0, &mounts, &udp("5000-5001"), destination())
            .unwrap();
        session
            .setup(STREAM_1, &mounts, &udp("5002-5003"), destination())
            .unwrap();

        let err = session.play("/live/stream=1", None).unwrap_err();
        assert!(matches!(err, SessionError::OnlyAggregateAllowed));
        assert_eq!(err.status(), rtsp::Status::OnlyAggregateOperationAllowed);
        assert!(recorder.states.lock().unwrap().is_empty());

        session.play("/live", None).unwrap();
        let err = session.pause("/live/stream=0").unwrap_err();
        assert!(matches!(err, SessionError::OnlyAggregateAllowed));
        let media = session.media("/live").unwrap();
        assert_eq!(media.stream_state(0), StreamState::Playing);
        assert_eq!(media.stream_state(1), StreamState::Playing);
        assert_eq!(media.pipeline_state(), PipelineState::Playing);

        session.pause("/live").unwrap();
        let media = session.media("/live").unwrap();
        assert_eq!(media.stream_state(0), StreamState::Paused);
        assert_eq!(media.stream_state(1), StreamState::Paused);
        assert_eq!(media.pipeline_state(), PipelineState::Paused);
    }

    #[test]
    fn push_only_reaches_playing_streams() {
        let recorder = Arc::new(Recorder::default());
        let mounts = mounts(recorder);
        let mut session = session();
        session
            .setup(STREAM_0, &mounts, &udp("5000-5001"), destination())
            .unwrap();
        session.play("/live", None).unwrap();
        // Set up while the pipeline already plays.
        session
            .setup(STREAM_1, &mounts, &udp("5002-5003"), destination())
            .unwrap();

        let media = session.media_mut("/live").unwrap();
        assert_eq!(media.stream_state(1), StreamState::Ready);
        assert!(media.push(0, rtsp::Bytes::from_static(b"rtp")).unwrap());
        assert!(!media.push(1, rtsp::Bytes::from_static(b"rtp")).unwrap());

        session.pause("/live").unwrap();
        let media = session.media_mut("/live").unwrap();
        assert!(!media.push(0, rtsp::Bytes::from_static(b"rtp")).unwrap());
    }

    #[test]
    fn teardown_is_idempotent() {
        let recorder = Arc::new(Recorder::default());
        let mounts = mounts(recorder);
        let mut session = session();
        session
            .setup(STREAM_0, &mounts, &udp("5000-5001"), destination())
            .unwrap();
        assert_eq!(
            session.teardown("/live/stream=0").unwrap(),
            StreamState::Stopped
        );
        assert_eq!(
            session.teardown("/live/stream=0").unwrap(),
            StreamState::Stopped
        );
        assert!(session.is_empty());
    }

    #[test]
    fn teardown_one_stream_keeps_media() {
        let recorder = Arc::new(Recorder::default());
        let mounts = mounts(recorder);
        let mut session = session();
        session
            .setup(STREAM_0, &mounts, &udp("5000-5001"), destination())
            .unwrap();
        session
            .setup(
                STREAM_1,
                &mounts,
                &udp("5002-5003"),
                destination(),
            )
            .unwrap();
        session.play("/live", None).unwrap();

        session.teardown("/live/stream=0").unwrap();
        let media = session.media("/live").unwrap();
        assert_eq!(media.stream_state(0), StreamState::Stopped);
        assert_eq!(media.stream_state(1), StreamState::Playing);
        assert_eq!(media.pipeline_state(), PipelineState::Playing);

        // A stopped stream can be set up again.
        session
            .setup(STREAM_0, &mounts, &udp("5000-5001"), destination())
            .unwrap();
        assert_eq!(
            session.media("/live").unwrap().stream_state(0),
            StreamState::Ready
        );

        session.teardown("/live").unwrap();
        assert!(session.is_empty());
    }

    #[test]
    fn renegotiate_keeps_play_state() {
        let recorder = Arc::new(Recorder::default());
        let mounts = mounts(recorder.clone());
        let mut session = session();
        session
            .setup(STREAM_0, &mounts, &udp("5000-5001"), destination())
            .unwrap();
        session.play("/live", None).unwrap();
        session
            .setup(STREAM_0, &mounts, &udp("7000-7001"), destination())
            .unwrap();
        let media = session.media("/live").unwrap();
        assert_eq!(media.stream_state(0), StreamState::Playing);
        assert_eq!(
            media.stream(0).unwrap().granted_transport().client_port(),
            Some(&rtsp::Port::Range(7000, 7001)),
        );
        assert_eq!(*recorder.builds.lock().unwrap(), 1);
    }

    #[test]
    fn pause_from_ready_is_accepted() {
        let recorder = Arc::new(Recorder::default());
        let mounts = mounts(recorder.clone());
        let mut session = session();
        session
            .setup(STREAM_0, &mounts, &udp("5000-5001"), destination())
            .unwrap();
        session.pause("/live").unwrap();
        assert_eq!(
            session.media("/live").unwrap().stream_state(0),
            StreamState::Ready
        );
        assert!(recorder.states.lock().unwrap().is_empty());
    }

    #[test]
    fn failures_leave_state_unchanged() {
        let recorder = Arc::new(Recorder::default());
        let mounts = mounts(recorder);
        let mut session = session();

        let tcp = vec!["RTP/AVP/TCP;unicast".parse::<rtsp::Transport>().unwrap()];
        let err = session
            .setup(STREAM_0, &mounts, &tcp, destination())
            .unwrap_err();
        assert!(matches!(err, SessionError::TransportNotSupported));
        assert_eq!(err.status(), rtsp::Status::UnsupportedTransport);
        assert!(session.is_empty());

        let err = session
            .setup("rtsp://example.com/live/stream=5", &mounts, &udp("5000-5001"), destination())
            .unwrap_err();
        assert_eq!(err.status(), rtsp::Status::NotFound);
        assert!(session.is_empty());

        let err = session
            .setup(URL, &mounts, &udp("5000-5001"), destination())
            .unwrap_err();
        assert_eq!(err.status(), rtsp::Status::AggregateOperationNotAllowed);

        let err = session
            .setup(
                "rtsp://example.com/missing/stream=0",
                &mounts,
                &udp("5000-5001"),
                destination(),
            )
            .unwrap_err();
        assert_eq!(err.status(), rtsp::Status::NotFound);
        assert!(session.is_empty());

        // Transport candidates are tried in order.
        let mut candidates = tcp;
        candidates.extend(udp("5000-5001"));
        session
            .setup(STREAM_0, &mounts, &candidates, destination())
            .unwrap();
        assert_eq!(
            session.media("/live").unwrap().stream_state(0),
            StreamState::Ready
        );
    }

    #[test]
    fn pipeline_failures_propagate() {
        let recorder = Arc::new(Recorder {
            fail_build: true,
            ..Default::default()
        });
        let mut session = session();
        let err = session
            .setup(STREAM_0, &mounts(recorder), &udp("5000-5001"), destination())
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Media(MediaError::Pipeline(_))
        ));
        assert_eq!(err.status(), rtsp::Status::ServiceUnavailable);
        assert!(session.is_empty());

        let recorder = Arc::new(Recorder {
            fail_play: true,
            ..Default::default()
        });
        let mounts = mounts(recorder);
        session
            .setup(STREAM_0, &mounts, &udp("5000-5001"), destination())
            .unwrap();
        assert!(matches!(
            session.play("/live", None),
            Err(SessionError::Pipeline(_)),
        ));
        assert_eq!(
            session.media("/live").unwrap().stream_state(0),
            StreamState::Ready
        );
    }

    #[test]
    fn play_rejects_non_live_range() {
        let recorder = Arc::new(Recorder::default());
        let mounts = mounts(recorder);
        let mut session = session();
        session
            .setup(STREAM_0, &mounts, &udp("5000-5001"), destination())
            .unwrap();
        let range = "npt=10-20".parse::<rtsp::Range>().unwrap();
        let err = session.play("/live", Some(&range)).unwrap_err();
        assert_eq!(err.status(), rtsp::Status::InvalidRange);
        let range = rtsp::Range::new_for_live();
        session.play("/live", Some(&range)).unwrap();
    }

    #[test]
    fn expiry_and_header() {
        let mut session = Session::new(SessionId::from("abc"), Duration::from_secs(30));
        assert_eq!(session.header().to_string(), "abc;timeout=30");
        let now = Instant::now();
        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::from_secs(31)));
        session.touch();
        assert!(!session.is_expired(Instant::now()));
    }

    #[test]
    fn generated_ids_are_alphanumeric() {
        let id = SessionId::generate();
        assert_eq!(id.as_str().len(), 16);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, SessionId::generate());
    }
}
