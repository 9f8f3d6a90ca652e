use std::collections::{hash_map::Entry, HashMap};
use std::error;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::select;
use tokio::sync::{Mutex, RwLock};
use tokio::time;

use rtsp_protocol::Bytes;

use crate::media::MediaPathRef;
use crate::runtime::task_manager::{Task, TaskContext};
use crate::runtime::Runtime;
use crate::session::{Session, SessionId};

pub type SessionShared = Arc<Mutex<Session>>;
type SessionMap = Arc<RwLock<HashMap<SessionId, SessionShared>>>;

pub struct SessionManager {
    sessions: SessionMap,
    timeout: Duration,
    worker: Mutex<Task>,
}

impl SessionManager {
    pub async fn start(timeout: Duration, sweep_interval: Duration, runtime: Arc<Runtime>) -> Self {
        let sessions = Arc::new(RwLock::new(HashMap::new()));

        tracing::trace!("starting session manager");
        let worker = runtime
            .task()
            .spawn({
                let sessions = sessions.clone();
                move |task_context| Self::run(sessions, sweep_interval, task_context)
            })
            .await;
        tracing::trace!("started session manager");

        Self {
            sessions,
            timeout,
            worker: Mutex::new(worker),
        }
    }

    pub async fn stop(&self) {
        tracing::trace!("sending stop signal to session manager");
        self.worker.lock().await.stop().await;
        tracing::trace!("session manager stopped");
        for (_, session) in self.sessions.write().await.drain() {
            session.lock().await.teardown_all();
        }
    }

    /// Fresh session with a new id. It is not reachable until registered.
    pub fn create(&self) -> Session {
        Session::new(SessionId::generate(), self.timeout)
    }

    pub async fn register(&self, session: Session) -> Result<SessionShared, RegisterSessionError> {
        let session_id = session.id().clone();
        if let Entry::Vacant(entry) = self.sessions.write().await.entry(session_id.clone()) {
            let session = Arc::new(Mutex::new(session));
            entry.insert(session.clone());
            tracing::trace!(%session_id, "registered new session");
            Ok(session)
        } else {
            tracing::error!(%session_id, "session with this ID already exists");
            Err(RegisterSessionError::AlreadyRegistered)
        }
    }

    pub async fn get(&self, id: &SessionId) -> Option<SessionShared> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Forget the session registered under `id` if it is still `session`
    /// and has no media left. Emptiness is checked under the map lock, so a
    /// concurrent setup on the same session is never lost.
    ///
    /// Lock order is map, then session.
    pub async fn remove_if_empty(&self, id: &SessionId, session: &SessionShared) -> bool {
        let mut sessions = self.sessions.write().await;
        if !sessions
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current, session))
        {
            return false;
        }
        if !session.lock().await.is_empty() {
            tracing::trace!(session_id = %id, "session got new media, keeping it");
            return false;
        }
        sessions.remove(id);
        tracing::trace!(session_id = %id, "removed empty session");
        true
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Hand a payload produced for stream `stream_index` of the media at
    /// `path` to every session playing it. Returns how many sessions took it.
    pub async fn push(&self, path: &MediaPathRef, stream_index: usize, payload: Bytes) -> usize {
        let sessions = self
            .sessions
            .read()
            .await
            .values()
            .cloned()
            .collect::<Vec<_>>();

        let mut delivered = 0;
        for session in sessions {
            let mut session = session.lock().await;
            let Some(session_media) = session.media_mut(path) else {
                continue;
            };
            match session_media.push(stream_index, payload.clone()) {
                Ok(true) => delivered += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::debug!(session_id = %session.id(), path, stream_index, %err, "failed to push payload");
                }
            }
        }
        delivered
    }

    async fn run(sessions: SessionMap, sweep_interval: Duration, mut task_context: TaskContext) {
        let mut interval = time::interval(sweep_interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        loop {
            select! {
                // CANCEL SAFETY: `Interval::tick` is cancel safe.
                _ = interval.tick() => {
                    let expired = sweep_expired(&sessions, Instant::now()).await;
                    if expired > 0 {
                        tracing::debug!(expired, "expired idle sessions");
                    }
                },
                // CANCEL SAFETY: `TaskContext::wait_for_stop` is cancel safe.
                _ = task_context.wait_for_stop() => {
                    tracing::trace!("stopping session manager");
                    break;
                },
            }
        }
    }
}

/// Tear down and forget every session that was idle past its timeout at
/// `now`. Sessions that are busy handling a request are skipped.
async fn sweep_expired(sessions: &SessionMap, now: Instant) -> usize {
    let candidates = sessions
        .read()
        .await
        .iter()
        .map(|(id, session)| (id.clone(), session.clone()))
        .collect::<Vec<_>>();

    let mut expired = Vec::new();
    for (id, session) in candidates {
        if let Ok(mut session_guard) = session.try_lock() {
            if session_guard.is_expired(now) {
                tracing::debug!(session_id = %id, "session timed out");
                session_guard.teardown_all();
                expired.push((id, session.clone()));
            }
        }
    }

    let mut sessions = sessions.write().await;
    let mut removed = 0;
    for (id, session) in expired.iter() {
        // Only forget the instance that expired, and only if nothing was set
        // up on it since.
        if sessions
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current, session))
            && session.lock().await.is_empty()
        {
            sessions.remove(id);
            removed += 1;
        }
    }
    removed
}

#[derive(Debug)]
pub enum RegisterSessionError {
    AlreadyRegistered,
}

impl fmt::Display for RegisterSessionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RegisterSessionError::AlreadyRegistered => write!(f, "already registered"),
        }
    }
}

impl error::Error for RegisterSessionError {}

#[cfg(test)]
mod tests {

    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use std::net::{IpAddr, Ipv4Addr};

    use tokio::sync::mpsc;

    use super::{sweep_expired, RegisterSessionError, SessionManager};
    use crate::media::udp::UdpFactory;
    use crate::media::{Destination, Mounts, StreamInfo};
    use crate::runtime::Runtime;
    use crate::session::{Session, SessionId};

    async fn manager(runtime: &Arc<Runtime>) -> SessionManager {
        SessionManager::start(
            Duration::from_secs(60),
            Duration::from_secs(3600),
            runtime.clone(),
        )
        .await
    }

    #[tokio::test]
    async fn register_get_remove() {
        let runtime = Arc::new(Runtime::new());
        let manager = manager(&runtime).await;

        let session = manager.create();
        let id = session.id().clone();
        assert_eq!(session.timeout(), Duration::from_secs(60));
        assert!(manager.get(&id).await.is_none());

        manager.register(session).await.unwrap();
        assert!(manager.get(&id).await.is_some());
        assert_eq!(manager.len().await, 1);

        let duplicate = Session::new(id.clone(), Duration::from_secs(60));
        assert!(matches!(
            manager.register(duplicate).await,
            Err(RegisterSessionError::AlreadyRegistered),
        ));

        let registered = manager.get(&id).await.unwrap();
        assert!(manager.remove_if_empty(&id, &registered).await);
        assert!(manager.get(&id).await.is_none());
        assert!(!manager.remove_if_empty(&id, &registered).await);

        manager.stop().await;
        runtime.stop().await;
    }

    #[tokio::test]
    async fn sweep_removes_idle_sessions() {
        let runtime = Arc::new(Runtime::new());
        let manager = manager(&runtime).await;

        let short = Session::new(SessionId::from("short"), Duration::from_secs(10));
        let long = Session::new(SessionId::from("long"), Duration::from_secs(120));
        let short = manager.register(short).await.unwrap();
        manager.register(long).await.unwrap();

        let now = Instant::now();
        assert_eq!(sweep_expired(&manager.sessions, now).await, 0);

        let later = now + Duration::from_secs(30);
        // Busy sessions are left alone.
        let guard = short.lock().await;
        assert_eq!(sweep_expired(&manager.sessions, later).await, 0);
        drop(guard);
        assert_eq!(sweep_expired(&manager.sessions, later).await, 1);
        assert!(manager.get(&SessionId::from("short")).await.is_none());
        assert!(manager.get(&SessionId::from("long")).await.is_some());

        assert_eq!(
            sweep_expired(&manager.sessions, now + Duration::from_secs(121)).await,
            1
        );
        assert_eq!(manager.len().await, 0);

        manager.stop().await;
        runtime.stop().await;
    }

    #[tokio::test]
    async fn remove_if_empty_keeps_sessions_with_media() {
        let runtime = Arc::new(Runtime::new());
        let manager = manager(&runtime).await;

        let mut mounts = Mounts::new();
        mounts.add(
            "/live",
            Arc::new(UdpFactory::new(vec![StreamInfo {
                media: "video".to_string(),
                encoding: "H264".to_string(),
                payload_type: 96,
                clock_rate: 90000,
            }])),
        );
        let (sender, _receiver) = mpsc::unbounded_channel();
        let destination = Destination {
            peer: IpAddr::V4(Ipv4Addr::LOCALHOST),
            sink: Some(sender),
        };

        let session = manager.register(manager.create()).await.unwrap();
        let id = session.lock().await.id().clone();

        // Media was set up between the teardown and the removal.
        session
            .lock()
            .await
            .setup(
                "rtsp://localhost/live",
                &mounts,
                &["RTP/AVP/TCP;unicast".parse().unwrap()],
                destination,
            )
            .unwrap();
        assert!(!manager.remove_if_empty(&id, &session).await);
        assert!(manager.get(&id).await.is_some());

        session.lock().await.teardown("/live").unwrap();
        assert!(manager.remove_if_empty(&id, &session).await);
        assert!(manager.get(&id).await.is_none());

        // A different session registered under the same id is left alone.
        let replacement = manager
            .register(Session::new(id.clone(), Duration::from_secs(60)))
            .await
            .unwrap();
        assert!(!manager.remove_if_empty(&id, &session).await);
        assert!(manager.get(&id).await.is_some());
        assert!(manager.remove_if_empty(&id, &replacement).await);

        manager.stop().await;
        runtime.stop().await;
    }
}
