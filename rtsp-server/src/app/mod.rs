pub mod config;
pub mod handler;

use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::app::config::AppConfig;
use crate::app::handler::AppHandler;
use crate::media::udp::UdpFactory;
use crate::media::Mounts;
use crate::net::server::Server;
use crate::runtime::Runtime;
use crate::session::session_manager::SessionManager;
use crate::source::Source;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AppState {
    Running,
    Stopping,
    Stopped,
}

pub struct App {
    server: Server,
    sources: Vec<Source>,
    context: Arc<AppContext>,
    runtime: Arc<Runtime>,
    state: Arc<Mutex<AppState>>,
}

impl App {
    pub async fn start(config: &AppConfig) -> io::Result<App> {
        let runtime = Arc::new(Runtime::new());

        // Server side RTP sockets bind to the same address the server
        // listens on, unless that is a host name.
        let bind_address = config
            .server
            .host
            .parse::<IpAddr>()
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let mut mounts = Mounts::new();
        for item in &config.media {
            let factory = UdpFactory::new(item.stream_infos()).with_bind_address(bind_address);
            if mounts.add(&item.path, Arc::new(factory)).is_some() {
                tracing::warn!(path = %item.path, "media item replaces an earlier one");
            }
            tracing::info!(%item, "mounted media item");
        }
        if mounts.is_empty() {
            tracing::warn!("no media items configured");
        }

        let session_manager = Arc::new(
            SessionManager::start(
                config.session.timeout(),
                config.session.sweep_interval(),
                runtime.clone(),
            )
            .await,
        );

        let mut sources = Vec::new();
        for item in &config.media {
            for (stream_index, stream) in item.streams.iter().enumerate() {
                if let Some(addr) = stream.source {
                    let source = Source::start(
                        &item.path,
                        stream_index,
                        addr,
                        session_manager.clone(),
                        &runtime,
                    )
                    .await?;
                    sources.push(source);
                }
            }
        }

        let context = Arc::new(AppContext {
            session_manager,
            mounts,
        });

        let handler = Arc::new(AppHandler::new(context.clone()));
        let server = Server::start(
            (config.server.host.as_str(), config.server.port),
            config.limits.content_length,
            handler,
            runtime.clone(),
        )
        .await?;

        Ok(Self {
            server,
            sources,
            context,
            runtime,
            state: Arc::new(Mutex::new(AppState::Running)),
        })
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    /// Stop serving. Returns `false` if the app was already stopping.
    pub async fn stop(&mut self) -> bool {
        {
            let mut state = self.state.lock().await;
            if *state != AppState::Running {
                tracing::warn!(state = ?*state, "app is already stopped");
                return false;
            }
            *state = AppState::Stopping;
        }

        self.server.stop().await;
        for source in self.sources.iter_mut() {
            source.stop().await;
        }
        tracing::debug!(
            sessions = self.context.session_manager.len().await,
            "tearing down sessions",
        );
        self.context.session_manager.stop().await;
        self.runtime.stop().await;

        *self.state.lock().await = AppState::Stopped;
        true
    }

    pub async fn state(&self) -> AppState {
        *self.state.lock().await
    }
}

pub struct AppContext {
    pub session_manager: Arc<SessionManager>,
    pub mounts: Mounts,
}
