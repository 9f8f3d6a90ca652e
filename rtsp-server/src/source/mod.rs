use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::select;

use rtsp_protocol::Bytes;

use crate::media::{normalize_path, MediaPath};
use crate::runtime::task_manager::{Task, TaskContext};
use crate::runtime::Runtime;
use crate::session::session_manager::SessionManager;

/// Largest datagram a source accepts.
const MAX_DATAGRAM_LEN: usize = 65_536;

/// Receives RTP packets for one stream of a mounted media on a UDP socket
/// and fans them out to every session playing that stream.
pub struct Source {
    path: MediaPath,
    stream_index: usize,
    local_addr: SocketAddr,
    worker: Task,
}

impl Source {
    pub async fn start(
        path: &str,
        stream_index: usize,
        addr: SocketAddr,
        session_manager: Arc<SessionManager>,
        runtime: &Runtime,
    ) -> io::Result<Self> {
        let path = normalize_path(path);
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        tracing::info!(%path, stream_index, %local_addr, "source listening");

        let worker = runtime
            .task()
            .spawn({
                let path = path.clone();
                move |task_context| {
                    Self::run(socket, path, stream_index, session_manager, task_context)
                }
            })
            .await;

        Ok(Self {
            path,
            stream_index,
            local_addr,
            worker,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn stop(&mut self) {
        tracing::trace!(path = %self.path, stream_index = self.stream_index, "stopping source");
        self.worker.stop().await;
    }

    async fn run(
        socket: UdpSocket,
        path: MediaPath,
        stream_index: usize,
        session_manager: Arc<SessionManager>,
        mut task_context: TaskContext,
    ) {
        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
        loop {
            select! {
                // CANCEL SAFETY: `recv_from` is cancel safe.
                received = socket.recv_from(&mut buf) => {
                    match received {
                        Ok((len, _)) => {
                            let payload = Bytes::copy_from_slice(&buf[..len]);
                            let delivered = session_manager.push(&path, stream_index, payload).await;
                            tracing::trace!(%path, stream_index, len, delivered, "forwarded packet");
                        }
                        Err(err) => {
                            tracing::warn!(%path, stream_index, %err, "failed to receive packet");
                        }
                    }
                },
                // CANCEL SAFETY: `wait_for_stop` is cancel safe.
                _ = task_context.wait_for_stop() => {
                    tracing::trace!(%path, stream_index, "source stopped");
                    break;
                },
            }
        }
    }
}
