use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::select;

use crate::app::handler::AppHandler;
use crate::net::connection_manager::ConnectionManager;
use crate::runtime::task_manager::{Task, TaskContext};
use crate::runtime::Runtime;

pub struct Server {
    local_addr: SocketAddr,
    connection_manager: Arc<ConnectionManager>,
    worker: Task,
}

impl Server {
    pub async fn start(
        addr: impl ToSocketAddrs,
        content_length_limit: Option<usize>,
        handler: Arc<AppHandler>,
        runtime: Arc<Runtime>,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        let connection_manager = Arc::new(
            ConnectionManager::start(handler, content_length_limit, runtime.clone()).await,
        );

        let worker = runtime
            .task()
            .spawn({
                let connection_manager = connection_manager.clone();
                move |task_context| Self::run(listener, connection_manager, task_context)
            })
            .await;

        Ok(Self {
            local_addr,
            connection_manager,
            worker,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn stop(&mut self) {
        tracing::trace!("stopping server");
        self.worker.stop().await;
        self.connection_manager.stop().await;
    }

    async fn run(
        listener: TcpListener,
        connection_manager: Arc<ConnectionManager>,
        mut task_context: TaskContext,
    ) {
        loop {
            select! {
                // CANCEL SAFETY: `accept` is cancel safe.
                incoming = listener.accept() => {
                    match incoming {
                        Ok((stream, peer)) => {
                            tracing::debug!(%peer, "accepted client");
                            connection_manager.spawn(stream).await;
                        }
                        Err(err) => {
                            tracing::error!(%err, "failed to accept connection");
                        }
                    }
                },
                // CANCEL SAFETY: `wait_for_stop` is cancel safe.
                _ = task_context.wait_for_stop() => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {

    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use crate::app::config::AppConfig;
    use crate::app::{App, AppState};

    const CONFIG: &str = r#"
server:
  host: 127.0.0.1
  port: 0
media:
  - name: Test
    path: /test
    streams:
      - media: video
        encoding: H264
        payload_type: 96
        clock_rate: 90000
"#;

    async fn read_response(stream: &mut TcpStream) -> String {
        let mut received = Vec::new();
        let mut buf = [0_u8; 1024];
        while !received.ends_with(b"\r\n\r\n") {
            let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
                .await
                .unwrap()
                .unwrap();
            assert!(n > 0, "connection closed early");
            received.extend_from_slice(&buf[..n]);
        }
        String::from_utf8(received).unwrap()
    }

    #[tokio::test]
    async fn serves_clients_until_stopped() {
        let config = AppConfig::from_yaml(CONFIG).unwrap();
        let mut app = App::start(&config).await.unwrap();
        let addr = app.server().local_addr();

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"OPTIONS rtsp://127.0.0.1/test RTSP/1.0\r\nCSeq: 1\r\n\r\n")
            .await
            .unwrap();
        let response = read_response(&mut stream).await;
        assert!(response.starts_with("RTSP/1.0 200 OK\r\nCSeq: 1\r\n"));
        assert!(response.contains("Public: "));

        stream
            .write_all(b"FLY rtsp://127.0.0.1/test RTSP/1.0\r\nCSeq: 2\r\n\r\n")
            .await
            .unwrap();
        let response = read_response(&mut stream).await;
        assert!(response.starts_with("RTSP/1.0 501 Not Implemented\r\nCSeq: 2\r\n"));

        // Still usable after an unknown method.
        stream
            .write_all(
                b"SETUP rtsp://127.0.0.1/test RTSP/1.0\r\n\
                CSeq: 3\r\n\
                Transport: RTP/AVP/TCP;unicast;interleaved=0-1\r\n\r\n",
            )
            .await
            .unwrap();
        let response = read_response(&mut stream).await;
        assert!(response.starts_with("RTSP/1.0 200 OK\r\nCSeq: 3\r\nSession: "));
        assert!(response.contains("Transport: RTP/AVP/TCP;unicast;interleaved=0-1\r\n"));

        assert_eq!(app.state().await, AppState::Running);
        assert!(app.stop().await);
        assert_eq!(app.state().await, AppState::Stopped);
        assert!(!app.stop().await);

        // The server side of the connection is closed.
        let mut buf = [0_u8; 16];
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .unwrap()
            .unwrap_or(0);
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn source_packets_reach_playing_client() {
        let source_port = std::net::UdpSocket::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = AppConfig::from_yaml(&CONFIG.replace(
            "clock_rate: 90000",
            &format!("clock_rate: 90000\n        source: 127.0.0.1:{source_port}"),
        ))
        .unwrap();
        let mut app = App::start(&config).await.unwrap();

        let mut stream = TcpStream::connect(app.server().local_addr()).await.unwrap();
        stream
            .write_all(
                b"SETUP rtsp://127.0.0.1/test RTSP/1.0\r\n\
                CSeq: 1\r\n\
                Transport: RTP/AVP/TCP;unicast;interleaved=0-1\r\n\r\n",
            )
            .await
            .unwrap();
        let response = read_response(&mut stream).await;
        assert!(response.starts_with("RTSP/1.0 200 OK\r\n"));
        let session = response
            .lines()
            .find_map(|line| line.strip_prefix("Session: "))
            .and_then(|value| value.split(';').next())
            .unwrap()
            .to_string();

        stream
            .write_all(
                format!(
                    "PLAY rtsp://127.0.0.1/test RTSP/1.0\r\nCSeq: 2\r\nSession: {session}\r\n\r\n"
                )
                .as_bytes(),
            )
            .await
            .unwrap();
        let response = read_response(&mut stream).await;
        assert!(response.starts_with("RTSP/1.0 200 OK\r\n"));

        let producer = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        producer
            .send_to(b"rtp", ("127.0.0.1", source_port))
            .await
            .unwrap();

        let mut frame = [0_u8; 7];
        tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut frame))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&frame, b"$\x00\x00\x03rtp");

        app.stop().await;
    }

    #[tokio::test]
    async fn malformed_request_closes_connection() {
        let config = AppConfig::from_yaml(CONFIG).unwrap();
        let mut app = App::start(&config).await.unwrap();

        let mut stream = TcpStream::connect(app.server().local_addr()).await.unwrap();
        stream.write_all(b"OPTIONS\r\n\r\n").await.unwrap();
        let response = read_response(&mut stream).await;
        assert!(response.starts_with("RTSP/1.0 400 Bad Request\r\n"));

        let mut buf = [0_u8; 16];
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .unwrap()
            .unwrap_or(0);
        assert_eq!(n, 0);

        app.stop().await;
    }
}
