use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::BytesMut;
use futures::SinkExt;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::select;
use tokio::sync::mpsc;
use tokio_util::codec::{Decoder, FramedWrite};

use rtsp_protocol::{Codec, Error, ErrorKind, Message, Request, Response, Status};

use crate::app::handler::AppHandler;
use crate::media::{Destination, MessageTx};
use crate::runtime::task_manager::{Task, TaskContext};
use crate::runtime::Runtime;

type MessageRx = mpsc::UnboundedReceiver<Message>;

pub type ConnectionId = usize;

pub enum ConnectionState {
    /// The peer went away or broke the protocol.
    Disconnected(ConnectionId),
    /// The server closed the connection.
    Closed(ConnectionId),
}

pub type ConnectionStateTx = mpsc::UnboundedSender<ConnectionState>;
pub type ConnectionStateRx = mpsc::UnboundedReceiver<ConnectionState>;

pub struct Connection {
    peer: SocketAddr,
    reader: Task,
}

impl Connection {
    pub async fn start(
        id: ConnectionId,
        stream: TcpStream,
        content_length_limit: Option<usize>,
        handler: Arc<AppHandler>,
        state_tx: ConnectionStateTx,
        runtime: &Runtime,
    ) -> std::io::Result<Self> {
        let peer = stream.peer_addr()?;
        let (read, write) = stream.into_split();
        let (sender_tx, sender_rx) = mpsc::unbounded_channel();

        let writer = runtime
            .task()
            .spawn(move |task_context| Self::run_writer(write, sender_rx, task_context))
            .await;

        let codec = match content_length_limit {
            Some(limit) => Codec::with_content_length_limit(limit),
            None => Codec::new(),
        };
        let reader = runtime
            .task()
            .spawn(move |task_context| {
                Self::run_reader(
                    id,
                    read,
                    codec,
                    ReaderContext {
                        peer,
                        handler,
                        sender_tx,
                        state_tx,
                    },
                    writer,
                    task_context,
                )
            })
            .await;

        tracing::debug!(%peer, connection_id = id, "connection started");
        Ok(Self { peer, reader })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Stop reading and flush whatever responses are still queued.
    pub async fn close(&mut self) {
        self.reader.stop().await;
    }

    async fn run_reader(
        id: ConnectionId,
        mut read: OwnedReadHalf,
        mut codec: Codec,
        context: ReaderContext,
        mut writer: Task,
        mut task_context: TaskContext,
    ) {
        let mut buffer = BytesMut::with_capacity(4096);

        let state = 'read: loop {
            // Handle everything that is already buffered before waiting for
            // more bytes.
            loop {
                match codec.decode(&mut buffer) {
                    Ok(Some(message)) => {
                        if !context.handle_message(message).await {
                            break 'read ConnectionState::Disconnected(id);
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        if !context.handle_error(err) {
                            break 'read ConnectionState::Disconnected(id);
                        }
                    }
                }
            }

            select! {
                // CANCEL SAFETY: `read_buf` is cancel safe.
                result = read.read_buf(&mut buffer) => {
                    match result {
                        Ok(0) => {
                            tracing::debug!(peer = %context.peer, "peer disconnected");
                            break 'read ConnectionState::Disconnected(id);
                        }
                        Ok(_) => {}
                        Err(err) => {
                            tracing::debug!(peer = %context.peer, %err, "read failed");
                            break 'read ConnectionState::Disconnected(id);
                        }
                    }
                },
                // CANCEL SAFETY: `wait_for_stop` is cancel safe.
                _ = task_context.wait_for_stop() => {
                    tracing::trace!(peer = %context.peer, "connection reader stopping");
                    break 'read ConnectionState::Closed(id);
                },
            }
        };

        writer.stop().await;
        let _ = context.state_tx.send(state);
    }

    async fn run_writer(
        write: OwnedWriteHalf,
        mut sender_rx: MessageRx,
        mut task_context: TaskContext,
    ) {
        let mut outbound = FramedWrite::new(write, Codec::new());
        loop {
            select! {
                // CANCEL SAFETY: `recv` is cancel safe.
                message = sender_rx.recv() => {
                    match message {
                        Some(message) => {
                            if let Err(err) = outbound.send(message).await {
                                tracing::debug!(%err, "write failed");
                                break;
                            }
                        }
                        None => break,
                    }
                },
                // CANCEL SAFETY: `wait_for_stop` is cancel safe.
                _ = task_context.wait_for_stop() => {
                    // Whatever was queued before the stop still goes out.
                    while let Ok(message) = sender_rx.try_recv() {
                        if outbound.send(message).await.is_err() {
                            break;
                        }
                    }
                    tracing::trace!("connection writer stopping");
                    break;
                },
            }
        }
    }
}

struct ReaderContext {
    peer: SocketAddr,
    handler: Arc<AppHandler>,
    sender_tx: MessageTx,
    state_tx: ConnectionStateTx,
}

impl ReaderContext {
    /// Returns `false` when the connection can no longer be served.
    async fn handle_message(&self, message: Message) -> bool {
        match message {
            Message::Request(request) => {
                tracing::trace!(%request, "received request");
                let response = self.handler.handle(&request, &self.destination()).await;
                self.reply(&request, response)
            }
            Message::Response(response) => {
                tracing::warn!(%response, "ignoring response from client");
                true
            }
            Message::Data(data) => {
                tracing::trace!(
                    channel = data.channel,
                    len = data.payload.len(),
                    "ignoring interleaved data from client",
                );
                true
            }
        }
    }

    /// Answers decode errors where possible. Returns `false` if the
    /// connection must be closed.
    fn handle_error(&self, err: Error) -> bool {
        match err.kind() {
            ErrorKind::Protocol => {
                tracing::debug!(peer = %self.peer, %err, "protocol error");
                let mut response = Response::error(Status::NotImplemented);
                if let Error::MethodUnknown { cseq: Some(cseq), .. } = err {
                    response = response.with_cseq(cseq);
                }
                self.send(response.build())
            }
            ErrorKind::Parse => {
                tracing::debug!(peer = %self.peer, %err, "malformed message, closing connection");
                let _ = self.send(Response::error(Status::BadRequest).build());
                false
            }
            ErrorKind::Transport => {
                tracing::debug!(peer = %self.peer, %err, "transport error");
                false
            }
        }
    }

    fn reply(&self, request: &Request, response: Response) -> bool {
        tracing::trace!(method = %request.method, status = response.status, "sending response");
        self.send(response)
    }

    fn send(&self, response: Response) -> bool {
        if self.sender_tx.send(response.into()).is_err() {
            tracing::error!(peer = %self.peer, "writer channel failed unexpectedly");
            return false;
        }
        true
    }

    fn destination(&self) -> Destination {
        Destination {
            peer: self.peer.ip(),
            sink: Some(self.sender_tx.clone()),
        }
    }
}

#[derive(Default)]
pub struct ConnectionIdGenerator(AtomicUsize);

impl ConnectionIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&self) -> ConnectionId {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}
