use std::collections::HashMap;
use std::sync::Arc;

use tokio::net::TcpStream;
use tokio::select;
use tokio::sync::{mpsc, Mutex};

use crate::app::handler::AppHandler;
use crate::net::connection::{
    Connection, ConnectionId, ConnectionIdGenerator, ConnectionState, ConnectionStateRx,
    ConnectionStateTx,
};
use crate::runtime::task_manager::{Task, TaskContext};
use crate::runtime::Runtime;

type ConnectionMap = Arc<Mutex<HashMap<ConnectionId, Connection>>>;

pub struct ConnectionManager {
    connections: ConnectionMap,
    connection_id_generator: ConnectionIdGenerator,
    connection_state_tx: ConnectionStateTx,
    content_length_limit: Option<usize>,
    handler: Arc<AppHandler>,
    worker: Mutex<Task>,
    runtime: Arc<Runtime>,
}

impl ConnectionManager {
    pub async fn start(
        handler: Arc<AppHandler>,
        content_length_limit: Option<usize>,
        runtime: Arc<Runtime>,
    ) -> Self {
        let connections = Arc::new(Mutex::new(HashMap::new()));

        let (connection_state_tx, connection_state_rx) = mpsc::unbounded_channel();

        let worker = runtime
            .task()
            .spawn({
                let connections = connections.clone();
                move |task_context| Self::run(connections, connection_state_rx, task_context)
            })
            .await;

        Self {
            connections,
            connection_id_generator: ConnectionIdGenerator::new(),
            connection_state_tx,
            content_length_limit,
            handler,
            worker: Mutex::new(worker),
            runtime,
        }
    }

    pub async fn stop(&self) {
        self.worker.lock().await.stop().await;
        let connections = self
            .connections
            .lock()
            .await
            .drain()
            .map(|(_, connection)| connection)
            .collect::<Vec<_>>();
        for mut connection in connections {
            connection.close().await;
        }
    }

    pub async fn spawn(&self, stream: TcpStream) {
        let id = self.connection_id_generator.generate();
        match Connection::start(
            id,
            stream,
            self.content_length_limit,
            self.handler.clone(),
            self.connection_state_tx.clone(),
            self.runtime.as_ref(),
        )
        .await
        {
            Ok(connection) => {
                self.connections.lock().await.insert(id, connection);
            }
            Err(err) => {
                tracing::warn!(%err, "failed to start connection");
            }
        }
    }

    async fn run(
        connections: ConnectionMap,
        mut connection_state_rx: ConnectionStateRx,
        mut task_context: TaskContext,
    ) {
        loop {
            select! {
                // CANCEL SAFETY: `recv` is cancel safe.
                connection_state = connection_state_rx.recv() => {
                    match connection_state {
                        Some(ConnectionState::Disconnected(connection_id)) => {
                            if let Some(connection) = connections.lock().await.remove(&connection_id) {
                                tracing::debug!(peer = %connection.peer(), connection_id, "connection gone");
                            }
                        }
                        Some(ConnectionState::Closed(connection_id)) => {
                            connections.lock().await.remove(&connection_id);
                        }
                        None => break,
                    }
                },
                // CANCEL SAFETY: `wait_for_stop` is cancel safe.
                _ = task_context.wait_for_stop() => break,
            }
        }
    }
}
