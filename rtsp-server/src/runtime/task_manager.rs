use std::future::Future;

use tokio::select;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

pub struct TaskManager {
    hold_tx: Mutex<Option<mpsc::Sender<()>>>,
    hold_rx: Mutex<mpsc::Receiver<()>>,
    stop_tx: broadcast::Sender<()>,
}

impl TaskManager {
    pub fn new() -> Self {
        let (hold_tx, hold_rx) = mpsc::channel(1);
        let (stop_tx, _) = broadcast::channel(1);
        Self {
            // Must protect by mutex since another task might invalidate the
            // `hold_tx` once shutdown begins.
            hold_tx: Mutex::new(Some(hold_tx)),
            // Must protect `hold_rx` by mutex to allow for internal
            // mutability.
            hold_rx: Mutex::new(hold_rx),
            stop_tx,
        }
    }

    /// Spawn a task that holds the manager open until it finishes.
    ///
    /// The returned [`Task`] stops just this task. Dropping it detaches the
    /// task, which then only reacts to [`TaskManager::stop`].
    pub async fn spawn<F, T>(&self, f: F) -> Task
    where
        F: FnOnce(TaskContext) -> T + Send + 'static,
        T: Future + Send + 'static,
        T::Output: Send + 'static,
    {
        // `hold_tx` could be empty if the manager is already stopping, in
        // which case we don't start a task at all.
        let hold_tx = self.hold_tx.lock().await.as_ref().cloned();
        match hold_tx {
            Some(hold_tx) => {
                let (task_stop_tx, task_stop_rx) = oneshot::channel();
                let task_context = TaskContext {
                    stop: self.stop_tx.subscribe(),
                    task_stop: Some(task_stop_rx),
                    _token: hold_tx,
                };
                // The context is dropped together with the future, which
                // releases the hold.
                let handle = tokio::spawn(async move {
                    f(task_context).await;
                });
                Task {
                    stop_tx: Some(task_stop_tx),
                    handle: Some(handle),
                }
            }
            None => {
                tracing::trace!("task manager is stopping, not spawning task");
                Task {
                    stop_tx: None,
                    handle: None,
                }
            }
        }
    }

    pub async fn stop(&self) {
        // If we don't drop the apex `hold_tx` here then the call to `recv()`
        // below will block forever since there would be one remaining hold.
        drop(self.hold_tx.lock().await.take());

        // Must happen after `hold_tx` is gone, so no task can be spawned that
        // misses the stop signal.
        let _ = self.stop_tx.send(());

        // The channel breaks once all holds are dropped, which means all
        // tasks have finished.
        let _ = self.hold_rx.lock().await.recv().await;
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a single spawned task.
pub struct Task {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Task {
    /// Signal the task to stop and wait for it to finish.
    pub async fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                tracing::error!(%err, "task failed");
            }
        }
    }
}

pub struct TaskContext {
    stop: broadcast::Receiver<()>,
    task_stop: Option<oneshot::Receiver<()>>,
    _token: mpsc::Sender<()>,
}

impl TaskContext {
    /// Resolves when either the manager or the task's own handle asks the
    /// task to stop. Cancel safe.
    pub async fn wait_for_stop(&mut self) {
        if let Some(task_stop) = self.task_stop.as_mut() {
            select! {
                _ = self.stop.recv() => return,
                result = task_stop => {
                    if result.is_ok() {
                        return;
                    }
                },
            }
            // Handle was dropped without a stop signal.
            self.task_stop = None;
        }
        let _ = self.stop.recv().await;
    }
}

#[cfg(test)]
mod tests {

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::TaskManager;

    #[tokio::test]
    async fn stop_single_task() {
        let task_manager = TaskManager::new();
        let stopped = Arc::new(AtomicBool::new(false));
        let mut task = task_manager
            .spawn({
                let stopped = stopped.clone();
                move |mut task_context| async move {
                    task_context.wait_for_stop().await;
                    stopped.store(true, Ordering::SeqCst);
                }
            })
            .await;
        task.stop().await;
        assert!(stopped.load(Ordering::SeqCst));
        // Stopping again is a no-op.
        task.stop().await;
        task_manager.stop().await;
    }

    #[tokio::test]
    async fn stop_manager_stops_detached_tasks() {
        let task_manager = TaskManager::new();
        let stopped = Arc::new(AtomicBool::new(false));
        drop(
            task_manager
                .spawn({
                    let stopped = stopped.clone();
                    move |mut task_context| async move {
                        task_context.wait_for_stop().await;
                        stopped.store(true, Ordering::SeqCst);
                    }
                })
                .await,
        );
        task_manager.stop().await;
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn no_spawn_after_stop() {
        let task_manager = TaskManager::new();
        task_manager.stop().await;
        let ran = Arc::new(AtomicBool::new(false));
        let mut task = task_manager
            .spawn({
                let ran = ran.clone();
                move |_| async move {
                    ran.store(true, Ordering::SeqCst);
                }
            })
            .await;
        task.stop().await;
        assert!(!ran.load(Ordering::SeqCst));
    }
}
