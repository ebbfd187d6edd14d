//! Background task queue for request side effects.
//!
//! Handlers hand work to a [`TaskQueue`] and return without waiting. The
//! production queue is a bounded in-process channel drained by a worker
//! that runs a limited number of tasks at once. Delivery is best effort:
//! tasks still buffered when the process dies are lost, and there is no
//! ordering guarantee between tasks.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use zebrands_core::Sku;

use super::email::Mailer;
use super::{notifications, view_counter};
use crate::config::WorkerConfig;
use crate::db::{ProductStore, UserStore};

/// A unit of deferred work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Email product admins that the product changed.
    ProductChangeNotification { sku: Sku },
    /// Count one anonymous view of the product.
    ProductViewCount { sku: Sku },
}

impl Task {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ProductChangeNotification { .. } => "product_change_notification",
            Self::ProductViewCount { .. } => "product_view_count",
        }
    }

    #[must_use]
    pub const fn sku(&self) -> &Sku {
        match self {
            Self::ProductChangeNotification { sku } | Self::ProductViewCount { sku } => sku,
        }
    }
}

/// Errors that can occur when scheduling a task.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TaskQueueError {
    #[error("task queue is full")]
    Full,
    #[error("task queue is closed")]
    Closed,
}

/// Outbound channel for deferred work. `enqueue` never blocks.
pub trait TaskQueue: Send + Sync {
    /// Schedule `task`.
    ///
    /// # Errors
    ///
    /// Returns `TaskQueueError` if the task could not be accepted.
    fn enqueue(&self, task: Task) -> Result<(), TaskQueueError>;
}

/// Executes tasks against the stores and the mailer.
#[derive(Clone)]
pub struct TaskRunner {
    products: Arc<dyn ProductStore>,
    users: Arc<dyn UserStore>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl TaskRunner {
    /// `mailer` is `None` when email is not configured; notifications are
    /// then skipped.
    #[must_use]
    pub fn new(
        products: Arc<dyn ProductStore>,
        users: Arc<dyn UserStore>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        Self {
            products,
            users,
            mailer,
        }
    }

    /// Run one task to completion. Failures are logged, never returned.
    #[instrument(skip(self, task), fields(task = task.name(), sku = %task.sku()))]
    pub async fn run(&self, task: Task) {
        match task {
            Task::ProductChangeNotification { sku } => {
                let Some(mailer) = &self.mailer else {
                    debug!("Email not configured, skipping product change notification");
                    return;
                };
                if let Err(e) = notifications::notify_product_change(
                    self.products.as_ref(),
                    self.users.as_ref(),
                    mailer.as_ref(),
                    &sku,
                )
                .await
                {
                    error!(error = %e, "Product change notification failed");
                }
            }
            Task::ProductViewCount { sku } => {
                if let Err(e) = view_counter::record_view(self.products.as_ref(), &sku).await {
                    error!(error = %e, "Failed to record product view");
                }
            }
        }
    }
}

/// Channel-backed [`TaskQueue`] feeding the background worker.
#[derive(Clone)]
pub struct WorkerQueue {
    sender: mpsc::Sender<Task>,
}

/// Owner of the background worker, used to stop it.
pub struct WorkerHandle {
    shutdown: oneshot::Sender<()>,
    worker: JoinHandle<()>,
}

impl WorkerQueue {
    /// Spawn the worker and return the queue feeding it.
    #[must_use]
    pub fn start(runner: TaskRunner, config: &WorkerConfig) -> (Self, WorkerHandle) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let worker = tokio::spawn(run_worker(
            receiver,
            runner,
            config.concurrency.max(1),
            shutdown_rx,
        ));

        info!(
            capacity = config.queue_capacity,
            concurrency = config.concurrency,
            "Task worker started"
        );

        (
            Self { sender },
            WorkerHandle {
                shutdown: shutdown_tx,
                worker,
            },
        )
    }
}

impl TaskQueue for WorkerQueue {
    fn enqueue(&self, task: Task) -> Result<(), TaskQueueError> {
        self.sender.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TaskQueueError::Full,
            mpsc::error::TrySendError::Closed(_) => TaskQueueError::Closed,
        })
    }
}

impl WorkerHandle {
    /// Stop accepting tasks, then wait up to `grace` for buffered and
    /// running tasks to finish.
    pub async fn shutdown(self, grace: Duration) {
        // The worker may already have exited; nothing to signal then.
        let _ = self.shutdown.send(());
        match tokio::time::timeout(grace, self.worker).await {
            Ok(Ok(())) => info!("Task worker drained"),
            Ok(Err(e)) => error!(error = %e, "Task worker panicked"),
            Err(_) => warn!(
                grace_secs = grace.as_secs(),
                "Task worker did not drain in time, abandoning remaining tasks"
            ),
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<Task>,
    runner: TaskRunner,
    concurrency: usize,
    mut shutdown: oneshot::Receiver<()>,
) {
    let permits = Arc::new(Semaphore::new(concurrency));
    let mut running = JoinSet::new();

    loop {
        tokio::select! {
            task = receiver.recv() => match task {
                Some(task) => spawn_task(&mut running, &permits, &runner, task).await,
                None => break,
            },
            _ = &mut shutdown => {
                receiver.close();
                while let Some(task) = receiver.recv().await {
                    spawn_task(&mut running, &permits, &runner, task).await;
                }
                break;
            }
            Some(result) = running.join_next(), if !running.is_empty() => {
                log_join(result);
            }
        }
    }

    while let Some(result) = running.join_next().await {
        log_join(result);
    }
}

async fn spawn_task(
    running: &mut JoinSet<()>,
    permits: &Arc<Semaphore>,
    runner: &TaskRunner,
    task: Task,
) {
    let Ok(permit) = Arc::clone(permits).acquire_owned().await else {
        // The semaphore is never closed.
        return;
    };
    let runner = runner.clone();
    running.spawn(async move {
        runner.run(task).await;
        drop(permit);
    });
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "Background task panicked");
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use recording::RecordingQueue;

#[cfg(any(test, feature = "test-support"))]
mod recording {
    use std::sync::Mutex;
    use std::sync::PoisonError;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::{Task, TaskQueue, TaskQueueError};

    /// Queue that records tasks instead of running them.
    #[derive(Debug, Default)]
    pub struct RecordingQueue {
        tasks: Mutex<Vec<Task>>,
        closed: AtomicBool,
    }

    impl RecordingQueue {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Tasks scheduled so far.
        #[must_use]
        pub fn tasks(&self) -> Vec<Task> {
            self.tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Remove and return the scheduled tasks.
        pub fn take(&self) -> Vec<Task> {
            std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner))
        }

        /// Reject further tasks as if the queue had shut down.
        pub fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    impl TaskQueue for RecordingQueue {
        fn enqueue(&self, task: Task) -> Result<(), TaskQueueError> {
            if self.closed.load(Ordering::SeqCst) {
                return Err(TaskQueueError::Closed);
            }
            self.tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(task);
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;
    use zebrands_core::{Email, Price, Role, RoleSet};

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::{NewProduct, NewUser};
    use crate::services::email::RecordingMailer;

    fn sku(s: &str) -> Sku {
        Sku::parse(s).unwrap()
    }

    async fn store_with(sku_text: &str) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        ProductStore::create(
            store.as_ref(),
            &NewProduct {
                sku: sku(sku_text),
                name: "Widget".to_owned(),
                price: Price::parse("1").unwrap(),
                brand: "Acme".to_owned(),
            },
        )
        .await
        .unwrap();
        store
    }

    #[tokio::test]
    async fn test_worker_runs_queued_view_counts_and_drains_on_shutdown() {
        let store = store_with("A1").await;
        let runner = TaskRunner::new(store.clone(), store.clone(), None);
        let config = WorkerConfig {
            queue_capacity: 16,
            concurrency: 2,
        };
        let (queue, handle) = WorkerQueue::start(runner, &config);

        for _ in 0..5 {
            queue
                .enqueue(Task::ProductViewCount { sku: sku("A1") })
                .unwrap();
        }
        handle.shutdown(Duration::from_secs(5)).await;

        let stats = store.get_stats(&sku("A1")).await.unwrap().unwrap();
        assert_eq!(stats.view_count, 5);
        assert_eq!(
            queue.enqueue(Task::ProductViewCount { sku: sku("A1") }),
            Err(TaskQueueError::Closed)
        );
    }

    #[test]
    fn test_full_queue_rejects_without_blocking() {
        let (sender, _receiver) = mpsc::channel(1);
        let queue = WorkerQueue { sender };

        queue
            .enqueue(Task::ProductViewCount { sku: sku("A1") })
            .unwrap();
        assert_eq!(
            queue.enqueue(Task::ProductViewCount { sku: sku("A1") }),
            Err(TaskQueueError::Full)
        );
    }

    #[tokio::test]
    async fn test_notification_is_delivered_only_with_a_mailer() {
        let store = store_with("A1").await;
        let admin = NewUser {
            username: "catalog".to_owned(),
            email: Email::parse("catalog@example.com").unwrap(),
            password: SecretString::from("pa55word"),
            first_name: String::new(),
            last_name: String::new(),
        };
        UserStore::create(
            store.as_ref(),
            &admin,
            "hash",
            RoleSet::empty().with(Role::ProductAdmin),
        )
        .await
        .unwrap();
        let mailer = Arc::new(RecordingMailer::new());
        let task = Task::ProductChangeNotification { sku: sku("A1") };

        TaskRunner::new(store.clone(), store.clone(), None)
            .run(task.clone())
            .await;
        assert!(mailer.sent().is_empty());
        assert!(store.get_stats(&sku("A1")).await.unwrap().is_none());

        let with_mailer: Arc<dyn Mailer> = mailer.clone();
        TaskRunner::new(store.clone(), store, Some(with_mailer))
            .run(task)
            .await;
        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to.as_str(), "catalog@example.com");
        assert_eq!(sent[0].data.sku, "A1");
    }

    #[test]
    fn test_recording_queue_records_until_closed() {
        let queue = RecordingQueue::new();
        queue
            .enqueue(Task::ProductChangeNotification { sku: sku("A1") })
            .unwrap();
        assert_eq!(queue.tasks().len(), 1);
        queue.close();
        assert_eq!(
            queue.enqueue(Task::ProductViewCount { sku: sku("A1") }),
            Err(TaskQueueError::Closed)
        );
        assert_eq!(queue.take().len(), 1);
        assert!(queue.tasks().is_empty());
    }
}
