use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use futures::future::BoxFuture;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::error::WorkerError;

/// Signal shared between the registry and one worker task.
///
/// A worker parks on [`wait`](Self::wait) for named wakeups and leaves its
/// loop once [`is_stopping`](Self::is_stopping) turns true.
#[derive(Clone, Debug)]
pub struct WorkerContext {
    wake: Arc<Notify>,
    stop: Arc<AtomicBool>,
}

impl WorkerContext {
    fn new() -> Self {
        Self {
            wake: Arc::new(Notify::new()),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True once the registry has asked this worker to stop.
    pub fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Wait for the next named wakeup or the stop signal.
    pub async fn wait(&self) {
        self.wake.notified().await;
    }

    /// Resolve once the registry has asked this worker to stop.
    pub async fn stopped(&self) {
        while !self.is_stopping() {
            self.wake.notified().await;
        }
    }
}

struct Worker {
    ctx: WorkerContext,

    /// Present between create and start.
    task: Option<BoxFuture<'static, ()>>,

    /// Present between start and stop.
    handle: Option<JoinHandle<()>>,
}

/// Registry of named background workers.
///
/// Components address each other by worker name rather than by handle: the
/// replication handler wakes the state-machine applier with
/// `wakeup("<uri>-state-machine")` without owning its lifecycle.
#[derive(Default)]
pub struct WorkerRegistry {
    workers: Mutex<HashMap<String, Worker>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker. `factory` receives the worker's context and
    /// returns the future the worker runs; nothing is spawned until
    /// [`start_worker`](Self::start_worker).
    pub fn create_worker<F>(&self, name: impl Into<String>, factory: F) -> Result<(), WorkerError>
    where F: FnOnce(WorkerContext) -> BoxFuture<'static, ()> {
        let name = name.into();
        let mut workers = self.workers.lock().unwrap();

        if workers.contains_key(&name) {
            return Err(WorkerError::Duplicate { name });
        }

        let ctx = WorkerContext::new();
        let task = factory(ctx.clone());
        workers.insert(name, Worker {
            ctx,
            task: Some(task),
            handle: None,
        });
        Ok(())
    }

    /// Spawn a created worker onto the runtime.
    pub fn start_worker(&self, name: &str) -> Result<(), WorkerError> {
        let mut workers = self.workers.lock().unwrap();

        let worker = workers.get_mut(name).ok_or_else(|| WorkerError::UnknownWorker {
            name: name.to_string(),
        })?;

        let task = worker.task.take().ok_or_else(|| WorkerError::AlreadyStarted {
            name: name.to_string(),
        })?;

        worker.handle = Some(tokio::spawn(task));
        Ok(())
    }

    /// Signal a worker to stop and wait for its task to finish.
    pub async fn stop_worker(&self, name: &str) -> Result<(), WorkerError> {
        let handle = {
            let mut workers = self.workers.lock().unwrap();

            let worker = workers.get_mut(name).ok_or_else(|| WorkerError::UnknownWorker {
                name: name.to_string(),
            })?;

            worker.ctx.stop.store(true, Ordering::Release);
            worker.ctx.wake.notify_one();
            worker.handle.take()
        };

        if let Some(handle) = handle {
            handle.await.map_err(|_| WorkerError::Panicked {
                name: name.to_string(),
            })?;
        }
        Ok(())
    }

    /// Drop a worker's registration.
    pub fn remove_worker(&self, name: &str) {
        self.workers.lock().unwrap().remove(name);
    }

    /// Wake the named worker. Unknown names are ignored: the caller does
    /// not own the target's lifecycle.
    pub fn wakeup(&self, name: &str) {
        let workers = self.workers.lock().unwrap();
        if let Some(worker) = workers.get(name) {
            worker.ctx.wake.notify_one();
        }
    }
}
