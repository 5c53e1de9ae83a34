mod append_entries;
mod queue;
mod reconciler;

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicU8;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::sleep;

use crate::config::FollowerConfig;
use crate::error::IllegalStateError;
use crate::error::LifecycleError;
use crate::error::ReplicationError;
use crate::journal::Journal;
use crate::membership::ConfigManager;
use crate::raft::AppendEntriesRequest;
use crate::raft::AppendEntriesResponse;
use crate::raft::Completion;
use crate::snapshot::SnapshotMap;
use crate::workers::WorkerRegistry;

use queue::IngressQueue;
use queue::PendingRequest;
use reconciler::ConfigReconciler;

/// Lifecycle of the follower.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum LifecycleState {
    #[display("created")]
    Created = 0,

    #[display("running")]
    Running = 1,

    /// Stop requested; pending requests are still being served.
    #[display("stopping")]
    Stopping = 2,

    #[display("stopped")]
    Stopped = 3,
}

fn decode_state(v: u8) -> LifecycleState {
    match v {
        0 => LifecycleState::Created,
        1 => LifecycleState::Running,
        2 => LifecycleState::Stopping,
        _ => LifecycleState::Stopped,
    }
}

const LEADER_MAX_INDEX_UNKNOWN: u64 = u64::MAX;

/// The follower replication core.
///
/// Receives append-entries batches through [`submit`](Self::submit),
/// serves them on a single background worker in
/// `(prev_log_term, prev_log_index)` order, and answers each request
/// through its one-shot completion.
///
/// The handle is cheap to clone; all clones drive the same follower.
pub struct Follower<J: Journal> {
    inner: Arc<FollowerInner<J>>,
}

impl<J: Journal> Clone for Follower<J> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub(crate) struct FollowerInner<J: Journal> {
    pub(crate) server_uri: String,
    pub(crate) current_term: u64,
    pub(crate) config: FollowerConfig,
    pub(crate) journal: Arc<J>,
    pub(crate) snapshots: Arc<SnapshotMap>,
    pub(crate) reconciler: ConfigReconciler,
    pub(crate) workers: Arc<WorkerRegistry>,
    pub(crate) queue: IngressQueue,

    state: AtomicU8,
    leader_max_index: AtomicU64,
    ready_for_preferred_election: AtomicBool,
}

impl<J: Journal> FollowerInner<J> {
    pub(crate) fn handler_name(&self) -> String {
        format!("{}-voter-replication-handler", self.server_uri)
    }

    pub(crate) fn applier_name(&self) -> String {
        format!("{}-state-machine", self.server_uri)
    }

    /// Record the leader's reported journal tail. Only the handler loop
    /// writes this, so a plain load/store keeps it monotonic.
    pub(crate) fn note_leader_max_index(&self, reported: u64) {
        let current = self.leader_max_index.load(Ordering::Acquire);
        if current == LEADER_MAX_INDEX_UNKNOWN || reported > current {
            self.leader_max_index.store(reported, Ordering::Release);
        }
    }
}

impl<J: Journal> Follower<J> {
    /// Build a follower over its collaborators. The follower serves
    /// nothing until [`start`](Self::start).
    pub fn new(
        server_uri: impl Into<String>,
        current_term: u64,
        config: FollowerConfig,
        journal: Arc<J>,
        config_manager: Arc<ConfigManager>,
        workers: Arc<WorkerRegistry>,
        snapshots: Arc<SnapshotMap>,
    ) -> Self {
        let queue = IngressQueue::with_capacity(config.cached_requests);

        Self {
            inner: Arc::new(FollowerInner {
                server_uri: server_uri.into(),
                current_term,
                config,
                journal,
                snapshots,
                reconciler: ConfigReconciler::new(config_manager),
                workers,
                queue,
                state: AtomicU8::new(LifecycleState::Created as u8),
                leader_max_index: AtomicU64::new(LEADER_MAX_INDEX_UNKNOWN),
                ready_for_preferred_election: AtomicBool::new(false),
            }),
        }
    }

    /// Register and start the replication handler worker.
    pub fn start(&self) -> Result<(), LifecycleError> {
        self.transition(LifecycleState::Created, LifecycleState::Running)?;

        let name = self.inner.handler_name();
        let inner = self.inner.clone();
        self.inner.workers.create_worker(&name, move |ctx| Box::pin(inner.run(ctx)))?;
        self.inner.workers.start_worker(&name)?;

        tracing::info!(uri = %self.inner.server_uri, term = self.inner.current_term, "follower started");
        Ok(())
    }

    /// Stop accepting requests, serve everything already queued, then stop
    /// and deregister the handler worker.
    pub async fn stop(&self) -> Result<(), LifecycleError> {
        self.transition(LifecycleState::Running, LifecycleState::Stopping)?;

        while !self.inner.queue.is_empty() {
            sleep(Duration::from_millis(self.inner.config.drain_poll_ms)).await;
        }

        let name = self.inner.handler_name();
        self.inner.workers.stop_worker(&name).await?;
        self.inner.workers.remove_worker(&name);

        self.transition(LifecycleState::Stopping, LifecycleState::Stopped)?;

        tracing::info!(uri = %self.inner.server_uri, "follower stopped");
        Ok(())
    }

    /// Queue an append-entries request for the handler loop.
    ///
    /// The returned completion resolves exactly once: with the handler's
    /// answer, or immediately with an error when the follower is not
    /// running.
    pub fn submit(&self, request: AppendEntriesRequest) -> Completion {
        let (tx, rx) = oneshot::channel();

        let state = self.state();
        if state != LifecycleState::Running {
            let refused = IllegalStateError {
                expected: LifecycleState::Running,
                actual: state,
            };
            let _ = tx.send(Err(refused.into()));
            return rx;
        }

        self.inner.queue.push(PendingRequest {
            request,
            completion: tx,
        });
        rx
    }

    /// Submit a request and await its completion.
    pub async fn append_entries(
        &self,
        request: AppendEntriesRequest,
    ) -> Result<AppendEntriesResponse, ReplicationError> {
        self.submit(request).await.unwrap_or_else(|_| Err(ReplicationError::Canceled))
    }

    pub fn state(&self) -> LifecycleState {
        decode_state(self.inner.state.load(Ordering::Acquire))
    }

    pub fn server_uri(&self) -> &str {
        &self.inner.server_uri
    }

    pub fn current_term(&self) -> u64 {
        self.inner.current_term
    }

    /// Highest journal tail the leader has reported so far, if any.
    pub fn leader_max_index(&self) -> Option<u64> {
        match self.inner.leader_max_index.load(Ordering::Acquire) {
            LEADER_MAX_INDEX_UNKNOWN => None,
            v => Some(v),
        }
    }

    /// Number of requests waiting for the handler loop.
    pub fn replication_queue_size(&self) -> usize {
        self.inner.queue.len()
    }

    pub fn is_ready_for_preferred_leader_election(&self) -> bool {
        self.inner.ready_for_preferred_election.load(Ordering::Acquire)
    }

    pub fn set_ready_for_preferred_leader_election(&self, ready: bool) {
        self.inner.ready_for_preferred_election.store(ready, Ordering::Release);
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState) -> Result<(), IllegalStateError> {
        self.inner
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| IllegalStateError {
                expected: from,
                actual: decode_state(actual),
            })
    }
}
