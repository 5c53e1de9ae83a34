use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Mutex;

use tokio::sync::oneshot;
use tokio::sync::Notify;

use crate::error::ReplicationError;
use crate::raft::AppendEntriesRequest;
use crate::raft::AppendEntriesResponse;

/// A submitted request and the handle that completes it.
pub(crate) struct PendingRequest {
    pub request: AppendEntriesRequest,
    pub completion: oneshot::Sender<Result<AppendEntriesResponse, ReplicationError>>,
}

impl PendingRequest {
    /// Requests probing an earlier prefix run first: a straggler produced
    /// under a deposed leader must not overwrite entries already
    /// reconciled against a newer one.
    fn priority(&self) -> (u64, Option<u64>) {
        (self.request.prev_log_term, self.request.prev_log_index)
    }
}

impl PartialEq for PendingRequest {
    fn eq(&self, other: &Self) -> bool {
        self.priority() == other.priority()
    }
}

impl Eq for PendingRequest {}

impl PartialOrd for PendingRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingRequest {
    // BinaryHeap pops the greatest element; reverse the key so the
    // smallest prefix pops first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.priority().cmp(&self.priority())
    }
}

/// Multi-producer, single-consumer priority buffer of pending requests.
pub(crate) struct IngressQueue {
    heap: Mutex<BinaryHeap<PendingRequest>>,
    ready: Notify,
}

impl IngressQueue {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Mutex::new(BinaryHeap::with_capacity(capacity)),
            ready: Notify::new(),
        }
    }

    pub(crate) fn push(&self, pending: PendingRequest) {
        self.heap.lock().unwrap().push(pending);
        self.ready.notify_one();
    }

    /// Pop the smallest-prefix pending request, waiting until one exists.
    ///
    /// Cancel safe: nothing is held across the wait.
    pub(crate) async fn take(&self) -> PendingRequest {
        loop {
            if let Some(pending) = self.heap.lock().unwrap().pop() {
                return pending;
            }
            self.ready.notified().await;
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.lock().unwrap().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
