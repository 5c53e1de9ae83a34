use std::cmp;
use std::sync::Arc;

use crate::error::JournalError;
use crate::error::ReplicationError;
use crate::follower::queue::PendingRequest;
use crate::follower::FollowerInner;
use crate::journal::Journal;
use crate::raft::AppendEntriesRequest;
use crate::raft::AppendEntriesResponse;
use crate::raft_types::LogIndexOptionExt;
use crate::workers::WorkerContext;

impl<J: Journal> FollowerInner<J> {
    /// Drive the ingress queue until the registry stops the worker.
    ///
    /// The registry only delivers the stop signal after the queue has
    /// drained, so every accepted request is answered before the loop
    /// exits.
    pub(super) async fn run(self: Arc<Self>, ctx: WorkerContext) {
        tracing::debug!(uri = %self.server_uri, "replication handler started");

        loop {
            let pending = tokio::select! {
                pending = self.queue.take() => pending,
                _ = ctx.stopped() => break,
            };
            self.handle_pending(pending);
        }

        tracing::debug!(uri = %self.server_uri, "replication handler stopped");
    }

    fn handle_pending(&self, pending: PendingRequest) {
        let PendingRequest { request, completion } = pending;

        let res = self.handle_append_entries(&request);
        if let Err(err) = &res {
            tracing::warn!(%request, error = %err, "append-entries request failed");
        }

        // The caller may have gone away; a dropped receiver is not an error.
        let _ = completion.send(res);
    }

    /// The follower half of AppendEntries: validate the prefix, reconcile
    /// the batch against the journal, advance the commit point.
    #[tracing::instrument(level = "debug", skip(self, request), fields(request = %request))]
    fn handle_append_entries(
        &self,
        request: &AppendEntriesRequest,
    ) -> Result<AppendEntriesResponse, ReplicationError> {
        let next = request.prev_log_index.next_index();

        if !self.prefix_matches(request, next)? {
            tracing::debug!(
                prev_index = ?request.prev_log_index,
                prev_term = request.prev_log_term,
                "prefix probe failed, leader should back off its next index"
            );
            return Ok(self.response(false, next, request));
        }

        if !request.entries.is_empty() {
            self.reconciler.maybe_rollback_membership(next, self.journal.as_ref())?;
            self.journal.compare_or_append(&request.entries, next)?;
            self.reconciler.apply_membership_entries(&request.entries, next);
        }

        self.advance_commit(request)?;
        self.note_leader_max_index(request.max_index);

        Ok(self.response(true, next, request))
    }

    /// Whether the journal (or the head snapshot) agrees with the
    /// request's probe point.
    fn prefix_matches(&self, request: &AppendEntriesRequest, next: u64) -> Result<bool, ReplicationError> {
        if next < self.journal.min_index() || next > self.journal.max_index() {
            return Ok(false);
        }

        match request.prev_log_index {
            None => Ok(true),
            Some(prev) => Ok(self.term_probe(prev)? == request.prev_log_term),
        }
    }

    /// Term of the entry at `index`, falling back to the head snapshot
    /// when the entry right below the live journal has been compacted
    /// away.
    fn term_probe(&self, index: u64) -> Result<u64, ReplicationError> {
        let underflow = match self.journal.term_at(index) {
            Ok(term) => return Ok(term),
            Err(err @ JournalError::IndexUnderflow { .. }) => err,
            Err(err) => return Err(err.into()),
        };

        match self.snapshots.first() {
            Some((boundary, meta)) if index + 1 == boundary => Ok(meta.last_included_term),
            _ => Err(underflow.into()),
        }
    }

    /// Raise the commit point to the leader's, clamped to the local tail,
    /// and wake the applier.
    fn advance_commit(&self, request: &AppendEntriesRequest) -> Result<(), ReplicationError> {
        if request.leader_commit <= self.journal.commit_index() {
            return Ok(());
        }

        // The leader's commit point may run ahead of what this follower
        // holds.
        let up_to = cmp::min(request.leader_commit, self.journal.max_index());
        self.journal.commit(up_to)?;
        self.reconciler.advance_committed(up_to);

        self.workers.wakeup(&self.applier_name());
        Ok(())
    }

    fn response(&self, success: bool, next: u64, request: &AppendEntriesRequest) -> AppendEntriesResponse {
        AppendEntriesResponse {
            success,
            term: self.current_term,
            journal_index: next,
            entry_count: request.entries.len(),
        }
    }
}
