use std::fmt;

use tokio::sync::oneshot;

use crate::entry::Entry;
use crate::error::ReplicationError;

/// Receives the follower's answer to a submitted request.
///
/// Resolves exactly once: with a response (success or protocol rejection)
/// or with the error that failed the request.
pub type Completion = oneshot::Receiver<Result<AppendEntriesResponse, ReplicationError>>;

/// Leader-to-follower message carrying a contiguous batch of entries and
/// the leader's commit point.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AppendEntriesRequest {
    /// Term the leader replicated this batch under.
    pub term: u64,

    /// URI of the sending leader.
    pub leader: String,

    /// Position immediately before the batch; `None` probes before index 0.
    pub prev_log_index: Option<u64>,

    /// Term of the entry at `prev_log_index`.
    pub prev_log_term: u64,

    /// The batch. Empty for a heartbeat.
    pub entries: Vec<Entry>,

    /// Leader's commit point, one past the last committed index.
    pub leader_commit: u64,

    /// Leader's journal tail, one past its last index.
    pub max_index: u64,
}

impl fmt::Display for AppendEntriesRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AppendEntries{{leader:{}, term:{}, prev:{:?}/{}, entries:{}, commit:{}, max:{}}}",
            self.leader,
            self.term,
            self.prev_log_index,
            self.prev_log_term,
            self.entries.len(),
            self.leader_commit,
            self.max_index,
        )
    }
}

/// The follower's answer to an append-entries request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AppendEntriesResponse {
    /// False when the prefix probe failed; the leader should back its
    /// next-index pointer up to `journal_index`.
    pub success: bool,

    /// The follower's fixed term.
    pub term: u64,

    /// The index right after the probe point: the next index the follower
    /// expects from the leader.
    pub journal_index: u64,

    /// Number of entries carried by the request this answers.
    pub entry_count: usize,
}
