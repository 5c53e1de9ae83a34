use anyerror::AnyError;

use crate::follower::LifecycleState;

/// Failure raised by a [`Journal`](crate::Journal) operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JournalError {
    #[error("index {index} is below the journal head {min_index}")]
    IndexUnderflow { index: u64, min_index: u64 },

    #[error("index {index} is at or beyond the journal tail {max_index}")]
    IndexOverflow { index: u64, max_index: u64 },

    /// Truncating a committed entry would lose replicated data; the journal
    /// must refuse without mutating anything.
    #[error("refusing to truncate at {index}: commit index is {commit_index}")]
    TruncateBelowCommitted { index: u64, commit_index: u64 },

    #[error("journal io error: {source}")]
    Io { source: AnyError },
}

/// The follower was asked to do something its lifecycle state forbids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal lifecycle state {actual}, expected {expected}")]
pub struct IllegalStateError {
    pub expected: LifecycleState,
    pub actual: LifecycleState,
}

/// Failure completion for a submitted append-entries request.
///
/// A protocol rejection (`success=false`) is not an error; these are the
/// unexpected failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReplicationError {
    #[error(transparent)]
    IllegalState(#[from] IllegalStateError),

    #[error(transparent)]
    Journal(#[from] JournalError),

    #[error("replication handler stopped before responding")]
    Canceled,
}

/// Failure of a lifecycle transition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LifecycleError {
    #[error(transparent)]
    IllegalState(#[from] IllegalStateError),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Invalid follower configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("cached_requests must be greater than zero")]
    ZeroCachedRequests,

    #[error("drain_poll_ms must be greater than zero")]
    ZeroDrainPoll,
}

/// Misuse of the [`WorkerRegistry`](crate::WorkerRegistry).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    #[error("no worker named {name}")]
    UnknownWorker { name: String },

    #[error("a worker named {name} already exists")]
    Duplicate { name: String },

    #[error("worker {name} was already started")]
    AlreadyStarted { name: String },

    #[error("worker {name} panicked")]
    Panicked { name: String },
}
