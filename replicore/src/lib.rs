//! Follower replication core of a Raft-style replicated journal server.
//!
//! A [`Follower`] receives ordered batches of log entries from a leader
//! through [`Follower::submit`], validates each batch against its local
//! [`Journal`], reconciles conflicting suffixes, advances the commit point
//! and wakes the state-machine applier, and applies membership changes
//! found in the replicated stream as soon as they are appended.
//!
//! The journal, the snapshot store, and the background workers are
//! collaborators reached through [`Journal`], [`SnapshotMap`] and
//! [`WorkerRegistry`]; the follower owns only the replication algorithm
//! and its single handler worker.

mod config;
mod entry;
mod error;
mod follower;
mod journal;
mod membership;
mod raft;
mod raft_types;
mod snapshot;
mod workers;

pub use crate::config::FollowerConfig;
pub use crate::entry::Entry;
pub use crate::entry::EntryPayload;
pub use crate::error::ConfigError;
pub use crate::error::IllegalStateError;
pub use crate::error::JournalError;
pub use crate::error::LifecycleError;
pub use crate::error::ReplicationError;
pub use crate::error::WorkerError;
pub use crate::follower::Follower;
pub use crate::follower::LifecycleState;
pub use crate::journal::Journal;
pub use crate::membership::ConfigManager;
pub use crate::membership::EffectiveMembership;
pub use crate::membership::Membership;
pub use crate::membership::MembershipState;
pub use crate::raft::AppendEntriesRequest;
pub use crate::raft::AppendEntriesResponse;
pub use crate::raft::Completion;
pub use crate::raft_types::LogIndexOptionExt;
pub use crate::snapshot::SnapshotMap;
pub use crate::snapshot::SnapshotMeta;
pub use crate::workers::WorkerContext;
pub use crate::workers::WorkerRegistry;
