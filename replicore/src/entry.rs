use std::fmt;

use bytes::Bytes;

use crate::membership::Membership;

/// A single journal entry: a term tag plus an opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entry {
    /// The term under which the leader produced this entry.
    pub term: u64,

    pub payload: EntryPayload,
}

/// Payload of a journal entry.
///
/// The follower never decodes `Normal` data; the only payload it inspects
/// is `Membership`, which carries a cluster configuration change.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntryPayload {
    /// An empty entry, e.g. the one a new leader commits to assert its term.
    Blank,

    /// Opaque application data.
    Normal(Bytes),

    /// A cluster membership change.
    Membership(Membership),
}

impl Entry {
    pub fn blank(term: u64) -> Self {
        Self {
            term,
            payload: EntryPayload::Blank,
        }
    }

    pub fn normal(term: u64, data: impl Into<Bytes>) -> Self {
        Self {
            term,
            payload: EntryPayload::Normal(data.into()),
        }
    }

    pub fn membership(term: u64, membership: Membership) -> Self {
        Self {
            term,
            payload: EntryPayload::Membership(membership),
        }
    }

    /// Whether this entry changes the cluster membership.
    pub fn is_membership(&self) -> bool {
        matches!(self.payload, EntryPayload::Membership(_))
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            EntryPayload::Blank => write!(f, "{{term:{}, blank}}", self.term),
            EntryPayload::Normal(data) => write!(f, "{{term:{}, normal:{}B}}", self.term, data.len()),
            EntryPayload::Membership(m) => write!(f, "{{term:{}, membership:{}}}", self.term, m),
        }
    }
}
