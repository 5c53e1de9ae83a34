mod membership_state;

pub use membership_state::MembershipState;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::sync::RwLock;

use validit::Valid;

/// A cluster membership config: the set of voter URIs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Membership {
    voters: BTreeSet<String>,
}

impl Membership {
    pub fn new(voters: BTreeSet<String>) -> Self {
        Self { voters }
    }

    pub fn is_voter(&self, uri: &str) -> bool {
        self.voters.contains(uri)
    }

    pub fn voters(&self) -> &BTreeSet<String> {
        &self.voters
    }
}

impl fmt::Display for Membership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, voter) in self.voters.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", voter)?;
        }
        write!(f, "}}")
    }
}

/// A membership config together with the journal index it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectiveMembership {
    /// Index of the entry that carried this config; `None` for the config
    /// the node booted with.
    pub log_index: Option<u64>,

    pub membership: Membership,
}

impl EffectiveMembership {
    pub fn new(log_index: Option<u64>, membership: Membership) -> Self {
        Self { log_index, membership }
    }
}

impl fmt::Display for EffectiveMembership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{at:{:?}, {}}}", self.log_index, self.membership)
    }
}

/// Shared handle to the live membership state.
///
/// The follower's handler loop is the only writer during the follower's
/// lifetime; membership queries from the surrounding server go through
/// [`effective`](Self::effective) and [`is_voter`](Self::is_voter).
#[derive(Debug)]
pub struct ConfigManager {
    state: RwLock<Valid<MembershipState>>,
}

impl ConfigManager {
    /// Start from the boot config: committed and effective are both the
    /// initial membership, attached to no journal entry.
    pub fn new(initial: Membership) -> Self {
        let initial = Arc::new(EffectiveMembership::new(None, initial));
        Self {
            state: RwLock::new(Valid::new(MembershipState::new(initial.clone(), initial))),
        }
    }

    pub fn effective(&self) -> Arc<EffectiveMembership> {
        self.state.read().unwrap().effective().clone()
    }

    pub fn committed(&self) -> Arc<EffectiveMembership> {
        self.state.read().unwrap().committed().clone()
    }

    pub fn is_voter(&self, uri: &str) -> bool {
        self.effective().membership.is_voter(uri)
    }

    pub(crate) fn apply(&self, m: Arc<EffectiveMembership>) {
        self.state.write().unwrap().apply(m);
    }

    pub(crate) fn truncate(&self, since: u64) -> Option<Arc<EffectiveMembership>> {
        self.state.write().unwrap().truncate(since)
    }

    pub(crate) fn commit(&self, commit_index: u64) {
        self.state.write().unwrap().commit(commit_index);
    }
}
