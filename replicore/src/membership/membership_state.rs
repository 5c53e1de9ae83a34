use std::error::Error;
use std::sync::Arc;

use validit::less_equal;
use validit::Validate;

use super::EffectiveMembership;

/// The pair of membership configs a follower tracks.
///
/// A leader proposes a new membership config only once the previous one is
/// committed, so at most one config is uncommitted at any time. The
/// follower therefore stores the last committed config and the effective
/// (possibly uncommitted) one; truncating a conflicting suffix reverts
/// effective to committed in a single step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipState {
    committed: Arc<EffectiveMembership>,
    effective: Arc<EffectiveMembership>,
}

impl MembershipState {
    pub fn new(committed: Arc<EffectiveMembership>, effective: Arc<EffectiveMembership>) -> Self {
        Self { committed, effective }
    }

    pub fn committed(&self) -> &Arc<EffectiveMembership> {
        &self.committed
    }

    pub fn effective(&self) -> &Arc<EffectiveMembership> {
        &self.effective
    }

    /// Apply a membership config found in a replicated entry.
    ///
    /// A config at the effective index replaces it (a re-appended batch);
    /// a strictly newer one supersedes it, and the superseded config must
    /// already be committed.
    pub(crate) fn apply(&mut self, m: Arc<EffectiveMembership>) {
        if m.log_index < self.effective.log_index {
            return;
        }

        if m.log_index > self.effective.log_index {
            self.committed = self.effective.clone();
        }

        self.effective = m;
    }

    /// Advance the committed config once the commit point has passed the
    /// effective config's entry.
    pub(crate) fn commit(&mut self, commit_index: u64) {
        if self.effective.log_index < Some(commit_index) {
            self.committed = self.effective.clone();
        }
    }

    /// Revert the effective config when the journal suffix `[since, ..)`
    /// is reconciled against the leader.
    ///
    /// Returns the restored config if a rollback happened.
    pub(crate) fn truncate(&mut self, since: u64) -> Option<Arc<EffectiveMembership>> {
        debug_assert!(
            Some(since) > self.committed.log_index,
            "a committed membership config must never be truncated"
        );

        if self.effective.log_index >= Some(since) {
            self.effective = self.committed.clone();
            return Some(self.effective.clone());
        }
        None
    }
}

impl Validate for MembershipState {
    fn validate(&self) -> Result<(), Box<dyn Error>> {
        less_equal!(self.committed.log_index, self.effective.log_index);
        Ok(())
    }
}
