use std::cmp;
use std::sync::Arc;

use crate::entry::Entry;
use crate::entry::EntryPayload;
use crate::error::ReplicationError;
use crate::journal::Journal;
use crate::membership::ConfigManager;
use crate::membership::EffectiveMembership;

/// Applies and rolls back membership configs found in the replicated
/// stream.
///
/// A follower applies membership changes when they are replicated, not
/// when they commit: membership must be visible for the very exchanges
/// that deliver it. An uncommitted membership entry that gets truncated
/// must therefore be explicitly rolled back.
pub(crate) struct ConfigReconciler {
    config: Arc<ConfigManager>,
}

impl ConfigReconciler {
    pub(crate) fn new(config: Arc<ConfigManager>) -> Self {
        Self { config }
    }

    /// Pre-truncation hook: if the uncommitted journal tail at
    /// `start_index` or later holds a membership entry, revert the
    /// effective config to the committed one. At most one config is
    /// uncommitted, so a single step suffices.
    pub(crate) fn maybe_rollback_membership<J: Journal>(
        &self,
        start_index: u64,
        journal: &J,
    ) -> Result<(), ReplicationError> {
        let from = cmp::max(start_index, journal.commit_index());

        for index in from..journal.max_index() {
            if !journal.entry_at(index)?.is_membership() {
                continue;
            }

            if let Some(restored) = self.config.truncate(index) {
                tracing::debug!(
                    index,
                    restored = %restored.membership,
                    "rolled back uncommitted membership config"
                );
            }
            return Ok(());
        }
        Ok(())
    }

    /// Post-append hook: apply every membership entry of the batch, in
    /// order, to the live config state.
    pub(crate) fn apply_membership_entries(&self, entries: &[Entry], start_index: u64) {
        for (offset, entry) in entries.iter().enumerate() {
            if let EntryPayload::Membership(membership) = &entry.payload {
                let log_index = start_index + offset as u64;
                tracing::debug!(log_index, membership = %membership, "applying replicated membership config");

                self.config.apply(Arc::new(EffectiveMembership::new(
                    Some(log_index),
                    membership.clone(),
                )));
            }
        }
    }

    /// Fold a new commit point into the membership state.
    pub(crate) fn advance_committed(&self, commit_index: u64) {
        self.config.commit(commit_index);
    }
}
