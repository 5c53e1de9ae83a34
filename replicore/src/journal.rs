use crate::entry::Entry;
use crate::error::JournalError;

/// The storage seam between the follower and the append-only journal.
///
/// Indices are assigned monotonically from zero; `min_index` may be greater
/// than zero once a prefix has been compacted into a snapshot. `max_index`
/// is one past the last appended entry and `commit_index` is one past the
/// last committed one.
///
/// `compare_or_append` and `commit` must be atomic with respect to the
/// observable indices: a failed call leaves them unchanged.
pub trait Journal: Send + Sync + 'static {
    /// First index still present in the live journal.
    fn min_index(&self) -> u64;

    /// One past the last appended index.
    fn max_index(&self) -> u64;

    /// One past the last committed index. Non-decreasing; never exceeds
    /// `max_index`.
    fn commit_index(&self) -> u64;

    /// Term of the entry at `index`.
    fn term_at(&self, index: u64) -> Result<u64, JournalError>;

    /// The entry at `index`.
    fn entry_at(&self, index: u64) -> Result<Entry, JournalError>;

    /// Walk `entries` against the journal from `start_index`. At the first
    /// position whose term differs from the incoming entry, or where the
    /// journal ends, truncate the journal to that position and append the
    /// remaining suffix. A batch that already matches is a no-op.
    ///
    /// Truncating a committed entry must fail with
    /// [`JournalError::TruncateBelowCommitted`] without mutating anything.
    fn compare_or_append(&self, entries: &[Entry], start_index: u64) -> Result<(), JournalError>;

    /// Raise the commit point to `up_to` (one past the last committed
    /// index). Lower values are a no-op.
    fn commit(&self, up_to: u64) -> Result<(), JournalError>;
}
