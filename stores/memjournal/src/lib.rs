//! An in-memory journal for tests and embeddings.


use std::collections::BTreeMap;
use std::error::Error;
use std::sync::RwLock;

use replicore::Entry;
use replicore::Journal;
use replicore::JournalError;
use validit::less_equal;
use validit::Valid;
use validit::Validate;

/// An append-only, index-addressed log held in memory, implementing
/// [`Journal`].
///
/// The live entries start at `min_index`; everything below is considered
/// compacted into a snapshot kept elsewhere.
pub struct MemJournal {
    log: RwLock<Valid<JournalLog>>,
}

#[derive(Debug, Default)]
struct JournalLog {
    /// Live entries, keyed by journal index. Keys are contiguous from
    /// `min_index`.
    entries: BTreeMap<u64, Entry>,

    /// First index not compacted into a snapshot.
    min_index: u64,

    /// One past the last committed index.
    commit_index: u64,
}

impl JournalLog {
    fn max_index(&self) -> u64 {
        self.entries.keys().next_back().map(|last| last + 1).unwrap_or(self.min_index)
    }
}

impl Validate for JournalLog {
    fn validate(&self) -> Result<(), Box<dyn Error>> {
        less_equal!(self.min_index, self.commit_index);
        less_equal!(self.commit_index, self.max_index());
        less_equal!(self.min_index, self.max_index());

        if let Some(first) = self.entries.keys().next() {
            less_equal!(self.min_index, *first);
        }
        Ok(())
    }
}

impl MemJournal {
    pub fn new() -> Self {
        Self::with_state(0, 0, Vec::new())
    }

    /// Build a journal whose live entries start at `min_index`, with the
    /// given commit point.
    pub fn with_state(min_index: u64, commit_index: u64, entries: Vec<Entry>) -> Self {
        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| (min_index + i as u64, entry))
            .collect();

        Self {
            log: RwLock::new(Valid::new(JournalLog {
                entries,
                min_index,
                commit_index,
            })),
        }
    }

    /// Terms of the live entries, in index order.
    pub fn terms(&self) -> Vec<u64> {
        let log = self.log.read().unwrap();
        log.entries.values().map(|entry| entry.term).collect()
    }

    /// A clone of the entry at `index`, if live.
    pub fn entry(&self, index: u64) -> Option<Entry> {
        let log = self.log.read().unwrap();
        log.entries.get(&index).cloned()
    }
}

impl Default for MemJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl Journal for MemJournal {
    fn min_index(&self) -> u64 {
        self.log.read().unwrap().min_index
    }

    fn max_index(&self) -> u64 {
        self.log.read().unwrap().max_index()
    }

    fn commit_index(&self) -> u64 {
        self.log.read().unwrap().commit_index
    }

    fn term_at(&self, index: u64) -> Result<u64, JournalError> {
        Ok(self.entry_at(index)?.term)
    }

    fn entry_at(&self, index: u64) -> Result<Entry, JournalError> {
        let log = self.log.read().unwrap();

        if index < log.min_index {
            return Err(JournalError::IndexUnderflow {
                index,
                min_index: log.min_index,
            });
        }

        log.entries.get(&index).cloned().ok_or(JournalError::IndexOverflow {
            index,
            max_index: log.max_index(),
        })
    }

    fn compare_or_append(&self, entries: &[Entry], start_index: u64) -> Result<(), JournalError> {
        let mut log = self.log.write().unwrap();

        if start_index < log.min_index {
            return Err(JournalError::IndexUnderflow {
                index: start_index,
                min_index: log.min_index,
            });
        }
        if start_index > log.max_index() {
            return Err(JournalError::IndexOverflow {
                index: start_index,
                max_index: log.max_index(),
            });
        }

        for (offset, entry) in entries.iter().enumerate() {
            let index = start_index + offset as u64;
            let existing_term = log.entries.get(&index).map(|e| e.term);

            if existing_term == Some(entry.term) {
                continue;
            }

            // First divergence: the leader's suffix replaces everything
            // from here on.
            if existing_term.is_some() && index < log.commit_index {
                return Err(JournalError::TruncateBelowCommitted {
                    index,
                    commit_index: log.commit_index,
                });
            }

            let removed = log.entries.split_off(&index);
            if !removed.is_empty() {
                tracing::debug!(index, removed = removed.len(), "truncated conflicting journal suffix");
            }

            for (i, e) in entries[offset..].iter().enumerate() {
                log.entries.insert(index + i as u64, e.clone());
            }
            return Ok(());
        }

        Ok(())
    }

    fn commit(&self, up_to: u64) -> Result<(), JournalError> {
        let mut log = self.log.write().unwrap();

        if up_to > log.max_index() {
            return Err(JournalError::IndexOverflow {
                index: up_to,
                max_index: log.max_index(),
            });
        }

        if up_to > log.commit_index {
            log.commit_index = up_to;
        }
        Ok(())
    }
}
