use std::collections::BTreeMap;
use std::sync::RwLock;

/// Identity of a snapshot covering a compacted journal prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SnapshotMeta {
    /// Index of the last entry folded into the snapshot.
    pub last_included_index: u64,

    /// Term of that entry.
    pub last_included_term: u64,
}

/// Ordered map from snapshot boundary index (one past `last_included_index`)
/// to snapshot metadata.
///
/// The follower reads only the first entry, to resolve the term of the
/// probe point immediately below the live journal. Snapshot installation
/// and compaction are driven elsewhere.
#[derive(Debug, Default)]
pub struct SnapshotMap {
    snapshots: RwLock<BTreeMap<u64, SnapshotMeta>>,
}

impl SnapshotMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, meta: SnapshotMeta) {
        let mut snapshots = self.snapshots.write().unwrap();
        snapshots.insert(meta.last_included_index + 1, meta);
    }

    /// Boundary index and metadata of the earliest snapshot.
    pub fn first(&self) -> Option<(u64, SnapshotMeta)> {
        let snapshots = self.snapshots.read().unwrap();
        snapshots.iter().next().map(|(boundary, meta)| (*boundary, *meta))
    }
}
