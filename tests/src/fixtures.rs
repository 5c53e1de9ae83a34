//! Builders for a started follower over an in-memory journal.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Once;
use std::time::Duration;

use anyerror::AnyError;
use maplit::btreeset;
use memjournal::MemJournal;
use replicore::AppendEntriesRequest;
use replicore::ConfigManager;
use replicore::Entry;
use replicore::Follower;
use replicore::FollowerConfig;
use replicore::Journal;
use replicore::JournalError;
use replicore::LogIndexOptionExt;
use replicore::Membership;
use replicore::SnapshotMap;
use replicore::WorkerRegistry;
use tokio::sync::mpsc;

/// URI of the follower under test.
pub const URI: &str = "local://voter-1";

/// URI of the stand-in leader.
pub const LEADER: &str = "local://leader";

/// Install a tracing subscriber once per test binary. `RUST_LOG` selects
/// the level.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// The probe position immediately before `index`.
pub fn prev_of(index: u64) -> Option<u64> {
    Some(index).prev_index()
}

pub fn blanks(terms: &[u64]) -> Vec<Entry> {
    terms.iter().map(|t| Entry::blank(*t)).collect()
}

/// A journal whose live entries carry the given terms, starting at index 0.
pub fn journal_of_terms(terms: &[u64], commit_index: u64) -> Arc<MemJournal> {
    Arc::new(MemJournal::with_state(0, commit_index, blanks(terms)))
}

pub fn membership_of(voters: &[&str]) -> Membership {
    Membership::new(voters.iter().map(|v| v.to_string()).collect())
}

/// The boot membership every harness starts from.
pub fn initial_membership() -> Membership {
    Membership::new(btreeset! {
        URI.to_string(),
        "local://voter-2".to_string(),
        "local://voter-3".to_string(),
    })
}

/// An append-entries request from the stand-in leader.
pub fn req(
    term: u64,
    prev_log_index: Option<u64>,
    prev_log_term: u64,
    entries: Vec<Entry>,
    leader_commit: u64,
    max_index: u64,
) -> AppendEntriesRequest {
    AppendEntriesRequest {
        term,
        leader: LEADER.to_string(),
        prev_log_index,
        prev_log_term,
        entries,
        leader_commit,
        max_index,
    }
}

pub struct FollowerHarness<J: Journal> {
    pub follower: Follower<J>,
    pub journal: Arc<J>,
    pub config_manager: Arc<ConfigManager>,
    pub workers: Arc<WorkerRegistry>,
    pub snapshots: Arc<SnapshotMap>,

    applier_wakeups: mpsc::UnboundedReceiver<()>,
}

impl<J: Journal> FollowerHarness<J> {
    /// Wait until the stand-in applier observes a wakeup.
    pub async fn expect_applier_wakeup(&mut self) -> anyhow::Result<()> {
        tokio::time::timeout(Duration::from_secs(3), self.applier_wakeups.recv())
            .await
            .map_err(|_| anyhow::anyhow!("applier was not woken"))?
            .ok_or_else(|| anyhow::anyhow!("applier worker went away"))?;
        Ok(())
    }
}

/// Build and start a follower over the given journal, with a stand-in
/// state-machine worker that reports every wakeup it receives.
pub fn started_follower<J: Journal>(
    current_term: u64,
    journal: Arc<J>,
) -> anyhow::Result<FollowerHarness<J>> {
    started_follower_with_snapshots(current_term, journal, Arc::new(SnapshotMap::new()))
}

pub fn started_follower_with_snapshots<J: Journal>(
    current_term: u64,
    journal: Arc<J>,
    snapshots: Arc<SnapshotMap>,
) -> anyhow::Result<FollowerHarness<J>> {
    init_tracing();

    let workers = Arc::new(WorkerRegistry::new());
    let config_manager = Arc::new(ConfigManager::new(initial_membership()));

    let applier = format!("{}-state-machine", URI);
    let (wake_tx, applier_wakeups) = mpsc::unbounded_channel();
    workers.create_worker(&applier, move |ctx| {
        Box::pin(async move {
            loop {
                ctx.wait().await;
                if ctx.is_stopping() {
                    break;
                }
                let _ = wake_tx.send(());
            }
        })
    })?;
    workers.start_worker(&applier)?;

    let follower = Follower::new(
        URI,
        current_term,
        FollowerConfig::default(),
        journal.clone(),
        config_manager.clone(),
        workers.clone(),
        snapshots.clone(),
    );
    follower.start()?;

    Ok(FollowerHarness {
        follower,
        journal,
        config_manager,
        workers,
        snapshots,
        applier_wakeups,
    })
}

/// A journal that fails its next append on demand, for error-path tests.
pub struct FaultyJournal {
    inner: MemJournal,
    fail_next_append: AtomicBool,
}

impl FaultyJournal {
    pub fn new(inner: MemJournal) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_next_append: AtomicBool::new(false),
        })
    }

    pub fn fail_next_append(&self) {
        self.fail_next_append.store(true, Ordering::SeqCst);
    }

    pub fn terms(&self) -> Vec<u64> {
        self.inner.terms()
    }
}

impl Journal for FaultyJournal {
    fn min_index(&self) -> u64 {
        self.inner.min_index()
    }

    fn max_index(&self) -> u64 {
        self.inner.max_index()
    }

    fn commit_index(&self) -> u64 {
        self.inner.commit_index()
    }

    fn term_at(&self, index: u64) -> Result<u64, JournalError> {
        self.inner.term_at(index)
    }

    fn entry_at(&self, index: u64) -> Result<Entry, JournalError> {
        self.inner.entry_at(index)
    }

    fn compare_or_append(&self, entries: &[Entry], start_index: u64) -> Result<(), JournalError> {
        if self.fail_next_append.swap(false, Ordering::SeqCst) {
            return Err(JournalError::Io {
                source: AnyError::error("injected append failure"),
            });
        }
        self.inner.compare_or_append(entries, start_index)
    }

    fn commit(&self, up_to: u64) -> Result<(), JournalError> {
        self.inner.commit(up_to)
    }
}
