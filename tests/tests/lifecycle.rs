//! Lifecycle tests: admission, drain-on-stop, transition refusals.

use std::sync::Arc;

use replicore::ConfigManager;
use replicore::Follower;
use replicore::FollowerConfig;
use replicore::LifecycleError;
use replicore::LifecycleState;
use replicore::ReplicationError;
use replicore::SnapshotMap;
use replicore::WorkerRegistry;
use replicore_tests::fixtures::initial_membership;
use replicore_tests::fixtures::journal_of_terms;
use replicore_tests::fixtures::req;
use replicore_tests::fixtures::started_follower;
use replicore_tests::fixtures::URI;

#[tokio::test]
async fn test_stop_drains_pending_requests() -> anyhow::Result<()> {
    let h = started_follower(2, journal_of_terms(&[1, 1, 2], 0))?;

    let c1 = h.follower.submit(req(2, Some(2), 2, vec![], 0, 3));
    let c2 = h.follower.submit(req(2, Some(2), 2, vec![], 1, 3));

    h.follower.stop().await?;
    assert_eq!(LifecycleState::Stopped, h.follower.state());
    assert_eq!(0, h.follower.replication_queue_size());

    // Every request accepted before the stop was answered.
    let r1 = c1.await??;
    let r2 = c2.await??;
    assert!(r1.success);
    assert!(r2.success);

    // New submissions are refused immediately.
    let refused = h.follower.append_entries(req(2, Some(2), 2, vec![], 0, 3)).await;
    match refused {
        Err(ReplicationError::IllegalState(e)) => {
            assert_eq!(LifecycleState::Running, e.expected);
            assert_eq!(LifecycleState::Stopped, e.actual);
        }
        other => panic!("expected a lifecycle refusal, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_submit_before_start_is_refused() -> anyhow::Result<()> {
    let follower = Follower::new(
        URI,
        1,
        FollowerConfig::default(),
        journal_of_terms(&[], 0),
        Arc::new(ConfigManager::new(initial_membership())),
        Arc::new(WorkerRegistry::new()),
        Arc::new(SnapshotMap::new()),
    );

    let res = follower.append_entries(req(1, None, 0, vec![], 0, 0)).await;
    match res {
        Err(ReplicationError::IllegalState(e)) => {
            assert_eq!(LifecycleState::Created, e.actual);
        }
        other => panic!("expected a lifecycle refusal, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_start_twice_is_refused() -> anyhow::Result<()> {
    let h = started_follower(1, journal_of_terms(&[1], 0))?;

    match h.follower.start() {
        Err(LifecycleError::IllegalState(e)) => {
            assert_eq!(LifecycleState::Created, e.expected);
            assert_eq!(LifecycleState::Running, e.actual);
        }
        other => panic!("expected a lifecycle refusal, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_stop_before_start_is_refused() -> anyhow::Result<()> {
    let follower = Follower::new(
        URI,
        1,
        FollowerConfig::default(),
        journal_of_terms(&[], 0),
        Arc::new(ConfigManager::new(initial_membership())),
        Arc::new(WorkerRegistry::new()),
        Arc::new(SnapshotMap::new()),
    );

    match follower.stop().await {
        Err(LifecycleError::IllegalState(e)) => {
            assert_eq!(LifecycleState::Created, e.actual);
        }
        other => panic!("expected a lifecycle refusal, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_preferred_election_readiness_latch() -> anyhow::Result<()> {
    let h = started_follower(1, journal_of_terms(&[1], 0))?;

    assert!(!h.follower.is_ready_for_preferred_leader_election());
    h.follower.set_ready_for_preferred_leader_election(true);
    assert!(h.follower.is_ready_for_preferred_leader_election());
    Ok(())
}

#[tokio::test]
async fn test_queue_is_empty_after_serving() -> anyhow::Result<()> {
    let h = started_follower(2, journal_of_terms(&[1, 1, 2], 0))?;

    let resp = h.follower.append_entries(req(2, Some(2), 2, vec![], 0, 3)).await?;
    assert!(resp.success);
    assert_eq!(0, h.follower.replication_queue_size());

    assert_eq!(URI, h.follower.server_uri());
    assert_eq!(2, h.follower.current_term());
    Ok(())
}
