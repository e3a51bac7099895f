// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watchdog reset specs: progress resets backoff, failure paths leave it
//! untouched.

use crate::prelude::*;

#[tokio::test]
async fn successful_close_resets_backoff() {
    let fixture = processor(Some(Arc::new(FakeSupervisor::completed())), None);
    let issue = claimed(&fixture.store, open_task("healthy task")).await;

    {
        let mut watchdog = fixture.watchdog.lock();
        watchdog.apply_ai_backoff(120_000);
        watchdog.record_intervention();
        watchdog.record_intervention();
        watchdog.record_intervention();
        assert!(watchdog.is_in_backoff());
        assert_eq!(watchdog.consecutive_interventions(), 3);
    }

    let outcome = fixture
        .processor
        .process(&issue, &agent_success(), &CancellationToken::new())
        .await
        .unwrap();
    fixture.writer.drain().await;
    assert!(outcome.completed);

    let watchdog = fixture.watchdog.lock();
    assert!(!watchdog.is_in_backoff());
    assert_eq!(watchdog.current_interval_ms(), watchdog.base_interval_ms);
    assert_eq!(watchdog.consecutive_interventions(), 0);
}

#[tokio::test]
async fn failed_run_leaves_backoff_untouched() {
    let fixture = processor(Some(Arc::new(FakeSupervisor::completed())), None);
    let issue = claimed(&fixture.store, open_task("unhealthy task")).await;

    {
        let mut watchdog = fixture.watchdog.lock();
        watchdog.apply_ai_backoff(120_000);
        watchdog.record_intervention();
    }
    let before = fixture.watchdog.lock().clone();

    let outcome = fixture
        .processor
        .process(&issue, &agent_failure(), &CancellationToken::new())
        .await
        .unwrap();
    fixture.writer.drain().await;
    assert!(!outcome.completed);

    assert_eq!(*fixture.watchdog.lock(), before);
}

#[tokio::test]
async fn escalation_also_leaves_backoff_untouched() {
    let fixture = processor(Some(Arc::new(FakeSupervisor::incomplete("stuck"))), None);
    let issue = claimed(&fixture.store, open_task("stuck task")).await;
    fixture
        .processor
        .process(&issue, &agent_failure(), &CancellationToken::new())
        .await
        .unwrap();

    {
        let mut watchdog = fixture.watchdog.lock();
        watchdog.record_intervention();
    }
    let before = fixture.watchdog.lock().clone();

    assert!(fixture
        .store
        .claim_issue(&issue.id, &InstanceId::from_string(EXECUTOR))
        .await
        .unwrap());
    let issue = fixture.store.get_issue(&issue.id).await.unwrap();
    let outcome = fixture
        .processor
        .process(&issue, &agent_failure(), &CancellationToken::new())
        .await
        .unwrap();
    fixture.writer.drain().await;

    assert!(outcome.escalated);
    assert_eq!(*fixture.watchdog.lock(), before);
}
