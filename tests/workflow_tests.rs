// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Automated import, detection and coverage workflow.

use std::sync::{Arc, Mutex};
use strava_coverage::services::workflow::{WorkflowError, WorkflowProgress};
use strava_coverage::services::{AutomatedWorkflow, JobError, JobTracker, WorkflowStep};

mod common;
use common::{import_status, spawn_backend};

fn recorder() -> (
    Arc<Mutex<Vec<WorkflowProgress>>>,
    impl Fn(&WorkflowProgress) + Send + Sync + 'static,
) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = seen.clone();
    (seen, move |p: &WorkflowProgress| {
        record.lock().unwrap().push(p.clone())
    })
}

#[tokio::test]
async fn test_workflow_runs_all_steps() {
    let backend = spawn_backend().await;
    backend
        .mock
        .set_import_statuses(vec![import_status(50, true), import_status(120, false)]);

    let workflow = AutomatedWorkflow::new(
        backend.clients(),
        JobTracker::new(),
        backend.config().import_polling(),
    );
    let (seen, on_progress) = recorder();

    let outcome = workflow.run(7, on_progress).await.unwrap();
    assert_eq!(outcome.import.imported_count, 120);
    assert_eq!(outcome.cities_found, 2);
    assert_eq!(outcome.summary.total_cities, 2);
    assert_eq!(outcome.summary.top_cities(1)[0].city_name, "Sheffield");

    assert_eq!(backend.mock.calls("import.start"), 1);
    assert_eq!(backend.mock.calls("detect"), 1);
    assert_eq!(backend.mock.calls("calculate_all"), 1);

    let seen = seen.lock().unwrap();
    let steps: Vec<WorkflowStep> = seen.iter().map(|p| p.step).collect();
    assert_eq!(steps.first(), Some(&WorkflowStep::Importing));
    assert_eq!(steps.last(), Some(&WorkflowStep::Completed));
    assert!(steps.contains(&WorkflowStep::Detecting));
    assert!(steps.contains(&WorkflowStep::Calculating));
    assert!(seen
        .iter()
        .any(|p| p.message == "City detection completed! Found 2 cities with activities."));
}

#[tokio::test]
async fn test_workflow_stops_when_import_polling_fails() {
    let backend = spawn_backend().await;
    // Every status check is a 404.

    let workflow = AutomatedWorkflow::new(
        backend.clients(),
        JobTracker::new(),
        backend.config().import_polling(),
    );
    let (seen, on_progress) = recorder();

    let err = workflow.run(7, on_progress).await.unwrap_err();
    assert!(
        matches!(
            err,
            WorkflowError::Import(JobError::PollBudgetExhausted { failures: 5, .. })
        ),
        "unexpected error: {:?}",
        err
    );
    assert_eq!(backend.mock.calls("import.status"), 5);
    assert_eq!(backend.mock.calls("detect"), 0);

    let seen = seen.lock().unwrap();
    let last = seen.last().unwrap();
    assert_eq!(last.step, WorkflowStep::Idle);
    assert!(last.message.starts_with("Error: "));
}

#[tokio::test]
async fn test_workflow_rejects_duplicate_import() {
    let backend = spawn_backend().await;
    backend.mock.set_import_statuses(vec![import_status(10, true)]);

    let tracker = JobTracker::new();
    let first = AutomatedWorkflow::new(
        backend.clients(),
        tracker.clone(),
        backend.config().import_polling(),
    );
    let running = tokio::spawn(async move { first.run(7, |_| {}).await });

    common::eventually(|| backend.mock.calls("import.status") >= 1).await;

    let second = AutomatedWorkflow::new(
        backend.clients(),
        tracker.clone(),
        backend.config().import_polling(),
    );
    let err = second.run(7, |_| {}).await.unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::Import(JobError::AlreadyRunning(_))
    ));
    assert_eq!(backend.mock.calls("import.start"), 1);

    tracker.shutdown();
    let result = running.await.unwrap();
    assert!(matches!(
        result,
        Err(WorkflowError::Import(JobError::Cancelled))
    ));
}
