// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! First-run pipeline: import activities, detect cities, calculate coverage.

use crate::error::AppError;
use crate::models::{CoverageSummary, ImportStatus};
use crate::services::imports::ImportJob;
use crate::services::jobs::{JobError, JobState, JobTracker, PollConfig};
use crate::services::Clients;
use std::sync::Arc;

/// Pipeline stage, for progress display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkflowStep {
    #[default]
    Idle,
    Importing,
    Detecting,
    Calculating,
    Completed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowProgress {
    pub step: WorkflowStep,
    pub message: String,
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    pub import: ImportStatus,
    pub cities_found: usize,
    pub summary: CoverageSummary,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Import did not complete: {0}")]
    Import(#[from] JobError),

    #[error(transparent)]
    Api(#[from] AppError),
}

type ProgressFn = Arc<dyn Fn(&WorkflowProgress) + Send + Sync>;

pub struct AutomatedWorkflow {
    clients: Clients,
    tracker: JobTracker,
    polling: PollConfig,
}

impl AutomatedWorkflow {
    pub fn new(clients: Clients, tracker: JobTracker, polling: PollConfig) -> Self {
        Self {
            clients,
            tracker,
            polling,
        }
    }

    /// Run every step in order, stopping at the first failure.
    pub async fn run<F>(&self, user_id: u64, on_progress: F) -> Result<WorkflowOutcome, WorkflowError>
    where
        F: Fn(&WorkflowProgress) + Send + Sync + 'static,
    {
        let progress: ProgressFn = Arc::new(on_progress);

        let result = self.run_steps(user_id, &progress).await;
        if let Err(e) = &result {
            tracing::warn!(user_id, error = %e, "Automated workflow failed");
            report(&progress, WorkflowStep::Idle, format!("Error: {}", e));
        }
        result
    }

    async fn run_steps(
        &self,
        user_id: u64,
        progress: &ProgressFn,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        report(
            progress,
            WorkflowStep::Importing,
            "Starting import of your Strava activities...",
        );

        let job = ImportJob::new(self.clients.imports.clone(), user_id);
        let observer = progress.clone();
        let handle = self
            .tracker
            .start(job, self.polling, move |event| {
                if let JobState::Polling {
                    snapshot: Some(status),
                } = &event.state
                {
                    report(&observer, WorkflowStep::Importing, status.progress_message());
                }
            })
            .await?;
        let import = handle.wait().await?;
        report(progress, WorkflowStep::Importing, import.progress_message());

        report(
            progress,
            WorkflowStep::Detecting,
            "Analyzing your activities to detect cities...",
        );
        let detected = self.clients.detection.auto_detect(user_id).await?;
        let cities_found = detected.cities.len();
        report(
            progress,
            WorkflowStep::Detecting,
            format!(
                "City detection completed! Found {} cities with activities.",
                cities_found
            ),
        );

        report(
            progress,
            WorkflowStep::Calculating,
            "Calculating coverage for each city...",
        );
        self.clients.coverage.calculate_all(user_id).await?;
        report(
            progress,
            WorkflowStep::Calculating,
            "Coverage calculation completed!",
        );

        let summary = self.clients.coverage.summary(user_id).await?;

        report(
            progress,
            WorkflowStep::Completed,
            "All done! Your Strava coverage has been calculated.",
        );
        tracing::info!(user_id, cities_found, "Automated workflow completed");

        Ok(WorkflowOutcome {
            import,
            cities_found,
            summary,
        })
    }
}

fn report(progress: &ProgressFn, step: WorkflowStep, message: impl Into<String>) {
    progress(&WorkflowProgress {
        step,
        message: message.into(),
    });
}
