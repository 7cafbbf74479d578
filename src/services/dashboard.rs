// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Dashboard controller: loads a user's data and drives their jobs.
//!
//! All jobs are started from a tracker scope owned by the dashboard.
//! Dropping the dashboard cancels them, and no further requests are made.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{City, CoverageSummary, CustomArea, ImportStatus, NewCustomArea};
use crate::services::custom_areas::AreaCoverageJob;
use crate::services::imports::ImportJob;
use crate::services::jobs::{JobError, JobHandle, JobState, JobTracker, PollConfig};
use crate::services::workflow::{AutomatedWorkflow, WorkflowError, WorkflowOutcome, WorkflowStep};
use crate::services::Clients;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Everything the dashboard shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    pub cities: Vec<City>,
    pub import_status: Option<ImportStatus>,
    pub summary: Option<CoverageSummary>,
    pub custom_areas: Vec<CustomArea>,
    /// Areas with a coverage calculation in flight
    pub calculating: BTreeSet<u64>,
    pub step: WorkflowStep,
    pub progress: String,
}

impl DashboardState {
    pub fn is_processing(&self) -> bool {
        !matches!(self.step, WorkflowStep::Idle | WorkflowStep::Completed)
    }
}

pub struct Dashboard {
    user_id: u64,
    clients: Clients,
    tracker: JobTracker,
    lifetime: CancellationToken,
    import_polling: PollConfig,
    area_polling: PollConfig,
    state: Arc<watch::Sender<DashboardState>>,
}

impl Dashboard {
    /// Create a dashboard whose jobs live in a child scope of `tracker`.
    pub fn new(clients: Clients, tracker: &JobTracker, config: &Config, user_id: u64) -> Self {
        let (state, _) = watch::channel(DashboardState::default());
        Self {
            user_id,
            clients,
            tracker: tracker.scoped(),
            lifetime: CancellationToken::new(),
            import_polling: config.import_polling(),
            area_polling: config.area_polling(),
            state: Arc::new(state),
        }
    }

    pub fn user_id(&self) -> u64 {
        self.user_id
    }

    pub fn state(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    /// Load everything concurrently. A failed read leaves that part empty.
    ///
    /// If an import is already running, polling resumes without starting a
    /// new one.
    pub async fn load(&self) {
        let user_id = self.user_id;
        let (cities, import_status, summary, areas) = tokio::join!(
            self.clients.cities.list(),
            self.clients.imports.status(user_id),
            self.clients.coverage.summary(user_id),
            self.clients.custom_areas.list(user_id),
        );

        let cities = or_log(cities, "cities").unwrap_or_default();
        let import_status = or_log(import_status, "import status");
        let summary = or_log(summary, "coverage summary");
        let areas = or_log(areas, "custom areas").unwrap_or_default();

        let resume = import_status.as_ref().is_some_and(|s| s.in_progress);

        self.state.send_modify(|s| {
            s.cities = cities;
            s.import_status = import_status;
            s.summary = summary;
            s.custom_areas = areas;
        });

        if resume && !self.tracker.is_running(&ImportJob::key_for(user_id)) {
            tracing::info!(user_id, "Import in progress, resuming status polling");
            let job = ImportJob::resume(self.clients.imports.clone(), user_id);
            match self.tracker.start(job, self.import_polling, |_| {}).await {
                Ok(handle) => {
                    self.state.send_modify(|s| {
                        s.step = WorkflowStep::Importing;
                        s.progress = "Import in progress...".to_string();
                    });
                    self.watch_import(handle);
                }
                Err(e) => tracing::debug!(user_id, error = %e, "Not resuming import polling"),
            }
        }
    }

    /// Start a full import. The coverage summary is reloaded once when it
    /// completes. While an import is running a second start is rejected and
    /// leaves the state of the running one untouched.
    pub async fn start_import(&self) -> std::result::Result<(), JobError> {
        let job = ImportJob::new(self.clients.imports.clone(), self.user_id);
        let key = ImportJob::key_for(self.user_id);
        if self.tracker.is_running(&key) {
            return Err(JobError::AlreadyRunning(key));
        }

        self.state.send_modify(|s| {
            s.step = WorkflowStep::Importing;
            s.progress = "Starting import of your Strava activities...".to_string();
        });

        match self.tracker.start(job, self.import_polling, |_| {}).await {
            Ok(handle) => {
                self.watch_import(handle);
                Ok(())
            }
            Err(e @ JobError::AlreadyRunning(_)) => Err(e),
            Err(e) => {
                self.state.send_modify(|s| {
                    s.step = WorkflowStep::Idle;
                    s.progress = format!("Error: {}", e);
                });
                Err(e)
            }
        }
    }

    /// Run import, detection and coverage calculation in sequence.
    pub async fn run_workflow(&self) -> std::result::Result<WorkflowOutcome, WorkflowError> {
        let workflow =
            AutomatedWorkflow::new(self.clients.clone(), self.tracker.clone(), self.import_polling);
        let state = self.state.clone();

        let outcome = tokio::select! {
            _ = self.lifetime.cancelled() => return Err(WorkflowError::Import(JobError::Cancelled)),
            outcome = workflow.run(self.user_id, move |p| {
                state.send_modify(|s| {
                    s.step = p.step;
                    s.progress = p.message.clone();
                });
            }) => outcome?,
        };

        self.state.send_modify(|s| {
            s.import_status = Some(outcome.import.clone());
            s.summary = Some(outcome.summary.clone());
        });
        Ok(outcome)
    }

    pub async fn create_area(&self, area: &NewCustomArea) -> Result<CustomArea> {
        let created = self.clients.custom_areas.create(self.user_id, area).await?;
        self.refresh_areas().await;
        Ok(created)
    }

    /// Delete an area. The local list drops it whether the backend deleted it
    /// now or it was already gone; the `NotFound` is still returned.
    pub async fn delete_area(&self, area_id: u64) -> Result<()> {
        let result = self.clients.custom_areas.delete(area_id).await;

        if result.is_ok() || result.as_ref().is_err_and(AppError::is_not_found) {
            self.tracker.cancel(&AreaCoverageJob::key_for(area_id));
            self.state.send_modify(|s| {
                s.custom_areas.retain(|a| a.id != area_id);
                s.calculating.remove(&area_id);
            });
            self.refresh_areas().await;
        }

        result
    }

    /// Start a coverage calculation for an area and track it to completion.
    pub async fn calculate_area_coverage(&self, area_id: u64) -> std::result::Result<(), JobError> {
        let job = AreaCoverageJob::new(self.clients.custom_areas.clone(), area_id);
        let handle = self.tracker.start(job, self.area_polling, |_| {}).await?;

        self.state.send_modify(|s| {
            s.calculating.insert(area_id);
        });
        self.watch_area(area_id, handle);
        Ok(())
    }

    /// Reload the custom area list, keeping the current one on failure.
    pub async fn refresh_areas(&self) {
        match self.clients.custom_areas.list(self.user_id).await {
            Ok(areas) => self.state.send_modify(|s| s.custom_areas = areas),
            Err(e) => tracing::warn!(user_id = self.user_id, error = %e, "Failed to reload custom areas"),
        }
    }

    fn watch_import(&self, handle: JobHandle<ImportStatus>) {
        let state = self.state.clone();
        let coverage = self.clients.coverage.clone();
        let lifetime = self.lifetime.clone();
        let user_id = self.user_id;

        tokio::spawn(async move {
            let mut rx = handle.subscribe();
            loop {
                let current = rx.borrow_and_update().clone();
                match current {
                    JobState::Polling {
                        snapshot: Some(status),
                    } => state.send_modify(|s| {
                        s.progress = status.progress_message();
                        s.import_status = Some(status);
                    }),
                    JobState::Completed { snapshot } => {
                        let summary = tokio::select! {
                            _ = lifetime.cancelled() => break,
                            summary = coverage.summary(user_id) => or_log(summary, "coverage summary"),
                        };
                        state.send_modify(|s| {
                            s.import_status = Some(snapshot);
                            if summary.is_some() {
                                s.summary = summary;
                            }
                            s.step = WorkflowStep::Completed;
                            s.progress = "Import completed successfully!".to_string();
                        });
                        break;
                    }
                    JobState::Failed { .. } => {
                        state.send_modify(|s| {
                            s.step = WorkflowStep::Idle;
                            s.progress = "Error occurred during import polling".to_string();
                        });
                        break;
                    }
                    JobState::Idle => break,
                    JobState::Starting | JobState::Polling { snapshot: None } => {}
                }

                tokio::select! {
                    _ = lifetime.cancelled() => break,
                    changed = rx.changed() => if changed.is_err() { break },
                }
            }
            drop(handle);
        });
    }

    fn watch_area(&self, area_id: u64, handle: JobHandle<CustomArea>) {
        let state = self.state.clone();
        let lifetime = self.lifetime.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = lifetime.cancelled() => return,
                outcome = handle.wait() => outcome,
            };

            match outcome {
                Ok(area) => {
                    tracing::info!(
                        area_id,
                        coverage = ?area.coverage_percentage,
                        "Area coverage calculated"
                    );
                    state.send_modify(|s| {
                        s.calculating.remove(&area_id);
                        match s.custom_areas.iter_mut().find(|a| a.id == area_id) {
                            Some(existing) => *existing = area,
                            None => s.custom_areas.push(area),
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(area_id, error = %e, "Area coverage calculation did not finish");
                    state.send_modify(|s| {
                        s.calculating.remove(&area_id);
                    });
                }
            }
        });
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.lifetime.cancel();
        self.tracker.shutdown();
    }
}

fn or_log<T>(result: Result<T>, what: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load {}", what);
            None
        }
    }
}
