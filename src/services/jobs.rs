// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Tracker for long-running backend jobs.
//!
//! A job is started with one call and then observed through repeated status
//! calls until its snapshot says it is done. The tracker guarantees:
//! - at most one live poll loop per [`JobKey`], across every scope sharing
//!   the registry;
//! - polls never overlap: the next sleep starts after the previous status
//!   call has resolved;
//! - the loop and its registry entry are gone after completion, failure,
//!   cancellation or a panic inside the job.

use crate::error::AppError;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Identity of a logical job, e.g. `import:42` or `area-coverage:7`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey(String);

impl JobKey {
    pub fn new(kind: &str, id: impl fmt::Display) -> Self {
        Self(format!("{}:{}", kind, id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Polling policy for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between the end of one status call and the start of the next
    pub interval: Duration,
    /// Overall deadline measured from the successful start call
    pub max_wait: Option<Duration>,
    /// Consecutive failed status calls tolerated before giving up
    pub max_consecutive_failures: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_wait: None,
            max_consecutive_failures: 5,
        }
    }
}

/// A backend job the tracker can drive.
#[async_trait]
pub trait PollingJob: Send + Sync + 'static {
    /// Latest status payload.
    type Snapshot: Clone + fmt::Debug + Send + Sync + 'static;

    fn key(&self) -> JobKey;

    /// Initiating call. An error here is fatal to the attempt.
    async fn start(&self) -> Result<(), AppError>;

    /// One status check.
    async fn status(&self) -> Result<Self::Snapshot, AppError>;

    fn is_terminal(&self, snapshot: &Self::Snapshot) -> bool;
}

/// Why a job that was polling ended without completing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFailure {
    TimedOut { waited: Duration },
    PollBudgetExhausted { failures: u32, last_error: String },
}

/// Lifecycle of a tracked job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState<S> {
    Idle,
    Starting,
    Polling { snapshot: Option<S> },
    Completed { snapshot: S },
    Failed { failure: JobFailure, snapshot: Option<S> },
}

impl<S> JobState<S> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed { .. } | JobState::Failed { .. })
    }

    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Starting | JobState::Polling { .. })
    }

    /// Latest snapshot carried by this state, if any.
    pub fn snapshot(&self) -> Option<&S> {
        match self {
            JobState::Polling { snapshot } | JobState::Failed { snapshot, .. } => snapshot.as_ref(),
            JobState::Completed { snapshot } => Some(snapshot),
            JobState::Idle | JobState::Starting => None,
        }
    }
}

/// One state transition, delivered to the observer exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct JobEvent<S> {
    pub key: JobKey,
    pub state: JobState<S>,
}

/// Tracker errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Job {0} is already running")]
    AlreadyRunning(JobKey),

    #[error("Failed to start job: {0}")]
    Start(#[source] AppError),

    #[error("Job timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Job gave up after {failures} consecutive failed status checks: {last_error}")]
    PollBudgetExhausted { failures: u32, last_error: String },

    #[error("Job was cancelled")]
    Cancelled,
}

impl From<JobFailure> for JobError {
    fn from(failure: JobFailure) -> Self {
        match failure {
            JobFailure::TimedOut { waited } => JobError::TimedOut(waited),
            JobFailure::PollBudgetExhausted {
                failures,
                last_error,
            } => JobError::PollBudgetExhausted {
                failures,
                last_error,
            },
        }
    }
}

type Observer<S> = Arc<dyn Fn(&JobEvent<S>) + Send + Sync>;

struct RegistryEntry {
    generation: u64,
    cancel: CancellationToken,
}

type Registry = Arc<DashMap<JobKey, RegistryEntry>>;

/// Starts and tracks polling jobs.
///
/// Clones share the registry and the cancellation scope. [`JobTracker::scoped`]
/// shares the registry but gets its own scope, so a view can cancel just the
/// jobs it started.
#[derive(Clone)]
pub struct JobTracker {
    registry: Registry,
    scope: CancellationToken,
    generations: Arc<AtomicU64>,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTracker {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(DashMap::new()),
            scope: CancellationToken::new(),
            generations: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Child scope sharing this tracker's registry.
    pub fn scoped(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            scope: self.scope.child_token(),
            generations: self.generations.clone(),
        }
    }

    /// Cancel every job started from this scope or its children.
    pub fn shutdown(&self) {
        self.scope.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.scope.is_cancelled()
    }

    /// Whether a loop is registered for `key` in any scope.
    pub fn is_running(&self, key: &JobKey) -> bool {
        self.registry.contains_key(key)
    }

    /// Number of live jobs across all scopes.
    pub fn active_jobs(&self) -> usize {
        self.registry.len()
    }

    /// Cancel the job registered under `key`, whichever scope started it.
    pub fn cancel(&self, key: &JobKey) -> bool {
        match self.registry.get(key) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Start `job` and poll it in the background.
    ///
    /// Rejects a second start for a key that is starting or polling without
    /// issuing any request. If the start call fails, no loop is created and the
    /// key is released.
    pub async fn start<J, F>(
        &self,
        job: J,
        config: PollConfig,
        observer: F,
    ) -> Result<JobHandle<J::Snapshot>, JobError>
    where
        J: PollingJob,
        F: Fn(&JobEvent<J::Snapshot>) + Send + Sync + 'static,
    {
        let key = job.key();
        if self.scope.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let cancel = self.scope.child_token();

        match self.registry.entry(key.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!(job = %key, "Job already running, start rejected");
                return Err(JobError::AlreadyRunning(key));
            }
            Entry::Vacant(slot) => {
                slot.insert(RegistryEntry {
                    generation,
                    cancel: cancel.clone(),
                });
            }
        }

        let guard = RegistryGuard {
            registry: self.registry.clone(),
            key: key.clone(),
            generation,
        };

        let (state_tx, state_rx) = watch::channel(JobState::Idle);
        let reporter = Reporter {
            key: key.clone(),
            state: state_tx,
            observer: Arc::new(observer),
        };

        reporter.emit(JobState::Starting);

        let started = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                drop(guard);
                reporter.emit(JobState::Idle);
                return Err(JobError::Cancelled);
            }
            result = job.start() => result,
        };

        if let Err(e) = started {
            tracing::warn!(job = %key, error = %e, "Job start failed");
            drop(guard);
            reporter.emit(JobState::Idle);
            return Err(JobError::Start(e));
        }

        tracing::info!(job = %key, interval = ?config.interval, "Job started, polling");
        reporter.emit(JobState::Polling { snapshot: None });

        let poke = Arc::new(Notify::new());
        tokio::spawn(run_job(
            job,
            config,
            reporter,
            cancel.clone(),
            poke.clone(),
            guard,
        ));

        Ok(JobHandle {
            key,
            state: state_rx,
            cancel,
            poke,
        })
    }
}

/// Handle to one tracked job. Dropping it cancels the job.
pub struct JobHandle<S> {
    key: JobKey,
    state: watch::Receiver<JobState<S>>,
    cancel: CancellationToken,
    poke: Arc<Notify>,
}

impl<S: Clone> JobHandle<S> {
    pub fn key(&self) -> &JobKey {
        &self.key
    }

    /// Current state.
    pub fn state(&self) -> JobState<S> {
        self.state.borrow().clone()
    }

    /// Receiver for state changes.
    pub fn subscribe(&self) -> watch::Receiver<JobState<S>> {
        self.state.clone()
    }

    /// Stop polling. The job transitions to `Idle`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Request an immediate status check.
    ///
    /// Returns `false`, and does nothing, once the job has left `Polling`.
    pub fn poll_now(&self) -> bool {
        let polling = matches!(*self.state.borrow(), JobState::Polling { .. });
        if !polling || self.cancel.is_cancelled() {
            return false;
        }
        self.poke.notify_one();
        true
    }

    /// Wait for the job to finish and return its final snapshot.
    pub async fn wait(&self) -> Result<S, JobError> {
        let mut rx = self.state.clone();
        let state = match rx
            .wait_for(|s| s.is_terminal() || matches!(s, JobState::Idle))
            .await
        {
            Ok(state) => state.clone(),
            Err(_) => return Err(JobError::Cancelled),
        };

        match state {
            JobState::Completed { snapshot } => Ok(snapshot),
            JobState::Failed { failure, .. } => Err(failure.into()),
            _ => Err(JobError::Cancelled),
        }
    }
}

impl<S> Drop for JobHandle<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Reporter<S> {
    key: JobKey,
    state: watch::Sender<JobState<S>>,
    observer: Observer<S>,
}

impl<S: Clone> Reporter<S> {
    fn emit(&self, state: JobState<S>) {
        self.state.send_replace(state.clone());
        (self.observer)(&JobEvent {
            key: self.key.clone(),
            state,
        });
    }
}

/// Removes the registry entry on every exit path, including unwinding.
struct RegistryGuard {
    registry: Registry,
    key: JobKey,
    generation: u64,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        let generation = self.generation;
        self.registry
            .remove_if(&self.key, |_, entry| entry.generation == generation);
    }
}

async fn run_job<J: PollingJob>(
    job: J,
    config: PollConfig,
    reporter: Reporter<J::Snapshot>,
    cancel: CancellationToken,
    poke: Arc<Notify>,
    guard: RegistryGuard,
) {
    let final_state = poll_until_done(&job, config, &reporter, &cancel, &poke).await;

    // Release the key before anyone can observe the terminal state.
    drop(guard);

    match &final_state {
        JobState::Completed { .. } => tracing::info!(job = %reporter.key, "Job completed"),
        JobState::Failed { failure, .. } => {
            tracing::warn!(job = %reporter.key, failure = ?failure, "Job failed")
        }
        _ => tracing::debug!(job = %reporter.key, "Job cancelled"),
    }

    reporter.emit(final_state);
}

async fn poll_until_done<J: PollingJob>(
    job: &J,
    config: PollConfig,
    reporter: &Reporter<J::Snapshot>,
    cancel: &CancellationToken,
    poke: &Notify,
) -> JobState<J::Snapshot> {
    let started = Instant::now();
    let deadline = config.max_wait.map(|wait| started + wait);
    let max_failures = config.max_consecutive_failures.max(1);
    let mut failures = 0u32;
    let mut last: Option<J::Snapshot> = None;

    loop {
        let next_tick = Instant::now() + config.interval;
        let wake = deadline.map_or(next_tick, |d| d.min(next_tick));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return JobState::Idle,
            _ = poke.notified() => {}
            _ = tokio::time::sleep_until(wake) => {}
        }

        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                return JobState::Failed {
                    failure: JobFailure::TimedOut {
                        waited: started.elapsed(),
                    },
                    snapshot: last,
                };
            }
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return JobState::Idle,
            result = job.status() => result,
        };

        match result {
            Ok(snapshot) => {
                failures = 0;
                if job.is_terminal(&snapshot) {
                    return JobState::Completed { snapshot };
                }
                tracing::debug!(job = %reporter.key, snapshot = ?snapshot, "Job still running");
                reporter.emit(JobState::Polling {
                    snapshot: Some(snapshot.clone()),
                });
                last = Some(snapshot);
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(
                    job = %reporter.key,
                    failures,
                    max_failures,
                    error = %e,
                    "Status check failed"
                );
                if failures >= max_failures {
                    return JobState::Failed {
                        failure: JobFailure::PollBudgetExhausted {
                            failures,
                            last_error: e.to_string(),
                        },
                        snapshot: last,
                    };
                }
            }
        }
    }
}
