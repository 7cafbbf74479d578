// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity import: start and status calls, and the import polling job.

use crate::error::Result;
use crate::models::ImportStatus;
use crate::services::api::ApiClient;
use crate::services::jobs::{JobKey, PollingJob};
use async_trait::async_trait;

#[derive(Clone, Debug)]
pub struct ImportsClient {
    api: ApiClient,
}

impl ImportsClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Kick off the initial import of all of a user's activities.
    pub async fn start_initial(&self, user_id: u64) -> Result<serde_json::Value> {
        self.api
            .post_empty(&format!("/api/import/initial/{}", user_id))
            .await
    }

    pub async fn status(&self, user_id: u64) -> Result<ImportStatus> {
        self.api
            .get_json(&format!("/api/import/status/{}", user_id))
            .await
    }
}

/// Full activity import for one user. Runs until the backend reports it done.
#[derive(Clone, Debug)]
pub struct ImportJob {
    client: ImportsClient,
    user_id: u64,
    resume: bool,
}

impl ImportJob {
    pub fn new(client: ImportsClient, user_id: u64) -> Self {
        Self {
            client,
            user_id,
            resume: false,
        }
    }

    /// Attach to an import that is already running without starting a new one.
    pub fn resume(client: ImportsClient, user_id: u64) -> Self {
        Self {
            client,
            user_id,
            resume: true,
        }
    }

    pub fn key_for(user_id: u64) -> JobKey {
        JobKey::new("import", user_id)
    }
}

#[async_trait]
impl PollingJob for ImportJob {
    type Snapshot = ImportStatus;

    fn key(&self) -> JobKey {
        Self::key_for(self.user_id)
    }

    async fn start(&self) -> Result<()> {
        if self.resume {
            return Ok(());
        }
        self.client.start_initial(self.user_id).await?;
        tracing::info!(user_id = self.user_id, "Activity import started");
        Ok(())
    }

    async fn status(&self) -> Result<ImportStatus> {
        self.client.status(self.user_id).await
    }

    fn is_terminal(&self, snapshot: &ImportStatus) -> bool {
        !snapshot.in_progress
    }
}
