// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Comment automation: settings, coverage increases, processing.

use crate::error::Result;
use crate::models::comments::{IncreasesEnvelope, SettingsEnvelope};
use crate::models::{CommentSettings, CoverageIncrease};
use crate::services::api::ApiClient;

#[derive(Clone, Debug)]
pub struct CommentsClient {
    api: ApiClient,
}

impl CommentsClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn settings(&self, user_id: u64) -> Result<CommentSettings> {
        let envelope: SettingsEnvelope = self
            .api
            .get_json(&format!("/api/comments/settings/{}", user_id))
            .await?;
        Ok(envelope.settings)
    }

    /// Replace the user's settings with `settings`.
    pub async fn update_settings(
        &self,
        user_id: u64,
        settings: &CommentSettings,
    ) -> Result<serde_json::Value> {
        self.api
            .put_json(&format!("/api/comments/settings/{}", user_id), settings)
            .await
    }

    pub async fn coverage_increases(&self, user_id: u64) -> Result<Vec<CoverageIncrease>> {
        let envelope: IncreasesEnvelope = self
            .api
            .get_json(&format!("/api/comments/coverage-increases/{}", user_id))
            .await?;
        Ok(envelope.increases)
    }

    /// Post comments for pending coverage increases.
    pub async fn process(&self, user_id: u64) -> Result<serde_json::Value> {
        self.api
            .post_empty(&format!("/api/comments/process/{}", user_id))
            .await
    }
}
