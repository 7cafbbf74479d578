// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Coverage calculation and summaries.

use crate::error::Result;
use crate::models::{CityCoverageReport, CoverageSummary};
use crate::services::api::ApiClient;

#[derive(Clone, Debug)]
pub struct CoverageClient {
    api: ApiClient,
}

impl CoverageClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Recalculate coverage for every detected city of a user.
    pub async fn calculate_all(&self, user_id: u64) -> Result<serde_json::Value> {
        self.api
            .post_empty(&format!("/api/multi-coverage/calculate-all/{}", user_id))
            .await
    }

    pub async fn summary(&self, user_id: u64) -> Result<CoverageSummary> {
        self.api
            .get_json(&format!("/api/multi-coverage/user/{}/summary", user_id))
            .await
    }

    pub async fn city(&self, user_id: u64, city_id: u64) -> Result<CityCoverageReport> {
        self.api
            .get_json(&format!("/api/coverage/user/{}/city/{}", user_id, city_id))
            .await
    }
}
