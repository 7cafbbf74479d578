// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Custom area CRUD and the coverage calculation job.
//!
//! Writes are validated locally first; a rejected area never reaches the
//! network.

use crate::error::{AppError, Result};
use crate::models::{CustomArea, NewCustomArea};
use crate::services::api::ApiClient;
use crate::services::jobs::{JobKey, PollingJob};
use async_trait::async_trait;
use std::sync::OnceLock;

#[derive(Clone, Debug)]
pub struct CustomAreasClient {
    api: ApiClient,
}

impl CustomAreasClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn create(&self, user_id: u64, area: &NewCustomArea) -> Result<CustomArea> {
        area.check()?;
        let created: CustomArea = self
            .api
            .post_json(&format!("/api/custom-areas/user/{}", user_id), area)
            .await?;
        tracing::info!(user_id, area_id = created.id, name = %created.name, "Custom area created");
        Ok(created)
    }

    pub async fn list(&self, user_id: u64) -> Result<Vec<CustomArea>> {
        let areas: Option<Vec<CustomArea>> = self
            .api
            .get_json(&format!("/api/custom-areas/user/{}", user_id))
            .await?;
        Ok(areas.unwrap_or_default())
    }

    pub async fn get(&self, area_id: u64) -> Result<CustomArea> {
        self.api
            .get_json(&format!("/api/custom-areas/{}", area_id))
            .await
    }

    pub async fn update(&self, area_id: u64, area: &NewCustomArea) -> Result<CustomArea> {
        area.check()?;
        self.api
            .put_json(&format!("/api/custom-areas/{}", area_id), area)
            .await
    }

    /// Delete an area. A second delete of the same area is `NotFound`.
    pub async fn delete(&self, area_id: u64) -> Result<()> {
        self.api
            .delete(&format!("/api/custom-areas/{}", area_id))
            .await?;
        tracing::info!(area_id, "Custom area deleted");
        Ok(())
    }

    /// Ask the backend to (re)calculate coverage for an area.
    pub async fn calculate_coverage(&self, area_id: u64) -> Result<serde_json::Value> {
        self.api
            .post_empty(&format!("/api/custom-areas/{}/calculate-coverage", area_id))
            .await
    }
}

/// Coverage calculation for one custom area.
///
/// The area is read before the calculation is requested. The job is done when
/// a coverage percentage appears, or, for an area that already had one, when
/// the backend stores a new result (`updated_at` or the value changes).
#[derive(Clone, Debug)]
pub struct AreaCoverageJob {
    client: CustomAreasClient,
    area_id: u64,
    before: OnceLock<CustomArea>,
}

impl AreaCoverageJob {
    pub fn new(client: CustomAreasClient, area_id: u64) -> Self {
        Self {
            client,
            area_id,
            before: OnceLock::new(),
        }
    }

    pub fn key_for(area_id: u64) -> JobKey {
        JobKey::new("area-coverage", area_id)
    }
}

#[async_trait]
impl PollingJob for AreaCoverageJob {
    type Snapshot = CustomArea;

    fn key(&self) -> JobKey {
        Self::key_for(self.area_id)
    }

    async fn start(&self) -> Result<()> {
        let before = self.client.get(self.area_id).await?;
        // A tracked job is started once.
        let _ = self.before.set(before);

        self.client.calculate_coverage(self.area_id).await?;
        tracing::info!(area_id = self.area_id, "Coverage calculation started");
        Ok(())
    }

    /// An out-of-range coverage counts as a failed check.
    async fn status(&self) -> Result<CustomArea> {
        let area = self.client.get(self.area_id).await?;
        if !area.has_valid_coverage() {
            return Err(AppError::Decode(format!(
                "coverage {:?} for area {} is outside 0-100",
                area.coverage_percentage, self.area_id
            )));
        }
        Ok(area)
    }

    fn is_terminal(&self, snapshot: &CustomArea) -> bool {
        if snapshot.coverage_percentage.is_none() {
            return false;
        }
        match self.before.get() {
            Some(before) if before.coverage_percentage.is_some() => {
                snapshot.updated_at != before.updated_at
                    || snapshot.coverage_percentage != before.coverage_percentage
            }
            _ => true,
        }
    }
}
