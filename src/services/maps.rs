// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Map data: GeoJSON layers, bounds and style configuration.

use crate::error::Result;
use crate::services::api::ApiClient;
use geojson::GeoJson;

#[derive(Clone, Debug)]
pub struct MapsClient {
    api: ApiClient,
}

impl MapsClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Map provider configuration (tile URLs, default view).
    pub async fn config(&self) -> Result<serde_json::Value> {
        self.api.get_json("/api/maps/config").await
    }

    /// Boundaries of every known city.
    pub async fn cities(&self) -> Result<GeoJson> {
        self.api.get_json("/api/maps/cities").await
    }

    pub async fn city(&self, city_id: u64) -> Result<GeoJson> {
        self.api
            .get_json(&format!("/api/maps/cities/{}", city_id))
            .await
    }

    /// All of a user's activity tracks.
    pub async fn activities(&self, user_id: u64) -> Result<GeoJson> {
        self.api
            .get_json(&format!("/api/maps/activities/user/{}", user_id))
            .await
    }

    /// Covered street segments for a user in one city.
    pub async fn coverage(&self, user_id: u64, city_id: u64) -> Result<GeoJson> {
        self.api
            .get_json(&format!("/api/maps/coverage/user/{}/city/{}", user_id, city_id))
            .await
    }

    pub async fn city_bounds(&self, city_id: u64) -> Result<serde_json::Value> {
        self.api
            .get_json(&format!("/api/maps/bounds/city/{}", city_id))
            .await
    }

    pub async fn user_bounds(&self, user_id: u64) -> Result<serde_json::Value> {
        self.api
            .get_json(&format!("/api/maps/bounds/user/{}", user_id))
            .await
    }

    pub async fn styles(&self) -> Result<serde_json::Value> {
        self.api.get_json("/api/maps/styles").await
    }
}
