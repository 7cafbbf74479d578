// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Cached comment and feature settings.
//!
//! Navigation and the settings view both read through this store, so the
//! settings are fetched once per user until they are saved again.

use crate::error::Result;
use crate::models::CommentSettings;
use crate::services::comments::CommentsClient;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct SettingsStore {
    client: CommentsClient,
    cache: Arc<DashMap<u64, CommentSettings>>,
}

impl SettingsStore {
    pub fn new(client: CommentsClient) -> Self {
        Self {
            client,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Settings for a user, fetched on first use.
    pub async fn get(&self, user_id: u64) -> Result<CommentSettings> {
        if let Some(cached) = self.cache.get(&user_id) {
            tracing::debug!(user_id, "Settings cache hit");
            return Ok(cached.clone());
        }

        let settings = self.client.settings(user_id).await?;
        self.cache.insert(user_id, settings.clone());
        Ok(settings)
    }

    /// Whether the custom areas section is enabled. Defaults to off when the
    /// settings cannot be loaded.
    pub async fn custom_areas_enabled(&self, user_id: u64) -> bool {
        match self.get(user_id).await {
            Ok(settings) => settings.custom_areas_enabled,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Failed to load settings");
                false
            }
        }
    }

    /// Save settings and drop the cached copy.
    pub async fn save(&self, user_id: u64, settings: &CommentSettings) -> Result<()> {
        let result = self.client.update_settings(user_id, settings).await;
        self.invalidate(user_id);
        result?;
        tracing::info!(user_id, "Settings saved");
        Ok(())
    }

    /// Load, change and save in one step.
    pub async fn update<F>(&self, user_id: u64, change: F) -> Result<CommentSettings>
    where
        F: FnOnce(&mut CommentSettings),
    {
        let mut settings = self.get(user_id).await?;
        change(&mut settings);
        self.save(user_id, &settings).await?;
        Ok(settings)
    }

    pub fn invalidate(&self, user_id: u64) {
        self.cache.remove(&user_id);
    }
}
