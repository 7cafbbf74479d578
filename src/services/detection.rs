// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

use crate::error::Result;
use crate::models::DetectionResult;
use crate::services::api::ApiClient;

/// City auto-detection from a user's imported activities.
#[derive(Clone, Debug)]
pub struct DetectionClient {
    api: ApiClient,
}

impl DetectionClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn auto_detect(&self, user_id: u64) -> Result<DetectionResult> {
        self.api
            .post_empty(&format!("/api/detection/auto-detect/{}", user_id))
            .await
    }
}
