// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity import job snapshot.

use serde::{Deserialize, Serialize};

/// Latest import status for a user, replaced wholesale on every poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportStatus {
    pub user_id: u64,
    #[serde(default)]
    pub total_activities: u32,
    #[serde(default)]
    pub imported_count: u32,
    #[serde(default)]
    pub processed_count: u32,
    #[serde(default)]
    pub failed_count: u32,
    /// When the last import ran (ISO 8601)
    #[serde(default)]
    pub last_import_time: Option<String>,
    #[serde(default)]
    pub in_progress: bool,
    #[serde(default)]
    pub current_page: u32,
    /// Backend estimate of activities left to import
    #[serde(default)]
    pub estimated_remaining: u32,
}

impl ImportStatus {
    /// Progress line shown while polling.
    pub fn progress_message(&self) -> String {
        if self.in_progress {
            format!(
                "Importing activities... Page {}, {} activities imported so far.",
                self.current_page, self.imported_count
            )
        } else {
            format!(
                "Import completed! Imported {} activities.",
                self.imported_count
            )
        }
    }
}
