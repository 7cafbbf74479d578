// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, Utc};

/// Render a backend timestamp for display, e.g. `2024-06-01 14:05 UTC`.
///
/// Unparseable values are shown as-is; a missing value is "never".
pub fn describe_timestamp(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return "never".to_string();
    };

    match DateTime::parse_from_rfc3339(raw) {
        Ok(date) => date
            .with_timezone(&Utc)
            .format("%Y-%m-%d %H:%M UTC")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}
