// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Read-only coverage aggregates computed by the backend.

use serde::{Deserialize, Deserializer, Serialize};

/// Per-user coverage summary across all detected cities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Sent as a string on the summary endpoint, as a number elsewhere
    #[serde(default, deserialize_with = "id_as_string")]
    pub user_id: String,
    #[serde(default)]
    pub total_cities: u32,
    #[serde(default)]
    pub city_coverage: Vec<CityCoverage>,
    #[serde(default)]
    pub global_stats: GlobalStats,
}

impl CoverageSummary {
    /// Cities ordered by coverage, best first.
    pub fn top_cities(&self, limit: usize) -> Vec<&CityCoverage> {
        let mut cities: Vec<&CityCoverage> = self.city_coverage.iter().collect();
        cities.sort_by(|a, b| b.coverage_percent.total_cmp(&a.coverage_percent));
        cities.truncate(limit);
        cities
    }

    pub fn is_empty(&self) -> bool {
        self.city_coverage.is_empty()
    }
}

fn id_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Number(u64),
        Text(String),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Number(id) => id.to_string(),
        Id::Text(id) => id,
    })
}

/// Coverage of a single city.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityCoverage {
    pub city_id: u64,
    pub city_name: String,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub coverage_percent: f64,
    #[serde(default)]
    pub distance_covered_km: f64,
    #[serde(default)]
    pub total_distance_km: f64,
    #[serde(default)]
    pub activity_count: u32,
    #[serde(default)]
    pub last_activity_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    #[serde(default)]
    pub total_distance_covered_km: f64,
    #[serde(default)]
    pub average_coverage_percent: f64,
    #[serde(default)]
    pub best_city_name: String,
    #[serde(default)]
    pub best_city_coverage_percent: f64,
}

/// Detailed coverage for one user in one city.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityCoverageReport {
    #[serde(default)]
    pub city_id: u64,
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(default, alias = "coverage_percentage")]
    pub coverage_percent: f64,
    #[serde(default)]
    pub distance_covered_km: f64,
    #[serde(default)]
    pub total_distance_km: f64,
    #[serde(default)]
    pub activity_count: u32,
    #[serde(default)]
    pub calculated_at: Option<String>,
}
