// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! City models.
//!
//! The backend marks geocoding results that are not yet stored with id `0`.
//! That sentinel never leaves this module: wire records decode into
//! [`City::Persisted`] or [`City::Candidate`].

use serde::{Deserialize, Serialize};

/// City as sent by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    pub id: u64,
    pub name: String,
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// A city stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedCity {
    pub id: u64,
    pub name: String,
    pub country_code: String,
}

/// A geocoding result that must be created before it can be used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateCity {
    pub name: String,
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum City {
    Persisted(PersistedCity),
    Candidate(CandidateCity),
}

impl City {
    pub fn name(&self) -> &str {
        match self {
            City::Persisted(c) => &c.name,
            City::Candidate(c) => &c.name,
        }
    }

    pub fn country_code(&self) -> &str {
        match self {
            City::Persisted(c) => &c.country_code,
            City::Candidate(c) => &c.country_code,
        }
    }

    /// Case-insensitive match on name or country code (local search fallback).
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        self.name().to_lowercase().contains(&query)
            || self.country_code().to_lowercase().contains(&query)
    }
}

/// Wire record that cannot be turned into a usable city.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("city {name:?} has no id and no coordinates")]
pub struct UnusableCity {
    pub name: String,
}

impl TryFrom<CityRecord> for City {
    type Error = UnusableCity;

    fn try_from(record: CityRecord) -> Result<Self, Self::Error> {
        if record.id != 0 {
            return Ok(City::Persisted(PersistedCity {
                id: record.id,
                name: record.name,
                country_code: record.country_code,
            }));
        }

        match (record.latitude, record.longitude) {
            (Some(latitude), Some(longitude)) if latitude.is_finite() && longitude.is_finite() => {
                Ok(City::Candidate(CandidateCity {
                    name: record.name,
                    country_code: record.country_code,
                    latitude,
                    longitude,
                }))
            }
            _ => Err(UnusableCity { name: record.name }),
        }
    }
}

impl TryFrom<CityRecord> for PersistedCity {
    type Error = UnusableCity;

    fn try_from(record: CityRecord) -> Result<Self, Self::Error> {
        match City::try_from(record)? {
            City::Persisted(city) => Ok(city),
            City::Candidate(c) => Err(UnusableCity { name: c.name }),
        }
    }
}

/// Decode a list of wire records, dropping (and logging) unusable ones.
pub fn cities_from_records(records: Vec<CityRecord>) -> Vec<City> {
    records
        .into_iter()
        .filter_map(|record| match City::try_from(record) {
            Ok(city) => Some(city),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unusable city record");
                None
            }
        })
        .collect()
}

/// Result of the backend's automatic city detection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    #[serde(default)]
    pub cities: Vec<DetectedCity>,
}

/// A city the backend found the user's activities in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedCity {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub activity_count: Option<u32>,
}
