// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! City lookup, search and selection.

use crate::error::{AppError, Result};
use crate::models::city::{cities_from_records, UnusableCity};
use crate::models::{CandidateCity, City, CityRecord, PersistedCity};
use crate::services::api::ApiClient;

#[derive(Clone, Debug)]
pub struct CitiesClient {
    api: ApiClient,
}

impl CitiesClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<City>> {
        let records: Option<Vec<CityRecord>> = self.api.get_json("/api/cities/").await?;
        Ok(cities_from_records(records.unwrap_or_default()))
    }

    pub async fn get(&self, city_id: u64) -> Result<PersistedCity> {
        let record: CityRecord = self
            .api
            .get_json(&format!("/api/cities/{}", city_id))
            .await?;
        PersistedCity::try_from(record).map_err(unusable)
    }

    /// Search stored cities and geocoding results.
    pub async fn search(&self, query: &str) -> Result<Vec<City>> {
        let records: Option<Vec<CityRecord>> = self
            .api
            .get_json_query("/api/cities/search", &[("q", query.trim())])
            .await?;
        Ok(cities_from_records(records.unwrap_or_default()))
    }

    /// Store a geocoding result as a city.
    pub async fn create_from_external(&self, candidate: &CandidateCity) -> Result<PersistedCity> {
        let record: CityRecord = self.api.post_json("/api/cities/external", candidate).await?;
        let city = PersistedCity::try_from(record).map_err(unusable)?;
        tracing::info!(city_id = city.id, name = %city.name, "City created from search result");
        Ok(city)
    }

    /// Turn any city into a stored one, creating it if needed.
    pub async fn resolve(&self, city: &City) -> Result<PersistedCity> {
        match city {
            City::Persisted(city) => Ok(city.clone()),
            City::Candidate(candidate) => self.create_from_external(candidate).await,
        }
    }
}

fn unusable(err: UnusableCity) -> AppError {
    AppError::Decode(err.to_string())
}

/// Results of a city search.
#[derive(Debug, Clone, PartialEq)]
pub struct CitySearch {
    pub cities: Vec<City>,
    /// Set when the backend search failed and local results are shown instead
    pub error: Option<String>,
}

type SelectionCallback = Box<dyn Fn(u64) + Send + Sync>;

/// Picks a city for a coverage view, creating search results on demand.
///
/// The callback only ever sees ids of stored cities.
pub struct CitySelector {
    client: CitiesClient,
    known: Vec<City>,
    on_selected: SelectionCallback,
}

impl CitySelector {
    pub fn new(
        client: CitiesClient,
        known: Vec<City>,
        on_selected: impl Fn(u64) + Send + Sync + 'static,
    ) -> Self {
        Self {
            client,
            known,
            on_selected: Box::new(on_selected),
        }
    }

    /// Search, falling back to filtering the known cities if the backend fails.
    pub async fn search(&self, query: &str) -> CitySearch {
        if query.trim().is_empty() {
            return CitySearch {
                cities: self.known.clone(),
                error: None,
            };
        }

        match self.client.search(query).await {
            Ok(cities) => CitySearch {
                cities,
                error: None,
            },
            Err(e) => {
                tracing::warn!(query, error = %e, "City search failed, filtering locally");
                CitySearch {
                    cities: self
                        .known
                        .iter()
                        .filter(|c| c.matches(query))
                        .cloned()
                        .collect(),
                    error: Some("Failed to search cities. Please try again.".to_string()),
                }
            }
        }
    }

    /// Select a city. Candidates are created first; on failure the callback
    /// does not fire.
    pub async fn select(&self, city: &City) -> Result<u64> {
        let resolved = self.client.resolve(city).await?;
        (self.on_selected)(resolved.id);
        Ok(resolved.id)
    }
}
