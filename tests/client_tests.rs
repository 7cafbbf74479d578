// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Resource clients against the mock backend.

use serde_json::json;
use std::sync::{Arc, Mutex};
use strava_coverage::error::{AppError, ValidationError};
use strava_coverage::models::{City, LatLng, NewCustomArea};
use strava_coverage::services::{CitySelector, SettingsStore};

mod common;
use common::{default_settings, spawn_backend};

fn triangle() -> Vec<LatLng> {
    vec![
        LatLng(53.38, -1.47),
        LatLng(53.39, -1.46),
        LatLng(53.37, -1.45),
    ]
}

#[tokio::test]
async fn test_invalid_area_names_never_reach_the_backend() {
    let backend = spawn_backend().await;
    let clients = backend.clients();

    let err = clients
        .custom_areas
        .create(7, &NewCustomArea::new("   ", triangle()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::Required { field: "name" })
    ));
    assert!(err.is_local());

    let err = clients
        .custom_areas
        .create(7, &NewCustomArea::new(&"a".repeat(101), triangle()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::TooLong { max: 100, .. })
    ));

    let err = clients
        .custom_areas
        .update(1, &NewCustomArea::new("Two points", triangle()[..2].to_vec()))
        .await
        .unwrap_err();
    assert!(err.is_local());

    assert_eq!(backend.mock.total_calls(), 0);

    let created = clients
        .custom_areas
        .create(7, &NewCustomArea::new(&"a".repeat(100), triangle()))
        .await
        .unwrap();
    assert_eq!(created.name.len(), 100);
    assert_eq!(backend.mock.calls("areas.create"), 1);
}

#[tokio::test]
async fn test_area_update_and_list() {
    let backend = spawn_backend().await;
    let clients = backend.clients();

    let created = clients
        .custom_areas
        .create(7, &NewCustomArea::new("Loop A", triangle()))
        .await
        .unwrap();

    let mut outline = triangle();
    outline.push(LatLng(53.375, -1.475));
    let updated = clients
        .custom_areas
        .update(created.id, &NewCustomArea::new("Loop B", outline))
        .await
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.name, "Loop B");
    assert_eq!(updated.coordinates.len(), 4);

    let areas = clients.custom_areas.list(7).await.unwrap();
    assert_eq!(areas.len(), 1);
    assert_eq!(areas[0].name, "Loop B");
}

#[tokio::test]
async fn test_selecting_candidate_creates_city_first() {
    let backend = spawn_backend().await;
    backend.mock.set_search_results(vec![
        json!({ "id": 0, "name": "Hebden Bridge", "country_code": "GB",
                "latitude": 53.742, "longitude": -2.014 }),
        json!({ "id": 3, "name": "Hebden Royd", "country_code": "GB" }),
    ]);

    let selected = Arc::new(Mutex::new(Vec::new()));
    let record = selected.clone();
    let clients = backend.clients();
    let selector = CitySelector::new(clients.cities.clone(), Vec::new(), move |id| {
        record.lock().unwrap().push(id);
    });

    let found = selector.search("hebden").await;
    assert_eq!(found.error, None);
    assert_eq!(found.cities.len(), 2);
    assert!(matches!(found.cities[0], City::Candidate(_)));
    assert!(matches!(found.cities[1], City::Persisted(_)));

    let id = selector.select(&found.cities[0]).await.unwrap();
    assert_eq!(id, 501);
    assert_eq!(backend.mock.calls("cities.external"), 1);
    assert_eq!(*selected.lock().unwrap(), vec![501]);

    let id = selector.select(&found.cities[1]).await.unwrap();
    assert_eq!(id, 3);
    assert_eq!(backend.mock.calls("cities.external"), 1);
    assert_eq!(*selected.lock().unwrap(), vec![501, 3]);
}

#[tokio::test]
async fn test_search_falls_back_to_known_cities() {
    let backend = spawn_backend().await;
    backend.mock.set_cities(vec![
        json!({ "id": 1, "name": "Sheffield", "country_code": "GB" }),
        json!({ "id": 2, "name": "Leeds", "country_code": "GB" }),
    ]);
    backend.mock.fail_search(true);

    let clients = backend.clients();
    let known = clients.cities.list().await.unwrap();
    assert_eq!(known.len(), 2);

    let selector = CitySelector::new(clients.cities.clone(), known, |_| {});

    let all = selector.search("  ").await;
    assert_eq!(all.cities.len(), 2);
    assert_eq!(backend.mock.calls("cities.search"), 0);

    let found = selector.search("sheff").await;
    assert_eq!(
        found.error.as_deref(),
        Some("Failed to search cities. Please try again.")
    );
    assert_eq!(found.cities.len(), 1);
    assert_eq!(found.cities[0].name(), "Sheffield");
}

#[tokio::test]
async fn test_settings_are_cached_until_saved() {
    let backend = spawn_backend().await;
    backend.mock.set_settings(default_settings(7));

    let store = SettingsStore::new(backend.clients().comments);
    assert!(store.custom_areas_enabled(7).await);
    let settings = store.get(7).await.unwrap();
    assert!(settings.enabled);
    assert_eq!(backend.mock.calls("settings.get"), 1);

    let updated = store
        .update(7, |s| {
            s.custom_areas_enabled = false;
            s.min_coverage_increase = 1.5;
        })
        .await
        .unwrap();
    assert!(!updated.custom_areas_enabled);
    assert_eq!(backend.mock.calls("settings.put"), 1);

    let reloaded = store.get(7).await.unwrap();
    assert_eq!(backend.mock.calls("settings.get"), 2);
    assert!(!reloaded.custom_areas_enabled);
    assert_eq!(reloaded.min_coverage_increase, 1.5);
}

#[tokio::test]
async fn test_missing_settings_disable_custom_areas() {
    let backend = spawn_backend().await;
    let store = SettingsStore::new(backend.clients().comments);

    assert!(!store.custom_areas_enabled(7).await);
}

#[tokio::test]
async fn test_backend_error_messages() {
    let backend = spawn_backend().await;
    let clients = backend.clients();

    let err = clients
        .api
        .get_json::<serde_json::Value>("/api/broken")
        .await
        .unwrap_err();
    match err {
        AppError::Server { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "database down");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let err = clients.custom_areas.get(999).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("Custom area not found"));
    assert_eq!(err.user_message(), "Resource not found");

    let health = clients.api.health().await.unwrap();
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let clients = {
        let api = strava_coverage::services::ApiClient::new(
            "http://127.0.0.1:9",
            std::time::Duration::from_secs(2),
        )
        .unwrap();
        strava_coverage::services::Clients::new(api)
    };

    let err = clients.coverage.summary(7).await.unwrap_err();
    assert!(
        matches!(err, AppError::Network(_) | AppError::Timeout),
        "unexpected error: {:?}",
        err
    );
}
