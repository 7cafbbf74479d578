// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Shared test helpers: an in-process mock of the coverage backend.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strava_coverage::config::Config;
use strava_coverage::routes::{create_router, LoginHandoff};
use strava_coverage::services::{ApiClient, Clients};
use strava_coverage::AppState;

/// Recorded state and canned answers of the mock backend.
#[derive(Default)]
pub struct MockBackend {
    calls: DashMap<&'static str, usize>,
    import_statuses: Mutex<VecDeque<Value>>,
    areas: Mutex<BTreeMap<u64, Value>>,
    next_area_id: AtomicU64,
    cities: Mutex<Vec<Value>>,
    search_results: Mutex<Vec<Value>>,
    search_fails: AtomicBool,
    settings: Mutex<Option<Value>>,
    /// Coverage reported for an area once its calculation was requested
    area_coverage: Mutex<Option<f64>>,
    calculations: AtomicU64,
}

#[allow(dead_code)]
impl MockBackend {
    fn hit(&self, name: &'static str) {
        *self.calls.entry(name).or_insert(0) += 1;
    }

    /// Number of requests seen by one endpoint.
    pub fn calls(&self, name: &'static str) -> usize {
        self.calls.get(name).map(|c| *c).unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|c| *c.value()).sum()
    }

    /// Import statuses to answer, in order; the last one repeats.
    pub fn set_import_statuses(&self, statuses: Vec<Value>) {
        *self.import_statuses.lock().unwrap() = statuses.into();
    }

    pub fn set_cities(&self, cities: Vec<Value>) {
        *self.cities.lock().unwrap() = cities;
    }

    pub fn set_search_results(&self, results: Vec<Value>) {
        *self.search_results.lock().unwrap() = results;
    }

    pub fn fail_search(&self, fail: bool) {
        self.search_fails.store(fail, Ordering::SeqCst);
    }

    pub fn set_settings(&self, settings: Value) {
        *self.settings.lock().unwrap() = Some(settings);
    }

    pub fn set_area_coverage(&self, coverage: Option<f64>) {
        *self.area_coverage.lock().unwrap() = coverage;
    }

    /// Store a calculation result for an area outside of a request, as a
    /// slow backend worker would.
    pub fn finish_area_calculation(&self, id: u64, coverage: f64) {
        if let Some(area) = self.areas.lock().unwrap().get_mut(&id) {
            store_coverage(self, area, coverage);
        }
    }

    pub fn area_count(&self) -> usize {
        self.areas.lock().unwrap().len()
    }
}

/// Import status body as the backend sends it.
#[allow(dead_code)]
pub fn import_status(imported: u32, in_progress: bool) -> Value {
    json!({
        "user_id": 7,
        "total_activities": 120,
        "imported_count": imported,
        "processed_count": imported,
        "failed_count": 0,
        "last_import_time": "2024-06-01T14:05:00Z",
        "in_progress": in_progress,
        "current_page": imported / 50 + 1,
        "estimated_remaining": 120u32.saturating_sub(imported)
    })
}

#[allow(dead_code)]
pub fn default_settings(user_id: u64) -> Value {
    json!({
        "user_id": user_id,
        "enabled": true,
        "running_enabled": true,
        "cycling_enabled": true,
        "walking_enabled": false,
        "hiking_enabled": false,
        "ebiking_enabled": false,
        "skiing_enabled": false,
        "comment_template": "🗺️ {city} coverage: {coverage}%",
        "min_coverage_increase": 0.5,
        "custom_areas_enabled": true,
        "created_at": "2024-05-01T00:00:00Z",
        "updated_at": "2024-05-01T00:00:00Z"
    })
}

type Mock = State<Arc<MockBackend>>;

fn not_found(what: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": format!("{} not found", what) }))).into_response()
}

async fn health(State(mock): Mock) -> Json<Value> {
    mock.hit("health");
    Json(json!({ "status": "healthy" }))
}

async fn start_import(State(mock): Mock, Path(user): Path<u64>) -> Json<Value> {
    mock.hit("import.start");
    Json(json!({ "message": "Import started", "user_id": user }))
}

async fn import_status_handler(State(mock): Mock, Path(_user): Path<u64>) -> Response {
    mock.hit("import.status");
    let mut statuses = mock.import_statuses.lock().unwrap();
    let status = if statuses.len() > 1 {
        statuses.pop_front()
    } else {
        statuses.front().cloned()
    };
    match status {
        Some(status) => Json(status).into_response(),
        None => not_found("Import status"),
    }
}

async fn auto_detect(State(mock): Mock, Path(_user): Path<u64>) -> Json<Value> {
    mock.hit("detect");
    Json(json!({
        "cities": [
            { "id": 1, "name": "Sheffield", "country_code": "GB", "activity_count": 80 },
            { "id": 2, "name": "Leeds", "country_code": "GB", "activity_count": 12 }
        ]
    }))
}

async fn calculate_all(State(mock): Mock, Path(_user): Path<u64>) -> Json<Value> {
    mock.hit("calculate_all");
    Json(json!({ "message": "Coverage calculated" }))
}

async fn summary(State(mock): Mock, Path(user): Path<u64>) -> Json<Value> {
    mock.hit("summary");
    Json(json!({
        "user_id": user.to_string(),
        "total_cities": 2,
        "city_coverage": [
            { "city_id": 2, "city_name": "Leeds", "country_code": "GB", "coverage_percent": 3.2,
              "distance_covered_km": 40.0, "total_distance_km": 1250.0, "activity_count": 12 },
            { "city_id": 1, "city_name": "Sheffield", "country_code": "GB", "coverage_percent": 21.7,
              "distance_covered_km": 310.5, "total_distance_km": 1430.9, "activity_count": 80 }
        ],
        "global_stats": {
            "total_distance_covered_km": 350.5,
            "average_coverage_percent": 12.45,
            "best_city_name": "Sheffield",
            "best_city_coverage_percent": 21.7
        }
    }))
}

async fn list_cities(State(mock): Mock) -> Json<Value> {
    mock.hit("cities.list");
    Json(Value::Array(mock.cities.lock().unwrap().clone()))
}

async fn search_cities(State(mock): Mock, Query(params): Query<HashMap<String, String>>) -> Response {
    mock.hit("cities.search");
    if mock.search_fails.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "geocoder unavailable").into_response();
    }
    let query = params.get("q").cloned().unwrap_or_default().to_lowercase();
    let results: Vec<Value> = mock
        .search_results
        .lock()
        .unwrap()
        .iter()
        .filter(|c| {
            c["name"]
                .as_str()
                .is_some_and(|n| n.to_lowercase().contains(&query))
        })
        .cloned()
        .collect();
    Json(Value::Array(results)).into_response()
}

async fn create_external_city(State(mock): Mock, Json(body): Json<Value>) -> Json<Value> {
    mock.hit("cities.external");
    Json(json!({
        "id": 501,
        "name": body["name"],
        "country_code": body["country_code"],
        "latitude": body["latitude"],
        "longitude": body["longitude"]
    }))
}

async fn list_areas(State(mock): Mock, Path(_user): Path<u64>) -> Json<Value> {
    mock.hit("areas.list");
    Json(Value::Array(
        mock.areas.lock().unwrap().values().cloned().collect(),
    ))
}

async fn create_area(State(mock): Mock, Path(user): Path<u64>, Json(body): Json<Value>) -> Json<Value> {
    mock.hit("areas.create");
    let id = mock.next_area_id.fetch_add(1, Ordering::SeqCst) + 1;
    let area = json!({
        "id": id,
        "user_id": user,
        "name": body["name"],
        "coordinates": body["coordinates"],
        "coverage_percentage": null,
        "activities_count": 0,
        "created_at": "2024-06-01T10:00:00Z",
        "updated_at": "2024-06-01T10:00:00Z"
    });
    mock.areas.lock().unwrap().insert(id, area.clone());
    Json(area)
}

async fn get_area(State(mock): Mock, Path(id): Path<u64>) -> Response {
    mock.hit("areas.get");
    match mock.areas.lock().unwrap().get(&id) {
        Some(area) => Json(area.clone()).into_response(),
        None => not_found("Custom area"),
    }
}

async fn update_area(State(mock): Mock, Path(id): Path<u64>, Json(body): Json<Value>) -> Response {
    mock.hit("areas.update");
    let mut areas = mock.areas.lock().unwrap();
    match areas.get_mut(&id) {
        Some(area) => {
            area["name"] = body["name"].clone();
            area["coordinates"] = body["coordinates"].clone();
            Json(area.clone()).into_response()
        }
        None => not_found("Custom area"),
    }
}

async fn delete_area(State(mock): Mock, Path(id): Path<u64>) -> Response {
    mock.hit("areas.delete");
    match mock.areas.lock().unwrap().remove(&id) {
        Some(_) => Json(json!({ "message": "Custom area deleted" })).into_response(),
        None => not_found("Custom area"),
    }
}

fn store_coverage(mock: &MockBackend, area: &mut Value, coverage: f64) {
    let run = mock.calculations.fetch_add(1, Ordering::SeqCst) + 1;
    area["coverage_percentage"] = json!(coverage);
    area["activities_count"] = json!(4);
    area["updated_at"] = json!(format!("2024-06-01T11:{:02}:00Z", run % 60));
}

async fn calculate_area(State(mock): Mock, Path(id): Path<u64>) -> Response {
    mock.hit("areas.calculate");
    let coverage = *mock.area_coverage.lock().unwrap();
    let mut areas = mock.areas.lock().unwrap();
    match areas.get_mut(&id) {
        Some(area) => {
            if let Some(coverage) = coverage {
                store_coverage(&mock, area, coverage);
            }
            Json(json!({ "message": "Coverage calculation started" })).into_response()
        }
        None => not_found("Custom area"),
    }
}

async fn get_settings(State(mock): Mock, Path(_user): Path<u64>) -> Response {
    mock.hit("settings.get");
    match mock.settings.lock().unwrap().clone() {
        Some(settings) => Json(json!({ "settings": settings })).into_response(),
        None => not_found("Settings"),
    }
}

async fn put_settings(State(mock): Mock, Path(_user): Path<u64>, Json(body): Json<Value>) -> Json<Value> {
    mock.hit("settings.put");
    *mock.settings.lock().unwrap() = Some(body);
    Json(json!({ "message": "Settings updated" }))
}

async fn broken(State(mock): Mock) -> Response {
    mock.hit("broken");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": "database down" })),
    )
        .into_response()
}

fn mock_router(mock: Arc<MockBackend>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/import/initial/{user}", post(start_import))
        .route("/api/import/status/{user}", get(import_status_handler))
        .route("/api/detection/auto-detect/{user}", post(auto_detect))
        .route("/api/multi-coverage/calculate-all/{user}", post(calculate_all))
        .route("/api/multi-coverage/user/{user}/summary", get(summary))
        .route("/api/cities/", get(list_cities))
        .route("/api/cities/search", get(search_cities))
        .route("/api/cities/external", post(create_external_city))
        .route("/api/custom-areas/user/{user}", get(list_areas).post(create_area))
        .route(
            "/api/custom-areas/{id}",
            get(get_area).put(update_area).delete(delete_area),
        )
        .route("/api/custom-areas/{id}/calculate-coverage", post(calculate_area))
        .route("/api/comments/settings/{user}", get(get_settings).put(put_settings))
        .route("/api/broken", get(broken))
        .with_state(mock)
}

/// A running mock backend.
#[allow(dead_code)]
pub struct TestBackend {
    pub url: String,
    pub mock: Arc<MockBackend>,
}

#[allow(dead_code)]
impl TestBackend {
    pub fn clients(&self) -> Clients {
        let api = ApiClient::new(self.url.clone(), Duration::from_secs(2))
            .expect("Failed to build API client");
        Clients::new(api)
    }

    /// Config pointing at the mock with fast polling.
    pub fn config(&self) -> Config {
        Config {
            api_url: self.url.clone(),
            request_timeout: Duration::from_secs(2),
            import_poll_interval: Duration::from_millis(20),
            area_poll_interval: Duration::from_millis(20),
            area_poll_max_wait: Duration::from_secs(2),
            ..Config::default()
        }
    }
}

/// Start a mock backend on an ephemeral port.
#[allow(dead_code)]
pub async fn spawn_backend() -> TestBackend {
    let mock = Arc::new(MockBackend::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock backend");
    let addr = listener.local_addr().expect("No local address");
    let app = mock_router(mock.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock backend failed");
    });

    TestBackend {
        url: format!("http://{}", addr),
        mock,
    }
}

/// Create the callback listener app with nobody waiting for a login.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState {
        config: Config::default(),
        login: LoginHandoff::detached(),
    });
    (create_router(state.clone()), state)
}

/// Wait until `check` holds, polling every few milliseconds.
#[allow(dead_code)]
pub async fn eventually<F: Fn() -> bool>(check: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Condition not met in time");
}
