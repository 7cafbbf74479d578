// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Services module - backend clients, job tracking and controllers.

pub mod api;
pub mod cities;
pub mod comments;
pub mod coverage;
pub mod custom_areas;
pub mod dashboard;
pub mod detection;
pub mod drawing;
pub mod imports;
pub mod jobs;
pub mod maps;
pub mod settings;
pub mod workflow;

pub use api::ApiClient;
pub use cities::{CitiesClient, CitySelector};
pub use comments::CommentsClient;
pub use coverage::CoverageClient;
pub use custom_areas::{AreaCoverageJob, CustomAreasClient};
pub use dashboard::{Dashboard, DashboardState};
pub use detection::DetectionClient;
pub use drawing::{AreaDrawingSession, DrawEvent, DrawnArea, MapSurface};
pub use imports::{ImportJob, ImportsClient};
pub use jobs::{JobError, JobEvent, JobHandle, JobKey, JobState, JobTracker, PollConfig};
pub use maps::MapsClient;
pub use settings::SettingsStore;
pub use workflow::{AutomatedWorkflow, WorkflowStep};

/// One client per resource family, all sharing a gateway.
#[derive(Clone, Debug)]
pub struct Clients {
    pub api: ApiClient,
    pub cities: CitiesClient,
    pub imports: ImportsClient,
    pub detection: DetectionClient,
    pub coverage: CoverageClient,
    pub custom_areas: CustomAreasClient,
    pub maps: MapsClient,
    pub comments: CommentsClient,
}

impl Clients {
    pub fn new(api: ApiClient) -> Self {
        Self {
            cities: CitiesClient::new(api.clone()),
            imports: ImportsClient::new(api.clone()),
            detection: DetectionClient::new(api.clone()),
            coverage: CoverageClient::new(api.clone()),
            custom_areas: CustomAreasClient::new(api.clone()),
            maps: MapsClient::new(api.clone()),
            comments: CommentsClient::new(api.clone()),
            api,
        }
    }
}
