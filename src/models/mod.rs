// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models exchanged with the coverage backend.

pub mod city;
pub mod comments;
pub mod coverage;
pub mod custom_area;
pub mod import;
pub mod maps;
pub mod user;

pub use city::{CandidateCity, City, CityRecord, DetectionResult, PersistedCity};
pub use comments::{ActivityGroup, CommentSettings, CoverageIncrease};
pub use coverage::{CityCoverage, CityCoverageReport, CoverageSummary, GlobalStats};
pub use custom_area::{CustomArea, LatLng, NewCustomArea};
pub use import::ImportStatus;
pub use user::{OAuthCallbackParams, User};
