// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava Coverage: see how much of your city you have explored
//!
//! This crate provides typed clients for the coverage backend, a tracker for
//! its long-running jobs (activity import, custom-area coverage), headless
//! controllers for the dashboard flows and a local OAuth callback listener.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use routes::LoginHandoff;

/// Shared state of the OAuth callback listener.
pub struct AppState {
    pub config: Config,
    pub login: LoginHandoff,
}
