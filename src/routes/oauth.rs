// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! OAuth redirect receiver.
//!
//! The backend finishes the Strava token exchange and redirects the browser
//! here with the user's identity in the query string.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::error::{OAuthError, Result};
use crate::models::{OAuthCallbackParams, User};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/oauth/callback", get(oauth_callback))
}

/// Hands the first callback result to the waiting login command.
pub struct LoginHandoff {
    sender: Mutex<Option<oneshot::Sender<std::result::Result<User, OAuthError>>>>,
}

impl LoginHandoff {
    pub fn new() -> (Self, oneshot::Receiver<std::result::Result<User, OAuthError>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                sender: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Handoff that nobody waits for.
    pub fn detached() -> Self {
        Self {
            sender: Mutex::new(None),
        }
    }

    /// Deliver a result. Only the first one counts.
    fn deliver(&self, result: std::result::Result<User, OAuthError>) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        match sender {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
    pub message: String,
    pub user: User,
}

/// OAuth callback - turn the backend redirect into a signed-in user.
async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OAuthCallbackParams>,
) -> Result<Json<LoginResponse>> {
    let result = User::from_callback(&params);

    match &result {
        Ok(user) => tracing::info!(
            user_id = user.id,
            strava_id = user.strava_id,
            "OAuth login succeeded"
        ),
        Err(e) => tracing::warn!(error = %e, "OAuth callback rejected"),
    }

    if !state.login.deliver(result.clone()) {
        tracing::debug!("No login waiting for this callback");
    }

    let user = result?;
    Ok(Json(LoginResponse {
        status: "ok",
        message: format!("Logged in as {}. You can close this window.", user.name),
        user,
    }))
}
