// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! User model and the OAuth redirect parameters it is built from.

use crate::error::OAuthError;
use serde::{Deserialize, Serialize};

/// Display name used when the backend redirect carries no name.
const DEFAULT_USER_NAME: &str = "Strava User";

/// Signed-in user as known to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend user ID (used in every per-user endpoint)
    pub id: u64,
    /// Strava athlete ID
    pub strava_id: u64,
    /// Display name
    pub name: String,
    /// Email address (not provided by Strava, usually empty)
    pub email: String,
}

/// Query parameters of the backend's OAuth redirect.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthCallbackParams {
    #[serde(default)]
    pub success: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub strava_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl User {
    /// Build the user from a backend OAuth redirect.
    ///
    /// The redirect itself is the trust boundary; nothing is re-validated
    /// against the backend here.
    pub fn from_callback(params: &OAuthCallbackParams) -> Result<Self, OAuthError> {
        if let Some(error) = params.error.as_deref().filter(|e| !e.is_empty()) {
            return Err(OAuthError::Denied(error.to_string()));
        }

        let succeeded = params.success.as_deref() == Some("true");
        let id = params.user_id.as_deref().and_then(|v| v.trim().parse().ok());
        let strava_id = params
            .strava_id
            .as_deref()
            .and_then(|v| v.trim().parse().ok());

        match (succeeded, id, strava_id) {
            (true, Some(id), Some(strava_id)) => Ok(User {
                id,
                strava_id,
                name: decode_name(params.user_name.as_deref()),
                email: String::new(),
            }),
            // A bare code means the backend never finished the token exchange.
            _ if params.code.is_some() => Err(OAuthError::BackendIncomplete),
            _ => Err(OAuthError::MissingUserInfo),
        }
    }
}

fn decode_name(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|n| !n.is_empty()) else {
        return DEFAULT_USER_NAME.to_string();
    };
    urlencoding::decode(raw)
        .map(|n| n.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
