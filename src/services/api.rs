// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! HTTP gateway to the coverage backend.
//!
//! Every resource client goes through [`ApiClient`], which owns the base URL,
//! the request timeout and the request/error logging. Clients are stateless
//! and never retry; retrying is the job tracker's business.

use crate::config::Config;
use crate::error::{AppError, Result};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Shared backend gateway. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.api_url.clone(), config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Backend liveness check.
    pub async fn health(&self) -> Result<serde_json::Value> {
        self.get_json("/api/health").await
    }

    /// GET with a JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.request(Method::GET, path);
        self.execute_json(Method::GET, path, request).await
    }

    /// GET with query parameters and a JSON response.
    pub async fn get_json_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let request = self.request(Method::GET, path).query(query);
        self.execute_json(Method::GET, path, request).await
    }

    /// POST without a body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.request(Method::POST, path);
        self.execute_json(Method::POST, path, request).await
    }

    /// POST a JSON body.
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.request(Method::POST, path).json(body);
        self.execute_json(Method::POST, path, request).await
    }

    /// PUT a JSON body.
    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.request(Method::PUT, path).json(body);
        self.execute_json(Method::PUT, path, request).await
    }

    /// DELETE, ignoring any response body.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let request = self.request(Method::DELETE, path);
        self.execute(Method::DELETE, path, request).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    async fn execute(&self, method: Method, path: &str, request: RequestBuilder) -> Result<Response> {
        tracing::debug!(method = %method, path, "API request");

        let response = request.send().await.map_err(|e| {
            tracing::warn!(method = %method, path, error = %e, "API request failed");
            AppError::from_transport(e)
        })?;

        check_response(&method, path, response).await
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = self.execute(method.clone(), path, request).await?;
        let body = response.text().await.map_err(AppError::from_transport)?;

        // Some start endpoints answer 200 with an empty body.
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };

        serde_json::from_str(body).map_err(|e| {
            tracing::warn!(method = %method, path, error = %e, "Undecodable API response");
            AppError::Decode(format!("{} {}: {}", method, path, e))
        })
    }
}

/// Check response status and map failures onto [`AppError`].
async fn check_response(method: &Method, path: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    tracing::warn!(
        method = %method,
        path,
        status = status.as_u16(),
        error = %message,
        "API error"
    );

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(AppError::NotFound(format!("{}: {}", path, message)));
    }

    Err(AppError::Server {
        status: status.as_u16(),
        message,
    })
}

/// Pull a human-readable message out of a backend error body.
///
/// The backend answers `{"error": "..."}`; some proxies answer plain text.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => ["error", "message", "detail"]
            .iter()
            .find_map(|k| value.get(k).and_then(|v| v.as_str()))
            .map(str::to_string),
        Err(_) => Some(trimmed.chars().take(200).collect()),
    }
}
