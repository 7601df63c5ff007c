//! Leaderboard REST API Client
//!
//! HTTP client for the one-shot calls the leaderboard server exposes.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::error::SnapshotError;
use crate::config::ServerConfig;
use crate::model::{RankedEntity, Team};

/// REST client for team and ranking snapshots
#[derive(Debug, Clone)]
pub struct SnapshotClient {
    client: Client,
    base_url: String,
}

impl SnapshotClient {
    /// Create a client for the server at `base_url` (e.g. "http://localhost:8003")
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SnapshotError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(SnapshotError::Request)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, SnapshotError> {
        Self::new(config.url.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/teams`
    pub async fn teams(&self) -> Result<Vec<Team>, SnapshotError> {
        let url = format!("{}/api/teams", self.base_url);
        self.get_json(&url).await
    }

    /// `GET /api/teams/{id}`
    pub async fn team(&self, id: &str) -> Result<Team, SnapshotError> {
        let url = format!("{}/api/teams/{}", self.base_url, urlencoding::encode(id));
        self.get_json(&url).await
    }

    /// `GET /api/leaderboard`, optionally scoped to one team's members
    pub async fn leaderboard(
        &self,
        team_id: Option<&str>,
    ) -> Result<Vec<RankedEntity>, SnapshotError> {
        let url = match team_id {
            Some(id) => format!(
                "{}/api/leaderboard?team_id={}",
                self.base_url,
                urlencoding::encode(id)
            ),
            None => format!("{}/api/leaderboard", self.base_url),
        };
        self.get_json(&url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SnapshotError> {
        tracing::debug!(url = %url, "Snapshot request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_request_error)?;

        let response = check_status(response).await?;
        let body = response.text().await.map_err(classify_request_error)?;

        serde_json::from_str(&body).map_err(SnapshotError::Malformed)
    }
}

fn classify_request_error(e: reqwest::Error) -> SnapshotError {
    if e.is_timeout() {
        SnapshotError::Timeout
    } else if e.is_connect() {
        SnapshotError::Unavailable
    } else {
        SnapshotError::Request(e)
    }
}

async fn check_status(response: Response) -> Result<Response, SnapshotError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    Err(SnapshotError::ApiError {
        status: status.as_u16(),
        message: text,
    })
}
