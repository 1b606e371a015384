//! API client for communicating with the campusfeed REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests to the profile and education endpoints. It implements
//! `ProfileFetcher`, making it the production remote-lookup backend for
//! the preload subsystem.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::models::{EducationRecord, EducationResponse, Profile, UserId, UserResponse};
use crate::preload::ProfileFetcher;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL for the campusfeed API server
const API_BASE_URL: &str = "https://api.campusfeed.app";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for campusfeed.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client against the default server
    pub fn new() -> Result<Self> {
        Self::with_base_url(API_BASE_URL)
    }

    /// Create a client against a specific server (self-hosted deployments)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::InvalidResponse(format!("Invalid token header: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning a classified error if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .headers(self.auth_headers()?)
            .send()
            .await?;

        let response = Self::check_response(response).await?;

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", url, e)))
    }

    /// Fetch the base profile record for a user.
    /// The server wraps rows in a `{ message, data: [...] }` envelope.
    pub async fn get_user(&self, subject: &UserId) -> Result<Profile, ApiError> {
        let url = format!("{}/user/{}", self.base_url, subject);
        let resp: UserResponse = self.get(&url).await?;
        resp.data
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NotFound(format!("No profile for {}", subject)))
    }

    /// Fetch all education entries for a user, newest first.
    pub async fn get_education(&self, subject: &UserId) -> Result<Vec<EducationRecord>, ApiError> {
        let url = format!("{}/education/{}", self.base_url, subject);
        let resp: EducationResponse = self.get(&url).await?;
        Ok(resp.data)
    }
}

#[async_trait]
impl ProfileFetcher for ApiClient {
    async fn fetch_profile(&self, subject: &UserId) -> Result<Profile, ApiError> {
        self.get_user(subject).await
    }

    async fn fetch_education(&self, subject: &UserId) -> Result<Vec<EducationRecord>, ApiError> {
        self.get_education(subject).await
    }
}
