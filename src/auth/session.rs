use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::UserId;
use crate::preload::Preloader;

/// Token expiry time in minutes.
/// The campusfeed API issues JWTs valid for ~12 hours.
const TOKEN_EXPIRY_MINUTES: i64 = 720;

/// Buffer time before expiry to trigger refresh (30 minutes)
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn is_expired(&self) -> bool {
        let expiry = self.created_at + Duration::minutes(TOKEN_EXPIRY_MINUTES);
        Utc::now() > expiry
    }

    /// Check if the session will expire soon and should be refreshed
    pub fn needs_refresh(&self) -> bool {
        let refresh_at = self.created_at
            + Duration::minutes(TOKEN_EXPIRY_MINUTES - TOKEN_REFRESH_BUFFER_MINUTES);
        Utc::now() > refresh_at
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        let expiry = self.created_at + Duration::minutes(TOKEN_EXPIRY_MINUTES);
        (expiry - Utc::now()).num_minutes().max(0)
    }
}

/// Authenticated session for the campusfeed client.
///
/// Owns the profile preloader for its lifetime: preloaded state belongs to
/// the signed-in user, so signing out tears it all down.
pub struct Session {
    data: Option<SessionData>,
    preloader: Preloader,
}

impl Session {
    pub fn new(preloader: Preloader) -> Self {
        Self {
            data: None,
            preloader,
        }
    }

    /// Install session data after a successful authentication.
    /// The preloader is untouched - it only reacts to sign-out.
    pub fn sign_in(&mut self, data: SessionData) {
        info!(user = %data.user_id, "session established");
        self.data = Some(data);
    }

    /// Clear the session and reset all preload state.
    pub fn sign_out(&mut self) {
        if let Some(ref data) = self.data {
            info!(user = %data.user_id, "signing out");
        }
        self.data = None;
        self.preloader.reset();
    }

    /// Get the bearer token if a session exists
    pub fn token(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.token.as_str())
    }

    /// Get the signed-in user if a session exists
    pub fn user_id(&self) -> Option<&UserId> {
        self.data.as_ref().map(|d| &d.user_id)
    }

    /// Check if session is valid (exists and not expired)
    pub fn is_authenticated(&self) -> bool {
        self.data.as_ref().map(|d| !d.is_expired()).unwrap_or(false)
    }

    pub fn preloader(&self) -> &Preloader {
        &self.preloader
    }
}
