use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier for a user whose profile may need hydration.
///
/// The API keys profiles by campus email address, so this is an opaque
/// string under the hood. Stable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Base profile fields returned by `GET /user/{email}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub email: String,
    pub image: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One education-history entry returned by `GET /education/{email}`.
/// All fields optional - the server stores whatever the user filled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EducationRecord {
    pub id: Option<i64>,
    pub school: Option<String>,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub grade: Option<String>,
    pub activities: Option<String>,
    pub societies: Option<String>,
}

/// Fully-hydrated profile: base fields plus education history.
///
/// Immutable once cached - a re-fetch replaces the whole record rather
/// than mutating it in place, so cached copies can be shared freely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub profile: Profile,
    pub education: Vec<EducationRecord>,
    pub hydrated_at: DateTime<Utc>,
}

impl ProfileRecord {
    pub fn display_name(&self) -> &str {
        self.profile
            .name
            .as_deref()
            .unwrap_or(&self.profile.email)
    }
}

// API response wrappers

/// Envelope for `GET /user/{email}`: `{ "message": ..., "data": [rows] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    pub message: Option<String>,
    #[serde(default)]
    pub data: Vec<Profile>,
}

/// Envelope for `GET /education/{email}`: `{ "success": ..., "data": [rows] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct EducationResponse {
    pub success: Option<bool>,
    #[serde(default)]
    pub data: Vec<EducationRecord>,
}
