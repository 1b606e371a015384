//! Remote-lookup seam for the preload subsystem.
//!
//! `ProfileFetcher` is the boundary to the REST API; `ApiClient` is the
//! production implementation and tests substitute a mock. `hydrate`
//! composes the two-call lookup into one `ProfileRecord`.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use crate::api::ApiError;
use crate::models::{EducationRecord, Profile, ProfileRecord, UserId};

#[async_trait]
pub trait ProfileFetcher: Send + Sync + 'static {
    /// Primary lookup: base profile fields. Errors fail the whole fetch.
    async fn fetch_profile(&self, subject: &UserId) -> Result<Profile, ApiError>;

    /// Secondary lookup: education history. Errors are tolerated.
    async fn fetch_education(&self, subject: &UserId) -> Result<Vec<EducationRecord>, ApiError>;
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("remote profile lookup failed for {subject}: {source}")]
    RemoteLookupFailed {
        subject: UserId,
        #[source]
        source: ApiError,
    },
}

/// Perform the two-call hydration for one subject.
///
/// The secondary lookup is best-effort: on error the record is still
/// produced, with an empty education list.
pub(crate) async fn hydrate(
    fetcher: &dyn ProfileFetcher,
    subject: &UserId,
) -> Result<ProfileRecord, FetchError> {
    let profile = fetcher
        .fetch_profile(subject)
        .await
        .map_err(|source| FetchError::RemoteLookupFailed {
            subject: subject.clone(),
            source,
        })?;

    let education = match fetcher.fetch_education(subject).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!(subject = %subject, error = %e, "education lookup failed, hydrating without it");
            Vec::new()
        }
    };

    Ok(ProfileRecord {
        profile,
        education,
        hydrated_at: Utc::now(),
    })
}
