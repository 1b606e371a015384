//! Core library for the campusfeed mobile client.
//!
//! The interesting machinery lives in [`preload`]: a session-scoped
//! profile preloading and caching subsystem that UI surfaces (feed,
//! comment lists, club rosters) drive with fire-and-forget
//! [`preload::Preloader::preload`] calls. It deduplicates requests,
//! schedules them by priority in a bounded queue, and hydrates profiles
//! in small rate-limited batches against the REST API.
//!
//! [`api`] provides the HTTP client, [`models`] the typed records, and
//! [`auth`] the session that owns the preloader and tears it down on
//! sign-out.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod preload;

pub use api::{ApiClient, ApiError};
pub use auth::{Session, SessionData};
pub use config::PreloadConfig;
pub use models::{EducationRecord, Profile, ProfileRecord, UserId};
pub use preload::{FetchError, Preloader, Priority, ProfileFetcher};
