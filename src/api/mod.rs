//! REST API client module for the campusfeed backend.
//!
//! Provides the `ApiClient` for fetching profile and education data.
//! Endpoints use JWT bearer token authentication; the token is supplied
//! by the auth session layer.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
