//! Data models for campusfeed profile entities.
//!
//! - `UserId`: opaque subject identifier (campus email)
//! - `Profile`, `EducationRecord`: raw API records and response envelopes
//! - `ProfileRecord`: fully-hydrated profile as stored in the preload cache

pub mod profile;

pub use profile::{
    EducationRecord, EducationResponse, Profile, ProfileRecord, UserId, UserResponse,
};
