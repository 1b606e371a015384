//! Authentication module for managing the signed-in session.
//!
//! `Session` holds the bearer token and user identity and owns the
//! profile preloader. Sign-out is the one lifecycle signal the preload
//! subsystem reacts to: it resets all cached and queued state.

pub mod session;

pub use session::{Session, SessionData};
