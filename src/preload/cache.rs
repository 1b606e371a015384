// Allow dead code: size accessors used by tests and diagnostics
#![allow(dead_code)]

//! In-memory profile cache - the single source of truth for
//! "do we already have this subject".
//!
//! Unbounded for the session lifetime: capacity is bounded by distinct
//! users seen, not by traffic volume. Records are shared as `Arc` clones
//! and never mutated in place, so handed-out copies stay valid snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{ProfileRecord, UserId};

#[derive(Debug, Default)]
pub(crate) struct ProfileCache {
    entries: HashMap<UserId, Arc<ProfileRecord>>,
}

impl ProfileCache {
    pub fn get(&self, subject: &UserId) -> Option<Arc<ProfileRecord>> {
        self.entries.get(subject).cloned()
    }

    pub fn contains(&self, subject: &UserId) -> bool {
        self.entries.contains_key(subject)
    }

    /// Insert or replace the record for a subject.
    pub fn insert(&mut self, subject: UserId, record: Arc<ProfileRecord>) {
        self.entries.insert(subject, record);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
