// Allow dead code: status queries used by tests and diagnostics
#![allow(dead_code)]

//! Lifecycle ledger for preload subjects.
//!
//! One authoritative status per subject instead of parallel membership
//! sets, so a subject can never be simultaneously queued and in-flight.
//! Admission is a pure membership question here; the cache check lives
//! with the caller, which holds both under one lock.

use std::collections::HashMap;

use tokio::time::Instant;

use crate::models::UserId;

/// Where a subject currently is in the preload lifecycle.
///
/// Absence from the ledger means the subject is either never-seen or
/// already resolved into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubjectStatus {
    /// Waiting in the preload queue
    Queued,
    /// A fetch is currently executing
    InFlight,
    /// Shed from the queue recently; suppressed until `until`
    CoolDown { until: Instant },
    /// A fetch errored; suppressed for the rest of the session
    Failed,
}

#[derive(Debug, Default)]
pub(crate) struct RequestLedger {
    status: HashMap<UserId, SubjectStatus>,
}

impl RequestLedger {
    /// Would this subject's current status block a new admission?
    ///
    /// Expired cool-downs are removed as a side effect, so suppression
    /// windows need no timers - they lapse on the next admission attempt.
    pub fn blocks_admission(&mut self, subject: &UserId, now: Instant) -> bool {
        match self.status.get(subject) {
            None => false,
            Some(SubjectStatus::CoolDown { until }) if *until <= now => {
                self.status.remove(subject);
                false
            }
            Some(_) => true,
        }
    }

    pub fn mark_queued(&mut self, subject: UserId) {
        self.status.insert(subject, SubjectStatus::Queued);
    }

    /// Transition a subject popped from the queue into in-flight.
    pub fn mark_in_flight(&mut self, subject: &UserId) {
        self.status
            .insert(subject.clone(), SubjectStatus::InFlight);
    }

    pub fn mark_cool_down(&mut self, subject: UserId, until: Instant) {
        self.status
            .insert(subject, SubjectStatus::CoolDown { until });
    }

    /// Permanently suppress a subject for the rest of the session.
    pub fn mark_failed(&mut self, subject: UserId) {
        self.status.insert(subject, SubjectStatus::Failed);
    }

    /// Drop the lifecycle entry for a subject that reached the cache.
    pub fn clear_resolved(&mut self, subject: &UserId) {
        self.status.remove(subject);
    }

    pub fn status(&self, subject: &UserId) -> Option<SubjectStatus> {
        self.status.get(subject).copied()
    }

    pub fn clear(&mut self) {
        self.status.clear();
    }
}
