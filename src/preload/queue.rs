// Allow dead code: length accessors used by tests and diagnostics
#![allow(dead_code)]

//! Bounded priority queue of subjects waiting for dispatch.
//!
//! High-priority entries (visible list items) insert at the front, so the
//! most recently seen subject is fetched first. Normal-priority entries
//! append at the back, giving FIFO within that class. On overflow the queue
//! sheds the oldest normal-priority entry - retaining all work is explicitly
//! not a guarantee under pressure.

use std::collections::VecDeque;

use crate::models::UserId;

/// Scheduling priority for a preload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// Subject is visible on screen right now
    High,
    /// Subject referenced off-screen (comment author, club roster)
    #[default]
    Normal,
}

/// What `enqueue` did with the new entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EnqueueOutcome {
    /// Entry accepted, nothing displaced
    Enqueued,
    /// Entry accepted; the named subject was shed to make room
    EnqueuedEvicting(UserId),
    /// Queue is full of high-priority work; the new entry itself was shed
    Shed,
}

#[derive(Debug)]
pub(crate) struct PreloadQueue {
    entries: VecDeque<(UserId, Priority)>,
    capacity: usize,
}

impl PreloadQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a subject, shedding low-value work if the queue is full.
    ///
    /// The caller is responsible for having already admitted the subject
    /// (no duplicate checking happens here).
    pub fn enqueue(&mut self, subject: UserId, priority: Priority) -> EnqueueOutcome {
        let mut outcome = EnqueueOutcome::Enqueued;

        if self.entries.len() >= self.capacity {
            // Oldest normal entry is the front-most one: normals append at
            // the back, so earlier normals sit closer to the front.
            let victim_pos = self
                .entries
                .iter()
                .position(|(_, p)| *p == Priority::Normal);

            match victim_pos {
                Some(pos) => {
                    if let Some((victim, _)) = self.entries.remove(pos) {
                        outcome = EnqueueOutcome::EnqueuedEvicting(victim);
                    }
                }
                // Entire queue is high-priority backlog.
                None if priority == Priority::Normal => return EnqueueOutcome::Shed,
                None => {
                    // High insert displaces the back entry, which is the
                    // oldest high-priority subject (highs stack at the front).
                    if let Some((victim, _)) = self.entries.pop_back() {
                        outcome = EnqueueOutcome::EnqueuedEvicting(victim);
                    }
                }
            }
        }

        match priority {
            Priority::High => self.entries.push_front((subject, priority)),
            Priority::Normal => self.entries.push_back((subject, priority)),
        }
        outcome
    }

    /// Remove and return the next subject for dispatch.
    pub fn pop_front(&mut self) -> Option<(UserId, Priority)> {
        self.entries.pop_front()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Vec<UserId> {
        self.entries.iter().map(|(id, _)| id.clone()).collect()
    }
}
