//! Sync status tracking for draft saves.
//!
//! Every save is tagged with a monotonically increasing sequence number.
//! An outcome is applied only if no newer save has already been applied,
//! so a slow response can never regress the status set by a later one.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::types::SyncStatus;

/// Handle returned when a save starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SaveTicket(u64);

impl SaveTicket {
    pub fn seq(&self) -> u64 {
        self.0
    }
}

/// Outcome reported back for a save
#[derive(Debug, Clone)]
pub enum SaveOutcome {
    Saved,
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct SyncTracker {
    status: SyncStatus,
    issued: u64,
    applied: u64,
    /// Bumped on every reset
    epoch: u64,
    last_error: Option<String>,
    last_saved_at: Option<DateTime<Utc>>,
}

impl SyncTracker {
    pub fn status(&self) -> SyncStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    /// Number of resets so far. Work started under an older epoch belongs
    /// to a session that no longer exists.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether an outcome for `ticket` would be discarded, because a newer
    /// save was applied or the tracker was reset since it was issued
    pub fn is_stale(&self, ticket: SaveTicket) -> bool {
        ticket.0 <= self.applied
    }

    /// Number of issued saves whose outcome has not been applied yet
    pub fn in_flight(&self) -> u64 {
        self.issued - self.applied
    }

    /// Mark a save as started
    pub fn begin_save(&mut self) -> SaveTicket {
        self.issued += 1;
        self.status = SyncStatus::Saving;
        SaveTicket(self.issued)
    }

    /// Apply a save outcome. Returns `false` if the ticket was superseded.
    pub fn finish_save(&mut self, ticket: SaveTicket, outcome: SaveOutcome) -> bool {
        if ticket.0 <= self.applied {
            debug!(
                seq = ticket.0,
                applied = self.applied,
                "Discarding stale save outcome"
            );
            return false;
        }
        self.applied = ticket.0;

        // A newer save is still running: keep showing it
        let newest = ticket.0 == self.issued;
        match outcome {
            SaveOutcome::Saved => {
                self.last_error = None;
                self.last_saved_at = Some(Utc::now());
                if newest {
                    self.status = SyncStatus::Saved;
                }
            }
            SaveOutcome::Failed(message) => {
                self.last_error = Some(message);
                if newest {
                    self.status = SyncStatus::Error;
                }
            }
        }
        true
    }

    pub fn reset(&mut self) {
        // Keep counters so tickets from before the reset stay stale
        self.applied = self.issued;
        self.epoch += 1;
        self.status = SyncStatus::Idle;
        self.last_error = None;
        self.last_saved_at = None;
    }
}
