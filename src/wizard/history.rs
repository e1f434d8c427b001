//! Bounded undo/redo history of wizard snapshots

use std::collections::VecDeque;

use super::form::FormData;
use super::types::{Photo, Room};

/// Default maximum number of undo entries kept
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Undoable part of the wizard state
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySnapshot {
    pub form_data: FormData,
    pub rooms: Vec<Room>,
    pub photos: Vec<Photo>,
}

/// Undo and redo stacks. The oldest undo entry is dropped past `limit`.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<HistorySnapshot>,
    redo: Vec<HistorySnapshot>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record the state preceding a mutation. Invalidates redo.
    pub fn record(&mut self, before: HistorySnapshot) {
        self.redo.clear();
        self.push_undo(before);
    }

    fn push_undo(&mut self, snapshot: HistorySnapshot) {
        self.undo.push_back(snapshot);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    /// Pop the latest undo entry, storing `current` for redo
    pub fn undo(&mut self, current: HistorySnapshot) -> Option<HistorySnapshot> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Pop the latest redo entry, storing `current` for undo
    pub fn redo(&mut self, current: HistorySnapshot) -> Option<HistorySnapshot> {
        let next = self.redo.pop()?;
        self.push_undo(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    #[cfg(test)]
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
