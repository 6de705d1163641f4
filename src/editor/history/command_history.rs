//! History manager resource holding the undo and redo stacks.

use std::collections::VecDeque;

use bevy::prelude::*;
use chrono::{DateTime, Local};

use crate::constants::DEFAULT_HISTORY_CAPACITY;

use super::data_types::SceneSnapshot;
use super::entries::{EntryKind, HistoryEntry};

/// Whether new edits are currently recorded
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecordingState {
    #[default]
    Recording,
    /// Set while an entry is being restored
    Suspended,
}

/// Short description of one entry for display
#[derive(Clone, Debug, PartialEq)]
pub struct EntrySummary {
    pub description: String,
    pub kind: EntryKind,
    pub timestamp: DateTime<Local>,
    pub element_count: usize,
}

impl From<&HistoryEntry> for EntrySummary {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            description: entry.description.clone(),
            kind: entry.kind(),
            timestamp: entry.timestamp,
            element_count: entry.element_count(),
        }
    }
}

/// Both stacks, most recent first
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HistorySummary {
    pub undo: Vec<EntrySummary>,
    pub redo: Vec<EntrySummary>,
}

/// Resource tracking history entries for undo/redo
#[derive(Resource)]
pub struct HistoryManager {
    /// Entries that can be undone (most recent last)
    undo_stack: VecDeque<HistoryEntry>,
    /// Entries that can be redone (most recent last)
    redo_stack: VecDeque<HistoryEntry>,
    capacity: usize,
    state: RecordingState,
    /// Scene as it was when the editor finished loading
    initial_state: Option<SceneSnapshot>,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

fn push_bounded(stack: &mut VecDeque<HistoryEntry>, entry: HistoryEntry, capacity: usize) {
    stack.push_back(entry);
    while stack.len() > capacity {
        stack.pop_front();
    }
}

impl HistoryManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            capacity: capacity.max(1),
            state: RecordingState::Recording,
            initial_state: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity, dropping the oldest entries that no longer fit
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
        }
        while self.redo_stack.len() > self.capacity {
            self.redo_stack.pop_front();
        }
    }

    /// Record a new entry. Ignored while suspended; otherwise clears the
    /// redo stack and evicts the oldest entry when full.
    pub fn push(&mut self, entry: HistoryEntry) -> bool {
        if self.state == RecordingState::Suspended {
            debug!("History suspended, not recording '{}'", entry.description);
            return false;
        }

        self.redo_stack.clear();
        push_bounded(&mut self.undo_stack, entry, self.capacity);
        true
    }

    /// Pop the last entry for undo
    pub fn pop_undo(&mut self) -> Option<HistoryEntry> {
        self.undo_stack.pop_back()
    }

    /// Pop the last entry for redo
    pub fn pop_redo(&mut self) -> Option<HistoryEntry> {
        self.redo_stack.pop_back()
    }

    /// Push an entry to the redo stack (used by undo)
    pub fn push_redo(&mut self, entry: HistoryEntry) {
        push_bounded(&mut self.redo_stack, entry, self.capacity);
    }

    /// Push an entry to the undo stack without touching redo (used by redo)
    pub fn push_undo(&mut self, entry: HistoryEntry) {
        push_bounded(&mut self.undo_stack, entry, self.capacity);
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Entry the next undo would revert
    pub fn peek_undo(&self) -> Option<&HistoryEntry> {
        self.undo_stack.back()
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    pub fn suspend(&mut self) {
        self.state = RecordingState::Suspended;
    }

    pub fn resume(&mut self) {
        self.state = RecordingState::Recording;
    }

    pub fn set_initial_state(&mut self, snapshot: SceneSnapshot) {
        self.initial_state = Some(snapshot);
    }

    pub fn initial_state(&self) -> Option<&SceneSnapshot> {
        self.initial_state.as_ref()
    }

    pub fn has_initial_state(&self) -> bool {
        self.initial_state.is_some()
    }

    pub fn summary(&self) -> HistorySummary {
        HistorySummary {
            undo: self.undo_stack.iter().rev().map(EntrySummary::from).collect(),
            redo: self.redo_stack.iter().rev().map(EntrySummary::from).collect(),
        }
    }

    /// Clear both stacks; the initial state is kept
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
