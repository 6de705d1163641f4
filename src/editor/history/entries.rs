//! History entries: one recorded change plus what is needed to revert it.

use chrono::{DateTime, Local};

use crate::scene::FaceKey;

use super::data_types::{ColorState, ElementRecord, SceneSnapshot, TextureState};

/// How an entry is restored
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    FullSnapshot,
    PartialSnapshot,
    ColorChange,
    TextureChange,
}

impl EntryKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::FullSnapshot => "scene",
            EntryKind::PartialSnapshot => "elements",
            EntryKind::ColorChange => "color",
            EntryKind::TextureChange => "texture",
        }
    }
}

/// Coarse category derived from the entry description
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeType {
    Color,
    Texture,
    General,
}

impl ChangeType {
    pub fn classify(description: &str) -> Self {
        let lower = description.to_lowercase();
        if lower.contains("color") {
            ChangeType::Color
        } else if lower.contains("textur") {
            ChangeType::Texture
        } else {
            ChangeType::General
        }
    }
}

/// Records of the elements touched by an edit, as they were before it
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditChanges {
    /// Elements that existed before and after; restored in place
    pub modified: Vec<ElementRecord>,
    /// Elements the edit removed; recreated on restore
    pub deleted: Vec<ElementRecord>,
    /// Elements the edit created; removed on restore
    pub added: Vec<ElementRecord>,
    /// Recreate deleted records as recorded, without expanding merge results
    /// into their original elements. Set on entries built by undo/redo.
    pub exact: bool,
}

impl EditChanges {
    pub fn is_empty(&self) -> bool {
        self.modified.is_empty() && self.deleted.is_empty() && self.added.is_empty()
    }

    pub fn element_count(&self) -> usize {
        self.modified.len() + self.deleted.len() + self.added.len()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColorChange {
    /// Colors before the change
    pub previous: Vec<ColorState>,
    pub new_color: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextureChange {
    /// Textures before the change
    pub previous: Vec<TextureState>,
    pub new_url: String,
    pub face: FaceKey,
}

#[derive(Clone, Debug, PartialEq)]
pub enum HistoryPayload {
    Snapshot(SceneSnapshot),
    Changes(EditChanges),
    Color(ColorChange),
    Texture(TextureChange),
}

/// One undoable step
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub description: String,
    pub timestamp: DateTime<Local>,
    pub change_type: ChangeType,
    pub payload: HistoryPayload,
}

impl HistoryEntry {
    pub fn new(description: impl Into<String>, payload: HistoryPayload) -> Self {
        let description = description.into();
        Self {
            change_type: ChangeType::classify(&description),
            description,
            timestamp: Local::now(),
            payload,
        }
    }

    /// Same description and category, different state
    pub fn mirror(&self, payload: HistoryPayload) -> Self {
        Self {
            description: self.description.clone(),
            timestamp: Local::now(),
            change_type: self.change_type,
            payload,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self.payload {
            HistoryPayload::Snapshot(_) => EntryKind::FullSnapshot,
            HistoryPayload::Changes(_) => EntryKind::PartialSnapshot,
            HistoryPayload::Color(_) => EntryKind::ColorChange,
            HistoryPayload::Texture(_) => EntryKind::TextureChange,
        }
    }

    /// Number of elements the entry touches
    pub fn element_count(&self) -> usize {
        match &self.payload {
            HistoryPayload::Snapshot(snapshot) => snapshot.element_count(),
            HistoryPayload::Changes(changes) => changes.element_count(),
            HistoryPayload::Color(change) => change.previous.len(),
            HistoryPayload::Texture(change) => change.previous.len(),
        }
    }
}
