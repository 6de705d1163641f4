//! Undo/Redo system for scene edits.
//!
//! Every reversible edit records a history entry holding the state needed to
//! revert it: a full scene snapshot, records of the touched elements, or the
//! previous color/texture values. Undo restores that state and leaves a
//! mirror entry on the redo stack.
//!
//! ## Usage
//!
//! - **Ctrl+Z**: Undo the last action
//! - **Ctrl+Y** or **Ctrl+Shift+Z**: Redo the last undone action
//!
//! ## Module Structure
//!
//! - [`data_types`] - Serializable element records and snapshots
//! - [`codec`] - Encoding live elements into records and back
//! - [`capture`] - Full and partial scene capture
//! - [`entries`] - History entries and their payloads
//! - [`command_history`] - HistoryManager resource holding both stacks
//! - [`restore`] - Applying records back onto the scene
//! - [`execute`] - Recording edits and running undo/redo
//! - [`systems`] - Bevy systems for keyboard shortcuts

pub mod capture;
pub mod codec;
mod command_history;
mod data_types;
mod entries;
mod error;
mod execute;
pub mod restore;
mod systems;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports
pub use command_history::{EntrySummary, HistoryManager, HistorySummary, RecordingState};
pub use data_types::{
    ColorState, ElementRecord, GeometryDescriptor, GeometryKind, MaterialDescriptor, NodeKind,
    SceneSnapshot, TextureState, TransformData,
};
pub use entries::{ChangeType, EditChanges, EntryKind, HistoryEntry, HistoryPayload};
pub use error::HistoryError;
pub use execute::{
    clear_history, load_snapshot, push_color_change, push_edit, push_edit_records,
    push_texture_change, redo, revert_to_initial_state, save_initial_state, undo,
};
pub use systems::{apply_history_capacity, handle_redo, handle_undo};
