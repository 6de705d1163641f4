//! Recording edits and running undo/redo against the world.

use bevy::prelude::*;

use crate::editor::camera::RedrawRequest;
use crate::editor::notifications::notify;
use crate::scene::{
    ElementIndex, FaceKey, apply_texture_to_element, invalidate_textures, set_element_color,
};

use super::capture::{capture_by_ids, capture_colors, capture_full, capture_partial, capture_textures};
use super::command_history::HistoryManager;
use super::data_types::{ColorState, ElementRecord, SceneSnapshot, TextureState};
use super::entries::{ColorChange, EditChanges, HistoryEntry, HistoryPayload, TextureChange};
use super::error::HistoryError;
use super::restore::{restore_entry, restore_snapshot};

fn is_recording(world: &World) -> bool {
    world
        .get_resource::<HistoryManager>()
        .is_some_and(HistoryManager::is_recording)
}

fn push_entry(world: &mut World, entry: HistoryEntry) -> bool {
    let description = entry.description.clone();
    let pushed = world
        .get_resource_mut::<HistoryManager>()
        .is_some_and(|mut history| history.push(entry));
    if pushed {
        debug!("Recorded '{}'", description);
    }
    pushed
}

/// Record an edit before it is applied.
///
/// `modified` and `deleted` are captured as they are now; `added` only needs
/// the ids of the new elements. With no lists at all the whole scene is
/// captured instead.
pub fn push_edit(
    world: &mut World,
    description: &str,
    modified: &[Entity],
    deleted: &[Entity],
    added: &[Entity],
) -> bool {
    if !is_recording(world) {
        return false;
    }

    let payload = if modified.is_empty() && deleted.is_empty() && added.is_empty() {
        HistoryPayload::Snapshot(capture_full(world))
    } else {
        HistoryPayload::Changes(EditChanges {
            modified: capture_partial(world, modified),
            deleted: capture_partial(world, deleted),
            added: capture_partial(world, added),
            exact: false,
        })
    };
    push_entry(world, HistoryEntry::new(description, payload))
}

/// Record an edit from records the caller captured itself
pub fn push_edit_records(world: &mut World, description: &str, changes: EditChanges) -> bool {
    if changes.is_empty() {
        return false;
    }
    push_entry(world, HistoryEntry::new(description, HistoryPayload::Changes(changes)))
}

/// Record a recolor; `previous` holds the colors read before it was applied
pub fn push_color_change(
    world: &mut World,
    description: &str,
    previous: Vec<ColorState>,
    new_color: u32,
) -> bool {
    if previous.is_empty() {
        return false;
    }
    let payload = HistoryPayload::Color(ColorChange {
        previous,
        new_color,
    });
    push_entry(world, HistoryEntry::new(description, payload))
}

/// Record a texture change; `previous` holds the textures read before it was applied
pub fn push_texture_change(
    world: &mut World,
    description: &str,
    previous: Vec<TextureState>,
    new_url: &str,
    face: FaceKey,
) -> bool {
    if previous.is_empty() {
        return false;
    }
    let payload = HistoryPayload::Texture(TextureChange {
        previous,
        new_url: new_url.to_string(),
        face,
    });
    push_entry(world, HistoryEntry::new(description, payload))
}

/// Capture the loaded scene as the checkpoint new sessions start from
pub fn save_initial_state(world: &mut World) {
    let snapshot = capture_full(world);
    info!(
        "Saved initial scene state ({} elements)",
        snapshot.element_count()
    );
    if let Some(mut history) = world.get_resource_mut::<HistoryManager>() {
        history.set_initial_state(snapshot);
    }
}

/// Bring the scene back to the initial checkpoint as an undoable edit
pub fn revert_to_initial_state(world: &mut World) -> bool {
    let Some(initial) = world
        .get_resource::<HistoryManager>()
        .and_then(|history| history.initial_state().cloned())
    else {
        notify(world, "No initial state was saved", true);
        return false;
    };

    push_edit(world, "Revert to initial state", &[], &[], &[]);
    let entry = HistoryEntry::new("Revert to initial state", HistoryPayload::Snapshot(initial));
    match restore_entry(world, &entry) {
        Ok(_) => {
            notify(world, "Reverted to initial state", false);
            true
        }
        Err(e) => {
            error!("Revert failed: {}", e);
            notify(world, "Revert failed", true);
            false
        }
    }
}

/// Records a restore of `record` from a deleted list brings back
fn recreated_by(record: &ElementRecord, exact: bool) -> Vec<&ElementRecord> {
    if !exact && record.is_merge_result() {
        record.metadata.original_elements.iter().collect()
    } else {
        vec![record]
    }
}

/// Entry that reverses `payload` once it has been restored, built from the
/// live state right before the restore
fn mirror_payload(world: &World, payload: &HistoryPayload) -> HistoryPayload {
    match payload {
        HistoryPayload::Snapshot(_) => HistoryPayload::Snapshot(capture_full(world)),
        HistoryPayload::Changes(changes) => {
            let index = ElementIndex::build(world);
            HistoryPayload::Changes(EditChanges {
                modified: capture_by_ids(world, changes.modified.iter().map(|r| r.id.as_str())),
                deleted: capture_by_ids(world, changes.added.iter().map(|r| r.id.as_str())),
                added: changes
                    .deleted
                    .iter()
                    .flat_map(|record| recreated_by(record, changes.exact))
                    .filter(|record| !index.contains(&record.id))
                    .cloned()
                    .collect(),
                exact: true,
            })
        }
        HistoryPayload::Color(change) => HistoryPayload::Color(ColorChange {
            previous: capture_colors(world, change.previous.iter().map(|s| s.element_id.as_str())),
            new_color: change.new_color,
        }),
        HistoryPayload::Texture(change) => HistoryPayload::Texture(TextureChange {
            previous: capture_textures(world, change.previous.iter().map(|s| s.element_id.as_str())),
            new_url: change.new_url.clone(),
            face: change.face,
        }),
    }
}

fn try_undo(world: &mut World) -> Result<String, HistoryError> {
    let entry = world
        .get_resource_mut::<HistoryManager>()
        .and_then(|mut history| history.pop_undo())
        .ok_or(HistoryError::StackEmpty("previous"))?;

    let mirror = entry.mirror(mirror_payload(world, &entry.payload));
    world.resource_mut::<HistoryManager>().push_redo(mirror);

    restore_entry(world, &entry)?;
    Ok(entry.description)
}

/// Replay the forward value of a color or texture entry through the live
/// edit path
fn replay_forward(world: &mut World, payload: &HistoryPayload) {
    let index = ElementIndex::build(world);
    match payload {
        HistoryPayload::Color(change) => {
            for state in &change.previous {
                if let Some(entity) = index.get(&state.element_id) {
                    set_element_color(world, entity, change.new_color);
                }
            }
        }
        HistoryPayload::Texture(change) => {
            for state in &change.previous {
                if let Some(entity) = index.get(&state.element_id) {
                    invalidate_textures(world, entity);
                    apply_texture_to_element(world, entity, &change.new_url, change.face);
                }
            }
        }
        HistoryPayload::Snapshot(_) | HistoryPayload::Changes(_) => {}
    }
    if let Some(mut redraw) = world.get_resource_mut::<RedrawRequest>() {
        redraw.request();
    }
}

fn try_redo(world: &mut World) -> Result<String, HistoryError> {
    let entry = world
        .get_resource_mut::<HistoryManager>()
        .and_then(|mut history| history.pop_redo())
        .ok_or(HistoryError::StackEmpty("further"))?;

    let mirror = entry.mirror(mirror_payload(world, &entry.payload));
    world.resource_mut::<HistoryManager>().push_undo(mirror);

    match &entry.payload {
        HistoryPayload::Color(_) | HistoryPayload::Texture(_) => replay_forward(world, &entry.payload),
        HistoryPayload::Snapshot(_) | HistoryPayload::Changes(_) => {
            restore_entry(world, &entry)?;
        }
    }
    Ok(entry.description)
}

/// Undo the most recent entry. Returns false when there was nothing to undo
/// or the restore failed.
pub fn undo(world: &mut World) -> bool {
    match try_undo(world) {
        Ok(description) => {
            notify(world, format!("Undo: {}", description), false);
            true
        }
        Err(HistoryError::StackEmpty(_)) => {
            notify(world, "There are no previous actions", true);
            false
        }
        Err(e) => {
            error!("Undo failed: {}", e);
            notify(world, "Undo failed", true);
            false
        }
    }
}

/// Redo the most recently undone entry
pub fn redo(world: &mut World) -> bool {
    match try_redo(world) {
        Ok(description) => {
            notify(world, format!("Redo: {}", description), false);
            true
        }
        Err(HistoryError::StackEmpty(_)) => {
            notify(world, "There are no further actions", true);
            false
        }
        Err(e) => {
            error!("Redo failed: {}", e);
            notify(world, "Redo failed", true);
            false
        }
    }
}

/// Drop every entry, keeping the initial checkpoint
pub fn clear_history(world: &mut World) {
    if let Some(mut history) = world.get_resource_mut::<HistoryManager>() {
        history.clear();
        info!("History cleared");
    }
}

/// Restore a full snapshot without recording it, e.g. when loading a scene
pub fn load_snapshot(world: &mut World, snapshot: &SceneSnapshot) -> bool {
    match restore_snapshot(world, snapshot) {
        Ok(_) => {
            clear_history(world);
            save_initial_state(world);
            true
        }
        Err(e) => {
            error!("Loading snapshot failed: {}", e);
            false
        }
    }
}
