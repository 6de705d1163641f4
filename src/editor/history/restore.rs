//! Applying recorded state back onto the live scene.
//!
//! Restoration order matters: modified elements first, then deleted elements
//! are recreated, then added elements are removed.

use bevy::prelude::*;

use crate::editor::camera::{RedrawRequest, capture_view, restore_view};
use crate::editor::selection::clear_selection;
use crate::scene::{
    ElementGeometry, ElementId, ElementIndex, ElementMaterials, SceneGroup, SceneGroups,
    TextureLoads, apply_texture_to_element, children_of, invalidate_textures,
    restore_slot_colors, restore_slot_textures, set_applied_textures, set_element_color,
};

use super::codec::{decode_geometry, decode_materials, hex_to_color};
use super::command_history::HistoryManager;
use super::data_types::{ColorState, ElementRecord, NodeKind, SceneSnapshot, TextureState};
use super::entries::{EditChanges, HistoryEntry, HistoryPayload};
use super::error::HistoryError;

/// Counts of what a restore did
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub updated: usize,
    pub recreated: usize,
    pub removed: usize,
    pub skipped: usize,
}

/// Restore the state stored in an entry.
///
/// Recording is suspended for the duration, the camera pose is kept, and the
/// selection is cleared. Recording resumes even when the restore fails.
pub fn restore_entry(world: &mut World, entry: &HistoryEntry) -> Result<RestoreReport, HistoryError> {
    if let Some(mut history) = world.get_resource_mut::<HistoryManager>() {
        history.suspend();
    }
    let view = capture_view(world);

    let result = match &entry.payload {
        HistoryPayload::Snapshot(snapshot) => restore_snapshot(world, snapshot),
        HistoryPayload::Changes(changes) => apply_changes(world, changes),
        HistoryPayload::Color(change) => Ok(restore_colors(world, &change.previous)),
        HistoryPayload::Texture(change) => Ok(restore_textures(world, &change.previous)),
    };

    refresh_materials(world);
    if let Some(view) = view {
        restore_view(world, view);
    }
    clear_selection(world);
    if let Some(mut redraw) = world.get_resource_mut::<RedrawRequest>() {
        redraw.request();
    }
    if let Some(mut history) = world.get_resource_mut::<HistoryManager>() {
        history.resume();
    }

    if let Ok(report) = &result {
        debug!(
            "Restored '{}': {} updated, {} recreated, {} removed, {} skipped",
            entry.description, report.updated, report.recreated, report.removed, report.skipped
        );
    }
    result
}

/// Restore modified elements, recreate deleted ones, remove added ones
pub fn apply_changes(world: &mut World, changes: &EditChanges) -> Result<RestoreReport, HistoryError> {
    let mut report = RestoreReport::default();
    let mut index = ElementIndex::build(world);

    update_records(world, &changes.modified, &index, &mut report);
    recreate_records(world, &changes.deleted, !changes.exact, &mut index, &mut report)?;
    remove_ids(
        world,
        changes.added.iter().map(|record| record.id.as_str()),
        &mut index,
        &mut report,
    );

    Ok(report)
}

/// Bring the whole scene back to a snapshot: update present elements,
/// recreate missing ones, remove identified elements the snapshot lacks
pub fn restore_snapshot(world: &mut World, snapshot: &SceneSnapshot) -> Result<RestoreReport, HistoryError> {
    let groups = world
        .get_resource::<SceneGroups>()
        .copied()
        .ok_or(HistoryError::MissingGroup("scene"))?;

    let mut report = RestoreReport::default();
    let mut index = ElementIndex::build(world);

    for group in SceneGroup::ALL {
        let (present, missing): (Vec<ElementRecord>, Vec<ElementRecord>) = snapshot
            .records(group)
            .iter()
            .cloned()
            .partition(|record| index.contains(&record.id));
        update_records(world, &present, &index, &mut report);
        recreate_records(world, &missing, false, &mut index, &mut report)?;
    }

    let extras: Vec<String> = SceneGroup::ALL
        .iter()
        .flat_map(|group| children_of(world, groups.get(*group)))
        .filter_map(|entity| world.get::<ElementId>(entity).map(|id| id.0.clone()))
        .filter(|id| !snapshot.contains(id))
        .collect();
    remove_ids(world, extras.iter().map(String::as_str), &mut index, &mut report);

    Ok(report)
}

pub fn restore_colors(world: &mut World, states: &[ColorState]) -> RestoreReport {
    let mut report = RestoreReport::default();
    let index = ElementIndex::build(world);
    for state in states {
        match index.get(&state.element_id) {
            Some(entity) => {
                restore_slot_colors(world, entity, state.applied, &state.slot_colors);
                report.updated += 1;
            }
            None => {
                debug!("{}", HistoryError::LookupMiss(state.element_id.clone()));
                report.skipped += 1;
            }
        }
    }
    report
}

pub fn restore_textures(world: &mut World, states: &[TextureState]) -> RestoreReport {
    let mut report = RestoreReport::default();
    let index = ElementIndex::build(world);
    for state in states {
        match index.get(&state.element_id) {
            Some(entity) => {
                invalidate_textures(world, entity);
                set_applied_textures(world, entity, state.applied.clone());
                restore_slot_textures(world, entity, &state.slot_urls);
                report.updated += 1;
            }
            None => {
                debug!("{}", HistoryError::LookupMiss(state.element_id.clone()));
                report.skipped += 1;
            }
        }
    }
    report
}

fn update_records(
    world: &mut World,
    records: &[ElementRecord],
    index: &ElementIndex,
    report: &mut RestoreReport,
) {
    for record in records {
        let Some(entity) = index.get(&record.id) else {
            debug!("{}", HistoryError::LookupMiss(record.id.clone()));
            report.skipped += 1;
            continue;
        };
        match update_element(world, entity, record) {
            Ok(()) => report.updated += 1,
            Err(e) => {
                warn!("Could not restore {}: {}", record.id, e);
                report.skipped += 1;
            }
        }
    }
}

fn recreate_records(
    world: &mut World,
    records: &[ElementRecord],
    expand_merges: bool,
    index: &mut ElementIndex,
    report: &mut RestoreReport,
) -> Result<(), HistoryError> {
    if records.is_empty() {
        return Ok(());
    }
    let groups = world
        .get_resource::<SceneGroups>()
        .copied()
        .ok_or(HistoryError::MissingGroup("scene"))?;

    for record in records {
        let targets: Vec<&ElementRecord> = if expand_merges && record.is_merge_result() {
            record.metadata.original_elements.iter().collect()
        } else {
            vec![record]
        };

        for target in targets {
            if index.contains(&target.id) {
                debug!("Element {} already present, not recreated", target.id);
                report.skipped += 1;
                continue;
            }
            let parent = groups.get(target.target_group());
            if world.get_entity(parent).is_err() {
                warn!("{}", HistoryError::MissingGroup(target.target_group().display_name()));
                report.skipped += 1;
                continue;
            }
            match instantiate_record(world, target, parent) {
                Ok(entity) => {
                    index.insert(target.id.clone(), entity);
                    report.recreated += 1;
                }
                Err(e) => {
                    warn!("Could not recreate {}: {}", target.id, e);
                    report.skipped += 1;
                }
            }
        }
    }
    Ok(())
}

fn remove_ids<'a>(
    world: &mut World,
    ids: impl Iterator<Item = &'a str>,
    index: &mut ElementIndex,
    report: &mut RestoreReport,
) {
    for id in ids {
        match index.remove(id) {
            Some(entity) if world.get_entity(entity).is_ok() => {
                invalidate_textures(world, entity);
                world.despawn(entity);
                report.removed += 1;
            }
            _ => {
                debug!("{}", HistoryError::LookupMiss(id.to_string()));
                report.skipped += 1;
            }
        }
    }
}

fn visibility(visible: bool) -> Visibility {
    if visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    }
}

/// Overwrite a live element with a record
pub fn update_element(world: &mut World, entity: Entity, record: &ElementRecord) -> Result<(), HistoryError> {
    let mut live = world
        .get_entity_mut(entity)
        .map_err(|_| HistoryError::LookupMiss(record.id.clone()))?;
    live.insert((
        Transform::from(record.transform),
        visibility(record.visible),
        record.metadata.clone(),
    ));

    invalidate_textures(world, entity);

    match record.node {
        NodeKind::Mesh => restore_mesh(world, entity, record),
        NodeKind::Group => restore_children(world, entity, record),
    }
    Ok(())
}

fn restore_mesh(world: &mut World, entity: Entity, record: &ElementRecord) {
    let live_geometry = world.get::<ElementGeometry>(entity).map(|g| g.0.clone());
    if live_geometry.as_ref() != record.geometry.as_ref() || world.get::<Mesh3d>(entity).is_none() {
        let (mesh, descriptor) = decode_geometry(record.geometry.as_ref());
        let mesh = world.resource_mut::<Assets<Mesh>>().add(mesh);
        world
            .entity_mut(entity)
            .insert((Mesh3d(mesh), ElementGeometry(descriptor)));
    }

    let slots = world
        .get::<ElementMaterials>(entity)
        .map(|slots| slots.0.clone())
        .unwrap_or_default();

    if slots.is_empty() || slots.len() != record.materials.len() {
        let handles = decode_materials(world, &record.id, &record.materials);
        let first = handles.first().cloned().unwrap_or_default();
        world
            .entity_mut(entity)
            .insert((MeshMaterial3d(first), ElementMaterials(handles)));
    } else {
        {
            let mut materials = world.resource_mut::<Assets<StandardMaterial>>();
            for (slot, descriptor) in slots.iter().zip(&record.materials) {
                if let Some(material) = materials.get_mut(slot) {
                    material.base_color = hex_to_color(descriptor.color, descriptor.opacity);
                    material.emissive = hex_to_color(descriptor.emissive, 1.0).to_linear();
                    material.alpha_mode = if descriptor.transparent {
                        AlphaMode::Blend
                    } else {
                        AlphaMode::Opaque
                    };
                }
            }
        }
        restore_slot_textures(world, entity, &record.slot_texture_urls());
    }

    if let Some(color) = record.applied_color() {
        set_element_color(world, entity, color);
    }

    // Faces whose slots already carry a recorded URL were restored above
    let slot_count = record.materials.len();
    for (face, url) in record.applied_textures() {
        let recorded = record.materials.iter().enumerate().any(|(index, material)| {
            face.applies_to_slot(index, slot_count) && material.texture_url.is_some()
        });
        if !recorded {
            apply_texture_to_element(world, entity, url, *face);
        }
    }
}

fn restore_children(world: &mut World, entity: Entity, record: &ElementRecord) {
    let live = children_of(world, entity);
    for (position, child) in record.children.iter().enumerate() {
        let by_id = live.iter().copied().find(|c| {
            world
                .get::<ElementId>(*c)
                .is_some_and(|id| id.0 == child.id)
        });
        match by_id.or_else(|| live.get(position).copied()) {
            Some(target) => {
                if let Err(e) = update_element(world, target, child) {
                    warn!("Could not restore child {}: {}", child.id, e);
                }
            }
            None => {
                if let Err(e) = instantiate_record(world, child, entity) {
                    warn!("Could not recreate child {}: {}", child.id, e);
                }
            }
        }
    }
}

/// Spawn an element from a record under `parent`
pub fn instantiate_record(
    world: &mut World,
    record: &ElementRecord,
    parent: Entity,
) -> Result<Entity, HistoryError> {
    if record.id.is_empty() {
        return Err(HistoryError::Decode {
            id: String::new(),
            reason: "record has no id".to_string(),
        });
    }
    if world.get_entity(parent).is_err() {
        return Err(HistoryError::Restore(format!(
            "parent of {} is no longer in the scene",
            record.id
        )));
    }

    world.resource_mut::<TextureLoads>().invalidate(&record.id);

    let base = (
        Name::new(format!("{} {}", record.metadata.kind.display_name(), record.id)),
        ElementId(record.id.clone()),
        record.metadata.clone(),
        Transform::from(record.transform),
        visibility(record.visible),
        ChildOf(parent),
    );

    match record.node {
        NodeKind::Mesh => {
            let (mesh, descriptor) = decode_geometry(record.geometry.as_ref());
            let mesh = world.resource_mut::<Assets<Mesh>>().add(mesh);
            let slots = decode_materials(world, &record.id, &record.materials);
            let first = slots.first().cloned().unwrap_or_default();
            let entity = world
                .spawn((
                    base,
                    Mesh3d(mesh),
                    MeshMaterial3d(first),
                    ElementMaterials(slots),
                    ElementGeometry(descriptor),
                ))
                .id();

            if record.slot_texture_urls().iter().all(Option::is_none) {
                for (face, url) in record.applied_textures() {
                    apply_texture_to_element(world, entity, url, *face);
                }
            }
            Ok(entity)
        }
        NodeKind::Group => {
            let entity = world.spawn(base).id();
            for child in &record.children {
                if let Err(e) = instantiate_record(world, child, entity) {
                    warn!("Could not recreate child {}: {}", child.id, e);
                }
            }
            Ok(entity)
        }
    }
}

/// Mark every material changed so the renderer picks up restored values
fn refresh_materials(world: &mut World) {
    let Some(mut materials) = world.get_resource_mut::<Assets<StandardMaterial>>() else {
        return;
    };
    let ids: Vec<AssetId<StandardMaterial>> = materials.ids().collect();
    for id in ids {
        let _ = materials.get_mut(id);
    }
}
