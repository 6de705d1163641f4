//! Edits triggered from the UI or keyboard. Each one records a history entry
//! before it changes the scene.

use bevy::prelude::*;
use bevy_egui::EguiContexts;

use crate::constants::DEFAULT_MATERIAL_COLOR;
use crate::scene::{
    ElementGeometry, ElementId, ElementKind, ElementMetadata, FaceKey, SceneGroup, SceneGroups,
    apply_texture_to_element, element_id_of, group_of, invalidate_textures, set_element_color,
};

use super::camera::{EditorCamera, OrbitTarget};
use super::history::capture::{capture_colors, capture_partial, capture_textures};
use super::history::codec::decode_geometry;
use super::history::restore::instantiate_record;
use super::history::{
    EditChanges, ElementRecord, GeometryDescriptor, GeometryKind, MaterialDescriptor,
    TransformData, push_color_change, push_edit, push_edit_records, push_texture_change,
};
use super::notifications::notify;
use super::selection::{Selected, clear_selection};

const NUDGE_STEP: f32 = 1.0;
const NUDGE_STEP_LARGE: f32 = 10.0;

/// Selected top-level elements, in a stable order
fn selected_elements(world: &mut World) -> Vec<Entity> {
    let mut selected = world.query_filtered::<Entity, (With<Selected>, With<ElementId>)>();
    let mut entities: Vec<Entity> = selected.iter(world).collect();
    entities.sort();
    entities
}

fn selected_ids(world: &World, entities: &[Entity]) -> Vec<String> {
    entities.iter().map(|e| element_id_of(world, *e)).collect()
}

fn orbit_target(world: &mut World) -> Vec3 {
    let mut cameras = world.query_filtered::<&OrbitTarget, With<EditorCamera>>();
    cameras.iter(world).next().map(|t| t.0).unwrap_or(Vec3::ZERO)
}

/// Add a default-sized box building at the camera's focus point
pub fn place_box_building(world: &mut World) -> Option<Entity> {
    let Some(groups) = world.get_resource::<SceneGroups>().copied() else {
        warn!("Cannot place a building before the scene is set up");
        return None;
    };

    let size = GeometryDescriptor::default_box().bounding_size();
    let focus = orbit_target(world);
    let metadata = ElementMetadata {
        is_user_created: true,
        original_height: Some(size.y),
        original_width: Some(size.x),
        original_depth: Some(size.z),
        ..ElementMetadata::new(ElementKind::Building)
    };
    let record = ElementRecord::mesh(
        format!("building_{}", uuid::Uuid::new_v4()),
        metadata,
        GeometryDescriptor::default_box(),
        MaterialDescriptor::solid(DEFAULT_MATERIAL_COLOR),
    )
    .with_transform(TransformData::from_translation(Vec3::new(
        focus.x,
        size.y / 2.0,
        focus.z,
    )));

    match instantiate_record(world, &record, groups.buildings) {
        Ok(entity) => {
            push_edit(world, "Add building", &[], &[], &[entity]);
            info!("Placed building {}", record.id);
            Some(entity)
        }
        Err(e) => {
            error!("Could not place building: {}", e);
            notify(world, "Could not add building", true);
            None
        }
    }
}

/// Remove the selected elements
pub fn delete_selected(world: &mut World) -> usize {
    let entities = selected_elements(world);
    if entities.is_empty() {
        return 0;
    }

    let description = if entities.len() == 1 {
        "Delete element".to_string()
    } else {
        format!("Delete {} elements", entities.len())
    };
    push_edit(world, &description, &[], &entities, &[]);

    clear_selection(world);
    for entity in &entities {
        invalidate_textures(world, *entity);
        world.despawn(*entity);
    }
    info!("Deleted {} elements", entities.len());
    entities.len()
}

/// Move the selected elements by `delta`
pub fn nudge_selected(world: &mut World, delta: Vec3) -> bool {
    let entities = selected_elements(world);
    if entities.is_empty() {
        return false;
    }

    push_edit(world, "Transform modification", &entities, &[], &[]);
    for entity in entities {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation += delta;
        }
    }
    true
}

/// Rebuild the selected box elements at a new height, keeping their base on the ground
pub fn set_selected_height(world: &mut World, height: f32) -> usize {
    if !height.is_finite() || height <= 0.0 {
        return 0;
    }

    let boxes: Vec<Entity> = selected_elements(world)
        .into_iter()
        .filter(|e| {
            world
                .get::<ElementGeometry>(*e)
                .is_some_and(|g| g.0.kind == GeometryKind::Box)
        })
        .collect();
    if boxes.is_empty() {
        return 0;
    }

    push_edit(world, "Change height", &boxes, &[], &[]);
    for entity in &boxes {
        let Some(previous) = world.get::<ElementGeometry>(*entity).map(|g| g.0.clone()) else {
            continue;
        };
        let old_height = previous.bounding_size().y;
        let (mesh, descriptor) = decode_geometry(Some(&previous.with("height", height)));
        let mesh = world.resource_mut::<Assets<Mesh>>().add(mesh);

        let mut element = world.entity_mut(*entity);
        element.insert((Mesh3d(mesh), ElementGeometry(descriptor)));
        if let Some(mut transform) = element.get_mut::<Transform>() {
            transform.translation.y += (height - old_height) / 2.0;
        }
        if let Some(mut metadata) = element.get_mut::<ElementMetadata>() {
            metadata.modifications.height = Some(height);
        }
    }
    boxes.len()
}

/// Recolor every material slot of the selected elements
pub fn recolor_selected(world: &mut World, hex: u32) -> usize {
    let entities = selected_elements(world);
    let ids = selected_ids(world, &entities);
    let previous = capture_colors(world, ids.iter().map(String::as_str));
    if previous.is_empty() {
        return 0;
    }

    let recolored = entities
        .iter()
        .filter(|e| set_element_color(world, **e, hex))
        .count();
    push_color_change(world, "Change color", previous, hex);
    recolored
}

/// Queue a texture for one face of the selected elements
pub fn texture_selected(world: &mut World, url: &str, face: FaceKey) -> usize {
    let url = url.trim();
    if url.is_empty() {
        return 0;
    }

    let entities = selected_elements(world);
    let ids = selected_ids(world, &entities);
    let previous = capture_textures(world, ids.iter().map(String::as_str));
    if previous.is_empty() {
        return 0;
    }

    let mut queued = 0;
    for entity in &entities {
        invalidate_textures(world, *entity);
        queued += apply_texture_to_element(world, *entity, url, face);
    }
    push_texture_change(world, "Apply texture", previous, url, face);
    queued
}

/// Combine the selected buildings into one merged group. The originals are
/// kept in the group's metadata.
pub fn merge_selected(world: &mut World) -> Option<Entity> {
    let groups = world.get_resource::<SceneGroups>().copied()?;
    let entities: Vec<Entity> = selected_elements(world)
        .into_iter()
        .filter(|e| group_of(world, *e) == Some(SceneGroup::Buildings))
        .collect();
    if entities.len() < 2 {
        notify(world, "Select at least two buildings to merge", true);
        return None;
    }

    let originals = capture_partial(world, &entities);
    let parts = originals
        .iter()
        .map(|record| ElementRecord {
            id: format!("{}-part", record.id),
            metadata: ElementMetadata {
                is_user_created: true,
                ..record.metadata.clone()
            },
            ..record.clone()
        })
        .collect();
    let merged = ElementRecord::group(
        format!("merged_{}", uuid::Uuid::new_v4()),
        ElementMetadata {
            is_user_created: true,
            is_merged: true,
            original_elements: originals.clone(),
            ..ElementMetadata::new(ElementKind::Merged)
        },
        parts,
    );

    clear_selection(world);
    for entity in &entities {
        invalidate_textures(world, *entity);
        world.despawn(*entity);
    }

    match instantiate_record(world, &merged, groups.buildings) {
        Ok(entity) => {
            push_edit_records(
                world,
                "Merge elements",
                EditChanges {
                    deleted: originals,
                    added: capture_partial(world, &[entity]),
                    ..default()
                },
            );
            info!("Merged {} elements into {}", entities.len(), merged.id);
            Some(entity)
        }
        Err(e) => {
            error!("Merge failed: {}", e);
            notify(world, "Merge failed", true);
            None
        }
    }
}

/// Split the selected merged groups back into the elements they were made of
pub fn separate_selected(world: &mut World) -> Vec<Entity> {
    let Some(groups) = world.get_resource::<SceneGroups>().copied() else {
        return Vec::new();
    };
    let merged: Vec<Entity> = selected_elements(world)
        .into_iter()
        .filter(|e| {
            world
                .get::<ElementMetadata>(*e)
                .is_some_and(|m| m.is_merged && !m.original_elements.is_empty())
        })
        .collect();
    if merged.is_empty() {
        notify(world, "Select a merged element to separate", true);
        return Vec::new();
    }

    let merged_records = capture_partial(world, &merged);
    clear_selection(world);
    for entity in &merged {
        invalidate_textures(world, *entity);
        world.despawn(*entity);
    }

    let mut restored = Vec::new();
    for original in merged_records
        .iter()
        .flat_map(|record| &record.metadata.original_elements)
    {
        let parent = groups.get(original.target_group());
        match instantiate_record(world, original, parent) {
            Ok(entity) => restored.push(entity),
            Err(e) => warn!("Could not restore {}: {}", original.id, e),
        }
    }

    let description = if merged_records.len() == 1 {
        "Separate element".to_string()
    } else {
        format!("Separate {} elements", merged_records.len())
    };
    let added = capture_partial(world, &restored);
    push_edit_records(
        world,
        &description,
        EditChanges {
            deleted: merged_records,
            added,
            exact: true,
            ..default()
        },
    );
    info!("Separated {} merged elements", merged.len());
    restored
}

/// Delete and arrow-key shortcuts for the selection
pub fn handle_operation_shortcuts(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut commands: Commands,
    mut contexts: EguiContexts,
) {
    if contexts
        .ctx_mut()
        .is_ok_and(|ctx| ctx.wants_keyboard_input())
    {
        return;
    }

    if keyboard.just_pressed(KeyCode::Delete) || keyboard.just_pressed(KeyCode::Backspace) {
        commands.queue(|world: &mut World| {
            delete_selected(world);
        });
        return;
    }

    let shift = keyboard.pressed(KeyCode::ShiftLeft) || keyboard.pressed(KeyCode::ShiftRight);
    let step = if shift { NUDGE_STEP_LARGE } else { NUDGE_STEP };
    let direction = [
        (KeyCode::ArrowLeft, Vec3::NEG_X),
        (KeyCode::ArrowRight, Vec3::X),
        (KeyCode::ArrowUp, Vec3::NEG_Z),
        (KeyCode::ArrowDown, Vec3::Z),
    ]
    .into_iter()
    .filter(|(key, _)| keyboard.just_pressed(*key))
    .map(|(_, dir)| dir)
    .sum::<Vec3>();

    if direction != Vec3::ZERO {
        let delta = direction * step;
        commands.queue(move |world: &mut World| {
            nudge_selected(world, delta);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::history::test_support::*;
    use crate::editor::history::{HistoryManager, redo, undo};
    use crate::scene::{TextureLoads, find_element, slot_colors};

    fn select(world: &mut World, ids: &[&str]) -> Vec<Entity> {
        ids.iter()
            .map(|id| {
                let entity = find_element(world, id).unwrap();
                world.entity_mut(entity).insert(Selected);
                entity
            })
            .collect()
    }

    #[test]
    fn test_place_box_building_is_undoable() {
        let mut world = test_world();
        let entity = place_box_building(&mut world).unwrap();
        let id = element_id_of(&world, entity);
        assert_eq!(group_len(&world, SceneGroup::Buildings), 1);
        assert_eq!(world.resource::<HistoryManager>().undo_count(), 1);

        assert!(undo(&mut world));
        assert!(find_element(&world, &id).is_none());
        assert!(redo(&mut world));
        assert!(find_element(&world, &id).is_some());
    }

    #[test]
    fn test_delete_selected_then_undo() {
        let mut world = test_world();
        spawn_record(&mut world, &building("a", 10.0));
        spawn_record(&mut world, &building("b", 12.0));
        select(&mut world, &["a", "b"]);

        assert_eq!(delete_selected(&mut world), 2);
        assert_eq!(group_len(&world, SceneGroup::Buildings), 0);

        assert!(undo(&mut world));
        assert_eq!(group_len(&world, SceneGroup::Buildings), 2);
    }

    #[test]
    fn test_delete_without_selection_records_nothing() {
        let mut world = test_world();
        spawn_record(&mut world, &building("a", 10.0));
        assert_eq!(delete_selected(&mut world), 0);
        assert_eq!(history_counts(&world), (0, 0));
    }

    #[test]
    fn test_nudge_selected_undo() {
        let mut world = test_world();
        let entity = spawn_record(&mut world, &building("a", 10.0));
        select(&mut world, &["a"]);

        assert!(nudge_selected(&mut world, Vec3::new(10.0, 0.0, 0.0)));
        assert_eq!(
            world.get::<Transform>(entity).unwrap().translation,
            Vec3::new(10.0, 5.0, 0.0)
        );

        assert!(undo(&mut world));
        assert_eq!(
            world.get::<Transform>(entity).unwrap().translation,
            Vec3::new(0.0, 5.0, 0.0)
        );
    }

    #[test]
    fn test_set_selected_height_undo() {
        let mut world = test_world();
        let entity = spawn_record(&mut world, &building("a", 10.0));
        select(&mut world, &["a"]);

        assert_eq!(set_selected_height(&mut world, 30.0), 1);
        assert_eq!(
            world.get::<ElementGeometry>(entity).unwrap().0.param("height", 0.0),
            30.0
        );
        assert_eq!(world.get::<Transform>(entity).unwrap().translation.y, 15.0);

        assert!(undo(&mut world));
        assert_eq!(
            world.get::<ElementGeometry>(entity).unwrap().0.param("height", 0.0),
            10.0
        );
        assert_eq!(world.get::<Transform>(entity).unwrap().translation.y, 5.0);
        assert_eq!(
            world
                .get::<ElementMetadata>(entity)
                .unwrap()
                .modifications
                .height,
            None
        );
    }

    #[test]
    fn test_recolor_selected() {
        let mut world = test_world();
        let entity = spawn_record(&mut world, &building("a", 10.0));
        select(&mut world, &["a"]);

        assert_eq!(recolor_selected(&mut world, 0x112233), 1);
        assert_eq!(slot_colors(&world, entity), vec![0x112233]);

        assert!(undo(&mut world));
        assert_eq!(slot_colors(&world, entity), vec![0xff0000]);
    }

    #[test]
    fn test_texture_selected_queues_requests() {
        let mut world = test_world();
        let entity = spawn_record(&mut world, &building("a", 10.0));
        select(&mut world, &["a"]);

        assert_eq!(texture_selected(&mut world, "  ", FaceKey::Top), 0);
        assert_eq!(texture_selected(&mut world, "roof.png", FaceKey::Top), 1);

        let queued = world.resource::<TextureLoads>().queued();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].url, "roof.png");
        assert_eq!(world.resource::<HistoryManager>().undo_count(), 1);
        assert!(world.get::<Selected>(entity).is_some());
    }

    #[test]
    fn test_merge_selected_and_undo() {
        let mut world = test_world();
        spawn_record(&mut world, &building("a", 10.0));
        spawn_record(&mut world, &building("b", 20.0));
        select(&mut world, &["a", "b"]);

        let merged = merge_selected(&mut world).unwrap();
        let merged_id = element_id_of(&world, merged);
        assert_eq!(group_len(&world, SceneGroup::Buildings), 1);
        assert!(find_element(&world, "a").is_none());

        assert!(undo(&mut world));
        assert!(find_element(&world, &merged_id).is_none());
        assert!(find_element(&world, "a").is_some());
        assert!(find_element(&world, "b").is_some());
    }

    #[test]
    fn test_merge_needs_two_buildings() {
        let mut world = test_world();
        spawn_record(&mut world, &building("a", 10.0));
        select(&mut world, &["a"]);
        assert!(merge_selected(&mut world).is_none());
        assert_eq!(history_counts(&world), (0, 0));
    }

    #[test]
    fn test_separate_selected_and_undo_redo() {
        let mut world = test_world();
        spawn_record(&mut world, &building("a", 10.0));
        spawn_record(&mut world, &building("b", 20.0));
        select(&mut world, &["a", "b"]);
        let merged = merge_selected(&mut world).unwrap();
        let merged_id = element_id_of(&world, merged);
        world.entity_mut(merged).insert(Selected);

        let restored = separate_selected(&mut world);
        assert_eq!(restored.len(), 2);
        assert!(find_element(&world, &merged_id).is_none());
        assert!(find_element(&world, "a").is_some());
        assert!(find_element(&world, "b").is_some());
        assert_eq!(history_counts(&world), (2, 0));

        assert!(undo(&mut world));
        assert!(find_element(&world, &merged_id).is_some());
        assert!(find_element(&world, "a").is_none());
        assert!(find_element(&world, "b").is_none());

        assert!(redo(&mut world));
        assert!(find_element(&world, &merged_id).is_none());
        assert!(find_element(&world, "a").is_some());
        assert!(find_element(&world, "b").is_some());
        assert_eq!(group_len(&world, SceneGroup::Buildings), 2);
    }

    #[test]
    fn test_separate_needs_merged_selection() {
        let mut world = test_world();
        spawn_record(&mut world, &building("a", 10.0));
        select(&mut world, &["a"]);
        assert!(separate_selected(&mut world).is_empty());
        assert!(find_element(&world, "a").is_some());
        assert_eq!(history_counts(&world), (0, 0));
    }
}
