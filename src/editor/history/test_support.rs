//! Shared fixtures for world-level history tests.

use bevy::prelude::*;

use crate::editor::camera::RedrawRequest;
use crate::editor::notifications::Notifications;
use crate::editor::selection::TransformHandle;
use crate::scene::{
    ElementKind, ElementMetadata, SceneGroup, SceneGroups, TextureLoads, TextureSources,
    children_of, slot_colors,
};

use super::restore::instantiate_record;
use super::{
    ElementRecord, GeometryDescriptor, GeometryKind, HistoryManager, MaterialDescriptor,
    TransformData,
};

/// Bare world with asset stores, history resources and both top-level groups
pub fn test_world() -> World {
    let mut world = World::new();
    world.init_resource::<Assets<Mesh>>();
    world.init_resource::<Assets<StandardMaterial>>();
    world.init_resource::<Assets<Image>>();
    world.init_resource::<HistoryManager>();
    world.init_resource::<TextureLoads>();
    world.init_resource::<TextureSources>();
    world.init_resource::<Notifications>();
    world.init_resource::<RedrawRequest>();
    world.init_resource::<TransformHandle>();

    let buildings = world
        .spawn((
            Name::new("buildings"),
            SceneGroup::Buildings,
            Transform::default(),
            Visibility::default(),
        ))
        .id();
    let external_models = world
        .spawn((
            Name::new("externalModels"),
            SceneGroup::ExternalModels,
            Transform::default(),
            Visibility::default(),
        ))
        .id();
    world.insert_resource(SceneGroups {
        buildings,
        external_models,
    });
    world
}

pub fn building(id: &str, height: f32) -> ElementRecord {
    let metadata = ElementMetadata {
        kind: ElementKind::Building,
        is_user_created: true,
        original_height: Some(height),
        ..default()
    };
    ElementRecord::mesh(
        id,
        metadata,
        GeometryDescriptor::cuboid(20.0, height, 20.0),
        MaterialDescriptor::solid(0xff0000),
    )
    .with_transform(TransformData::from_translation(Vec3::new(0.0, height / 2.0, 0.0)))
}

pub fn external_model(id: &str) -> ElementRecord {
    let metadata = ElementMetadata {
        is_external_model: true,
        ..default()
    };
    ElementRecord::mesh(
        id,
        metadata,
        GeometryDescriptor::new(GeometryKind::Sphere).with("radius", 3.0),
        MaterialDescriptor::solid(0x3366cc),
    )
}

/// Spawn a record under the group it belongs to
pub fn spawn_record(world: &mut World, record: &ElementRecord) -> Entity {
    let parent = world.resource::<SceneGroups>().get(record.target_group());
    instantiate_record(world, record, parent).unwrap()
}

pub fn group_len(world: &World, group: SceneGroup) -> usize {
    let root = world.resource::<SceneGroups>().get(group);
    children_of(world, root).len()
}

pub fn first_slot_color(world: &World, entity: Entity) -> u32 {
    slot_colors(world, entity)[0]
}

pub fn history_counts(world: &World) -> (usize, usize) {
    let history = world.resource::<HistoryManager>();
    (history.undo_count(), history.redo_count())
}
