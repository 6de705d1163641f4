//! Startup: top-level groups, lighting and the demo city block.

use bevy::prelude::*;

use crate::editor::history::{
    ElementRecord, GeometryDescriptor, GeometryKind, MaterialDescriptor, SceneSnapshot,
    TransformData, load_snapshot,
};

use super::components::{ElementKind, ElementMetadata, SceneGroup, SceneGroups};

/// Spawn the two top-level groups and register them
pub fn spawn_scene_groups(mut commands: Commands) {
    let buildings = commands
        .spawn((
            Name::new("buildings"),
            SceneGroup::Buildings,
            Transform::default(),
            Visibility::default(),
        ))
        .id();
    let external_models = commands
        .spawn((
            Name::new("externalModels"),
            SceneGroup::ExternalModels,
            Transform::default(),
            Visibility::default(),
        ))
        .id();
    commands.insert_resource(SceneGroups {
        buildings,
        external_models,
    });
}

pub fn spawn_lighting(mut commands: Commands) {
    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(80.0, 160.0, 40.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

fn building(id: &str, x: f32, z: f32, width: f32, height: f32, depth: f32, color: u32) -> ElementRecord {
    let metadata = ElementMetadata {
        original_height: Some(height),
        original_width: Some(width),
        original_depth: Some(depth),
        ..ElementMetadata::new(ElementKind::Building)
    };
    ElementRecord::mesh(
        id,
        metadata,
        GeometryDescriptor::cuboid(width, height, depth),
        MaterialDescriptor::solid(color),
    )
    .with_transform(TransformData::from_translation(Vec3::new(x, height / 2.0, z)))
}

fn flat(id: &str, kind: ElementKind, center: Vec3, width: f32, depth: f32, color: u32) -> ElementRecord {
    ElementRecord::mesh(
        id,
        ElementMetadata::new(kind),
        GeometryDescriptor::new(GeometryKind::Plane)
            .with("width", width)
            .with("height", depth),
        MaterialDescriptor::solid(color),
    )
    .with_transform(TransformData::from_translation(center))
}

fn tree(id: &str, x: f32, z: f32) -> ElementRecord {
    let trunk = ElementRecord::mesh(
        format!("{}-trunk", id),
        ElementMetadata::new(ElementKind::Natural),
        GeometryDescriptor::new(GeometryKind::Cylinder)
            .with("radiusTop", 0.6)
            .with("radiusBottom", 0.8)
            .with("height", 4.0),
        MaterialDescriptor::solid(0x6b4f2a),
    )
    .with_transform(TransformData::from_translation(Vec3::new(0.0, 2.0, 0.0)));
    let crown = ElementRecord::mesh(
        format!("{}-crown", id),
        ElementMetadata::new(ElementKind::Natural),
        GeometryDescriptor::new(GeometryKind::Cone)
            .with("radius", 3.0)
            .with("height", 7.0),
        MaterialDescriptor::solid(0x2f7d32),
    )
    .with_transform(TransformData::from_translation(Vec3::new(0.0, 7.5, 0.0)));

    let metadata = ElementMetadata {
        is_external_model: true,
        ..ElementMetadata::new(ElementKind::Group)
    };
    ElementRecord::group(id, metadata, vec![trunk, crown])
        .with_transform(TransformData::from_translation(Vec3::new(x, 0.0, z)))
}

/// A small block of buildings, a street, a pond and a few trees
pub fn demo_snapshot() -> SceneSnapshot {
    let mut snapshot = SceneSnapshot::default();

    let buildings = vec![
        flat("street-1", ElementKind::Highway, Vec3::new(0.0, 0.05, 0.0), 160.0, 12.0, 0x3a3a3a),
        flat("park-1", ElementKind::Landuse, Vec3::new(-45.0, 0.02, 40.0), 50.0, 50.0, 0x7cb342),
        flat("pond-1", ElementKind::Water, Vec3::new(-45.0, 0.04, 40.0), 18.0, 12.0, 0x4a90d9),
        building("building-1", -50.0, -25.0, 20.0, 30.0, 20.0, 0xd7ccc8),
        building("building-2", -20.0, -25.0, 18.0, 45.0, 18.0, 0xbcaaa4),
        building("building-3", 10.0, -28.0, 24.0, 18.0, 24.0, 0xa1887f),
        building("building-4", 40.0, -25.0, 16.0, 60.0, 16.0, 0x90a4ae),
        building("building-5", 10.0, 30.0, 30.0, 24.0, 20.0, 0xcfd8dc),
        building("building-6", 45.0, 30.0, 20.0, 36.0, 20.0, 0xb0bec5),
    ];
    let external_models = vec![
        tree("tree-1", -60.0, 25.0),
        tree("tree-2", -30.0, 55.0),
        tree("tree-3", -62.0, 58.0),
    ];

    snapshot.groups.insert(SceneGroup::Buildings, buildings);
    snapshot.groups.insert(SceneGroup::ExternalModels, external_models);
    snapshot
}

/// Exclusive startup system populating the scene and saving the initial checkpoint
pub fn load_demo_scene(world: &mut World) {
    let snapshot = demo_snapshot();
    if load_snapshot(world, &snapshot) {
        info!("Loaded demo scene ({} elements)", snapshot.element_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_scene_ids_are_unique() {
        let snapshot = demo_snapshot();
        let mut ids: Vec<&str> = SceneGroup::ALL
            .iter()
            .flat_map(|group| snapshot.records(*group))
            .map(|record| record.id.as_str())
            .collect();
        let count = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), count);
    }

    #[test]
    fn test_demo_trees_go_to_external_models() {
        let snapshot = demo_snapshot();
        assert!(
            snapshot
                .records(SceneGroup::ExternalModels)
                .iter()
                .all(|record| record.target_group() == SceneGroup::ExternalModels)
        );
        assert!(
            snapshot
                .records(SceneGroup::Buildings)
                .iter()
                .all(|record| record.target_group() == SceneGroup::Buildings)
        );
    }
}
