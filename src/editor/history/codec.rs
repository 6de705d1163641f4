//! Conversion between live scene elements and [`ElementRecord`]s.

use bevy::mesh::{MeshBuilder, Meshable};
use bevy::prelude::*;
use uuid::Uuid;

use crate::scene::{
    ElementGeometry, ElementId, ElementMaterials, ElementMetadata, TextureLoads, TextureSources,
    TextureTarget, children_of,
};

use super::data_types::{
    ElementRecord, GeometryDescriptor, GeometryKind, MaterialDescriptor, NodeKind, TransformData,
};
use super::error::HistoryError;

const DEFAULT_RADIUS: f32 = 5.0;
const DEFAULT_SEGMENTS: f32 = 8.0;
/// Fewest segments the round mesh builders accept
const MIN_SEGMENTS: u32 = 3;

/// Id of an element: its `ElementId`, else the engine id, else a fresh uuid
pub fn resolve_element_id(id: Option<&ElementId>, entity: Entity) -> String {
    match id {
        Some(id) if !id.0.is_empty() => id.0.clone(),
        _ if entity != Entity::PLACEHOLDER => format!("entity_{}", entity.to_bits()),
        _ => format!("element_{}", Uuid::new_v4().simple()),
    }
}

/// sRGB color as `0xRRGGBB`, alpha dropped
pub fn color_to_hex(color: Color) -> u32 {
    let srgba = color.to_srgba();
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
    (channel(srgba.red) << 16) | (channel(srgba.green) << 8) | channel(srgba.blue)
}

pub fn hex_to_color(hex: u32, alpha: f32) -> Color {
    let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
    Color::srgba(channel(16), channel(8), channel(0), alpha)
}

/// URL of the texture a material slot shows or is about to show
pub fn slot_texture_url(world: &World, slot: &Handle<StandardMaterial>) -> Option<String> {
    if let Some(url) = world
        .get_resource::<TextureLoads>()
        .and_then(|loads| loads.pending_url(slot.id()))
    {
        return Some(url.to_string());
    }

    let image = world
        .get_resource::<Assets<StandardMaterial>>()?
        .get(slot)?
        .base_color_texture
        .clone()?;

    if let Some(url) = world
        .get_resource::<TextureSources>()
        .and_then(|sources| sources.url_for(image.id()))
    {
        return Some(url.to_string());
    }

    world
        .get_resource::<AssetServer>()
        .and_then(|server| server.get_path(image.id()))
        .map(|path| path.to_string())
}

pub fn encode_material(material: &StandardMaterial, texture_url: Option<String>) -> MaterialDescriptor {
    let base = material.base_color.to_srgba();
    MaterialDescriptor {
        color: color_to_hex(material.base_color),
        emissive: color_to_hex(Color::from(material.emissive)),
        opacity: base.alpha,
        transparent: !matches!(material.alpha_mode, AlphaMode::Opaque),
        texture_url,
    }
}

fn encode_materials(world: &World, entity: Entity) -> Result<Vec<MaterialDescriptor>, HistoryError> {
    let slots = match world.get::<ElementMaterials>(entity) {
        Some(slots) => slots.0.clone(),
        None => world
            .get::<MeshMaterial3d<StandardMaterial>>(entity)
            .map(|material| vec![material.0.clone()])
            .unwrap_or_default(),
    };

    let materials = world
        .get_resource::<Assets<StandardMaterial>>()
        .ok_or_else(|| HistoryError::Encode {
            entity,
            reason: "material assets are not available".to_string(),
        })?;

    slots
        .iter()
        .map(|slot| {
            let material = materials.get(slot).ok_or_else(|| HistoryError::Encode {
                entity,
                reason: "material asset is missing".to_string(),
            })?;
            Ok(encode_material(material, slot_texture_url(world, slot)))
        })
        .collect()
}

/// Capture one element and, for groups, its children
pub fn encode_element(world: &World, entity: Entity) -> Result<ElementRecord, HistoryError> {
    let transform = world
        .get::<Transform>(entity)
        .ok_or_else(|| HistoryError::Encode {
            entity,
            reason: "entity has no transform".to_string(),
        })?;

    let id = resolve_element_id(world.get::<ElementId>(entity), entity);
    let visible = !matches!(world.get::<Visibility>(entity), Some(Visibility::Hidden));
    let metadata = world
        .get::<ElementMetadata>(entity)
        .cloned()
        .unwrap_or_default();

    if world.get::<Mesh3d>(entity).is_some() {
        let geometry = world
            .get::<ElementGeometry>(entity)
            .map(|geometry| geometry.0.clone())
            .ok_or_else(|| HistoryError::Encode {
                entity,
                reason: "mesh has no geometry descriptor".to_string(),
            })?;

        return Ok(ElementRecord {
            id,
            node: NodeKind::Mesh,
            transform: TransformData::from(transform),
            visible,
            metadata,
            geometry: Some(geometry),
            materials: encode_materials(world, entity)?,
            children: Vec::new(),
        });
    }

    let children = children_of(world, entity)
        .into_iter()
        .filter_map(|child| match encode_element(world, child) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping child of {}: {}", id, e);
                None
            }
        })
        .collect();

    Ok(ElementRecord {
        id,
        node: NodeKind::Group,
        transform: TransformData::from(transform),
        visible,
        metadata,
        geometry: None,
        materials: Vec::new(),
        children,
    })
}

fn segments(descriptor: &GeometryDescriptor, key: &str, default: f32, min: u32) -> u32 {
    (descriptor.param(key, default) as u32).max(min)
}

/// Build the mesh for a descriptor.
///
/// Returns the descriptor actually used: unknown kinds become the default box.
pub fn decode_geometry(descriptor: Option<&GeometryDescriptor>) -> (Mesh, GeometryDescriptor) {
    let descriptor = match descriptor {
        Some(d) if d.kind != GeometryKind::Unknown => d.clone(),
        _ => GeometryDescriptor::default_box(),
    };
    let d = &descriptor;

    let mesh = match d.kind {
        GeometryKind::Sphere => Sphere::new(d.param("radius", DEFAULT_RADIUS))
            .mesh()
            .uv(
                segments(d, "widthSegments", DEFAULT_SEGMENTS, MIN_SEGMENTS),
                segments(d, "heightSegments", 6.0, 2),
            ),
        GeometryKind::Cylinder => {
            let top = d.param("radiusTop", DEFAULT_RADIUS);
            let bottom = d.param("radiusBottom", DEFAULT_RADIUS);
            let height = d.param("height", 10.0);
            let resolution = segments(d, "radialSegments", DEFAULT_SEGMENTS, MIN_SEGMENTS);
            if (top - bottom).abs() < f32::EPSILON {
                Cylinder::new(top, height).mesh().resolution(resolution).build()
            } else {
                ConicalFrustum {
                    radius_top: top,
                    radius_bottom: bottom,
                    height,
                }
                .mesh()
                .resolution(resolution)
                .build()
            }
        }
        GeometryKind::Cone => Cone {
            radius: d.param("radius", DEFAULT_RADIUS),
            height: d.param("height", 10.0),
        }
        .mesh()
        .resolution(segments(d, "radialSegments", DEFAULT_SEGMENTS, MIN_SEGMENTS))
        .build(),
        GeometryKind::Plane => Plane3d::default()
            .mesh()
            .size(d.param("width", 10.0), d.param("height", 10.0))
            .build(),
        GeometryKind::Torus => Torus {
            minor_radius: d.param("tube", 2.0),
            major_radius: d.param("radius", DEFAULT_RADIUS),
        }
        .mesh()
        .minor_resolution(segments(d, "radialSegments", DEFAULT_SEGMENTS, MIN_SEGMENTS) as usize)
        .major_resolution(segments(d, "tubularSegments", 6.0, MIN_SEGMENTS) as usize)
        .build(),
        GeometryKind::Box | GeometryKind::Unknown => Cuboid::new(
            d.param("width", 10.0),
            d.param("height", 10.0),
            d.param("depth", 10.0),
        )
        .mesh()
        .build(),
    };

    (mesh, descriptor)
}

pub fn decode_material(descriptor: &MaterialDescriptor) -> StandardMaterial {
    StandardMaterial {
        base_color: hex_to_color(descriptor.color, descriptor.opacity.clamp(0.0, 1.0)),
        emissive: hex_to_color(descriptor.emissive, 1.0).to_linear(),
        alpha_mode: if descriptor.transparent {
            AlphaMode::Blend
        } else {
            AlphaMode::Opaque
        },
        perceptual_roughness: 1.0,
        metallic: 0.0,
        ..default()
    }
}

/// Create material assets for every slot and queue their textures
pub fn decode_materials(
    world: &mut World,
    element_id: &str,
    descriptors: &[MaterialDescriptor],
) -> Vec<Handle<StandardMaterial>> {
    let defaults = [MaterialDescriptor::default()];
    let descriptors = if descriptors.is_empty() {
        &defaults[..]
    } else {
        descriptors
    };

    let handles: Vec<Handle<StandardMaterial>> = {
        let mut materials = world.resource_mut::<Assets<StandardMaterial>>();
        descriptors
            .iter()
            .map(|descriptor| materials.add(decode_material(descriptor)))
            .collect()
    };

    let mut loads = world.resource_mut::<TextureLoads>();
    for (handle, descriptor) in handles.iter().zip(descriptors) {
        if let Some(url) = &descriptor.texture_url {
            loads.request(element_id, url, TextureTarget::Material(handle.clone()));
        }
    }

    handles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color_round_trip() {
        for hex in [0x000000, 0xff0000, 0x00ff00, 0x123456, 0xffffff, 0x888888] {
            assert_eq!(color_to_hex(hex_to_color(hex, 1.0)), hex);
        }
    }

    #[test]
    fn test_material_round_trip() {
        let descriptor = MaterialDescriptor {
            color: 0x3366cc,
            emissive: 0x110000,
            opacity: 0.5,
            transparent: true,
            texture_url: None,
        };
        let material = decode_material(&descriptor);
        assert_eq!(material.alpha_mode, AlphaMode::Blend);
        assert_eq!(encode_material(&material, None), descriptor);
    }

    #[test]
    fn test_unknown_geometry_falls_back_to_box() {
        let unknown = GeometryDescriptor::new(GeometryKind::Unknown).with("width", 3.0);
        let (_, used) = decode_geometry(Some(&unknown));
        assert_eq!(used, GeometryDescriptor::default_box());

        let (_, used) = decode_geometry(None);
        assert_eq!(used, GeometryDescriptor::default_box());
    }

    #[test]
    fn test_low_segment_counts_are_clamped() {
        let cases = [
            GeometryDescriptor::new(GeometryKind::Cylinder).with("radialSegments", 2.0),
            GeometryDescriptor::new(GeometryKind::Cylinder)
                .with("radiusTop", 2.0)
                .with("radiusBottom", 4.0)
                .with("radialSegments", 1.0),
            GeometryDescriptor::new(GeometryKind::Cone).with("radialSegments", 2.0),
            GeometryDescriptor::new(GeometryKind::Sphere)
                .with("widthSegments", 0.5)
                .with("heightSegments", 1.0),
            GeometryDescriptor::new(GeometryKind::Torus)
                .with("radialSegments", 1.0)
                .with("tubularSegments", 0.5),
        ];
        for descriptor in cases {
            let (mesh, used) = decode_geometry(Some(&descriptor));
            assert_eq!(used, descriptor);
            assert!(mesh.count_vertices() > 3, "{:?}", descriptor.kind);
        }
    }

    #[test]
    fn test_known_geometry_keeps_descriptor() {
        let torus = GeometryDescriptor::new(GeometryKind::Torus)
            .with("radius", 8.0)
            .with("tube", 1.0);
        let (mesh, used) = decode_geometry(Some(&torus));
        assert_eq!(used, torus);
        assert!(mesh.count_vertices() > 0);
    }

    #[test]
    fn test_resolve_element_id() {
        assert_eq!(
            resolve_element_id(Some(&ElementId("e1".to_string())), Entity::PLACEHOLDER),
            "e1"
        );
        let generated = resolve_element_id(None, Entity::PLACEHOLDER);
        assert!(generated.starts_with("element_"));
        assert_ne!(generated, resolve_element_id(None, Entity::PLACEHOLDER));

        let mut world = World::new();
        let entity = world.spawn_empty().id();
        assert_eq!(
            resolve_element_id(Some(&ElementId(String::new())), entity),
            format!("entity_{}", entity.to_bits())
        );
    }

    #[test]
    fn test_mesh_without_geometry_fails_to_encode() {
        let mut world = World::new();
        world.init_resource::<Assets<Mesh>>();
        world.init_resource::<Assets<StandardMaterial>>();
        let mesh = world
            .resource_mut::<Assets<Mesh>>()
            .add(Cuboid::default().mesh().build());
        let entity = world.spawn((Transform::default(), Mesh3d(mesh))).id();

        assert!(matches!(
            encode_element(&world, entity),
            Err(HistoryError::Encode { .. })
        ));
    }
}
