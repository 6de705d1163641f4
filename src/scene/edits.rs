//! Direct mutations of live elements.
//!
//! These functions change the scene without recording history; callers in
//! `editor::operations` record the change, and undo/redo call them to replay.

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::editor::history::codec::{color_to_hex, hex_to_color, resolve_element_id, slot_texture_url};

use super::components::{ElementId, ElementMaterials, ElementMetadata, FaceKey};
use super::lookup::descendants;
use super::textures::{TextureLoads, TextureTarget};

/// Id used for an entity in history records and texture generations
pub fn element_id_of(world: &World, entity: Entity) -> String {
    resolve_element_id(world.get::<ElementId>(entity), entity)
}

/// Every material slot of an element and its descendants with the entity owning it
fn slot_owners(world: &World, entity: Entity) -> Vec<(Entity, Handle<StandardMaterial>)> {
    descendants(world, entity)
        .into_iter()
        .filter_map(|e| world.get::<ElementMaterials>(e).map(|slots| (e, slots)))
        .flat_map(|(e, slots)| slots.0.iter().cloned().map(move |slot| (e, slot)))
        .collect()
}

fn set_rgb(material: &mut StandardMaterial, hex: u32) {
    let alpha = material.base_color.to_srgba().alpha;
    material.base_color = hex_to_color(hex, alpha);
}

fn set_color_override(world: &mut World, entity: Entity, color: Option<u32>) {
    for e in descendants(world, entity) {
        if let Some(mut metadata) = world.get_mut::<ElementMetadata>(e) {
            metadata.modifications.color = color;
        }
    }
}

/// Current base color of every material slot, in traversal order
pub fn slot_colors(world: &World, entity: Entity) -> Vec<u32> {
    let materials = world.resource::<Assets<StandardMaterial>>();
    slot_owners(world, entity)
        .iter()
        .filter_map(|(_, slot)| materials.get(slot))
        .map(|material| color_to_hex(material.base_color))
        .collect()
}

/// Recolor every slot of an element and record the override in its metadata
pub fn set_element_color(world: &mut World, entity: Entity, hex: u32) -> bool {
    let slots = slot_owners(world, entity);
    if slots.is_empty() {
        return false;
    }

    {
        let mut materials = world.resource_mut::<Assets<StandardMaterial>>();
        for (_, slot) in &slots {
            if let Some(material) = materials.get_mut(slot) {
                set_rgb(material, hex);
            }
        }
    }
    set_color_override(world, entity, Some(hex));
    true
}

/// Put back per-slot colors read earlier with [`slot_colors`]
pub fn restore_slot_colors(
    world: &mut World,
    entity: Entity,
    applied: Option<u32>,
    colors: &[u32],
) -> bool {
    let slots = slot_owners(world, entity);
    if slots.len() != colors.len() {
        warn!(
            "Element {} has {} material slots, recorded {}",
            element_id_of(world, entity),
            slots.len(),
            colors.len()
        );
    }

    {
        let mut materials = world.resource_mut::<Assets<StandardMaterial>>();
        for ((_, slot), color) in slots.iter().zip(colors) {
            if let Some(material) = materials.get_mut(slot) {
                set_rgb(material, *color);
            }
        }
    }
    set_color_override(world, entity, applied);
    !slots.is_empty()
}

/// Texture URL of every material slot, in traversal order
pub fn slot_texture_urls(world: &World, entity: Entity) -> Vec<Option<String>> {
    slot_owners(world, entity)
        .iter()
        .map(|(_, slot)| slot_texture_url(world, slot))
        .collect()
}

/// Per-face texture URLs the user applied to an element
pub fn applied_textures(world: &World, entity: Entity) -> BTreeMap<FaceKey, String> {
    world
        .get::<ElementMetadata>(entity)
        .map(|metadata| metadata.modifications.textures.clone())
        .unwrap_or_default()
}

/// Drop in-flight texture loads for an element and its descendants
pub fn invalidate_textures(world: &mut World, entity: Entity) {
    let ids: Vec<String> = descendants(world, entity)
        .into_iter()
        .map(|e| element_id_of(world, e))
        .collect();
    let mut loads = world.resource_mut::<TextureLoads>();
    for id in ids {
        loads.invalidate(&id);
    }
}

/// Queue a texture for one face of every mesh in an element.
/// Returns how many meshes the texture was queued for.
pub fn apply_texture_to_element(world: &mut World, entity: Entity, url: &str, face: FaceKey) -> usize {
    let meshes: Vec<(Entity, String)> = descendants(world, entity)
        .into_iter()
        .filter(|e| world.get::<ElementMaterials>(*e).is_some())
        .map(|e| (e, element_id_of(world, e)))
        .collect();

    let mut loads = world.resource_mut::<TextureLoads>();
    for (mesh, id) in &meshes {
        loads.request(id, url, TextureTarget::Element { entity: *mesh, face });
    }
    meshes.len()
}

/// Bring every slot's texture back to the recorded URL: clear slots recorded
/// without one, reload slots whose URL differs.
pub fn restore_slot_textures(world: &mut World, entity: Entity, urls: &[Option<String>]) {
    let slots = slot_owners(world, entity);
    for ((owner, slot), url) in slots.iter().zip(urls) {
        let current = slot_texture_url(world, slot);
        if current == *url {
            continue;
        }
        match url {
            Some(url) => {
                let id = element_id_of(world, *owner);
                world.resource_mut::<TextureLoads>().request(
                    &id,
                    url,
                    TextureTarget::Material(slot.clone()),
                );
            }
            None => {
                let mut materials = world.resource_mut::<Assets<StandardMaterial>>();
                if let Some(material) = materials.get_mut(slot) {
                    material.base_color_texture = None;
                }
            }
        }
    }
}

/// Replace the per-face texture map in an element's metadata
pub fn set_applied_textures(world: &mut World, entity: Entity, textures: BTreeMap<FaceKey, String>) {
    if let Some(mut metadata) = world.get_mut::<ElementMetadata>(entity) {
        metadata.modifications.textures = textures;
    }
}
