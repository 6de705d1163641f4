//! Reading scene state into history records.

use std::collections::BTreeMap;

use bevy::prelude::*;
use chrono::Local;

use crate::scene::{
    ElementIndex, ElementMetadata, SceneGroup, applied_textures, children_of, group_root,
    slot_colors, slot_texture_urls,
};

use super::codec::encode_element;
use super::data_types::{ColorState, ElementRecord, SceneSnapshot, TextureState};

fn encode_or_skip(world: &World, entity: Entity) -> Option<ElementRecord> {
    match encode_element(world, entity) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Leaving element out of capture: {}", e);
            None
        }
    }
}

/// Capture every element under both top-level groups
pub fn capture_full(world: &World) -> SceneSnapshot {
    let mut groups = BTreeMap::new();
    for group in SceneGroup::ALL {
        let records = group_root(world, group)
            .map(|root| {
                children_of(world, root)
                    .into_iter()
                    .filter_map(|child| encode_or_skip(world, child))
                    .collect()
            })
            .unwrap_or_default();
        groups.insert(group, records);
    }

    SceneSnapshot {
        groups,
        timestamp: Local::now(),
    }
}

/// Capture only the given elements
pub fn capture_partial(world: &World, entities: &[Entity]) -> Vec<ElementRecord> {
    entities
        .iter()
        .filter(|entity| world.get_entity(**entity).is_ok())
        .filter_map(|entity| encode_or_skip(world, *entity))
        .collect()
}

/// Capture the elements that are currently live under the given ids
pub fn capture_by_ids<'a>(world: &World, ids: impl IntoIterator<Item = &'a str>) -> Vec<ElementRecord> {
    let index = ElementIndex::build(world);
    ids.into_iter()
        .filter_map(|id| {
            let entity = index.get(id);
            if entity.is_none() {
                debug!("Element {} is not live, not captured", id);
            }
            entity
        })
        .filter_map(|entity| encode_or_skip(world, entity))
        .collect()
}

/// Current colors of the given elements
pub fn capture_colors<'a>(world: &World, ids: impl IntoIterator<Item = &'a str>) -> Vec<ColorState> {
    let index = ElementIndex::build(world);
    ids.into_iter()
        .filter_map(|id| index.get(id).map(|entity| (id, entity)))
        .map(|(id, entity)| ColorState {
            element_id: id.to_string(),
            applied: world
                .get::<ElementMetadata>(entity)
                .and_then(|metadata| metadata.modifications.color),
            slot_colors: slot_colors(world, entity),
        })
        .collect()
}

/// Current textures of the given elements
pub fn capture_textures<'a>(world: &World, ids: impl IntoIterator<Item = &'a str>) -> Vec<TextureState> {
    let index = ElementIndex::build(world);
    ids.into_iter()
        .filter_map(|id| index.get(id).map(|entity| (id, entity)))
        .map(|(id, entity)| TextureState {
            element_id: id.to_string(),
            applied: applied_textures(world, entity),
            slot_urls: slot_texture_urls(world, entity),
        })
        .collect()
}
