//! The editable scene: two top-level groups of elements, lookups over them,
//! direct edits and asynchronous texture loading.

mod components;
mod edits;
mod lookup;
mod setup;
mod textures;

pub use components::{
    ElementGeometry, ElementId, ElementKind, ElementMaterials, ElementMetadata, FaceKey,
    Modifications, SceneGroup, SceneGroups,
};
pub use edits::{
    applied_textures, apply_texture_to_element, element_id_of, invalidate_textures,
    restore_slot_colors, restore_slot_textures, set_applied_textures, set_element_color,
    slot_colors, slot_texture_urls,
};
pub use lookup::{ElementIndex, children_of, descendants, find_element, group_of, group_root};
pub use textures::{
    TextureError, TextureLoads, TextureRequest, TextureSources, TextureTarget,
    apply_fetched_texture,
};

use bevy::prelude::*;

use crate::config::ConfigLoaded;

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TextureLoads>()
            .init_resource::<TextureSources>()
            .add_systems(
                Startup,
                (
                    setup::spawn_scene_groups,
                    setup::spawn_lighting,
                    setup::load_demo_scene,
                )
                    .chain()
                    .after(ConfigLoaded),
            )
            .add_systems(
                Update,
                (textures::spawn_texture_fetches, textures::poll_texture_loads).chain(),
            );
    }
}
