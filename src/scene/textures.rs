//! Asynchronous texture loading for element materials.
//!
//! Every request carries the generation of its element at the time it was
//! queued. Restoring an element bumps the generation, so a load that was
//! started before the restore is dropped instead of overwriting the restored
//! material.

use std::collections::HashMap;
use std::io::Read;
use std::time::Duration;

use bevy::asset::RenderAssetUsages;
use bevy::image::{ImageAddressMode, ImageSampler, ImageSamplerDescriptor};
use bevy::math::Affine2;
use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use futures_lite::future;
use thiserror::Error;

use crate::config::EditorConfig;

use super::components::{ElementMaterials, ElementMetadata, FaceKey};

/// Errors while fetching or decoding a texture
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to read texture: {0}")]
    Io(#[from] std::io::Error),
    #[error("texture request failed: {0}")]
    Http(String),
    #[error("failed to decode texture: {0}")]
    Image(#[from] image::ImageError),
}

/// Where a loaded texture ends up
#[derive(Debug, Clone, PartialEq)]
pub enum TextureTarget {
    /// A single material slot, used when rebuilding recorded materials
    Material(Handle<StandardMaterial>),
    /// Every slot of an element matching a face, used by live texture edits
    Element { entity: Entity, face: FaceKey },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureRequest {
    pub element_id: String,
    pub url: String,
    pub target: TextureTarget,
    pub generation: u64,
}

/// Pending texture requests and per-element generations
#[derive(Resource, Default, Debug)]
pub struct TextureLoads {
    generations: HashMap<String, u64>,
    queued: Vec<TextureRequest>,
    /// Material slot -> (element id, url) of loads not yet applied
    pending_material_urls: HashMap<AssetId<StandardMaterial>, (String, String)>,
}

impl TextureLoads {
    pub fn generation(&self, element_id: &str) -> u64 {
        self.generations.get(element_id).copied().unwrap_or(0)
    }

    /// Invalidate every in-flight load for an element
    pub fn invalidate(&mut self, element_id: &str) -> u64 {
        self.pending_material_urls
            .retain(|_, (owner, _)| owner != element_id);
        let generation = self.generations.entry(element_id.to_string()).or_insert(0);
        *generation += 1;
        *generation
    }

    /// Queue a load tagged with the element's current generation
    pub fn request(&mut self, element_id: &str, url: &str, target: TextureTarget) {
        if let TextureTarget::Material(handle) = &target {
            self.pending_material_urls
                .insert(handle.id(), (element_id.to_string(), url.to_string()));
        }
        self.queued.push(TextureRequest {
            element_id: element_id.to_string(),
            url: url.to_string(),
            target,
            generation: self.generation(element_id),
        });
    }

    pub fn is_current(&self, request: &TextureRequest) -> bool {
        request.generation == self.generation(&request.element_id)
    }

    /// URL still loading into a material slot
    pub fn pending_url(&self, material: AssetId<StandardMaterial>) -> Option<&str> {
        self.pending_material_urls
            .get(&material)
            .map(|(_, url)| url.as_str())
    }

    pub fn queued(&self) -> &[TextureRequest] {
        &self.queued
    }

    pub fn take_queued(&mut self) -> Vec<TextureRequest> {
        std::mem::take(&mut self.queued)
    }

    /// Forget the pending URL of a finished or failed request
    pub fn finish(&mut self, request: &TextureRequest) {
        if let TextureTarget::Material(handle) = &request.target
            && self
                .pending_material_urls
                .get(&handle.id())
                .is_some_and(|(_, url)| *url == request.url)
        {
            self.pending_material_urls.remove(&handle.id());
        }
    }
}

/// Source URL of every image loaded through [`TextureLoads`]
#[derive(Resource, Default, Debug)]
pub struct TextureSources {
    urls: HashMap<AssetId<Image>, String>,
}

impl TextureSources {
    pub fn register(&mut self, image: AssetId<Image>, url: String) {
        self.urls.insert(image, url);
    }

    pub fn url_for(&self, image: AssetId<Image>) -> Option<&str> {
        self.urls.get(&image).map(String::as_str)
    }
}

/// Component for an in-flight texture fetch
#[derive(Component)]
pub struct TextureLoadTask {
    pub request: TextureRequest,
    pub task: Task<Result<Image, TextureError>>,
}

/// Sampler for element textures: repeat wrapping, linear filtering
pub fn repeat_sampler() -> ImageSampler {
    ImageSampler::Descriptor(ImageSamplerDescriptor {
        address_mode_u: ImageAddressMode::Repeat,
        address_mode_v: ImageAddressMode::Repeat,
        ..ImageSamplerDescriptor::linear()
    })
}

/// Fetch and decode a texture from an http(s) URL or a local path
pub fn fetch_texture(location: &str, timeout: Duration) -> Result<Image, TextureError> {
    let bytes = if location.starts_with("http://") || location.starts_with("https://") {
        let response = ureq::get(location)
            .timeout(timeout)
            .set("User-Agent", "mapforge-texture-loader")
            .call()
            .map_err(|e| TextureError::Http(e.to_string()))?;
        let mut bytes = Vec::new();
        response.into_reader().read_to_end(&mut bytes)?;
        bytes
    } else {
        std::fs::read(location.strip_prefix("file://").unwrap_or(location))?
    };

    let dynamic = image::load_from_memory(&bytes)?;
    let mut image = Image::from_dynamic(dynamic, true, RenderAssetUsages::default());
    image.sampler = repeat_sampler();
    Ok(image)
}

/// System to start a fetch task for every queued request
pub fn spawn_texture_fetches(
    mut commands: Commands,
    mut loads: ResMut<TextureLoads>,
    config: Res<EditorConfig>,
) {
    if loads.queued().is_empty() {
        return;
    }

    let task_pool = AsyncComputeTaskPool::get();
    let timeout = Duration::from_secs(config.data.texture_fetch_timeout_secs);

    for request in loads.take_queued() {
        let location = config.data.resolve_texture_url(&request.url);
        debug!("Fetching texture {} for {}", location, request.element_id);
        let task = task_pool.spawn(async move { fetch_texture(&location, timeout) });
        commands.spawn(TextureLoadTask { request, task });
    }
}

/// Exclusive system to apply finished texture fetches
pub fn poll_texture_loads(world: &mut World) {
    let mut finished = Vec::new();
    let mut tasks = world.query::<(Entity, &mut TextureLoadTask)>();
    for (entity, mut load) in tasks.iter_mut(world) {
        if let Some(result) = future::block_on(future::poll_once(&mut load.task)) {
            finished.push((entity, load.request.clone(), result));
        }
    }

    for (entity, request, result) in finished {
        world.despawn(entity);
        match result {
            Ok(image) => {
                apply_fetched_texture(world, &request, image);
            }
            Err(e) => warn!("Texture {} for {} failed: {}", request.url, request.element_id, e),
        }
        world.resource_mut::<TextureLoads>().finish(&request);
    }
}

/// Attach a fetched image to its target, unless the element was restored
/// since the request was queued. Returns whether the image was applied.
pub fn apply_fetched_texture(world: &mut World, request: &TextureRequest, image: Image) -> bool {
    if !world.resource::<TextureLoads>().is_current(request) {
        debug!(
            "Discarding stale texture {} for {}",
            request.url, request.element_id
        );
        return false;
    }

    let image = world.resource_mut::<Assets<Image>>().add(image);
    world
        .resource_mut::<TextureSources>()
        .register(image.id(), request.url.clone());

    match &request.target {
        TextureTarget::Material(material) => attach_texture(world, material, &image),
        TextureTarget::Element { entity, face } => {
            let Some(slots) = world.get::<ElementMaterials>(*entity).map(|m| m.0.clone()) else {
                return false;
            };
            let count = slots.len();
            let mut applied = false;
            for (index, slot) in slots.iter().enumerate() {
                if face.applies_to_slot(index, count) {
                    applied |= attach_texture(world, slot, &image);
                }
            }
            if applied && let Some(mut metadata) = world.get_mut::<ElementMetadata>(*entity) {
                metadata
                    .modifications
                    .textures
                    .insert(*face, request.url.clone());
            }
            applied
        }
    }
}

fn attach_texture(
    world: &mut World,
    material: &Handle<StandardMaterial>,
    image: &Handle<Image>,
) -> bool {
    let mut materials = world.resource_mut::<Assets<StandardMaterial>>();
    let Some(material) = materials.get_mut(material) else {
        return false;
    };
    material.base_color_texture = Some(image.clone());
    material.uv_transform = Affine2::IDENTITY;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_image() -> Image {
        Image::default()
    }

    fn world_with_material() -> (World, Handle<StandardMaterial>) {
        let mut world = World::new();
        world.init_resource::<Assets<StandardMaterial>>();
        world.init_resource::<Assets<Image>>();
        world.init_resource::<TextureLoads>();
        world.init_resource::<TextureSources>();
        let material = world
            .resource_mut::<Assets<StandardMaterial>>()
            .add(StandardMaterial::default());
        (world, material)
    }

    #[test]
    fn test_request_uses_current_generation() {
        let mut loads = TextureLoads::default();
        loads.invalidate("e1");
        loads.request("e1", "brick.png", TextureTarget::Material(Handle::default()));
        assert_eq!(loads.queued()[0].generation, 1);
        assert!(loads.is_current(&loads.queued()[0].clone()));

        loads.invalidate("e1");
        assert!(!loads.is_current(&loads.queued()[0].clone()));
    }

    #[test]
    fn test_invalidate_forgets_pending_urls() {
        let mut world = World::new();
        world.init_resource::<Assets<StandardMaterial>>();
        let material = world
            .resource_mut::<Assets<StandardMaterial>>()
            .add(StandardMaterial::default());

        let mut loads = TextureLoads::default();
        loads.request("e1", "brick.png", TextureTarget::Material(material.clone()));
        assert_eq!(loads.pending_url(material.id()), Some("brick.png"));

        loads.invalidate("e2");
        assert_eq!(loads.pending_url(material.id()), Some("brick.png"));
        loads.invalidate("e1");
        assert!(loads.pending_url(material.id()).is_none());
    }

    #[test]
    fn test_fresh_texture_is_applied() {
        let (mut world, material) = world_with_material();
        world.resource_mut::<TextureLoads>().request(
            "e1",
            "brick.png",
            TextureTarget::Material(material.clone()),
        );
        let request = world.resource_mut::<TextureLoads>().take_queued().remove(0);
        assert_eq!(
            world.resource::<TextureLoads>().pending_url(material.id()),
            Some("brick.png")
        );

        assert!(apply_fetched_texture(&mut world, &request, blank_image()));
        world.resource_mut::<TextureLoads>().finish(&request);

        let materials = world.resource::<Assets<StandardMaterial>>();
        let texture = materials
            .get(&material)
            .and_then(|m| m.base_color_texture.clone())
            .unwrap();
        assert_eq!(
            world.resource::<TextureSources>().url_for(texture.id()),
            Some("brick.png")
        );
        assert!(world.resource::<TextureLoads>().pending_url(material.id()).is_none());
    }

    #[test]
    fn test_stale_texture_is_discarded() {
        let (mut world, material) = world_with_material();
        world.resource_mut::<TextureLoads>().request(
            "e1",
            "old.png",
            TextureTarget::Material(material.clone()),
        );
        let request = world.resource_mut::<TextureLoads>().take_queued().remove(0);

        world.resource_mut::<TextureLoads>().invalidate("e1");

        assert!(!apply_fetched_texture(&mut world, &request, blank_image()));
        let materials = world.resource::<Assets<StandardMaterial>>();
        assert!(materials.get(&material).unwrap().base_color_texture.is_none());
    }

    #[test]
    fn test_face_texture_updates_matching_slots() {
        let (mut world, _) = world_with_material();
        let slots: Vec<Handle<StandardMaterial>> = (0..6)
            .map(|_| {
                world
                    .resource_mut::<Assets<StandardMaterial>>()
                    .add(StandardMaterial::default())
            })
            .collect();
        let entity = world
            .spawn((ElementMaterials(slots.clone()), ElementMetadata::default()))
            .id();

        world.resource_mut::<TextureLoads>().request(
            "e1",
            "roof.png",
            TextureTarget::Element {
                entity,
                face: FaceKey::Top,
            },
        );
        let request = world.resource_mut::<TextureLoads>().take_queued().remove(0);
        assert!(apply_fetched_texture(&mut world, &request, blank_image()));

        let materials = world.resource::<Assets<StandardMaterial>>();
        let textured: Vec<bool> = slots
            .iter()
            .map(|slot| materials.get(slot).unwrap().base_color_texture.is_some())
            .collect();
        assert_eq!(textured, vec![false, true, false, false, false, false]);

        let metadata = world.get::<ElementMetadata>(entity).unwrap();
        assert_eq!(
            metadata.modifications.textures.get(&FaceKey::Top).map(String::as_str),
            Some("roof.png")
        );
    }
}
