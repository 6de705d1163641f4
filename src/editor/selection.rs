use bevy::prelude::*;
use bevy_egui::EguiContexts;

use crate::scene::ElementGeometry;

/// Marker for selected elements
#[derive(Component)]
pub struct Selected;

/// Element the transform handle is attached to
#[derive(Resource, Default, Debug)]
pub struct TransformHandle {
    pub attached: Option<Entity>,
}

impl TransformHandle {
    pub fn detach(&mut self) {
        self.attached = None;
    }
}

pub fn selected_entities(world: &mut World) -> Vec<Entity> {
    let mut selected = world.query_filtered::<Entity, With<Selected>>();
    selected.iter(world).collect()
}

/// Deselect everything and detach the transform handle
pub fn clear_selection(world: &mut World) {
    for entity in selected_entities(world) {
        world.entity_mut(entity).remove::<Selected>();
    }
    if let Some(mut handle) = world.get_resource_mut::<TransformHandle>() {
        handle.detach();
    }
}

/// Keep the transform handle on the selected element while exactly one is selected
pub fn follow_selection(
    selected_query: Query<Entity, With<Selected>>,
    mut handle: ResMut<TransformHandle>,
) {
    let attached = selected_query.single().ok();
    if handle.attached != attached {
        handle.attached = attached;
    }
}

pub fn handle_escape_clear_selection(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut commands: Commands,
    mut contexts: EguiContexts,
) {
    // Don't trigger if typing in UI
    if let Ok(ctx) = contexts.ctx_mut()
        && ctx.wants_keyboard_input()
    {
        return;
    }

    if keyboard.just_pressed(KeyCode::Escape) {
        commands.queue(clear_selection);
    }
}

pub fn draw_selection_indicators(
    mut gizmos: Gizmos,
    handle: Res<TransformHandle>,
    selected_query: Query<(Entity, &GlobalTransform, Option<&ElementGeometry>), With<Selected>>,
) {
    for (entity, global, geometry) in selected_query.iter() {
        let size = geometry
            .map(|g| g.0.bounding_size())
            .unwrap_or(Vec3::ONE)
            .max(Vec3::splat(0.1));
        let transform = global.compute_transform();
        let color = if handle.attached == Some(entity) {
            Color::srgb(1.0, 0.6, 0.1)
        } else {
            Color::srgb(0.2, 0.7, 1.0)
        };
        gizmos.cube(transform.with_scale(transform.scale * size), color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_selection_detaches_handle() {
        let mut world = World::new();
        world.init_resource::<TransformHandle>();
        let a = world.spawn(Selected).id();
        let b = world.spawn(Selected).id();
        world.resource_mut::<TransformHandle>().attached = Some(a);

        clear_selection(&mut world);

        assert!(world.get::<Selected>(a).is_none());
        assert!(world.get::<Selected>(b).is_none());
        assert!(world.resource::<TransformHandle>().attached.is_none());
    }
}
