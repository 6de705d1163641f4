mod camera;
pub mod history;
pub mod notifications;
pub mod operations;
pub mod selection;

pub use camera::{EditorCamera, OrbitTarget, RedrawRequest};
pub use history::HistoryManager;
pub use notifications::Notifications;
pub use selection::{Selected, TransformHandle};

use bevy::prelude::*;

use crate::config::ConfigLoaded;

pub struct EditorPlugin;

impl Plugin for EditorPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HistoryManager>()
            .init_resource::<Notifications>()
            .init_resource::<RedrawRequest>()
            .init_resource::<TransformHandle>()
            .add_systems(Startup, camera::spawn_camera)
            .add_systems(
                Startup,
                (
                    history::apply_history_capacity,
                    notifications::announce_config_reset,
                )
                    .after(ConfigLoaded),
            )
            .add_systems(
                Update,
                (camera::camera_orbit, camera::camera_pan, camera::camera_zoom),
            )
            .add_systems(
                Update,
                (
                    history::handle_undo,
                    history::handle_redo,
                    operations::handle_operation_shortcuts,
                    selection::handle_escape_clear_selection,
                    selection::follow_selection,
                    selection::draw_selection_indicators,
                ),
            )
            .add_systems(
                Update,
                (notifications::tick_notifications, camera::request_redraw),
            );
    }
}
