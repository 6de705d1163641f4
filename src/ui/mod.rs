mod history_panel;
mod outliner;

use bevy::prelude::*;
use bevy_egui::EguiPrimaryContextPass;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<outliner::OutlinerState>()
            // Side panels first so the toast area fits between them
            .add_systems(
                EguiPrimaryContextPass,
                (
                    outliner::outliner_ui,
                    history_panel::history_panel_ui,
                    history_panel::notifications_ui,
                )
                    .chain(),
            );
    }
}
