//! Bevy systems for undo/redo keyboard shortcuts and history setup.

use bevy::prelude::*;
use bevy_egui::EguiContexts;

use crate::config::EditorConfig;

use super::command_history::HistoryManager;
use super::execute::{redo, undo};

fn modifiers(keyboard: &ButtonInput<KeyCode>) -> (bool, bool) {
    let ctrl = keyboard.pressed(KeyCode::ControlLeft) || keyboard.pressed(KeyCode::ControlRight);
    let shift = keyboard.pressed(KeyCode::ShiftLeft) || keyboard.pressed(KeyCode::ShiftRight);
    (ctrl, shift)
}

fn typing_in_ui(contexts: &mut EguiContexts) -> bool {
    contexts
        .ctx_mut()
        .is_ok_and(|ctx| ctx.wants_keyboard_input())
}

/// System to handle undo keyboard shortcut (Ctrl+Z)
pub fn handle_undo(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut commands: Commands,
    mut contexts: EguiContexts,
) {
    if typing_in_ui(&mut contexts) {
        return;
    }

    let (ctrl, shift) = modifiers(&keyboard);

    // Ctrl+Z (without shift) = undo
    if ctrl && !shift && keyboard.just_pressed(KeyCode::KeyZ) {
        commands.queue(|world: &mut World| {
            undo(world);
        });
    }
}

/// System to handle redo keyboard shortcut (Ctrl+Y or Ctrl+Shift+Z)
pub fn handle_redo(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut commands: Commands,
    mut contexts: EguiContexts,
) {
    if typing_in_ui(&mut contexts) {
        return;
    }

    let (ctrl, shift) = modifiers(&keyboard);

    let redo_pressed = keyboard.just_pressed(KeyCode::KeyY)
        || (shift && keyboard.just_pressed(KeyCode::KeyZ));
    if ctrl && redo_pressed {
        commands.queue(|world: &mut World| {
            redo(world);
        });
    }
}

/// Startup system to size the history from the loaded config
pub fn apply_history_capacity(config: Res<EditorConfig>, mut history: ResMut<HistoryManager>) {
    let capacity = config.data.effective_history_capacity();
    if history.capacity() != capacity {
        info!("History capacity set to {}", capacity);
        history.set_capacity(capacity);
    }
}
