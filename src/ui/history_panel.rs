use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};

use crate::editor::Notifications;
use crate::editor::history::{
    EntrySummary, HistoryManager, clear_history, redo, revert_to_initial_state, undo,
};

fn entry_row(ui: &mut egui::Ui, entry: &EntrySummary, weak: bool) {
    ui.horizontal(|ui| {
        let text = egui::RichText::new(&entry.description).size(13.0);
        ui.label(if weak { text.weak() } else { text });
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(
                egui::RichText::new(entry.timestamp.format("%H:%M:%S").to_string())
                    .size(10.0)
                    .weak(),
            );
        });
    })
    .response
    .on_hover_text(format!(
        "{} ({} {})",
        entry.kind.label(),
        entry.element_count,
        if entry.element_count == 1 { "element" } else { "elements" }
    ));
}

/// Right panel listing the undo and redo stacks
pub fn history_panel_ui(
    mut contexts: EguiContexts,
    history: Res<HistoryManager>,
    mut commands: Commands,
) -> Result {
    let summary = history.summary();

    egui::SidePanel::right("history_panel")
        .default_width(240.0)
        .show(contexts.ctx_mut()?, |ui| {
            ui.add_space(4.0);
            ui.label(egui::RichText::new("History").heading().size(18.0));
            ui.add_space(4.0);
            ui.separator();

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(history.can_undo(), egui::Button::new("Undo"))
                    .on_hover_text("Ctrl+Z")
                    .clicked()
                {
                    commands.queue(|world: &mut World| {
                        undo(world);
                    });
                }
                if ui
                    .add_enabled(history.can_redo(), egui::Button::new("Redo"))
                    .on_hover_text("Ctrl+Y")
                    .clicked()
                {
                    commands.queue(|world: &mut World| {
                        redo(world);
                    });
                }
                if ui
                    .add_enabled(
                        history.can_undo() || history.can_redo(),
                        egui::Button::new("Clear"),
                    )
                    .clicked()
                {
                    commands.queue(clear_history);
                }
            });

            if ui
                .add_enabled(
                    history.has_initial_state(),
                    egui::Button::new("Revert to initial state"),
                )
                .clicked()
            {
                commands.queue(|world: &mut World| {
                    revert_to_initial_state(world);
                });
            }

            ui.add_space(8.0);
            ui.label(
                egui::RichText::new(format!(
                    "{} / {} undo steps",
                    summary.undo.len(),
                    history.capacity()
                ))
                .size(11.0)
                .weak(),
            );
            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| {
                if summary.undo.is_empty() && summary.redo.is_empty() {
                    ui.label(egui::RichText::new("No edits yet").weak().italics());
                }
                // Redo entries sit above the current state, oldest on top
                for entry in summary.redo.iter().rev() {
                    entry_row(ui, entry, true);
                }
                if !summary.redo.is_empty() {
                    ui.separator();
                }
                for entry in &summary.undo {
                    entry_row(ui, entry, false);
                }
            });
        });
    Ok(())
}

/// Toasts in the bottom-left corner
pub fn notifications_ui(mut contexts: EguiContexts, notifications: Res<Notifications>) -> Result {
    if notifications.is_empty() {
        return Ok(());
    }

    egui::Area::new(egui::Id::new("notifications"))
        .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(12.0, -12.0))
        .show(contexts.ctx_mut()?, |ui| {
            for notification in notifications.iter() {
                let color = if notification.is_error {
                    egui::Color32::from_rgb(200, 70, 60)
                } else {
                    egui::Color32::from_rgb(60, 130, 80)
                };
                egui::Frame::popup(ui.style())
                    .fill(color)
                    .show(ui, |ui| {
                        ui.label(
                            egui::RichText::new(&notification.message)
                                .color(egui::Color32::WHITE)
                                .size(13.0),
                        );
                    });
                ui.add_space(4.0);
            }
        });
    Ok(())
}
