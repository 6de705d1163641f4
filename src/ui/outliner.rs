use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};

use crate::editor::Selected;
use crate::editor::operations::{
    delete_selected, merge_selected, place_box_building, recolor_selected, separate_selected,
    set_selected_height, texture_selected,
};
use crate::scene::{ElementId, ElementMetadata, FaceKey, SceneGroup};

/// Inputs of the edit section
#[derive(Resource)]
pub struct OutlinerState {
    pub color: [u8; 3],
    pub height: f32,
    pub texture_url: String,
    pub face: FaceKey,
}

impl Default for OutlinerState {
    fn default() -> Self {
        Self {
            color: [0x88, 0x88, 0x88],
            height: 20.0,
            texture_url: String::new(),
            face: FaceKey::All,
        }
    }
}

fn rgb_to_hex(rgb: [u8; 3]) -> u32 {
    (u32::from(rgb[0]) << 16) | (u32::from(rgb[1]) << 8) | u32::from(rgb[2])
}

#[allow(clippy::type_complexity)]
pub fn outliner_ui(
    mut contexts: EguiContexts,
    mut state: ResMut<OutlinerState>,
    mut commands: Commands,
    groups: Query<(&SceneGroup, Option<&Children>)>,
    elements: Query<(&ElementId, &ElementMetadata, Has<Selected>)>,
    keyboard: Res<ButtonInput<KeyCode>>,
) -> Result {
    let additive = keyboard.pressed(KeyCode::ShiftLeft)
        || keyboard.pressed(KeyCode::ShiftRight)
        || keyboard.pressed(KeyCode::ControlLeft)
        || keyboard.pressed(KeyCode::ControlRight);

    let mut sorted_groups: Vec<_> = groups.iter().collect();
    sorted_groups.sort_by_key(|(group, _)| **group);

    let selected_count = elements.iter().filter(|(_, _, selected)| *selected).count();
    let merged_selected = elements
        .iter()
        .any(|(_, metadata, selected)| selected && metadata.is_merged);

    egui::SidePanel::left("outliner")
        .default_width(240.0)
        .show(contexts.ctx_mut()?, |ui| {
            ui.add_space(4.0);
            ui.label(egui::RichText::new("Scene").heading().size(18.0));
            ui.add_space(4.0);
            ui.separator();

            egui::ScrollArea::vertical()
                .max_height(ui.available_height() * 0.55)
                .show(ui, |ui| {
                    for (group, children) in &sorted_groups {
                        let members: Vec<Entity> =
                            children.map(|c| c.to_vec()).unwrap_or_default();
                        egui::CollapsingHeader::new(format!(
                            "{} ({})",
                            group.display_name(),
                            members.len()
                        ))
                        .default_open(true)
                        .show(ui, |ui| {
                            for entity in members {
                                let Ok((id, metadata, selected)) = elements.get(entity) else {
                                    continue;
                                };
                                let label = format!("{} {}", metadata.kind.display_name(), id.as_str());
                                if ui.selectable_label(selected, label).clicked() {
                                    commands.queue(move |world: &mut World| {
                                        toggle_selection(world, entity, additive);
                                    });
                                }
                            }
                        });
                    }
                });

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Add building").clicked() {
                    commands.queue(|world: &mut World| {
                        place_box_building(world);
                    });
                }
                if ui
                    .add_enabled(selected_count > 0, egui::Button::new("Delete"))
                    .on_hover_text("Delete")
                    .clicked()
                {
                    commands.queue(|world: &mut World| {
                        delete_selected(world);
                    });
                }
                if ui
                    .add_enabled(selected_count > 1, egui::Button::new("Merge"))
                    .clicked()
                {
                    commands.queue(|world: &mut World| {
                        merge_selected(world);
                    });
                }
                if ui
                    .add_enabled(merged_selected, egui::Button::new("Separate"))
                    .clicked()
                {
                    commands.queue(|world: &mut World| {
                        separate_selected(world);
                    });
                }
            });

            ui.add_enabled_ui(selected_count > 0, |ui| {
                ui.add_space(6.0);
                ui.label(egui::RichText::new("Color").size(14.0).strong());
                ui.horizontal(|ui| {
                    ui.color_edit_button_srgb(&mut state.color);
                    if ui.button("Apply").clicked() {
                        let hex = rgb_to_hex(state.color);
                        commands.queue(move |world: &mut World| {
                            recolor_selected(world, hex);
                        });
                    }
                });

                ui.add_space(6.0);
                ui.label(egui::RichText::new("Height").size(14.0).strong());
                ui.horizontal(|ui| {
                    ui.add(
                        egui::DragValue::new(&mut state.height)
                            .range(1.0..=500.0)
                            .speed(0.5),
                    );
                    if ui.button("Apply").clicked() {
                        let height = state.height;
                        commands.queue(move |world: &mut World| {
                            set_selected_height(world, height);
                        });
                    }
                });

                ui.add_space(6.0);
                ui.label(egui::RichText::new("Texture").size(14.0).strong());
                ui.text_edit_singleline(&mut state.texture_url)
                    .on_hover_text("URL or file path");
                ui.horizontal(|ui| {
                    let face = &mut state.face;
                    egui::ComboBox::from_id_salt("texture_face")
                        .selected_text(face.display_name())
                        .show_ui(ui, |ui| {
                            for option in FaceKey::SELECTABLE {
                                ui.selectable_value(face, option, option.display_name());
                            }
                        });
                    if ui.button("Apply").clicked() {
                        let url = state.texture_url.clone();
                        let face = state.face;
                        commands.queue(move |world: &mut World| {
                            texture_selected(world, &url, face);
                        });
                    }
                });
            });
        });
    Ok(())
}

/// Select `entity`, replacing the selection unless `additive`
fn toggle_selection(world: &mut World, entity: Entity, additive: bool) {
    if world.get_entity(entity).is_err() {
        return;
    }
    let was_selected = world.get::<Selected>(entity).is_some();
    if !additive {
        let mut selected = world.query_filtered::<Entity, With<Selected>>();
        let others: Vec<Entity> = selected.iter(world).filter(|e| *e != entity).collect();
        for other in others {
            world.entity_mut(other).remove::<Selected>();
        }
    }
    if was_selected {
        world.entity_mut(entity).remove::<Selected>();
    } else {
        world.entity_mut(entity).insert(Selected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_hex() {
        assert_eq!(rgb_to_hex([0xff, 0x00, 0x00]), 0xff0000);
        assert_eq!(rgb_to_hex([0x12, 0x34, 0x56]), 0x123456);
    }

    #[test]
    fn test_toggle_selection() {
        let mut world = World::new();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();

        toggle_selection(&mut world, a, false);
        toggle_selection(&mut world, b, true);
        assert!(world.get::<Selected>(a).is_some());
        assert!(world.get::<Selected>(b).is_some());

        toggle_selection(&mut world, b, false);
        assert!(world.get::<Selected>(a).is_none());
        assert!(world.get::<Selected>(b).is_none());
    }
}
