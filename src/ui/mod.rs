use crate::app::{SelectionChange, SelectionState};
use crate::model::{rgb_components, FurnitureKind, COLOR_CHOICES};

const SWATCH_SIZE: f32 = 28.0;

/// Bottom panel with the furniture list and color swatches.
#[derive(Debug, Default)]
pub struct SelectionPanel;

impl SelectionPanel {
    pub fn new() -> Self {
        Self
    }

    /// Draws the panel; returns the click made this frame, if any.
    pub fn show(&self, ctx: &egui::Context, selection: SelectionState) -> Option<SelectionChange> {
        let mut change = None;
        egui::TopBottomPanel::bottom("selection_panel")
            .resizable(false)
            .show(ctx, |ui| {
                ui.add_space(4.0);
                ui.horizontal(|ui| {
                    for kind in FurnitureKind::ALL {
                        if ui
                            .selectable_label(selection.kind == kind, kind.label())
                            .clicked()
                        {
                            change = Some(SelectionChange::Furniture(kind));
                        }
                    }
                });
                ui.add_space(4.0);
                ui.horizontal(|ui| {
                    for choice in COLOR_CHOICES {
                        let selected = selection.color == choice;
                        let stroke = if selected {
                            egui::Stroke::new(2.0, ui.visuals().selection.stroke.color)
                        } else {
                            egui::Stroke::new(1.0, egui::Color32::GRAY)
                        };
                        let swatch = egui::Button::new("")
                            .fill(swatch_color(choice.rgb))
                            .stroke(stroke)
                            .min_size(egui::vec2(SWATCH_SIZE, SWATCH_SIZE));
                        if ui.add(swatch).on_hover_text(choice.name).clicked() {
                            change = Some(SelectionChange::Color(choice));
                        }
                    }
                });
                ui.add_space(4.0);
            });
        change
    }
}

fn swatch_color(packed: u32) -> egui::Color32 {
    let [r, g, b] = rgb_components(packed);
    egui::Color32::from_rgb(r, g, b)
}
