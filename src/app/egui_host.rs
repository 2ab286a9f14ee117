use super::context::{SelectionChange, SelectionState};
use crate::ui::SelectionPanel;
use winit::event::{ElementState, TouchPhase, WindowEvent};
use winit::window::Window;

/// Tessellated egui output ready for the paint pass.
pub struct EguiFrameOutput {
    pub clipped_primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

/// egui context plus the winit glue for the selection panel.
pub struct EguiHost {
    context: egui::Context,
    winit_state: egui_winit::State,
}

impl EguiHost {
    pub fn new(window: &Window) -> Self {
        let context = egui::Context::default();
        let winit_state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        Self {
            context,
            winit_state,
        }
    }

    /// Feeds `event` to egui. Returns true when the viewer's gesture
    /// recognizer should still see it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        let consumed = self.winit_state.on_window_event(window, event).consumed;
        !(consumed && starts_gesture(event))
    }

    /// Runs one panel frame and collects the taps it reported.
    pub fn run_panel(
        &mut self,
        window: &Window,
        panel: &SelectionPanel,
        selection: SelectionState,
    ) -> (EguiFrameOutput, Vec<SelectionChange>) {
        let mut changes = Vec::new();
        let output = self.run_ui(window, |ctx| {
            if let Some(change) = panel.show(ctx, selection) {
                changes.push(change);
            }
        });
        (output, changes)
    }

    fn run_ui<F>(&mut self, window: &Window, run_ui: F) -> EguiFrameOutput
    where
        F: FnMut(&egui::Context),
    {
        let raw_input = self.winit_state.take_egui_input(window);
        let full_output = self.context.run(raw_input, run_ui);
        self.winit_state
            .handle_platform_output(window, full_output.platform_output);
        let pixels_per_point = full_output.pixels_per_point;
        let clipped_primitives = self
            .context
            .tessellate(full_output.shapes, pixels_per_point);
        EguiFrameOutput {
            clipped_primitives,
            textures_delta: full_output.textures_delta,
            pixels_per_point,
        }
    }
}

/// Events the panel may claim. Lifts and releases always reach the
/// recognizer so no finger or button stays down.
fn starts_gesture(event: &WindowEvent) -> bool {
    match event {
        WindowEvent::Touch(touch) => touch.phase == TouchPhase::Started,
        WindowEvent::MouseInput { state, .. } => *state == ElementState::Pressed,
        WindowEvent::MouseWheel { .. } => true,
        _ => false,
    }
}
