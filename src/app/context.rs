use crate::model::{self, ColorChoice, FurnitureKind, COLOR_CHOICES};
use crate::scene::SceneManager;
use crate::transform::{GestureEvent, TransformController};

/// Current furniture and color picked in the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionState {
    pub kind: FurnitureKind,
    pub color: ColorChoice,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            kind: FurnitureKind::ALL[0],
            color: COLOR_CHOICES[0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Furniture(FurnitureKind),
    Color(ColorChoice),
}

/// Owns everything gesture handlers, selection callbacks and the render
/// tick touch.
#[derive(Debug, Default)]
pub struct ViewerContext {
    scene: SceneManager,
    controller: TransformController,
    selection: SelectionState,
    minimized: bool,
}

impl ViewerContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scene(&self) -> &SceneManager {
        &self.scene
    }

    pub fn selection(&self) -> SelectionState {
        self.selection
    }

    /// Prepares the scene for a new drawable surface and attaches the
    /// current selection.
    pub fn surface_ready(&mut self, width: u32, height: u32) {
        let first_time = !self.scene.is_initialized();
        self.minimized = false;
        self.scene.initialize(width, height);
        if first_time {
            self.controller.sync_camera(&mut self.scene);
        }
        if first_time || self.scene.model().is_none() {
            self.rebuild();
        }
    }

    /// A zero-sized window is minimized; the camera keeps its last aspect.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.minimized = width == 0 || height == 0;
        if !self.minimized {
            self.scene.resize(width, height);
        }
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    pub fn surface_lost(&mut self) {
        self.scene.teardown();
    }

    pub fn handle_gesture(&mut self, event: GestureEvent) {
        self.controller.handle(&mut self.scene, event);
    }

    pub fn apply(&mut self, change: SelectionChange) {
        match change {
            SelectionChange::Furniture(kind) => self.on_furniture_selected(kind),
            SelectionChange::Color(color) => self.on_color_selected(color),
        }
    }

    pub fn on_furniture_selected(&mut self, kind: FurnitureKind) {
        if self.selection.kind == kind {
            return;
        }
        log::info!("Selected {}", kind.label());
        self.selection.kind = kind;
        self.rebuild();
    }

    pub fn on_color_selected(&mut self, color: ColorChoice) {
        if self.selection.color == color {
            return;
        }
        log::info!("Selected color {}", color.name);
        self.selection.color = color;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let graph = model::build(self.selection.kind, self.selection.color);
        if self.scene.replace_model(graph) {
            self.controller.sync_model(&mut self.scene);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;
    use glam::Vec2;

    fn ready() -> ViewerContext {
        let mut viewer = ViewerContext::new();
        viewer.surface_ready(800, 600);
        viewer
    }

    fn generation(viewer: &ViewerContext) -> u64 {
        viewer.scene().scene().map(Scene::model_generation).unwrap_or(0)
    }

    #[test]
    fn startup_shows_a_white_chair_at_rest() {
        let viewer = ready();
        let model = viewer.scene().model().expect("model attached");
        assert_eq!(model.name(), "chair");
        assert_eq!(model.materials()[0].color, 0xFFFFFF);
        assert_eq!(model.transform().rotation, glam::Vec3::ZERO);
        assert_eq!(viewer.scene().camera().map(|c| c.distance()), Some(3.0));
    }

    #[test]
    fn selection_change_keeps_rotation_and_zoom() {
        let mut viewer = ready();
        viewer.handle_gesture(GestureEvent::PanChanged {
            translation: Vec2::new(40.0, 10.0),
        });
        viewer.handle_gesture(GestureEvent::PanEnded);
        viewer.handle_gesture(GestureEvent::PinchBegan);
        viewer.handle_gesture(GestureEvent::PinchChanged { scale: 1.5 });
        viewer.handle_gesture(GestureEvent::PinchEnded);

        viewer.on_furniture_selected(FurnitureKind::Table);
        let model = viewer.scene().model().expect("model");
        assert_eq!(model.name(), "table");
        assert!((model.transform().rotation.x - 0.1).abs() < 1e-6);
        assert!((model.transform().rotation.y - 0.4).abs() < 1e-6);
        let distance = viewer.scene().camera().map(|c| c.distance()).unwrap_or_default();
        assert!((distance - 2.0).abs() < 1e-6);
    }

    #[test]
    fn color_change_rebuilds_with_the_new_color() {
        let mut viewer = ready();
        let oak = model::ColorChoice::by_name("Oak").expect("oak");
        viewer.apply(SelectionChange::Color(oak));
        let model = viewer.scene().model().expect("model");
        assert_eq!(model.name(), "chair");
        assert_eq!(model.materials()[0].color, oak.rgb);
        assert_eq!(viewer.selection().color, oak);
    }

    #[test]
    fn reselecting_the_current_value_does_not_rebuild() {
        let mut viewer = ready();
        let before = generation(&viewer);
        viewer.on_furniture_selected(FurnitureKind::Chair);
        viewer.on_color_selected(COLOR_CHOICES[0]);
        assert_eq!(generation(&viewer), before);

        viewer.on_furniture_selected(FurnitureKind::Lamp);
        assert_eq!(generation(&viewer), before + 1);
    }

    #[test]
    fn selection_before_surface_is_remembered() {
        let mut viewer = ViewerContext::new();
        viewer.on_furniture_selected(FurnitureKind::Lamp);
        assert!(viewer.scene().model().is_none());

        viewer.surface_ready(640, 480);
        assert_eq!(viewer.scene().model().map(|m| m.name()), Some("lamp"));
    }

    #[test]
    fn table_then_blue_shows_one_blue_table() {
        let mut viewer = ready();
        let blue = COLOR_CHOICES[4];
        assert_eq!(blue.name, "Blue");
        viewer.apply(SelectionChange::Furniture(FurnitureKind::Table));
        viewer.apply(SelectionChange::Color(blue));

        let model = viewer.scene().model().expect("model");
        assert_eq!(model.name(), "table");
        assert_eq!(model.meshes().len(), 5);
        assert_eq!(model.materials().len(), 1);
        assert_eq!(model.materials()[0].color, 0x2F6FDB);
        assert_eq!(generation(&viewer), 3);
    }

    #[test]
    fn surface_cycle_rebuilds_once() {
        let mut viewer = ready();
        viewer.handle_gesture(GestureEvent::PanChanged {
            translation: Vec2::new(40.0, 0.0),
        });
        viewer.handle_gesture(GestureEvent::PanEnded);
        viewer.handle_gesture(GestureEvent::PinchBegan);
        viewer.handle_gesture(GestureEvent::PinchChanged { scale: 1.5 });
        viewer.handle_gesture(GestureEvent::PinchEnded);
        viewer.surface_ready(1024, 768);
        assert_eq!(generation(&viewer), 1);

        viewer.surface_lost();
        assert!(viewer.scene().model().is_none());
        viewer.surface_ready(800, 600);
        let model = viewer.scene().model().expect("model");
        assert_eq!(model.name(), "chair");
        assert!((model.transform().rotation.y - 0.4).abs() < 1e-6);
        let distance = viewer.scene().camera().map(|c| c.distance()).unwrap_or_default();
        assert!((distance - 2.0).abs() < 1e-6);
    }

    #[test]
    fn minimizing_keeps_the_camera_aspect() {
        let mut viewer = ready();
        viewer.resize(0, 0);
        assert!(viewer.is_minimized());
        let aspect = viewer.scene().camera().map(|c| c.aspect).unwrap_or_default();
        assert!((aspect - 800.0 / 600.0).abs() < 1e-6);

        viewer.resize(800, 400);
        assert!(!viewer.is_minimized());
        let aspect = viewer.scene().camera().map(|c| c.aspect).unwrap_or_default();
        assert!((aspect - 2.0).abs() < 1e-6);
    }
}
