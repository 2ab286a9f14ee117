//! Maps pan and pinch gestures onto model rotation and camera distance.

use crate::scene::{SceneManager, HOME_POSITION};
use glam::Vec2;

/// Radians of rotation per logical pixel of pan.
pub const ROTATION_SENSITIVITY: f32 = 0.01;
pub const MIN_DISTANCE: f32 = 1.5;
pub const MAX_DISTANCE: f32 = 5.0;

/// Continuous gesture samples, as produced by the input layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    /// Translation in logical pixels since the pan began.
    PanChanged { translation: Vec2 },
    PanEnded,
    PinchBegan,
    /// Scale relative to the finger spread when the pinch began.
    PinchChanged { scale: f32 },
    PinchEnded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformController {
    orientation: Vec2,
    last_pan: Vec2,
    anchor_distance: f32,
}

impl Default for TransformController {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformController {
    pub fn new() -> Self {
        Self {
            orientation: Vec2::ZERO,
            last_pan: Vec2::ZERO,
            anchor_distance: HOME_POSITION.z,
        }
    }

    /// Accumulated (x, y) rotation in radians.
    #[cfg(test)]
    pub fn orientation(&self) -> Vec2 {
        self.orientation
    }

    #[cfg(test)]
    pub fn last_pan(&self) -> Vec2 {
        self.last_pan
    }

    #[cfg(test)]
    pub fn anchor_distance(&self) -> f32 {
        self.anchor_distance
    }

    pub fn handle(&mut self, scene: &mut SceneManager, event: GestureEvent) {
        match event {
            GestureEvent::PanChanged { translation } => self.pan_update(scene, translation),
            GestureEvent::PanEnded => self.pan_end(scene),
            GestureEvent::PinchBegan => self.pinch_start(scene),
            GestureEvent::PinchChanged { scale } => self.pinch_update(scene, scale),
            GestureEvent::PinchEnded => self.pinch_end(scene),
        }
    }

    pub fn pan_update(&mut self, scene: &mut SceneManager, translation: Vec2) {
        let Some(model) = scene.model_mut() else {
            return;
        };
        let delta = translation - self.last_pan;
        self.orientation.x += delta.y * ROTATION_SENSITIVITY;
        self.orientation.y += delta.x * ROTATION_SENSITIVITY;

        let rotation = &mut model.transform_mut().rotation;
        rotation.x = self.orientation.x;
        rotation.y = self.orientation.y;

        self.last_pan = translation;
    }

    pub fn pan_end(&mut self, scene: &mut SceneManager) {
        if let Some(model) = scene.model() {
            let rotation = model.transform().rotation;
            self.orientation = Vec2::new(rotation.x, rotation.y);
        }
        self.last_pan = Vec2::ZERO;
    }

    pub fn pinch_start(&mut self, scene: &mut SceneManager) {
        if let Some(camera) = scene.camera() {
            self.anchor_distance = camera.distance();
        }
    }

    pub fn pinch_update(&mut self, scene: &mut SceneManager, scale: f32) {
        if !scale.is_finite() || scale <= 0.0 {
            log::debug!("Ignoring pinch scale {}", scale);
            return;
        }
        let Some(camera) = scene.camera_mut() else {
            return;
        };
        camera.set_distance(clamp_distance(self.anchor_distance / scale));
    }

    pub fn pinch_end(&mut self, scene: &mut SceneManager) {
        if let Some(camera) = scene.camera() {
            self.anchor_distance = camera.distance();
        }
    }

    /// Re-applies the stored orientation after a model swap.
    pub fn sync_model(&self, scene: &mut SceneManager) {
        if let Some(model) = scene.model_mut() {
            let rotation = &mut model.transform_mut().rotation;
            rotation.x = self.orientation.x;
            rotation.y = self.orientation.y;
        }
    }

    /// Puts a freshly built camera back at the last settled zoom distance.
    pub fn sync_camera(&self, scene: &mut SceneManager) {
        if let Some(camera) = scene.camera_mut() {
            camera.set_distance(self.anchor_distance);
        }
    }
}

fn clamp_distance(distance: f32) -> f32 {
    distance.clamp(MIN_DISTANCE, MAX_DISTANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{self, FurnitureKind, COLOR_CHOICES};

    fn ready_scene() -> SceneManager {
        let mut scene = SceneManager::default();
        scene.initialize(800, 600);
        scene.replace_model(model::build(FurnitureKind::Chair, COLOR_CHOICES[0]));
        scene
    }

    fn rotation(scene: &SceneManager) -> Vec2 {
        let r = scene.model().expect("model").transform().rotation;
        Vec2::new(r.x, r.y)
    }

    fn distance(scene: &SceneManager) -> f32 {
        scene.camera().expect("camera").distance()
    }

    #[test]
    fn pan_deltas_accumulate_linearly() {
        let mut scene = ready_scene();
        let mut controller = TransformController::new();
        controller.pan_update(&mut scene, Vec2::new(3.0, 0.0));
        controller.pan_update(&mut scene, Vec2::new(5.0, 0.0));
        controller.pan_end(&mut scene);

        let mut single = ready_scene();
        let mut reference = TransformController::new();
        reference.pan_update(&mut single, Vec2::new(5.0, 0.0));
        reference.pan_end(&mut single);

        assert!((rotation(&scene) - rotation(&single)).length() < 1e-6);
        assert!((rotation(&scene).y - 0.05).abs() < 1e-6);
        assert_eq!(rotation(&scene).x, 0.0);
    }

    #[test]
    fn vertical_pan_tilts_about_x() {
        let mut scene = ready_scene();
        let mut controller = TransformController::new();
        controller.pan_update(&mut scene, Vec2::new(0.0, 20.0));
        assert!((rotation(&scene).x - 0.2).abs() < 1e-6);
        assert_eq!(rotation(&scene).y, 0.0);
    }

    #[test]
    fn pan_end_resets_last_sample_but_keeps_orientation() {
        let mut scene = ready_scene();
        let mut controller = TransformController::new();
        controller.pan_update(&mut scene, Vec2::new(10.0, 10.0));
        controller.pan_end(&mut scene);
        assert_eq!(controller.last_pan(), Vec2::ZERO);

        // A new gesture starts from zero translation; the first sample is its own delta.
        controller.pan_update(&mut scene, Vec2::new(10.0, 0.0));
        assert!((rotation(&scene) - Vec2::new(0.1, 0.2)).length() < 1e-6);
        assert_eq!(controller.orientation(), rotation(&scene));
    }

    #[test]
    fn pinch_is_anchor_relative_and_clamped() {
        let mut scene = ready_scene();
        let mut controller = TransformController::new();
        controller.pinch_start(&mut scene);
        controller.pinch_update(&mut scene, 1.5);
        assert!((distance(&scene) - 2.0).abs() < 1e-6);
        controller.pinch_update(&mut scene, 10.0);
        assert_eq!(distance(&scene), MIN_DISTANCE);
        controller.pinch_update(&mut scene, 0.1);
        assert_eq!(distance(&scene), MAX_DISTANCE);
        controller.pinch_end(&mut scene);
        assert_eq!(controller.anchor_distance(), MAX_DISTANCE);
    }

    #[test]
    fn unit_scale_leaves_distance_unchanged() {
        let mut scene = ready_scene();
        let mut controller = TransformController::new();
        controller.pinch_start(&mut scene);
        controller.pinch_update(&mut scene, 1.0);
        assert_eq!(distance(&scene), 3.0);
        controller.pinch_end(&mut scene);
        assert_eq!(controller.anchor_distance(), 3.0);
    }

    #[test]
    fn doubling_from_home_lands_on_the_near_limit() {
        let mut scene = ready_scene();
        let mut controller = TransformController::new();
        controller.pinch_start(&mut scene);
        controller.pinch_update(&mut scene, 2.0);
        assert_eq!(distance(&scene), 1.5);
        assert_eq!(distance(&scene), MIN_DISTANCE);
    }

    #[test]
    fn successive_pinches_chain_from_the_last_distance() {
        let mut scene = ready_scene();
        let mut controller = TransformController::new();
        controller.handle(&mut scene, GestureEvent::PinchBegan);
        controller.handle(&mut scene, GestureEvent::PinchChanged { scale: 0.75 });
        controller.handle(&mut scene, GestureEvent::PinchEnded);
        assert!((distance(&scene) - 4.0).abs() < 1e-6);

        controller.handle(&mut scene, GestureEvent::PinchBegan);
        controller.handle(&mut scene, GestureEvent::PinchChanged { scale: 2.0 });
        assert!((distance(&scene) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_scales_are_ignored() {
        let mut scene = ready_scene();
        let mut controller = TransformController::new();
        controller.pinch_start(&mut scene);
        for scale in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            controller.pinch_update(&mut scene, scale);
            assert_eq!(distance(&scene), 3.0);
        }
    }

    #[test]
    fn gestures_without_a_scene_are_no_ops() {
        let mut scene = SceneManager::default();
        let mut controller = TransformController::new();
        controller.pan_update(&mut scene, Vec2::new(50.0, 50.0));
        controller.pinch_start(&mut scene);
        controller.pinch_update(&mut scene, 2.0);
        controller.pinch_end(&mut scene);
        controller.pan_end(&mut scene);
        assert_eq!(controller, TransformController::new());
    }

    #[test]
    fn sync_model_restores_orientation_on_a_fresh_model() {
        let mut scene = ready_scene();
        let mut controller = TransformController::new();
        controller.pan_update(&mut scene, Vec2::new(30.0, -10.0));
        controller.pan_end(&mut scene);
        let before = controller;

        scene.replace_model(model::build(FurnitureKind::Lamp, COLOR_CHOICES[3]));
        assert_eq!(rotation(&scene), Vec2::ZERO);
        controller.sync_model(&mut scene);
        assert!((rotation(&scene) - Vec2::new(-0.1, 0.3)).length() < 1e-6);
        assert_eq!(controller, before);
    }

    #[test]
    fn sync_camera_restores_zoom_on_a_fresh_camera() {
        let mut scene = ready_scene();
        let mut controller = TransformController::new();
        controller.handle(&mut scene, GestureEvent::PinchBegan);
        controller.handle(&mut scene, GestureEvent::PinchChanged { scale: 0.75 });
        controller.handle(&mut scene, GestureEvent::PinchEnded);

        scene.teardown();
        scene.initialize(800, 600);
        assert_eq!(distance(&scene), 3.0);
        controller.sync_camera(&mut scene);
        assert!((distance(&scene) - 4.0).abs() < 1e-6);
    }
}
