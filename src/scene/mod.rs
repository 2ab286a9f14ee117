mod camera;

pub use camera::{PerspectiveCamera, HOME_POSITION};

use crate::model::Object3DGraph;
use crate::render::RenderError;
use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: u32,
    pub intensity: f32,
}

/// Light shining from `position` toward the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: u32,
    pub intensity: f32,
    pub position: Vec3,
}

impl DirectionalLight {
    /// Unit vector pointing from the surface toward the light.
    pub fn to_light(&self) -> Vec3 {
        self.position.normalize_or(Vec3::Y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub from: Vec3,
    pub to: Vec3,
    pub color: u32,
}

/// Square reference grid on the y = 0 plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridHelper {
    pub size: f32,
    pub divisions: u32,
    pub center_color: u32,
    pub line_color: u32,
}

impl GridHelper {
    /// Lines along both axes; the pair through the origin uses `center_color`.
    pub fn lines(&self) -> Vec<GridLine> {
        let half = self.size / 2.0;
        let step = self.size / self.divisions.max(1) as f32;
        let center = self.divisions / 2;
        let mut lines = Vec::with_capacity((self.divisions as usize + 1) * 2);
        for i in 0..=self.divisions {
            let k = -half + i as f32 * step;
            let color = if i == center {
                self.center_color
            } else {
                self.line_color
            };
            lines.push(GridLine {
                from: Vec3::new(-half, 0.0, k),
                to: Vec3::new(half, 0.0, k),
                color,
            });
            lines.push(GridLine {
                from: Vec3::new(k, 0.0, -half),
                to: Vec3::new(k, 0.0, half),
                color,
            });
        }
        lines
    }
}

/// Lights, grid and the one active model.
#[derive(Debug, Clone)]
pub struct Scene {
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
    pub grid: GridHelper,
    model: Option<Object3DGraph>,
    model_generation: u64,
}

impl Scene {
    fn furnished() -> Self {
        Self {
            ambient: AmbientLight {
                color: 0xFFFFFF,
                intensity: 0.5,
            },
            directional: DirectionalLight {
                color: 0xFFFFFF,
                intensity: 0.8,
                position: Vec3::new(5.0, 5.0, 5.0),
            },
            grid: GridHelper {
                size: 10.0,
                divisions: 10,
                center_color: 0x444444,
                line_color: 0x888888,
            },
            model: None,
            model_generation: 0,
        }
    }

    pub fn model(&self) -> Option<&Object3DGraph> {
        self.model.as_ref()
    }

    /// Bumped on every model swap so GPU buffers can be rebuilt lazily.
    pub fn model_generation(&self) -> u64 {
        self.model_generation
    }
}

/// Boundary to the rendering engine.
pub trait SceneRenderer {
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError>;
    fn drawable_size(&self) -> (u32, u32);
    /// Presents whatever was drawn since the last call.
    fn end_frame(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Rendered,
    Skipped,
}

#[derive(Debug, Default)]
pub struct SceneManager {
    scene: Option<Scene>,
    camera: Option<PerspectiveCamera>,
}

impl SceneManager {
    /// Builds camera, lights and grid. Later calls only refresh the aspect ratio.
    pub fn initialize(&mut self, width: u32, height: u32) {
        if self.scene.is_some() {
            self.resize(width, height);
            return;
        }
        log::info!("Initializing scene for {}x{}", width, height);
        self.scene = Some(Scene::furnished());
        self.camera = Some(PerspectiveCamera::new(width, height));
    }

    pub fn is_initialized(&self) -> bool {
        self.scene.is_some() && self.camera.is_some()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(camera) = &mut self.camera {
            camera.set_viewport(width, height);
        }
    }

    /// Swaps in `graph` as the only model, with its root transform reset.
    /// Returns false when the scene is not initialized yet.
    pub fn replace_model(&mut self, mut graph: Object3DGraph) -> bool {
        let Some(scene) = &mut self.scene else {
            log::debug!("Scene not initialized; dropping model '{}'", graph.name());
            return false;
        };
        if let Some(previous) = scene.model.take() {
            log::debug!("Detached model '{}'", previous.name());
        }
        graph.reset_transform();
        log::debug!("Attached model '{}'", graph.name());
        scene.model = Some(graph);
        scene.model_generation = scene.model_generation.wrapping_add(1);
        true
    }

    pub fn render_frame<R>(&self, renderer: Option<&mut R>) -> FrameStatus
    where
        R: SceneRenderer + ?Sized,
    {
        let (Some(scene), Some(camera), Some(renderer)) = (&self.scene, &self.camera, renderer) else {
            return FrameStatus::Skipped;
        };
        match renderer.render(scene, camera) {
            Ok(()) => FrameStatus::Rendered,
            Err(RenderError::SurfaceOutdated) => {
                log::debug!("Frame skipped: surface outdated");
                FrameStatus::Skipped
            }
            Err(err) => {
                log::warn!("Frame skipped: {}", err);
                FrameStatus::Skipped
            }
        }
    }

    pub fn teardown(&mut self) {
        if self.scene.take().is_some() {
            log::info!("Scene torn down");
        }
        self.camera = None;
    }

    #[cfg(test)]
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn camera(&self) -> Option<&PerspectiveCamera> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Option<&mut PerspectiveCamera> {
        self.camera.as_mut()
    }

    pub fn model(&self) -> Option<&Object3DGraph> {
        self.scene.as_ref().and_then(|scene| scene.model.as_ref())
    }

    pub fn model_mut(&mut self) -> Option<&mut Object3DGraph> {
        self.scene.as_mut().and_then(|scene| scene.model.as_mut())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Records what it was asked to draw instead of touching a GPU.
    #[derive(Debug, Default)]
    pub struct RecordingRenderer {
        pub renders: usize,
        pub presents: usize,
        pub last_generation: Option<u64>,
        pub fail_with: Option<RenderError>,
    }

    impl SceneRenderer for RecordingRenderer {
        fn render(&mut self, scene: &Scene, _camera: &PerspectiveCamera) -> Result<(), RenderError> {
            if let Some(err) = self.fail_with.take() {
                return Err(err);
            }
            self.renders += 1;
            self.last_generation = Some(scene.model_generation());
            Ok(())
        }

        fn drawable_size(&self) -> (u32, u32) {
            (800, 600)
        }

        fn end_frame(&mut self) {
            self.presents += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingRenderer;
    use super::*;
    use crate::model::{self, FurnitureKind, COLOR_CHOICES};

    fn chair() -> Object3DGraph {
        model::build(FurnitureKind::Chair, COLOR_CHOICES[0])
    }

    #[test]
    fn initialize_builds_camera_lights_and_grid() {
        let mut manager = SceneManager::default();
        manager.initialize(1600, 900);
        let camera = manager.camera().expect("camera");
        assert_eq!(camera.fov_y_degrees, 75.0);
        assert_eq!(camera.position, Vec3::new(0.0, 1.0, 3.0));
        let scene = manager.scene().expect("scene");
        assert_eq!(scene.ambient.intensity, 0.5);
        assert_eq!(scene.directional.position, Vec3::new(5.0, 5.0, 5.0));
        assert_eq!(scene.grid.lines().len(), 22);
        assert!(scene.model().is_none());
    }

    #[test]
    fn second_initialize_keeps_camera_distance() {
        let mut manager = SceneManager::default();
        manager.initialize(800, 600);
        manager.camera_mut().expect("camera").set_distance(4.2);
        manager.initialize(1024, 512);
        let camera = manager.camera().expect("camera");
        assert_eq!(camera.distance(), 4.2);
        assert!((camera.aspect - 2.0).abs() < 1e-6);
    }

    #[test]
    fn replace_before_initialize_attaches_nothing() {
        let mut manager = SceneManager::default();
        assert!(!manager.replace_model(chair()));
        assert!(manager.model().is_none());
    }

    #[test]
    fn replace_keeps_a_single_model_with_reset_transform() {
        let mut manager = SceneManager::default();
        manager.initialize(800, 600);
        assert!(manager.replace_model(chair()));
        manager.model_mut().expect("model").transform_mut().rotation.y = 1.0;

        let mut table = model::build(FurnitureKind::Table, COLOR_CHOICES[1]);
        table.transform_mut().position = Vec3::new(3.0, 0.0, 0.0);
        assert!(manager.replace_model(table));

        let attached = manager.model().expect("model");
        assert_eq!(attached.name(), "table");
        assert_eq!(attached.transform(), &model::Transform::IDENTITY);
        assert_eq!(manager.scene().map(Scene::model_generation), Some(2));
    }

    #[test]
    fn render_frame_is_a_no_op_until_ready() {
        let mut manager = SceneManager::default();
        let mut renderer = RecordingRenderer::default();
        assert_eq!(manager.render_frame(Some(&mut renderer)), FrameStatus::Skipped);
        assert_eq!(renderer.renders, 0);

        manager.initialize(800, 600);
        assert_eq!(manager.render_frame::<RecordingRenderer>(None), FrameStatus::Skipped);
        assert_eq!(manager.render_frame(Some(&mut renderer)), FrameStatus::Rendered);
        assert_eq!(renderer.renders, 1);
    }

    #[test]
    fn renderer_errors_are_reported_as_skipped() {
        let mut manager = SceneManager::default();
        manager.initialize(800, 600);
        let mut renderer = RecordingRenderer {
            fail_with: Some(RenderError::SurfaceAcquire("timeout".to_string())),
            ..Default::default()
        };
        assert_eq!(manager.render_frame(Some(&mut renderer)), FrameStatus::Skipped);
        assert_eq!(manager.render_frame(Some(&mut renderer)), FrameStatus::Rendered);
    }

    #[test]
    fn outdated_surface_skips_the_frame() {
        let mut manager = SceneManager::default();
        manager.initialize(800, 600);
        let mut renderer = RecordingRenderer {
            fail_with: Some(RenderError::SurfaceOutdated),
            ..Default::default()
        };
        assert_eq!(manager.render_frame(Some(&mut renderer)), FrameStatus::Skipped);
        assert_eq!(renderer.renders, 0);
        assert_eq!(manager.render_frame(Some(&mut renderer)), FrameStatus::Rendered);
    }

    #[test]
    fn teardown_drops_scene_and_camera() {
        let mut manager = SceneManager::default();
        manager.initialize(800, 600);
        manager.replace_model(chair());
        manager.teardown();
        assert!(!manager.is_initialized());
        assert!(manager.model().is_none());
    }

    #[test]
    fn grid_center_lines_use_the_center_color() {
        let grid = Scene::furnished().grid;
        let lines = grid.lines();
        let center: Vec<_> = lines.iter().filter(|l| l.color == 0x444444).collect();
        assert_eq!(center.len(), 2);
        assert!(center.iter().all(|l| l.from.x == 0.0 || l.from.z == 0.0));
        assert!(lines.iter().all(|l| l.from.x.abs() <= 5.0 && l.to.z.abs() <= 5.0));
    }
}
