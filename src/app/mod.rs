mod context;
mod egui_host;
mod input;
mod render_loop;
mod timing;

pub use context::{SelectionChange, SelectionState, ViewerContext};
pub use egui_host::{EguiFrameOutput, EguiHost};
pub use input::{GestureRecognizer, PIXELS_PER_SCROLL_LINE};
pub use render_loop::{cadence_from_refresh, CancelToken, RenderLoop, TickOutcome};

use crate::config::{ConfigError, ViewerConfig};
use crate::render::{RenderContext, RenderError};
use crate::scene::SceneRenderer;
use crate::transform::GestureEvent;
use crate::ui::SelectionPanel;
use timing::FrameTiming;

use glam::Vec2;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("render setup failed: {0}")]
    Render(#[from] RenderError),
}

pub struct App {
    config: ViewerConfig,
    viewer: ViewerContext,
    gestures: GestureRecognizer,
    panel: SelectionPanel,
    render_loop: RenderLoop,
    timing: FrameTiming,
    window: Option<Arc<Window>>,
    render: Option<RenderContext>,
    egui: Option<EguiHost>,
    cancel: Option<CancelToken>,
    fatal: Option<AppError>,
}

impl App {
    fn new(config: ViewerConfig) -> Self {
        let cadence = cadence_from_refresh(None, config.fallback_refresh_hz);
        Self {
            viewer: ViewerContext::new(),
            gestures: GestureRecognizer::new(config.wheel_zoom_step),
            panel: SelectionPanel::new(),
            render_loop: RenderLoop::new(cadence),
            timing: FrameTiming::new(config.window_title.clone(), Instant::now()),
            window: None,
            render: None,
            egui: None,
            cancel: None,
            fatal: None,
            config,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        log::error!("{}", err);
        self.fatal = Some(err);
        self.shutdown();
        event_loop.exit();
    }

    fn init_surface(&mut self, window: Arc<Window>) -> Result<(), RenderError> {
        let render = RenderContext::new(window.clone(), self.config.background)?;
        let (width, height) = render.drawable_size();
        self.egui = Some(EguiHost::new(&window));
        self.viewer.surface_ready(width, height);
        self.render = Some(render);

        self.update_cadence(&window);
        self.cancel = Some(self.render_loop.start(Instant::now()));
        window.request_redraw();
        Ok(())
    }

    /// Stops frame production and releases GPU resources for the current surface.
    fn shutdown(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.render_loop.cancel();
        let events = self.gestures.cancel_all();
        self.dispatch(events);
        if self.render.take().is_some() {
            log::info!("Render context released");
        }
        self.egui = None;
        self.viewer.surface_lost();
    }

    fn update_cadence(&mut self, window: &Window) {
        let refresh = window
            .current_monitor()
            .and_then(|monitor| monitor.refresh_rate_millihertz());
        self.render_loop
            .set_cadence(cadence_from_refresh(refresh, self.config.fallback_refresh_hz));
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        let Some(render) = &mut self.render else {
            return;
        };
        if size.width == 0 || size.height == 0 {
            self.viewer.resize(0, 0);
            return;
        }
        render.resize(size.width, size.height);
        let (width, height) = render.drawable_size();
        self.viewer.resize(width, height);
    }

    fn dispatch(&mut self, events: Vec<GestureEvent>) {
        for event in events {
            log::debug!("Gesture {:?}", event);
            self.viewer.handle_gesture(event);
        }
    }

    fn logical(&self, x: f64, y: f64) -> Vec2 {
        let scale = self
            .window
            .as_ref()
            .map(|window| window.scale_factor())
            .unwrap_or(1.0);
        Vec2::new((x / scale) as f32, (y / scale) as f32)
    }

    fn redraw(&mut self) {
        if self.viewer.is_minimized() {
            return;
        }
        let (Some(window), Some(egui)) = (self.window.clone(), self.egui.as_mut()) else {
            return;
        };
        let (output, changes) = egui.run_panel(&window, &self.panel, self.viewer.selection());

        let now = Instant::now();
        let outcome = self.render_loop.tick(
            now,
            self.viewer.scene(),
            self.render.as_mut(),
            |render| render.render_ui(output),
        );

        for change in changes {
            self.viewer.apply(change);
        }

        if outcome != TickOutcome::Stopped && self.config.show_fps_in_title {
            if let Some(title) = self.timing.record_frame(now) {
                window.set_title(&title);
            }
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let window = match &self.window {
            Some(window) => window.clone(),
            None => {
                let window_attrs = WindowAttributes::default()
                    .with_title(self.config.window_title.clone())
                    .with_inner_size(PhysicalSize::new(
                        self.config.window_width,
                        self.config.window_height,
                    ))
                    .with_resizable(true);
                match event_loop.create_window(window_attrs) {
                    Ok(window) => {
                        let window = Arc::new(window);
                        self.window = Some(window.clone());
                        window
                    }
                    Err(err) => {
                        self.fail(event_loop, err.into());
                        return;
                    }
                }
            }
        };

        if self.render.is_some() {
            return;
        }
        if let Err(err) = self.init_surface(window) {
            self.fail(event_loop, err.into());
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        log::info!("Surface suspended");
        self.shutdown();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let to_viewer = match (&self.window, &mut self.egui) {
            (Some(window), Some(egui)) => egui.on_window_event(window, &event),
            _ => true,
        };

        match event {
            WindowEvent::CloseRequested => {
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                    && event.state == ElementState::Pressed
                {
                    self.shutdown();
                    event_loop.exit();
                }
            }
            WindowEvent::Resized(new_size) => {
                self.handle_resize(new_size);
                if let Some(window) = self.window.clone() {
                    self.update_cadence(&window);
                }
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(window) = self.window.clone() {
                    self.handle_resize(window.inner_size());
                }
            }
            WindowEvent::Moved(_) => {
                if let Some(window) = self.window.clone() {
                    self.update_cadence(&window);
                }
            }
            WindowEvent::Focused(false) => {
                let events = self.gestures.cancel_all();
                self.dispatch(events);
            }
            WindowEvent::Touch(touch) => {
                if !to_viewer {
                    return;
                }
                let position = self.logical(touch.location.x, touch.location.y);
                let events = self.gestures.touch(touch.id, touch.phase, position);
                self.dispatch(events);
            }
            WindowEvent::CursorMoved { position, .. } => {
                let position = self.logical(position.x, position.y);
                let events = self.gestures.cursor_moved(position);
                self.dispatch(events);
            }
            WindowEvent::CursorLeft { .. } => {
                self.gestures.cursor_left();
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                if !to_viewer {
                    return;
                }
                let events = self.gestures.mouse_button(state == ElementState::Pressed);
                self.dispatch(events);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if !to_viewer {
                    return;
                }
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => {
                        self.logical(pos.x, pos.y).y / PIXELS_PER_SCROLL_LINE
                    }
                };
                let events = self.gestures.wheel(lines);
                self.dispatch(events);
            }
            WindowEvent::RedrawRequested => {
                self.redraw();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(deadline) = self.render_loop.next_deadline() else {
            event_loop.set_control_flow(ControlFlow::Wait);
            return;
        };
        let now = Instant::now();
        let wake_at = if now >= deadline {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            now + self.render_loop.cadence().max(Duration::from_millis(1))
        } else {
            deadline
        };
        event_loop.set_control_flow(ControlFlow::WaitUntil(wake_at));
    }
}

pub fn run(config: ViewerConfig) -> Result<(), AppError> {
    log::info!("🪑 {}", config.window_title);
    log::info!("   Drag to rotate, pinch or scroll to zoom, ESC to exit");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    if let Some(err) = app.fatal.take() {
        return Err(err);
    }
    log::info!("👋 Goodbye!");
    Ok(())
}
