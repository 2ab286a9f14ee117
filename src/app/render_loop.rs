use crate::scene::{FrameStatus, SceneManager, SceneRenderer};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Shared stop flag. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    Skipped,
    Stopped,
}

/// Continuous frame driver.
///
/// The host polls `next_deadline` to arm its wake-up and calls `tick` on
/// every redraw; `tick` is the only place frames are issued.
#[derive(Debug)]
pub struct RenderLoop {
    cadence: Duration,
    next_deadline: Option<Instant>,
    token: Option<CancelToken>,
}

impl RenderLoop {
    pub fn new(cadence: Duration) -> Self {
        Self {
            cadence,
            next_deadline: None,
            token: None,
        }
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    pub fn set_cadence(&mut self, cadence: Duration) {
        if cadence != self.cadence {
            log::debug!("Frame cadence set to {:.2} ms", cadence.as_secs_f64() * 1000.0);
        }
        self.cadence = cadence;
    }

    /// Starts the loop for one surface lifetime. Restarting a running loop
    /// hands back the live token.
    pub fn start(&mut self, now: Instant) -> CancelToken {
        if let Some(token) = self.token.as_ref().filter(|token| !token.is_cancelled()) {
            log::warn!("Render loop already running");
            return token.clone();
        }
        let token = CancelToken::new();
        self.token = Some(token.clone());
        self.next_deadline = Some(now);
        log::info!(
            "Render loop started ({:.2} ms cadence)",
            self.cadence.as_secs_f64() * 1000.0
        );
        token
    }

    pub fn cancel(&mut self) {
        if let Some(token) = &self.token {
            if !token.is_cancelled() {
                token.cancel();
                log::info!("Render loop cancelled");
            }
        }
        self.next_deadline = None;
    }

    pub fn is_running(&self) -> bool {
        self.token.as_ref().is_some_and(|token| !token.is_cancelled())
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        if self.is_running() {
            self.next_deadline
        } else {
            None
        }
    }

    #[cfg(test)]
    pub fn is_due(&self, now: Instant) -> bool {
        self.next_deadline().is_some_and(|deadline| now >= deadline)
    }

    /// Issues one frame: scene pass, then `overlay`, then present.
    pub fn tick<R, F>(
        &mut self,
        now: Instant,
        scene: &SceneManager,
        mut renderer: Option<&mut R>,
        overlay: F,
    ) -> TickOutcome
    where
        R: SceneRenderer + ?Sized,
        F: FnOnce(&mut R),
    {
        if !self.is_running() {
            return TickOutcome::Stopped;
        }
        self.next_deadline = Some(now + self.cadence);

        let status = scene.render_frame(renderer.as_deref_mut());
        if let Some(renderer) = renderer {
            overlay(&mut *renderer);
            renderer.end_frame();
        }
        match status {
            FrameStatus::Rendered => TickOutcome::Rendered,
            FrameStatus::Skipped => TickOutcome::Skipped,
        }
    }
}

/// Frame interval for a monitor refresh rate, falling back when the rate is unknown.
pub fn cadence_from_refresh(refresh_millihertz: Option<u32>, fallback_hz: f32) -> Duration {
    let hz = refresh_millihertz
        .map(|millihz| millihz as f32 / 1000.0)
        .filter(|hz| *hz > 1.0)
        .unwrap_or(if fallback_hz > 1.0 { fallback_hz } else { 60.0 });
    Duration::from_secs_f32(1.0 / hz)
}
