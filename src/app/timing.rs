use std::time::{Duration, Instant};

const REPORT_INTERVAL: Duration = Duration::from_millis(500);

/// Rolling frame statistics used for the window title.
pub struct FrameTiming {
    last_frame_time: Option<Instant>,
    last_report_time: Instant,
    frame_count: u32,
    pub frame_dt: f32,
    base_title: String,
}

impl FrameTiming {
    pub fn new(base_title: String, now: Instant) -> Self {
        Self {
            last_frame_time: None,
            last_report_time: now,
            frame_count: 0,
            frame_dt: 1.0 / 60.0,
            base_title,
        }
    }

    /// Records a presented frame. Returns a fresh title every report interval.
    pub fn record_frame(&mut self, now: Instant) -> Option<String> {
        if let Some(last) = self.last_frame_time {
            self.frame_dt = now.saturating_duration_since(last).as_secs_f32();
        }
        self.last_frame_time = Some(now);

        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(self.last_report_time);
        if elapsed < REPORT_INTERVAL {
            return None;
        }
        let fps = self.frame_count as f32 / elapsed.as_secs_f32();
        self.frame_count = 0;
        self.last_report_time = now;
        Some(format!(
            "{} - {:.1} fps ({:.2} ms)",
            self.base_title,
            fps,
            self.frame_dt * 1000.0
        ))
    }
}
