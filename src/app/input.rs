use crate::transform::GestureEvent;
use glam::Vec2;
use winit::event::TouchPhase;

/// Logical pixels per wheel "line" for trackpads that report pixel deltas.
pub const PIXELS_PER_SCROLL_LINE: f32 = 50.0;

#[derive(Debug, Clone, Copy)]
struct PanTrack {
    origin: Vec2,
    translation: Vec2,
}

#[derive(Debug, Clone, Copy)]
struct PinchTrack {
    pair: (u64, u64),
    initial_spread: f32,
}

/// Turns raw touch, mouse and wheel input into pan and pinch gestures.
///
/// Pan and pinch are tracked independently so both can run at once.
/// All positions are logical pixels.
#[derive(Debug)]
pub struct GestureRecognizer {
    touches: Vec<(u64, Vec2)>,
    pan: Option<PanTrack>,
    pinch: Option<PinchTrack>,
    cursor: Option<Vec2>,
    drag_origin: Option<Vec2>,
    wheel_step: f32,
}

impl GestureRecognizer {
    pub fn new(wheel_step: f32) -> Self {
        Self {
            touches: Vec::new(),
            pan: None,
            pinch: None,
            cursor: None,
            drag_origin: None,
            wheel_step,
        }
    }

    #[cfg(test)]
    pub fn active_touches(&self) -> usize {
        self.touches.len()
    }

    pub fn touch(&mut self, id: u64, phase: TouchPhase, position: Vec2) -> Vec<GestureEvent> {
        let mut events = Vec::new();
        match phase {
            TouchPhase::Started => {
                if let Some(entry) = self.touches.iter_mut().find(|(touch, _)| *touch == id) {
                    entry.1 = position;
                } else {
                    self.touches.push((id, position));
                }
                self.rebase_pan();
                self.refresh_pinch(&mut events);
            }
            TouchPhase::Moved => {
                let Some(entry) = self.touches.iter_mut().find(|(touch, _)| *touch == id) else {
                    return events;
                };
                entry.1 = position;
                self.track_pan(&mut events);
                self.track_pinch(&mut events);
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                let before = self.touches.len();
                self.touches.retain(|(touch, _)| *touch != id);
                if self.touches.len() == before {
                    return events;
                }
                self.refresh_pinch(&mut events);
                if self.touches.is_empty() {
                    if self.pan.take().is_some() {
                        events.push(GestureEvent::PanEnded);
                    }
                } else {
                    self.rebase_pan();
                }
            }
        }
        events
    }

    pub fn cursor_moved(&mut self, position: Vec2) -> Vec<GestureEvent> {
        self.cursor = Some(position);
        let mut events = Vec::new();
        if let (Some(origin), Some(pan)) = (self.drag_origin, self.pan.as_mut()) {
            let translation = position - origin;
            if translation != pan.translation {
                pan.translation = translation;
                events.push(GestureEvent::PanChanged { translation });
            }
        }
        events
    }

    /// Left button press or release. Ignored while fingers are down.
    pub fn mouse_button(&mut self, pressed: bool) -> Vec<GestureEvent> {
        let mut events = Vec::new();
        if pressed {
            if !self.touches.is_empty() || self.drag_origin.is_some() {
                return events;
            }
            if let Some(cursor) = self.cursor {
                self.drag_origin = Some(cursor);
                self.pan = Some(PanTrack {
                    origin: cursor,
                    translation: Vec2::ZERO,
                });
            }
        } else if self.drag_origin.take().is_some() && self.pan.take().is_some() {
            events.push(GestureEvent::PanEnded);
        }
        events
    }

    pub fn cursor_left(&mut self) {
        self.cursor = None;
    }

    /// One wheel notch is a complete pinch. Positive lines zoom in.
    pub fn wheel(&mut self, lines: f32) -> Vec<GestureEvent> {
        if lines == 0.0 || !lines.is_finite() || self.pinch.is_some() {
            return Vec::new();
        }
        vec![
            GestureEvent::PinchBegan,
            GestureEvent::PinchChanged {
                scale: self.wheel_step.powf(lines),
            },
            GestureEvent::PinchEnded,
        ]
    }

    /// Ends every gesture in flight, e.g. when the window loses focus.
    pub fn cancel_all(&mut self) -> Vec<GestureEvent> {
        let mut events = Vec::new();
        if self.pinch.take().is_some() {
            events.push(GestureEvent::PinchEnded);
        }
        if self.pan.take().is_some() {
            events.push(GestureEvent::PanEnded);
        }
        self.touches.clear();
        self.drag_origin = None;
        events
    }

    fn centroid(&self) -> Option<Vec2> {
        if self.touches.is_empty() {
            return None;
        }
        let sum: Vec2 = self.touches.iter().map(|(_, position)| *position).sum();
        Some(sum / self.touches.len() as f32)
    }

    /// Keeps the pan translation continuous when the finger count changes.
    fn rebase_pan(&mut self) {
        let Some(centroid) = self.centroid() else {
            return;
        };
        // A touch takes over from a mouse drag.
        self.drag_origin = None;
        match &mut self.pan {
            Some(pan) => pan.origin = centroid - pan.translation,
            None => {
                self.pan = Some(PanTrack {
                    origin: centroid,
                    translation: Vec2::ZERO,
                })
            }
        }
    }

    fn track_pan(&mut self, events: &mut Vec<GestureEvent>) {
        let Some(centroid) = self.centroid() else {
            return;
        };
        if let Some(pan) = &mut self.pan {
            let translation = centroid - pan.origin;
            if translation != pan.translation {
                pan.translation = translation;
                events.push(GestureEvent::PanChanged { translation });
            }
        }
    }

    /// Starts, keeps or restarts the pinch so it always follows the first two touches.
    fn refresh_pinch(&mut self, events: &mut Vec<GestureEvent>) {
        let pair = match self.touches.as_slice() {
            [(a, _), (b, _), ..] => Some((*a, *b)),
            _ => None,
        };
        if let Some(pinch) = self.pinch {
            if Some(pinch.pair) == pair {
                return;
            }
            self.pinch = None;
            events.push(GestureEvent::PinchEnded);
        }
        if let (Some(pair), Some(spread)) = (pair, self.spread()) {
            if spread > f32::EPSILON {
                self.pinch = Some(PinchTrack {
                    pair,
                    initial_spread: spread,
                });
                events.push(GestureEvent::PinchBegan);
            }
        }
    }

    fn track_pinch(&mut self, events: &mut Vec<GestureEvent>) {
        let (Some(pinch), Some(spread)) = (self.pinch, self.spread()) else {
            return;
        };
        events.push(GestureEvent::PinchChanged {
            scale: spread / pinch.initial_spread,
        });
    }

    fn spread(&self) -> Option<f32> {
        match self.touches.as_slice() {
            [(_, a), (_, b), ..] => Some(a.distance(*b)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pan_translations(events: &[GestureEvent]) -> Vec<Vec2> {
        events
            .iter()
            .filter_map(|event| match event {
                GestureEvent::PanChanged { translation } => Some(*translation),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn single_finger_drag_is_a_pan() {
        let mut recognizer = GestureRecognizer::new(1.1);
        assert!(recognizer.touch(1, TouchPhase::Started, Vec2::new(100.0, 100.0)).is_empty());
        let moved = recognizer.touch(1, TouchPhase::Moved, Vec2::new(130.0, 90.0));
        assert_eq!(pan_translations(&moved), vec![Vec2::new(30.0, -10.0)]);
        let ended = recognizer.touch(1, TouchPhase::Ended, Vec2::new(130.0, 90.0));
        assert_eq!(ended, vec![GestureEvent::PanEnded]);
        assert_eq!(recognizer.active_touches(), 0);
    }

    #[test]
    fn pan_stays_continuous_when_a_second_finger_lands() {
        let mut recognizer = GestureRecognizer::new(1.1);
        recognizer.touch(1, TouchPhase::Started, Vec2::new(0.0, 0.0));
        recognizer.touch(1, TouchPhase::Moved, Vec2::new(20.0, 0.0));

        let landed = recognizer.touch(2, TouchPhase::Started, Vec2::new(120.0, 0.0));
        assert_eq!(landed, vec![GestureEvent::PinchBegan]);

        // Centroid jumped to x = 70, but translation continues from 20.
        let moved = recognizer.touch(2, TouchPhase::Moved, Vec2::new(130.0, 0.0));
        let translations = pan_translations(&moved);
        assert_eq!(translations.len(), 1);
        assert!((translations[0] - Vec2::new(25.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn pinch_scale_is_relative_to_the_initial_spread() {
        let mut recognizer = GestureRecognizer::new(1.1);
        recognizer.touch(1, TouchPhase::Started, Vec2::new(0.0, 0.0));
        recognizer.touch(2, TouchPhase::Started, Vec2::new(100.0, 0.0));
        let moved = recognizer.touch(2, TouchPhase::Moved, Vec2::new(200.0, 0.0));
        assert!(moved.contains(&GestureEvent::PinchChanged { scale: 2.0 }));

        let lifted = recognizer.touch(2, TouchPhase::Ended, Vec2::new(200.0, 0.0));
        assert_eq!(lifted, vec![GestureEvent::PinchEnded]);
        let last = recognizer.touch(1, TouchPhase::Ended, Vec2::ZERO);
        assert_eq!(last, vec![GestureEvent::PanEnded]);
    }

    #[test]
    fn losing_a_pinch_finger_with_others_down_restarts_the_pinch() {
        let mut recognizer = GestureRecognizer::new(1.1);
        recognizer.touch(1, TouchPhase::Started, Vec2::new(0.0, 0.0));
        recognizer.touch(2, TouchPhase::Started, Vec2::new(100.0, 0.0));
        assert!(recognizer
            .touch(3, TouchPhase::Started, Vec2::new(0.0, 100.0))
            .is_empty());
        let lifted = recognizer.touch(1, TouchPhase::Cancelled, Vec2::ZERO);
        assert_eq!(lifted, vec![GestureEvent::PinchEnded, GestureEvent::PinchBegan]);
    }

    #[test]
    fn unknown_touch_ids_are_ignored() {
        let mut recognizer = GestureRecognizer::new(1.1);
        assert!(recognizer.touch(9, TouchPhase::Moved, Vec2::ONE).is_empty());
        assert!(recognizer.touch(9, TouchPhase::Ended, Vec2::ONE).is_empty());
    }

    #[test]
    fn left_drag_pans_like_a_finger() {
        let mut recognizer = GestureRecognizer::new(1.1);
        recognizer.cursor_moved(Vec2::new(10.0, 10.0));
        assert!(recognizer.mouse_button(true).is_empty());
        let moved = recognizer.cursor_moved(Vec2::new(15.0, 30.0));
        assert_eq!(pan_translations(&moved), vec![Vec2::new(5.0, 20.0)]);
        assert_eq!(recognizer.mouse_button(false), vec![GestureEvent::PanEnded]);
        assert!(recognizer.cursor_moved(Vec2::new(50.0, 50.0)).is_empty());
    }

    #[test]
    fn wheel_step_is_a_complete_pinch() {
        let mut recognizer = GestureRecognizer::new(1.1);
        let events = recognizer.wheel(1.0);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], GestureEvent::PinchBegan);
        assert_eq!(events[2], GestureEvent::PinchEnded);
        match events[1] {
            GestureEvent::PinchChanged { scale } => assert!(scale > 1.0),
            other => panic!("unexpected {other:?}"),
        }
        match recognizer.wheel(-2.0)[1] {
            GestureEvent::PinchChanged { scale } => assert!((scale - 1.0 / 1.21).abs() < 1e-5),
            other => panic!("unexpected {other:?}"),
        }
        assert!(recognizer.wheel(0.0).is_empty());
    }

    #[test]
    fn cancel_all_closes_open_gestures() {
        let mut recognizer = GestureRecognizer::new(1.1);
        recognizer.touch(1, TouchPhase::Started, Vec2::ZERO);
        recognizer.touch(2, TouchPhase::Started, Vec2::new(10.0, 0.0));
        assert_eq!(
            recognizer.cancel_all(),
            vec![GestureEvent::PinchEnded, GestureEvent::PanEnded]
        );
        assert!(recognizer.cancel_all().is_empty());
    }
}
