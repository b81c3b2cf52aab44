use std::time::Duration;

use instant::Instant;

use crate::sprite::{Behavior, BehaviorTable, FrameSequence};

/// Animation tick period.
pub const ANIMATION_PERIOD: Duration = Duration::from_millis(50);
/// Drag playback speed in frames per second of drag time.
pub const DRAG_FRAME_RATE: u64 = 10;

/// Present only while the pet is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSession {
    /// Behavior to restore on release.
    pub pre_drag: Behavior,
    pub started: Instant,
}

/// Which sequence is playing, where in it we are, and since when.
///
/// `frame` is always a valid index into the active behavior's sequence
/// (or 0 if that sequence is empty). Every behavior swap resets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationState {
    pub behavior: Behavior,
    pub frame: usize,
    pub last_change: Instant,
    pub drag: Option<DragSession>,
}

impl AnimationState {
    pub fn new(behavior: Behavior, now: Instant) -> Self {
        Self {
            behavior,
            frame: 0,
            last_change: now,
            drag: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Switch the active sequence. The old index means nothing in the new one.
    pub fn swapped_to(self, behavior: Behavior) -> Self {
        Self {
            behavior,
            frame: 0,
            ..self
        }
    }
}

/// Advances the frame index of whatever sequence is currently active.
#[derive(Debug, Clone, Copy)]
pub struct AnimationClock {
    drag_frame_rate: u64,
}

impl Default for AnimationClock {
    fn default() -> Self {
        Self {
            drag_frame_rate: DRAG_FRAME_RATE,
        }
    }
}

impl AnimationClock {
    /// One animation tick. Returns the index to draw, or `None` when the
    /// active sequence is empty and nothing should be drawn.
    ///
    /// While dragging, the index follows wall-clock drag time rather than
    /// tick count so the reaction plays at the same speed however the ticks land.
    pub fn advance(
        &self,
        state: &mut AnimationState,
        sequences: &BehaviorTable<FrameSequence>,
        now: Instant,
    ) -> Option<usize> {
        let len = sequences[state.behavior].len();
        if len == 0 {
            state.frame = 0;
            return None;
        }

        state.frame = match state.drag {
            Some(drag) => {
                let ms = now.saturating_duration_since(drag.started).as_millis() as u64;
                (ms * self.drag_frame_rate / 1000) as usize % len
            }
            None => (state.frame + 1) % len,
        };
        Some(state.frame)
    }
}
