use std::time::Duration;

use instant::Instant;

use super::animation::{AnimationState, DragSession};
use crate::audio::{Cue, CueCommand};
use crate::sprite::Behavior;

/// Minimum time between timer-driven behavior changes.
pub const BEHAVIOR_INTERVAL: Duration = Duration::from_secs(5);
/// Fade applied to the drag cue on release.
pub const DRAG_CUE_FADE: Duration = Duration::from_millis(1);

/// Inputs the state machine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorEvent {
    /// Periodic behavior tick.
    Tick,
    /// Press and release without moving.
    Click,
    /// Pointer moved while held down.
    DragMotion,
    /// Button released after a drag.
    Release,
}

/// Result of feeding one event to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: AnimationState,
    pub cue: Option<CueCommand>,
}

impl Transition {
    fn quiet(state: AnimationState) -> Self {
        Self { state, cue: None }
    }

    /// Whether the active sequence differs from `before`.
    pub fn swapped(&self, before: &AnimationState) -> bool {
        self.state.behavior != before.behavior || self.state.drag != before.drag
    }
}

/// Decides which behavior is active. Pure: state in, state out.
#[derive(Debug, Clone, Copy)]
pub struct BehaviorStateMachine {
    interval: Duration,
}

impl Default for BehaviorStateMachine {
    fn default() -> Self {
        Self {
            interval: BEHAVIOR_INTERVAL,
        }
    }
}

impl BehaviorStateMachine {
    pub fn step(
        &self,
        state: AnimationState,
        event: BehaviorEvent,
        now: Instant,
        rng: &mut fastrand::Rng,
    ) -> Transition {
        match event {
            BehaviorEvent::Tick => self.on_tick(state, now, rng),
            BehaviorEvent::Click => on_click(state, now, rng),
            BehaviorEvent::DragMotion => on_drag_motion(state, now),
            BehaviorEvent::Release => on_release(state),
        }
    }

    fn on_tick(&self, state: AnimationState, now: Instant, rng: &mut fastrand::Rng) -> Transition {
        if state.is_dragging() {
            return Transition::quiet(state);
        }
        if now.saturating_duration_since(state.last_change) <= self.interval {
            return Transition::quiet(state);
        }
        let next = choose_next(&Behavior::IDLE_ROTATION, state.behavior, rng);
        log::debug!("Timer: {} -> {}", state.behavior.label(), next.label());
        Transition::quiet(AnimationState {
            last_change: now,
            ..state.swapped_to(next)
        })
    }
}

fn on_click(state: AnimationState, now: Instant, rng: &mut fastrand::Rng) -> Transition {
    if state.is_dragging() {
        return Transition::quiet(state);
    }
    let next = choose_next(&Behavior::IDLE_ROTATION, state.behavior, rng);
    log::debug!("Click: {} -> {}", state.behavior.label(), next.label());
    Transition::quiet(AnimationState {
        last_change: now,
        ..state.swapped_to(next)
    })
}

fn on_drag_motion(state: AnimationState, now: Instant) -> Transition {
    if state.is_dragging() {
        return Transition::quiet(state);
    }
    log::debug!("Drag start (was {})", state.behavior.label());
    let drag = DragSession {
        pre_drag: state.behavior,
        started: now,
    };
    Transition {
        state: AnimationState {
            drag: Some(drag),
            ..state.swapped_to(Behavior::DragReaction)
        },
        cue: Some(CueCommand::Play(Cue::Drag)),
    }
}

fn on_release(state: AnimationState) -> Transition {
    let Some(drag) = state.drag else {
        return Transition::quiet(state);
    };
    log::debug!("Drag end, back to {}", drag.pre_drag.label());
    Transition {
        state: AnimationState {
            drag: None,
            ..state.swapped_to(drag.pre_drag)
        },
        cue: Some(CueCommand::Stop(Cue::Drag, DRAG_CUE_FADE)),
    }
}

/// Uniform pick among `candidates` other than `current`; if that leaves
/// nothing, any candidate.
pub fn choose_next(candidates: &[Behavior], current: Behavior, rng: &mut fastrand::Rng) -> Behavior {
    let others: Vec<Behavior> = candidates.iter().copied().filter(|&b| b != current).collect();
    let pool = if others.is_empty() { candidates } else { others.as_slice() };
    match pool.len() {
        0 => current,
        n => pool[rng.usize(0..n)],
    }
}
