pub mod animation;
pub mod behavior;
pub mod motion;
pub mod pointer;
pub mod schedule;

use std::time::Duration;

use glam::IVec2;
use instant::Instant;

use self::animation::{AnimationClock, AnimationState};
use self::behavior::{BehaviorEvent, BehaviorStateMachine, Transition};
use self::motion::{Bounds, MotionController, PetPosition};
use crate::audio::CueCommand;
use crate::sprite::{Behavior, BehaviorTable, Frame, FrameSequence};

/// Behavior tick period (state timer + movement).
pub const BEHAVIOR_PERIOD: Duration = Duration::from_millis(100);

/// Whatever puts pixels on screen. The pet only ever pushes to it.
pub trait Compositor {
    fn set_frame(&mut self, frame: &Frame);
    fn set_position(&mut self, position: PetPosition);
}

/// The one pet on screen: owns its animation state, position, frames and RNG.
///
/// Every driver (animation tick, behavior tick, pointer) goes through a
/// method here; the event loop only dispatches.
pub struct Pet {
    sequences: BehaviorTable<FrameSequence>,
    state: AnimationState,
    position: PetPosition,
    machine: BehaviorStateMachine,
    clock: AnimationClock,
    motion: MotionController,
    rng: fastrand::Rng,
}

impl Pet {
    pub fn new(
        sequences: BehaviorTable<FrameSequence>,
        initial: Behavior,
        position: PetPosition,
        motion: MotionController,
        rng: fastrand::Rng,
        now: Instant,
    ) -> Self {
        Self {
            sequences,
            state: AnimationState::new(initial, now),
            position,
            machine: BehaviorStateMachine::default(),
            clock: AnimationClock::default(),
            motion,
            rng,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn position(&self) -> PetPosition {
        self.position
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.motion.set_bounds(bounds);
        self.position = PetPosition(bounds.clamp(self.position.0));
    }

    /// Frame at the current index of the active sequence, if it has any.
    pub fn current_frame(&self) -> Option<&Frame> {
        self.sequences[self.state.behavior].get(self.state.frame)
    }

    /// Push the current frame and position, e.g. after the window appears.
    pub fn present(&self, out: &mut impl Compositor) {
        out.set_position(self.position);
        if let Some(frame) = self.current_frame() {
            out.set_frame(frame);
        }
    }

    pub fn animation_tick(&mut self, now: Instant, out: &mut impl Compositor) {
        if self
            .clock
            .advance(&mut self.state, &self.sequences, now)
            .is_some()
        {
            if let Some(frame) = self.current_frame() {
                out.set_frame(frame);
            }
        }
    }

    pub fn behavior_tick(&mut self, now: Instant, out: &mut impl Compositor) {
        self.apply(BehaviorEvent::Tick, now, out);
        if self.state.is_dragging() {
            return;
        }
        let next = self.motion.step(self.position, self.state.behavior, &mut self.rng);
        if next != self.position {
            self.position = next;
            out.set_position(next);
        }
    }

    pub fn click(&mut self, now: Instant, out: &mut impl Compositor) {
        self.apply(BehaviorEvent::Click, now, out);
    }

    /// Pointer moved while held, in screen coordinates. The first call of a
    /// drag starts the session and returns the cue to play.
    pub fn drag_to(
        &mut self,
        pointer: IVec2,
        now: Instant,
        out: &mut impl Compositor,
    ) -> Option<CueCommand> {
        let cue = self.apply(BehaviorEvent::DragMotion, now, out);
        self.position = self.motion.follow_pointer(pointer);
        out.set_position(self.position);
        cue
    }

    pub fn release(&mut self, now: Instant, out: &mut impl Compositor) -> Option<CueCommand> {
        self.apply(BehaviorEvent::Release, now, out)
    }

    fn apply(
        &mut self,
        event: BehaviorEvent,
        now: Instant,
        out: &mut impl Compositor,
    ) -> Option<CueCommand> {
        let before = self.state;
        let transition: Transition = self.machine.step(before, event, now, &mut self.rng);
        self.state = transition.state;
        if transition.swapped(&before) {
            if let Some(frame) = self.current_frame() {
                out.set_frame(frame);
            }
        }
        transition.cue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Cue;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<Frame>,
        positions: Vec<PetPosition>,
    }

    impl Compositor for Recorder {
        fn set_frame(&mut self, frame: &Frame) {
            self.frames.push(frame.clone());
        }
        fn set_position(&mut self, position: PetPosition) {
            self.positions.push(position);
        }
    }

    /// 1x1 frames tagged with (behavior, index) in the red and green channels.
    fn tagged(lens: [usize; 4]) -> BehaviorTable<FrameSequence> {
        BehaviorTable::from_fn(|b| {
            FrameSequence::new(
                (0..lens[b as usize])
                    .map(|i| Frame {
                        width: 1,
                        height: 1,
                        pixels: vec![b as u8, i as u8, 0, 255],
                    })
                    .collect(),
            )
        })
    }

    fn tag(frame: &Frame) -> (u8, u8) {
        (frame.pixels[0], frame.pixels[1])
    }

    fn pet(lens: [usize; 4], initial: Behavior, now: Instant) -> Pet {
        let motion = MotionController::new(
            Bounds::new(IVec2::new(1920, 1080), IVec2::new(300, 300)),
            IVec2::new(450, 450),
        );
        Pet::new(
            tagged(lens),
            initial,
            PetPosition(IVec2::new(500, 500)),
            motion,
            fastrand::Rng::with_seed(17),
            now,
        )
    }

    #[test]
    fn sing_after_23_ticks_shows_frame_3() {
        let now = Instant::now();
        let mut pet = pet([8, 6, 10, 5], Behavior::Sing, now);
        let mut out = Recorder::default();
        for _ in 0..23 {
            pet.animation_tick(now, &mut out);
        }
        assert_eq!(pet.state().frame, 3);
        assert_eq!(out.frames.len(), 23);
        assert_eq!(tag(out.frames.last().unwrap()), (Behavior::Sing as u8, 3));
    }

    #[test]
    fn drag_held_1_2s_shows_frame_2() {
        let t0 = Instant::now();
        let mut pet = pet([8, 6, 10, 5], Behavior::Sing, t0);
        let mut out = Recorder::default();

        let cue = pet.drag_to(IVec2::new(700, 700), t0, &mut out);
        assert_eq!(cue, Some(CueCommand::Play(Cue::Drag)));
        pet.animation_tick(t0 + Duration::from_millis(1200), &mut out);

        assert_eq!(pet.state().frame, 2);
        assert_eq!(
            tag(out.frames.last().unwrap()),
            (Behavior::DragReaction as u8, 2)
        );
    }

    #[test]
    fn swap_renders_from_new_sequence_only() {
        let now = Instant::now();
        let mut pet = pet([8, 6, 10, 5], Behavior::Walk, now);
        let mut out = Recorder::default();
        for _ in 0..5 {
            pet.animation_tick(now, &mut out);
        }

        pet.click(now, &mut out);
        let chosen = pet.state().behavior;
        assert_ne!(chosen, Behavior::Walk);
        assert_eq!(pet.state().frame, 0);
        assert_eq!(tag(out.frames.last().unwrap()), (chosen as u8, 0));

        out.frames.clear();
        for _ in 0..40 {
            pet.animation_tick(now, &mut out);
        }
        assert!(out.frames.iter().all(|f| tag(f).0 == chosen as u8));
    }

    #[test]
    fn single_frame_renders_same_bitmap_forever() {
        let now = Instant::now();
        let mut pet = pet([1, 1, 1, 1], Behavior::Sing, now);
        let mut out = Recorder::default();
        for _ in 0..200 {
            pet.animation_tick(now, &mut out);
        }
        assert_eq!(pet.state().frame, 0);
        assert!(out.frames.iter().all(|f| *f == out.frames[0]));
    }

    #[test]
    fn empty_sequence_skips_rendering() {
        let now = Instant::now();
        let mut pet = pet([8, 6, 0, 5], Behavior::Sing, now);
        let mut out = Recorder::default();
        for _ in 0..10 {
            pet.animation_tick(now, &mut out);
        }
        assert!(out.frames.is_empty());
        assert!(pet.current_frame().is_none());
    }

    #[test]
    fn drag_moves_window_and_release_restores_behavior() {
        let t0 = Instant::now();
        let mut pet = pet([8, 6, 10, 5], Behavior::Dance, t0);
        let mut out = Recorder::default();

        pet.drag_to(IVec2::new(800, 600), t0, &mut out);
        assert_eq!(pet.position().0, IVec2::new(575, 375));
        assert_eq!(pet.state().behavior, Behavior::DragReaction);

        // Behavior ticks neither move nor re-choose while dragging.
        pet.behavior_tick(t0 + Duration::from_secs(30), &mut out);
        assert_eq!(pet.position().0, IVec2::new(575, 375));
        assert_eq!(pet.state().behavior, Behavior::DragReaction);

        let cue = pet.release(t0 + Duration::from_secs(31), &mut out);
        assert!(matches!(cue, Some(CueCommand::Stop(Cue::Drag, _))));
        assert_eq!(pet.state().behavior, Behavior::Dance);
        assert_eq!(tag(out.frames.last().unwrap()), (Behavior::Dance as u8, 0));
    }

    #[test]
    fn sing_does_not_wander() {
        let t0 = Instant::now();
        let mut pet = pet([8, 6, 10, 5], Behavior::Sing, t0);
        let mut out = Recorder::default();
        for i in 1..=40u32 {
            pet.behavior_tick(t0 + BEHAVIOR_PERIOD * i, &mut out);
        }
        assert_eq!(pet.state().behavior, Behavior::Sing);
        assert!(out.positions.is_empty());
    }

    #[test]
    fn bounds_change_reclamps_position() {
        let now = Instant::now();
        let mut pet = pet([1, 1, 1, 1], Behavior::Sing, now);
        pet.set_bounds(Bounds::new(IVec2::new(640, 480), IVec2::new(300, 300)));
        assert_eq!(pet.position().0, IVec2::new(340, 180));
    }
}
