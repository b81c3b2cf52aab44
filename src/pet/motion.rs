use glam::IVec2;

use crate::sprite::Behavior;

/// Max horizontal step per behavior tick while walking.
const WALK_STEP: i32 = 50;
/// Max step per axis per behavior tick while dancing.
const DANCE_STEP: i32 = 10;

/// Top-left corner of the pet window in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PetPosition(pub IVec2);

/// Allowed range for [`PetPosition`]: `[origin, origin + screen - extent]` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    min: IVec2,
    max: IVec2,
}

impl Bounds {
    /// `extent` is how much of the window must stay on screen, measured
    /// from its top-left corner.
    pub fn new(screen: IVec2, extent: IVec2) -> Self {
        Self::on_monitor(IVec2::ZERO, screen, extent)
    }

    /// Bounds for a monitor whose top-left corner sits at `origin` on the
    /// virtual desktop.
    pub fn on_monitor(origin: IVec2, screen: IVec2, extent: IVec2) -> Self {
        Self {
            min: origin,
            max: origin + (screen - extent).max(IVec2::ZERO),
        }
    }

    /// Saturates; never fails, even when the screen is smaller than the extent.
    pub fn clamp(&self, p: IVec2) -> IVec2 {
        p.clamp(self.min, self.max)
    }
}

/// Moves the pet window according to the active behavior.
#[derive(Debug, Clone, Copy)]
pub struct MotionController {
    bounds: Bounds,
    half_window: IVec2,
}

impl MotionController {
    pub fn new(bounds: Bounds, window: IVec2) -> Self {
        Self {
            bounds,
            half_window: window / 2,
        }
    }

    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    /// Position after one behavior tick.
    pub fn step(&self, pos: PetPosition, behavior: Behavior, rng: &mut fastrand::Rng) -> PetPosition {
        let delta = match behavior {
            Behavior::Walk => IVec2::new(rng.i32(-WALK_STEP..=WALK_STEP), 0),
            Behavior::Dance => IVec2::new(
                rng.i32(-DANCE_STEP..=DANCE_STEP),
                rng.i32(-DANCE_STEP..=DANCE_STEP),
            ),
            Behavior::Sing | Behavior::DragReaction => return pos,
        };
        PetPosition(self.bounds.clamp(pos.0 + delta))
    }

    /// Center the window on the pointer (screen coordinates).
    pub fn follow_pointer(&self, pointer: IVec2) -> PetPosition {
        PetPosition(self.bounds.clamp(pointer - self.half_window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> MotionController {
        MotionController::new(
            Bounds::new(IVec2::new(1920, 1080), IVec2::new(300, 300)),
            IVec2::new(450, 450),
        )
    }

    #[test]
    fn clamp_saturates_at_right_edge() {
        let bounds = Bounds::new(IVec2::new(1920, 1080), IVec2::new(300, 300));
        assert_eq!(bounds.clamp(IVec2::new(2000, 500)).x, 1620);
        assert_eq!(bounds.clamp(IVec2::new(-40, -1)), IVec2::ZERO);
    }

    #[test]
    fn tiny_screen_pins_to_origin() {
        let bounds = Bounds::new(IVec2::new(200, 200), IVec2::new(300, 300));
        assert_eq!(bounds.clamp(IVec2::new(50, 50)), IVec2::ZERO);
    }

    #[test]
    fn secondary_monitor_offsets_bounds() {
        let bounds = Bounds::on_monitor(
            IVec2::new(1920, 0),
            IVec2::new(1280, 1024),
            IVec2::new(300, 300),
        );
        assert_eq!(bounds.clamp(IVec2::new(100, 2000)), IVec2::new(1920, 724));
        assert_eq!(bounds.clamp(IVec2::new(4000, -5)), IVec2::new(2900, 0));
    }

    #[test]
    fn monitor_left_of_primary_allows_negative_positions() {
        let bounds = Bounds::on_monitor(
            IVec2::new(-1280, 0),
            IVec2::new(1280, 1024),
            IVec2::new(300, 300),
        );
        assert_eq!(bounds.clamp(IVec2::new(-600, 10)), IVec2::new(-600, 10));
        assert_eq!(bounds.clamp(IVec2::new(0, 0)), IVec2::new(-300, 0));
    }

    #[test]
    fn walk_moves_horizontally_within_step() {
        let motion = controller();
        let mut rng = fastrand::Rng::with_seed(42);
        let start = PetPosition(IVec2::new(500, 500));
        for _ in 0..200 {
            let next = motion.step(start, Behavior::Walk, &mut rng);
            assert_eq!(next.0.y, 500);
            assert!((next.0.x - 500).abs() <= WALK_STEP);
        }
    }

    #[test]
    fn dance_jitters_both_axes() {
        let motion = controller();
        let mut rng = fastrand::Rng::with_seed(42);
        let start = PetPosition(IVec2::new(500, 500));
        let mut moved_y = false;
        for _ in 0..200 {
            let next = motion.step(start, Behavior::Dance, &mut rng);
            let d = (next.0 - start.0).abs();
            assert!(d.x <= DANCE_STEP && d.y <= DANCE_STEP);
            moved_y |= d.y != 0;
        }
        assert!(moved_y);
    }

    #[test]
    fn sing_and_drag_stay_put() {
        let motion = controller();
        let mut rng = fastrand::Rng::with_seed(1);
        let start = PetPosition(IVec2::new(10, 20));
        assert_eq!(motion.step(start, Behavior::Sing, &mut rng), start);
        assert_eq!(motion.step(start, Behavior::DragReaction, &mut rng), start);
    }

    #[test]
    fn walk_is_clamped() {
        let motion = controller();
        let mut rng = fastrand::Rng::with_seed(3);
        let mut pos = PetPosition(IVec2::new(1620, 0));
        for _ in 0..500 {
            pos = motion.step(pos, Behavior::Walk, &mut rng);
            assert!((0..=1620).contains(&pos.0.x));
        }
    }

    #[test]
    fn drag_centers_window_on_pointer() {
        let motion = controller();
        assert_eq!(motion.follow_pointer(IVec2::new(800, 600)).0, IVec2::new(575, 375));
        assert_eq!(motion.follow_pointer(IVec2::new(100, 100)).0, IVec2::ZERO);
        assert_eq!(motion.follow_pointer(IVec2::new(5000, 5000)).0, IVec2::new(1620, 780));
    }
}
