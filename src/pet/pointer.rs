use glam::Vec2;

/// What a press/move/release sequence amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Released without moving.
    Click,
    /// Moved while held. Reported for every motion of a drag.
    DragMotion,
    /// Released after dragging.
    DragEnd,
}

/// Tracks the left button to tell clicks from drags.
#[derive(Debug, Default)]
pub struct PointerTracker {
    pressed_at: Option<Vec2>,
    dragging: bool,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, pos: Vec2) {
        self.pressed_at = Some(pos);
        self.dragging = false;
    }

    pub fn motion(&mut self, pos: Vec2) -> Option<Gesture> {
        let pressed_at = self.pressed_at?;
        if !self.dragging && pos == pressed_at {
            return None;
        }
        self.dragging = true;
        Some(Gesture::DragMotion)
    }

    pub fn release(&mut self) -> Option<Gesture> {
        self.pressed_at.take()?;
        let was_dragging = std::mem::take(&mut self.dragging);
        Some(if was_dragging {
            Gesture::DragEnd
        } else {
            Gesture::Click
        })
    }

    #[cfg(test)]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }
}
