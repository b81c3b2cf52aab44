pub mod decode;

use std::ops::Index;

pub use decode::FrameDecoder;

/// What the pet is currently doing. Each behavior owns one frame sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Behavior {
    Walk = 0,
    Dance = 1,
    Sing = 2,
    /// Only ever entered by grabbing the pet.
    DragReaction = 3,
}

impl Behavior {
    pub const ALL: [Behavior; 4] = [
        Self::Walk,
        Self::Dance,
        Self::Sing,
        Self::DragReaction,
    ];

    /// Behaviors the timer and click chooser may pick from.
    pub const IDLE_ROTATION: [Behavior; 3] = [Self::Walk, Self::Dance, Self::Sing];

    pub fn label(self) -> &'static str {
        match self {
            Self::Walk => "walk",
            Self::Dance => "dance",
            Self::Sing => "sing",
            Self::DragReaction => "drag",
        }
    }
}

/// One `T` per behavior, indexed by the behavior tag itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BehaviorTable<T> {
    slots: [T; 4],
}

impl<T> BehaviorTable<T> {
    pub fn from_fn(mut f: impl FnMut(Behavior) -> T) -> Self {
        Self {
            slots: Behavior::ALL.map(&mut f),
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Behavior, &T) -> U) -> BehaviorTable<U> {
        BehaviorTable::from_fn(|b| f(b, &self.slots[b as usize]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Behavior, &T)> {
        Behavior::ALL.into_iter().zip(self.slots.iter())
    }
}

impl<T> Index<Behavior> for BehaviorTable<T> {
    type Output = T;

    fn index(&self, behavior: Behavior) -> &T {
        &self.slots[behavior as usize]
    }
}

#[cfg(test)]
impl<T> std::ops::IndexMut<Behavior> for BehaviorTable<T> {
    fn index_mut(&mut self, behavior: Behavior) -> &mut T {
        &mut self.slots[behavior as usize]
    }
}

/// A single render-ready bitmap: RGBA8, premultiplied alpha, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Frame {
    #[cfg(test)]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }
}

/// The decoded animation loop for one behavior. All frames share one size.
///
/// A sequence is only empty when decoding failed outright; the renderer skips
/// empty sequences instead of indexing into them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameSequence {
    frames: Vec<Frame>,
}

impl FrameSequence {
    pub fn new(frames: Vec<Frame>) -> Self {
        debug_assert!(
            frames
                .windows(2)
                .all(|w| (w[0].width, w[0].height) == (w[1].width, w[1].height)),
            "frame sizes differ within a sequence"
        );
        Self { frames }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// Frame size, or `None` for the empty sequence.
    #[cfg(test)]
    pub fn size(&self) -> Option<(u32, u32)> {
        self.frames.first().map(|f| (f.width, f.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_indexes_by_tag() {
        let mut table = BehaviorTable::from_fn(|b| b.label().len());
        assert_eq!(table[Behavior::Walk], 4);
        assert_eq!(table[Behavior::DragReaction], 4);
        table[Behavior::Sing] = 99;
        assert_eq!(table[Behavior::Sing], 99);
        let labels: Vec<_> = table.iter().map(|(b, _)| b.label()).collect();
        assert_eq!(labels, ["walk", "dance", "sing", "drag"]);
    }

    #[test]
    fn idle_rotation_excludes_drag() {
        assert!(!Behavior::IDLE_ROTATION.contains(&Behavior::DragReaction));
    }

    #[test]
    fn empty_sequence_has_no_size() {
        let seq = FrameSequence::empty();
        assert!(seq.is_empty());
        assert_eq!(seq.size(), None);
        assert!(seq.get(0).is_none());
    }
}
