use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use glam::IVec2;
use thiserror::Error;

use crate::audio::Cue;
use crate::sprite::{Behavior, BehaviorTable};

/// Width and height in pixels, written `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

/// Screen position, written `X,Y`. Either coordinate may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseArgError {
    #[error("expected WIDTHxHEIGHT, got {0:?}")]
    Extent(String),
    #[error("size must be non-zero, got {0:?}")]
    ZeroExtent(String),
    #[error("expected X,Y, got {0:?}")]
    Point(String),
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn as_ivec2(self) -> IVec2 {
        IVec2::new(self.width as i32, self.height as i32)
    }
}

impl FromStr for Extent {
    type Err = ParseArgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ParseArgError::Extent(s.to_owned());
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(bad)?;
        let width: u32 = w.trim().parse().map_err(|_| bad())?;
        let height: u32 = h.trim().parse().map_err(|_| bad())?;
        if width == 0 || height == 0 {
            return Err(ParseArgError::ZeroExtent(s.to_owned()));
        }
        Ok(Self { width, height })
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Point {
    type Err = ParseArgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ParseArgError::Point(s.to_owned());
        let (x, y) = s.trim().split_once(',').ok_or_else(bad)?;
        Ok(Self {
            x: x.trim().parse().map_err(|_| bad())?,
            y: y.trim().parse().map_err(|_| bad())?,
        })
    }
}

impl From<Point> for IVec2 {
    fn from(p: Point) -> Self {
        IVec2::new(p.x, p.y)
    }
}

/// An animated desktop pet.
///
/// Relative resource paths are looked up under `--assets`.
#[derive(Debug, Clone, Parser)]
#[command(name = "deskpet", version, about, long_about = None)]
pub struct PetConfig {
    /// Directory holding the pet's images and sounds
    #[arg(long, env = "DESKPET_ASSETS", default_value = "assets")]
    pub assets: PathBuf,

    /// Window title, also used for the overlay
    #[arg(long, env = "DESKPET_NAME", default_value = "Desk Pet")]
    pub name: String,

    /// Walking animation
    #[arg(long, default_value = "walk.gif")]
    pub walk: PathBuf,

    /// Dancing animation
    #[arg(long, default_value = "dance.gif")]
    pub dance: PathBuf,

    /// Singing animation
    #[arg(long, default_value = "sing.gif")]
    pub sing: PathBuf,

    /// Animation played while being dragged
    #[arg(long, default_value = "drag.gif")]
    pub drag: PathBuf,

    /// Size every frame is resized to
    #[arg(long, default_value = "120x120")]
    pub frame_size: Extent,

    /// Pet window size
    #[arg(long, default_value = "450x450")]
    pub window_size: Extent,

    /// Initial window position
    #[arg(long, default_value = "500,500", allow_hyphen_values = true)]
    pub position: Point,

    /// Extent kept on screen when clamping the window position
    #[arg(long, default_value = "300x300")]
    pub clamp_extent: Extent,

    /// Sound played while dragging
    #[arg(long, default_value = "sounds/drag.wav")]
    pub drag_sound: PathBuf,

    /// Sound played with the overlay
    #[arg(long, default_value = "sounds/special.mp3")]
    pub special_sound: PathBuf,

    /// Image shown by the overlay
    #[arg(long, default_value = "images/special.png")]
    pub special_image: PathBuf,

    /// Largest size the overlay image is scaled to
    #[arg(long, default_value = "600x600")]
    pub overlay_size: Extent,

    /// Seconds the overlay stays open
    #[arg(long, default_value_t = 10)]
    pub overlay_secs: u64,

    /// RNG seed, for reproducible behavior choices
    #[arg(long, env = "DESKPET_SEED")]
    pub seed: Option<u64>,
}

/// Settings for the special overlay, with paths already resolved.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub title: String,
    pub image: PathBuf,
    pub max_size: Extent,
    pub display_time: Duration,
}

impl PetConfig {
    /// `path` as given if absolute, otherwise under the assets directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.assets.join(path)
        }
    }

    pub fn sprite_paths(&self) -> BehaviorTable<PathBuf> {
        BehaviorTable::from_fn(|b| match b {
            Behavior::Walk => self.resolve(&self.walk),
            Behavior::Dance => self.resolve(&self.dance),
            Behavior::Sing => self.resolve(&self.sing),
            Behavior::DragReaction => self.resolve(&self.drag),
        })
    }

    pub fn cue_paths(&self) -> Vec<(Cue, PathBuf)> {
        vec![
            (Cue::Drag, self.resolve(&self.drag_sound)),
            (Cue::Special, self.resolve(&self.special_sound)),
        ]
    }

    pub fn overlay(&self) -> OverlayConfig {
        OverlayConfig {
            title: self.name.clone(),
            image: self.resolve(&self.special_image),
            max_size: self.overlay_size,
            display_time: Duration::from_secs(self.overlay_secs),
        }
    }

    pub fn rng(&self) -> fastrand::Rng {
        match self.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        }
    }
}
