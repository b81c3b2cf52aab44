use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn an animated image into a frame sequence.
///
/// Callers degrade rather than abort: a frame-level error triggers the plain
/// fallback decode, and anything left over becomes an empty sequence.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Gif(#[from] gif::DecodingError),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("animation contains no frames")]
    NoFrames,

    #[error("frame {frame}: no global or local color table")]
    MissingPalette { frame: usize },

    #[error("frame {frame}: palette index {index} outside a {colors}-color table")]
    PaletteIndex {
        frame: usize,
        index: u8,
        colors: usize,
    },

    #[error("frame {frame}: {width}x{height}+{left}+{top} does not fit a {screen_w}x{screen_h} screen")]
    OutOfBounds {
        frame: usize,
        left: u32,
        top: u32,
        width: u32,
        height: u32,
        screen_w: u32,
        screen_h: u32,
    },

    #[error("frame {frame}: expected {expected} pixel indices, got {actual}")]
    ShortBuffer {
        frame: usize,
        expected: usize,
        actual: usize,
    },
}

impl DecodeError {
    /// Errors raised while processing one frame, as opposed to the container
    /// itself being unreadable. These are the ones the plain decode can recover.
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            Self::MissingPalette { .. }
                | Self::PaletteIndex { .. }
                | Self::OutOfBounds { .. }
                | Self::ShortBuffer { .. }
        )
    }
}

/// An optional image or sound resource that could not be used.
/// Always logged, and the feature that needed it is switched off.
#[derive(Debug, Error)]
#[error("{what} resource {} unavailable: {source}", path.display())]
pub struct ResourceMissing {
    pub what: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Audio output could not be brought up or a cue could not be played.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device: {0}")]
    Stream(#[from] rodio::StreamError),

    #[error(transparent)]
    Play(#[from] rodio::PlayError),

    #[error("cannot decode sound: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),
}

/// Window or GPU bring-up failed. Fatal for the pet window; the overlay
/// just isn't shown.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot create window: {0}")]
    CreateWindow(#[from] winit::error::OsError),

    #[error("cannot create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),

    #[error("cannot create device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no texture formats")]
    NoSurfaceFormat,
}

/// The special overlay could not be shown. Never fatal.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("cannot load overlay image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(transparent)]
    Render(#[from] RenderError),
}
