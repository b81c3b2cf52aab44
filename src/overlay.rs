use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use instant::Instant;
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes, WindowId, WindowLevel};

use crate::config::{Extent, OverlayConfig};
use crate::error::{OverlayError, RenderError};
use crate::render::SpriteRenderer;
use crate::sprite::{Frame, FrameDecoder};

/// Blank border around the image, in pixels.
pub const PADDING: u32 = 10;

/// Longest the special sound plays, whatever the clip's length.
pub const SPECIAL_CUE_LIMIT: Duration = Duration::from_secs(10);

/// Largest size with `src`'s aspect ratio that fits in `max`.
/// Scales up as well as down; never returns a zero side.
pub fn fit_within(src: Extent, max: Extent) -> Extent {
    let ratio = src.width as f64 / src.height as f64;
    let target = max.width as f64 / max.height as f64;
    let (width, height) = if ratio > target {
        (max.width, (max.width as f64 / ratio) as u32)
    } else {
        ((max.height as f64 * ratio) as u32, max.height)
    };
    Extent::new(width.max(1), height.max(1))
}

/// Read an image and scale it to fit `max`.
pub fn load_image(path: &Path, max: Extent) -> Result<Frame, OverlayError> {
    let image = image::open(path)
        .map_err(|source| OverlayError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .into_rgba8();
    let fitted = fit_within(Extent::new(image.width(), image.height()), max);
    Ok(FrameDecoder::new(fitted.width, fitted.height).still(image))
}

/// A short-lived always-on-top window showing one image.
pub struct SpecialOverlay {
    window: Arc<Window>,
    renderer: SpriteRenderer,
    closes_at: Instant,
}

impl SpecialOverlay {
    pub fn open(
        event_loop: &ActiveEventLoop,
        config: &OverlayConfig,
        now: Instant,
    ) -> Result<Self, OverlayError> {
        let frame = load_image(&config.image, config.max_size)?;

        let attrs = WindowAttributes::default()
            .with_title(config.title.as_str())
            .with_resizable(false)
            .with_visible(false)
            .with_window_level(WindowLevel::AlwaysOnTop)
            .with_inner_size(PhysicalSize::new(
                frame.width + 2 * PADDING,
                frame.height + 2 * PADDING,
            ));
        let window = Arc::new(event_loop.create_window(attrs).map_err(RenderError::from)?);

        let mut renderer = SpriteRenderer::new(window.clone(), wgpu::Color::WHITE)?;
        renderer.set_frame(&frame);
        window.set_visible(true);
        window.request_redraw();

        log::info!(
            "Overlay opened: {}x{} for {:?}",
            frame.width,
            frame.height,
            config.display_time
        );

        Ok(Self {
            window,
            renderer,
            closes_at: now + config.display_time,
        })
    }

    pub fn id(&self) -> WindowId {
        self.window.id()
    }

    pub fn closes_at(&self) -> Instant {
        self.closes_at
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.closes_at
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.renderer.resize(width, height);
    }

    pub fn render(&self) {
        self.renderer.render();
    }
}
