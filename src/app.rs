use std::sync::Arc;

use glam::{IVec2, Vec2};
use instant::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId, WindowLevel};

use crate::audio::{Audio, Cue};
use crate::config::PetConfig;
use crate::error::RenderError;
use crate::menu::{self, MenuCommand};
use crate::overlay::{SpecialOverlay, SPECIAL_CUE_LIMIT};
use crate::pet::animation::ANIMATION_PERIOD;
use crate::pet::motion::{Bounds, MotionController, PetPosition};
use crate::pet::pointer::{Gesture, PointerTracker};
use crate::pet::schedule::Ticker;
use crate::pet::{Compositor, Pet, BEHAVIOR_PERIOD};
#[cfg(windows)]
use crate::platform;
use crate::render::{SpriteRenderer, TRANSPARENT};
use crate::sprite::{Behavior, BehaviorTable, Frame, FrameDecoder, FrameSequence};

/// Behavior the pet wakes up in.
const INITIAL_BEHAVIOR: Behavior = Behavior::Sing;

/// The pet's borderless window and its GPU state.
struct PetWindow {
    window: Arc<Window>,
    renderer: SpriteRenderer,
}

impl Compositor for PetWindow {
    fn set_frame(&mut self, frame: &Frame) {
        self.renderer.set_frame(frame);
        self.window.request_redraw();
    }

    fn set_position(&mut self, position: PetPosition) {
        self.window
            .set_outer_position(PhysicalPosition::new(position.0.x, position.0.y));
    }
}

/// Top-level application state.
struct App {
    config: PetConfig,
    pet: Pet,
    window: Option<PetWindow>,
    overlay: Option<SpecialOverlay>,
    audio: Audio,

    // Pointer, in pet-window coordinates
    pointer: PointerTracker,
    cursor: Vec2,

    animation_ticker: Ticker,
    behavior_ticker: Ticker,

    // Cleared on exit; nothing is rescheduled afterwards.
    running: bool,
    failure: Option<RenderError>,
}

impl App {
    fn new(config: PetConfig, sequences: BehaviorTable<FrameSequence>, audio: Audio) -> Self {
        let now = Instant::now();
        // Real screen size arrives with the window; until then only the
        // configured position matters.
        let motion = MotionController::new(
            Bounds::new(IVec2::splat(i32::MAX), config.clamp_extent.as_ivec2()),
            config.window_size.as_ivec2(),
        );
        let pet = Pet::new(
            sequences,
            INITIAL_BEHAVIOR,
            PetPosition(config.position.into()),
            motion,
            config.rng(),
            now,
        );

        Self {
            config,
            pet,
            window: None,
            overlay: None,
            audio,
            pointer: PointerTracker::new(),
            cursor: Vec2::ZERO,
            animation_ticker: Ticker::new(ANIMATION_PERIOD, now),
            behavior_ticker: Ticker::new(BEHAVIOR_PERIOD, now),
            running: true,
            failure: None,
        }
    }

    fn create_pet_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), RenderError> {
        let size = self.config.window_size;
        let position = self.pet.position().0;

        // No with_transparent(true) on Windows: it sets WS_EX_LAYERED, which
        // conflicts with DirectComposition. Start hidden so DWM doesn't cache
        // stale frame state before the tool-window styles take effect.
        let attrs = WindowAttributes::default()
            .with_title(self.config.name.as_str())
            .with_decorations(false)
            .with_resizable(false)
            .with_transparent(cfg!(not(windows)))
            .with_visible(false)
            .with_window_level(WindowLevel::AlwaysOnTop)
            .with_inner_size(PhysicalSize::new(size.width, size.height))
            .with_position(PhysicalPosition::new(position.x, position.y));

        let window = Arc::new(event_loop.create_window(attrs)?);

        #[cfg(windows)]
        platform::win32::setup_pet_window(&window);

        if let Some(monitor) = window
            .current_monitor()
            .or_else(|| event_loop.primary_monitor())
        {
            let origin = monitor.position();
            let screen = monitor.size();
            self.pet.set_bounds(Bounds::on_monitor(
                IVec2::new(origin.x, origin.y),
                IVec2::new(screen.width as i32, screen.height as i32),
                self.config.clamp_extent.as_ivec2(),
            ));
            log::info!(
                "Pet window created: {} on {}x{} at ({}, {}) {:?}",
                size,
                screen.width,
                screen.height,
                origin.x,
                origin.y,
                monitor.name().unwrap_or_default()
            );
        } else {
            log::warn!("No monitor found; window position is not clamped");
        }

        let renderer = SpriteRenderer::new(window.clone(), TRANSPARENT)?;
        let mut pet_window = PetWindow { window, renderer };
        self.pet.present(&mut pet_window);

        // Show window now that all styles and GPU resources are ready.
        pet_window.window.set_visible(true);
        self.window = Some(pet_window);

        let now = Instant::now();
        self.animation_ticker.reset(now);
        self.behavior_ticker.reset(now);
        Ok(())
    }

    /// Pointer position in screen coordinates.
    fn screen_pointer(&self) -> IVec2 {
        #[cfg(windows)]
        {
            platform::win32::get_mouse_pos()
        }
        #[cfg(not(windows))]
        {
            self.pet.position().0 + self.cursor.as_ivec2()
        }
    }

    fn pet_window_event(&mut self, event_loop: &ActiveEventLoop, event: WindowEvent) {
        let now = Instant::now();
        match event {
            WindowEvent::CloseRequested => self.exit(event_loop),
            WindowEvent::Resized(new_size) => {
                if let Some(w) = &mut self.window {
                    w.renderer.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(w) = &self.window {
                    w.renderer.render();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Vec2::new(position.x as f32, position.y as f32);
                if self.pointer.motion(self.cursor) == Some(Gesture::DragMotion) {
                    let pointer = self.screen_pointer();
                    if let Some(w) = &mut self.window {
                        if let Some(cue) = self.pet.drag_to(pointer, now, w) {
                            self.audio.apply(cue, now);
                        }
                    }
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => self.pointer.press(self.cursor),
                ElementState::Released => {
                    let Some(w) = &mut self.window else {
                        return;
                    };
                    match self.pointer.release() {
                        Some(Gesture::Click) => self.pet.click(now, w),
                        Some(Gesture::DragEnd) => {
                            if let Some(cue) = self.pet.release(now, w) {
                                self.audio.apply(cue, now);
                            }
                        }
                        Some(Gesture::DragMotion) | None => {}
                    }
                }
            },
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Right,
                ..
            } => {
                let chosen = self.window.as_ref().and_then(|w| menu::popup(&w.window));
                if let Some(command) = chosen {
                    self.run_command(event_loop, command);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    if let Some(command) = MenuCommand::from_key(&event.logical_key) {
                        self.run_command(event_loop, command);
                    }
                }
            }
            _ => {}
        }
    }

    fn overlay_window_event(&mut self, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Overlay closed");
                self.overlay = None;
            }
            WindowEvent::Resized(new_size) => {
                if let Some(overlay) = &mut self.overlay {
                    overlay.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Some(overlay) = &self.overlay {
                    overlay.render();
                }
            }
            _ => {}
        }
    }

    fn run_command(&mut self, event_loop: &ActiveEventLoop, command: MenuCommand) {
        log::debug!("Menu command {command:?}");
        match command {
            MenuCommand::Exit => self.exit(event_loop),
            MenuCommand::ShowOverlay => self.show_overlay(event_loop),
        }
    }

    fn show_overlay(&mut self, event_loop: &ActiveEventLoop) {
        // Replacing drops the old window first.
        self.overlay = None;
        match SpecialOverlay::open(event_loop, &self.config.overlay(), Instant::now()) {
            Ok(overlay) => {
                self.audio.play_for(Cue::Special, SPECIAL_CUE_LIMIT);
                self.overlay = Some(overlay);
            }
            Err(e) => log::warn!("Overlay unavailable: {e}"),
        }
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        if !self.running {
            return;
        }
        log::info!("Exiting");
        self.running = false;
        self.audio.stop_all();
        self.overlay = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || !self.running {
            return;
        }
        if let Err(e) = self.create_pet_window(event_loop) {
            log::error!("Pet window unavailable: {e}");
            self.failure = Some(e);
            self.running = false;
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if !self.running {
            return;
        }
        let now = Instant::now();

        if let Some(w) = &mut self.window {
            for _ in 0..self.animation_ticker.poll(now) {
                self.pet.animation_tick(now, w);
            }
            for _ in 0..self.behavior_ticker.poll(now) {
                self.pet.behavior_tick(now, w);
            }
        }
        self.audio.update(now);

        if self.overlay.as_ref().is_some_and(|o| o.is_expired(now)) {
            log::info!("Overlay timed out");
            self.overlay = None;
        }

        let mut wake = self
            .animation_ticker
            .next_due()
            .min(self.behavior_ticker.next_due());
        if let Some(overlay) = &self.overlay {
            wake = wake.min(overlay.closes_at());
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(wake));
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.overlay.as_ref().is_some_and(|o| o.id() == window_id) {
            self.overlay_window_event(event);
        } else if self.window.as_ref().is_some_and(|w| w.window.id() == window_id) {
            self.pet_window_event(event_loop, event);
        }
    }
}

/// Entry point: decode sprites, open audio, run the event loop.
pub fn run(config: PetConfig) -> Result<(), Box<dyn std::error::Error>> {
    let decoder = FrameDecoder::new(config.frame_size.width, config.frame_size.height);
    let sequences = config.sprite_paths().map(|_, path| decoder.load(path));
    for (behavior, sequence) in sequences.iter() {
        log::info!("{}: {} frames", behavior.label(), sequence.len());
    }

    let audio = Audio::new(&config.cue_paths());

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, sequences, audio);
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
