//! Beatstage - an audio-reactive 3D stage
//!
//! A robot bobs along its depth axis to the loudness of a looping beat while
//! two flamingos flap on either side of it.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use beatstage::camera::{Camera, OrbitControls};
use beatstage::cli::Args;
use beatstage::params::{hex_to_rgb, SessionConfig};
use beatstage::rendering::{HeadlessRenderer, Renderer, WgpuRenderer};
use beatstage::scene::SceneGraph;
use beatstage::scheduler::FrameScheduler;
use beatstage::session::{Collaborators, Session};
use beatstage::viewport::ViewportController;

/// Pixel scroll distance treated as one wheel line
const PIXELS_PER_LINE: f64 = 50.0;

/// Main application state
struct App {
    config: SessionConfig,
    autostart: bool,

    // Window and rendering
    window: Option<Arc<Window>>,
    renderer: Option<WgpuRenderer>,

    /// Background-only scene shown until the session starts
    overlay: SceneGraph,
    overlay_camera: Camera,

    // Running session (after the start gesture)
    session: Option<Session>,
    scheduler: FrameScheduler,
    viewport: ViewportController,
    orbit: OrbitControls,

    // Time tracking
    last_frame: Option<Instant>,

    /// Fatal error raised inside the event loop
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: SessionConfig, autostart: bool) -> Self {
        let overlay = SceneGraph::new(hex_to_rgb(config.render.background));
        let overlay_camera = Camera::from_config(&config.camera, config.render.aspect_ratio());
        let scheduler = FrameScheduler::new(&config.scheduler);
        let orbit = OrbitControls::new(config.orbit.clone());

        Self {
            config,
            autostart,
            window: None,
            renderer: None,
            overlay,
            overlay_camera,
            session: None,
            scheduler,
            viewport: ViewportController::new(),
            orbit,
            last_frame: None,
            error: None,
        }
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title("Beatstage - click or press Enter to start")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.render.window_width,
                self.config.render.window_height,
            ));

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create window")?,
        );
        let renderer = pollster::block_on(WgpuRenderer::new(Arc::clone(&window)))
            .context("Failed to initialise renderer")?;

        self.window = Some(window);
        self.renderer = Some(renderer);
        Ok(())
    }

    /// The start gesture: build the session, start audio, issue loads
    fn start_session(&mut self) {
        if self.session.is_some() {
            return;
        }

        let mut session = Session::start(&self.config, Collaborators::standard(&self.config));
        if let (Some(window), Some(renderer)) = (&self.window, self.renderer.as_mut()) {
            let size = window.inner_size();
            self.viewport
                .on_resize(size.width, size.height, &mut session.camera, renderer);
            window.set_title("Beatstage");
        }

        log::info!("Beatstage is running! Drag to orbit, scroll to zoom, ESC to quit");
        self.session = Some(session);
        self.last_frame = Some(Instant::now());
    }

    fn resize(&mut self, width: u32, height: u32) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        match self.session.as_mut() {
            Some(session) => {
                self.viewport
                    .on_resize(width, height, &mut session.camera, renderer);
            }
            None => {
                self.viewport
                    .on_resize(width, height, &mut self.overlay_camera, renderer);
            }
        }
    }

    /// Render a single frame
    fn render_frame(&mut self) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        let Some(session) = self.session.as_mut() else {
            if let Err(e) = renderer.render(&self.overlay, &self.overlay_camera) {
                log::error!("Render error: {}", e);
            }
            return;
        };

        let now = Instant::now();
        let elapsed = self
            .last_frame
            .map(|last| now.duration_since(last))
            .unwrap_or_default();
        self.last_frame = Some(now);

        session.pump_loads();
        self.orbit.update(&mut session.camera);
        self.scheduler.tick(elapsed, session, renderer);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(session) = self.session.as_mut() {
            session.stop_audio();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        if let Err(e) = self.init_window(event_loop) {
            self.error = Some(e);
            event_loop.exit();
            return;
        }

        if self.autostart {
            self.start_session();
        } else {
            log::info!("Click or press Enter/Space to start");
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        ..
                    },
                ..
            } => match code {
                KeyCode::Escape => self.shutdown(event_loop),
                KeyCode::Enter | KeyCode::NumpadEnter | KeyCode::Space => self.start_session(),
                _ => {}
            },
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                if self.session.is_none() {
                    if state == ElementState::Pressed {
                        self.start_session();
                    }
                } else {
                    self.orbit.set_dragging(state == ElementState::Pressed);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.orbit.cursor_moved(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_LINE) as f32,
                };
                self.orbit.scroll(lines);
            }
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::RedrawRequested => self.render_frame(),
            _ => {}
        }
    }
}

/// Drive a session without a window for `duration` of wall time
fn run_headless(config: &SessionConfig, duration: Duration) -> Result<()> {
    let mut session = Session::start(config, Collaborators::standard(config));
    let mut scheduler = FrameScheduler::new(&config.scheduler);
    let mut renderer =
        HeadlessRenderer::new(config.render.window_width, config.render.window_height);

    // Refresh at roughly 60 Hz
    let frame = Duration::from_micros(16_667);
    let deadline = Instant::now()
        .checked_add(duration)
        .context("Headless duration is too long")?;
    let mut last = Instant::now();

    while Instant::now() < deadline {
        thread::sleep(frame);
        let now = Instant::now();
        session.pump_loads();
        scheduler.tick(now.duration_since(last), &mut session, &mut renderer);
        last = now;
    }
    session.stop_audio();

    log::info!(
        "headless run: {} frames, {} logic updates, {} clip players, reactive {:?}, loads {:?}, {} triangles",
        renderer.frames(),
        scheduler.logic_updates(),
        session.clips().len(),
        session.reactive(),
        session.load_status(),
        renderer.last_triangles()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.session_config().map_err(|e| anyhow!(e))?;

    if let Some(duration) = args.headless_duration().map_err(|e| anyhow!(e))? {
        return run_headless(&config, duration);
    }

    log::info!("Beatstage - audio-reactive 3D stage");
    let mut app = App::new(config, args.autostart);
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
