// =============================================================================
// WINDOW HOST
// =============================================================================
//
// Owns the winit event loop on the main thread. Each wake runs one frame-loop
// iteration (which drains Dispatch) and schedules the next wake; the frame
// signal nudges the loop early through an event-loop proxy.
//
// Shutdown is one way: CloseRequested asks the engine to quit, the engine's
// shutdown event closes the window, then teardown closes Dispatch and
// destroys the engine.
//
// =============================================================================

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use parking_lot::Mutex;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::keyboard::PhysicalKey;
use winit::raw_window_handle::{HasWindowHandle, RawWindowHandle};
use winit::window::{Fullscreen, Window, WindowBuilder, WindowLevel};

use crate::bridge::{Dispatch, FrameLoop, FramePolicy, FrameSignal, FrameSurface, UiState};
use crate::core::{AppConfig, OptionParser};
use crate::engine::{Engine, EngineState, IpcBackend, IpcConfig};
use crate::input::{Gesture, KeyAction, Translator};
use crate::player::{NativeDialogs, OsdOverlay, Player};
use crate::window::{Geometry, MonitorInfo, WindowOps};

pub const TITLE: &str = "glimpse";

/// Lines per wheel notch when the platform reports pixels.
const PIXELS_PER_LINE: f64 = 40.0;

#[derive(Debug, Clone, Copy)]
enum UserEvent {
    Wake,
}

/// The winit window seen through [`WindowOps`].
struct HostWindow {
    window: Arc<Window>,
    aspect: Mutex<Option<(u32, u32)>>,
    close_requested: AtomicBool,
}

impl HostWindow {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            aspect: Mutex::new(None),
            close_requested: AtomicBool::new(false),
        }
    }

    fn close_requested(&self) -> bool {
        self.close_requested.load(Ordering::Acquire)
    }

    /// Keep the client area at the locked aspect ratio after a user resize.
    fn enforce_aspect(&self, size: PhysicalSize<u32>) {
        let Some((w, h)) = *self.aspect.lock() else {
            return;
        };
        if w == 0 || size.width == 0 {
            return;
        }
        let height = (size.width as u64 * h as u64 / w as u64) as u32;
        if height != size.height {
            let _ = self.window.request_inner_size(PhysicalSize::new(size.width, height));
        }
    }
}

impl WindowOps for HostWindow {
    fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }

    fn position(&self) -> (i32, i32) {
        self.window
            .outer_position()
            .map(|p| (p.x, p.y))
            .unwrap_or((0, 0))
    }

    fn size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn set_position(&self, x: i32, y: i32) {
        self.window.set_outer_position(PhysicalPosition::new(x, y));
    }

    fn set_size(&self, width: u32, height: u32) {
        let _ = self.window.request_inner_size(PhysicalSize::new(width, height));
    }

    fn set_decorated(&self, decorated: bool) {
        self.window.set_decorations(decorated);
    }

    fn set_floating(&self, floating: bool) {
        self.window.set_window_level(if floating {
            WindowLevel::AlwaysOnTop
        } else {
            WindowLevel::Normal
        });
    }

    fn set_aspect_ratio(&self, ratio: Option<(u32, u32)>) {
        *self.aspect.lock() = ratio;
        if ratio.is_some() {
            self.enforce_aspect(self.window.inner_size());
        }
    }

    fn maximize(&self) {
        self.window.set_maximized(true);
    }

    fn iconify(&self) {
        self.window.set_minimized(true);
    }

    fn restore(&self) {
        self.window.set_minimized(false);
        self.window.set_maximized(false);
    }

    fn monitors(&self) -> Vec<MonitorInfo> {
        let primary = self.window.primary_monitor();
        self.window
            .available_monitors()
            .map(|monitor| {
                let position = monitor.position();
                let size = monitor.size();
                MonitorInfo {
                    name: monitor.name().unwrap_or_default(),
                    bounds: Geometry::new(position.x, position.y, size.width, size.height),
                    primary: primary.as_ref() == Some(&monitor),
                }
            })
            .collect()
    }

    fn is_fullscreen(&self) -> bool {
        self.window.fullscreen().is_some()
    }

    fn enter_fullscreen(&self, index: usize) {
        match self.window.available_monitors().nth(index) {
            Some(monitor) => self.window.set_fullscreen(Some(Fullscreen::Borderless(Some(monitor)))),
            None => log::warn!("Monitor {} disappeared before going fullscreen", index),
        }
    }

    fn exit_fullscreen(&self, restore: Geometry) {
        self.window.set_fullscreen(None);
        self.set_position(restore.x, restore.y);
        self.set_size(restore.width, restore.height);
    }

    fn begin_drag(&self) {
        if let Err(e) = self.window.drag_window() {
            log::debug!("Window drag unavailable: {}", e);
        }
    }

    fn request_close(&self) {
        self.close_requested.store(true, Ordering::Release);
    }

    fn update_platform_windows(&self) {
        // Only the main window exists in this host.
    }
}

/// The engine draws straight into the window it is embedded in, so the
/// frame loop only presents.
struct HostSurface {
    window: Arc<Window>,
}

impl FrameSurface for HostSurface {
    fn size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    fn draw_ui(&mut self) {}

    fn present(&mut self) {
        self.window.pre_present_notify();
    }
}

/// Native id the engine embeds its video output into; 0 lets it open its
/// own window.
fn native_window_id(window: &Window) -> u64 {
    let handle = match window.window_handle() {
        Ok(handle) => handle.as_raw(),
        Err(e) => {
            log::warn!("No native window handle: {}", e);
            return 0;
        }
    };
    match handle {
        RawWindowHandle::Xlib(h) => h.window as u64,
        RawWindowHandle::Xcb(h) => h.window.get() as u64,
        RawWindowHandle::Win32(h) => h.hwnd.get() as u64,
        other => {
            log::warn!("Cannot embed the engine in a {:?} window", other);
            0
        }
    }
}

fn key_action(event: &KeyEvent) -> KeyAction {
    match (event.state, event.repeat) {
        (ElementState::Pressed, true) => KeyAction::Repeat,
        (ElementState::Pressed, false) => KeyAction::Press,
        (ElementState::Released, _) => KeyAction::Release,
    }
}

fn button_action(state: ElementState) -> KeyAction {
    match state {
        ElementState::Pressed => KeyAction::Press,
        ElementState::Released => KeyAction::Release,
    }
}

/// Startup failures happen before the window is shown, so they get their
/// own dialog.
fn report_startup_failure(error: &anyhow::Error) {
    log::error!("{:#}", error);
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(TITLE)
        .set_description(format!("{:#}", error))
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

/// Open the window, start the player and run until the engine shuts down.
pub fn run(config: AppConfig, parser: OptionParser) -> anyhow::Result<()> {
    let event_loop = EventLoopBuilder::<UserEvent>::with_user_event()
        .build()
        .context("Failed to create event loop")?;

    let window = Arc::new(
        WindowBuilder::new()
            .with_title(TITLE)
            .with_inner_size(PhysicalSize::new(config.window.width, config.window.height))
            // Hidden until the engine is up; it still needs a native id.
            .with_visible(false)
            .build(&event_loop)
            .context("Failed to create window")?,
    );
    let host = Arc::new(HostWindow::new(Arc::clone(&window)));

    let signal = Arc::new(FrameSignal::new());
    let proxy = Mutex::new(event_loop.create_proxy());
    signal.set_waker(move || {
        // Fails only once the loop has exited.
        let _ = proxy.lock().send_event(UserEvent::Wake);
    });

    let context: Arc<dyn WindowOps> = host.clone();
    let dispatch = Arc::new(Dispatch::new(context, Arc::clone(&signal)));
    dispatch.bind_owner();
    let ui = Arc::new(UiState::default());

    let policy = FramePolicy::from(&config.frame);
    let viewports = config.window.viewports;
    let config = Arc::new(Mutex::new(config));

    let engine = Engine::new(IpcBackend::new(IpcConfig {
        wid: native_window_id(&window),
        ..IpcConfig::default()
    }));
    let render_signal = Arc::clone(&signal);
    engine.set_update_callback(move || render_signal.notify_render());

    let mut player = Player::new(
        engine,
        Arc::clone(&dispatch),
        Arc::clone(&ui),
        Arc::clone(&config),
        TITLE,
        Arc::new(NativeDialogs),
    );
    player.persist_to(AppConfig::config_path());
    player.set_overlay(Arc::new(OsdOverlay::new(player.client())));
    if let Err(e) = player.init(&parser) {
        let error = anyhow::Error::new(e).context("Failed to start the playback engine");
        report_startup_failure(&error);
        return Err(error);
    }
    window.set_visible(true);

    let mut translator = Translator::new(player.client());
    let mut frame = FrameLoop::new(Arc::clone(&dispatch), Arc::clone(&ui), signal, policy, viewports);
    let mut surface = HostSurface {
        window: Arc::clone(&window),
    };
    let mut dropped: Vec<PathBuf> = Vec::new();
    let mut player = Some(player);

    log::info!("Window ready, entering event loop");
    event_loop
        .run(move |event, target| {
            let Some(active) = player.as_mut() else {
                return;
            };
            match event {
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::CloseRequested => active.shutdown(),
                    WindowEvent::Resized(size) => {
                        host.enforce_aspect(size);
                        active.engine().request_render();
                    }
                    WindowEvent::ModifiersChanged(modifiers) => translator.set_modifiers(modifiers.state()),
                    WindowEvent::KeyboardInput { event, .. } => {
                        frame.note_input();
                        if let PhysicalKey::Code(code) = event.physical_key {
                            translator.key(code, key_action(&event));
                        }
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        frame.note_input();
                        if state == ElementState::Released {
                            ui.set_dragging(false);
                        }
                        translator.mouse_button(button, button_action(state));
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        frame.note_input();
                        if translator.cursor(position.x, position.y) == Some(Gesture::BeginDrag) {
                            ui.set_dragging(true);
                            host.begin_drag();
                        }
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        frame.note_input();
                        let (dx, dy) = match delta {
                            MouseScrollDelta::LineDelta(x, y) => (x as f64, y as f64),
                            MouseScrollDelta::PixelDelta(p) => (p.x / PIXELS_PER_LINE, p.y / PIXELS_PER_LINE),
                        };
                        translator.scroll(dx, dy);
                    }
                    WindowEvent::DroppedFile(path) => dropped.push(path),
                    _ => {}
                },
                Event::UserEvent(UserEvent::Wake) => {}
                Event::AboutToWait => {
                    if !dropped.is_empty() {
                        translator.drop_files(&std::mem::take(&mut dropped));
                    }

                    let report = frame.iterate(active.engine(), &mut surface);
                    log::trace!(
                        "Frame: {} jobs, video {}, ui {}, platform windows {}",
                        report.jobs,
                        report.video,
                        report.ui,
                        report.platform_windows
                    );

                    let stopped = active.engine().state() == EngineState::Stopped;
                    if host.close_requested() || stopped {
                        log::info!("Tearing down");
                        dispatch.close();
                        if let Some(mut finished) = player.take() {
                            finished.destroy();
                        }
                        target.exit();
                        return;
                    }
                    target.set_control_flow(ControlFlow::WaitUntil(Instant::now() + frame.timeout()));
                }
                Event::LoopExiting => {
                    dispatch.close();
                    if let Some(mut finished) = player.take() {
                        finished.destroy();
                    }
                }
                _ => {}
            }
        })
        .context("Event loop failed")?;

    Ok(())
}

