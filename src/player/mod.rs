// =============================================================================
// PLAYER
// =============================================================================
//
// Wires the engine to the window. Every handler registered here runs on the
// engine's event-pump thread: engine calls are made directly, anything that
// touches the window is handed to Dispatch.
//
// =============================================================================

pub mod dialogs;
pub mod osd;


use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::bridge::{Dispatch, UiState};
use crate::core::{defaults, paths, AppConfig, OptionParser};
use crate::engine::{Engine, EngineClient, Event, EventKind, Result};
use crate::window::{select_monitor, Geometry, WindowOps};

pub use dialogs::{Dialogs, NativeDialogs};
pub use osd::OsdOverlay;

/// Receives client messages the player does not handle itself.
pub trait Overlay: Send + Sync {
    fn client_message(&self, args: &[String]);
}

struct Context {
    client: EngineClient,
    dispatch: Arc<Dispatch<dyn WindowOps>>,
    ui: Arc<UiState>,
    config: Arc<Mutex<AppConfig>>,
    config_path: RwLock<Option<PathBuf>>,
    title: String,
    dialogs: Arc<dyn Dialogs>,
    overlay: RwLock<Option<Arc<dyn Overlay>>>,
    closing: AtomicBool,
    windowed: Mutex<Option<Geometry>>,
}

impl Context {
    fn send(&self, args: &[&str]) {
        if let Err(e) = self.client.commandv(args) {
            log::warn!("Command {:?} failed ({}): {}", args, e.status(), e);
        }
    }

    fn send_line(&self, command: &str) {
        if let Err(e) = self.client.command(command) {
            log::warn!("Command '{}' failed ({}): {}", command, e.status(), e);
        }
    }

    fn persist(&self, config: &AppConfig) {
        if let Some(config_path) = self.config_path.read().as_ref() {
            if let Err(e) = config.save_to(config_path) {
                log::warn!("Failed to save recent files: {}", e);
            }
        }
    }

    fn request_close(&self) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }
        log::info!("Engine shut down, closing window");
        self.dispatch.submit(|window| window.request_close());
    }

    fn video_size(&self) -> Option<(u32, u32)> {
        let width = self.client.property::<i64>("dwidth");
        let height = self.client.property::<i64>("dheight");
        (width > 0 && height > 0).then_some((width as u32, height as u32))
    }

    fn video_reconfig(&self) {
        let Some((width, height)) = self.video_size() else {
            return;
        };
        let keep_aspect = self.client.property::<bool>("keepaspect-window");
        self.dispatch.submit(move |window| {
            let (x, y) = window.position();
            let (w, h) = window.size();
            window.set_size(width, height);
            window.set_position(x + (w as i32 - width as i32) / 2, y + (h as i32 - height as i32) / 2);
            if keep_aspect {
                window.set_aspect_ratio(Some((width, height)));
            }
        });
    }

    fn file_loaded(&self) {
        let path = self.client.property_string("path");
        if path.is_empty() || path == "bd://" || path == "dvd://" {
            return;
        }
        let title = self.client.property_string("media-title");
        let mut config = self.config.lock();
        config.recent.add(&path, &title);
        self.persist(&config);
    }

    fn client_message(&self, args: &[String]) {
        self.ui.set_ui_suspended(true);
        self.route_message(args);
        self.ui.set_ui_suspended(false);
    }

    fn route_message(&self, args: &[String]) {
        let Some(name) = args.first() else {
            return;
        };
        match name.as_str() {
            "play-pause" => self.play_pause(),
            "open" => {
                let files = self.modal(|dialogs| dialogs.pick_media());
                for (index, path) in files.iter().enumerate() {
                    let mode = if index > 0 { "append-play" } else { "replace" };
                    self.send(&["loadfile", &path.to_string_lossy(), mode]);
                }
            }
            "open-sub" => {
                let files = self.modal(|dialogs| dialogs.pick_subtitles());
                for (index, path) in files.iter().enumerate() {
                    let mode = if index > 0 { "auto" } else { "select" };
                    self.send(&["sub-add", &path.to_string_lossy(), mode]);
                }
            }
            "open-folder" => {
                if let Some(folder) = self.modal(|dialogs| dialogs.pick_folder()) {
                    self.send(&["loadfile", &folder.to_string_lossy(), "replace"]);
                }
            }
            "clear-recent" => {
                let mut config = self.config.lock();
                config.recent.clear();
                self.persist(&config);
            }
            "quit" => self.send_line("quit"),
            _ => match self.overlay.read().as_ref() {
                Some(overlay) => overlay.client_message(args),
                None => log::debug!("Unhandled client message: {:?}", args),
            },
        }
    }

    fn play_pause(&self) {
        if !self.client.idle() {
            self.send(&["cycle", "pause"]);
            return;
        }
        let latest = self.config.lock().recent.latest().map(|f| f.path.clone());
        match latest {
            Some(path) => self.send(&["loadfile", &path]),
            None => log::debug!("Nothing to play"),
        }
    }

    /// Run a native dialog on the window thread. The platform-window step is
    /// skipped while it is open.
    fn modal<R, F>(&self, pick: F) -> R
    where
        R: Default + Send + 'static,
        F: FnOnce(&dyn Dialogs) -> R + Send + 'static,
    {
        let dialogs = Arc::clone(&self.dialogs);
        let ui = Arc::clone(&self.ui);
        self.dispatch
            .sync(move |_| {
                ui.set_modal_open(true);
                let picked = pick(dialogs.as_ref());
                ui.set_modal_open(false);
                picked
            })
            .unwrap_or_default()
    }

    fn idle_changed(&self, idle: bool) {
        if !idle {
            return;
        }
        let title = self.title.clone();
        self.dispatch.submit(move |window| {
            window.set_title(&title);
            window.set_aspect_ratio(None);
        });
    }

    fn window_scale(&self, scale: f64) {
        if let Some((width, height)) = self.video_size() {
            let (width, height) = ((width as f64 * scale) as u32, (height as f64 * scale) as u32);
            self.dispatch.submit(move |window| window.set_size(width, height));
        }
    }
}

fn set_fullscreen(window: &dyn WindowOps, windowed: &Mutex<Option<Geometry>>, enable: bool) {
    if window.is_fullscreen() == enable {
        return;
    }
    if enable {
        let geometry = window.geometry();
        let monitors = window.monitors();
        let Some(index) = select_monitor(&geometry, &monitors) else {
            log::warn!("No monitor available for fullscreen");
            return;
        };
        log::debug!("Fullscreen on monitor {}", monitors[index].name);
        *windowed.lock() = Some(geometry);
        window.enter_fullscreen(index);
    } else {
        let restore = windowed.lock().take().unwrap_or_else(|| window.geometry());
        window.exit_fullscreen(restore);
    }
}

pub struct Player {
    engine: Engine,
    context: Arc<Context>,
}

impl Player {
    pub fn new(
        engine: Engine,
        dispatch: Arc<Dispatch<dyn WindowOps>>,
        ui: Arc<UiState>,
        config: Arc<Mutex<AppConfig>>,
        title: &str,
        dialogs: Arc<dyn Dialogs>,
    ) -> Self {
        let context = Arc::new(Context {
            client: engine.client(),
            dispatch,
            ui,
            config,
            config_path: RwLock::new(None),
            title: title.to_string(),
            dialogs,
            overlay: RwLock::new(None),
            closing: AtomicBool::new(false),
            windowed: Mutex::new(None),
        });
        Self { engine, context }
    }

    /// Persist config changes (recent files) to `path`.
    pub fn persist_to(&self, path: PathBuf) {
        *self.context.config_path.write() = Some(path);
    }

    pub fn set_overlay(&self, overlay: Arc<dyn Overlay>) {
        *self.context.overlay.write() = Some(overlay);
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn client(&self) -> EngineClient {
        self.engine.client()
    }

    /// Configure and start the engine, then queue the command-line paths.
    pub fn init(&mut self, parser: &OptionParser) -> Result<()> {
        let config = self.context.config.lock().clone();

        self.engine.option("config", "yes");
        self.engine.option("osc", "yes");
        self.engine.option("input-default-bindings", "yes");
        self.engine.option("input-vo-keyboard", "yes");
        self.engine.option("osd-playing-msg", "${media-title}");
        self.engine.option("screenshot-directory", "~~desktop/");

        if !config.mpv.use_config {
            let dir = paths::data_dir();
            if let Err(e) = defaults::materialize(&dir) {
                log::warn!("{}", e);
            }
            self.engine.option("config-dir", &dir.to_string_lossy());
        }

        for (key, value) in &parser.options {
            self.engine.user_option(key, value);
        }
        self.engine.request_log(&config.mpv.log_level);

        self.observe()?;
        self.engine.init()?;

        let client = self.engine.client();
        if let Err(e) = client.set_property("volume", config.mpv.volume) {
            log::warn!("Failed to restore volume: {}", e);
        }
        if config.recent.space_to_play_last {
            self.context
                .send_line("keybind SPACE 'script-message-to glimpse play-pause'");
        }
        for path in &parser.paths {
            if path == "-" {
                if let Err(e) = client.set_property("input-terminal", "yes") {
                    log::warn!("Failed to enable terminal input: {}", e);
                }
            }
            self.context.send(&["loadfile", path, "append-play"]);
        }
        Ok(())
    }

    fn observe(&mut self) -> Result<()> {
        let engine = &mut self.engine;

        let ctx = Arc::clone(&self.context);
        engine.observe_event(EventKind::Shutdown, move |_| ctx.request_close())?;

        let ctx = Arc::clone(&self.context);
        engine.observe_event(EventKind::VideoReconfig, move |_| ctx.video_reconfig())?;

        let ctx = Arc::clone(&self.context);
        engine.observe_event(EventKind::FileLoaded, move |_| ctx.file_loaded())?;

        let ctx = Arc::clone(&self.context);
        engine.observe_event(EventKind::ClientMessage, move |event| {
            if let Event::ClientMessage(args) = event {
                ctx.client_message(args);
            }
        })?;

        let ctx = Arc::clone(&self.context);
        engine.observe_property::<bool, _>("idle-active", move |idle| ctx.idle_changed(idle))?;

        let ctx = Arc::clone(&self.context);
        engine.observe_property::<String, _>("media-title", move |title| {
            ctx.dispatch.submit(move |window| window.set_title(&title));
        })?;

        let ctx = Arc::clone(&self.context);
        engine.observe_property::<bool, _>("border", move |border| {
            ctx.dispatch.submit(move |window| window.set_decorated(border));
        })?;

        let ctx = Arc::clone(&self.context);
        engine.observe_property::<bool, _>("ontop", move |ontop| {
            ctx.dispatch.submit(move |window| window.set_floating(ontop));
        })?;

        let ctx = Arc::clone(&self.context);
        engine.observe_property::<bool, _>("window-maximized", move |maximized| {
            ctx.dispatch.submit(move |window| {
                if maximized {
                    window.maximize();
                } else {
                    window.restore();
                }
            });
        })?;

        let ctx = Arc::clone(&self.context);
        engine.observe_property::<bool, _>("window-minimized", move |minimized| {
            ctx.dispatch.submit(move |window| {
                if minimized {
                    window.iconify();
                } else {
                    window.restore();
                }
            });
        })?;

        let ctx = Arc::clone(&self.context);
        engine.observe_property::<f64, _>("window-scale", move |scale| ctx.window_scale(scale))?;

        let ctx = Arc::clone(&self.context);
        engine.observe_property::<bool, _>("fullscreen", move |enable| {
            let windowed = Arc::clone(&ctx);
            ctx.dispatch
                .submit(move |window| set_fullscreen(window, &windowed.windowed, enable));
        })?;

        Ok(())
    }

    /// Ask the engine to quit, saving the position when configured to.
    pub fn shutdown(&self) {
        let watch_later = self.context.config.lock().mpv.watch_later;
        self.context
            .send_line(if watch_later { "quit-watch-later" } else { "quit" });
    }

    pub fn destroy(&mut self) {
        self.engine.destroy();
    }
}
