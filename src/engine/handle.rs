// =============================================================================
// ENGINE HANDLE
// =============================================================================
//
// Owns one playback engine instance, its render context and the event-pump
// thread. Two threads touch it:
//
// - the UI thread: init, render, teardown, and any command/property call
// - the event-pump thread: blocks in `wait_event` and fans events out to the
//   subscription table registered before init
//
// Handlers run on the event-pump thread. They must not block on the UI thread
// and must not touch window resources directly; that goes through Dispatch.
//
// =============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::engine::backend::{Backend, RenderContext};
use crate::engine::cache::{PropertyCache, OBSERVED};
use crate::engine::error::{EngineError, Result};
use crate::engine::protocol::{ErrorCode, Event, EventKind, Format, PropertyValue, Value};

type EventHandler = Box<dyn Fn(&Event) + Send + Sync>;
type PropertyHandler = Box<dyn Fn(&Value) + Send + Sync>;
type UpdateCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Running,
    ShutdownRequested,
    Stopped,
}

/// Where a queued option came from. Built-in options are mandatory; a user
/// option the engine rejects is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionSource {
    Builtin,
    User,
}

#[derive(Default)]
struct Subscriptions {
    events: Vec<(EventKind, EventHandler)>,
    properties: Vec<(String, Format, PropertyHandler)>,
}

struct Shared {
    backend: Box<dyn Backend>,
    cache: RwLock<PropertyCache>,
    state: Mutex<EngineState>,
    render_pending: AtomicBool,
    destroyed: AtomicBool,
    on_update: RwLock<Option<UpdateCallback>>,
}

impl Shared {
    fn state(&self) -> EngineState {
        *self.state.lock()
    }

    fn set_state(&self, state: EngineState) {
        let mut current = self.state.lock();
        if *current != state {
            log::debug!("Engine state {:?} -> {:?}", *current, state);
            *current = state;
        }
    }

    fn notify_update(&self) {
        self.render_pending.store(true, Ordering::Release);
        if let Some(cb) = self.on_update.read().as_ref() {
            cb();
        }
    }

    /// Block for one event and hand it to every matching handler.
    /// Returns `false` once the pump should stop.
    fn wait_event(&self, subs: &Subscriptions, timeout: Option<Duration>) -> bool {
        let state = self.state();
        let timeout = if state == EngineState::ShutdownRequested {
            Some(Duration::ZERO)
        } else {
            timeout
        };

        match self.backend.wait_event(timeout) {
            Some(event) => {
                self.deliver(subs, &event);
                true
            }
            // Spurious wake or timeout: keep going unless we are winding down
            // and the queue is empty.
            None => state == EngineState::Running && !self.destroyed.load(Ordering::Acquire),
        }
    }

    fn deliver(&self, subs: &Subscriptions, event: &Event) {
        match event {
            Event::Shutdown => {
                if self.state() == EngineState::Running {
                    self.set_state(EngineState::ShutdownRequested);
                }
            }
            Event::LogMessage(msg) => {
                let target = format!("engine/{}", msg.prefix);
                log::log!(target: target.as_str(), msg.log_level(), "{}", msg.text.trim_end());
            }
            Event::PropertyChange { name, value } => {
                if let Some((_, format)) = OBSERVED.iter().find(|(observed, _)| observed == name) {
                    self.cache.write().apply(name, &value.coerce(*format));
                }
                for (prop, format, handler) in &subs.properties {
                    if prop == name {
                        handler(&value.coerce(*format));
                    }
                }
            }
            _ => {}
        }

        let kind = event.kind();
        for (_, handler) in subs.events.iter().filter(|(k, _)| *k == kind) {
            handler(event);
        }
    }
}

/// Cheap, cloneable access to a running engine: commands, properties and the
/// cached property snapshot. Safe to capture in event handlers.
#[derive(Clone)]
pub struct EngineClient {
    shared: Arc<Shared>,
}

impl EngineClient {
    /// Send a command given as a single string, tokenized by the engine.
    pub fn command(&self, command: &str) -> Result<()> {
        log::debug!("Engine command: {}", command);
        self.shared.backend.command_string(command)
    }

    /// Send a command given as separate arguments.
    pub fn commandv(&self, args: &[&str]) -> Result<()> {
        log::debug!("Engine command: {:?}", args);
        self.shared.backend.command(args)
    }

    /// String value of a property; empty when the property is absent.
    pub fn property_string(&self, name: &str) -> String {
        match self.shared.backend.get_property(name, Format::String) {
            Ok(value) => String::from_value(&value.coerce(Format::String)).unwrap_or_default(),
            Err(e) => {
                log::trace!("Property {} unavailable: {}", name, e);
                String::new()
            }
        }
    }

    /// Typed value of a property; the type's zero value when absent.
    pub fn property<T: PropertyValue + Default>(&self, name: &str) -> T {
        match self.shared.backend.get_property(name, T::FORMAT) {
            Ok(value) => T::decode(&value.coerce(T::FORMAT)),
            Err(e) => {
                log::trace!("Property {} unavailable: {}", name, e);
                T::default()
            }
        }
    }

    pub fn set_property(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.shared.backend.set_property(name, value.into())
    }

    pub fn cache(&self) -> RwLockReadGuard<'_, PropertyCache> {
        self.shared.cache.read()
    }

    pub fn paused(&self) -> bool {
        self.cache().paused()
    }

    pub fn playing(&self) -> bool {
        self.cache().playing()
    }

    pub fn idle(&self) -> bool {
        self.cache().idle
    }

    pub fn force_window(&self) -> bool {
        self.cache().force_window
    }

    pub fn allow_drag(&self) -> bool {
        self.cache().allow_drag()
    }

    /// Mark a new frame as ready and wake whoever renders.
    pub fn request_render(&self) {
        self.shared.notify_update();
    }

    pub fn state(&self) -> EngineState {
        self.shared.state()
    }
}

pub struct Engine {
    client: EngineClient,
    subscriptions: Option<Subscriptions>,
    observed: Vec<(String, Format)>,
    options: Vec<(String, String, OptionSource)>,
    log_level: Option<String>,
    wait_timeout: Option<Duration>,
    render: Mutex<Option<Box<dyn RenderContext>>>,
    pump: Option<thread::JoinHandle<()>>,
}

impl Engine {
    pub fn new(backend: impl Backend + 'static) -> Self {
        let shared = Arc::new(Shared {
            backend: Box::new(backend),
            cache: RwLock::new(PropertyCache::default()),
            state: Mutex::new(EngineState::Uninitialized),
            render_pending: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            on_update: RwLock::new(None),
        });

        Self {
            client: EngineClient { shared },
            subscriptions: Some(Subscriptions::default()),
            observed: Vec::new(),
            options: Vec::new(),
            log_level: None,
            wait_timeout: None,
            render: Mutex::new(None),
            pump: None,
        }
    }

    pub fn client(&self) -> EngineClient {
        self.client.clone()
    }

    pub fn state(&self) -> EngineState {
        self.client.state()
    }

    /// Queue a mandatory option, applied during [`Engine::init`].
    pub fn option(&mut self, name: &str, value: &str) {
        self.options.push((name.to_string(), value.to_string(), OptionSource::Builtin));
    }

    /// Queue a user-supplied option. Rejection skips it.
    pub fn user_option(&mut self, name: &str, value: &str) {
        self.options.push((name.to_string(), value.to_string(), OptionSource::User));
    }

    pub fn request_log(&mut self, level: &str) {
        self.log_level = Some(level.to_string());
    }

    /// How long each `wait_event` blocks; `None` waits indefinitely.
    #[cfg(test)]
    pub fn set_wait_timeout(&mut self, timeout: Option<Duration>) {
        self.wait_timeout = timeout;
    }

    /// Called (from engine threads) whenever a new frame should be rendered.
    pub fn set_update_callback(&self, cb: impl Fn() + Send + Sync + 'static) {
        *self.client.shared.on_update.write() = Some(Arc::new(cb));
    }

    pub fn observe_event(&mut self, kind: EventKind, handler: impl Fn(&Event) + Send + Sync + 'static) -> Result<()> {
        let subs = self.subscriptions.as_mut().ok_or(EngineError::SubscriptionsFrozen)?;
        subs.events.push((kind, Box::new(handler)));
        Ok(())
    }

    pub fn observe_property<T, F>(&mut self, name: &str, handler: F) -> Result<()>
    where
        T: PropertyValue + Default,
        F: Fn(T) + Send + Sync + 'static,
    {
        let subs = self.subscriptions.as_mut().ok_or(EngineError::SubscriptionsFrozen)?;
        subs.properties.push((
            name.to_string(),
            T::FORMAT,
            Box::new(move |value: &Value| handler(T::decode(value))),
        ));
        if !self.observed.iter().any(|(observed, _)| observed == name) {
            self.observed.push((name.to_string(), T::FORMAT));
        }
        Ok(())
    }

    /// Apply queued options, start the engine and its render context, register
    /// observations and spawn the event pump.
    pub fn init(&mut self) -> Result<()> {
        let subs = self.subscriptions.take().ok_or(EngineError::SubscriptionsFrozen)?;
        let shared = Arc::clone(&self.client.shared);

        // Every option is queued before start so startup-only ones (config
        // dir, includes, input config) take effect. A user option refused
        // here is skipped; a refused built-in aborts.
        for (name, value, _) in self.options.iter().filter(|(_, _, src)| *src == OptionSource::Builtin) {
            if let Err(e) = shared.backend.set_option(name, value) {
                log::error!("Engine rejected option {}={}: {}", name, value, e);
                return Err(EngineError::Option {
                    name: name.clone(),
                    value: value.clone(),
                    code: e.code().unwrap_or(ErrorCode::OptionError),
                });
            }
        }
        let mut user = Vec::new();
        for (name, value, _) in self.options.iter().filter(|(_, _, src)| *src == OptionSource::User) {
            match shared.backend.set_option(name, value) {
                Ok(()) => user.push((name.clone(), value.clone())),
                Err(e) => log::warn!("Skipping option {}={}: {}", name, value, e),
            }
        }

        start_without_refused(&*shared.backend, user)?;

        if let Some(level) = &self.log_level {
            if let Err(e) = shared.backend.request_log_messages(level) {
                log::warn!("Engine log messages unavailable: {}", e);
            }
        }

        let notify_shared = Arc::clone(&shared);
        let render = shared
            .backend
            .create_render_context(Box::new(move || notify_shared.notify_update()))?;
        *self.render.lock() = Some(render);

        let mut next_id = 1u64;
        let table = OBSERVED
            .iter()
            .map(|(name, format)| (name.to_string(), *format))
            .chain(self.observed.iter().cloned())
            .collect::<Vec<_>>();
        let mut seen: Vec<&str> = Vec::new();
        for (name, format) in &table {
            if seen.contains(&name.as_str()) {
                continue;
            }
            seen.push(name);
            if let Err(e) = shared.backend.observe_property(next_id, name, *format) {
                log::warn!("Cannot observe property {}: {}", name, e);
            }
            next_id += 1;
        }

        shared.set_state(EngineState::Running);

        let timeout = self.wait_timeout;
        let pump_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("engine-events".to_string())
            .spawn(move || {
                log::debug!("Event pump started");
                while pump_shared.wait_event(&subs, timeout) {}
                pump_shared.set_state(EngineState::Stopped);
                log::debug!("Event pump stopped");
            })
            .map_err(EngineError::Spawn)?;
        self.pump = Some(handle);

        log::info!("Engine initialized");
        Ok(())
    }

    /// Render the current video frame into the bound surface.
    pub fn render(&self, width: u32, height: u32) {
        if let Some(ctx) = self.render.lock().as_mut() {
            ctx.render(width, height);
        }
    }

    /// Whether the engine asked for a new frame since the last call.
    pub fn want_render(&self) -> bool {
        let requested = self.client.shared.render_pending.swap(false, Ordering::AcqRel);
        let pending = self.render.lock().as_mut().map(|ctx| ctx.update()).unwrap_or(false);
        requested || pending
    }

    pub fn request_render(&self) {
        self.client.request_render();
    }

    /// Release the render context, then the engine, then join the pump.
    pub fn destroy(&mut self) {
        if let Some(ctx) = self.render.lock().take() {
            drop(ctx);
            log::debug!("Render context released");
        }

        let shared = &self.client.shared;
        if !shared.destroyed.swap(true, Ordering::AcqRel) {
            shared.backend.destroy();
            shared.backend.wakeup();
        }

        if let Some(handle) = self.pump.take() {
            if handle.join().is_err() {
                log::error!("Event pump thread panicked");
            }
        }
        shared.set_state(EngineState::Stopped);
        log::info!("Engine destroyed");
    }
}

/// Start the engine. When it refuses to come up over an option, user options
/// are withdrawn newest first and the launch retried; the engine does not say
/// which option it choked on. Built-in options are never withdrawn.
fn start_without_refused(backend: &dyn Backend, mut user: Vec<(String, String)>) -> Result<()> {
    loop {
        match backend.start() {
            Ok(()) => return Ok(()),
            Err(e) if e.code() == Some(ErrorCode::OptionError) => {
                let Some((name, value)) = user.pop() else {
                    return Err(e);
                };
                log::warn!("Engine refused to start ({}), relaunching without option {}={}", e, name, value);
                backend.unset_option(&name);
            }
            Err(e) => return Err(e),
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.pump.is_some() || self.render.lock().is_some() {
            self.destroy();
        }
    }
}
