//! In-process stand-in for the playback engine, used by tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::engine::backend::{Backend, Notify, RenderContext};
use crate::engine::error::{EngineError, Result};
use crate::engine::protocol::{ErrorCode, Event, Format, Value};

#[derive(Default)]
pub struct MockState {
    pub started: bool,
    pub destroyed: bool,
    pub options: Vec<(String, String)>,
    pub commands: Vec<Vec<String>>,
    pub properties: HashMap<String, Value>,
    pub observed: Vec<(u64, String, Format)>,
    pub log_level: Option<String>,
    pub rejected_options: HashSet<String>,
    pub rejected_commands: HashSet<String>,
    /// Options the engine accepts when queued but exits over at launch.
    pub refused_at_start: HashSet<String>,
    /// Options in effect when the engine last started.
    pub launch_options: Vec<(String, String)>,
    pub launches: usize,
    pub fail_start: bool,
    pub renders: Vec<(u32, u32)>,
    pub frame_ready: bool,
    pub render_released: bool,
    events: VecDeque<Event>,
    woken: bool,
}

/// Cloneable so a test can keep a handle after moving one into the engine.
#[derive(Clone, Default)]
pub struct MockBackend {
    pub state: Arc<Mutex<MockState>>,
    ready: Arc<Condvar>,
    update: Arc<Mutex<Option<Notify>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_event(&self, event: Event) {
        self.state.lock().events.push_back(event);
        self.ready.notify_all();
    }

    /// Queue several events atomically, so the pump sees them back to back.
    pub fn push_events(&self, events: impl IntoIterator<Item = Event>) {
        self.state.lock().events.extend(events);
        self.ready.notify_all();
    }

    pub fn reject_option(&self, name: &str) {
        self.state.lock().rejected_options.insert(name.to_string());
    }

    pub fn reject_command(&self, name: &str) {
        self.state.lock().rejected_commands.insert(name.to_string());
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.state.lock().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.state.lock().commands.clear();
    }

    /// Simulate the engine producing a frame.
    pub fn frame_ready(&self) {
        self.state.lock().frame_ready = true;
        if let Some(update) = self.update.lock().as_ref() {
            update();
        }
    }

    /// Wait until the engine has drained every queued event.
    pub fn wait_drained(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if self.state.lock().events.is_empty() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        false
    }
}

impl Backend for MockBackend {
    fn set_option(&self, name: &str, value: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.rejected_options.contains(name) {
            return Err(EngineError::rejected(ErrorCode::OptionNotFound, name));
        }
        state.options.push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn unset_option(&self, name: &str) {
        let mut state = self.state.lock();
        if !state.started {
            state.options.retain(|(queued, _)| queued != name);
        }
    }

    fn start(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_start {
            return Err(EngineError::Spawn(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "engine binary missing",
            )));
        }
        state.launches += 1;
        if state.options.iter().any(|(name, _)| state.refused_at_start.contains(name)) {
            return Err(EngineError::rejected(ErrorCode::OptionError, "engine exited with exit status: 1"));
        }
        state.launch_options = state.options.clone();
        state.started = true;
        Ok(())
    }

    fn command(&self, args: &[&str]) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(name) = args.first() {
            if state.rejected_commands.contains(*name) {
                return Err(EngineError::rejected(ErrorCode::InvalidParameter, *name));
            }
        }
        state.commands.push(args.iter().map(|a| a.to_string()).collect());
        Ok(())
    }

    fn command_string(&self, command: &str) -> Result<()> {
        let args = crate::engine::ipc::tokenize(command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.command(&refs)
    }

    fn get_property(&self, name: &str, format: Format) -> Result<Value> {
        self.state
            .lock()
            .properties
            .get(name)
            .map(|value| value.coerce(format))
            .ok_or_else(|| EngineError::rejected(ErrorCode::PropertyUnavailable, name))
    }

    fn set_property(&self, name: &str, value: Value) -> Result<()> {
        let observed = {
            let mut state = self.state.lock();
            if state.rejected_options.contains(name) {
                return Err(EngineError::rejected(ErrorCode::PropertyError, name));
            }
            state.properties.insert(name.to_string(), value.clone());
            state.observed.iter().any(|(_, observed, _)| observed == name)
        };
        if observed {
            self.push_event(Event::PropertyChange {
                name: name.to_string(),
                value,
            });
        }
        Ok(())
    }

    fn observe_property(&self, id: u64, name: &str, format: Format) -> Result<()> {
        self.state.lock().observed.push((id, name.to_string(), format));
        Ok(())
    }

    fn request_log_messages(&self, level: &str) -> Result<()> {
        self.state.lock().log_level = Some(level.to_string());
        Ok(())
    }

    fn wait_event(&self, timeout: Option<Duration>) -> Option<Event> {
        let mut state = self.state.lock();
        if state.events.is_empty() && !state.woken {
            match timeout {
                Some(timeout) => {
                    self.ready.wait_for(&mut state, timeout);
                }
                None => self.ready.wait(&mut state),
            }
        }
        state.woken = false;
        state.events.pop_front()
    }

    fn wakeup(&self) {
        self.state.lock().woken = true;
        self.ready.notify_all();
    }

    fn create_render_context(&self, update: Notify) -> Result<Box<dyn RenderContext>> {
        *self.update.lock() = Some(update);
        Ok(Box::new(MockRender {
            state: Arc::clone(&self.state),
        }))
    }

    fn destroy(&self) {
        let mut state = self.state.lock();
        state.destroyed = true;
        // The engine reports its own shutdown when destroyed while running.
        if !state.events.iter().any(|e| *e == Event::Shutdown) {
            state.events.push_back(Event::Shutdown);
        }
        drop(state);
        self.ready.notify_all();
    }
}

struct MockRender {
    state: Arc<Mutex<MockState>>,
}

impl RenderContext for MockRender {
    fn render(&mut self, width: u32, height: u32) {
        self.state.lock().renders.push((width, height));
    }

    fn update(&mut self) -> bool {
        std::mem::take(&mut self.state.lock().frame_ready)
    }
}

impl Drop for MockRender {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        // Must be released while the engine is still alive.
        assert!(!state.destroyed, "render context released after engine");
        state.render_released = true;
    }
}
