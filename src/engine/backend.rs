use std::time::Duration;

use crate::engine::error::Result;
use crate::engine::protocol::{Event, Format, Value};

/// Callback the engine invokes (from its own threads) when something needs
/// the attention of another thread.
pub type Notify = Box<dyn Fn() + Send + Sync>;

/// Raw access to one playback engine instance.
///
/// Implementations are shared between the UI thread and the event-pump
/// thread, so every method takes `&self`. Only the event-pump thread calls
/// [`Backend::wait_event`].
pub trait Backend: Send + Sync {
    /// Queue an option. Before [`Backend::start`] this only records it for
    /// launch; afterwards it is applied immediately.
    fn set_option(&self, name: &str, value: &str) -> Result<()>;

    /// Withdraw an option queued for launch. No effect once started.
    fn unset_option(&self, name: &str);

    /// Bring the engine into its running state. Fails with
    /// [`ErrorCode::OptionError`](crate::engine::protocol::ErrorCode) when the
    /// engine refuses its launch options; `start` may then be retried.
    fn start(&self) -> Result<()>;

    fn command(&self, args: &[&str]) -> Result<()>;

    fn command_string(&self, command: &str) -> Result<()>;

    fn get_property(&self, name: &str, format: Format) -> Result<Value>;

    fn set_property(&self, name: &str, value: Value) -> Result<()>;

    fn observe_property(&self, id: u64, name: &str, format: Format) -> Result<()>;

    fn request_log_messages(&self, level: &str) -> Result<()>;

    /// Block for up to `timeout` (`None` = indefinitely) for the next event.
    /// Returns `None` on timeout or after [`Backend::wakeup`].
    fn wait_event(&self, timeout: Option<Duration>) -> Option<Event>;

    /// Interrupt a pending [`Backend::wait_event`].
    fn wakeup(&self);

    /// Create the render context bound to the current graphics surface.
    /// `update` fires whenever the engine has a new frame to present.
    fn create_render_context(&self, update: Notify) -> Result<Box<dyn RenderContext>>;

    /// Tear the engine down. Called after the render context is dropped.
    fn destroy(&self);
}

/// The engine's handle on the window surface. Dropping it releases it.
pub trait RenderContext: Send {
    fn render(&mut self, width: u32, height: u32);

    /// Whether a new frame is waiting to be rendered. Clears the flag.
    fn update(&mut self) -> bool;
}
