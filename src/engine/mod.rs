pub mod backend;
pub mod cache;
pub mod error;
pub mod handle;
pub mod ipc;
pub mod protocol;

#[cfg(test)]
pub mod mock;
#[cfg(test)]
mod tests;

pub use error::Result;
pub use handle::{Engine, EngineClient, EngineState};
pub use ipc::{IpcBackend, IpcConfig};
pub use protocol::{Event, EventKind};

#[cfg(test)]
pub use error::EngineError;
#[cfg(test)]
pub use protocol::{ErrorCode, Format, LogMessage, Value};
