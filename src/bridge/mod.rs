//! Cross-thread plumbing between the engine's event pump and the UI thread.

pub mod dispatch;
pub mod frame_loop;
pub mod signal;


pub use dispatch::Dispatch;
pub use frame_loop::{FrameLoop, FramePolicy, FrameSurface, UiState};
pub use signal::FrameSignal;
