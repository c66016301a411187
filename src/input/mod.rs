pub mod keymap;
pub mod translate;


pub use keymap::KeyAction;
pub use translate::{Gesture, Translator};

#[cfg(test)]
pub use translate::CommandSink;
