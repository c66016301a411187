use std::path::{Path, PathBuf};

use winit::event::MouseButton;
use winit::keyboard::{KeyCode, ModifiersState};

use crate::engine::{EngineClient, Result};
use crate::input::keymap::{modifier_tokens, KeyAction, ACTIONS, BUTTONS, KEYS, SHIFT_KEYS, SUBTITLE_EXTENSIONS};

/// Pixels the cursor must travel with the left button held before a click
/// becomes a window drag.
pub const DRAG_THRESHOLD: f64 = 4.0;

/// Where translated commands go.
pub trait CommandSink {
    fn commandv(&self, args: &[&str]) -> Result<()>;

    /// Whether a left-button drag may move the window.
    fn allow_drag(&self) -> bool {
        false
    }
}

impl CommandSink for EngineClient {
    fn commandv(&self, args: &[&str]) -> Result<()> {
        EngineClient::commandv(self, args)
    }

    fn allow_drag(&self) -> bool {
        EngineClient::allow_drag(self)
    }
}

/// Something the host has to act on after an input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    BeginDrag,
}

/// `(command, chord)` for a key event, or `None` when it has no mapping.
pub fn key_chord(code: KeyCode, action: KeyAction, mut mods: ModifiersState) -> Option<(&'static str, String)> {
    let command = *ACTIONS.get(&action)?;

    let mut name = None;
    if mods.shift_key() {
        if let Some(shifted) = SHIFT_KEYS.get(&code) {
            name = Some(*shifted);
            mods.remove(ModifiersState::SHIFT);
        }
    }
    let name = match name {
        Some(name) => name,
        None => *KEYS.get(&code)?,
    };

    Some((command, chord(mods, name)))
}

pub fn button_chord(button: MouseButton, action: KeyAction, mods: ModifiersState) -> Option<(&'static str, String)> {
    let command = *ACTIONS.get(&action)?;
    let name = *BUTTONS.get(&button)?;
    Some((command, chord(mods, name)))
}

fn chord(mods: ModifiersState, name: &str) -> String {
    let mut keys = modifier_tokens(mods);
    keys.push(name);
    keys.join("+")
}

/// Wheel key names for a scroll delta: horizontal first, then vertical.
pub fn wheel_keys(dx: f64, dy: f64) -> Vec<&'static str> {
    let mut keys = Vec::new();
    if dx != 0.0 {
        keys.push(if dx > 0.0 { "WHEEL_LEFT" } else { "WHEEL_RIGHT" });
    }
    if dy != 0.0 {
        keys.push(if dy > 0.0 { "WHEEL_UP" } else { "WHEEL_DOWN" });
    }
    keys
}

pub fn is_subtitle(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUBTITLE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Engine commands for a batch of dropped paths, in the order they run.
///
/// Paths are sorted first. The first subtitle is selected, later ones are
/// only added; the first media file replaces playback, later ones append.
pub fn drop_commands(paths: &[PathBuf]) -> Vec<Vec<String>> {
    let mut sorted: Vec<String> = paths.iter().map(|p| p.to_string_lossy().into_owned()).collect();
    sorted.sort();

    let mut subtitles = 0;
    let mut media = 0;
    sorted
        .into_iter()
        .map(|path| {
            if is_subtitle(Path::new(&path)) {
                subtitles += 1;
                let mode = if subtitles > 1 { "auto" } else { "select" };
                vec!["sub-add".to_string(), path, mode.to_string()]
            } else {
                media += 1;
                let mode = if media > 1 { "append-play" } else { "replace" };
                vec!["loadfile".to_string(), path, mode.to_string()]
            }
        })
        .collect()
}

/// Turns window input into engine commands. Holds the little state input
/// needs: current modifiers and a pending left-button press.
pub struct Translator<S> {
    sink: S,
    mods: ModifiersState,
    cursor: (f64, f64),
    pressed_at: Option<(f64, f64)>,
}

impl<S: CommandSink> Translator<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            mods: ModifiersState::empty(),
            cursor: (0.0, 0.0),
            pressed_at: None,
        }
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn set_modifiers(&mut self, mods: ModifiersState) {
        self.mods = mods;
    }

    fn send(&self, args: &[&str]) {
        if let Err(e) = self.sink.commandv(args) {
            log::warn!("Input command {:?} rejected: {}", args, e);
        }
    }

    pub fn key(&mut self, code: KeyCode, action: KeyAction) {
        match key_chord(code, action, self.mods) {
            Some((command, chord)) => self.send(&[command, &chord]),
            None => log::trace!("Unmapped key {:?} ({:?})", code, action),
        }
    }

    pub fn mouse_button(&mut self, button: MouseButton, action: KeyAction) {
        if button == MouseButton::Left {
            self.pressed_at = match action {
                KeyAction::Press => Some(self.cursor),
                _ => None,
            };
        }
        if let Some((command, chord)) = button_chord(button, action, self.mods) {
            self.send(&[command, &chord]);
        }
    }

    pub fn scroll(&mut self, dx: f64, dy: f64) {
        for key in wheel_keys(dx, dy) {
            self.send(&["keypress", key]);
            self.send(&["keyup", key]);
        }
    }

    /// Forward cursor motion. A held left button that moved far enough
    /// becomes a window drag; the engine then sees the button released.
    pub fn cursor(&mut self, x: f64, y: f64) -> Option<Gesture> {
        self.cursor = (x, y);
        let x_arg = (x as i32).to_string();
        let y_arg = (y as i32).to_string();
        self.send(&["mouse", &x_arg, &y_arg]);

        let (px, py) = self.pressed_at?;
        if (x - px).hypot(y - py) < DRAG_THRESHOLD || !self.sink.allow_drag() {
            return None;
        }
        self.pressed_at = None;
        self.send(&["keyup", "MBTN_LEFT"]);
        Some(Gesture::BeginDrag)
    }

    pub fn drop_files(&mut self, paths: &[PathBuf]) {
        for args in drop_commands(paths) {
            let refs: Vec<&str> = args.iter().map(String::as_str).collect();
            self.send(&refs);
        }
    }
}
