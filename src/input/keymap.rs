// Static tables from window-backend codes to engine key names.
//
// Built once on first use and never mutated.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use winit::event::MouseButton;
use winit::keyboard::{KeyCode, ModifiersState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Press,
    Release,
    Repeat,
}

/// Engine command for each input action. Repeats are left to the engine's
/// own autorepeat, so they have no entry.
pub static ACTIONS: Lazy<HashMap<KeyAction, &'static str>> =
    Lazy::new(|| HashMap::from([(KeyAction::Press, "keydown"), (KeyAction::Release, "keyup")]));

pub static BUTTONS: Lazy<HashMap<MouseButton, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (MouseButton::Left, "MBTN_LEFT"),
        (MouseButton::Middle, "MBTN_MID"),
        (MouseButton::Right, "MBTN_RIGHT"),
        (MouseButton::Back, "MBTN_BACK"),
        (MouseButton::Forward, "MBTN_FORWARD"),
    ])
});

/// Keys whose shifted form has its own name.
pub static SHIFT_KEYS: Lazy<HashMap<KeyCode, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::from([
        (KeyCode::Digit1, "!"),
        (KeyCode::Digit2, "@"),
        (KeyCode::Digit3, "SHARP"),
        (KeyCode::Digit4, "$"),
        (KeyCode::Digit5, "%"),
        (KeyCode::Digit6, "^"),
        (KeyCode::Digit7, "&"),
        (KeyCode::Digit8, "*"),
        (KeyCode::Digit9, "("),
        (KeyCode::Digit0, ")"),
        (KeyCode::Minus, "_"),
        (KeyCode::Equal, "+"),
        (KeyCode::BracketLeft, "{"),
        (KeyCode::BracketRight, "}"),
        (KeyCode::Backslash, "|"),
        (KeyCode::Semicolon, ":"),
        (KeyCode::Quote, "\""),
        (KeyCode::Backquote, "~"),
        (KeyCode::Comma, "<"),
        (KeyCode::Period, ">"),
        (KeyCode::Slash, "?"),
    ]);
    for (code, (_, upper)) in LETTERS.iter().zip(LETTER_NAMES) {
        map.insert(*code, upper);
    }
    map
});

pub static KEYS: Lazy<HashMap<KeyCode, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::from([
        (KeyCode::Space, "SPACE"),
        (KeyCode::Enter, "ENTER"),
        (KeyCode::Escape, "ESC"),
        (KeyCode::Tab, "TAB"),
        (KeyCode::Backspace, "BS"),
        (KeyCode::Delete, "DEL"),
        (KeyCode::Insert, "INS"),
        (KeyCode::Home, "HOME"),
        (KeyCode::End, "END"),
        (KeyCode::PageUp, "PGUP"),
        (KeyCode::PageDown, "PGDWN"),
        (KeyCode::ArrowUp, "UP"),
        (KeyCode::ArrowDown, "DOWN"),
        (KeyCode::ArrowLeft, "LEFT"),
        (KeyCode::ArrowRight, "RIGHT"),
        (KeyCode::PrintScreen, "PRINT"),
        (KeyCode::Pause, "PAUSE"),
        (KeyCode::ContextMenu, "MENU"),
        (KeyCode::MediaPlayPause, "PLAYPAUSE"),
        (KeyCode::MediaStop, "STOP"),
        (KeyCode::MediaTrackNext, "NEXT"),
        (KeyCode::MediaTrackPrevious, "PREV"),
        (KeyCode::AudioVolumeUp, "VOLUME_UP"),
        (KeyCode::AudioVolumeDown, "VOLUME_DOWN"),
        (KeyCode::AudioVolumeMute, "MUTE"),
        (KeyCode::Digit0, "0"),
        (KeyCode::Digit1, "1"),
        (KeyCode::Digit2, "2"),
        (KeyCode::Digit3, "3"),
        (KeyCode::Digit4, "4"),
        (KeyCode::Digit5, "5"),
        (KeyCode::Digit6, "6"),
        (KeyCode::Digit7, "7"),
        (KeyCode::Digit8, "8"),
        (KeyCode::Digit9, "9"),
        (KeyCode::Minus, "-"),
        (KeyCode::Equal, "="),
        (KeyCode::BracketLeft, "["),
        (KeyCode::BracketRight, "]"),
        (KeyCode::Backslash, "\\"),
        (KeyCode::Semicolon, ";"),
        (KeyCode::Quote, "'"),
        (KeyCode::Backquote, "`"),
        (KeyCode::Comma, ","),
        (KeyCode::Period, "."),
        (KeyCode::Slash, "/"),
        (KeyCode::Numpad0, "KP0"),
        (KeyCode::Numpad1, "KP1"),
        (KeyCode::Numpad2, "KP2"),
        (KeyCode::Numpad3, "KP3"),
        (KeyCode::Numpad4, "KP4"),
        (KeyCode::Numpad5, "KP5"),
        (KeyCode::Numpad6, "KP6"),
        (KeyCode::Numpad7, "KP7"),
        (KeyCode::Numpad8, "KP8"),
        (KeyCode::Numpad9, "KP9"),
        (KeyCode::NumpadDecimal, "KP_DEC"),
        (KeyCode::NumpadEnter, "KP_ENTER"),
        (KeyCode::NumpadAdd, "+"),
        (KeyCode::NumpadSubtract, "-"),
        (KeyCode::NumpadMultiply, "*"),
        (KeyCode::NumpadDivide, "/"),
        (KeyCode::NumpadEqual, "="),
    ]);
    for (code, (lower, _)) in LETTERS.iter().zip(LETTER_NAMES) {
        map.insert(*code, lower);
    }
    for (code, name) in FUNCTION_KEYS.iter().zip(FUNCTION_NAMES) {
        map.insert(*code, name);
    }
    map
});

const LETTERS: [KeyCode; 26] = [
    KeyCode::KeyA,
    KeyCode::KeyB,
    KeyCode::KeyC,
    KeyCode::KeyD,
    KeyCode::KeyE,
    KeyCode::KeyF,
    KeyCode::KeyG,
    KeyCode::KeyH,
    KeyCode::KeyI,
    KeyCode::KeyJ,
    KeyCode::KeyK,
    KeyCode::KeyL,
    KeyCode::KeyM,
    KeyCode::KeyN,
    KeyCode::KeyO,
    KeyCode::KeyP,
    KeyCode::KeyQ,
    KeyCode::KeyR,
    KeyCode::KeyS,
    KeyCode::KeyT,
    KeyCode::KeyU,
    KeyCode::KeyV,
    KeyCode::KeyW,
    KeyCode::KeyX,
    KeyCode::KeyY,
    KeyCode::KeyZ,
];

const LETTER_NAMES: [(&str, &str); 26] = [
    ("a", "A"),
    ("b", "B"),
    ("c", "C"),
    ("d", "D"),
    ("e", "E"),
    ("f", "F"),
    ("g", "G"),
    ("h", "H"),
    ("i", "I"),
    ("j", "J"),
    ("k", "K"),
    ("l", "L"),
    ("m", "M"),
    ("n", "N"),
    ("o", "O"),
    ("p", "P"),
    ("q", "Q"),
    ("r", "R"),
    ("s", "S"),
    ("t", "T"),
    ("u", "U"),
    ("v", "V"),
    ("w", "W"),
    ("x", "X"),
    ("y", "Y"),
    ("z", "Z"),
];

const FUNCTION_KEYS: [KeyCode; 24] = [
    KeyCode::F1,
    KeyCode::F2,
    KeyCode::F3,
    KeyCode::F4,
    KeyCode::F5,
    KeyCode::F6,
    KeyCode::F7,
    KeyCode::F8,
    KeyCode::F9,
    KeyCode::F10,
    KeyCode::F11,
    KeyCode::F12,
    KeyCode::F13,
    KeyCode::F14,
    KeyCode::F15,
    KeyCode::F16,
    KeyCode::F17,
    KeyCode::F18,
    KeyCode::F19,
    KeyCode::F20,
    KeyCode::F21,
    KeyCode::F22,
    KeyCode::F23,
    KeyCode::F24,
];

const FUNCTION_NAMES: [&str; 24] = [
    "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12", "F13", "F14", "F15", "F16", "F17",
    "F18", "F19", "F20", "F21", "F22", "F23", "F24",
];

/// Modifier names in the engine's fixed order, whatever order they were
/// pressed in.
pub fn modifier_tokens(mods: ModifiersState) -> Vec<&'static str> {
    let mut tokens = Vec::with_capacity(4);
    if mods.control_key() {
        tokens.push("Ctrl");
    }
    if mods.alt_key() {
        tokens.push("Alt");
    }
    if mods.shift_key() {
        tokens.push("Shift");
    }
    if mods.super_key() {
        tokens.push("Meta");
    }
    tokens
}

/// Subtitle file extensions, lower case.
pub const SUBTITLE_EXTENSIONS: &[&str] = &[
    "srt", "ass", "ssa", "sub", "idx", "vtt", "sup", "smi", "lrc", "pgs", "dfxp", "ttml", "usf", "jss", "rt",
];
