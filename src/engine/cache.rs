// Mirror of engine properties kept up to date by the event-pump thread.
//
// The pump thread is the only writer. Readers (the UI thread) may observe a
// slightly stale snapshot; nothing here touches window-system resources.

use std::path::Path;

use serde_json::Value as Json;

use crate::engine::protocol::{Format, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayItem {
    pub id: i64,
    pub title: String,
    pub path: String,
    pub filename: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChapterItem {
    pub id: i64,
    pub title: String,
    pub time: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackItem {
    pub id: i64,
    pub kind: String,
    pub title: String,
    pub lang: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioDevice {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingItem {
    pub key: String,
    pub cmd: String,
    pub comment: String,
}

/// Properties observed for the lifetime of the engine, with their formats.
pub const OBSERVED: &[(&str, Format)] = &[
    ("playlist", Format::Node),
    ("chapter-list", Format::Node),
    ("track-list", Format::Node),
    ("audio-device-list", Format::Node),
    ("input-bindings", Format::Node),
    ("profile-list", Format::String),
    ("aid", Format::String),
    ("vid", Format::String),
    ("sid", Format::String),
    ("secondary-sid", Format::String),
    ("audio-device", Format::String),
    ("cursor-autohide", Format::String),
    ("chapter", Format::Int64),
    ("volume", Format::Int64),
    ("playlist-pos", Format::Int64),
    ("playlist-playing-pos", Format::Int64),
    ("pause", Format::Flag),
    ("mute", Format::Flag),
    ("fullscreen", Format::Flag),
    ("sub-visibility", Format::Flag),
    ("secondary-sub-visibility", Format::Flag),
    ("window-dragging", Format::Flag),
    ("force-window", Format::Flag),
    ("idle-active", Format::Flag),
];

/// Profiles the engine defines for itself; never offered to the user.
const INTERNAL_PROFILES: &[&str] = &["default", "libmpv", "encoding", "pseudo-gui"];

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyCache {
    pub playlist: Vec<PlayItem>,
    pub chapters: Vec<ChapterItem>,
    pub tracks: Vec<TrackItem>,
    pub audio_devices: Vec<AudioDevice>,
    pub bindings: Vec<BindingItem>,
    pub profiles: Vec<String>,
    pub aid: String,
    pub vid: String,
    pub sid: String,
    pub sid2: String,
    pub audio_device: String,
    pub cursor_autohide: String,
    pub chapter: i64,
    pub volume: i64,
    pub playlist_pos: i64,
    pub playlist_playing_pos: i64,
    pub pause: bool,
    pub mute: bool,
    pub fullscreen: bool,
    pub sub_visibility: bool,
    pub secondary_sub_visibility: bool,
    pub window_dragging: bool,
    pub force_window: bool,
    pub idle: bool,
}

impl Default for PropertyCache {
    fn default() -> Self {
        Self {
            playlist: Vec::new(),
            chapters: Vec::new(),
            tracks: Vec::new(),
            audio_devices: Vec::new(),
            bindings: Vec::new(),
            profiles: Vec::new(),
            aid: String::new(),
            vid: String::new(),
            sid: String::new(),
            sid2: String::new(),
            audio_device: String::new(),
            cursor_autohide: String::new(),
            chapter: 0,
            volume: 100,
            playlist_pos: -1,
            playlist_playing_pos: -1,
            pause: false,
            mute: false,
            fullscreen: false,
            sub_visibility: true,
            secondary_sub_visibility: true,
            window_dragging: true,
            force_window: false,
            idle: true,
        }
    }
}

impl PropertyCache {
    pub fn paused(&self) -> bool {
        self.pause
    }

    pub fn playing(&self) -> bool {
        self.playlist_playing_pos != -1
    }

    pub fn allow_drag(&self) -> bool {
        self.window_dragging && !self.fullscreen
    }

    /// Apply a property-change notification. Returns `false` for names the
    /// cache does not track.
    pub fn apply(&mut self, name: &str, value: &Value) -> bool {
        match name {
            "playlist" => self.playlist = node(value).map(parse_playlist).unwrap_or_default(),
            "chapter-list" => self.chapters = node(value).map(parse_chapters).unwrap_or_default(),
            "track-list" => self.tracks = node(value).map(parse_tracks).unwrap_or_default(),
            "audio-device-list" => self.audio_devices = node(value).map(parse_audio_devices).unwrap_or_default(),
            "input-bindings" => self.bindings = node(value).map(parse_bindings).unwrap_or_default(),
            "profile-list" => self.profiles = string(value).map(|s| parse_profiles(&s)).unwrap_or_default(),
            "aid" => self.aid = string(value).unwrap_or_default(),
            "vid" => self.vid = string(value).unwrap_or_default(),
            "sid" => self.sid = string(value).unwrap_or_default(),
            "secondary-sid" => self.sid2 = string(value).unwrap_or_default(),
            "audio-device" => self.audio_device = string(value).unwrap_or_default(),
            "cursor-autohide" => self.cursor_autohide = string(value).unwrap_or_default(),
            "chapter" => self.chapter = int(value).unwrap_or(0),
            "volume" => self.volume = int(value).unwrap_or(0),
            "playlist-pos" => self.playlist_pos = int(value).unwrap_or(-1),
            "playlist-playing-pos" => self.playlist_playing_pos = int(value).unwrap_or(-1),
            "pause" => self.pause = flag(value),
            "mute" => self.mute = flag(value),
            "fullscreen" => self.fullscreen = flag(value),
            "sub-visibility" => self.sub_visibility = flag(value),
            "secondary-sub-visibility" => self.secondary_sub_visibility = flag(value),
            "window-dragging" => self.window_dragging = flag(value),
            "force-window" => self.force_window = flag(value),
            "idle-active" => self.idle = flag(value),
            _ => return false,
        }
        true
    }
}

fn node(value: &Value) -> Option<&Json> {
    match value {
        Value::Node(node) => Some(node),
        _ => None,
    }
}

fn string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn int(value: &Value) -> Option<i64> {
    match value {
        Value::Int64(i) => Some(*i),
        Value::Double(f) => Some(*f as i64),
        _ => None,
    }
}

fn flag(value: &Value) -> bool {
    matches!(value, Value::Flag(true))
}

fn str_field(item: &Json, key: &str) -> String {
    item.get(key).and_then(Json::as_str).unwrap_or_default().to_string()
}

fn entries(node: &Json) -> impl Iterator<Item = (usize, &Json)> {
    node.as_array().into_iter().flatten().enumerate()
}

pub fn parse_playlist(node: &Json) -> Vec<PlayItem> {
    entries(node)
        .map(|(index, item)| {
            let path = str_field(item, "filename");
            let filename = Path::new(&path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.clone());
            PlayItem {
                id: item.get("id").and_then(Json::as_i64).unwrap_or(index as i64),
                title: str_field(item, "title"),
                path,
                filename,
            }
        })
        .collect()
}

pub fn parse_chapters(node: &Json) -> Vec<ChapterItem> {
    entries(node)
        .map(|(index, item)| ChapterItem {
            id: index as i64,
            title: str_field(item, "title"),
            time: item.get("time").and_then(Json::as_f64).unwrap_or(0.0),
        })
        .collect()
}

pub fn parse_tracks(node: &Json) -> Vec<TrackItem> {
    entries(node)
        .map(|(_, item)| TrackItem {
            id: item.get("id").and_then(Json::as_i64).unwrap_or(-1),
            kind: str_field(item, "type"),
            title: str_field(item, "title"),
            lang: str_field(item, "lang"),
            selected: item.get("selected").and_then(Json::as_bool).unwrap_or(false),
        })
        .collect()
}

pub fn parse_audio_devices(node: &Json) -> Vec<AudioDevice> {
    entries(node)
        .map(|(_, item)| AudioDevice {
            name: str_field(item, "name"),
            description: str_field(item, "description"),
        })
        .collect()
}

pub fn parse_bindings(node: &Json) -> Vec<BindingItem> {
    entries(node)
        .map(|(_, item)| BindingItem {
            key: str_field(item, "key"),
            cmd: str_field(item, "cmd"),
            comment: str_field(item, "comment"),
        })
        .collect()
}

/// `profile-list` arrives as a JSON document inside a string property.
pub fn parse_profiles(payload: &str) -> Vec<String> {
    let node: Json = match serde_json::from_str(payload) {
        Ok(node) => node,
        Err(e) => {
            log::warn!("Ignoring unparsable profile list: {}", e);
            return Vec::new();
        }
    };
    entries(&node)
        .map(|(_, item)| str_field(item, "name"))
        .filter(|name| !name.is_empty() && !name.starts_with("builtin-") && !INTERNAL_PROFILES.contains(&name.as_str()))
        .collect()
}
