// Text menus drawn with the engine's own OSD.
//
// The winit host has no immediate-mode UI, so the menu and palette messages
// are answered with a `show-text` listing built from the property cache.

use std::fmt::Write;

use crate::engine::cache::PropertyCache;
use crate::engine::EngineClient;
use crate::player::Overlay;

/// How long a listing stays on screen, in milliseconds.
const DURATION_MS: &str = "5000";

pub struct OsdOverlay {
    client: EngineClient,
}

impl OsdOverlay {
    pub fn new(client: EngineClient) -> Self {
        Self { client }
    }
}

impl Overlay for OsdOverlay {
    fn client_message(&self, args: &[String]) {
        let text = match args.first().map(String::as_str) {
            Some("context-menu") => menu_text(&self.client.cache()),
            Some("command-palette") => palette_text(&self.client.cache()),
            _ => {
                log::debug!("Unhandled client message: {:?}", args);
                return;
            }
        };
        if let Err(e) = self.client.commandv(&["show-text", &text, DURATION_MS]) {
            log::warn!("Failed to show menu ({}): {}", e.status(), e);
        }
    }
}

fn timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, total / 60 % 60, total % 60)
}

fn marker(current: bool) -> &'static str {
    if current {
        ">"
    } else {
        " "
    }
}

/// Playlist, chapters, tracks, audio output and playback state.
pub fn menu_text(cache: &PropertyCache) -> String {
    let mut text = String::new();

    if !cache.playlist.is_empty() {
        text.push_str("Playlist\n");
        for (index, item) in cache.playlist.iter().enumerate() {
            let name = [&item.title, &item.filename, &item.path]
                .into_iter()
                .find(|s| !s.is_empty())
                .map(String::as_str)
                .unwrap_or("?");
            let current = index as i64 == cache.playlist_playing_pos || index as i64 == cache.playlist_pos;
            let _ = writeln!(text, "{} {}. {}", marker(current), item.id + 1, name);
        }
    }

    if !cache.chapters.is_empty() {
        text.push_str("Chapters\n");
        for chapter in &cache.chapters {
            let _ = writeln!(
                text,
                "{} {} {}",
                marker(chapter.id == cache.chapter),
                timestamp(chapter.time),
                chapter.title
            );
        }
    }

    if !cache.tracks.is_empty() {
        text.push_str("Tracks\n");
        for track in &cache.tracks {
            let lang = if track.lang.is_empty() {
                String::new()
            } else {
                format!(" [{}]", track.lang)
            };
            let _ = writeln!(text, "{} {} {}: {}{}", marker(track.selected), track.kind, track.id, track.title, lang);
        }
        let _ = writeln!(
            text,
            "  aid={} vid={} sid={} secondary-sid={}",
            cache.aid, cache.vid, cache.sid, cache.sid2
        );
    }

    if !cache.audio_devices.is_empty() {
        text.push_str("Audio devices\n");
        for device in &cache.audio_devices {
            let label = if device.description.is_empty() { &device.name } else { &device.description };
            let _ = writeln!(text, "{} {}", marker(device.name == cache.audio_device), label);
        }
    }

    if !cache.profiles.is_empty() {
        let _ = writeln!(text, "Profiles: {}", cache.profiles.join(", "));
    }

    let _ = write!(
        text,
        "Volume {}{} | {} | fullscreen {} | subtitles {}/{} | cursor autohide {}",
        cache.volume,
        if cache.mute { " (muted)" } else { "" },
        if cache.pause { "paused" } else { "playing" },
        on_off(cache.fullscreen),
        on_off(cache.sub_visibility),
        on_off(cache.secondary_sub_visibility),
        cache.cursor_autohide,
    );
    text
}

/// Every input binding with its comment, if any.
pub fn palette_text(cache: &PropertyCache) -> String {
    let mut text = String::new();
    for binding in &cache.bindings {
        let _ = write!(text, "{}  {}", binding.key, binding.cmd);
        if !binding.comment.is_empty() {
            let _ = write!(text, "  # {}", binding.comment);
        }
        text.push('\n');
    }
    if text.is_empty() {
        text.push_str("No input bindings");
    }
    text
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
