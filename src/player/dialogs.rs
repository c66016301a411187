//! Native file pickers. Must be called on the thread that owns the window.

use std::path::PathBuf;

use crate::input::keymap::SUBTITLE_EXTENSIONS;

const MEDIA_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "mov", "webm", "flv", "wmv", "m4v", "ts", "m2ts", "mpg", "mpeg", "ogv", "3gp", "mp3", "flac",
    "ogg", "opus", "m4a", "wav", "aac", "wma", "m3u", "m3u8", "pls", "cue",
];

pub trait Dialogs: Send + Sync {
    /// Media files to play; empty when cancelled.
    fn pick_media(&self) -> Vec<PathBuf>;
    fn pick_subtitles(&self) -> Vec<PathBuf>;
    fn pick_folder(&self) -> Option<PathBuf>;
}

/// Platform dialogs through `rfd`.
pub struct NativeDialogs;

fn create_dialog(title: &str) -> rfd::FileDialog {
    rfd::FileDialog::new().set_title(title)
}

impl Dialogs for NativeDialogs {
    fn pick_media(&self) -> Vec<PathBuf> {
        create_dialog("Open Files")
            .add_filter("Media Files", MEDIA_EXTENSIONS)
            .add_filter("All Files", &["*"])
            .pick_files()
            .unwrap_or_default()
    }

    fn pick_subtitles(&self) -> Vec<PathBuf> {
        create_dialog("Open Subtitles")
            .add_filter("Subtitle Files", SUBTITLE_EXTENSIONS)
            .pick_files()
            .unwrap_or_default()
    }

    fn pick_folder(&self) -> Option<PathBuf> {
        create_dialog("Open Folder").pick_folder()
    }
}
