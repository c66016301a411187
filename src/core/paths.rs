use std::path::{Path, PathBuf};

const APP_DIR: &str = "glimpse";
const PORTABLE_DIR: &str = "portable_config";

/// Directory holding the engine config files we manage.
///
/// A `portable_config` directory next to the executable takes precedence
/// over the platform config directory.
pub fn data_dir() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    if let Some(portable) = exe_dir.as_deref().and_then(portable_dir) {
        log::debug!("Using portable config at {}", portable.display());
        return portable;
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

pub fn portable_dir(exe_dir: &Path) -> Option<PathBuf> {
    let dir = exe_dir.join(PORTABLE_DIR);
    dir.is_dir().then_some(dir)
}
