use std::path::Path;

const MPV_CONF: &str = include_str!("../../assets/mpv.conf");
const INPUT_CONF: &str = include_str!("../../assets/input.conf");

/// Write the bundled `mpv.conf` and `input.conf` into `dir`, leaving any
/// existing file alone. Returns the names of the files written.
pub fn materialize(dir: &Path) -> anyhow::Result<Vec<&'static str>> {
    std::fs::create_dir_all(dir)
        .map_err(|e| anyhow::anyhow!("Failed to create config directory {}: {}", dir.display(), e))?;

    let mut written = Vec::new();
    for (name, content) in [("mpv.conf", MPV_CONF), ("input.conf", INPUT_CONF)] {
        let path = dir.join(name);
        if path.exists() {
            continue;
        }
        std::fs::write(&path, content).map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))?;
        log::info!("Wrote default {}", path.display());
        written.push(name);
    }
    Ok(written)
}
