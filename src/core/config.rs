use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MpvConfig {
    /// Read the engine's own config files instead of ours.
    pub use_config: bool,
    pub watch_later: bool,
    pub volume: i64,
    pub log_level: String,
}

impl Default for MpvConfig {
    fn default() -> Self {
        Self {
            use_config: false,
            watch_later: false,
            volume: 100,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    /// Allow UI panels to live in their own platform windows.
    pub viewports: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            viewports: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentFile {
    pub path: String,
    pub title: String,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecentConfig {
    pub files: Vec<RecentFile>,
    pub limit: usize,
    /// Bind SPACE to replay the most recent file while idle.
    pub space_to_play_last: bool,
}

impl Default for RecentConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            limit: 10,
            space_to_play_last: false,
        }
    }
}

impl RecentConfig {
    /// Move `path` to the front, dropping older duplicates and trimming to
    /// the limit.
    pub fn add(&mut self, path: &str, title: &str) {
        self.files.retain(|f| f.path != path);
        self.files.insert(
            0,
            RecentFile {
                path: path.to_string(),
                title: if title.is_empty() { path.to_string() } else { title.to_string() },
                opened_at: Utc::now(),
            },
        );
        self.files.truncate(self.limit);
    }

    pub fn latest(&self) -> Option<&RecentFile> {
        self.files.first()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub idle_wait_ms: u64,
    pub input_wait_ms: u64,
    pub input_boost_ms: u64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            idle_wait_ms: 50,
            input_wait_ms: 8,
            input_boost_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mpv: MpvConfig,
    pub window: WindowConfig,
    pub recent: RecentConfig,
    pub frame: FrameConfig,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &PathBuf) -> anyhow::Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to read config file at {}: {}", config_path.display(), e))?;

            match serde_json::from_str::<Self>(&content) {
                Ok(config) => {
                    log::info!("Loaded existing config from {}", config_path.display());
                    Ok(config)
                }
                Err(e) => {
                    log::warn!("Config file exists but has issues ({}), creating new one with defaults", e);
                    let new_config = Self::default();
                    new_config
                        .save_to(config_path)
                        .map_err(|save_err| anyhow::anyhow!("Failed to save new config: {}", save_err))?;
                    log::info!("Created new config file at {}", config_path.display());
                    Ok(new_config)
                }
            }
        } else {
            log::info!("No config file found, creating default config");
            let config = Self::default();
            config
                .save_to(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to save default config: {}", e))?;
            log::info!("Created new config file at {}", config_path.display());
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("glimpse")
            .join("config.json")
    }
}
