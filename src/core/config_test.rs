#[cfg(test)]
mod tests {

    use std::path::PathBuf;
    use crate::core::{AppConfig, FrameConfig, RecentConfig};

    fn temp_config_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("glimpse-test-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert!(!config.mpv.use_config);
        assert!(!config.mpv.watch_later);
        assert_eq!(config.mpv.volume, 100);
        assert_eq!(config.mpv.log_level, "info");
        assert!(!config.window.viewports);
        assert_eq!(config.recent.limit, 10);
        assert!(config.recent.files.is_empty());
    }

    #[test]
    fn test_frame_config_default() {
        let frame = FrameConfig::default();
        assert_eq!(frame.idle_wait_ms, 50);
        assert!(frame.input_wait_ms < frame.idle_wait_ms);
        assert_eq!(frame.input_boost_ms, 500);
    }

    #[test]
    fn test_app_config_serialization() {
        let mut config = AppConfig::default();
        config.mpv.watch_later = true;
        config.window.width = 640;
        config.recent.add("/videos/a.mkv", "A");

        let serialized = serde_json::to_string(&config).expect("Failed to serialize config");
        let deserialized: AppConfig = serde_json::from_str(&serialized).expect("Failed to deserialize config");

        assert!(deserialized.mpv.watch_later);
        assert_eq!(deserialized.window.width, 640);
        assert_eq!(deserialized.recent.files, config.recent.files);
    }

    #[test]
    fn test_config_backward_compatibility() {
        // Older files may be missing whole sections or single fields
        let old_config_json = r#"{
            "mpv": { "volume": 70 },
            "recent": { "files": [] }
        }"#;

        let config: AppConfig = serde_json::from_str(old_config_json).expect("Failed to parse old config");
        assert_eq!(config.mpv.volume, 70);
        assert_eq!(config.mpv.log_level, "info");
        assert_eq!(config.recent.limit, 10);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.frame.idle_wait_ms, 50);
    }

    #[test]
    fn test_recent_files_dedup_and_limit() {
        let mut recent = RecentConfig {
            limit: 3,
            ..RecentConfig::default()
        };
        recent.add("a", "A");
        recent.add("b", "");
        recent.add("c", "C");
        recent.add("a", "A again");
        recent.add("d", "D");

        let paths: Vec<&str> = recent.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["d", "a", "c"]);
        assert_eq!(recent.latest().map(|f| f.title.as_str()), Some("D"));
        assert_eq!(recent.files[1].title, "A again");

        recent.clear();
        assert!(recent.latest().is_none());
    }

    #[test]
    fn test_recent_untitled_uses_path() {
        let mut recent = RecentConfig::default();
        recent.add("/videos/b.mp4", "");
        assert_eq!(recent.files[0].title, "/videos/b.mp4");
    }

    #[test]
    fn test_load_creates_default_file() {
        let path = temp_config_path("config.json");
        let config = AppConfig::load_from(&path).expect("load creates defaults");
        assert!(path.exists());
        assert_eq!(config.mpv.volume, 100);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_load_replaces_broken_file() {
        let path = temp_config_path("config.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let config = AppConfig::load_from(&path).expect("falls back to defaults");
        assert_eq!(config.recent.limit, 10);
        let reread: AppConfig = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reread.mpv.log_level, "info");
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_save_round_trip() {
        let path = temp_config_path("nested/config.json");
        let mut config = AppConfig::default();
        config.mpv.volume = 35;
        config.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded.mpv.volume, 35);
        let _ = std::fs::remove_dir_all(path.parent().unwrap().parent().unwrap());
    }
}
