use std::{collections::HashMap, fs, path::Path};

#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub strip_name: String,
    pub archive_start: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "https://dilbert.com".into(),
            strip_name: "Dilbert".into(),
            archive_start: "1989-04-16".into(),
        }
    }
}

/// Defaults, overlaid by the settings file (`viewer.toml` unless an
/// explicit path is given), overlaid by environment variables.
pub fn load_settings(config_path: Option<&Path>) -> Settings {
    let mut settings = Settings::default();
    let path = config_path.unwrap_or_else(|| Path::new("viewer.toml"));

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("base_url") {
                settings.base_url = v.clone();
            }
            if let Some(v) = file_cfg.get("strip_name") {
                settings.strip_name = v.clone();
            }
            if let Some(v) = file_cfg.get("archive_start") {
                settings.archive_start = v.clone();
            }
        }
    }

    if let Ok(v) = std::env::var("COMIC_BASE_URL") {
        settings.base_url = v;
    }
    if let Ok(v) = std::env::var("APP__BASE_URL") {
        settings.base_url = v;
    }

    if let Ok(v) = std::env::var("COMIC_STRIP_NAME") {
        settings.strip_name = v;
    }
    if let Ok(v) = std::env::var("APP__STRIP_NAME") {
        settings.strip_name = v;
    }

    if let Ok(v) = std::env::var("COMIC_ARCHIVE_START") {
        settings.archive_start = v;
    }
    if let Ok(v) = std::env::var("APP__ARCHIVE_START") {
        settings.archive_start = v;
    }

    settings.base_url = normalize_base_url(&settings.base_url);
    settings
}

pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');

    if trimmed.is_empty() {
        return Settings::default().base_url;
    }

    trimmed.to_string()
}
