//! User settings stored as settings.json in the app data directory

use crate::constants::DEFAULT_SERVER_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Window geometry
    pub window_x: Option<f32>,
    pub window_y: Option<f32>,
    pub window_w: Option<f32>,
    pub window_h: Option<f32>,

    // Prediction service
    pub server_url: Option<String>,

    // Directory the file dialog opens in
    pub last_image_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_x: None,
            window_y: None,
            window_w: None,
            window_h: None,
            server_url: None,
            last_image_dir: None,
        }
    }
}

impl Settings {
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join("settings.json");
        match std::fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str(&s) {
                Ok(settings) => {
                    debug!(path = %path.display(), "Settings loaded");
                    settings
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse settings, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                debug!("No settings file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, data_dir: &Path) {
        let path = data_dir.join("settings.json");
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!(error = %e, "Failed to save settings");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize settings"),
        }
    }

    pub fn server_url_or_default(&self) -> String {
        self.server_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
    }

    pub fn last_image_dir_or_default(&self) -> PathBuf {
        self.last_image_dir
            .as_ref()
            .map(PathBuf::from)
            .or_else(dirs::picture_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_through_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            window_x: Some(10.0),
            window_y: Some(20.0),
            window_w: Some(900.0),
            window_h: Some(700.0),
            server_url: Some("http://10.0.0.2:5000".into()),
            last_image_dir: Some("/tmp/images".into()),
        };
        settings.save(dir.path());

        let loaded = Settings::load(dir.path());
        assert_eq!(loaded.server_url.as_deref(), Some("http://10.0.0.2:5000"));
        assert_eq!(loaded.window_w, Some(900.0));
        assert_eq!(loaded.last_image_dir.as_deref(), Some("/tmp/images"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Settings::load(dir.path());
        assert!(loaded.server_url.is_none());
        assert_eq!(loaded.server_url_or_default(), DEFAULT_SERVER_URL);
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{not json").unwrap();
        let loaded = Settings::load(dir.path());
        assert!(loaded.server_url.is_none());
    }

    #[test]
    fn server_url_is_normalized() {
        let mut settings = Settings::default();
        settings.server_url = Some("http://192.168.1.5:5000/".into());
        assert_eq!(settings.server_url_or_default(), "http://192.168.1.5:5000");

        settings.server_url = Some("   ".into());
        assert_eq!(settings.server_url_or_default(), DEFAULT_SERVER_URL);
    }
}
