//! App module - contains the main application state and logic

mod analysis;
mod images;
pub(crate) mod progress;

use crate::settings::Settings;
use crate::theme;
use crate::types::*;
use eframe::egui;
use progress::SyntheticProgress;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ============================================================================
// APP STATE
// ============================================================================

pub struct App {
    // Selection & display
    pub(crate) selected_image: Option<SelectedImage>,
    pub(crate) preview_texture: Option<egui::TextureHandle>,
    pub(crate) result_texture: Option<egui::TextureHandle>,
    pub(crate) result_url: Option<String>,
    pub(crate) result_bytes: Option<Vec<u8>>,
    pub(crate) error_message: Option<String>,
    // Analysis
    pub(crate) analysis: Arc<Mutex<AnalysisState>>,
    pub(crate) progress: Option<SyntheticProgress>,
    pub(crate) runtime: tokio::runtime::Runtime,
    // Configuration
    pub(crate) server_url_str: String,
    pub(crate) last_image_dir: PathBuf,
    pub(crate) show_settings: bool,
    // Chrome
    pub(crate) logo_texture: Option<egui::TextureHandle>,
    pub(crate) drop_hover: bool,
    pub(crate) toast_message: Option<String>,
    pub(crate) toast_start: Option<std::time::Instant>,
    pub(crate) central_panel_rect: Option<egui::Rect>,
    // Window state
    pub(crate) window_pos: Option<egui::Pos2>,
    pub(crate) window_size: Option<egui::Vec2>,
    pub(crate) needs_center: bool,
    pub(crate) data_dir: PathBuf,
}

// ============================================================================
// APP INITIALIZATION & HELPERS
// ============================================================================

impl App {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: Settings, data_dir: PathBuf) -> Self {
        // Force dark theme
        cc.egui_ctx.set_theme(egui::Theme::Dark);

        // Add Phosphor icons font
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);

        // Apply theme from theme.rs
        theme::apply_visuals(&cc.egui_ctx);

        Self {
            selected_image: None,
            preview_texture: None,
            result_texture: None,
            result_url: None,
            result_bytes: None,
            error_message: None,
            analysis: Arc::new(Mutex::new(AnalysisState::default())),
            progress: None,
            runtime: tokio::runtime::Runtime::new().expect("failed to start tokio runtime"),
            server_url_str: settings.server_url_or_default(),
            last_image_dir: settings.last_image_dir_or_default(),
            show_settings: false,
            logo_texture: None,
            drop_hover: false,
            toast_message: None,
            toast_start: None,
            central_panel_rect: None,
            window_pos: None,
            window_size: None,
            needs_center: false,
            data_dir,
        }
    }

    pub fn save_settings(&self) {
        let settings = Settings {
            window_x: self.window_pos.map(|p| p.x),
            window_y: self.window_pos.map(|p| p.y),
            window_w: self.window_size.map(|s| s.x),
            window_h: self.window_size.map(|s| s.y),
            server_url: Some(self.server_url_str.clone()),
            last_image_dir: Some(self.last_image_dir.to_string_lossy().to_string()),
        };
        settings.save(&self.data_dir);
    }

    /// Base URL with the edit buffer's stray whitespace and trailing slash removed.
    pub fn server_url_normalized(&self) -> String {
        let trimmed = self.server_url_str.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            crate::constants::DEFAULT_SERVER_URL.to_string()
        } else {
            trimmed.to_string()
        }
    }

    pub fn is_analyzing(&self) -> bool {
        self.analysis.lock().unwrap().in_flight()
    }

    pub fn show_toast(&mut self, message: String) {
        self.toast_message = Some(message);
        self.toast_start = Some(std::time::Instant::now());
    }
}
