//! Application constants and configuration

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const PREDICT_ROUTE: &str = "/predict";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extensions offered in the file dialog and accepted from drag-drop.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];
