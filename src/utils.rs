//! Utility functions

use crate::constants::IMAGE_EXTENSIONS;
use std::path::Path;

// With stroke — for the header logo (large display)
pub const LOGO_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 160 160"><defs><style>.c1{fill:#fff;stroke:#09090b;stroke-width:2px}.c2{fill:#34d399;stroke:#09090b;stroke-width:2px}</style></defs><rect class="c1" x="8" y="8" width="144" height="144" rx="20"/><path class="c2" d="M80 24c-26 0-46 22-46 50 0 24 18 42 40 42v20h12v-20c22 0 40-18 40-42 0-28-20-50-46-50z"/><rect class="c1" x="48" y="66" width="64" height="10" rx="5"/><rect class="c1" x="58" y="88" width="44" height="10" rx="5"/></svg>"#;

// No stroke, square viewBox — for window/taskbar icons
pub const ICON_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 160 160"><defs><style>.c1{fill:#fff}.c2{fill:#34d399}</style></defs><rect class="c2" x="8" y="8" width="144" height="144" rx="20"/><path class="c1" d="M80 24c-26 0-46 22-46 50 0 24 18 42 40 42v20h12v-20c22 0 40-18 40-42 0-28-20-50-46-50z"/><rect class="c2" x="48" y="66" width="64" height="10" rx="5"/><rect class="c2" x="58" y="88" width="44" height="10" rx="5"/></svg>"#;

/// Rasterize the logo SVG at the given width, preserving aspect ratio.
pub fn rasterize_logo(width: u32) -> (Vec<u8>, u32, u32) {
    let tree = resvg::usvg::Tree::from_str(LOGO_SVG, &resvg::usvg::Options::default()).unwrap();
    let svg_size = tree.size();
    let scale = width as f32 / svg_size.width();
    let height = (svg_size.height() * scale).ceil() as u32;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height).unwrap();
    resvg::render(
        &tree,
        resvg::usvg::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    (premul_to_straight(&pixmap), width, height)
}

/// Rasterize the icon SVG to a square image (for window/taskbar icons).
pub fn rasterize_logo_square(size: u32) -> (Vec<u8>, u32, u32) {
    let tree = resvg::usvg::Tree::from_str(ICON_SVG, &resvg::usvg::Options::default()).unwrap();
    let scale = size as f32 / tree.size().width();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size, size).unwrap();
    resvg::render(
        &tree,
        resvg::usvg::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    (premul_to_straight(&pixmap), size, size)
}

fn premul_to_straight(pixmap: &resvg::tiny_skia::Pixmap) -> Vec<u8> {
    pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let a = p.alpha();
            if a == 0 {
                [0, 0, 0, 0]
            } else {
                let r = (p.red() as u16 * 255 / a as u16) as u8;
                let g = (p.green() as u16 * 255 / a as u16) as u8;
                let b = (p.blue() as u16 * 255 / a as u16) as u8;
                [r, g, b, a]
            }
        })
        .collect()
}

/// Format bytes into human-readable string (B, KB, MB)
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Resolve a `prediction_path` from the server against the configured base URL.
/// Absolute URLs pass through unchanged; relative paths join against the base.
pub fn resolve_prediction_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// MIME type for the multipart `image` field, guessed from the extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Whether a dropped file looks like an image we can preview and upload.
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn resolve_joins_relative_paths() {
        assert_eq!(
            resolve_prediction_url("http://127.0.0.1:5000", "/static/predictions/a.png"),
            "http://127.0.0.1:5000/static/predictions/a.png"
        );
        assert_eq!(
            resolve_prediction_url("http://127.0.0.1:5000/", "static/predictions/a.png"),
            "http://127.0.0.1:5000/static/predictions/a.png"
        );
    }

    #[test]
    fn resolve_passes_absolute_urls_through() {
        assert_eq!(
            resolve_prediction_url("http://127.0.0.1:5000", "https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn mime_guessing() {
        assert_eq!(mime_for_path(&PathBuf::from("a.JPG")), "image/jpeg");
        assert_eq!(mime_for_path(&PathBuf::from("a.png")), "image/png");
        assert_eq!(mime_for_path(&PathBuf::from("a.tiff")), "application/octet-stream");
        assert_eq!(mime_for_path(&PathBuf::from("noext")), "application/octet-stream");
    }

    #[test]
    fn supported_image_extensions() {
        assert!(is_supported_image(&PathBuf::from("tree.jpeg")));
        assert!(is_supported_image(&PathBuf::from("TREE.PNG")));
        assert!(!is_supported_image(&PathBuf::from("notes.txt")));
        assert!(!is_supported_image(&PathBuf::from("noext")));
    }
}
