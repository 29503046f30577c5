//! Image selection, preview textures, and result saving

use super::App;
use crate::types::SelectedImage;
use crate::utils::is_supported_image;
use eframe::egui;
use std::path::Path;
use tracing::{info, warn};

/// File name to prefill in the save dialog, taken from the result URL.
fn suggested_result_name(result_url: &str) -> String {
    result_url
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .unwrap_or_else(|| "segmentation.png".to_string())
}

impl App {
    /// Select an image (from the dialog or a drop): decode a preview and
    /// reset any previous result, error, and progress state.
    pub fn select_image(&mut self, ctx: &egui::Context, path: &Path) {
        if !is_supported_image(path) {
            warn!(path = %path.display(), "Rejected unsupported file");
            self.error_message = Some("Unsupported file type. Choose an image.".to_string());
            return;
        }

        let img = match image::open(path) {
            Ok(img) => img,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to decode selected image");
                self.clear_selection();
                self.error_message = Some("Could not read image file.".to_string());
                return;
            }
        };

        let size_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        let rgba = img.to_rgba8();
        let (width, height) = (rgba.width(), rgba.height());
        let size = [width as usize, height as usize];
        let pixels = rgba.into_raw();
        self.preview_texture = Some(ctx.load_texture(
            "original_preview",
            egui::ColorImage::from_rgba_unmultiplied(size, &pixels),
            egui::TextureOptions::LINEAR,
        ));

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());
        info!(file = %file_name, width, height, "Image selected");

        self.selected_image = Some(SelectedImage {
            path: path.to_path_buf(),
            file_name,
            width,
            height,
            size_bytes,
        });
        self.result_texture = None;
        self.result_url = None;
        self.result_bytes = None;
        self.error_message = None;
        self.progress = None;

        if let Some(dir) = path.parent() {
            self.last_image_dir = dir.to_path_buf();
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected_image = None;
        self.preview_texture = None;
        self.result_texture = None;
        self.result_url = None;
        self.result_bytes = None;
        self.error_message = None;
        self.progress = None;
    }

    /// Open the native picker and select the chosen file.
    pub fn pick_image(&mut self, ctx: &egui::Context) {
        let picked = rfd::FileDialog::new()
            .add_filter("Images", crate::constants::IMAGE_EXTENSIONS)
            .set_directory(&self.last_image_dir)
            .pick_file();
        if let Some(path) = picked {
            self.select_image(ctx, &path);
        }
    }

    /// Write the fetched result image to a user-chosen location.
    pub fn save_result(&mut self) {
        let (Some(bytes), Some(url)) = (&self.result_bytes, &self.result_url) else {
            return;
        };

        let picked = rfd::FileDialog::new()
            .set_file_name(suggested_result_name(url))
            .set_directory(&self.last_image_dir)
            .save_file();
        let Some(path) = picked else {
            return;
        };

        match std::fs::write(&path, bytes) {
            Ok(()) => {
                info!(path = %path.display(), "Result image saved");
                self.show_toast(format!("Result saved to {}", path.display()));
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Failed to save result image");
                self.show_toast(format!("Save failed: {}", e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_name_from_url() {
        assert_eq!(
            suggested_result_name("http://127.0.0.1:5000/static/predictions/abc.png"),
            "abc.png"
        );
        assert_eq!(suggested_result_name("trailing/slash/"), "segmentation.png");
        assert_eq!(suggested_result_name(""), "segmentation.png");
    }
}
