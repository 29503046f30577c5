//! Reusable UI components
//!
//! This module contains standalone UI components that can be used
//! throughout the application.

use crate::theme;
use eframe::egui;

/// Largest size that fits `image_size` inside `avail` without distortion.
pub fn image_fit_size(image_size: egui::Vec2, avail: egui::Vec2) -> egui::Vec2 {
    if image_size.x <= 0.0 || image_size.y <= 0.0 {
        return egui::Vec2::ZERO;
    }
    let scale = (avail.x / image_size.x).min(avail.y / image_size.y).min(1.0);
    image_size * scale
}

/// Inline error banner with a warning icon
pub fn error_banner(ui: &mut egui::Ui, message: &str) {
    egui::Frame::new()
        .fill(egui::Color32::from_rgba_unmultiplied(0xf8, 0x71, 0x71, 18))
        .stroke(egui::Stroke::new(1.0, theme::STATUS_ERROR))
        .corner_radius(theme::RADIUS_DEFAULT)
        .inner_margin(egui::Margin::symmetric(12, 8))
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.colored_label(theme::STATUS_ERROR, egui_phosphor::regular::WARNING);
                ui.add(
                    egui::Label::new(
                        egui::RichText::new(message)
                            .color(theme::STATUS_ERROR)
                            .size(theme::FONT_LABEL),
                    )
                    .selectable(false),
                );
            });
        });
}

/// Captioned header row for an image panel (colored badge icon + title)
pub fn panel_header(ui: &mut egui::Ui, icon: &str, color: egui::Color32, title: &str) {
    ui.horizontal(|ui| {
        let badge = 22.0;
        let (rect, _) = ui.allocate_exact_size(egui::vec2(badge, badge), egui::Sense::hover());
        ui.painter().rect_filled(
            rect,
            theme::RADIUS_DEFAULT,
            egui::Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), 30),
        );
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            icon,
            egui::FontId::proportional(14.0),
            color,
        );
        ui.add(
            egui::Label::new(
                egui::RichText::new(title)
                    .size(theme::FONT_BODY)
                    .strong()
                    .color(theme::TEXT_PRIMARY),
            )
            .selectable(false),
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_shrinks_oversized_images() {
        let size = image_fit_size(egui::vec2(2000.0, 1000.0), egui::vec2(500.0, 500.0));
        assert_eq!(size, egui::vec2(500.0, 250.0));
    }

    #[test]
    fn fit_never_upscales() {
        let size = image_fit_size(egui::vec2(100.0, 80.0), egui::vec2(500.0, 500.0));
        assert_eq!(size, egui::vec2(100.0, 80.0));
    }

    #[test]
    fn fit_handles_degenerate_input() {
        assert_eq!(
            image_fit_size(egui::vec2(0.0, 0.0), egui::vec2(500.0, 500.0)),
            egui::Vec2::ZERO
        );
    }

    #[test]
    fn fit_respects_tall_images() {
        let size = image_fit_size(egui::vec2(400.0, 1600.0), egui::vec2(300.0, 400.0));
        assert_eq!(size, egui::vec2(100.0, 400.0));
    }
}
