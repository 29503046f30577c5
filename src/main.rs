#![windows_subsystem = "windows"]
//! SegView - Main entry point

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod app;
mod constants;
mod settings;
mod theme;
mod types;
mod ui;
mod utils;

use app::App;
use constants::*;
use eframe::egui;
use std::path::PathBuf;
use tracing::info;
use ui::components::{error_banner, image_fit_size, panel_header};
use utils::format_bytes;

/// Initialize file logging. Returns a guard that must be held for the app lifetime.
fn init_logging(data_dir: &std::path::Path) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let logs_dir = data_dir.join("logs");
    std::fs::create_dir_all(&logs_dir).ok();

    let file_appender = tracing_appender::rolling::daily(&logs_dir, "segview.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,segview=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    guard
}

fn main() -> eframe::Result<()> {
    let data_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("SegView");

    std::fs::create_dir_all(&data_dir).ok();

    // Initialize logging - guard must live for entire app lifetime
    let _log_guard = init_logging(&data_dir);

    info!(version = APP_VERSION, "SegView starting");

    // Load saved window position/size
    let settings = settings::Settings::load(&data_dir);
    let win_pos = match (settings.window_x, settings.window_y) {
        (Some(x), Some(y)) => Some(egui::pos2(x, y)),
        _ => None,
    };
    let win_size = match (settings.window_w, settings.window_h) {
        (Some(w), Some(h)) => Some(egui::vec2(w, h)),
        _ => None,
    };

    let mut viewport = egui::ViewportBuilder::default()
        .with_inner_size(win_size.unwrap_or(egui::vec2(1100.0, 760.0)))
        .with_min_inner_size([860.0, 620.0])
        .with_title("SegView");

    // Set window/taskbar icon from the in-tree SVG
    {
        let (pixels, w, h) = utils::rasterize_logo_square(64);
        let icon = egui::IconData {
            rgba: pixels,
            width: w,
            height: h,
        };
        viewport = viewport.with_icon(std::sync::Arc::new(icon));
    }

    let needs_center = win_pos.is_none();

    if let Some(pos) = win_pos {
        viewport = viewport.with_position(pos);
    }

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "SegView",
        options,
        Box::new(move |cc| {
            let mut app = App::new(cc, settings, data_dir);
            app.needs_center = needs_center;
            Ok(Box::new(app))
        }),
    )
}

// ============================================================================
// MAIN UPDATE LOOP & UI RENDERING
// ============================================================================

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Track window position/size for saving on exit
        ctx.input(|i| {
            if let Some(rect) = i.viewport().outer_rect {
                self.window_pos = Some(rect.min);
            }
            if let Some(rect) = i.viewport().inner_rect {
                self.window_size = Some(rect.size());
            }
        });

        // Center window on first launch
        if self.needs_center {
            self.needs_center = false;
            if let Some(cmd) = egui::ViewportCommand::center_on_screen(ctx) {
                ctx.send_viewport_cmd(cmd);
            }
        }

        // Drain finished/failed analyses from the worker
        self.poll_analysis(ctx);

        // Progress bar upkeep: animate while in flight, linger at 100, then clear
        if self.progress.as_ref().is_some_and(|p| p.should_clear()) {
            self.progress = None;
        }
        if self.is_analyzing() || self.progress.is_some() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }

        // Drag & drop: highlight while hovering, take the first dropped path
        self.drop_hover = ctx.input(|i| !i.raw.hovered_files.is_empty());
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if let Some(path) = dropped.into_iter().find_map(|f| f.path) {
            self.select_image(ctx, &path);
        }

        self.render_settings_modal(ctx);

        // Central panel - upload view
        egui::CentralPanel::default()
            .frame(
                egui::Frame::new()
                    .fill(theme::BG_BASE)
                    .inner_margin(egui::Margin::same(16)),
            )
            .show(ctx, |ui| {
                // Store panel rect for toast positioning
                self.central_panel_rect = Some(ui.max_rect());

                self.render_header(ui, ctx);
                ui.add_space(theme::SPACING_MD);
                self.render_upload_card(ui, ctx);
                ui.add_space(theme::SPACING_LG);
                self.render_results(ui);
            });

        self.render_toast(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Application shutting down");
        self.save_settings();
    }
}

// ============================================================================
// VIEW RENDERING
// ============================================================================

impl App {
    fn render_header(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.horizontal(|ui| {
            let texture = self.logo_texture.get_or_insert_with(|| {
                let (pixels, w, h) = utils::rasterize_logo(96);
                ctx.load_texture(
                    "logo",
                    egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], &pixels),
                    egui::TextureOptions::LINEAR,
                )
            });
            let logo_size = egui::vec2(44.0, 44.0);
            ui.image(egui::load::SizedTexture::new(texture.id(), logo_size));

            ui.add_space(theme::SPACING_SM);
            ui.vertical(|ui| {
                ui.add(
                    egui::Label::new(
                        egui::RichText::new("SegView")
                            .size(theme::FONT_TITLE)
                            .strong()
                            .color(theme::TEXT_PRIMARY),
                    )
                    .selectable(false),
                );
                ui.add(
                    egui::Label::new(
                        egui::RichText::new(
                            "Upload an image and view its segmentation from the prediction service",
                        )
                        .size(theme::FONT_SMALL)
                        .color(theme::TEXT_DIM),
                    )
                    .selectable(false),
                );
            });

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                // Settings gear
                if ui
                    .add(egui::Button::new(egui_phosphor::regular::GEAR).frame(false))
                    .on_hover_text("Settings")
                    .clicked()
                {
                    self.show_settings = !self.show_settings;
                }
                ui.add(
                    egui::Label::new(
                        egui::RichText::new(self.server_url_normalized())
                            .size(theme::FONT_SMALL)
                            .color(theme::TEXT_DIM),
                    )
                    .selectable(false),
                );
            });
        });
    }

    fn render_upload_card(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let analyzing = self.is_analyzing();

        theme::card_frame().show(ui, |ui| {
            // Drop zone - whole area is clickable, accent border while a file hovers
            let zone_height = 150.0;
            let stroke = if self.drop_hover {
                egui::Stroke::new(theme::STROKE_MEDIUM, theme::ACCENT)
            } else {
                egui::Stroke::new(theme::STROKE_DEFAULT, theme::BORDER_DEFAULT)
            };
            let zone_response = egui::Frame::new()
                .fill(theme::BG_INPUT)
                .stroke(stroke)
                .corner_radius(theme::RADIUS_LARGE)
                .inner_margin(egui::Margin::same(12))
                .show(ui, |ui| {
                    ui.set_min_height(zone_height);
                    ui.vertical_centered(|ui| {
                        ui.add_space(theme::SPACING_XL);
                        ui.label(
                            egui::RichText::new(egui_phosphor::regular::UPLOAD_SIMPLE)
                                .size(36.0)
                                .color(if self.drop_hover {
                                    theme::ACCENT_LIGHT
                                } else {
                                    theme::ACCENT
                                }),
                        );
                        ui.add_space(theme::SPACING_SM);
                        ui.label(
                            egui::RichText::new("Drag and drop an image here")
                                .size(theme::FONT_BODY)
                                .color(theme::TEXT_SECONDARY),
                        );
                        ui.label(
                            egui::RichText::new("or")
                                .size(theme::FONT_SMALL)
                                .color(theme::TEXT_MUTED),
                        );
                        ui.add_space(theme::SPACING_SM);
                        if ui
                            .add(theme::button(format!(
                                "{}  Choose Image",
                                egui_phosphor::regular::IMAGE
                            )))
                            .clicked()
                        {
                            self.pick_image(ctx);
                        }
                        ui.add_space(theme::SPACING_MD);
                    });
                });
            let zone_rect = zone_response.response.rect;
            let zone_click = ui.interact(
                zone_rect,
                ui.id().with("drop_zone"),
                egui::Sense::click(),
            );
            if zone_click.clicked() {
                self.pick_image(ctx);
            }
            if zone_click.hovered() {
                ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
            }

            // Selected file row
            if let Some(selected) = self.selected_image.clone() {
                ui.add_space(theme::SPACING_MD);
                ui.horizontal(|ui| {
                    ui.colored_label(theme::ACCENT, egui_phosphor::regular::FILE_IMAGE);
                    ui.add(
                        egui::Label::new(
                            egui::RichText::new(&selected.file_name)
                                .size(theme::FONT_LABEL)
                                .color(theme::TEXT_PRIMARY),
                        )
                        .selectable(false)
                        .truncate(),
                    );
                    ui.add(
                        egui::Label::new(
                            egui::RichText::new(format!(
                                "{}\u{00d7}{} \u{2022} {}",
                                selected.width,
                                selected.height,
                                format_bytes(selected.size_bytes)
                            ))
                            .size(theme::FONT_SMALL)
                            .color(theme::TEXT_DIM),
                        )
                        .selectable(false),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let close_size = 20.0;
                        let (rect, response) = ui.allocate_exact_size(
                            egui::vec2(close_size, close_size),
                            egui::Sense::click(),
                        );
                        let close_color = if response.hovered() {
                            ui.painter().rect_filled(rect, 4.0, theme::BG_SURFACE);
                            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
                            theme::STATUS_ERROR
                        } else {
                            theme::TEXT_DIM
                        };
                        ui.painter().text(
                            rect.center(),
                            egui::Align2::CENTER_CENTER,
                            egui_phosphor::regular::X,
                            egui::FontId::proportional(14.0),
                            close_color,
                        );
                        if response.clicked() && !analyzing {
                            self.clear_selection();
                        }
                    });
                });
            }

            // Progress row while a request is in flight (and the 100% linger)
            if let Some(progress) = &self.progress {
                let pct = progress.percent();
                ui.add_space(theme::SPACING_MD);
                ui.horizontal(|ui| {
                    ui.colored_label(theme::ACCENT, egui_phosphor::regular::LIGHTNING);
                    ui.add(
                        egui::Label::new(
                            egui::RichText::new(format!("Processing... {}%", pct))
                                .size(theme::FONT_LABEL)
                                .color(theme::TEXT_SECONDARY),
                        )
                        .selectable(false),
                    );
                });
                let bar = egui::ProgressBar::new(pct as f32 / 100.0)
                    .desired_width(ui.available_width())
                    .corner_radius(3.0)
                    .fill(theme::ACCENT);
                ui.add(bar);
            } else if self.selected_image.is_some() && !analyzing {
                // Analyze button, hidden while a request is outstanding
                ui.add_space(theme::SPACING_MD);
                let analyze = theme::button_accent(format!(
                    "{}  Analyze Image",
                    egui_phosphor::regular::ROCKET_LAUNCH
                ))
                .min_size(egui::vec2(ui.available_width(), 36.0));
                if ui.add(analyze).clicked() {
                    self.start_analysis(ctx);
                }
            }

            if let Some(message) = self.error_message.clone() {
                ui.add_space(theme::SPACING_MD);
                error_banner(ui, &message);
            }
        });
    }

    fn render_results(&mut self, ui: &mut egui::Ui) {
        if self.preview_texture.is_none() && self.result_texture.is_none() {
            return;
        }

        let avail_height = (ui.available_height() - theme::SPACING_XL).max(120.0);

        if self.result_texture.is_some() {
            // Side by side: original | segmentation result
            ui.columns(2, |cols| {
                if let Some(texture) = self.preview_texture.clone() {
                    render_image_panel(
                        &mut cols[0],
                        ImagePanel {
                            texture: &texture,
                            icon: egui_phosphor::regular::UPLOAD_SIMPLE,
                            color: theme::STATUS_INFO,
                            title: "Original",
                            max_height: avail_height,
                        },
                        None,
                    );
                }
                let texture = self.result_texture.clone();
                if let Some(texture) = texture {
                    let mut save_clicked = false;
                    render_image_panel(
                        &mut cols[1],
                        ImagePanel {
                            texture: &texture,
                            icon: egui_phosphor::regular::CHECK,
                            color: theme::STATUS_SUCCESS,
                            title: "Segmentation Result",
                            max_height: avail_height,
                        },
                        Some(&mut save_clicked),
                    );
                    if save_clicked {
                        self.save_result();
                    }
                }
            });
        } else if let Some(texture) = self.preview_texture.clone() {
            render_image_panel(
                ui,
                ImagePanel {
                    texture: &texture,
                    icon: egui_phosphor::regular::UPLOAD_SIMPLE,
                    color: theme::STATUS_INFO,
                    title: "Original",
                    max_height: avail_height,
                },
                None,
            );
        }
    }

    // ========================================================================
    // SETTINGS MODAL
    // ========================================================================

    fn render_settings_modal(&mut self, ctx: &egui::Context) {
        if !self.show_settings {
            return;
        }

        let modal_response = egui::Modal::new(egui::Id::new("settings_modal"))
            .backdrop_color(egui::Color32::from_black_alpha(120))
            .frame(theme::modal_frame())
            .show(ctx, |ui| {
                ui.set_width(340.0);

                // Title bar with close button
                ui.horizontal(|ui| {
                    ui.add(
                        egui::Label::new(egui::RichText::new("Settings").size(16.0).strong())
                            .selectable(false),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let close_size = 24.0;
                        let (rect, response) = ui.allocate_exact_size(
                            egui::vec2(close_size, close_size),
                            egui::Sense::click(),
                        );
                        let close_color = if response.hovered() {
                            ui.painter().rect_filled(rect, 4.0, theme::BG_SURFACE);
                            ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
                            theme::STATUS_ERROR
                        } else {
                            theme::TEXT_DIM
                        };
                        ui.painter().text(
                            rect.center(),
                            egui::Align2::CENTER_CENTER,
                            egui_phosphor::regular::X,
                            egui::FontId::proportional(16.0),
                            close_color,
                        );
                        if response.clicked() {
                            self.show_settings = false;
                            self.save_settings();
                        }
                    });
                });
                ui.add_space(4.0);
                ui.separator();
                ui.add_space(theme::SPACING_SM);

                // — Prediction Server —
                ui.add(
                    egui::Label::new(
                        egui::RichText::new("Prediction Server")
                            .size(13.0)
                            .color(theme::ACCENT),
                    )
                    .selectable(false),
                );
                ui.add_space(2.0);

                ui.horizontal(|ui| {
                    ui.spacing_mut().item_spacing.x = 4.0;
                    let reset_width = 28.0 + 4.0; // button + spacing
                    let frame_padding = 12.0 + 2.0; // inner_margin (6*2) + stroke (1*2)
                    let text_width = (ui.available_width() - reset_width - frame_padding).max(40.0);
                    let te = egui::Frame::new()
                        .fill(theme::BG_INPUT)
                        .stroke(egui::Stroke::new(1.0, theme::BORDER_SUBTLE))
                        .corner_radius(4.0)
                        .inner_margin(egui::Margin::symmetric(6, 4))
                        .show(ui, |ui| {
                            ui.add(
                                egui::TextEdit::singleline(&mut self.server_url_str)
                                    .frame(false)
                                    .desired_width(text_width)
                                    .font(egui::FontId::proportional(13.0)),
                            )
                        })
                        .inner;
                    // Reset button (aligned to text input height)
                    let (rect, resp) =
                        ui.allocate_exact_size(egui::vec2(28.0, 28.0), egui::Sense::click());
                    if resp.hovered() {
                        ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
                        ui.painter().rect_filled(rect, 4.0, theme::BG_SURFACE);
                    }
                    ui.painter().text(
                        rect.center(),
                        egui::Align2::CENTER_CENTER,
                        egui_phosphor::regular::ARROW_COUNTER_CLOCKWISE,
                        egui::FontId::proportional(16.0),
                        theme::TEXT_SECONDARY,
                    );
                    if resp.on_hover_text("Reset to default").clicked() {
                        self.server_url_str = DEFAULT_SERVER_URL.to_string();
                        self.save_settings();
                    }
                    if te.lost_focus() {
                        self.save_settings();
                    }
                });

                ui.add(
                    egui::Label::new(
                        egui::RichText::new(format!(
                            "Images are posted to {}{}",
                            self.server_url_normalized(),
                            PREDICT_ROUTE
                        ))
                        .size(theme::FONT_SMALL)
                        .color(theme::TEXT_DIM),
                    )
                    .selectable(false),
                );

                ui.add_space(theme::SPACING_MD);
                ui.separator();
                ui.add_space(theme::SPACING_SM);

                // — Logs —
                ui.add(
                    egui::Label::new(egui::RichText::new("Logs").size(13.0).color(theme::ACCENT))
                        .selectable(false),
                );
                ui.add_space(2.0);
                let base = theme::BTN_DEFAULT;
                let (rect, response) =
                    ui.allocate_exact_size(egui::vec2(140.0, 26.0), egui::Sense::click());
                if response.hovered() {
                    ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
                }
                let (fill, draw_rect) = theme::button_visual(&response, base, rect);
                ui.painter().rect_filled(draw_rect, 4.0, fill);
                ui.painter().text(
                    draw_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    format!("{}  Open Logs Folder", egui_phosphor::regular::FOLDER_OPEN),
                    egui::FontId::proportional(12.0),
                    egui::Color32::WHITE,
                );
                if response.clicked() {
                    let logs_dir = self.data_dir.join("logs");
                    std::fs::create_dir_all(&logs_dir).ok();
                    let _ = open::that(&logs_dir);
                }
            });

        if modal_response.should_close() {
            self.show_settings = false;
            self.save_settings();
        }
    }

    // ========================================================================
    // TOAST NOTIFICATION
    // ========================================================================

    // Bottom-right of central panel, 3s visible then fade, pause on hover
    fn render_toast(&mut self, ctx: &egui::Context) {
        if let (Some(msg), Some(panel_rect)) = (&self.toast_message.clone(), self.central_panel_rect)
        {
            let visible_duration = 3.0;
            let fade_duration = 0.5;
            let total_duration = visible_duration + fade_duration;
            let margin = 12.0;

            let toast_pos = egui::pos2(panel_rect.right() - margin, panel_rect.bottom() - margin);

            let response = egui::Area::new(egui::Id::new("segview_toast"))
                .fixed_pos(toast_pos)
                .pivot(egui::Align2::RIGHT_BOTTOM)
                .show(ctx, |ui| {
                    let elapsed = self
                        .toast_start
                        .map(|t| t.elapsed().as_secs_f32())
                        .unwrap_or(0.0);
                    let alpha = if elapsed > visible_duration {
                        (total_duration - elapsed) / fade_duration
                    } else {
                        1.0
                    };

                    egui::Frame::new()
                        .fill(egui::Color32::from_rgba_unmultiplied(
                            0x1a,
                            0x1a,
                            0x1e,
                            (230.0 * alpha) as u8,
                        ))
                        .stroke(egui::Stroke::new(
                            1.0,
                            egui::Color32::from_rgba_unmultiplied(
                                theme::ACCENT.r(),
                                theme::ACCENT.g(),
                                theme::ACCENT.b(),
                                (100.0 * alpha) as u8,
                            ),
                        ))
                        .corner_radius(6.0)
                        .inner_margin(egui::Margin::symmetric(16, 10))
                        .show(ui, |ui| {
                            ui.label(egui::RichText::new(msg).color(
                                egui::Color32::from_rgba_unmultiplied(
                                    255,
                                    255,
                                    255,
                                    (255.0 * alpha) as u8,
                                ),
                            ));
                        });
                });

            // Pause timer while hovering
            if response.response.hovered() {
                self.toast_start = Some(std::time::Instant::now());
            }

            let elapsed = self
                .toast_start
                .map(|t| t.elapsed().as_secs_f32())
                .unwrap_or(0.0);
            if elapsed >= total_duration {
                self.toast_message = None;
                self.toast_start = None;
            } else {
                ctx.request_repaint();
            }
        }
    }
}

// ============================================================================
// IMAGE PANELS
// ============================================================================

struct ImagePanel<'a> {
    texture: &'a egui::TextureHandle,
    icon: &'a str,
    color: egui::Color32,
    title: &'a str,
    max_height: f32,
}

/// Captioned, framed image scaled to fit. `save_clicked` adds a save button
/// to the header and reports clicks back to the caller.
fn render_image_panel(ui: &mut egui::Ui, panel: ImagePanel<'_>, save_clicked: Option<&mut bool>) {
    theme::section_frame().show(ui, |ui| {
        ui.horizontal(|ui| {
            panel_header(ui, panel.icon, panel.color, panel.title);
            if let Some(save_clicked) = save_clicked {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .add(egui::Button::new(egui_phosphor::regular::FLOPPY_DISK).frame(false))
                        .on_hover_text("Save result image")
                        .clicked()
                    {
                        *save_clicked = true;
                    }
                });
            }
        });
        ui.add_space(theme::SPACING_SM);

        let tex_size = panel.texture.size_vec2();
        let avail = egui::vec2(
            ui.available_width(),
            (panel.max_height - 48.0).max(80.0), // header + margins
        );
        let fit = image_fit_size(tex_size, avail);
        ui.vertical_centered(|ui| {
            ui.image(egui::load::SizedTexture::new(panel.texture.id(), fit));
        });
    });
}
