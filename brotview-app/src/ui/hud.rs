use eframe::egui;

use brotview_core::ViewState;
use brotview_render::CycleState;

use crate::app::{BrotViewApp, HUD_CORNER_RADIUS, HUD_MARGIN};

const HUD_ALPHA: u8 = 166;

impl BrotViewApp {
    pub(crate) fn show_hud(&mut self, ctx: &egui::Context) {
        if !self.show_hud {
            return;
        }

        // -- Top-left: view info --
        egui::Area::new(egui::Id::new("hud_view"))
            .anchor(egui::Align2::LEFT_TOP, [HUD_MARGIN, HUD_MARGIN])
            .show(ctx, |ui| {
                hud_frame().show(ui, |ui| {
                    ui.style_mut().visuals.override_text_color =
                        Some(egui::Color32::from_rgb(220, 220, 220));

                    let rect = self.session.rect();
                    ui.label(format!("Center: {}", rect.center()));
                    ui.label(format!("Width: {:.3e}", rect.w));
                    ui.label(format!("Zoom: {:.2e}", ViewState::FULL_SET.w / rect.w));
                    ui.label(format!("Iterations: {}", self.session.iteration_budget()));
                    ui.label(format!("Color map: {}", self.session.color_map_name()));
                    if let Some(c) = self.cursor_plane {
                        ui.label(format!("Cursor: {c}"));
                    }
                });
            });

        // -- Bottom-centre: render phase --
        egui::Area::new(egui::Id::new("hud_render"))
            .anchor(egui::Align2::CENTER_BOTTOM, [0.0, -HUD_MARGIN])
            .show(ctx, |ui| {
                hud_frame().show(ui, |ui| {
                    ui.set_min_width(160.0);
                    ui.style_mut().visuals.override_text_color =
                        Some(egui::Color32::from_rgb(200, 200, 200));
                    ui.style_mut().spacing.item_spacing.y = 2.0;

                    let state = self.scheduler.state();
                    let phase_color = match state {
                        CycleState::Idle => egui::Color32::GRAY,
                        CycleState::Coarse | CycleState::Refining(_) => egui::Color32::YELLOW,
                        CycleState::Settled => egui::Color32::from_rgb(100, 255, 100),
                    };
                    ui.colored_label(phase_color, state.label());

                    if let CycleState::Refining(block) = state {
                        ui.label(format!("{block}\u{00d7}{block} blocks"));
                    }
                    if let Some(elapsed) = self.last_cycle_time {
                        ui.label(format!("{:.1} ms", elapsed.as_secs_f64() * 1000.0));
                    }
                    if self.scheduler.is_inline() {
                        ui.colored_label(
                            egui::Color32::from_rgb(255, 180, 50),
                            "Worker unavailable, rendering inline",
                        );
                    }
                });
            });
    }

    /// Thin bar along the bottom edge of the canvas while passes are pending.
    pub(crate) fn draw_progress_bar(&self, painter: &egui::Painter, canvas: egui::Rect) {
        if !self.scheduler.state().is_busy() {
            return;
        }
        let (done, total) = self.scheduler.progress();
        if total == 0 {
            return;
        }
        let frac = (done as f32 / total as f32).clamp(0.0, 1.0);
        let bar_h = 3.0;
        let bar_y = canvas.max.y - bar_h;

        painter.rect_filled(
            egui::Rect::from_min_size(
                egui::pos2(canvas.min.x, bar_y),
                egui::vec2(canvas.width(), bar_h),
            ),
            0.0,
            egui::Color32::from_rgba_premultiplied(0, 0, 0, 120),
        );
        if frac > 0.0 {
            painter.rect_filled(
                egui::Rect::from_min_size(
                    egui::pos2(canvas.min.x, bar_y),
                    egui::vec2(canvas.width() * frac, bar_h),
                ),
                0.0,
                egui::Color32::from_rgb(80, 200, 255),
            );
        }
    }
}

fn hud_frame() -> egui::Frame {
    egui::Frame::NONE
        .fill(egui::Color32::from_black_alpha(HUD_ALPHA))
        .inner_margin(egui::Margin::same(8))
        .corner_radius(HUD_CORNER_RADIUS)
}
