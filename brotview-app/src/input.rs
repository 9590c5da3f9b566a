use eframe::egui;

use brotview_core::navigation::{pan, zoom_at, zoom_center};
use brotview_core::{map_point, Vector};

use crate::app::{BrotViewApp, KEY_ZOOM_FACTOR, POINTS_PER_LINE};

/// Convert a wheel scroll in points to zoom lines. Scrolling up (positive
/// `scroll_y`) gives negative lines, which zoom in.
pub(crate) fn scroll_to_lines(scroll_y: f32) -> f64 {
    -(scroll_y / POINTS_PER_LINE) as f64
}

impl BrotViewApp {
    pub(crate) fn handle_canvas_input(&mut self, ctx: &egui::Context, response: &egui::Response) {
        let viewport = self.viewport_rect();
        let origin = response.rect.min;
        let to_canvas =
            |pos: egui::Pos2| Vector::new((pos.x - origin.x) as f64, (pos.y - origin.y) as f64);

        self.cursor_plane = response
            .hover_pos()
            .map(|pos| map_point(to_canvas(pos), &viewport, &self.session.rect()));

        let scroll_y = ctx.input(|i| i.raw_scroll_delta.y);
        if scroll_y.abs() > 0.0 && response.hovered() {
            if let Some(pos) = response.hover_pos() {
                let rect = zoom_at(
                    &self.session.rect(),
                    to_canvas(pos),
                    &viewport,
                    scroll_to_lines(scroll_y),
                );
                self.apply_rect(rect);
            }
        }

        if response.dragged_by(egui::PointerButton::Primary) {
            let delta = response.drag_delta();
            if delta != egui::Vec2::ZERO {
                let rect = pan(
                    &self.session.rect(),
                    Vector::new(delta.x as f64, delta.y as f64),
                    Vector::new(viewport.w, viewport.h),
                );
                self.apply_rect(rect);
            }
        }
    }

    pub(crate) fn handle_keyboard(&mut self, ctx: &egui::Context) {
        if ctx.memory(|m| m.focused().is_some()) {
            return;
        }

        let (zoom_in, zoom_out, reset, toggle_hud, toggle_controls) = ctx.input(|input| {
            (
                input.key_pressed(egui::Key::Plus) || input.key_pressed(egui::Key::Equals),
                input.key_pressed(egui::Key::Minus),
                input.key_pressed(egui::Key::R),
                input.key_pressed(egui::Key::H),
                input.key_pressed(egui::Key::C),
            )
        });

        if zoom_in {
            self.apply_rect(zoom_center(&self.session.rect(), KEY_ZOOM_FACTOR));
        }
        if zoom_out {
            self.apply_rect(zoom_center(&self.session.rect(), 1.0 / KEY_ZOOM_FACTOR));
        }
        if reset {
            self.reset_view();
        }
        if toggle_hud {
            self.show_hud = !self.show_hud;
        }
        if toggle_controls {
            self.show_controls = !self.show_controls;
        }
    }
}
