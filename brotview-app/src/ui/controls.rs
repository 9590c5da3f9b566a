use eframe::egui;
use tracing::warn;

use brotview_core::{Rect, Vector};

use crate::app::BrotViewApp;

const MAX_ITERATION_BUDGET: u32 = 100_000;

/// Parse the "go to" form into a plane rectangle whose height follows the
/// canvas aspect ratio (`height / width`).
pub(crate) fn parse_goto(re: &str, im: &str, width: &str, aspect: f64) -> Result<Rect, String> {
    let field = |text: &str, label: &str| {
        text.trim()
            .parse::<f64>()
            .map_err(|_| format!("{label} is not a number"))
    };
    let center = Vector::new(field(re, "Real part")?, field(im, "Imaginary part")?);
    let w = field(width, "Width")?;
    let h = w * aspect;
    let rect = Rect {
        x: center.x - w / 2.0,
        y: center.y - h / 2.0,
        w,
        h,
    };
    if !rect.is_valid() {
        return Err("Width must be positive and all values finite".into());
    }
    Ok(rect)
}

impl BrotViewApp {
    pub(crate) fn show_controls_panel(&mut self, ctx: &egui::Context) {
        if !self.show_controls || !self.show_hud {
            return;
        }

        let mut open = true;
        egui::Window::new("Controls")
            .open(&mut open)
            .resizable(false)
            .anchor(egui::Align2::RIGHT_TOP, [-8.0, 8.0])
            .default_width(280.0)
            .frame(
                egui::Frame::window(&ctx.style())
                    .fill(egui::Color32::from_rgba_unmultiplied(10, 10, 10, 210)),
            )
            .show(ctx, |ui| {
                self.iteration_controls(ui);
                ui.add_space(6.0);
                self.color_map_controls(ui);

                ui.separator();
                ui.heading("Go to");
                self.goto_controls(ui);

                ui.separator();
                ui.heading("Bookmarks");
                self.bookmark_controls(ui);

                ui.separator();
                if ui.button("Reset view").clicked() {
                    self.reset_view();
                }
            });
        if !open {
            self.show_controls = false;
        }
    }

    fn iteration_controls(&mut self, ui: &mut egui::Ui) {
        let mut budget = self.session.iteration_budget();
        let slider = egui::Slider::new(&mut budget, 1..=MAX_ITERATION_BUDGET)
            .logarithmic(true)
            .text("Iterations");
        if ui.add(slider).changed() && budget != self.session.iteration_budget() {
            if let Err(e) = self.session.set_iteration_budget(budget) {
                warn!("Rejected iteration budget: {e}");
            }
        }
    }

    fn color_map_controls(&mut self, ui: &mut egui::Ui) {
        let current = self.session.color_map_name().to_string();
        let mut selected = current.clone();
        egui::ComboBox::from_label("Color map")
            .selected_text(&current)
            .show_ui(ui, |ui| {
                for name in self.session.color_maps().names() {
                    ui.selectable_value(&mut selected, name.to_string(), name);
                }
            });
        if selected != current {
            if let Err(e) = self.session.set_color_map(&selected) {
                warn!("Rejected color map: {e}");
            }
        }
    }

    fn goto_controls(&mut self, ui: &mut egui::Ui) {
        egui::Grid::new("goto_grid").num_columns(2).show(ui, |ui| {
            ui.label("Re");
            ui.text_edit_singleline(&mut self.goto_re);
            ui.end_row();
            ui.label("Im");
            ui.text_edit_singleline(&mut self.goto_im);
            ui.end_row();
            ui.label("Width");
            ui.text_edit_singleline(&mut self.goto_width);
            ui.end_row();
        });
        if ui.button("Go").clicked() {
            let [w, h] = self.panel_size;
            let aspect = if w > 0 { h as f64 / w as f64 } else { 1.0 };
            match parse_goto(&self.goto_re, &self.goto_im, &self.goto_width, aspect) {
                Ok(rect) => {
                    self.goto_error = None;
                    self.apply_rect(rect);
                }
                Err(message) => self.goto_error = Some(message),
            }
        }
        if let Some(ref message) = self.goto_error {
            ui.colored_label(egui::Color32::from_rgb(255, 120, 120), message);
        }
    }

    fn bookmark_controls(&mut self, ui: &mut egui::Ui) {
        let mut jump = None;
        let mut remove = None;
        for bookmark in self.bookmark_store.all() {
            ui.horizontal(|ui| {
                if ui
                    .button(&bookmark.name)
                    .on_hover_text(bookmark.summary())
                    .clicked()
                {
                    jump = Some(bookmark.rect);
                }
                if !self.bookmark_store.is_builtin(&bookmark.name)
                    && ui.small_button("\u{2715}").on_hover_text("Remove").clicked()
                {
                    remove = Some(bookmark.name.clone());
                }
            });
        }
        if let Some(rect) = jump {
            self.jump_to(rect);
        }
        if let Some(name) = remove {
            if self.bookmark_store.remove(&name) {
                self.bookmark_store.save();
            }
        }

        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut self.bookmark_name)
                    .hint_text("Name")
                    .desired_width(140.0),
            );
            if ui.button("Save view").clicked() {
                match self.bookmark_store.add(&self.bookmark_name, self.session.rect()) {
                    Ok(()) => {
                        self.bookmark_store.save();
                        self.bookmark_name.clear();
                        self.bookmark_error = None;
                    }
                    Err(e) => self.bookmark_error = Some(e.to_string()),
                }
            }
        });
        if let Some(ref message) = self.bookmark_error {
            ui.colored_label(egui::Color32::from_rgb(255, 120, 120), message);
        }
    }
}
