use std::time::Instant;

use eframe::egui;
use tracing::{debug, info, warn};

use brotview_render::{PixelBuffer, RenderRequest};

use crate::app::BrotViewApp;

impl BrotViewApp {
    /// Start a new render cycle for the current view and show its coarse pass.
    pub(crate) fn request_render(&mut self, ctx: &egui::Context) {
        self.needs_render.set(false);
        let [width, height] = self.panel_size;
        let request = match RenderRequest::from_session(
            &self.session,
            width,
            height,
            self.session.max_block_size(),
        ) {
            Ok(request) => request,
            Err(e) => {
                warn!("Cannot render current view: {e}");
                return;
            }
        };

        debug!(
            rect = ?request.plane_rect,
            budget = request.params.iteration_budget,
            width,
            height,
            "Requesting render"
        );
        match self.scheduler.start_cycle(request) {
            Ok(()) => {
                self.cycle_started = Some(Instant::now());
                self.last_cycle_time = None;
                self.upload_pending(ctx);
            }
            Err(e) => warn!("Render cycle rejected: {e}"),
        }
    }

    pub(crate) fn poll_frames(&mut self, ctx: &egui::Context) {
        self.scheduler.poll();
        self.upload_pending(ctx);

        if self.scheduler.state().is_settled() {
            if let Some(start) = self.cycle_started.take() {
                let elapsed = start.elapsed();
                info!(
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    generation = self.scheduler.generation(),
                    "Render complete"
                );
                self.last_cycle_time = Some(elapsed);
            }
        }
    }

    fn upload_pending(&mut self, ctx: &egui::Context) {
        if let Some(buffer) = self.scheduler.take_frame() {
            self.apply_frame(ctx, buffer);
        }
    }

    fn apply_frame(&mut self, ctx: &egui::Context, buffer: PixelBuffer) {
        let image = egui::ColorImage::from_rgba_unmultiplied(
            [buffer.width as usize, buffer.height as usize],
            &buffer.pixels,
        );
        // Nearest filtering keeps coarse passes visibly blocky.
        match self.texture {
            Some(ref mut tex) => tex.set(image, egui::TextureOptions::NEAREST),
            None => {
                self.texture = Some(ctx.load_texture("fractal", image, egui::TextureOptions::NEAREST));
            }
        }
    }
}
