use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui;
use tracing::{info, warn};

use brotview_core::navigation::fit_aspect;
use brotview_core::{ColorMapRegistry, Rect, Session, Topic, Vector, ViewState};
use brotview_render::Scheduler;

use crate::bookmarks::BookmarkStore;
use crate::preferences::AppPreferences;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Wheel scroll points that count as one zoom line.
pub(crate) const POINTS_PER_LINE: f32 = 40.0;
/// Zoom factor of the keyboard `+` / `-` shortcuts.
pub(crate) const KEY_ZOOM_FACTOR: f64 = 0.8;
pub(crate) const HUD_MARGIN: f32 = 8.0;
pub(crate) const HUD_CORNER_RADIUS: f32 = 6.0;

// ---------------------------------------------------------------------------
// Application struct
// ---------------------------------------------------------------------------

pub(crate) struct BrotViewApp {
    // View state
    pub(crate) session: Session,
    /// Raised by the session subscribers; the next frame starts a new cycle.
    pub(crate) needs_render: Rc<Cell<bool>>,

    // Rendering
    pub(crate) scheduler: Scheduler,
    pub(crate) texture: Option<egui::TextureHandle>,
    pub(crate) cycle_started: Option<Instant>,
    pub(crate) last_cycle_time: Option<Duration>,

    // UI state
    pub(crate) panel_size: [u32; 2],
    pub(crate) cursor_plane: Option<Vector>,
    pub(crate) show_hud: bool,
    pub(crate) show_controls: bool,
    pub(crate) goto_re: String,
    pub(crate) goto_im: String,
    pub(crate) goto_width: String,
    pub(crate) goto_error: Option<String>,

    // Bookmarks & preferences
    pub(crate) bookmark_store: BookmarkStore,
    pub(crate) bookmark_name: String,
    pub(crate) bookmark_error: Option<String>,
    pub(crate) preferences: AppPreferences,
}

// ---------------------------------------------------------------------------
// Constructor
// ---------------------------------------------------------------------------

impl BrotViewApp {
    pub(crate) fn new(egui_ctx: &egui::Context, prefs: AppPreferences) -> Self {
        let mut session = match Session::new(prefs.view_state(), ColorMapRegistry::builtin()) {
            Ok(session) => session,
            Err(e) => {
                warn!("Stored view rejected, starting from defaults: {e}");
                Session::with_defaults()
            }
        };
        if prefs.restore_last_view && prefs.last_view.is_some() {
            info!(rect = ?session.rect(), "Restoring last view");
        }

        let needs_render = Rc::new(Cell::new(true));
        for topic in Topic::ALL {
            let flag = Rc::clone(&needs_render);
            session.subscribe(topic, move |_, _| flag.set(true));
        }

        let ctx = egui_ctx.clone();
        let scheduler = Scheduler::new(Some(Arc::new(move || ctx.request_repaint())));

        let mut app = Self {
            session,
            needs_render,
            scheduler,
            texture: None,
            cycle_started: None,
            last_cycle_time: None,
            panel_size: [0, 0],
            cursor_plane: None,
            show_hud: true,
            show_controls: true,
            goto_re: String::new(),
            goto_im: String::new(),
            goto_width: String::new(),
            goto_error: None,
            bookmark_store: BookmarkStore::load(),
            bookmark_name: String::new(),
            bookmark_error: None,
            preferences: prefs,
        };
        app.sync_goto_fields();
        app
    }

    // -- View helpers ----------------------------------------------------------

    /// Pixel-space rectangle of the canvas.
    pub(crate) fn viewport_rect(&self) -> Rect {
        Rect::from_size(self.panel_size[0], self.panel_size[1])
    }

    /// Hand a new plane rectangle to the session; invalid ones are logged
    /// and dropped, leaving the current view.
    pub(crate) fn apply_rect(&mut self, rect: Rect) {
        match self.session.set_rect(rect) {
            Ok(()) => self.sync_goto_fields(),
            Err(e) => warn!("Rejected view change: {e}"),
        }
    }

    /// Show `rect` fitted to the canvas aspect ratio.
    pub(crate) fn jump_to(&mut self, rect: Rect) {
        let [w, h] = self.panel_size;
        self.apply_rect(fit_aspect(&rect, w, h));
    }

    pub(crate) fn reset_view(&mut self) {
        info!("Resetting view");
        self.jump_to(ViewState::FULL_SET);
    }

    pub(crate) fn sync_goto_fields(&mut self) {
        let rect = self.session.rect();
        let center = rect.center();
        self.goto_re = format!("{:.15}", center.x);
        self.goto_im = format!("{:.15}", center.y);
        self.goto_width = format!("{:e}", rect.w);
    }

    fn check_resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 && [width, height] != self.panel_size {
            self.panel_size = [width, height];
            let fitted = fit_aspect(&self.session.rect(), width, height);
            self.apply_rect(fitted);
        }
    }
}

// ---------------------------------------------------------------------------
// eframe::App
// ---------------------------------------------------------------------------

impl eframe::App for BrotViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.set_visuals(egui::Visuals::dark());

        // Collect passes finished since the last frame.
        self.poll_frames(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let available = ui.available_size();
                let width = available.x.max(1.0) as u32;
                let height = available.y.max(1.0) as u32;
                self.check_resize(width, height);

                if self.needs_render.get() {
                    self.request_render(ctx);
                }

                let (response, painter) =
                    ui.allocate_painter(available, egui::Sense::click_and_drag());

                let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                if let Some(ref tex) = self.texture {
                    painter.image(tex.id(), response.rect, uv, egui::Color32::WHITE);
                }
                self.draw_progress_bar(&painter, response.rect);

                self.handle_canvas_input(ctx, &response);
            });

        self.handle_keyboard(ctx);

        self.show_hud(ctx);
        self.show_controls_panel(ctx);

        // Inline rendering advances one pass per frame, so keep frames coming.
        if self.scheduler.state().is_busy() && self.scheduler.is_inline() {
            ctx.request_repaint();
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.preferences.last_view = Some(self.session.rect());
        self.preferences.iteration_budget = self.session.iteration_budget();
        self.preferences.color_map = self.session.color_map_name().to_string();
        self.preferences.save();
        self.bookmark_store.save();
        info!("Saved preferences and bookmarks on exit");
    }
}
