mod app;
mod bookmarks;
mod input;
mod preferences;
mod render_bridge;
mod ui;

use brotview_core::ColorMapRegistry;
use eframe::egui;
use tracing::info;

use app::BrotViewApp;
use preferences::AppPreferences;

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting BrotView");

    let mut prefs = AppPreferences::load();
    prefs.sanitize(&ColorMapRegistry::builtin());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("BrotView")
            .with_inner_size([prefs.window_width, prefs.window_height]),
        ..Default::default()
    };

    eframe::run_native(
        "BrotView",
        options,
        Box::new(move |cc| Ok(Box::new(BrotViewApp::new(&cc.egui_ctx, prefs)))),
    )
}
