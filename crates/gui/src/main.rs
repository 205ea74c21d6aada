//! notetrack GUI: waveform view with playback-synchronized notes.

mod app;
mod editor;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 560.0])
            .with_min_inner_size([640.0, 360.0]),
        ..Default::default()
    };

    eframe::run_native(
        "notetrack",
        options,
        Box::new(|cc| Ok(Box::new(app::NotetrackApp::new(cc)?))),
    )
}
