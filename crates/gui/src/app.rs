//! Main application state and UI layout.

use std::path::PathBuf;

use anyhow::Result;
use eframe::egui;
use notetrack_core::Settings;

use crate::editor::{self, EditorState};

/// `~/.config/notetrack/settings.json`, or `NOTETRACK_SETTINGS` if set.
fn settings_path() -> PathBuf {
    if let Ok(path) = std::env::var("NOTETRACK_SETTINGS") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home)
        .join(".config")
        .join("notetrack")
        .join("settings.json")
}

pub struct NotetrackApp {
    editor: EditorState,
    open_error: Option<String>,
}

impl NotetrackApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Result<Self> {
        let settings = Settings::load_or_default(&settings_path());
        Ok(Self {
            editor: EditorState::new(settings)?,
            open_error: None,
        })
    }

    fn open_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Audio", &["wav", "mp3", "m4a", "mp4", "aac"])
            .pick_file()
        {
            self.open_error = None;
            if let Err(e) = self.editor.open(&path) {
                log::error!("{:#}", e);
                self.open_error = Some(format!("{:#}", e));
            }
        }
    }
}

impl eframe::App for NotetrackApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Top menu bar
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.label(egui::RichText::new("notetrack").strong());
                ui.separator();
                if ui.button("Open Audio...").clicked() {
                    self.open_dialog();
                }
                if let Some(ref err) = self.open_error {
                    ui.colored_label(egui::Color32::RED, err);
                    if ui.small_button("x").clicked() {
                        self.open_error = None;
                    }
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(path) = &self.editor.notes_path {
                        ui.weak(path.display().to_string());
                    }
                });
            });
        });

        // Central panel: the editor
        egui::CentralPanel::default().show(ctx, |ui| {
            editor::show_editor(ui, &mut self.editor, ctx);
        });
    }
}

impl Drop for NotetrackApp {
    fn drop(&mut self) {
        self.editor.session.dispose();
    }
}
