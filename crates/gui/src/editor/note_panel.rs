//! Side panel listing the track's notes.

use eframe::egui;
use notetrack_core::audio::Transport;
use notetrack_core::waveform::Rgba;
use notetrack_core::NoteId;

use super::waveform_painter::color;
use super::{format_time, EditorState};

enum RowAction {
    Jump(NoteId, f64),
    Edit(NoteId),
    Delete(NoteId),
}

pub fn show_note_panel(ui: &mut egui::Ui, state: &mut EditorState) {
    ui.heading("Notes");

    let has_track = state.session.track().is_some();
    if ui
        .add_enabled(has_track, egui::Button::new("Add at playhead"))
        .clicked()
    {
        let now = state.session.playback().current_time;
        state.begin_new_note(now);
    }
    ui.separator();

    let selected = state.session.selected();
    let marker = state.session.settings().palette.marker;
    let mut action: Option<RowAction> = None;

    egui::ScrollArea::vertical().show(ui, |ui| {
        if state.session.notes().is_empty() {
            ui.weak("No notes yet. Double-click the waveform to add one.");
        }
        for note in state.session.notes() {
            ui.horizontal(|ui| {
                let dot = note.color.as_deref().and_then(Rgba::from_hex).unwrap_or(marker);
                ui.colored_label(color(dot), "●");

                let time = egui::RichText::new(format_time(note.timestamp)).monospace();
                if ui
                    .selectable_label(selected == Some(note.id), time)
                    .clicked()
                {
                    action = Some(RowAction::Jump(note.id, note.timestamp));
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.small_button("Delete").clicked() {
                        action = Some(RowAction::Delete(note.id));
                    }
                    if ui.small_button("Edit").clicked() {
                        action = Some(RowAction::Edit(note.id));
                    }
                    ui.add(egui::Label::new(&note.content).truncate());
                });
            });
        }
    });

    // Apply after iterating (avoids borrow conflicts)
    match action {
        Some(RowAction::Jump(id, time)) => {
            state.session.select(Some(id));
            state.session.transport_mut().seek(time);
        }
        Some(RowAction::Edit(id)) => state.begin_edit(id),
        Some(RowAction::Delete(id)) => state.delete_note(id),
        None => {}
    }
}
