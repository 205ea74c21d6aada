//! Waveform view, transport toolbar and note editing for one open track.

pub mod note_panel;
pub mod waveform_painter;

use std::path::{Path, PathBuf};

use anyhow::Result;
use eframe::egui;
use notetrack_core::audio::{PlaybackEngine, Transport};
use notetrack_core::notes::{InMemoryNoteStore, NoteCard, NoteStore, NotesFile};
use notetrack_core::waveform::{InteractionRequest, PointerEvent, Rgba, TrackSource, Viewport};
use notetrack_core::{NoteId, NotePatch, Session, Settings, WaveformStatus};

const WAVEFORM_HEIGHT: f32 = 160.0;

/// A note being written or edited in the dialog.
pub struct NoteDraft {
    /// Existing note being edited, None for a new note.
    pub editing: Option<NoteId>,
    pub timestamp: f64,
    pub content: String,
    pub use_color: bool,
    pub color: [u8; 3],
    pub error: Option<String>,
}

impl NoteDraft {
    fn new(timestamp: f64) -> Self {
        Self {
            editing: None,
            timestamp,
            content: String::new(),
            use_color: false,
            color: [250, 190, 60],
            error: None,
        }
    }

    fn edit(note: &notetrack_core::Note) -> Self {
        let rgb = note.color.as_deref().and_then(Rgba::from_hex);
        Self {
            editing: Some(note.id),
            timestamp: note.timestamp,
            content: note.content.clone(),
            use_color: rgb.is_some(),
            color: rgb.map(|c| [c.r, c.g, c.b]).unwrap_or([250, 190, 60]),
            error: None,
        }
    }

    fn color_hex(&self) -> Option<String> {
        self.use_color
            .then(|| Rgba::rgb(self.color[0], self.color[1], self.color[2]).to_hex())
    }
}

/// Notes for a track whose audio is still loading.
struct PendingNotes {
    store: InMemoryNoteStore,
    path: PathBuf,
}

/// Full editor state.
pub struct EditorState {
    pub session: Session<PlaybackEngine>,
    pub store: InMemoryNoteStore,
    /// Where the current track's notes are saved.
    pub notes_path: Option<PathBuf>,
    pending: Option<PendingNotes>,
    /// Primary note card from the last tick.
    pub card: Option<NoteCard>,
    pub draft: Option<NoteDraft>,
    /// Last audio/playback error to display.
    pub audio_error: Option<String>,
    hovering: bool,
}

/// Notes for `audio.mp3` live next to it in `audio.mp3.notes.json`.
pub fn notes_path_for(audio: &Path) -> PathBuf {
    let mut name = audio.as_os_str().to_os_string();
    name.push(".notes.json");
    PathBuf::from(name)
}

impl EditorState {
    pub fn new(settings: Settings) -> Result<Self> {
        let engine = PlaybackEngine::new()?;
        Ok(Self {
            session: Session::new(engine, settings),
            store: InMemoryNoteStore::new(),
            notes_path: None,
            pending: None,
            card: None,
            draft: None,
            audio_error: None,
            hovering: false,
        })
    }

    /// Start loading an audio file along with its notes.
    pub fn open(&mut self, audio: &Path) -> Result<()> {
        let path = notes_path_for(audio);
        let file = match NotesFile::load_or_new(&path) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("{:#}; starting with no notes", e);
                NotesFile::new(notetrack_core::TrackId::new())
            }
        };
        let source = TrackSource::from_path(audio)?.with_id(file.track);
        self.pending = Some(PendingNotes {
            store: file.into_store(),
            path,
        });
        self.session.load(source);
        Ok(())
    }

    /// Per-frame update: finish loads, pick up playback errors, refresh the card.
    pub fn tick(&mut self) {
        let frame = self.session.tick();
        if frame.loaded.is_some() {
            if let Some(pending) = self.pending.take() {
                self.store = pending.store;
                self.notes_path = Some(pending.path);
            }
            self.session.refresh_notes(&self.store);
            self.draft = None;
        }
        if frame.failed.is_some() {
            self.pending = None;
        }
        if let Some(err) = self.session.transport().take_error() {
            self.audio_error = Some(err);
        }
        self.card = frame.activation.card;
    }

    fn save_notes(&self) {
        let (Some(path), Some(track)) = (&self.notes_path, self.session.track_id()) else {
            return;
        };
        if let Err(e) = NotesFile::from_store(track, &self.store).save(path) {
            log::error!("{:#}", e);
        }
    }

    pub fn begin_new_note(&mut self, timestamp: f64) {
        self.draft = Some(NoteDraft::new(timestamp));
    }

    pub fn begin_edit(&mut self, id: NoteId) {
        if let Some(note) = self.store.get(id) {
            self.draft = Some(NoteDraft::edit(&note));
        }
    }

    /// Apply the open draft. Keeps the dialog open with an error on failure.
    pub fn commit_draft(&mut self) {
        let Some(draft) = self.draft.as_mut() else {
            return;
        };
        let color = draft.color_hex();
        let result = match draft.editing {
            None => self
                .session
                .create_note(&mut self.store, draft.timestamp, &draft.content, color)
                .map(|note| self.session.select(Some(note.id))),
            Some(id) => {
                let patch = NotePatch {
                    timestamp: Some(draft.timestamp),
                    content: Some(draft.content.clone()),
                    color: Some(color),
                };
                self.session.update_note(&mut self.store, id, patch)
            }
        };
        match result {
            Ok(()) => {
                self.draft = None;
                self.save_notes();
            }
            Err(e) => draft.error = Some(e.to_string()),
        }
    }

    pub fn delete_note(&mut self, id: NoteId) {
        match self.session.delete_note(&mut self.store, id) {
            Ok(()) => self.save_notes(),
            Err(e) => log::error!("Delete failed: {}", e),
        }
    }

    fn pointer(&mut self, event: PointerEvent, width: f32) {
        if let Some(InteractionRequest::CreateNote { timestamp }) =
            self.session.handle_pointer(event, width as f64)
        {
            self.begin_new_note(timestamp);
        }
    }
}

fn format_time(seconds: f64) -> String {
    let s = seconds.max(0.0);
    let minutes = (s / 60.0).floor();
    format!("{}:{:05.2}", minutes as u64, s - minutes * 60.0)
}

/// Main entry point: render the editor UI.
pub fn show_editor(ui: &mut egui::Ui, state: &mut EditorState, ctx: &egui::Context) {
    state.tick();

    let playback = state.session.playback();
    if playback.is_playing || matches!(state.session.status(), WaveformStatus::Loading(_)) {
        ctx.request_repaint();
    }

    // Toolbar
    let has_track = state.session.track().is_some();
    ui.horizontal(|ui| {
        if ui
            .add_enabled(has_track, egui::Button::new(if playback.is_playing { "Pause" } else { "Play" }))
            .clicked()
        {
            state.audio_error = None;
            state.session.transport_mut().toggle();
        }
        if ui.add_enabled(has_track, egui::Button::new("Stop")).clicked() {
            let transport = state.session.transport_mut();
            transport.pause();
            transport.seek(0.0);
        }

        ui.separator();
        ui.label(format!(
            "{} / {}",
            format_time(playback.current_time),
            format_time(playback.duration)
        ));

        ui.separator();
        ui.label("Volume:");
        let mut volume = playback.volume;
        if ui.add(egui::Slider::new(&mut volume, 0.0..=1.0).show_value(false)).changed() {
            state.session.transport_mut().set_volume(volume);
        }

        if let Some(ref err) = state.audio_error {
            ui.colored_label(egui::Color32::RED, err);
            if ui.small_button("x").clicked() {
                state.audio_error = None;
            }
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            match state.session.status() {
                WaveformStatus::Empty => {
                    ui.weak("Open an audio file to begin");
                }
                WaveformStatus::Loading(name) => {
                    ui.spinner();
                    ui.label(format!("Analyzing {}", name));
                }
                WaveformStatus::Ready => {
                    if let Some(track) = state.session.track() {
                        ui.label(&track.name);
                    }
                }
                WaveformStatus::Unavailable(msg) => {
                    ui.colored_label(egui::Color32::RED, msg);
                }
            }
        });
    });

    ui.separator();

    egui::SidePanel::right("note_panel")
        .min_width(200.0)
        .default_width(280.0)
        .resizable(true)
        .show_inside(ui, |ui| {
            note_panel::show_note_panel(ui, state);
        });

    egui::CentralPanel::default().show_inside(ui, |ui| {
        show_note_card(ui, state.card.as_ref());
        ui.add_space(8.0);
        show_waveform(ui, state, ctx);
    });

    show_draft_window(ctx, state);
}

/// The primary active note, with the count of other active notes.
fn show_note_card(ui: &mut egui::Ui, card: Option<&NoteCard>) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.set_min_height(48.0);
        ui.set_width(ui.available_width());
        match card {
            Some(card) => {
                ui.horizontal(|ui| {
                    let tag = egui::RichText::new(&card.label).strong();
                    if card.is_now {
                        ui.colored_label(egui::Color32::from_rgb(250, 190, 60), tag);
                    } else {
                        ui.label(tag);
                    }
                    ui.label(egui::RichText::new(&card.note.content).size(16.0));
                    if let Some(more) = card.more_label() {
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            ui.weak(more);
                        });
                    }
                });
            }
            None => {
                ui.weak("No note near the playhead");
            }
        }
    });
}

fn show_waveform(ui: &mut egui::Ui, state: &mut EditorState, ctx: &egui::Context) {
    let desired_size = egui::vec2(ui.available_width(), WAVEFORM_HEIGHT);
    let (rect, response) = ui.allocate_exact_size(desired_size, egui::Sense::click());

    if !ui.is_rect_visible(rect) {
        return;
    }

    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, egui::Color32::from_gray(30));

    let viewport = Viewport::new(rect.width(), rect.height(), ctx.pixels_per_point());
    // A disposed session has nothing to draw; that is not an error here.
    if let Ok(list) = state.session.render(&viewport) {
        waveform_painter::paint_draw_list(&painter, rect.min, &list);
    }

    let width = rect.width();
    if response.double_clicked() {
        if let Some(pos) = response.interact_pointer_pos() {
            state.pointer(PointerEvent::DoubleClick { x: (pos.x - rect.left()) as f64 }, width);
        }
    } else if response.clicked() {
        if let Some(pos) = response.interact_pointer_pos() {
            state.pointer(PointerEvent::Click { x: (pos.x - rect.left()) as f64 }, width);
        }
    }

    match response.hover_pos() {
        Some(pos) => {
            state.hovering = true;
            state.pointer(PointerEvent::Move { x: (pos.x - rect.left()) as f64 }, width);
            if let Some(t) = state.session.hover_time() {
                response.on_hover_text_at_pointer(format_time(t));
            }
        }
        None if state.hovering => {
            state.hovering = false;
            state.pointer(PointerEvent::Leave, width);
        }
        None => {}
    }
}

fn show_draft_window(ctx: &egui::Context, state: &mut EditorState) {
    let Some(draft) = state.draft.as_mut() else {
        return;
    };
    let title = if draft.editing.is_some() { "Edit note" } else { "New note" };
    let duration = state.session.playback().duration.max(0.0);

    let mut save = false;
    let mut cancel = false;
    egui::Window::new(title)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Time (s):");
                ui.add(
                    egui::DragValue::new(&mut draft.timestamp)
                        .speed(0.1)
                        .range(0.0..=duration)
                        .max_decimals(2),
                );
            });
            ui.add(
                egui::TextEdit::multiline(&mut draft.content)
                    .hint_text("Note text")
                    .desired_rows(3),
            );
            ui.horizontal(|ui| {
                ui.checkbox(&mut draft.use_color, "Color");
                if draft.use_color {
                    egui::color_picker::color_edit_button_srgb(ui, &mut draft.color);
                }
            });
            if let Some(ref err) = draft.error {
                ui.colored_label(egui::Color32::RED, err);
            }
            ui.horizontal(|ui| {
                if ui.button("Save").clicked() {
                    save = true;
                }
                if ui.button("Cancel").clicked() {
                    cancel = true;
                }
            });
        });

    if cancel {
        state.draft = None;
    } else if save {
        state.commit_draft();
    }
}
