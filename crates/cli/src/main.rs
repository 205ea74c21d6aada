//! notetrack CLI: waveform peaks and timestamped notes for audio tracks.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use notetrack_core::audio::{ManualTransport, PlaybackEngine, Transport};
use notetrack_core::notes::{ActivationEvent, ActivationFrame, NoteStore, NotesFile};
use notetrack_core::waveform::{analyze, TrackSource};
use notetrack_core::{DebugFacade, NoteId, NotePatch, Session, Settings};

/// How long a load may take before the CLI gives up.
const LOAD_TIMEOUT: Duration = Duration::from_secs(120);

// ─── Top-level CLI ───────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "notetrack",
    about = "Waveforms and playback-synchronized notes for audio tracks",
    version
)]
struct Cli {
    /// Settings file (JSON); defaults apply when absent
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the normalized waveform peaks of an audio file
    Peaks(PeaksArgs),
    /// List and edit the notes in a notes file
    Notes(NotesArgs),
    /// Step through a track on a simulated clock and print note activations
    Preview(PreviewArgs),
    /// Play a track and print notes as they come up
    Play(PlayArgs),
    /// Dump a debug snapshot of a notes file as JSON
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct PeaksArgs {
    /// Audio file (wav, mp3, aac, m4a)
    audio: PathBuf,

    /// Number of peaks
    #[arg(long)]
    count: Option<usize>,

    /// Disable the peak cache
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Print the series as JSON instead of a sparkline
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Sparkline width in characters
    #[arg(long, default_value_t = 80)]
    width: usize,
}

#[derive(Parser, Debug)]
struct NotesArgs {
    /// Notes file (JSON); created on first add
    file: PathBuf,

    #[command(subcommand)]
    action: NotesAction,
}

#[derive(Subcommand, Debug)]
enum NotesAction {
    /// List notes in timestamp order
    List,
    /// Add a note
    Add {
        /// Timestamp in seconds
        #[arg(long)]
        at: f64,
        /// Note text
        #[arg(long)]
        text: String,
        /// Marker color, e.g. "#ff8800"
        #[arg(long)]
        color: Option<String>,
    },
    /// Change a note
    Edit {
        /// Note id or a unique prefix of it
        id: String,
        #[arg(long)]
        at: Option<f64>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long, conflicts_with = "clear_color")]
        color: Option<String>,
        /// Remove the marker color
        #[arg(long, default_value_t = false)]
        clear_color: bool,
    },
    /// Delete a note
    Delete {
        /// Note id or a unique prefix of it
        id: String,
    },
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Audio file
    audio: PathBuf,

    /// Notes file
    #[arg(long)]
    notes: PathBuf,

    /// Clock step in seconds
    #[arg(long, default_value_t = 0.25)]
    step: f64,

    /// Activation window in seconds (overrides settings)
    #[arg(long)]
    tolerance: Option<f64>,
}

#[derive(Parser, Debug)]
struct PlayArgs {
    /// Audio file
    audio: PathBuf,

    /// Notes file
    #[arg(long)]
    notes: PathBuf,

    /// Start position in seconds
    #[arg(long, default_value_t = 0.0)]
    start: f64,

    /// Output volume, 0.0 to 1.0
    #[arg(long, default_value_t = 1.0)]
    volume: f32,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Notes file
    #[arg(long)]
    notes: PathBuf,

    /// Also load this audio file and include session diagnostics
    #[arg(long)]
    audio: Option<PathBuf>,
}

// ─── Main ────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let settings = match &cli.settings {
        Some(path) => Settings::load(path),
        None => Ok(Settings::default()),
    };

    let result = settings.and_then(|settings| match cli.command {
        Command::Peaks(args) => run_peaks(args, settings),
        Command::Notes(args) => run_notes(args),
        Command::Preview(args) => run_preview(args, settings),
        Command::Play(args) => run_play(args, settings),
        Command::Inspect(args) => run_inspect(args, settings),
    });

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

// ─── Helpers ─────────────────────────────────────────────────────

fn require_file(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("File not found: {}", path.display());
    }
    Ok(())
}

/// Find a note by full id or unique id prefix.
fn resolve_note(file: &NotesFile, id: &str) -> Result<NoteId> {
    let needle = id.trim().to_lowercase();
    if needle.is_empty() {
        bail!("Note id must not be empty");
    }
    let matches: Vec<NoteId> = file
        .notes
        .iter()
        .map(|n| n.id)
        .filter(|nid| nid.to_string().starts_with(&needle))
        .collect();
    match matches.as_slice() {
        [one] => Ok(*one),
        [] => bail!("No note matches '{}'", id),
        _ => bail!("'{}' matches {} notes; use a longer prefix", id, matches.len()),
    }
}

fn short_id(id: NoteId) -> String {
    id.to_string()[..8].to_string()
}

/// Render peaks as one line of block characters.
fn sparkline(peaks: &[f32], width: usize) -> String {
    const LEVELS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
    if peaks.is_empty() || width == 0 {
        return String::new();
    }
    let per_col = peaks.len().div_ceil(width);
    peaks
        .chunks(per_col)
        .map(|chunk| {
            let m = chunk.iter().copied().fold(0.0f32, f32::max).clamp(0.0, 1.0);
            LEVELS[(m * 8.0).round() as usize]
        })
        .collect()
}

fn open_session<T: Transport>(
    transport: T,
    settings: Settings,
    audio: &Path,
    file: &NotesFile,
) -> Result<Session<T>> {
    require_file(audio)?;
    let source = TrackSource::from_path(audio)?.with_id(file.track);
    let mut session = Session::new(transport, settings);
    session.load(source);
    let frame = session.wait_for_load(LOAD_TIMEOUT);
    if let Some(e) = frame.failed {
        bail!("Could not analyze {}: {}", audio.display(), e);
    }
    if frame.loaded.is_none() {
        bail!("Timed out analyzing {}", audio.display());
    }
    session.set_notes(file.clone().into_store().list(file.track));
    Ok(session)
}

fn describe(frame: &ActivationFrame, time: f64) -> Option<String> {
    let event = frame.event?;
    let line = match (event, &frame.card) {
        (ActivationEvent::Cleared { .. }, _) => format!("[{:>8.2}s] (no active note)", time),
        (_, Some(card)) => {
            let more = card
                .more_label()
                .map(|m| format!("  ({})", m))
                .unwrap_or_default();
            format!(
                "[{:>8.2}s] {:>6}  {}{}",
                time, card.label, card.note.content, more
            )
        }
        (_, None) => return None,
    };
    Some(line)
}

// ─── Runners ─────────────────────────────────────────────────────

fn run_peaks(args: PeaksArgs, settings: Settings) -> Result<()> {
    require_file(&args.audio)?;
    let count = args.count.unwrap_or(settings.peak_count);
    let cache = if args.no_cache { None } else { settings.cache() };

    let source = TrackSource::from_path(&args.audio)?;
    let track = analyze(&source, count, cache.as_ref())
        .with_context(|| format!("Could not analyze {}", args.audio.display()))?;
    log::info!(
        "{}: {:.2}s, {} Hz, {} channel(s)",
        track.name,
        track.duration_s(),
        track.audio.sample_rate,
        track.audio.channel_count()
    );

    if args.json {
        println!("{}", serde_json::to_string(&track.peaks.peaks)?);
    } else {
        println!("{}", sparkline(&track.peaks.peaks, args.width));
        if track.peaks.is_silent() {
            println!("(silent)");
        }
    }
    Ok(())
}

fn run_notes(args: NotesArgs) -> Result<()> {
    let file = NotesFile::load_or_new(&args.file)?;
    let track = file.track;

    match args.action {
        NotesAction::List => {
            if file.notes.is_empty() {
                println!("No notes.");
            }
            for note in &file.notes {
                let color = note.color.as_deref().unwrap_or("");
                println!(
                    "{}  {:>9.2}s  {:<7}  {}",
                    short_id(note.id),
                    note.timestamp,
                    color,
                    note.content
                );
            }
            return Ok(());
        }
        NotesAction::Add { at, text, color } => {
            let mut store = file.into_store();
            let note = store.create(track, at, &text, color)?;
            println!("Added {} at {:.2}s", short_id(note.id), note.timestamp);
            NotesFile::from_store(track, &store).save(&args.file)?;
        }
        NotesAction::Edit {
            id,
            at,
            text,
            color,
            clear_color,
        } => {
            let id = resolve_note(&file, &id)?;
            let patch = NotePatch {
                timestamp: at,
                content: text,
                color: if clear_color { Some(None) } else { color.map(Some) },
            };
            if patch.is_empty() {
                bail!("Nothing to change; pass --at, --text, --color or --clear-color");
            }
            let mut store = file.into_store();
            store.update(id, patch)?;
            println!("Updated {}", short_id(id));
            NotesFile::from_store(track, &store).save(&args.file)?;
        }
        NotesAction::Delete { id } => {
            let id = resolve_note(&file, &id)?;
            let mut store = file.into_store();
            store.delete(id)?;
            println!("Deleted {}", short_id(id));
            NotesFile::from_store(track, &store).save(&args.file)?;
        }
    }
    Ok(())
}

fn run_preview(args: PreviewArgs, mut settings: Settings) -> Result<()> {
    if !(args.step.is_finite() && args.step > 0.0) {
        bail!("--step must be a positive number of seconds");
    }
    if let Some(t) = args.tolerance {
        settings.activation_tolerance_s = t;
        settings = settings.sanitized();
    }
    let file = NotesFile::load(&args.notes)?;
    let mut session = open_session(ManualTransport::default(), settings, &args.audio, &file)?;
    let duration = session.playback().duration;
    println!(
        "Previewing {:.2}s with {} note(s), window ±{:.1}s",
        duration,
        session.notes().len(),
        session.settings().activation_tolerance_s
    );

    session.transport_mut().play();
    loop {
        let time = session.playback().current_time;
        let frame = session.tick();
        if let Some(line) = describe(&frame.activation, time) {
            println!("{}", line);
        }
        if !session.playback().is_playing {
            break;
        }
        session.transport_mut().advance(args.step);
    }
    Ok(())
}

fn run_play(args: PlayArgs, settings: Settings) -> Result<()> {
    let file = NotesFile::load(&args.notes)?;
    let engine = PlaybackEngine::new()?;
    let mut session = open_session(engine, settings, &args.audio, &file)?;

    session.transport_mut().set_volume(args.volume);
    if args.start > 0.0 {
        session.transport_mut().seek(args.start);
    }
    session.transport_mut().play();
    println!(
        "Playing {} ({:.2}s). Ctrl-C to stop.",
        args.audio.display(),
        session.playback().duration
    );

    // Give the playback thread a moment to report whether it started.
    std::thread::sleep(Duration::from_millis(200));
    loop {
        if let Some(err) = session.transport().take_error() {
            bail!("Playback failed: {}", err);
        }
        let state = session.playback();
        let frame = session.tick();
        if let Some(line) = describe(&frame.activation, state.current_time) {
            println!("{}", line);
        }
        if !state.is_playing {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    session.transport().stop();
    Ok(())
}

fn run_inspect(args: InspectArgs, settings: Settings) -> Result<()> {
    let file = NotesFile::load(&args.notes)?;
    let session = match &args.audio {
        Some(audio) => Some(open_session(
            ManualTransport::default(),
            settings,
            audio,
            &file,
        )?),
        None => None,
    };

    let store = file.into_store();
    let mut facade = DebugFacade::new(&store);
    if let Some(s) = &session {
        facade = facade.with_session(s.diagnostics());
    }
    println!("{}", facade.snapshot_json()?);
    Ok(())
}
