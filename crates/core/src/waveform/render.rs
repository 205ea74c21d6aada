//! Turn a peak series plus playback state into pixel-space draw commands.
//!
//! Rendering is pure: the same inputs always yield the same `DrawList`, so
//! hosts can call it on every frame. Coordinates are in physical pixels.

use serde::{Deserialize, Serialize};

use super::mapping::time_to_x;
use super::peaks::PeakSeries;
use crate::notes::{Note, NoteId};
use crate::types::PlaybackState;

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        if !digits.is_ascii() {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        match digits.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Colors used by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub unplayed: Rgba,
    pub played: Rgba,
    pub progress: Rgba,
    pub marker: Rgba,
    pub selected_ring: Rgba,
    pub hover: Rgba,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            unplayed: Rgba::rgb(90, 96, 110),
            played: Rgba::rgb(70, 160, 230),
            progress: Rgba::rgb(235, 70, 70),
            marker: Rgba::rgb(250, 190, 60),
            selected_ring: Rgba::rgb(255, 255, 255),
            hover: Rgba::rgba(220, 220, 220, 160),
        }
    }
}

/// Size of the drawing surface in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    /// Physical pixels per logical pixel.
    pub device_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        let device_pixel_ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
            device_pixel_ratio
        } else {
            1.0
        };
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            device_pixel_ratio,
        }
    }

    pub fn physical_width(&self) -> u32 {
        (self.width * self.device_pixel_ratio).round() as u32
    }

    pub fn physical_height(&self) -> u32 {
        (self.height * self.device_pixel_ratio).round() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.physical_width() == 0 || self.physical_height() == 0
    }
}

/// One primitive, in physical pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgba,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        color: Rgba,
        /// Dash and gap lengths for dashed lines.
        dash: Option<(f32, f32)>,
    },
    Circle {
        center: (f32, f32),
        radius: f32,
        fill: Option<Rgba>,
        /// Stroke width and color.
        stroke: Option<(f32, Rgba)>,
    },
}

/// A frame's worth of draw commands for a surface of `width` x `height`
/// physical pixels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrawList {
    pub width: u32,
    pub height: u32,
    pub scale: f32,
    pub commands: Vec<DrawCommand>,
}

/// Everything a waveform frame depends on.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub peaks: &'a PeakSeries,
    pub playback: &'a PlaybackState,
    pub notes: &'a [Note],
    pub selected: Option<NoteId>,
    pub hover_time: Option<f64>,
}

const BAR_FILL: f32 = 0.8;
const BAR_HEIGHT_FILL: f32 = 0.9;
const PROGRESS_WIDTH: f32 = 2.0;
const HOVER_WIDTH: f32 = 1.0;
const HOVER_DASH: (f32, f32) = (4.0, 4.0);
const MARKER_RADIUS: f32 = 4.0;
const MARKER_Y: f32 = 8.0;
const RING_RADIUS: f32 = 7.0;
const RING_WIDTH: f32 = 2.0;

/// Snap a line center so strokes of `width` physical pixels cover whole pixels.
fn crisp(x: f32, width: f32) -> f32 {
    if (width.round() as i32) % 2 == 1 {
        x.floor() + 0.5
    } else {
        x.round()
    }
}

/// Build the draw commands for one frame.
///
/// Order: unplayed bars, played bars, progress line, note markers, hover guide.
pub fn render(input: &RenderInput<'_>, viewport: &Viewport, palette: &Palette) -> DrawList {
    let scale = viewport.device_pixel_ratio;
    let mut list = DrawList {
        width: viewport.physical_width(),
        height: viewport.physical_height(),
        scale,
        commands: Vec::new(),
    };
    if viewport.is_empty() {
        return list;
    }

    let width = viewport.width as f64;
    let duration = input.playback.duration;
    let progress_x = time_to_x(input.playback.current_time, width, duration) as f32;

    let bars = bar_rects(input.peaks, viewport);
    for bar in &bars {
        list.commands.push(bar.with_color(palette.unplayed));
    }
    for bar in bars.iter().filter(|b| b.logical_x <= progress_x) {
        list.commands.push(bar.with_color(palette.played));
    }

    let full_height = viewport.height * scale;
    let progress_w = PROGRESS_WIDTH * scale;
    let px = crisp(progress_x * scale, progress_w);
    list.commands.push(DrawCommand::Line {
        from: (px, 0.0),
        to: (px, full_height),
        width: progress_w,
        color: palette.progress,
        dash: None,
    });

    let mut markers: Vec<&Note> = input.notes.iter().filter(|n| n.has_valid_timestamp()).collect();
    markers.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    for note in markers {
        let x = time_to_x(note.timestamp, width, duration) as f32 * scale;
        let center = (x, MARKER_Y * scale);
        let fill = note
            .color
            .as_deref()
            .and_then(Rgba::from_hex)
            .unwrap_or(palette.marker);
        list.commands.push(DrawCommand::Circle {
            center,
            radius: MARKER_RADIUS * scale,
            fill: Some(fill),
            stroke: None,
        });
        if input.selected == Some(note.id) {
            list.commands.push(DrawCommand::Circle {
                center,
                radius: RING_RADIUS * scale,
                fill: None,
                stroke: Some((RING_WIDTH * scale, palette.selected_ring)),
            });
        }
    }

    if let Some(hover) = input.hover_time.filter(|t| t.is_finite()) {
        let hover_w = HOVER_WIDTH * scale;
        let hx = crisp(time_to_x(hover, width, duration) as f32 * scale, hover_w);
        list.commands.push(DrawCommand::Line {
            from: (hx, 0.0),
            to: (hx, full_height),
            width: hover_w,
            color: palette.hover,
            dash: Some((HOVER_DASH.0 * scale, HOVER_DASH.1 * scale)),
        });
    }

    list
}

/// A waveform bar, kept in both logical x (for progress comparison) and
/// snapped physical geometry.
#[derive(Debug, Clone, Copy)]
struct Bar {
    logical_x: f32,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl Bar {
    fn with_color(&self, color: Rgba) -> DrawCommand {
        DrawCommand::Rect {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            color,
        }
    }
}

fn bar_rects(peaks: &PeakSeries, viewport: &Viewport) -> Vec<Bar> {
    if peaks.is_empty() {
        return Vec::new();
    }
    let scale = viewport.device_pixel_ratio;
    let step = viewport.width / peaks.len() as f32;
    let mid_y = viewport.height * scale / 2.0;
    let max_height = viewport.height * scale * BAR_HEIGHT_FILL;
    let bar_width = (step * BAR_FILL * scale).floor().max(1.0);

    peaks
        .peaks
        .iter()
        .enumerate()
        .map(|(i, &peak)| {
            let logical_x = i as f32 * step;
            let height = (peak.clamp(0.0, 1.0) * max_height).round().max(1.0);
            Bar {
                logical_x,
                x: (logical_x * scale).floor(),
                y: (mid_y - height / 2.0).floor(),
                width: bar_width,
                height,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackId;

    fn playback(current_time: f64, duration: f64) -> PlaybackState {
        PlaybackState {
            current_time,
            duration,
            is_playing: true,
            volume: 1.0,
        }
    }

    fn rects_with(list: &DrawList, color: Rgba) -> usize {
        list.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Rect { color: fill, .. } if *fill == color))
            .count()
    }

    #[test]
    fn test_hex_colors() {
        assert_eq!(Rgba::from_hex("#ff8000"), Some(Rgba::rgb(255, 128, 0)));
        assert_eq!(Rgba::from_hex("#ff800080"), Some(Rgba::rgba(255, 128, 0, 128)));
        assert_eq!(Rgba::from_hex("ff8000"), None);
        assert_eq!(Rgba::from_hex("#ff80"), None);
        assert_eq!(Rgba::from_hex("#zz8000"), None);
        assert_eq!(Rgba::rgb(1, 2, 255).to_hex(), "#0102ff");
    }

    #[test]
    fn test_played_bars_follow_progress() {
        let peaks = PeakSeries::new(vec![1.0; 10]);
        let state = playback(5.0, 10.0);
        let input = RenderInput {
            peaks: &peaks,
            playback: &state,
            notes: &[],
            selected: None,
            hover_time: None,
        };
        let palette = Palette::default();
        let list = render(&input, &Viewport::new(100.0, 50.0, 1.0), &palette);

        assert_eq!(rects_with(&list, palette.unplayed), 10);
        // Bars at x = 0, 10, ..., 50 are at or before the progress x of 50.
        assert_eq!(rects_with(&list, palette.played), 6);
    }

    #[test]
    fn test_command_order() {
        let peaks = PeakSeries::new(vec![0.5; 4]);
        let state = playback(2.0, 4.0);
        let note = Note::new(TrackId::new(), 1.0, "marker");
        let notes = vec![note.clone()];
        let input = RenderInput {
            peaks: &peaks,
            playback: &state,
            notes: &notes,
            selected: Some(note.id),
            hover_time: Some(3.0),
        };
        let list = render(&input, &Viewport::new(40.0, 20.0, 1.0), &Palette::default());

        let kinds: Vec<&str> = list
            .commands
            .iter()
            .map(|c| match c {
                DrawCommand::Rect { .. } => "rect",
                DrawCommand::Line { dash: None, .. } => "progress",
                DrawCommand::Line { dash: Some(_), .. } => "hover",
                DrawCommand::Circle { fill: Some(_), .. } => "marker",
                DrawCommand::Circle { fill: None, .. } => "ring",
            })
            .collect();
        let tail = &kinds[kinds.len() - 4..];
        assert_eq!(tail, ["progress", "marker", "ring", "hover"]);
        assert!(kinds[..kinds.len() - 4].iter().all(|k| *k == "rect"));
    }

    #[test]
    fn test_device_pixel_ratio_scaling() {
        let peaks = PeakSeries::new(vec![1.0; 2]);
        let state = playback(5.0, 10.0);
        let input = RenderInput {
            peaks: &peaks,
            playback: &state,
            notes: &[],
            selected: None,
            hover_time: None,
        };
        let list = render(&input, &Viewport::new(100.0, 40.0, 2.0), &Palette::default());
        assert_eq!((list.width, list.height), (200, 80));
        assert_eq!(list.scale, 2.0);

        let progress = list
            .commands
            .iter()
            .find_map(|c| match c {
                DrawCommand::Line { from, width, .. } => Some((*from, *width)),
                _ => None,
            })
            .unwrap();
        // 4 physical px wide, centered on a pixel boundary.
        assert_eq!(progress, ((100.0, 0.0), 4.0));

        for cmd in &list.commands {
            if let DrawCommand::Rect { x, y, width, height, .. } = cmd {
                assert_eq!(x.fract(), 0.0);
                assert_eq!(y.fract(), 0.0);
                assert_eq!(width.fract(), 0.0);
                assert_eq!(height.fract(), 0.0);
            }
        }
    }

    #[test]
    fn test_odd_width_line_on_pixel_center() {
        let peaks = PeakSeries::default();
        let state = playback(0.0, 10.0);
        let input = RenderInput {
            peaks: &peaks,
            playback: &state,
            notes: &[],
            selected: None,
            hover_time: Some(5.0),
        };
        let list = render(&input, &Viewport::new(100.0, 40.0, 1.0), &Palette::default());
        let hover = list
            .commands
            .iter()
            .find_map(|c| match c {
                DrawCommand::Line { from, dash: Some(_), .. } => Some(*from),
                _ => None,
            })
            .unwrap();
        assert_eq!(hover.0, 50.5);
    }

    #[test]
    fn test_note_color_and_fallback() {
        let peaks = PeakSeries::default();
        let state = playback(0.0, 10.0);
        let track = TrackId::new();
        let notes = vec![
            Note::new(track, 2.0, "plain"),
            Note::new(track, 4.0, "tinted").with_color("#00ff00"),
            Note::new(track, f64::NAN, "broken"),
        ];
        let input = RenderInput {
            peaks: &peaks,
            playback: &state,
            notes: &notes,
            selected: None,
            hover_time: None,
        };
        let palette = Palette::default();
        let list = render(&input, &Viewport::new(100.0, 40.0, 1.0), &palette);
        let fills: Vec<Rgba> = list
            .commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Circle { fill, .. } => *fill,
                _ => None,
            })
            .collect();
        assert_eq!(fills, vec![palette.marker, Rgba::rgb(0, 255, 0)]);
    }

    #[test]
    fn test_empty_viewport_draws_nothing() {
        let peaks = PeakSeries::new(vec![1.0; 3]);
        let state = playback(1.0, 3.0);
        let input = RenderInput {
            peaks: &peaks,
            playback: &state,
            notes: &[],
            selected: None,
            hover_time: None,
        };
        let list = render(&input, &Viewport::new(0.0, 40.0, 1.0), &Palette::default());
        assert!(list.commands.is_empty());
    }

    #[test]
    fn test_render_is_idempotent() {
        let peaks = PeakSeries::new(vec![0.2, 0.9, 0.4]);
        let state = playback(1.0, 3.0);
        let notes = vec![Note::new(TrackId::new(), 2.0, "x")];
        let input = RenderInput {
            peaks: &peaks,
            playback: &state,
            notes: &notes,
            selected: None,
            hover_time: Some(0.5),
        };
        let viewport = Viewport::new(300.0, 60.0, 1.5);
        let palette = Palette::default();
        assert_eq!(render(&input, &viewport, &palette), render(&input, &viewport, &palette));
    }
}
