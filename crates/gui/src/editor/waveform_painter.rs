//! Execute core draw lists with the egui painter.

use eframe::egui;
use notetrack_core::waveform::{DrawCommand, DrawList, Rgba};

pub fn color(c: Rgba) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(c.r, c.g, c.b, c.a)
}

/// Map a physical-pixel point in the draw list to screen points.
pub fn to_screen(origin: egui::Pos2, scale: f32, (x, y): (f32, f32)) -> egui::Pos2 {
    let scale = if scale > 0.0 { scale } else { 1.0 };
    egui::pos2(origin.x + x / scale, origin.y + y / scale)
}

/// Paint every command of `list` with its top-left corner at `origin`.
///
/// The list is in physical pixels; egui works in points, so everything is
/// divided by the list's scale on the way out.
pub fn paint_draw_list(painter: &egui::Painter, origin: egui::Pos2, list: &DrawList) {
    let scale = if list.scale > 0.0 { list.scale } else { 1.0 };
    for cmd in &list.commands {
        match *cmd {
            DrawCommand::Rect {
                x,
                y,
                width,
                height,
                color: c,
            } => {
                let min = to_screen(origin, scale, (x, y));
                let rect = egui::Rect::from_min_size(min, egui::vec2(width / scale, height / scale));
                painter.rect_filled(rect, 0.0, color(c));
            }
            DrawCommand::Line {
                from,
                to,
                width,
                color: c,
                dash,
            } => {
                let points = [to_screen(origin, scale, from), to_screen(origin, scale, to)];
                let stroke = egui::Stroke::new(width / scale, color(c));
                match dash {
                    Some((dash_len, gap_len)) => {
                        painter.extend(egui::Shape::dashed_line(
                            &points,
                            stroke,
                            dash_len / scale,
                            gap_len / scale,
                        ));
                    }
                    None => {
                        painter.line_segment(points, stroke);
                    }
                }
            }
            DrawCommand::Circle {
                center,
                radius,
                fill,
                stroke,
            } => {
                let center = to_screen(origin, scale, center);
                let radius = radius / scale;
                if let Some(f) = fill {
                    painter.circle_filled(center, radius, color(f));
                }
                if let Some((w, c)) = stroke {
                    painter.circle_stroke(center, radius, egui::Stroke::new(w / scale, color(c)));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_screen_divides_by_scale() {
        let p = to_screen(egui::pos2(10.0, 20.0), 2.0, (100.0, 40.0));
        assert_eq!(p, egui::pos2(60.0, 40.0));
        // A bad scale is treated as 1.
        let q = to_screen(egui::pos2(0.0, 0.0), 0.0, (5.0, 6.0));
        assert_eq!(q, egui::pos2(5.0, 6.0));
    }

    #[test]
    fn test_color_conversion() {
        let c = color(Rgba::rgb(1, 2, 3));
        assert_eq!(c, egui::Color32::from_rgb(1, 2, 3));
    }
}
