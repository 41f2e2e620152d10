use crate::config::RenderConfig;
use crate::context::{Brush, Font, Pen};
use crate::geometry::{Point, Rect, Size};
use crate::text_metrics::DEFAULT_LINE_HEIGHT;
use anyhow::Result;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// Drawing surface the diagram renders onto.
pub trait RenderBackend {
    fn clear(&mut self, color: &str);
    fn draw_rect(&mut self, rect: Rect, pen: &Pen);
    fn draw_line(&mut self, from: Point, to: Point, pen: &Pen);
    /// `at` is the upper-left corner of the text line.
    fn draw_text(&mut self, text: &str, font: &Font, brush: &Brush, at: Point);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Clear { color: String },
    Rect { rect: Rect, pen: Pen },
    Line { from: Point, to: Point, pen: Pen },
    Text { text: String, font: Font, brush: Brush, at: Point },
}

/// Backend that keeps every call for later inspection.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub commands: Vec<DrawCommand>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Line { from, to, .. } => Some((*from, *to)),
            _ => None,
        })
    }

    pub fn rects(&self) -> impl Iterator<Item = Rect> + '_ {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Rect { rect, .. } => Some(*rect),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl RenderBackend for Recorder {
    fn clear(&mut self, color: &str) {
        // A clear wipes everything drawn before it.
        self.commands.clear();
        self.commands.push(DrawCommand::Clear {
            color: color.to_string(),
        });
    }

    fn draw_rect(&mut self, rect: Rect, pen: &Pen) {
        self.commands.push(DrawCommand::Rect {
            rect,
            pen: pen.clone(),
        });
    }

    fn draw_line(&mut self, from: Point, to: Point, pen: &Pen) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            pen: pen.clone(),
        });
    }

    fn draw_text(&mut self, text: &str, font: &Font, brush: &Brush, at: Point) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            font: font.clone(),
            brush: brush.clone(),
            at,
        });
    }
}

/// Builds an SVG document from draw calls.
#[derive(Debug, Clone)]
pub struct SvgBackend {
    size: Size,
    background: Option<String>,
    body: String,
}

impl SvgBackend {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            background: None,
            body: String::new(),
        }
    }

    pub fn finish(self) -> String {
        let width = self.size.width.max(1.0);
        let height = self.size.height.max(1.0);
        let mut svg = String::with_capacity(self.body.len() + 256);
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
        );
        if let Some(background) = &self.background {
            let _ = write!(
                svg,
                "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
                escape_xml(background)
            );
        }
        svg.push_str(&self.body);
        svg.push_str("</svg>");
        svg
    }
}

impl RenderBackend for SvgBackend {
    fn clear(&mut self, color: &str) {
        self.body.clear();
        self.background = Some(color.to_string());
    }

    fn draw_rect(&mut self, rect: Rect, pen: &Pen) {
        let _ = write!(
            self.body,
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"/>",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            escape_xml(&pen.color),
            pen.width
        );
    }

    fn draw_line(&mut self, from: Point, to: Point, pen: &Pen) {
        let _ = write!(
            self.body,
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"{}\"/>",
            from.x,
            from.y,
            to.x,
            to.y,
            escape_xml(&pen.color),
            pen.width
        );
    }

    fn draw_text(&mut self, text: &str, font: &Font, brush: &Brush, at: Point) {
        let weight = if font.style.is_bold() { "bold" } else { "normal" };
        let style = if font.style.is_italic() { "italic" } else { "normal" };
        let _ = write!(
            self.body,
            "<text x=\"{:.2}\" y=\"{:.2}\" dominant-baseline=\"hanging\" font-family=\"{}\" font-size=\"{}\" font-weight=\"{weight}\" font-style=\"{style}\" fill=\"{}\">",
            at.x,
            at.y,
            escape_xml(&font.family),
            font.size,
            escape_xml(&brush.color),
        );
        if text.contains('\n') {
            // One tspan per line, each advanced by one line height.
            for (idx, line) in text.split('\n').enumerate() {
                let dy = if idx == 0 { 0.0 } else { DEFAULT_LINE_HEIGHT };
                let _ = write!(
                    self.body,
                    "<tspan x=\"{:.2}\" dy=\"{dy}em\">{}</tspan>",
                    at.x,
                    escape_xml(line.strip_suffix('\r').unwrap_or(line))
                );
            }
        } else {
            self.body.push_str(&escape_xml(text));
        }
        self.body.push_str("</text>");
    }
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    let fallback = usvg::Size::from_wh(800.0, 600.0)
        .ok_or_else(|| anyhow::anyhow!("invalid fallback size"))?;
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height).unwrap_or(fallback);

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig) -> Result<()> {
    Err(anyhow::anyhow!(
        "PNG output requires the `png` feature"
    ))
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FontStyle;

    #[test]
    fn svg_backend_wraps_body_in_document() {
        let mut backend = SvgBackend::new(Size::new(300.0, 200.0));
        backend.clear("#FFFFFF");
        backend.draw_rect(Rect::new(10.0, 10.0, 50.0, 20.0), &Pen::default());
        backend.draw_line(Point::new(35.0, 30.0), Point::new(35.0, 50.0), &Pen::default());
        backend.draw_text(
            "Tom & Jerry",
            &Font::new("Segoe UI", FontStyle::Bold, 16.0),
            &Brush::default(),
            Point::new(10.0, 10.0),
        );
        let svg = backend.finish();
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("width=\"300\""));
        assert!(svg.contains("fill=\"#FFFFFF\""));
        assert!(svg.contains("<line x1=\"35.00\" y1=\"30.00\" x2=\"35.00\" y2=\"50.00\""));
        assert!(svg.contains("Tom &amp; Jerry"));
        assert!(svg.contains("font-weight=\"bold\""));
    }

    #[test]
    fn multi_line_text_becomes_one_tspan_per_line() {
        let mut backend = SvgBackend::new(Size::new(300.0, 200.0));
        backend.draw_text(
            "Ada\nLovelace",
            &Font::new("Segoe UI", FontStyle::Regular, 16.0),
            &Brush::default(),
            Point::new(10.0, 20.0),
        );
        let svg = backend.finish();
        assert!(svg.contains("<tspan x=\"10.00\" dy=\"0em\">Ada</tspan>"));
        assert!(svg.contains("<tspan x=\"10.00\" dy=\"1.25em\">Lovelace</tspan>"));
        assert!(!svg.contains("Ada\nLovelace"));
    }

    #[test]
    fn clear_discards_previous_output() {
        let mut backend = SvgBackend::new(Size::new(100.0, 100.0));
        backend.draw_line(Point::new(0.0, 0.0), Point::new(1.0, 1.0), &Pen::default());
        backend.clear("#000000");
        assert!(!backend.finish().contains("<line"));

        let mut recorder = Recorder::new();
        recorder.draw_line(Point::new(0.0, 0.0), Point::new(1.0, 1.0), &Pen::default());
        recorder.clear("#000000");
        assert_eq!(
            recorder.commands,
            vec![DrawCommand::Clear {
                color: "#000000".to_string()
            }]
        );
    }
}
