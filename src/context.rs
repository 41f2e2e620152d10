//! Shared configuration consulted by every layout and rendering step.
//!
//! A [`Context`] is owned by the [`Diagram`](crate::tree::Diagram) and lent by
//! reference to rows and nodes. It carries the spacing constants, the surface
//! geometry, the big/small font pair, the single pen and brush, and the text
//! measurement capability.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::MeasureError;
use crate::geometry::{Point, Size};
use crate::text_metrics::TextMeasure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FontStyle {
    #[default]
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    pub fn is_bold(self) -> bool {
        matches!(self, Self::Bold | Self::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, Self::Italic | Self::BoldItalic)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub family: String,
    pub style: FontStyle,
    /// Pixel size.
    pub size: f32,
}

impl Font {
    pub fn new(family: impl Into<String>, style: FontStyle, size: f32) -> Self {
        Self {
            family: family.into(),
            style,
            size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pen {
    pub color: String,
    pub width: f32,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            color: "#000000".to_string(),
            width: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Brush {
    pub color: String,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            color: "#000000".to_string(),
        }
    }
}

pub const DEFAULT_NODE_SPACING: f32 = 20.0;
pub const DEFAULT_CONNECTOR_LINE_HEIGHT: f32 = 20.0;
pub const DEFAULT_LINE_PADDING: f32 = 3.0;

pub struct Context {
    surface: Size,
    origin: Point,
    center: Point,
    node_spacing: f32,
    connector_line_height: f32,
    line_padding: f32,
    big_font: Font,
    small_font: Font,
    pen: Pen,
    brush: Brush,
    background: String,
    measurer: Box<dyn TextMeasure>,
}

impl Context {
    pub fn new(measurer: Box<dyn TextMeasure>) -> Self {
        Self {
            surface: Size::ZERO,
            origin: Point::default(),
            center: Point::default(),
            node_spacing: DEFAULT_NODE_SPACING,
            connector_line_height: DEFAULT_CONNECTOR_LINE_HEIGHT,
            line_padding: DEFAULT_LINE_PADDING,
            big_font: Font::new("Segoe UI", FontStyle::Regular, 16.0),
            small_font: Font::new("Segoe UI", FontStyle::Regular, 11.0),
            pen: Pen::default(),
            brush: Brush::default(),
            background: "#FFFFFF".to_string(),
            measurer,
        }
    }

    /// Builds a context for a surface whose horizontal center sits half a
    /// width right of `origin` and whose vertical center is half its height.
    pub fn for_surface(
        origin: Point,
        surface: Size,
        background: impl Into<String>,
        measurer: Box<dyn TextMeasure>,
    ) -> Self {
        let mut ctx = Self::new(measurer);
        let center = Point::new(origin.x + surface.width / 2.0, surface.height / 2.0);
        ctx.initialize(surface, origin, center, background);
        ctx
    }

    pub fn from_config(config: &Config, measurer: Box<dyn TextMeasure>) -> Self {
        let origin = Point::new(config.render.origin_x, config.render.origin_y);
        let surface = Size::new(config.render.width, config.render.height);
        let theme = &config.theme;
        let mut ctx = Self::for_surface(origin, surface, theme.background.clone(), measurer);
        ctx.node_spacing = config.layout.node_spacing;
        ctx.connector_line_height = config.layout.connector_line_height;
        ctx.line_padding = config.layout.line_padding;
        ctx.set_font(
            &theme.font_family,
            theme.font_style,
            theme.big_font_size,
            theme.small_font_size,
        );
        ctx.pen = Pen {
            color: theme.line_color.clone(),
            width: theme.line_width,
        };
        ctx.brush = Brush {
            color: theme.text_color.clone(),
        };
        ctx
    }

    pub fn initialize(
        &mut self,
        surface: Size,
        origin: Point,
        center: Point,
        background: impl Into<String>,
    ) {
        self.surface = surface;
        self.origin = origin;
        self.center = center;
        self.background = background.into();
    }

    /// Replaces both fonts. Node sizes computed with the old pair are stale
    /// until the next layout pass re-measures them.
    pub fn set_font(&mut self, family: &str, style: FontStyle, big_size: f32, small_size: f32) {
        self.big_font = Font::new(family, style, big_size);
        self.small_font = Font::new(family, style, small_size);
    }

    pub fn measure_text(&self, text: &str, font: &Font) -> Result<Size, MeasureError> {
        self.measurer.measure_text(text, font)
    }

    pub fn set_measurer(&mut self, measurer: Box<dyn TextMeasure>) {
        self.measurer = measurer;
    }

    pub fn surface(&self) -> Size {
        self.surface
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn node_spacing(&self) -> f32 {
        self.node_spacing
    }

    pub fn set_node_spacing(&mut self, spacing: f32) {
        self.node_spacing = spacing;
    }

    pub fn connector_line_height(&self) -> f32 {
        self.connector_line_height
    }

    pub fn set_connector_line_height(&mut self, height: f32) {
        self.connector_line_height = height;
    }

    pub fn line_padding(&self) -> f32 {
        self.line_padding
    }

    pub fn set_line_padding(&mut self, padding: f32) {
        self.line_padding = padding;
    }

    pub fn big_font(&self) -> &Font {
        &self.big_font
    }

    pub fn small_font(&self) -> &Font {
        &self.small_font
    }

    pub fn pen(&self) -> &Pen {
        &self.pen
    }

    pub fn set_pen(&mut self, pen: Pen) {
        self.pen = pen;
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    pub fn set_brush(&mut self, brush: Brush) {
        self.brush = brush;
    }

    pub fn background(&self) -> &str {
        &self.background
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("surface", &self.surface)
            .field("origin", &self.origin)
            .field("center", &self.center)
            .field("node_spacing", &self.node_spacing)
            .field("connector_line_height", &self.connector_line_height)
            .field("line_padding", &self.line_padding)
            .field("big_font", &self.big_font)
            .field("small_font", &self.small_font)
            .field("pen", &self.pen)
            .field("brush", &self.brush)
            .field("background", &self.background)
            .finish_non_exhaustive()
    }
}
