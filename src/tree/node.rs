use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::context::{Context, Font};
use crate::error::{LayoutError, LayoutResult};
use crate::geometry::{Point, Rect, Size};
use crate::render::RenderBackend;

use super::Connector;

/// Opaque caller data attached to a node. Lookups compare by identity.
pub type UserData = Rc<dyn Any>;

pub const LINE_COUNT: usize = 3;

// Empty lines still reserve the height of a line in their font.
const BIG_PLACEHOLDER: &str = "A Dummy Value";
const SMALL_PLACEHOLDER: &str = "Test";

/// Something a row can size, draw and hit-test.
pub trait Drawable {
    fn size(&self) -> Size;
    fn render(&self, ctx: &Context, backend: &mut dyn RenderBackend);
    fn hit_test(&self, point: Point) -> bool;
}

#[derive(Clone)]
pub struct Node {
    lines: [String; LINE_COUNT],
    line_sizes: [Size; LINE_COUNT],
    user_data: Option<UserData>,
    has_parent: bool,
    has_child: bool,
    size: Size,
    position: Point,
    up: Option<Connector>,
    down: Option<Connector>,
}

impl Node {
    pub fn new(
        lines: [String; LINE_COUNT],
        has_parent: bool,
        has_child: bool,
        user_data: Option<UserData>,
    ) -> Self {
        Self {
            lines,
            line_sizes: [Size::ZERO; LINE_COUNT],
            user_data,
            has_parent,
            has_child,
            size: Size::ZERO,
            position: Point::default(),
            up: None,
            down: None,
        }
    }

    /// Measures the three lines and caches their sizes.
    ///
    /// Line 0 uses the big font, lines 1 and 2 the small one. Every line is
    /// padded by the context's line padding. Width is the widest line and
    /// height the sum of all three.
    pub fn measure(&mut self, ctx: &Context) -> LayoutResult<Size> {
        for idx in 0..LINE_COUNT {
            let font = line_font(ctx, idx);
            let text = match self.lines[idx].as_str() {
                "" if idx == 0 => BIG_PLACEHOLDER,
                "" => SMALL_PLACEHOLDER,
                text => text,
            };
            let measured = ctx
                .measure_text(text, font)
                .map_err(|source| LayoutError::Measure {
                    text: text.to_string(),
                    source,
                })?;
            let pad = ctx.line_padding();
            self.line_sizes[idx] = measured.pad(pad, pad);
        }

        let width = self
            .line_sizes
            .iter()
            .map(|size| size.width)
            .fold(0.0, f32::max);
        let height = self.line_sizes.iter().map(|size| size.height).sum();
        self.size = Size::new(width, height);
        Ok(self.size)
    }

    pub fn place(&mut self, x: f32, y: f32) {
        self.position = Point::new(x, y);
    }

    pub fn attach_up_connector(&mut self, x: f32, top_y: f32, bottom_y: f32) {
        self.up = Some(Connector::vertical(x, top_y, bottom_y));
    }

    pub fn attach_down_connector(&mut self, x: f32, top_y: f32, bottom_y: f32) {
        self.down = Some(Connector::vertical(x, top_y, bottom_y));
    }

    pub fn clear_connectors(&mut self) {
        self.up = None;
        self.down = None;
    }

    pub fn contains_point(&self, point: Point) -> bool {
        self.bounds().contains(point)
    }

    pub fn lines(&self) -> &[String; LINE_COUNT] {
        &self.lines
    }

    pub fn line_sizes(&self) -> &[Size; LINE_COUNT] {
        &self.line_sizes
    }

    pub fn has_parent(&self) -> bool {
        self.has_parent
    }

    pub fn has_child(&self) -> bool {
        self.has_child
    }

    pub fn user_data(&self) -> Option<&UserData> {
        self.user_data.as_ref()
    }

    /// True when this node carries exactly `handle`, not merely an equal value.
    pub fn holds(&self, handle: &UserData) -> bool {
        self.user_data
            .as_ref()
            .is_some_and(|data| Rc::ptr_eq(data, handle))
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    pub fn center_x(&self) -> f32 {
        self.bounds().center_x()
    }

    pub fn up_connector(&self) -> Option<&Connector> {
        self.up.as_ref()
    }

    pub fn down_connector(&self) -> Option<&Connector> {
        self.down.as_ref()
    }
}

impl Drawable for Node {
    fn size(&self) -> Size {
        self.size
    }

    /// Draws each non-empty line stacked from the top edge, then the border.
    fn render(&self, ctx: &Context, backend: &mut dyn RenderBackend) {
        let mut y = self.position.y;
        for (idx, line) in self.lines.iter().enumerate() {
            if !line.is_empty() {
                backend.draw_text(
                    line,
                    line_font(ctx, idx),
                    ctx.brush(),
                    Point::new(self.position.x, y),
                );
            }
            y += self.line_sizes[idx].height;
        }
        backend.draw_rect(self.bounds().rounded(), ctx.pen());
    }

    fn hit_test(&self, point: Point) -> bool {
        self.contains_point(point)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("lines", &self.lines)
            .field("has_parent", &self.has_parent)
            .field("has_child", &self.has_child)
            .field("has_user_data", &self.user_data.is_some())
            .field("size", &self.size)
            .field("position", &self.position)
            .field("up", &self.up)
            .field("down", &self.down)
            .finish()
    }
}

fn line_font(ctx: &Context, idx: usize) -> &Font {
    if idx == 0 {
        ctx.big_font()
    } else {
        ctx.small_font()
    }
}
