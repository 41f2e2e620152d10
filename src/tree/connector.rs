use serde::Serialize;

use crate::context::Context;
use crate::geometry::Point;
use crate::render::RenderBackend;

/// Vertical segment joining a node edge to a row boundary.
///
/// Both endpoints always share the same x, so comparisons may use either one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Connector {
    top: Point,
    bottom: Point,
}

impl Connector {
    pub(crate) fn new(top: Point, bottom: Point) -> Self {
        debug_assert_eq!(top.x, bottom.x, "connectors are vertical");
        Self { top, bottom }
    }

    /// The only public constructor, so every connector is vertical.
    pub fn vertical(x: f32, top_y: f32, bottom_y: f32) -> Self {
        Self::new(Point::new(x, top_y), Point::new(x, bottom_y))
    }

    pub fn top(&self) -> Point {
        self.top
    }

    pub fn bottom(&self) -> Point {
        self.bottom
    }

    pub fn x(&self) -> f32 {
        self.top.x
    }

    /// The connector farthest to the left. On equal x the second one wins.
    pub fn leftmost<'a>(a: Option<&'a Connector>, b: Option<&'a Connector>) -> Option<&'a Connector> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if a.x() < b.x() { a } else { b }),
            (a, None) => a,
            (None, b) => b,
        }
    }

    /// The connector farthest to the right. On equal x the second one wins.
    pub fn rightmost<'a>(a: Option<&'a Connector>, b: Option<&'a Connector>) -> Option<&'a Connector> {
        match (a, b) {
            (Some(a), Some(b)) => Some(if a.x() > b.x() { a } else { b }),
            (a, None) => a,
            (None, b) => b,
        }
    }

    pub fn render(&self, ctx: &Context, backend: &mut dyn RenderBackend) {
        backend.draw_line(self.top, self.bottom, ctx.pen());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_candidate_is_returned() {
        let c = Connector::vertical(5.0, 0.0, 10.0);
        assert_eq!(Connector::leftmost(Some(&c), None), Some(&c));
        assert_eq!(Connector::leftmost(None, Some(&c)), Some(&c));
        assert_eq!(Connector::rightmost(Some(&c), None), Some(&c));
        assert_eq!(Connector::rightmost(None, Some(&c)), Some(&c));
        assert_eq!(Connector::leftmost(None, None), None);
        assert_eq!(Connector::rightmost(None, None), None);
    }

    #[test]
    fn extremes_compare_by_x() {
        let left = Connector::vertical(5.0, 0.0, 10.0);
        let right = Connector::vertical(50.0, 30.0, 40.0);
        assert_eq!(Connector::leftmost(Some(&left), Some(&right)), Some(&left));
        assert_eq!(Connector::leftmost(Some(&right), Some(&left)), Some(&left));
        assert_eq!(Connector::rightmost(Some(&left), Some(&right)), Some(&right));
        assert_eq!(Connector::rightmost(Some(&right), Some(&left)), Some(&right));
    }

    #[test]
    fn vertical_shares_x_between_endpoints() {
        let c = Connector::vertical(12.5, 40.0, 60.0);
        assert_eq!(c.top(), Point::new(12.5, 40.0));
        assert_eq!(c.bottom(), Point::new(12.5, 60.0));
        assert_eq!(c.x(), c.bottom().x);
    }

    #[test]
    fn ties_resolve_to_second_argument() {
        let first = Connector::vertical(5.0, 0.0, 10.0);
        let second = Connector::vertical(5.0, 20.0, 30.0);
        assert!(std::ptr::eq(
            Connector::leftmost(Some(&first), Some(&second)).unwrap(),
            &second
        ));
        assert!(std::ptr::eq(
            Connector::rightmost(Some(&first), Some(&second)).unwrap(),
            &second
        ));
    }
}
