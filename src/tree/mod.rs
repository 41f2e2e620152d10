//! Row-stacked tree layout.
//!
//! A [`Diagram`] owns rows keyed by integer index. Each [`Row`] owns its
//! [`Node`]s in left-to-right order, and each node owns the vertical
//! [`Connector`]s created for it during the last layout pass. Rows are always
//! processed in ascending index order; bus lines join the extreme connectors
//! of numerically adjacent rows.

mod connector;
mod diagram;
mod node;
mod row;

pub use connector::Connector;
pub use diagram::{BusLine, Diagram, NodeKey};
pub use node::{Drawable, LINE_COUNT, Node, UserData};
pub use row::Row;

#[cfg(test)]
pub(crate) mod testing {
    use crate::context::{Context, Font};
    use crate::error::MeasureError;
    use crate::geometry::{Point, Size};
    use crate::text_metrics::TextMeasure;

    /// Ten units per character of the longest `\n`-separated segment, one
    /// font size of height per segment.
    #[derive(Debug, Default)]
    pub(crate) struct GridMeasurer {
        fail_on: Option<String>,
    }

    impl GridMeasurer {
        pub(crate) fn failing_on(text: &str) -> Self {
            Self {
                fail_on: Some(text.to_string()),
            }
        }
    }

    impl TextMeasure for GridMeasurer {
        fn measure_text(&self, text: &str, font: &Font) -> Result<Size, MeasureError> {
            if self.fail_on.as_deref() == Some(text) {
                return Err(MeasureError::FontUnavailable(font.family.clone()));
            }
            let segments = text.split('\n');
            let widest = segments.clone().map(|s| s.chars().count()).max().unwrap_or(0);
            let count = segments.count();
            Ok(Size::new(widest as f32 * 10.0, font.size * count as f32))
        }
    }

    /// 400x300 surface at the origin, centered at x = 200.
    pub(crate) fn context() -> Context {
        Context::for_surface(
            Point::new(0.0, 0.0),
            Size::new(400.0, 300.0),
            "#FFFFFF",
            Box::new(GridMeasurer::default()),
        )
    }
}
