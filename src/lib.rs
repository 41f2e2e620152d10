#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod geometry;
pub mod ir;
pub mod layout_dump;
pub mod render;
pub mod text_metrics;
pub mod theme;
pub mod tree;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, RenderConfig, load_config, parse_config};
pub use context::{Brush, Context, Font, FontStyle, Pen};
pub use error::{LayoutError, LayoutResult, MeasureError};
pub use geometry::{Point, Rect, Size};
pub use ir::{BuiltTree, NodeSpec, TreeDocument, build_diagram, parse_tree};
pub use layout_dump::{LayoutDump, write_layout_dump};
pub use render::{DrawCommand, Recorder, RenderBackend, SvgBackend, write_output_png, write_output_svg};
pub use text_metrics::{ApproximateMeasurer, FontDbMeasurer, TextMeasure};
pub use theme::Theme;
pub use tree::{BusLine, Connector, Diagram, Drawable, LINE_COUNT, Node, NodeKey, Row, UserData};
