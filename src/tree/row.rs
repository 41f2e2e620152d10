use crate::context::Context;
use crate::error::LayoutResult;
use crate::geometry::Point;
use crate::render::RenderBackend;

use super::{Connector, Drawable, LINE_COUNT, Node, UserData};

/// Nodes sharing one horizontal band, in left-to-right order.
#[derive(Debug, Clone, Default)]
pub struct Row {
    nodes: Vec<Node>,
    width: f32,
    height: f32,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node and returns its position in the row.
    pub fn add_node<S: Into<String>>(
        &mut self,
        lines: [S; LINE_COUNT],
        has_parent: bool,
        has_child: bool,
        user_data: Option<UserData>,
    ) -> usize {
        self.nodes
            .push(Node::new(lines.map(Into::into), has_parent, has_child, user_data));
        self.nodes.len() - 1
    }

    /// Sizes and places every node and recreates its connectors, without
    /// drawing anything. Returns the y where the next row starts.
    pub fn arrange(&mut self, ctx: &Context, top_y: f32) -> LayoutResult<f32> {
        let spacing = ctx.node_spacing();
        let line_height = ctx.connector_line_height();

        self.width = 0.0;
        self.height = 0.0;
        for node in &mut self.nodes {
            let size = node.measure(ctx)?;
            self.width += size.width;
            self.height = self.height.max(size.height);
        }
        if !self.nodes.is_empty() {
            self.width += (self.nodes.len() - 1) as f32 * spacing;
        }

        let row_height = self.height;
        let mut current_x = ctx.center().x - self.width / 2.0;
        let mut has_down = false;
        for node in &mut self.nodes {
            node.clear_connectors();
            node.place(current_x, top_y);

            let x = node.center_x();
            if node.has_parent() {
                node.attach_up_connector(x, top_y - line_height, top_y);
            }
            if node.has_child() {
                // All down connectors of a row end on one y, whatever the node height.
                let node_bottom = top_y + node.height();
                node.attach_down_connector(x, node_bottom, top_y + row_height + line_height);
                has_down = true;
            }
            current_x += node.width() + spacing;
        }

        if has_down {
            Ok(top_y + row_height + 2.0 * line_height)
        } else {
            Ok(top_y + row_height)
        }
    }

    /// Draws nodes, then up connectors, then down connectors.
    pub fn render(&self, ctx: &Context, backend: &mut dyn RenderBackend) {
        for node in &self.nodes {
            node.render(ctx, backend);
        }
        for node in self.nodes.iter().filter(|node| node.has_parent()) {
            if let Some(connector) = node.up_connector() {
                connector.render(ctx, backend);
            }
        }
        for node in self.nodes.iter().filter(|node| node.has_child()) {
            if let Some(connector) = node.down_connector() {
                connector.render(ctx, backend);
            }
        }
    }

    pub fn layout(
        &mut self,
        ctx: &Context,
        top_y: f32,
        backend: &mut dyn RenderBackend,
    ) -> LayoutResult<f32> {
        let bottom = self.arrange(ctx, top_y)?;
        self.render(ctx, backend);
        Ok(bottom)
    }

    pub fn leftmost_up_connector(&self) -> Option<&Connector> {
        self.nodes.iter().find_map(Node::up_connector)
    }

    pub fn rightmost_up_connector(&self) -> Option<&Connector> {
        self.nodes.iter().rev().find_map(Node::up_connector)
    }

    pub fn leftmost_down_connector(&self) -> Option<&Connector> {
        self.nodes.iter().find_map(Node::down_connector)
    }

    pub fn rightmost_down_connector(&self) -> Option<&Connector> {
        self.nodes.iter().rev().find_map(Node::down_connector)
    }

    pub fn node_at_point(&self, point: Point) -> Option<&Node> {
        self.position_at_point(point).map(|idx| &self.nodes[idx])
    }

    pub fn position_at_point(&self, point: Point) -> Option<usize> {
        self.nodes.iter().position(|node| node.hit_test(point))
    }

    pub fn find_by_user_data(&self, handle: &UserData) -> Option<&Node> {
        self.position_of(handle).map(|idx| &self.nodes[idx])
    }

    pub fn position_of(&self, handle: &UserData) -> Option<usize> {
        self.nodes.iter().position(|node| node.holds(handle))
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> Option<&Node> {
        self.nodes.get(idx)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Aggregate width from the last arrange pass.
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Tallest node from the last arrange pass.
    pub fn height(&self) -> f32 {
        self.height
    }
}
