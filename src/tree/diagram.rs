use std::collections::BTreeMap;

use log::{debug, trace};
use serde::Serialize;

use crate::context::{Context, FontStyle};
use crate::error::LayoutResult;
use crate::geometry::Point;
use crate::render::RenderBackend;

use super::{Connector, LINE_COUNT, Node, Row, UserData};

/// Stable address of a node: its row index and its position in that row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeKey {
    pub row: i32,
    pub index: usize,
}

/// Horizontal line merging the extreme connectors of one row boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BusLine {
    pub from: Point,
    pub to: Point,
}

#[derive(Debug)]
pub struct Diagram {
    ctx: Context,
    rows: BTreeMap<i32, Row>,
    selected: Option<NodeKey>,
    bus_lines: Vec<BusLine>,
}

impl Diagram {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            rows: BTreeMap::new(),
            selected: None,
            bus_lines: Vec::new(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    pub fn set_font(&mut self, family: &str, style: FontStyle, big_size: f32, small_size: f32) {
        self.ctx.set_font(family, style, big_size, small_size);
    }

    pub fn ensure_row(&mut self, row: i32) -> &mut Row {
        self.rows.entry(row).or_default()
    }

    pub fn add_node<S: Into<String>>(
        &mut self,
        row: i32,
        lines: [S; LINE_COUNT],
        user_data: Option<UserData>,
        has_parent: bool,
        has_child: bool,
    ) -> NodeKey {
        let index = self
            .ensure_row(row)
            .add_node(lines, has_parent, has_child, user_data);
        NodeKey { row, index }
    }

    /// Drops every row and the selection.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.bus_lines.clear();
        self.selected = None;
    }

    pub fn row(&self, row: i32) -> Option<&Row> {
        self.rows.get(&row)
    }

    /// Rows in ascending index order.
    pub fn rows(&self) -> impl Iterator<Item = (i32, &Row)> + '_ {
        self.rows.iter().map(|(idx, row)| (*idx, row))
    }

    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.rows.get(&key.row)?.node(key.index)
    }

    /// Bus lines from the last successful [`arrange`](Self::arrange) or
    /// [`draw`](Self::draw); empty after a failed pass.
    pub fn bus_lines(&self) -> &[BusLine] {
        &self.bus_lines
    }

    /// Computes every position, connector and bus line without drawing.
    /// Returns the y below the last row.
    pub fn arrange(&mut self) -> LayoutResult<f32> {
        self.bus_lines.clear();
        let bottom = self.layout_rows(None)?;
        self.bus_lines = self.route_bus_lines();
        Ok(bottom)
    }

    /// Clears the surface, lays out and draws every row top to bottom, then
    /// draws the bus lines between rows.
    pub fn draw(&mut self, backend: &mut dyn RenderBackend) -> LayoutResult<f32> {
        backend.clear(self.ctx.background());
        self.bus_lines.clear();
        let bottom = self.layout_rows(Some(&mut *backend))?;
        self.bus_lines = self.route_bus_lines();
        for line in &self.bus_lines {
            backend.draw_line(line.from, line.to, self.ctx.pen());
        }
        Ok(bottom)
    }

    fn layout_rows(&mut self, mut backend: Option<&mut dyn RenderBackend>) -> LayoutResult<f32> {
        let mut current_y = self.ctx.origin().y;
        for (index, row) in self.rows.iter_mut() {
            let top = current_y;
            current_y = match backend.as_deref_mut() {
                Some(backend) => row.layout(&self.ctx, top, backend)?,
                None => row.arrange(&self.ctx, top)?,
            };
            debug!(
                row = *index, nodes = row.len(), width = row.width(), height = row.height(), top = top, bottom = current_y;
                "row laid out"
            );
        }
        Ok(current_y)
    }

    /// One bus line per boundary between row `k` and row `k + 1`.
    ///
    /// The last row only closes the boundary with its predecessor, which the
    /// predecessor's pass already produced. Any other row combines its own
    /// down connectors with the up connectors of the row right below it, if
    /// that row exists.
    fn route_bus_lines(&self) -> Vec<BusLine> {
        let last = self.rows.keys().next_back().copied();
        let mut lines = Vec::new();
        for (&index, row) in &self.rows {
            let has_previous = index
                .checked_sub(1)
                .is_some_and(|prev| self.rows.contains_key(&prev));
            if Some(index) == last && has_previous {
                continue;
            }
            let below = index.checked_add(1).and_then(|next| self.rows.get(&next));
            if let Some(line) = bus_line(row, below) {
                trace!(row = index, x1 = line.from.x, x2 = line.to.x, y = line.from.y; "bus line");
                lines.push(line);
            }
        }
        lines
    }

    pub fn node_at_point(&self, point: Point) -> Option<&Node> {
        self.key_at_point(point).and_then(|key| self.node(key))
    }

    pub fn key_at_point(&self, point: Point) -> Option<NodeKey> {
        self.rows.iter().find_map(|(&row, r)| {
            r.position_at_point(point)
                .map(|index| NodeKey { row, index })
        })
    }

    pub fn find_node(&self, handle: &UserData) -> Option<&Node> {
        self.find_key(handle).and_then(|key| self.node(key))
    }

    pub fn find_key(&self, handle: &UserData) -> Option<NodeKey> {
        self.rows.iter().find_map(|(&row, r)| {
            r.position_of(handle).map(|index| NodeKey { row, index })
        })
    }

    /// Selects the node carrying `handle`, or clears the selection.
    pub fn select_node_by_data(&mut self, handle: &UserData) -> Option<&Node> {
        self.selected = self.find_key(handle);
        debug!(selected:? = self.selected; "selection by user data");
        self.selected_node()
    }

    /// Selects the node under `point`, or clears the selection.
    pub fn select_node_at(&mut self, point: Point) -> Option<&Node> {
        self.selected = self.key_at_point(point);
        debug!(x = point.x, y = point.y, selected:? = self.selected; "selection by point");
        self.selected_node()
    }

    pub fn selected_key(&self) -> Option<NodeKey> {
        self.selected
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.selected.and_then(|key| self.node(key))
    }
}

fn bus_line(upper: &Row, lower: Option<&Row>) -> Option<BusLine> {
    let left_down = upper.leftmost_down_connector();
    let right_down = upper.rightmost_down_connector();
    let (left_up, right_up) = lower
        .map(|row| (row.leftmost_up_connector(), row.rightmost_up_connector()))
        .unwrap_or((None, None));

    let left = Connector::leftmost(left_down, left_up)?;
    let right = Connector::rightmost(right_down, right_up)?;

    let from_down = left_down.is_some_and(|down| std::ptr::eq(down, left));
    let (from, to_x) = if from_down {
        (left.bottom(), right.bottom().x)
    } else {
        (left.top(), right.top().x)
    };
    Some(BusLine {
        from,
        to: Point::new(to_x, from.y),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::render::Recorder;
    use crate::tree::testing::context;
    use std::rc::Rc;

    fn handle(name: &str) -> UserData {
        Rc::new(name.to_string())
    }

    /// A above B and C; B and C hang off A.
    fn scenario_a() -> (Diagram, UserData, UserData, UserData) {
        let (a, b, c) = (handle("A"), handle("B"), handle("C"));
        let mut diagram = Diagram::new(context());
        diagram.add_node(0, ["A", "", ""], Some(a.clone()), false, true);
        diagram.add_node(1, ["B", "", ""], Some(b.clone()), true, false);
        diagram.add_node(1, ["C", "", ""], Some(c.clone()), true, true);
        (diagram, a, b, c)
    }

    #[test]
    fn scenario_a_widths_and_boundary() {
        let (mut diagram, a, b, c) = scenario_a();
        diagram.arrange().unwrap();

        let a = diagram.find_node(&a).unwrap();
        let b = diagram.find_node(&b).unwrap();
        let c = diagram.find_node(&c).unwrap();
        assert_eq!(diagram.row(0).unwrap().width(), a.width());
        assert_eq!(
            diagram.row(1).unwrap().width(),
            b.width() + c.width() + 20.0
        );

        // Row 1 is last and closes the boundary already produced for row 0.
        let lines = diagram.bus_lines();
        assert_eq!(lines.len(), 1);
        let line = lines[0];
        let a_down = a.down_connector().unwrap();
        let c_up = c.up_connector().unwrap();
        let b_up = b.up_connector().unwrap();
        assert_eq!(line.from.y, line.to.y);
        assert_eq!(line.from.x, b_up.x().min(a_down.x()));
        assert_eq!(line.to.x, c_up.x().max(a_down.x()));
        assert_eq!(line.from.y, a_down.bottom().y);
        assert_eq!(line.from.y, b_up.top().y);
    }

    #[test]
    fn rows_stack_with_double_gap_below_children() {
        let (mut diagram, ..) = scenario_a();
        let bottom = diagram.arrange().unwrap();
        let row0 = diagram.row(0).unwrap();
        let row1 = diagram.row(1).unwrap();
        let row1_top = row0.height() + 40.0;
        assert_eq!(row1.nodes()[0].position().y, row1_top);
        assert_eq!(bottom, row1_top + row1.height() + 40.0);
    }

    #[test]
    fn rows_are_processed_in_index_order_not_insertion_order() {
        let mut diagram = Diagram::new(context());
        diagram.add_node(5, ["late", "", ""], None, true, false);
        diagram.add_node(-2, ["first", "", ""], None, false, false);
        diagram.add_node(4, ["middle", "", ""], None, false, true);
        diagram.arrange().unwrap();

        let ys: Vec<(i32, f32)> = diagram
            .rows()
            .map(|(idx, row)| (idx, row.nodes()[0].position().y))
            .collect();
        assert_eq!(ys[0], (-2, 0.0));
        assert_eq!(ys[1].0, 4);
        assert_eq!(ys[2].0, 5);
        assert!(ys[0].1 < ys[1].1 && ys[1].1 < ys[2].1);
    }

    #[test]
    fn boundary_without_connectors_is_skipped() {
        let mut diagram = Diagram::new(context());
        diagram.add_node(0, ["a", "", ""], None, false, false);
        diagram.add_node(1, ["b", "", ""], None, false, false);
        diagram.arrange().unwrap();
        assert!(diagram.bus_lines().is_empty());
    }

    #[test]
    fn gap_in_row_indices_breaks_adjacency() {
        let mut diagram = Diagram::new(context());
        diagram.add_node(0, ["parent", "", ""], None, false, true);
        diagram.add_node(2, ["orphan", "", ""], None, true, false);
        diagram.arrange().unwrap();

        // Row 0 still merges its own down connectors; row 2 has no row 1 above.
        let lines = diagram.bus_lines();
        assert_eq!(lines.len(), 1);
        let down = diagram.row(0).unwrap().nodes()[0].down_connector().unwrap();
        assert_eq!(lines[0].from, down.bottom());
        assert_eq!(lines[0].to, down.bottom());
    }

    #[test]
    fn up_connector_wider_than_down_sets_left_edge() {
        let mut diagram = Diagram::new(context());
        diagram.add_node(0, ["Parent", "", ""], None, false, true);
        for name in ["Left", "Mid", "Right"] {
            diagram.add_node(1, [name, "", ""], None, true, false);
        }
        diagram.arrange().unwrap();
        let row1 = diagram.row(1).unwrap();
        let line = diagram.bus_lines()[0];
        assert_eq!(line.from, row1.leftmost_up_connector().unwrap().top());
        assert_eq!(line.to.x, row1.rightmost_up_connector().unwrap().x());
    }

    #[test]
    fn interior_rows_each_get_a_boundary() {
        let mut diagram = Diagram::new(context());
        diagram.add_node(0, ["g", "", ""], None, false, true);
        diagram.add_node(1, ["p1", "", ""], None, true, true);
        diagram.add_node(1, ["p2", "", ""], None, true, false);
        diagram.add_node(2, ["c", "", ""], None, true, false);
        diagram.arrange().unwrap();
        let lines = diagram.bus_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].from.y < lines[1].from.y);
    }

    #[test]
    fn failed_pass_leaves_no_stale_bus_lines() {
        let (mut diagram, ..) = scenario_a();
        diagram.arrange().unwrap();
        assert_eq!(diagram.bus_lines().len(), 1);

        diagram
            .context_mut()
            .set_measurer(Box::new(crate::tree::testing::GridMeasurer::failing_on("C")));
        assert!(diagram.arrange().is_err());
        assert!(diagram.bus_lines().is_empty());

        let mut rec = Recorder::new();
        assert!(diagram.draw(&mut rec).is_err());
        assert!(diagram.bus_lines().is_empty());
    }

    #[test]
    fn empty_row_contributes_nothing() {
        let mut diagram = Diagram::new(context());
        diagram.ensure_row(3);
        let mut rec = Recorder::new();
        assert_eq!(diagram.draw(&mut rec).unwrap(), 0.0);
        assert!(diagram.row(3).unwrap().is_empty());
        assert_eq!(rec.commands.len(), 1);
    }

    #[test]
    fn draw_is_idempotent() {
        let (mut diagram, ..) = scenario_a();
        let mut first = Recorder::new();
        let bottom_first = diagram.draw(&mut first).unwrap();
        let lines_first = diagram.bus_lines().to_vec();
        let mut second = Recorder::new();
        let bottom_second = diagram.draw(&mut second).unwrap();
        assert_eq!(bottom_first, bottom_second);
        assert_eq!(lines_first, diagram.bus_lines());
        assert_eq!(first.commands, second.commands);
    }

    #[test]
    fn draw_clears_then_draws_bus_lines_last() {
        let (mut diagram, ..) = scenario_a();
        let mut rec = Recorder::new();
        diagram.draw(&mut rec).unwrap();
        assert!(matches!(
            rec.commands.first(),
            Some(crate::render::DrawCommand::Clear { color }) if color == "#FFFFFF"
        ));
        let last_line = rec.lines().last().unwrap();
        let bus = diagram.bus_lines()[0];
        assert_eq!(last_line, (bus.from, bus.to));
    }

    #[test]
    fn layout_starts_at_origin_and_center() {
        let ctx = Context::for_surface(
            Point::new(100.0, 25.0),
            Size::new(600.0, 400.0),
            "#FFFFFF",
            Box::new(crate::tree::testing::GridMeasurer::default()),
        );
        let mut diagram = Diagram::new(ctx);
        diagram.add_node(0, ["Solo", "", ""], None, false, false);
        diagram.arrange().unwrap();
        let node = &diagram.row(0).unwrap().nodes()[0];
        assert_eq!(node.position().y, 25.0);
        assert_eq!(node.center_x(), 400.0);
    }

    #[test]
    fn lookups_scan_rows_in_order() {
        let (mut diagram, a, _, c) = scenario_a();
        diagram.arrange().unwrap();
        let c_node = diagram.find_node(&c).unwrap();
        let inside = Point::new(c_node.center_x(), c_node.position().y + 1.0);
        assert_eq!(diagram.key_at_point(inside), Some(NodeKey { row: 1, index: 1 }));
        assert_eq!(diagram.find_key(&a), Some(NodeKey { row: 0, index: 0 }));
        assert!(diagram.find_node(&handle("A")).is_none());
        assert!(diagram.node_at_point(Point::new(-100.0, -100.0)).is_none());
    }

    #[test]
    fn selection_by_point_and_by_data() {
        let (mut diagram, a, b, _) = scenario_a();
        diagram.arrange().unwrap();
        assert!(diagram.selected_node().is_none());

        let selected = diagram.select_node_by_data(&b).unwrap();
        assert!(selected.holds(&b));
        assert_eq!(diagram.selected_key(), Some(NodeKey { row: 1, index: 0 }));

        let a_center = {
            let node = diagram.find_node(&a).unwrap();
            Point::new(node.center_x(), node.position().y + 2.0)
        };
        assert!(diagram.select_node_at(a_center).unwrap().holds(&a));

        assert!(diagram.select_node_at(Point::new(-1.0, -1.0)).is_none());
        assert!(diagram.selected_node().is_none());
    }

    #[test]
    fn clear_drops_selection() {
        let (mut diagram, a, ..) = scenario_a();
        diagram.select_node_by_data(&a);
        assert!(diagram.selected_node().is_some());
        diagram.clear();
        assert!(diagram.selected_node().is_none());
        assert!(diagram.rows().next().is_none());
    }
}
