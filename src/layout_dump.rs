use crate::geometry::Point;
use crate::tree::{BusLine, Connector, Diagram};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub origin: Point,
    pub bottom: f32,
    pub nodes: Vec<NodeDump>,
    pub bus_lines: Vec<BusLine>,
    pub selected: Option<SelectedDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub row: i32,
    pub index: usize,
    pub id: Option<String>,
    pub lines: Vec<String>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub up: Option<Connector>,
    pub down: Option<Connector>,
}

#[derive(Debug, Serialize)]
pub struct SelectedDump {
    pub row: i32,
    pub index: usize,
}

impl LayoutDump {
    /// Snapshot of the geometry from the diagram's last layout pass.
    pub fn from_diagram(diagram: &Diagram, bottom: f32) -> Self {
        let mut nodes = Vec::new();
        for (row_idx, row) in diagram.rows() {
            for (index, node) in row.nodes().iter().enumerate() {
                let id = node
                    .user_data()
                    .and_then(|data| data.downcast_ref::<String>())
                    .cloned();
                let bounds = node.bounds();
                nodes.push(NodeDump {
                    row: row_idx,
                    index,
                    id,
                    lines: node.lines().to_vec(),
                    x: bounds.x,
                    y: bounds.y,
                    width: bounds.width,
                    height: bounds.height,
                    up: node.up_connector().copied(),
                    down: node.down_connector().copied(),
                });
            }
        }

        LayoutDump {
            origin: diagram.context().origin(),
            bottom,
            nodes,
            bus_lines: diagram.bus_lines().to_vec(),
            selected: diagram.selected_key().map(|key| SelectedDump {
                row: key.row,
                index: key.index,
            }),
        }
    }
}

pub fn write_layout_dump(path: &Path, diagram: &Diagram, bottom: f32) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_diagram(diagram, bottom);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
