use crate::context::Context;
use crate::tree::{Diagram, LINE_COUNT, UserData};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::rc::Rc;

/// JSON5 description of a diagram: nodes in left-to-right order per row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeDocument {
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub row: i32,
    #[serde(default)]
    pub lines: Vec<String>,
    #[serde(default)]
    pub has_parent: bool,
    #[serde(default)]
    pub has_child: bool,
    pub id: Option<String>,
}

/// A diagram built from a document, with the handle attached to every node
/// that declared an id.
#[derive(Debug)]
pub struct BuiltTree {
    pub diagram: Diagram,
    pub handles: BTreeMap<String, UserData>,
}

pub fn parse_tree(input: &str) -> Result<TreeDocument> {
    let doc: TreeDocument = json5::from_str(input)?;
    for (idx, node) in doc.nodes.iter().enumerate() {
        if node.lines.len() > LINE_COUNT {
            return Err(anyhow::anyhow!(
                "node {} in row {} has {} lines, at most {} are supported",
                idx,
                node.row,
                node.lines.len(),
                LINE_COUNT
            ));
        }
    }
    Ok(doc)
}

pub fn build_diagram(doc: &TreeDocument, ctx: Context) -> Result<BuiltTree> {
    let mut diagram = Diagram::new(ctx);
    let mut handles: BTreeMap<String, UserData> = BTreeMap::new();
    for node in &doc.nodes {
        let user_data = match &node.id {
            Some(id) => {
                if handles.contains_key(id) {
                    return Err(anyhow::anyhow!("duplicate node id `{id}`"));
                }
                let handle: UserData = Rc::new(id.clone());
                handles.insert(id.clone(), handle.clone());
                Some(handle)
            }
            None => None,
        };
        let mut lines: [String; LINE_COUNT] = Default::default();
        for (slot, text) in lines.iter_mut().zip(&node.lines) {
            slot.clone_from(text);
        }
        diagram.add_node(node.row, lines, user_data, node.has_parent, node.has_child);
    }
    Ok(BuiltTree { diagram, handles })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_metrics::ApproximateMeasurer;

    const FAMILY: &str = r#"{
        nodes: [
            { row: 0, lines: ["Grandma"], hasChild: true, id: "gm" },
            { row: 1, lines: ["Mother", "b. 1950"], hasParent: true, hasChild: true, id: "mum" },
            { row: 1, lines: ["Aunt"], hasParent: true },
            { row: 2, lines: ["Me", "b. 1980", "Oslo"], hasParent: true, id: "me" },
        ],
    }"#;

    #[test]
    fn parses_json5_document() {
        let doc = parse_tree(FAMILY).unwrap();
        assert_eq!(doc.nodes.len(), 4);
        assert!(doc.nodes[1].has_parent && doc.nodes[1].has_child);
        assert!(!doc.nodes[2].has_child);
        assert_eq!(doc.nodes[3].id.as_deref(), Some("me"));
    }

    #[test]
    fn rejects_more_than_three_lines() {
        let err = parse_tree(r#"{ nodes: [{ row: 0, lines: ["a", "b", "c", "d"] }] }"#);
        assert!(err.is_err());
    }

    #[test]
    fn builds_rows_and_handles() {
        let doc = parse_tree(FAMILY).unwrap();
        let ctx = Context::new(Box::new(ApproximateMeasurer::default()));
        let built = build_diagram(&doc, ctx).unwrap();
        assert_eq!(built.diagram.row(1).unwrap().len(), 2);
        let me = built.handles.get("me").unwrap();
        let node = built.diagram.find_node(me).unwrap();
        assert_eq!(node.lines()[2], "Oslo");
        let aunt = &built.diagram.row(1).unwrap().nodes()[1];
        assert_eq!(aunt.lines()[1], "");
        assert!(aunt.user_data().is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let doc = parse_tree(r#"{ nodes: [{ row: 0, id: "x" }, { row: 1, id: "x" }] }"#).unwrap();
        let ctx = Context::new(Box::new(ApproximateMeasurer::default()));
        assert!(build_diagram(&doc, ctx).is_err());
    }
}
