//! JSON documents read into and written from `SaniTree<Element>`.
//!
//! ```json
//! { "tag": "div", "attrs": { "class": "x" }, "children": [
//!     { "tag": "#text", "text": "hello" }
//! ] }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::domain::{Element, NodeId, SaniTree};
use crate::infrastructure::error::{InfraError, InfraResult};

/// Serialized form of one document node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DocumentNode>,
}

impl DocumentNode {
    fn split(self) -> (Element, Vec<DocumentNode>) {
        let element = Element {
            tag: self.tag,
            text: self.text,
            attrs: self.attrs,
        };
        (element, self.children)
    }

    fn from_element(element: &Element, children: Vec<DocumentNode>) -> Self {
        Self {
            tag: element.tag.clone(),
            text: element.text.clone(),
            attrs: element.attrs.clone(),
            children,
        }
    }
}

/// Builds the tree without recursion so deeply nested input cannot overflow
/// the stack.
pub fn into_tree(document: DocumentNode) -> InfraResult<SaniTree<Element>> {
    let (root, children) = document.split();
    let mut tree = SaniTree::new(root);
    let mut pending: Vec<(NodeId, Vec<DocumentNode>)> = vec![(tree.root(), children)];

    while let Some((parent, children)) = pending.pop() {
        for child in children {
            let (element, grandchildren) = child.split();
            let id = tree.append_child(parent, element)?;
            if !grandchildren.is_empty() {
                pending.push((id, grandchildren));
            }
        }
    }
    Ok(tree)
}

pub fn from_tree(tree: &SaniTree<Element>) -> DocumentNode {
    let mut done: HashMap<NodeId, DocumentNode> = HashMap::with_capacity(tree.node_count());
    for (id, node) in tree.iter_postorder() {
        let children = node
            .children()
            .iter()
            .filter_map(|child| done.remove(child))
            .collect();
        done.insert(id, DocumentNode::from_element(node.value(), children));
    }
    done.remove(&tree.root()).unwrap_or_default()
}

pub fn parse_document(json: &str) -> InfraResult<SaniTree<Element>> {
    let document: DocumentNode =
        serde_json::from_str(json).map_err(|e| InfraError::document("parse JSON document", e))?;
    into_tree(document)
}

#[instrument(level = "debug")]
pub fn read_document(path: &Path) -> InfraResult<SaniTree<Element>> {
    let content = fs::read_to_string(path)
        .map_err(|e| InfraError::io(format!("read {}", path.display()), e))?;
    let document: DocumentNode = serde_json::from_str(&content)
        .map_err(|e| InfraError::document(path.display().to_string(), e))?;
    let tree = into_tree(document)?;
    debug!("read {} nodes", tree.node_count());
    Ok(tree)
}

pub fn to_json(tree: &SaniTree<Element>) -> InfraResult<String> {
    serde_json::to_string_pretty(&from_tree(tree))
        .map_err(|e| InfraError::document("serialize document", e))
}

#[instrument(level = "debug", skip(tree))]
pub fn write_document(tree: &SaniTree<Element>, path: &Path) -> InfraResult<()> {
    let mut json = to_json(tree)?;
    json.push('\n');
    fs::write(path, json).map_err(|e| InfraError::io(format!("write {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_nested_json_when_parsed_then_children_keep_order() {
        let json = r#"{"tag":"div","children":[{"tag":"a"},{"tag":"b","children":[{"tag":"c"}]}]}"#;

        let tree = parse_document(json).expect("parse");

        let tags: Vec<&str> = tree.iter().map(|(_, n)| n.value().tag.as_str()).collect();
        assert_eq!(tags, vec!["div", "a", "b", "c"]);
    }

    #[test]
    fn given_missing_tag_when_parsed_then_document_error() {
        let result = parse_document(r#"{"children":[]}"#);
        assert!(matches!(result, Err(InfraError::Document { .. })));
    }
}
