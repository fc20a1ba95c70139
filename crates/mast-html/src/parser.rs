//! HTML5 Parser implementation
//!
//! Uses html5ever's RcDom and converts the result into a `mast-dom`
//! arena. Fragments are parsed in the context of a `<template>` element,
//! which accepts any element (table rows and cells included).

use crate::MarkupError;
use html5ever::tendril::TendrilSink;
use html5ever::{local_name, ns, parse_document, parse_fragment, QualName};
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use mast_dom::{Document, DomTree, NodeId};

/// HTML5 parser
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Result<Document, MarkupError> {
        tracing::debug!("Parsing HTML document ({} bytes)", html.len());

        let dom = self.read(html)?;
        let mut tree = DomTree::new();
        let root = tree.root();
        self.convert_children(&dom.document, &mut tree, Some(root));

        let document = Document::from_tree(tree);
        tracing::debug!("Parsed {} nodes", document.tree().len());
        Ok(document)
    }

    /// Parse markup into detached top-level nodes owned by `tree`
    pub fn parse_fragment(&self, tree: &mut DomTree, markup: &str) -> Result<Vec<NodeId>, MarkupError> {
        let dom = self.read_fragment(markup)?;
        // The fragment's nodes end up under the synthetic <html> root.
        let Some(root) = find_child_element(&dom.document, "html") else {
            return Ok(Vec::new());
        };

        let mut top = Vec::new();
        for child in root.children.borrow().iter() {
            if let Some(id) = self.convert_node(child, tree, None) {
                top.push(id);
            }
        }
        Ok(top)
    }

    /// Parse markup that describes exactly one root element.
    ///
    /// Stray top-level text or comments next to the element are dropped.
    pub fn parse_element(&self, tree: &mut DomTree, markup: &str) -> Result<NodeId, MarkupError> {
        let nodes = self.parse_fragment(tree, markup)?;
        let elements: Vec<NodeId> = nodes
            .iter()
            .copied()
            .filter(|id| tree.element(*id).is_some())
            .collect();

        let result = match elements.as_slice() {
            [single] => Ok(*single),
            [] => Err(MarkupError::NoElement { markup: markup.to_string() }),
            many => Err(MarkupError::MultipleRoots { count: many.len() }),
        };

        for id in nodes {
            if result.as_ref().ok() != Some(&id) {
                tree.remove(id);
            }
        }
        result
    }

    fn read(&self, html: &str) -> Result<RcDom, MarkupError> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;
        Ok(dom)
    }

    fn read_fragment(&self, markup: &str) -> Result<RcDom, MarkupError> {
        let context = QualName::new(None, ns!(html), local_name!("template"));
        let dom = parse_fragment(RcDom::default(), Default::default(), context, Vec::new(), false)
            .from_utf8()
            .read_from(&mut markup.as_bytes())?;
        Ok(dom)
    }

    fn convert_children(&self, handle: &Handle, tree: &mut DomTree, parent: Option<NodeId>) {
        for child in handle.children.borrow().iter() {
            self.convert_node(child, tree, parent);
        }
    }

    /// Convert an RcDom node (and its subtree) into our DOM format
    fn convert_node(&self, handle: &Handle, tree: &mut DomTree, parent: Option<NodeId>) -> Option<NodeId> {
        let id = match &handle.data {
            RcNodeData::Document => {
                self.convert_children(handle, tree, parent);
                return None;
            }
            RcNodeData::Doctype { .. } | RcNodeData::ProcessingInstruction { .. } => return None,
            RcNodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                if text.trim().is_empty() {
                    return None;
                }
                tree.create_text(&text)
            }
            RcNodeData::Comment { contents } => tree.create_comment(&contents.to_string()),
            RcNodeData::Element { name, attrs, .. } => {
                let id = tree.create_element(&name.local);
                if let Some(elem) = tree.element_mut(id) {
                    for attr in attrs.borrow().iter() {
                        elem.set_attr(&attr.name.local, attr.value.to_string());
                    }
                }
                self.convert_children(handle, tree, Some(id));
                id
            }
        };

        if let Some(parent) = parent {
            if let Err(err) = tree.append_child(parent, id) {
                tracing::warn!("Dropping converted node {}: {}", id, err);
                tree.remove(id);
                return None;
            }
        }
        Some(id)
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

fn find_child_element(handle: &Handle, tag: &str) -> Option<Handle> {
    handle
        .children
        .borrow()
        .iter()
        .find(|child| matches!(&child.data, RcNodeData::Element { name, .. } if &*name.local == tag))
        .cloned()
}
