//! Document - High-level document API

use crate::{DomTree, ElementQuery, NodeId, Selector, SelectorError};

/// HTML Document
#[derive(Debug)]
pub struct Document {
    /// The DOM tree
    tree: DomTree,
    /// Cached reference to <html> element
    html_element: NodeId,
    /// Cached reference to <head> element
    head_element: NodeId,
    /// Cached reference to <body> element
    body_element: NodeId,
}

impl Document {
    /// Create a new document with an empty html/head/body skeleton
    pub fn new() -> Self {
        Self::from_tree(DomTree::new())
    }

    /// Wrap an existing tree, locating (or creating) html, head and body
    pub fn from_tree(mut tree: DomTree) -> Self {
        let root = tree.root();
        let html = find_or_create(&mut tree, root, "html");
        let head = find_or_create(&mut tree, html, "head");
        let body = find_or_create(&mut tree, html, "body");

        Self {
            tree,
            html_element: html,
            head_element: head,
            body_element: body,
        }
    }

    /// Get <html> element
    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    /// Get <head> element
    pub fn head(&self) -> NodeId {
        self.head_element
    }

    /// Get <body> element
    pub fn body(&self) -> NodeId {
        self.body_element
    }

    /// Get element by ID
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.tree
            .descendants(self.tree.root())
            .into_iter()
            .find(|node| self.tree.element(*node).and_then(|e| e.id.as_deref()) == Some(id))
    }

    /// Find all elements matching `selector`.
    ///
    /// With a `context` the search is limited to that node's descendants,
    /// otherwise the whole document is searched.
    pub fn find(&self, context: Option<NodeId>, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self.find_parsed(context, &selector))
    }

    /// Same as [`Document::find`] for an already parsed selector
    pub fn find_parsed(&self, context: Option<NodeId>, selector: &Selector) -> Vec<NodeId> {
        let scope = context.unwrap_or_else(|| self.tree.root());
        self.tree.query_selector_all(scope, selector)
    }

    /// Serialize the body contents, handy for assertions and debugging
    pub fn body_html(&self) -> String {
        self.tree.inner_html(self.body_element)
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Access the DOM tree mutably
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// Memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        self.tree.memory_usage()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

fn find_or_create(tree: &mut DomTree, parent: NodeId, tag: &str) -> NodeId {
    let existing = tree
        .children(parent)
        .find(|(_, node)| node.as_element().is_some_and(|e| e.tag == tag))
        .map(|(id, _)| id);
    if let Some(id) = existing {
        return id;
    }

    let id = tree.create_element(tag);
    let appended = tree.append_child(parent, id);
    debug_assert!(appended.is_ok(), "skeleton <{tag}> rejected: {appended:?}");
    id
}
