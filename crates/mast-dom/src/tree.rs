//! DOM Tree (arena-based allocation)
//!
//! Removed nodes leave their slot as `NodeData::Vacant` on a free list.
//! Freeing a slot bumps its generation, so a stale `NodeId` resolves to
//! nothing even after the slot is handed out again.

use crate::{DomError, DomResult, ElementData, Generation, Node, NodeData, NodeId};

/// Elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "source", "track", "wbr",
];

/// Elements whose text children are serialized verbatim
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Arena-based DOM tree for memory efficiency
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    generations: Vec<Generation>,
    free: Vec<u32>,
}

impl DomTree {
    /// Create a new tree holding only the document node
    pub fn new() -> Self {
        Self::with_capacity(1)
    }

    /// Create a new tree with room for `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.max(1));
        nodes.push(Node::document());
        Self {
            nodes,
            generations: vec![Generation::INITIAL],
            free: Vec::new(),
        }
    }

    /// The document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a live node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if !self.is_current(id) {
            return None;
        }
        self.nodes.get(id.index()).filter(|n| !n.is_vacant())
    }

    /// Get a mutable live node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if !self.is_current(id) {
            return None;
        }
        self.nodes.get_mut(id.index()).filter(|n| !n.is_vacant())
    }

    #[inline]
    fn is_current(&self, id: NodeId) -> bool {
        self.generations.get(id.index()) == Some(&id.generation())
    }

    /// Element data for `id`, if it is a live element
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    /// Mutable element data for `id`
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(Node::as_element_mut)
    }

    /// Check whether `id` refers to a live (not removed) node
    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of node slots in the tree, free ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of live nodes
    pub fn live_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_vacant()).count()
    }

    /// Number of free slots waiting to be reused
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    fn push(&mut self, node: Node) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.nodes[slot] = node;
            return NodeId::new(index, self.generations[slot]);
        }
        let index = self.nodes.len() as u32;
        self.nodes.push(node);
        self.generations.push(Generation::INITIAL);
        NodeId::new(index, Generation::INITIAL)
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node::element(tag))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(Node::text(content.to_string()))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(Node::comment(content.to_string()))
    }

    /// Set an attribute on an element
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let elem = self.element_mut(id).ok_or(DomError::InvalidNodeType)?;
        elem.set_attr(name, value);
        Ok(())
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `reference` (or last when `None`)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        self.check_insertion(parent, child)?;
        if let Some(reference) = reference {
            if reference == child {
                return Ok(child);
            }
            let node = self.get(reference).ok_or(DomError::NotFound)?;
            if node.parent != parent {
                return Err(DomError::NotAChild);
            }
        }

        self.unlink(child);
        self.link(parent, child, reference.unwrap_or(NodeId::NONE));
        Ok(child)
    }

    /// Put `replacement` where `old` is and detach `old`.
    ///
    /// Returns `Ok(false)` without touching anything when `old` is not
    /// attached to a parent (or has already been removed).
    pub fn replace_with(&mut self, old: NodeId, replacement: NodeId) -> DomResult<bool> {
        if !self.contains(replacement) {
            return Err(DomError::NotFound);
        }
        let parent = match self.get(old) {
            Some(node) if node.parent.is_valid() => node.parent,
            _ => return Ok(false),
        };
        if old == replacement {
            return Ok(true);
        }

        self.insert_before(parent, replacement, Some(old))?;
        self.unlink(old);
        Ok(true)
    }

    /// Detach a node from its parent, keeping the subtree alive
    pub fn detach(&mut self, id: NodeId) -> DomResult<()> {
        if id == NodeId::ROOT {
            return Err(DomError::HierarchyRequest);
        }
        if !self.contains(id) {
            return Err(DomError::NotFound);
        }
        self.unlink(id);
        Ok(())
    }

    /// Detach a node and free its whole subtree.
    ///
    /// The freed slots go back on the free list under a new generation.
    /// Returns `false` when there was nothing to remove.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if id == NodeId::ROOT || !self.contains(id) {
            return false;
        }
        self.unlink(id);

        let mut doomed = self.descendants(id);
        doomed.push(id);
        for node_id in doomed {
            let node = &mut self.nodes[node_id.index()];
            node.parent = NodeId::NONE;
            node.first_child = NodeId::NONE;
            node.last_child = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
            node.data = NodeData::Vacant;

            let slot = node_id.index();
            self.generations[slot] = self.generations[slot].next();
            self.free.push(slot as u32);
        }
        true
    }

    /// Iterate over the direct children of a node
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.get(id).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    /// Direct element children of a node
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .filter(|(_, node)| node.is_element())
            .map(|(child, _)| child)
            .collect()
    }

    /// Ancestors of a node, nearest first (the node itself excluded)
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = self.get(id).map_or(NodeId::NONE, |n| n.parent);
        std::iter::from_fn(move || {
            if !current.is_valid() {
                return None;
            }
            let id = current;
            current = self.get(id).map_or(NodeId::NONE, |n| n.parent);
            Some(id)
        })
    }

    /// All descendants in document order (the node itself excluded)
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).map(|(c, _)| c).collect();
        stack.reverse();
        while let Some(next) = stack.pop() {
            out.push(next);
            let start = stack.len();
            stack.extend(self.children(next).map(|(c, _)| c));
            stack[start..].reverse();
        }
        out
    }

    /// Check if `ancestor` contains `id` (strictly)
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Check if a node is reachable from the document root
    pub fn is_connected(&self, id: NodeId) -> bool {
        id == NodeId::ROOT || self.ancestors(id).any(|a| a == NodeId::ROOT)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(text) = self.get(id).and_then(Node::as_text) {
            out.push_str(text);
        }
        for node_id in self.descendants(id) {
            if let Some(text) = self.get(node_id).and_then(Node::as_text) {
                out.push_str(text);
            }
        }
        out
    }

    /// Serialize a node and its subtree to HTML
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, false, &mut out);
        out
    }

    /// Serialize only the children of a node
    pub fn inner_html(&self, id: NodeId) -> String {
        let raw = self
            .element(id)
            .is_some_and(|e| RAW_TEXT_ELEMENTS.contains(&e.tag.as_str()));
        let mut out = String::new();
        for (child, _) in self.children(id) {
            self.write_html(child, raw, &mut out);
        }
        out
    }

    fn write_html(&self, id: NodeId, raw_text: bool, out: &mut String) {
        let Some(node) = self.get(id) else { return };
        match &node.data {
            NodeData::Document => {
                for (child, _) in self.children(id) {
                    self.write_html(child, false, out);
                }
            }
            NodeData::Element(elem) => {
                out.push('<');
                out.push_str(&elem.tag);
                for attr in &elem.attrs {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    escape_into(&attr.value, true, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&elem.tag.as_str()) {
                    return;
                }
                out.push_str(&self.inner_html(id));
                out.push_str("</");
                out.push_str(&elem.tag);
                out.push('>');
            }
            NodeData::Text(text) if raw_text => out.push_str(text),
            NodeData::Text(text) => escape_into(text, false, out),
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Vacant => {}
        }
    }

    /// Approximate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        self.nodes.capacity() * std::mem::size_of::<Node>()
            + self.generations.capacity() * std::mem::size_of::<Generation>()
            + self.free.capacity() * std::mem::size_of::<u32>()
    }

    fn check_insertion(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let parent_node = self.get(parent).ok_or(DomError::NotFound)?;
        if !self.contains(child) {
            return Err(DomError::NotFound);
        }
        if !matches!(parent_node.data, NodeData::Document | NodeData::Element(_)) {
            return Err(DomError::InvalidNodeType);
        }
        if child == NodeId::ROOT || child == parent || self.is_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        Ok(())
    }

    fn unlink(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[id.index()];
            (node.parent, node.prev_sibling, node.next_sibling)
        };

        if parent.is_valid() {
            if prev.is_valid() {
                self.nodes[prev.index()].next_sibling = next;
            } else {
                self.nodes[parent.index()].first_child = next;
            }
            if next.is_valid() {
                self.nodes[next.index()].prev_sibling = prev;
            } else {
                self.nodes[parent.index()].last_child = prev;
            }
        }

        let node = &mut self.nodes[id.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }

    fn link(&mut self, parent: NodeId, child: NodeId, before: NodeId) {
        let prev = if before.is_valid() {
            self.nodes[before.index()].prev_sibling
        } else {
            self.nodes[parent.index()].last_child
        };

        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = before;
        }

        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        if before.is_valid() {
            self.nodes[before.index()].prev_sibling = child;
        } else {
            self.nodes[parent.index()].last_child = child;
        }
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the direct children of a node
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}

fn escape_into(s: &str, attribute: bool, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_tree() -> (DomTree, NodeId, Vec<NodeId>) {
        let mut tree = DomTree::new();
        let ul = tree.create_element("ul");
        tree.append_child(tree.root(), ul).unwrap();
        let items = (0..3)
            .map(|_| {
                let li = tree.create_element("li");
                tree.append_child(ul, li).unwrap();
                li
            })
            .collect();
        (tree, ul, items)
    }

    #[test]
    fn test_insert_before() {
        let (mut tree, ul, items) = list_tree();
        let first = tree.create_element("li");
        tree.insert_before(ul, first, Some(items[0])).unwrap();

        let order: Vec<_> = tree.children(ul).map(|(id, _)| id).collect();
        assert_eq!(order, vec![first, items[0], items[1], items[2]]);
    }

    #[test]
    fn test_insert_before_foreign_reference() {
        let (mut tree, ul, _) = list_tree();
        let stray = tree.create_element("li");
        let other = tree.create_element("p");

        assert_eq!(
            tree.insert_before(ul, other, Some(stray)),
            Err(DomError::NotAChild)
        );
    }

    #[test]
    fn test_replace_with_keeps_position() {
        let (mut tree, ul, items) = list_tree();
        let swapped = tree.create_element("li");

        assert_eq!(tree.replace_with(items[1], swapped), Ok(true));
        let order: Vec<_> = tree.children(ul).map(|(id, _)| id).collect();
        assert_eq!(order, vec![items[0], swapped, items[2]]);
        assert!(!tree.get(items[1]).unwrap().parent.is_valid());
    }

    #[test]
    fn test_replace_with_detached_is_noop() {
        let mut tree = DomTree::new();
        let old = tree.create_element("div");
        let new = tree.create_element("div");

        assert_eq!(tree.replace_with(old, new), Ok(false));
        assert!(!tree.is_connected(new));
    }

    #[test]
    fn test_remove_vacates_subtree() {
        let (mut tree, ul, items) = list_tree();

        assert!(tree.remove(ul));
        assert!(!tree.contains(ul));
        assert!(items.iter().all(|id| !tree.contains(*id)));
        assert!(!tree.remove(ul), "second removal is a no-op");
        assert_eq!(tree.children(tree.root()).count(), 0);
    }

    #[test]
    fn test_removed_slots_are_reused() {
        let (mut tree, ul, items) = list_tree();
        let slots = tree.len();

        tree.remove(ul);
        assert_eq!(tree.free_count(), 4);

        let reused = tree.create_element("ol");
        assert_eq!(tree.len(), slots);
        assert!(tree.contains(reused));
        assert!(items.iter().chain([&ul]).all(|stale| !tree.contains(*stale)));
        assert!(tree.get(ul).is_none());
    }

    #[test]
    fn test_stale_id_does_not_resolve_after_reuse() {
        let mut tree = DomTree::new();
        let old = tree.create_element("div");
        tree.remove(old);
        let new = tree.create_element("span");

        assert_eq!(old.index(), new.index());
        assert_ne!(old.generation(), new.generation());
        assert!(tree.element(old).is_none());
        assert_eq!(tree.element(new).map(|e| e.tag.as_str()), Some("span"));
        assert!(!tree.remove(old));
        assert!(tree.contains(new));
    }

    #[test]
    fn test_append_ancestor_rejected() {
        let (mut tree, ul, items) = list_tree();
        assert_eq!(tree.append_child(items[0], ul), Err(DomError::HierarchyRequest));
    }

    #[test]
    fn test_to_html() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        tree.set_attribute(div, "class", "note").unwrap();
        let br = tree.create_element("br");
        let text = tree.create_text("a < b");
        tree.append_child(div, text).unwrap();
        tree.append_child(div, br).unwrap();

        assert_eq!(tree.to_html(div), r#"<div class="note">a &lt; b<br></div>"#);
    }

    #[test]
    fn test_descendants_document_order() {
        let mut tree = DomTree::new();
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        let c = tree.create_element("c");
        let d = tree.create_element("d");
        tree.append_child(tree.root(), a).unwrap();
        tree.append_child(a, b).unwrap();
        tree.append_child(b, c).unwrap();
        tree.append_child(a, d).unwrap();

        assert_eq!(tree.descendants(tree.root()), vec![a, b, c, d]);
    }
}
