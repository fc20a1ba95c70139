//! DOM Events and Delegation
//!
//! Handlers are bound on a root element and filtered by selector when an
//! event bubbles up through that root, the way view libraries delegate
//! `"click .remove"` style declarations.

use crate::{DomTree, NodeId, Selector, SelectorError};
use std::collections::HashMap;

/// Event type identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    Click,
    DblClick,
    MouseDown,
    MouseUp,
    MouseEnter,
    MouseLeave,
    KeyDown,
    KeyUp,
    Input,
    Change,
    Focus,
    Blur,
    Submit,
    Custom(String),
}

impl EventType {
    /// Map a DOM event name to its type
    pub fn from_name(name: &str) -> Self {
        match name {
            "click" => Self::Click,
            "dblclick" => Self::DblClick,
            "mousedown" => Self::MouseDown,
            "mouseup" => Self::MouseUp,
            "mouseenter" => Self::MouseEnter,
            "mouseleave" => Self::MouseLeave,
            "keydown" => Self::KeyDown,
            "keyup" => Self::KeyUp,
            "input" => Self::Input,
            "change" => Self::Change,
            "focus" => Self::Focus,
            "blur" => Self::Blur,
            "submit" => Self::Submit,
            other => Self::Custom(other.to_string()),
        }
    }

    /// DOM event name
    pub fn name(&self) -> &str {
        match self {
            Self::Click => "click",
            Self::DblClick => "dblclick",
            Self::MouseDown => "mousedown",
            Self::MouseUp => "mouseup",
            Self::MouseEnter => "mouseenter",
            Self::MouseLeave => "mouseleave",
            Self::KeyDown => "keydown",
            Self::KeyUp => "keyup",
            Self::Input => "input",
            Self::Change => "change",
            Self::Focus => "focus",
            Self::Blur => "blur",
            Self::Submit => "submit",
            Self::Custom(name) => name,
        }
    }

    /// Check if this event type can bubble
    pub fn bubbles(&self) -> bool {
        !matches!(self,
            Self::Focus |
            Self::Blur |
            Self::MouseEnter |
            Self::MouseLeave
        )
    }
}

/// Split a `"click .remove"` declaration into event type and selector
pub fn parse_event_spec(spec: &str) -> Result<(EventType, Option<Selector>), SelectorError> {
    let spec = spec.trim();
    let (name, rest) = match spec.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (spec, ""),
    };
    if name.is_empty() {
        return Err(SelectorError::Empty);
    }

    let selector = if rest.is_empty() { None } else { Some(Selector::parse(rest)?) };
    Ok((EventType::from_name(name), selector))
}

/// A dispatched event as seen by one handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub event_type: EventType,
    /// Node the event originated on
    pub target: NodeId,
    /// Node the handler's selector matched (or the delegation root)
    pub current_target: NodeId,
}

/// Delegated handler
#[derive(Debug, Clone)]
pub struct DelegatedHandler<O> {
    pub owner: O,
    pub event_type: EventType,
    /// `None` handles events on the root itself and anything bubbling to it
    pub selector: Option<Selector>,
    pub handler: String,
}

/// One handler invocation produced by [`DelegationTable::dispatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery<O> {
    pub owner: O,
    pub handler: String,
    pub event: DomEvent,
}

/// Delegated handlers keyed by the element they are bound to
#[derive(Debug)]
pub struct DelegationTable<O> {
    roots: HashMap<NodeId, Vec<DelegatedHandler<O>>>,
}

impl<O: Copy + Eq> DelegationTable<O> {
    pub fn new() -> Self {
        Self { roots: HashMap::new() }
    }

    /// Bind a handler on `root`
    pub fn bind(
        &mut self,
        root: NodeId,
        owner: O,
        event_type: EventType,
        selector: Option<Selector>,
        handler: impl Into<String>,
    ) {
        self.roots.entry(root).or_default().push(DelegatedHandler {
            owner,
            event_type,
            selector,
            handler: handler.into(),
        });
    }

    /// Remove every handler belonging to `owner`, returning how many went
    pub fn unbind_owner(&mut self, owner: O) -> usize {
        let mut removed = 0;
        self.roots.retain(|_, handlers| {
            let before = handlers.len();
            handlers.retain(|h| h.owner != owner);
            removed += before - handlers.len();
            !handlers.is_empty()
        });
        removed
    }

    /// Remove every handler bound on `root`
    pub fn unbind_root(&mut self, root: NodeId) -> usize {
        self.roots.remove(&root).map_or(0, |handlers| handlers.len())
    }

    /// Handlers currently bound on `root`
    pub fn handlers_for(&self, root: NodeId) -> &[DelegatedHandler<O>] {
        self.roots.get(&root).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of bound handlers owned by `owner`
    pub fn count_for(&self, owner: O) -> usize {
        self.roots
            .values()
            .flat_map(|handlers| handlers.iter())
            .filter(|h| h.owner == owner)
            .count()
    }

    /// Total number of bound handlers
    pub fn len(&self) -> usize {
        self.roots.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Resolve which handlers an event on `target` reaches, innermost first
    pub fn dispatch(&self, tree: &DomTree, target: NodeId, event_type: &EventType) -> Vec<Delivery<O>> {
        if !tree.contains(target) {
            return Vec::new();
        }

        let mut path = vec![target];
        path.extend(tree.ancestors(target));
        let bubbles = event_type.bubbles();

        let mut out = Vec::new();
        for (depth, root) in path.iter().enumerate() {
            let Some(handlers) = self.roots.get(root) else { continue };
            for h in handlers.iter().filter(|h| &h.event_type == event_type) {
                let deliver = |current_target: NodeId| Delivery {
                    owner: h.owner,
                    handler: h.handler.clone(),
                    event: DomEvent {
                        event_type: event_type.clone(),
                        target,
                        current_target,
                    },
                };
                match &h.selector {
                    None => {
                        if bubbles || depth == 0 {
                            out.push(deliver(*root));
                        }
                    }
                    Some(selector) => {
                        for node in &path[..depth] {
                            if !bubbles && *node != target {
                                continue;
                            }
                            if selector.matches(tree, *node) {
                                out.push(deliver(*node));
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

impl<O: Copy + Eq> Default for DelegationTable<O> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_tree() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let row = tree.create_element("li");
        let button = tree.create_element("button");
        tree.set_attribute(button, "class", "remove").unwrap();
        let label = tree.create_element("span");
        tree.append_child(tree.root(), row).unwrap();
        tree.append_child(row, button).unwrap();
        tree.append_child(row, label).unwrap();
        (tree, row, button, label)
    }

    #[test]
    fn test_parse_event_spec() {
        let (ty, sel) = parse_event_spec("click .remove").unwrap();
        assert_eq!(ty, EventType::Click);
        assert_eq!(sel.unwrap().as_str(), ".remove");

        let (ty, sel) = parse_event_spec("dragstart").unwrap();
        assert_eq!(ty, EventType::Custom("dragstart".into()));
        assert!(sel.is_none());

        assert!(parse_event_spec("   ").is_err());
    }

    #[test]
    fn test_event_type_bubbles() {
        assert!(EventType::Click.bubbles());
        assert!(!EventType::Focus.bubbles());
        assert_eq!(EventType::from_name("submit").name(), "submit");
    }

    #[test]
    fn test_delegated_dispatch() {
        let (tree, row, button, label) = row_tree();
        let mut table = DelegationTable::new();
        table.bind(row, 1u32, EventType::Click, Some(Selector::parse(".remove").unwrap()), "remove");
        table.bind(row, 1u32, EventType::Click, None, "select");

        let hits = table.dispatch(&tree, button, &EventType::Click);
        let names: Vec<_> = hits.iter().map(|d| d.handler.as_str()).collect();
        assert_eq!(names, vec!["remove", "select"]);
        assert_eq!(hits[0].event.current_target, button);
        assert_eq!(hits[1].event.current_target, row);

        let hits = table.dispatch(&tree, label, &EventType::Click);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].handler, "select");
    }

    #[test]
    fn test_non_bubbling_event() {
        let (tree, row, button, _) = row_tree();
        let mut table = DelegationTable::new();
        table.bind(row, 7u32, EventType::Focus, None, "focused");

        assert!(table.dispatch(&tree, button, &EventType::Focus).is_empty());
        assert_eq!(table.dispatch(&tree, row, &EventType::Focus).len(), 1);
    }

    #[test]
    fn test_unbind_owner() {
        let (tree, row, button, _) = row_tree();
        let mut table = DelegationTable::new();
        table.bind(row, 1u32, EventType::Click, None, "a");
        table.bind(row, 2u32, EventType::Click, None, "b");

        assert_eq!(table.unbind_owner(1), 1);
        assert_eq!(table.count_for(1), 0);
        assert_eq!(table.len(), 1);
        let hits = table.dispatch(&tree, button, &EventType::Click);
        assert_eq!(hits[0].owner, 2);
    }
}
