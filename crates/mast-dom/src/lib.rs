//! Mast DOM - Document Object Model
//!
//! Arena-based DOM tree used as the mount surface for Mast components:
//! node storage, selector matching, scoped queries and delegated events.

mod node;
mod tree;
mod document;
mod operations;
mod selector;
mod events;
mod generation;

pub use node::{Node, NodeData, ElementData, Attribute};
pub use tree::{DomTree, Children};
pub use document::Document;
pub use operations::{DomError, DomResult};
pub use selector::{Selector, SelectorError, SimpleSelector, Compound, Combinator, ElementQuery};
pub use events::{EventType, DomEvent, DelegatedHandler, DelegationTable, Delivery, parse_event_spec};
pub use generation::Generation;

use std::fmt;

/// Node identifier: arena index plus the generation of the slot it was
/// issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: Generation,
}

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId::new(0, Generation::INITIAL);

    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId::new(u32::MAX, Generation::INITIAL);

    #[inline]
    pub(crate) const fn new(index: u32, generation: Generation) -> Self {
        Self { index, generation }
    }

    /// Check whether this ID refers to a node slot at all
    #[inline]
    pub fn is_valid(self) -> bool {
        self.index != u32::MAX
    }

    /// Raw arena index
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when this ID was issued
    #[inline]
    pub fn generation(self) -> Generation {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "node#{}", self.index)
        } else {
            f.write_str("node#none")
        }
    }
}
