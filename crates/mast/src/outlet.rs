//! Outlet resolution
//!
//! An outlet is where a component's element goes: a selector or a node.

use crate::error::{ComponentError, Result};
use mast_dom::{Document, NodeId};
use serde::Deserialize;
use std::fmt;

/// Mount target
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Outlet {
    Selector(String),
    Element(NodeId),
}

impl From<String> for Outlet {
    fn from(selector: String) -> Self {
        Outlet::Selector(selector)
    }
}

impl From<&str> for Outlet {
    fn from(selector: &str) -> Self {
        Outlet::Selector(selector.to_string())
    }
}

impl From<NodeId> for Outlet {
    fn from(node: NodeId) -> Self {
        Outlet::Element(node)
    }
}

impl fmt::Display for Outlet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outlet::Selector(selector) => f.write_str(selector),
            Outlet::Element(node) => write!(f, "{node}"),
        }
    }
}

/// Find the single element a component should mount into.
///
/// Precedence: `explicit`, then `declared`, then the parent's element.
/// Without any of these there is nowhere to go. Selectors are searched
/// under `context` when given, otherwise in the whole document, and must
/// match exactly one element.
pub fn resolve_outlet(
    document: &Document,
    explicit: Option<&Outlet>,
    declared: Option<&Outlet>,
    parent_element: Option<NodeId>,
    context: Option<NodeId>,
) -> Result<NodeId> {
    let outlet = match explicit.or(declared) {
        Some(outlet) => outlet.clone(),
        None => match parent_element {
            Some(element) => Outlet::Element(element),
            None => return Err(ComponentError::NoOutlet),
        },
    };

    let child_context = context.is_some();
    let matches = match &outlet {
        Outlet::Element(node) => {
            if document.tree().element(*node).is_some() {
                vec![*node]
            } else {
                Vec::new()
            }
        }
        Outlet::Selector(selector) => document.find(context, selector)?,
    };

    match matches.as_slice() {
        [single] => Ok(*single),
        [] => {
            tracing::debug!("Outlet {} matched nothing (context {:?})", outlet, context);
            Err(ComponentError::OutletNotFound {
                selector: outlet.to_string(),
                child_context,
            })
        }
        many => Err(ComponentError::AmbiguousOutlet {
            selector: outlet.to_string(),
            count: many.len(),
            child_context,
        }),
    }
}
