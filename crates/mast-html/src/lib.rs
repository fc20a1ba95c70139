//! Mast HTML
//!
//! Turns markup produced by patterns into `mast-dom` nodes, built on
//! html5ever. Fragments land detached in an existing tree so the caller
//! decides where they go.

mod parser;

pub use parser::HtmlParser;

use mast_dom::{Document, DomTree, NodeId};

/// Parse a whole HTML page into a new document
pub fn parse_document(html: &str) -> Result<Document, MarkupError> {
    HtmlParser::new().parse(html)
}

/// Parse markup into detached top-level nodes inside `tree`
pub fn parse_fragment(tree: &mut DomTree, markup: &str) -> Result<Vec<NodeId>, MarkupError> {
    HtmlParser::new().parse_fragment(tree, markup)
}

/// Parse markup that must describe exactly one root element
pub fn parse_element(tree: &mut DomTree, markup: &str) -> Result<NodeId, MarkupError> {
    HtmlParser::new().parse_element(tree, markup)
}

/// Markup conversion error
#[derive(Debug, thiserror::Error)]
pub enum MarkupError {
    #[error("markup contains no element: {markup:?}")]
    NoElement { markup: String },

    #[error("markup has {count} top-level elements, expected exactly one")]
    MultipleRoots { count: usize },

    #[error("failed to read markup: {0}")]
    Io(#[from] std::io::Error),
}
