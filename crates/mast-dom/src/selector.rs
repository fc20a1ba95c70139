//! Selectors and Element Queries
//!
//! A small CSS selector subset: tag, `*`, `#id`, `.class`, `[attr]`,
//! `[attr=value]`, compounds of those, and the descendant (` `) and
//! child (`>`) combinators. Enough to address outlets and delegated
//! event targets.

use crate::{DomTree, ElementData, NodeId};
use std::fmt;
use std::str::FromStr;

/// Selector parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected '{found}' in selector '{selector}'")]
    Unexpected { selector: String, found: char },

    #[error("invalid name '{name}' in selector '{selector}'")]
    InvalidName { selector: String, name: String },

    #[error("unclosed attribute selector in '{selector}'")]
    UnclosedAttribute { selector: String },

    #[error("combinator without a selector on both sides in '{selector}'")]
    DanglingCombinator { selector: String },
}

/// Simple selector for matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    Universal,
    Tag(String),
    Id(String),
    Class(String),
    Attribute { name: String, value: Option<String> },
}

impl SimpleSelector {
    /// Check a single element against this selector
    pub fn matches(&self, elem: &ElementData) -> bool {
        match self {
            Self::Universal => true,
            Self::Tag(tag) => elem.tag.eq_ignore_ascii_case(tag),
            Self::Id(id) => elem.id.as_deref() == Some(id.as_str()),
            Self::Class(class) => elem.has_class(class),
            Self::Attribute { name, value } => match (elem.get_attr(name), value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
                (None, _) => false,
            },
        }
    }
}

/// Several simple selectors that must all match the same element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compound {
    pub parts: Vec<SimpleSelector>,
}

impl Compound {
    pub fn matches(&self, elem: &ElementData) -> bool {
        self.parts.iter().all(|p| p.matches(elem))
    }
}

/// Relation between two compounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    /// Relation to the previous step (ignored on the first one)
    combinator: Combinator,
    compound: Compound,
}

/// A parsed selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    steps: Vec<Step>,
}

enum Token<'a> {
    Compound(&'a str),
    Child,
}

impl Selector {
    /// Parse a selector string
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut steps = Vec::new();
        let mut combinator = None;
        for token in tokenize(trimmed)? {
            match token {
                Token::Child => {
                    if steps.is_empty() || combinator.is_some() {
                        return Err(SelectorError::DanglingCombinator { selector: trimmed.to_string() });
                    }
                    combinator = Some(Combinator::Child);
                }
                Token::Compound(text) => {
                    steps.push(Step {
                        combinator: combinator.take().unwrap_or(Combinator::Descendant),
                        compound: parse_compound(trimmed, text)?,
                    });
                }
            }
        }
        if combinator.is_some() {
            return Err(SelectorError::DanglingCombinator { selector: trimmed.to_string() });
        }

        Ok(Self { source: trimmed.to_string(), steps })
    }

    /// The selector as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Check if an element matches this selector
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        self.matches_step(tree, node, self.steps.len() - 1)
    }

    fn matches_step(&self, tree: &DomTree, node: NodeId, idx: usize) -> bool {
        let Some(elem) = tree.element(node) else { return false };
        let step = &self.steps[idx];
        if !step.compound.matches(elem) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match step.combinator {
            Combinator::Child => tree
                .get(node)
                .map(|n| n.parent)
                .filter(|p| p.is_valid())
                .is_some_and(|parent| self.matches_step(tree, parent, idx - 1)),
            Combinator::Descendant => tree
                .ancestors(node)
                .any(|ancestor| self.matches_step(tree, ancestor, idx - 1)),
        }
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn tokenize(selector: &str) -> Result<Vec<Token<'_>>, SelectorError> {
    let mut tokens = Vec::new();
    let mut start = None;
    let mut in_brackets = false;

    for (i, c) in selector.char_indices() {
        if in_brackets {
            if c == ']' {
                in_brackets = false;
            }
            continue;
        }
        match c {
            '[' => {
                in_brackets = true;
                start.get_or_insert(i);
            }
            '>' => {
                if let Some(s) = start.take() {
                    tokens.push(Token::Compound(&selector[s..i]));
                }
                tokens.push(Token::Child);
            }
            c if c.is_whitespace() => {
                if let Some(s) = start.take() {
                    tokens.push(Token::Compound(&selector[s..i]));
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }
    if in_brackets {
        return Err(SelectorError::UnclosedAttribute { selector: selector.to_string() });
    }
    if let Some(s) = start {
        tokens.push(Token::Compound(&selector[s..]));
    }
    Ok(tokens)
}

fn is_ident(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn parse_compound(selector: &str, text: &str) -> Result<Compound, SelectorError> {
    let invalid = |name: &str| SelectorError::InvalidName {
        selector: selector.to_string(),
        name: name.to_string(),
    };
    let is_marker = |c: char| matches!(c, '#' | '.' | '[');

    let mut parts = Vec::new();
    let tag_end = text.find(is_marker).unwrap_or(text.len());
    let (tag, mut rest) = text.split_at(tag_end);
    if tag == "*" {
        parts.push(SimpleSelector::Universal);
    } else if !tag.is_empty() {
        if !is_ident(tag) {
            return Err(invalid(tag));
        }
        parts.push(SimpleSelector::Tag(tag.to_ascii_lowercase()));
    }

    while let Some(marker) = rest.chars().next() {
        match marker {
            '#' | '.' => {
                let body = &rest[1..];
                let end = body.find(is_marker).unwrap_or(body.len());
                let name = &body[..end];
                if !is_ident(name) {
                    return Err(invalid(name));
                }
                parts.push(if marker == '#' {
                    SimpleSelector::Id(name.to_string())
                } else {
                    SimpleSelector::Class(name.to_string())
                });
                rest = &body[end..];
            }
            '[' => {
                let close = rest.find(']').ok_or_else(|| SelectorError::UnclosedAttribute {
                    selector: selector.to_string(),
                })?;
                let inner = &rest[1..close];
                let (name, value) = match inner.split_once('=') {
                    Some((name, value)) => {
                        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                        (name.trim(), Some(value.to_string()))
                    }
                    None => (inner.trim(), None),
                };
                if !is_ident(name) {
                    return Err(invalid(name));
                }
                parts.push(SimpleSelector::Attribute { name: name.to_ascii_lowercase(), value });
                rest = &rest[close + 1..];
            }
            found => {
                return Err(SelectorError::Unexpected { selector: selector.to_string(), found });
            }
        }
    }

    Ok(Compound { parts })
}

/// Element query trait
pub trait ElementQuery {
    /// First element under `root` matching the selector
    fn query_selector(&self, root: NodeId, selector: &Selector) -> Option<NodeId>;

    /// All elements under `root` matching the selector, in document order
    fn query_selector_all(&self, root: NodeId, selector: &Selector) -> Vec<NodeId>;

    /// Check if element matches selector
    fn matches(&self, element: NodeId, selector: &Selector) -> bool;
}

impl ElementQuery for DomTree {
    fn query_selector(&self, root: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .find(|id| selector.matches(self, *id))
    }

    fn query_selector_all(&self, root: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| selector.matches(self, *id))
            .collect()
    }

    fn matches(&self, element: NodeId, selector: &Selector) -> bool {
        selector.matches(self, element)
    }
}
