//! Component errors

use crate::component::ComponentId;
use crate::model::ModelError;
use crate::pattern::PatternError;
use mast_dom::{DomError, SelectorError};
use mast_html::MarkupError;

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, ComponentError>;

/// Component engine error
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    #[error("no pattern or template selector specified for component '{component}'")]
    MissingTemplate { component: String },

    #[error("cannot register subcomponent '{key}' because 'component' was not defined")]
    MissingSubcomponentType { key: String },

    #[error("cannot register subcomponent '{key}' because specified component, '{name}', does not exist")]
    UnregisteredSubcomponent { key: String, name: String },

    #[error("no identity with that name ({name}) exists")]
    UnknownIdentity { name: String },

    #[error("invalid identity provided: {identity}")]
    InvalidIdentity { identity: String },

    #[error("no outlet selector specified to render into")]
    NoOutlet,

    #[error(
        "no elements exist {}for {}outlet selector '{selector}'",
        scope(.child_context),
        child(.child_context)
    )]
    OutletNotFound { selector: String, child_context: bool },

    #[error(
        "more than one element ({count}) exists {}for {}outlet selector '{selector}'",
        scope(.child_context),
        child(.child_context)
    )]
    AmbiguousOutlet {
        selector: String,
        count: usize,
        child_context: bool,
    },

    #[error("unknown component {0}")]
    UnknownComponent(ComponentId),

    #[error("component {0} has been destroyed")]
    Destroyed(ComponentId),

    #[error("invalid event declaration '{spec}': {source}")]
    InvalidEventSpec {
        spec: String,
        #[source]
        source: SelectorError,
    },

    #[error("malformed descriptor: {0}")]
    Descriptor(#[from] serde_json::Error),

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

fn scope(child_context: &bool) -> &'static str {
    if *child_context { "in this template context " } else { "" }
}

fn child(child_context: &bool) -> &'static str {
    if *child_context { "child " } else { "" }
}
