//! Mast
//!
//! Client-side component composition. A component pairs a model with a
//! pattern, renders it into the document and keeps the result in sync
//! with the model. Components nest: a parent declares subcomponents that
//! mount into outlets inside its own rendered element.
//!
//! # Example
//! ```rust,ignore
//! use mast::{ComponentOptions, ComponentType, LocalConnection, Registry, Runtime};
//!
//! let mut registry = Registry::new();
//! registry.define_template("#row", "<li>{{title}}</li>");
//! let row = ComponentType::builder("Row").template("#row").build()?;
//!
//! let mut runtime = Runtime::new(document, registry, Rc::new(LocalConnection::new()));
//! let id = runtime.create(&row, ComponentOptions::new().outlet("#list"))?;
//! runtime.run_until_idle();
//! ```

mod component;
mod config;
mod connection;
mod definition;
mod error;
mod hooks;
mod identity;
mod lifecycle;
mod model;
mod outlet;
mod pattern;
mod registry;
mod runtime;
mod scheduler;
mod subcomponent;

pub use component::{Component, ComponentId, LifecycleState};
pub use config::{Config, DestroyPolicy};
pub use connection::{ConnectHandler, Connection, LocalConnection};
pub use definition::{
    ComponentIdentity, ComponentOptions, ComponentType, ComponentTypeBuilder, EventBinding,
    HooksFactory,
};
pub use error::{ComponentError, Result};
pub use hooks::{ComponentHooks, Context, NoHooks};
pub use identity::{provision_instance, provision_prototype, Catalog, Identity, Prototype, Provisioned};
pub use model::{
    Attributes, ChangeListener, Model, ModelChange, ModelError, ModelHandle, ModelIdentity,
    ModelType, Store, SubscriptionId, Value,
};
pub use outlet::{resolve_outlet, Outlet};
pub use pattern::{Pattern, PatternError, TemplatePattern, TemplateStore};
pub use registry::Registry;
pub use runtime::{Notification, Observer, Runtime, TurnReport};
pub use scheduler::{QueueStats, Task, TaskId, TaskKind, TaskQueue};
pub use subcomponent::{parse_subcomponents, ComponentRef, SubcomponentDescriptor};

// Re-export sub-crates for advanced usage
pub use mast_dom as dom;
pub use mast_html as html;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
