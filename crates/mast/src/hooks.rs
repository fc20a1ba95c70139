//! Component hooks
//!
//! Per-instance behaviour: what happens on init, after a render, once the
//! connection is live and when a delegated event arrives.

use crate::component::ComponentId;
use crate::error::Result;
use crate::model::Value;
use crate::runtime::Runtime;
use mast_dom::{Document, DomEvent, NodeId};

/// Lifecycle callbacks. Every method has an empty default.
///
/// Hooks are lent out while they run: a hook that re-enters its own
/// component (say, by rendering it) will not see its own hooks invoked.
pub trait ComponentHooks {
    /// After subcomponents are registered, before the first mount
    fn init(&mut self, _cx: &mut Context<'_>) {}

    /// After every non-silent render
    fn after_render(&mut self, _cx: &mut Context<'_>) {}

    /// Once the connection is live
    fn after_connect(&mut self, _cx: &mut Context<'_>) {}

    /// A delegated event declared as `spec => handler` fired
    fn on_event(&mut self, _handler: &str, _event: &DomEvent, _cx: &mut Context<'_>) {}
}

/// Hooks that do nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ComponentHooks for NoHooks {}

/// What a hook gets to work with
pub struct Context<'a> {
    runtime: &'a mut Runtime,
    id: ComponentId,
}

impl<'a> Context<'a> {
    pub(crate) fn new(runtime: &'a mut Runtime, id: ComponentId) -> Self {
        Self { runtime, id }
    }

    /// The component the hook belongs to
    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn element(&self) -> Option<NodeId> {
        self.runtime.component(self.id).map(|c| c.element())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.runtime.get(self.id, key).ok().flatten()
    }

    /// Set a model attribute; the resulting render is queued
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<Option<Value>> {
        self.runtime.set(self.id, key, value.into())
    }

    pub fn child(&self, key: &str) -> Option<ComponentId> {
        self.runtime.component(self.id).and_then(|c| c.child(key))
    }

    pub fn document(&self) -> &Document {
        self.runtime.document()
    }

    /// Full runtime access
    pub fn runtime(&mut self) -> &mut Runtime {
        self.runtime
    }
}
