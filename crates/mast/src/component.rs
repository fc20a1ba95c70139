//! Component state

use crate::definition::ComponentType;
use crate::hooks::ComponentHooks;
use crate::model::{ModelHandle, SubscriptionId};
use crate::outlet::Outlet;
use crate::pattern::Pattern;
use mast_dom::{Generation, NodeId};
use std::fmt;

/// Component identifier: slot in the runtime's arena plus the slot's
/// generation, so ids of destroyed components never alias new ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId {
    index: u32,
    generation: Generation,
}

impl ComponentId {
    #[inline]
    pub(crate) const fn new(index: u32, generation: Generation) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(self) -> Generation {
        self.generation
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.generation.value() {
            0 => write!(f, "c{}", self.index),
            g => write!(f, "c{}.{}", self.index, g),
        }
    }
}

/// Where a component is in its life.
///
/// `Destroyed` is only ever reported by [`crate::Runtime::state`]: a
/// destroyed component is dropped from the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unmounted,
    Mounted,
    Destroyed,
}

/// A live component.
///
/// Components are owned by the runtime; everything that changes them goes
/// through `Runtime`.
pub struct Component {
    pub(crate) id: ComponentId,
    pub(crate) kind: ComponentType,
    pub(crate) model: ModelHandle,
    pub(crate) pattern: Box<dyn Pattern>,
    pub(crate) element: NodeId,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) children: Vec<(String, ComponentId)>,
    pub(crate) outlet: Option<Outlet>,
    pub(crate) autorender: bool,
    pub(crate) replace_outlet: bool,
    pub(crate) state: LifecycleState,
    /// Taken out while a hook runs
    pub(crate) hooks: Option<Box<dyn ComponentHooks>>,
    pub(crate) pattern_subscription: Option<SubscriptionId>,
}

impl Component {
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// The type this component was built from
    pub fn kind(&self) -> &ComponentType {
        &self.kind
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn pattern(&self) -> &dyn Pattern {
        self.pattern.as_ref()
    }

    /// Current root element
    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    /// Children in registration order
    pub fn children(&self) -> &[(String, ComponentId)] {
        &self.children
    }

    pub fn child(&self, key: &str) -> Option<ComponentId> {
        self.children.iter().find(|(k, _)| k == key).map(|(_, id)| *id)
    }

    pub fn outlet(&self) -> Option<&Outlet> {
        self.outlet.as_ref()
    }

    pub fn autorender(&self) -> bool {
        self.autorender
    }

    pub fn replace_outlet(&self) -> bool {
        self.replace_outlet
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_mounted(&self) -> bool {
        self.state == LifecycleState::Mounted
    }

    /// Store `child` under `key`, handing back whatever was there before
    pub(crate) fn insert_child(&mut self, key: String, child: ComponentId) -> Option<ComponentId> {
        match self.children.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => Some(std::mem::replace(&mut slot.1, child)),
            None => {
                self.children.push((key, child));
                None
            }
        }
    }

    pub(crate) fn remove_child(&mut self, child: ComponentId) -> bool {
        let before = self.children.len();
        self.children.retain(|(_, id)| *id != child);
        self.children.len() != before
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("kind", &self.kind.name())
            .field("template", &self.pattern.template())
            .field("element", &self.element)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("outlet", &self.outlet)
            .field("state", &self.state)
            .finish()
    }
}
