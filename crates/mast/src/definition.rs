//! Component types
//!
//! A `ComponentType` is the immutable definition components are built
//! from: template, default model, outlet, mount style, subcomponents,
//! delegated events and hooks. `ComponentOptions` carries per-instance
//! overrides.

use crate::component::ComponentId;
use crate::error::{ComponentError, Result};
use crate::hooks::{ComponentHooks, NoHooks};
use crate::identity::{Identity, Prototype};
use crate::model::{Attributes, ModelIdentity, Value};
use crate::outlet::Outlet;
use crate::pattern::Pattern;
use crate::runtime::Runtime;
use crate::subcomponent::SubcomponentDescriptor;
use mast_dom::{parse_event_spec, EventType, Selector};
use serde::Deserialize;
use std::fmt;
use std::rc::Rc;

/// Builds the hooks object for each new instance
pub type HooksFactory = Rc<dyn Fn() -> Box<dyn ComponentHooks>>;

/// Anything that can produce a component
pub type ComponentIdentity = Identity<ComponentType, ComponentId>;

/// A parsed `"click .remove" => "remove"` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
    pub spec: String,
    pub event_type: EventType,
    pub selector: Option<Selector>,
    pub handler: String,
}

struct ComponentDef {
    name: String,
    template: Option<String>,
    model: Option<ModelIdentity>,
    outlet: Option<Outlet>,
    replace_outlet: bool,
    autorender: bool,
    subcomponents: Vec<(String, SubcomponentDescriptor)>,
    events: Vec<EventBinding>,
    hooks: HooksFactory,
}

/// Component definition (cheap to clone)
#[derive(Clone)]
pub struct ComponentType(Rc<ComponentDef>);

impl ComponentType {
    pub fn builder(name: impl Into<String>) -> ComponentTypeBuilder {
        ComponentTypeBuilder {
            def: ComponentDef {
                name: name.into(),
                template: None,
                model: None,
                outlet: None,
                replace_outlet: false,
                autorender: true,
                subcomponents: Vec::new(),
                events: Vec::new(),
                hooks: Rc::new(|| Box::new(NoHooks) as Box<dyn ComponentHooks>),
            },
            events: Vec::new(),
        }
    }

    /// Plain component with nothing declared; instances supply everything
    pub fn base() -> Self {
        Self(Rc::new(Self::builder("Component").def))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn template(&self) -> Option<&str> {
        self.0.template.as_deref()
    }

    pub fn model(&self) -> Option<&ModelIdentity> {
        self.0.model.as_ref()
    }

    pub fn outlet(&self) -> Option<&Outlet> {
        self.0.outlet.as_ref()
    }

    pub fn replace_outlet(&self) -> bool {
        self.0.replace_outlet
    }

    pub fn autorender(&self) -> bool {
        self.0.autorender
    }

    /// Declared subcomponents in declaration order
    pub fn subcomponents(&self) -> &[(String, SubcomponentDescriptor)] {
        &self.0.subcomponents
    }

    pub fn events(&self) -> &[EventBinding] {
        &self.0.events
    }

    pub(crate) fn make_hooks(&self) -> Box<dyn ComponentHooks> {
        (self.0.hooks)()
    }

    /// Two handles to the same definition
    pub fn same_as(&self, other: &ComponentType) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Prototype for ComponentType {
    type Instance = ComponentId;
    type Error = ComponentError;
    type Context = Runtime;

    fn name(&self) -> &str {
        &self.0.name
    }

    fn instantiate(&self, runtime: &mut Runtime, attributes: Attributes) -> Result<ComponentId> {
        let options = ComponentOptions::from_attributes(attributes)?;
        runtime.create(self, options)
    }

    fn instantiate_inert(&self, runtime: &mut Runtime) -> Result<ComponentId> {
        runtime.create(self, ComponentOptions::new().autorender(false))
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentType")
            .field("name", &self.0.name)
            .field("template", &self.0.template)
            .field("model", &self.0.model)
            .field("outlet", &self.0.outlet)
            .field("replace_outlet", &self.0.replace_outlet)
            .field("autorender", &self.0.autorender)
            .field("subcomponents", &self.0.subcomponents)
            .field("events", &self.0.events.len())
            .finish()
    }
}

/// Builder for [`ComponentType`]
pub struct ComponentTypeBuilder {
    def: ComponentDef,
    events: Vec<(String, String)>,
}

impl ComponentTypeBuilder {
    /// Template selector, e.g. `#row-tpl`
    pub fn template(mut self, selector: impl Into<String>) -> Self {
        self.def.template = Some(selector.into());
        self
    }

    /// Default model for instances
    pub fn model(mut self, model: impl Into<ModelIdentity>) -> Self {
        self.def.model = Some(model.into());
        self
    }

    pub fn outlet(mut self, outlet: impl Into<Outlet>) -> Self {
        self.def.outlet = Some(outlet.into());
        self
    }

    /// Swap the outlet out instead of appending into it
    pub fn replace_outlet(mut self, replace: bool) -> Self {
        self.def.replace_outlet = replace;
        self
    }

    pub fn autorender(mut self, autorender: bool) -> Self {
        self.def.autorender = autorender;
        self
    }

    /// Declare a child under `key`
    pub fn subcomponent(mut self, key: impl Into<String>, descriptor: SubcomponentDescriptor) -> Self {
        self.def.subcomponents.push((key.into(), descriptor));
        self
    }

    /// Declare several children at once, keeping their order
    pub fn subcomponents<I>(mut self, descriptors: I) -> Self
    where
        I: IntoIterator<Item = (String, SubcomponentDescriptor)>,
    {
        self.def.subcomponents.extend(descriptors);
        self
    }

    /// Delegate `spec` (`"click"`, `"click .remove"`) to the hook handler `handler`
    pub fn event(mut self, spec: impl Into<String>, handler: impl Into<String>) -> Self {
        self.events.push((spec.into(), handler.into()));
        self
    }

    pub fn hooks<H, F>(mut self, factory: F) -> Self
    where
        H: ComponentHooks + 'static,
        F: Fn() -> H + 'static,
    {
        self.def.hooks = Rc::new(move || Box::new(factory()) as Box<dyn ComponentHooks>);
        self
    }

    /// Finish the definition, parsing event declarations
    pub fn build(mut self) -> Result<ComponentType> {
        for (spec, handler) in self.events {
            let (event_type, selector) = parse_event_spec(&spec)
                .map_err(|source| ComponentError::InvalidEventSpec { spec: spec.clone(), source })?;
            self.def.events.push(EventBinding {
                spec,
                event_type,
                selector,
                handler,
            });
        }
        Ok(ComponentType(Rc::new(self.def)))
    }
}

/// Per-instance options, layered over the type's declarations
#[derive(Default)]
pub struct ComponentOptions {
    pub template: Option<String>,
    pub model: Option<ModelIdentity>,
    /// A ready-made pattern; wins over `template`/`model`
    pub pattern: Option<Box<dyn Pattern>>,
    pub outlet: Option<Outlet>,
    pub replace_outlet: Option<bool>,
    pub autorender: Option<bool>,
    pub parent: Option<ComponentId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptionBag {
    template: Option<String>,
    outlet: Option<Outlet>,
    replace_outlet: Option<bool>,
    autorender: Option<bool>,
    model: Option<Value>,
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read options from an attribute bag.
    ///
    /// Recognised keys: `template`, `outlet`, `replaceOutlet`, `autorender`
    /// and `model` (a registered model name or an attribute object).
    /// Anything else is ignored.
    pub fn from_attributes(attributes: Attributes) -> Result<Self> {
        let bag: OptionBag = serde_json::from_value(Value::Object(attributes))?;
        let model = match bag.model {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(Identity::Name(name)),
            Some(Value::Object(attrs)) => Some(Identity::Attributes(attrs)),
            Some(other) => {
                return Err(ComponentError::InvalidIdentity {
                    identity: other.to_string(),
                });
            }
        };

        Ok(Self {
            template: bag.template,
            model,
            pattern: None,
            outlet: bag.outlet,
            replace_outlet: bag.replace_outlet,
            autorender: bag.autorender,
            parent: None,
        })
    }

    pub fn template(mut self, selector: impl Into<String>) -> Self {
        self.template = Some(selector.into());
        self
    }

    pub fn model(mut self, model: impl Into<ModelIdentity>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn pattern(mut self, pattern: impl Pattern + 'static) -> Self {
        self.pattern = Some(Box::new(pattern));
        self
    }

    pub fn outlet(mut self, outlet: impl Into<Outlet>) -> Self {
        self.outlet = Some(outlet.into());
        self
    }

    pub fn replace_outlet(mut self, replace: bool) -> Self {
        self.replace_outlet = Some(replace);
        self
    }

    pub fn autorender(mut self, autorender: bool) -> Self {
        self.autorender = Some(autorender);
        self
    }

    pub fn parent(mut self, parent: ComponentId) -> Self {
        self.parent = Some(parent);
        self
    }
}

impl fmt::Debug for ComponentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOptions")
            .field("template", &self.template)
            .field("model", &self.model)
            .field("pattern", &self.pattern.as_ref().map(|p| p.template().to_string()))
            .field("outlet", &self.outlet)
            .field("replace_outlet", &self.replace_outlet)
            .field("autorender", &self.autorender)
            .field("parent", &self.parent)
            .finish()
    }
}
