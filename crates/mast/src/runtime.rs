//! Runtime
//!
//! Owns the document, the component arena, the registry, the connection
//! and the task queue. Every component operation goes through here.

use crate::component::{Component, ComponentId, LifecycleState};
use crate::config::{Config, DestroyPolicy};
use crate::connection::Connection;
use crate::definition::{ComponentIdentity, ComponentOptions, ComponentType};
use crate::error::{ComponentError, Result};
use crate::hooks::{ComponentHooks, Context};
use crate::identity::{provision_instance, provision_prototype, Catalog, Identity, Provisioned};
use crate::model::{ModelHandle, ModelIdentity, ModelType, Store, Value};
use crate::pattern::{Pattern, TemplatePattern};
use crate::registry::Registry;
use crate::scheduler::{QueueStats, Task, TaskKind, TaskQueue};
use mast_dom::{DelegationTable, Document, EventType, Generation, NodeId};
use std::cell::RefCell;
use std::rc::Rc;

/// Something worth telling observers about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    AfterRender,
    AfterConnect,
    Destroyed,
}

/// Observer callback, see [`Runtime::observe`]
pub type Observer = Rc<dyn Fn(ComponentId, Notification)>;

/// What a turn of the task queue did
#[derive(Debug, Default)]
pub struct TurnReport {
    pub turns: usize,
    pub ran: usize,
    /// Tasks whose component went away before they ran
    pub skipped: usize,
    pub failures: Vec<(TaskKind, ComponentError)>,
}

impl TurnReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn absorb(&mut self, other: TurnReport) {
        self.turns += other.turns;
        self.ran += other.ran;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }
}

/// Arena slot; emptied (and its generation bumped) when the component is destroyed
struct Slot {
    generation: Generation,
    component: Option<Component>,
}

/// Component runtime
pub struct Runtime {
    pub(crate) document: Document,
    registry: Registry,
    pub(crate) config: Config,
    pub(crate) connection: Rc<dyn Connection>,
    pub(crate) queue: Rc<RefCell<TaskQueue>>,
    components: Vec<Slot>,
    free: Vec<u32>,
    pub(crate) events: DelegationTable<ComponentId>,
    observers: Vec<(ComponentId, Observer)>,
}

impl Runtime {
    pub fn new(document: Document, registry: Registry, connection: Rc<dyn Connection>) -> Self {
        Self::with_config(document, registry, connection, Config::default())
    }

    pub fn with_config(
        document: Document,
        registry: Registry,
        connection: Rc<dyn Connection>,
        config: Config,
    ) -> Self {
        Self {
            document,
            registry,
            config,
            connection,
            queue: Rc::new(RefCell::new(TaskQueue::new())),
            components: Vec::new(),
            free: Vec::new(),
            events: DelegationTable::new(),
            observers: Vec::new(),
        }
    }

    /// Build a component.
    ///
    /// Order: model, pattern, subcomponents, `init`, first mount (unless
    /// autorender is off), connection hook. If any step fails the
    /// half-built component is torn down again and the error returned.
    pub fn create(&mut self, kind: &ComponentType, options: ComponentOptions) -> Result<ComponentId> {
        let ComponentOptions {
            template,
            model,
            pattern,
            outlet,
            replace_outlet,
            autorender,
            parent,
        } = options;

        if let Some(parent) = parent {
            self.live(parent)?;
        }

        let pattern: Box<dyn Pattern> = match pattern {
            Some(pattern) => {
                if template.is_some() || model.is_some() || kind.template().is_some() || kind.model().is_some() {
                    tracing::warn!(
                        "A template and/or model was specified for {} along with a pattern; using the pattern",
                        kind.name()
                    );
                }
                pattern
            }
            None => {
                let template = template
                    .or_else(|| kind.template().map(str::to_string))
                    .ok_or_else(|| ComponentError::MissingTemplate {
                        component: kind.name().to_string(),
                    })?;
                let fallback = match kind.model() {
                    Some(Identity::Type(declared)) => declared.clone(),
                    _ => ModelType::base(),
                };
                let model = self.provision_model(model.or_else(|| kind.model().cloned()), &fallback)?;
                Box::new(TemplatePattern::new(self.registry.templates.clone(), &template, model)?)
            }
        };

        let element = self.document.tree_mut().create_element(&self.config.placeholder_tag);
        let autorender = parent.is_none() && autorender.unwrap_or_else(|| kind.autorender());
        let id = self.insert_with(|id| Component {
            id,
            kind: kind.clone(),
            model: pattern.model().clone(),
            pattern,
            element,
            parent,
            children: Vec::new(),
            outlet: outlet.or_else(|| kind.outlet().cloned()),
            autorender,
            replace_outlet: replace_outlet.unwrap_or_else(|| kind.replace_outlet()),
            state: LifecycleState::Unmounted,
            hooks: Some(kind.make_hooks()),
            pattern_subscription: None,
        });
        tracing::debug!("Creating {} ({})", id, kind.name());

        if let Err(err) = self.finish_create(id, kind) {
            tracing::debug!("Construction of {} failed, rolling back: {}", id, err);
            if let Err(cleanup) = self.destroy_with(id, DestroyPolicy::Cascade) {
                tracing::error!("Rollback of {} failed: {}", id, cleanup);
            }
            return Err(err);
        }
        Ok(id)
    }

    fn finish_create(&mut self, id: ComponentId, kind: &ComponentType) -> Result<()> {
        let queue = Rc::downgrade(&self.queue);
        let subscription = self.component_mut(id)?.pattern.on_change(Rc::new(move || {
            if let Some(queue) = queue.upgrade() {
                queue.borrow_mut().schedule(TaskKind::Render(id));
            }
        }));
        self.component_mut(id)?.pattern_subscription = Some(subscription);

        for (key, descriptor) in kind.subcomponents() {
            self.register_subcomponent(id, descriptor.clone(), key)?;
        }

        self.bind_events(id)?;
        self.with_hooks(id, |hooks, cx| hooks.init(cx));

        let (autorender, replace_outlet) = {
            let component = self.live(id)?;
            (component.autorender, component.replace_outlet)
        };
        if autorender {
            if replace_outlet {
                self.replace(id, None)?;
            } else {
                self.append(id, None)?;
            }
        }

        self.arm_connection(id)
    }

    fn insert_with(&mut self, build: impl FnOnce(ComponentId) -> Component) -> ComponentId {
        if let Some(index) = self.free.pop() {
            if let Some(slot) = self.components.get_mut(index as usize) {
                let id = ComponentId::new(index, slot.generation);
                slot.component = Some(build(id));
                return id;
            }
        }
        let id = ComponentId::new(self.components.len() as u32, Generation::INITIAL);
        self.components.push(Slot {
            generation: Generation::INITIAL,
            component: Some(build(id)),
        });
        id
    }

    /// Empty `id`'s slot for reuse, handing back the component it held
    pub(crate) fn release(&mut self, id: ComponentId) -> Option<Component> {
        let slot = self
            .components
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation())?;
        let component = slot.component.take()?;
        slot.generation = slot.generation.next();
        self.free.push(id.index() as u32);
        Some(component)
    }

    /// Attribute bags are built with `fallback`, the type's declared model
    /// type when it has one
    fn provision_model(&self, identity: Option<ModelIdentity>, fallback: &ModelType) -> Result<ModelHandle> {
        let Some(identity) = identity else {
            return Ok(Store::new().into_handle());
        };
        let provisioned = provision_instance(identity, &self.registry.models, fallback, &mut ())?;
        Ok(match provisioned {
            Provisioned::Instance(model) => model,
            Provisioned::Unconstructed(bag) => Store::with_attributes(bag).into_handle(),
        })
    }

    /// Build a component from any identity.
    ///
    /// Types and names produce components that do not mount themselves;
    /// an attribute bag is read as [`ComponentOptions`] for the base
    /// component type.
    pub fn spawn(&mut self, identity: ComponentIdentity) -> Result<Provisioned<ComponentId>> {
        // Names are resolved first so the registry is not borrowed while
        // the component is built.
        let identity = match identity {
            Identity::Name(name) => {
                Identity::Type(provision_prototype(Identity::Name(name), &self.registry.components)?)
            }
            other => other,
        };
        provision_instance(identity, &Catalog::new(), &ComponentType::base(), self)
    }

    /// Read a model attribute
    pub fn get(&self, id: ComponentId, key: &str) -> Result<Option<Value>> {
        let component = self.live(id)?;
        let model = component.pattern.model().borrow();
        Ok(model.get(key).cloned())
    }

    /// Set a model attribute, returning the previous value.
    ///
    /// Any component whose pattern uses this model re-renders on the next turn.
    pub fn set(&mut self, id: ComponentId, key: &str, value: Value) -> Result<Option<Value>> {
        let model = self.live(id)?.pattern.model().clone();
        let previous = model.borrow_mut().set(key, value);
        Ok(previous)
    }

    /// Point the component's pattern at another template; re-renders on the next turn
    pub fn set_template(&mut self, id: ComponentId, selector: &str) -> Result<()> {
        self.live(id)?;
        self.component_mut(id)?.pattern.set_template(selector)?;
        Ok(())
    }

    /// Dispatch a DOM event on `target` to the delegated handlers it reaches.
    ///
    /// Returns the number of handlers invoked.
    pub fn trigger(&mut self, target: NodeId, event_type: EventType) -> usize {
        let deliveries = self.events.dispatch(self.document.tree(), target, &event_type);
        let mut delivered = 0;
        for delivery in deliveries {
            if self.live(delivery.owner).is_err() {
                continue;
            }
            tracing::debug!("Event {} → {}::{}", event_type.name(), delivery.owner, delivery.handler);
            let ran = self.with_hooks(delivery.owner, |hooks, cx| {
                hooks.on_event(&delivery.handler, &delivery.event, cx)
            });
            if ran.is_some() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Register an observer for `id`'s notifications
    pub fn observe(&mut self, id: ComponentId, observer: Observer) -> Result<()> {
        self.live(id)?;
        self.observers.push((id, observer));
        Ok(())
    }

    pub(crate) fn notify(&mut self, id: ComponentId, notification: Notification) {
        let observers: Vec<Observer> = self
            .observers
            .iter()
            .filter(|(target, _)| *target == id)
            .map(|(_, observer)| observer.clone())
            .collect();
        for observer in observers {
            observer(id, notification);
        }
        if notification == Notification::Destroyed {
            self.observers.retain(|(target, _)| *target != id);
        }
    }

    /// Run one turn: every task queued before the turn began
    pub fn tick(&mut self) -> TurnReport {
        let tasks = self.queue.borrow_mut().take_turn();
        let mut report = TurnReport {
            turns: 1,
            ..TurnReport::default()
        };

        for Task { id, kind } in tasks {
            match self.run_task(kind) {
                Ok(true) => report.ran += 1,
                Ok(false) => report.skipped += 1,
                Err(err) => {
                    tracing::error!("Deferred task {:?} ({:?}) failed: {}", id, kind, err);
                    report.failures.push((kind, err));
                }
            }
        }
        report
    }

    /// Run turns until the queue is empty or `Config::max_turns` is reached
    pub fn run_until_idle(&mut self) -> TurnReport {
        let mut report = TurnReport::default();
        while !self.queue.borrow().is_empty() {
            if report.turns >= self.config.max_turns {
                tracing::warn!(
                    "Task queue still busy after {} turns ({} pending)",
                    report.turns,
                    self.queue.borrow().len()
                );
                break;
            }
            let turn = self.tick();
            report.absorb(turn);
        }
        report
    }

    fn run_task(&mut self, kind: TaskKind) -> Result<bool> {
        match kind {
            TaskKind::MountChild { parent, child } => {
                let attached = self.live(parent).is_ok()
                    && self.live(child).is_ok_and(|c| c.parent == Some(parent));
                if !attached {
                    return Ok(false);
                }
                self.append(child, None)?;
            }
            TaskKind::Render(id) => {
                if self.live(id).is_err() {
                    return Ok(false);
                }
                self.render(id, false)?;
            }
            TaskKind::AfterConnect(id) => {
                if self.live(id).is_err() {
                    return Ok(false);
                }
                self.after_connect(id);
            }
        }
        Ok(true)
    }

    /// Lend `id`'s hooks to `f`
    pub(crate) fn with_hooks<R>(
        &mut self,
        id: ComponentId,
        f: impl FnOnce(&mut dyn ComponentHooks, &mut Context<'_>) -> R,
    ) -> Option<R> {
        let mut hooks = self.component_mut(id).ok()?.hooks.take()?;
        let result = {
            let mut cx = Context::new(self, id);
            f(hooks.as_mut(), &mut cx)
        };
        if let Ok(component) = self.component_mut(id) {
            if component.hooks.is_none() {
                component.hooks = Some(hooks);
            }
        }
        Some(result)
    }

    /// Live component behind `id`; a slot issued to `id` that has since
    /// been emptied or reused means it was destroyed
    pub(crate) fn live(&self, id: ComponentId) -> Result<&Component> {
        let slot = self
            .components
            .get(id.index())
            .ok_or(ComponentError::UnknownComponent(id))?;
        match &slot.component {
            Some(component) if slot.generation == id.generation() => Ok(component),
            _ => Err(ComponentError::Destroyed(id)),
        }
    }

    pub(crate) fn component_mut(&mut self, id: ComponentId) -> Result<&mut Component> {
        let slot = self
            .components
            .get_mut(id.index())
            .ok_or(ComponentError::UnknownComponent(id))?;
        match &mut slot.component {
            Some(component) if slot.generation == id.generation() => Ok(component),
            _ => Err(ComponentError::Destroyed(id)),
        }
    }

    /// Look up a live component
    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.live(id).ok()
    }

    /// Live components, in slot order
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.iter().filter_map(|slot| slot.component.as_ref())
    }

    /// `None` only for ids this runtime never issued
    pub fn state(&self, id: ComponentId) -> Option<LifecycleState> {
        match self.live(id) {
            Ok(component) => Some(component.state),
            Err(ComponentError::Destroyed(_)) => Some(LifecycleState::Destroyed),
            Err(_) => None,
        }
    }

    /// Number of component slots, free ones included
    pub fn component_slots(&self) -> usize {
        self.components.len()
    }

    /// Current root element of a live component
    pub fn element(&self, id: ComponentId) -> Result<NodeId> {
        Ok(self.live(id)?.element)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn connection(&self) -> &Rc<dyn Connection> {
        &self.connection
    }

    pub fn events(&self) -> &DelegationTable<ComponentId> {
        &self.events
    }

    /// Number of tasks waiting for the next turn
    pub fn pending_tasks(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Snapshot of pending tasks in execution order
    pub fn pending(&self) -> Vec<TaskKind> {
        self.queue.borrow().pending().map(|t| t.kind).collect()
    }

    pub fn queue_stats(&self) -> QueueStats {
        *self.queue.borrow().stats()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("components", &self.components().count())
            .field("free_slots", &self.free.len())
            .field("connected", &self.connection.is_connected())
            .field("pending_tasks", &self.pending_tasks())
            .field("delegated_events", &self.events.len())
            .field("config", &self.config)
            .finish()
    }
}
