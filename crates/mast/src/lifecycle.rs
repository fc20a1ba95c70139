//! Mounting, rendering and destruction

use crate::component::{ComponentId, LifecycleState};
use crate::config::DestroyPolicy;
use crate::error::{ComponentError, Result};
use crate::model::Attributes;
use crate::outlet::{resolve_outlet, Outlet};
use crate::runtime::{Notification, Runtime};
use crate::scheduler::TaskKind;
use mast_dom::NodeId;

impl Runtime {
    /// Render and append into the outlet.
    ///
    /// Selector outlets are searched inside the parent's element when the
    /// component has a parent; with no outlet at all the parent's element
    /// itself is used.
    pub fn append(&mut self, id: ComponentId, outlet: Option<Outlet>) -> Result<()> {
        let target = {
            let component = self.live(id)?;
            let parent_element = self.parent_element(component.parent);
            resolve_outlet(
                &self.document,
                outlet.as_ref(),
                component.outlet.as_ref(),
                parent_element,
                parent_element,
            )?
        };

        self.render(id, false)?;
        let element = self.live(id)?.element;
        self.document.tree_mut().append_child(target, element)?;
        self.component_mut(id)?.state = LifecycleState::Mounted;
        tracing::debug!("Appended {} into {}", id, target);
        Ok(())
    }

    /// Take the outlet's place: adopt it as the element, then render over it
    pub fn replace(&mut self, id: ComponentId, outlet: Option<Outlet>) -> Result<()> {
        let target = {
            let component = self.live(id)?;
            let parent_element = self.parent_element(component.parent);
            resolve_outlet(&self.document, outlet.as_ref(), component.outlet.as_ref(), parent_element, None)?
        };

        let previous = std::mem::replace(&mut self.component_mut(id)?.element, target);
        if previous != target && !self.document.tree().is_connected(previous) {
            self.document.tree_mut().remove(previous);
        }

        self.render(id, false)?;
        self.component_mut(id)?.state = LifecycleState::Mounted;
        tracing::debug!("Replaced outlet {} with {}", target, id);
        Ok(())
    }

    /// Regenerate the element and swap it in where the old one was.
    ///
    /// Children are re-appended on the next turn. Unless `silent`, the
    /// after-render hook runs and observers hear `AfterRender` once.
    pub fn render(&mut self, id: ComponentId, silent: bool) -> Result<()> {
        let fresh = self.generate(id, None)?;
        let old = self.live(id)?.element;

        let tree = self.document.tree_mut();
        tree.replace_with(old, fresh)?;
        if old != fresh {
            tree.remove(old);
        }

        let children: Vec<ComponentId> = {
            let component = self.component_mut(id)?;
            component.element = fresh;
            component.children.iter().map(|(_, child)| *child).collect()
        };
        self.bind_events(id)?;

        {
            let mut queue = self.queue.borrow_mut();
            for child in children {
                queue.schedule(TaskKind::MountChild { parent: id, child });
            }
        }

        tracing::debug!("Rendered {} as {}", id, fresh);
        if !silent {
            self.with_hooks(id, |hooks, cx| hooks.after_render(cx));
            self.notify(id, Notification::AfterRender);
        }
        Ok(())
    }

    /// Produce a fresh, detached element from the pattern.
    ///
    /// `data` defaults to the pattern model's attributes. Whitespace-only
    /// output is replaced with `Config::empty_html`.
    pub fn generate(&mut self, id: ComponentId, data: Option<&Attributes>) -> Result<NodeId> {
        let markup = {
            let component = self.live(id)?;
            match data {
                Some(data) => component.pattern.generate(data)?,
                None => {
                    let attributes = component.pattern.model().borrow().attributes().clone();
                    component.pattern.generate(&attributes)?
                }
            }
        };

        let markup = if markup.trim().is_empty() {
            self.config.empty_html.clone()
        } else {
            markup
        };
        Ok(mast_html::parse_element(self.document.tree_mut(), &markup)?)
    }

    /// Destroy with the configured policy
    pub fn destroy(&mut self, id: ComponentId) -> Result<()> {
        self.destroy_with(id, self.config.destroy_policy)
    }

    /// Tear a component down.
    ///
    /// Pending tasks are cancelled, delegated events unbound, the element
    /// removed and every subscription dropped. The component itself
    /// (pattern, model handle, hooks) is dropped and its slot freed.
    /// Destroying an unmounted component is fine; destroying twice does
    /// nothing.
    pub fn destroy_with(&mut self, id: ComponentId, policy: DestroyPolicy) -> Result<()> {
        let (children, parent, element) = match self.live(id) {
            Ok(component) => (
                component.children.iter().map(|(_, child)| *child).collect::<Vec<_>>(),
                component.parent,
                component.element,
            ),
            Err(ComponentError::Destroyed(_)) => return Ok(()),
            Err(err) => return Err(err),
        };
        tracing::debug!("Destroying {} ({:?}, {} children)", id, policy, children.len());

        match policy {
            DestroyPolicy::Cascade => {
                for child in children {
                    self.destroy_with(child, DestroyPolicy::Cascade)?;
                }
            }
            DestroyPolicy::Detach => {
                let cancelled = self.queue.borrow_mut().cancel_mounts_from(id);
                tracing::debug!("Cancelled {} pending child mounts of {}", cancelled, id);
                for child in children {
                    self.orphan(child, element)?;
                }
            }
        }

        self.queue.borrow_mut().cancel_for(id);
        self.events.unbind_owner(id);
        self.document.tree_mut().remove(element);
        self.connection.off_connect(id);

        if let Some(mut component) = self.release(id) {
            if let Some(subscription) = component.pattern_subscription.take() {
                component.pattern.off_change(subscription);
            }
        }

        if let Some(parent) = parent {
            if let Ok(parent) = self.component_mut(parent) {
                parent.remove_child(id);
            }
        }
        self.notify(id, Notification::Destroyed);
        Ok(())
    }

    /// Cut a child loose from a parent that is going away
    fn orphan(&mut self, child: ComponentId, parent_element: NodeId) -> Result<()> {
        let element = {
            let component = self.component_mut(child)?;
            component.parent = None;
            component.element
        };

        let tree = self.document.tree_mut();
        if tree.is_ancestor(parent_element, element) {
            tree.detach(element)?;
            self.component_mut(child)?.state = LifecycleState::Unmounted;
        }
        tracing::debug!("Orphaned {}", child);
        Ok(())
    }

    /// Rebind the type's delegated events on the current element
    pub(crate) fn bind_events(&mut self, id: ComponentId) -> Result<()> {
        let (kind, element) = {
            let component = self.live(id)?;
            (component.kind.clone(), component.element)
        };

        self.events.unbind_owner(id);
        for binding in kind.events() {
            self.events.bind(
                element,
                id,
                binding.event_type.clone(),
                binding.selector.clone(),
                binding.handler.clone(),
            );
        }
        Ok(())
    }

    fn parent_element(&self, parent: Option<ComponentId>) -> Option<NodeId> {
        parent
            .and_then(|p| self.live(p).ok())
            .map(|p| p.element)
    }
}
