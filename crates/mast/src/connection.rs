//! Real-time connection signal
//!
//! Components run `after_connect` once the application's connection is
//! live. The engine only needs to ask whether it is live and to be told
//! when it becomes so.

use crate::component::ComponentId;
use crate::error::Result;
use crate::runtime::{Notification, Runtime};
use crate::scheduler::TaskKind;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Called when the connection comes up
pub type ConnectHandler = Rc<dyn Fn()>;

/// Connection state source
pub trait Connection {
    fn is_connected(&self) -> bool;

    /// Subscribe `handler` under `key`, replacing any previous handler for it.
    ///
    /// The runtime's handlers only queue an `AfterConnect` task; the hook
    /// runs on the next [`Runtime::tick`] or [`Runtime::run_until_idle`].
    fn on_connect(&self, key: ComponentId, handler: ConnectHandler);

    /// Drop the subscription for `key`
    fn off_connect(&self, key: ComponentId) -> bool;
}

/// In-process connection toggled by the application
#[derive(Default)]
pub struct LocalConnection {
    connected: Cell<bool>,
    handlers: RefCell<Vec<(ComponentId, ConnectHandler)>>,
}

impl LocalConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection that is already live
    pub fn connected() -> Self {
        let connection = Self::new();
        connection.connected.set(true);
        connection
    }

    /// Mark the connection live and notify subscribers.
    ///
    /// Returns how many handlers ran; reconnecting notifies again.
    /// Components waiting on the connection do not run `after_connect`
    /// here: their tasks are queued, so drain the runtime's queue
    /// afterwards.
    pub fn connect(&self) -> usize {
        self.connected.set(true);
        let handlers: Vec<ConnectHandler> = self.handlers.borrow().iter().map(|(_, h)| h.clone()).collect();
        tracing::debug!("Connection live, notifying {} subscribers", handlers.len());
        for handler in &handlers {
            handler();
        }
        handlers.len()
    }

    pub fn disconnect(&self) {
        self.connected.set(false);
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}

impl Connection for LocalConnection {
    fn is_connected(&self) -> bool {
        self.connected.get()
    }

    fn on_connect(&self, key: ComponentId, handler: ConnectHandler) {
        let mut handlers = self.handlers.borrow_mut();
        handlers.retain(|(k, _)| *k != key);
        handlers.push((key, handler));
    }

    fn off_connect(&self, key: ComponentId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(k, _)| *k != key);
        handlers.len() != before
    }
}

impl fmt::Debug for LocalConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalConnection")
            .field("connected", &self.connected.get())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl Runtime {
    /// Hook `id` up to the connection.
    ///
    /// Any earlier subscription for `id` is dropped first. A live
    /// connection runs `after_connect` right away; otherwise it is queued
    /// for when the connection reports in.
    pub fn arm_connection(&mut self, id: ComponentId) -> Result<()> {
        self.live(id)?;
        self.connection.off_connect(id);

        if self.connection.is_connected() {
            self.after_connect(id);
        } else {
            let queue = Rc::downgrade(&self.queue);
            self.connection.on_connect(
                id,
                Rc::new(move || {
                    if let Some(queue) = queue.upgrade() {
                        queue.borrow_mut().schedule(TaskKind::AfterConnect(id));
                    }
                }),
            );
        }
        Ok(())
    }

    pub(crate) fn after_connect(&mut self, id: ComponentId) {
        tracing::debug!("{} connected", id);
        self.with_hooks(id, |hooks, cx| hooks.after_connect(cx));
        self.notify(id, Notification::AfterConnect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mast_dom::Generation;

    #[test]
    fn test_connect_notifies_subscribers() {
        let connection = LocalConnection::new();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        connection.on_connect(ComponentId::new(1, Generation::INITIAL), Rc::new(move || counter.set(counter.get() + 1)));

        assert!(!connection.is_connected());
        assert_eq!(connection.connect(), 1);
        assert!(connection.is_connected());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_resubscribe_replaces() {
        let connection = LocalConnection::new();
        connection.on_connect(ComponentId::new(1, Generation::INITIAL), Rc::new(|| {}));
        connection.on_connect(ComponentId::new(1, Generation::INITIAL), Rc::new(|| {}));
        assert_eq!(connection.subscriber_count(), 1);

        assert!(connection.off_connect(ComponentId::new(1, Generation::INITIAL)));
        assert!(!connection.off_connect(ComponentId::new(1, Generation::INITIAL)));
        assert_eq!(connection.connect(), 0);
    }
}
