//! Models
//!
//! A model is a bag of JSON attributes with change notification. The
//! engine only needs `get`, `set`, `attributes` and a way to hear about
//! changes; `Store` is the stock implementation and `ModelType` is the
//! prototype the identity provisioner instantiates.

use crate::identity::{Identity, Prototype};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Attribute value
pub type Value = serde_json::Value;

/// Attribute bag
pub type Attributes = serde_json::Map<String, Value>;

/// Shared, mutable model
pub type ModelHandle = Rc<RefCell<dyn Model>>;

/// Anything that can produce a model for a component
pub type ModelIdentity = Identity<ModelType, ModelHandle>;

/// Called after an attribute actually changed.
///
/// Listeners run while the model is mutably borrowed and must not touch it.
pub type ChangeListener = Rc<dyn Fn(&ModelChange)>;

/// Subscription handle returned by `subscribe`/`on_change`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// A single attribute change
#[derive(Debug, Clone, PartialEq)]
pub struct ModelChange {
    pub key: String,
    pub previous: Option<Value>,
    pub current: Value,
}

/// Model error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("invalid attributes for model '{model}': {reason}")]
    Invalid { model: String, reason: String },
}

/// Data model consumed by patterns
pub trait Model {
    /// Read one attribute
    fn get(&self, key: &str) -> Option<&Value>;

    /// Write one attribute, returning the previous value.
    ///
    /// Listeners are notified only when the value changed.
    fn set(&mut self, key: &str, value: Value) -> Option<Value>;

    /// All attributes
    fn attributes(&self) -> &Attributes;

    fn subscribe(&mut self, listener: ChangeListener) -> SubscriptionId;

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;
}

/// Key/value model with change listeners
#[derive(Default)]
pub struct Store {
    attributes: Attributes,
    listeners: Vec<(SubscriptionId, ChangeListener)>,
    next_subscription: u64,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attributes(attributes: Attributes) -> Self {
        Self {
            attributes,
            ..Self::default()
        }
    }

    /// Wrap into a shareable handle
    pub fn into_handle(self) -> ModelHandle {
        Rc::new(RefCell::new(self))
    }

    /// Number of live subscriptions
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Model for Store {
    fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Option<Value> {
        if self.attributes.get(key) == Some(&value) {
            return Some(value);
        }

        let previous = self.attributes.insert(key.to_string(), value.clone());
        let change = ModelChange {
            key: key.to_string(),
            previous: previous.clone(),
            current: value,
        };
        for (_, listener) in &self.listeners {
            listener(&change);
        }
        previous
    }

    fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    fn subscribe(&mut self, listener: ChangeListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, listener));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("attributes", &self.attributes)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

type Validator = Rc<dyn Fn(&Attributes) -> Result<(), String>>;

/// Model prototype: defaults plus an optional construction check
#[derive(Clone)]
pub struct ModelType {
    name: String,
    defaults: Attributes,
    validate: Option<Validator>,
}

impl ModelType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            defaults: Attributes::new(),
            validate: None,
        }
    }

    /// The plain model used when nothing more specific is declared
    pub fn base() -> Self {
        Self::new("Model")
    }

    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    /// Reject attribute bags at construction time
    pub fn with_validation<F>(mut self, check: F) -> Self
    where
        F: Fn(&Attributes) -> Result<(), String> + 'static,
    {
        self.validate = Some(Rc::new(check));
        self
    }

    pub fn defaults(&self) -> &Attributes {
        &self.defaults
    }
}

impl Prototype for ModelType {
    type Instance = ModelHandle;
    type Error = ModelError;
    type Context = ();

    fn name(&self) -> &str {
        &self.name
    }

    fn instantiate(&self, _cx: &mut (), attributes: Attributes) -> Result<ModelHandle, ModelError> {
        let mut merged = self.defaults.clone();
        merged.extend(attributes);

        if let Some(check) = &self.validate {
            check(&merged).map_err(|reason| ModelError::Invalid {
                model: self.name.clone(),
                reason,
            })?;
        }
        Ok(Store::with_attributes(merged).into_handle())
    }
}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("name", &self.name)
            .field("defaults", &self.defaults)
            .field("validated", &self.validate.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn test_set_notifies_only_on_change() {
        let mut store = Store::new();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        store.subscribe(Rc::new(move |_| counter.set(counter.get() + 1)));

        assert_eq!(store.set("title", json!("a")), None);
        assert_eq!(store.set("title", json!("a")), Some(json!("a")));
        assert_eq!(store.set("title", json!("b")), Some(json!("a")));
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let mut store = Store::new();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let sub = store.subscribe(Rc::new(move |_| counter.set(counter.get() + 1)));

        assert!(store.unsubscribe(sub));
        assert!(!store.unsubscribe(sub));
        store.set("x", json!(1));
        assert_eq!(hits.get(), 0);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_model_type_defaults_and_validation() {
        let kind = ModelType::new("Todo")
            .with_default("done", false)
            .with_validation(|attrs| match attrs.get("title") {
                Some(Value::String(_)) => Ok(()),
                _ => Err("title is required".to_string()),
            });

        let mut bag = Attributes::new();
        bag.insert("title".to_string(), json!("write tests"));
        let model = kind.instantiate(&mut (), bag).unwrap();
        assert_eq!(model.borrow().get("done"), Some(&json!(false)));

        let err = kind.instantiate(&mut (), Attributes::new()).err().unwrap();
        assert_eq!(
            err,
            ModelError::Invalid {
                model: "Todo".to_string(),
                reason: "title is required".to_string()
            }
        );
    }
}
