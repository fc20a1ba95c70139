//! Identity provisioning
//!
//! Models and components can be referred to in four ways: by their type,
//! by a registered name, by a bag of attributes or as an already built
//! instance. The provisioner turns any of these into something usable.

use crate::error::ComponentError;
use crate::model::{Attributes, Value};
use std::collections::HashMap;
use std::fmt;

/// A type that can build instances of itself ("class" in the loose sense)
pub trait Prototype: Clone {
    type Instance;
    type Error: fmt::Display;
    /// Whatever the type needs in order to build an instance
    type Context: ?Sized;

    /// Name used in catalogs and diagnostics
    fn name(&self) -> &str;

    /// Build an instance from an attribute bag
    fn instantiate(&self, cx: &mut Self::Context, attributes: Attributes) -> Result<Self::Instance, Self::Error>;

    /// Build an instance that was asked for by type or name alone.
    ///
    /// Such instances must not attach themselves anywhere on construction.
    fn instantiate_inert(&self, cx: &mut Self::Context) -> Result<Self::Instance, Self::Error> {
        self.instantiate(cx, Attributes::new())
    }
}

/// The four ways to refer to something provisionable
#[derive(Clone)]
pub enum Identity<P, I> {
    Type(P),
    Name(String),
    Attributes(Attributes),
    Instance(I),
}

impl<P: Prototype, I> Identity<P, I> {
    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            Identity::Type(p) => format!("type {}", p.name()),
            Identity::Name(name) => format!("name {name}"),
            Identity::Attributes(bag) => Value::Object(bag.clone()).to_string(),
            Identity::Instance(_) => "existing instance".to_string(),
        }
    }
}

impl<P: Prototype, I> fmt::Debug for Identity<P, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Type(p) => f.debug_tuple("Type").field(&p.name()).finish(),
            Identity::Name(name) => f.debug_tuple("Name").field(name).finish(),
            Identity::Attributes(bag) => f.debug_tuple("Attributes").field(bag).finish(),
            Identity::Instance(_) => f.write_str("Instance(..)"),
        }
    }
}

impl<P, I> From<&str> for Identity<P, I> {
    fn from(name: &str) -> Self {
        Identity::Name(name.to_string())
    }
}

impl<P, I> From<String> for Identity<P, I> {
    fn from(name: String) -> Self {
        Identity::Name(name)
    }
}

impl<P, I> From<Attributes> for Identity<P, I> {
    fn from(bag: Attributes) -> Self {
        Identity::Attributes(bag)
    }
}

/// Outcome of [`provision_instance`]
#[derive(Debug, Clone)]
pub enum Provisioned<I> {
    Instance(I),
    /// Construction from an attribute bag failed; the bag comes back as-is
    Unconstructed(Attributes),
}

impl<I> Provisioned<I> {
    pub fn into_instance(self) -> Option<I> {
        match self {
            Provisioned::Instance(instance) => Some(instance),
            Provisioned::Unconstructed(_) => None,
        }
    }

    pub fn is_instance(&self) -> bool {
        matches!(self, Provisioned::Instance(_))
    }
}

/// Name → prototype lookup table
#[derive(Clone)]
pub struct Catalog<P> {
    entries: HashMap<String, P>,
}

impl<P: Prototype> Catalog<P> {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Register under the prototype's own name, returning any entry it displaced
    pub fn register(&mut self, prototype: P) -> Option<P> {
        self.entries.insert(prototype.name().to_string(), prototype)
    }

    /// Register under an explicit name
    pub fn insert(&mut self, name: impl Into<String>, prototype: P) -> Option<P> {
        self.entries.insert(name.into(), prototype)
    }

    pub fn get(&self, name: &str) -> Option<&P> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P: Prototype> Default for Catalog<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Prototype> fmt::Debug for Catalog<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Turn any identity into an instance.
///
/// - `Type`: instantiated without attributes
/// - `Name`: looked up in `catalog` and instantiated; unknown names fail
/// - `Attributes`: handed to `default`; a failure is logged and the bag is
///   returned unconstructed
/// - `Instance`: returned unchanged
pub fn provision_instance<P>(
    identity: Identity<P, P::Instance>,
    catalog: &Catalog<P>,
    default: &P,
    cx: &mut P::Context,
) -> Result<Provisioned<P::Instance>, ComponentError>
where
    P: Prototype,
    ComponentError: From<P::Error>,
{
    match identity {
        Identity::Type(prototype) => Ok(Provisioned::Instance(prototype.instantiate_inert(cx)?)),
        Identity::Name(name) => {
            let prototype = catalog
                .get(&name)
                .ok_or(ComponentError::UnknownIdentity { name: name.clone() })?;
            Ok(Provisioned::Instance(prototype.instantiate_inert(cx)?))
        }
        Identity::Attributes(bag) => match default.instantiate(cx, bag.clone()) {
            Ok(instance) => Ok(Provisioned::Instance(instance)),
            Err(err) => {
                tracing::error!("Invalid identity definition for {}: {}", default.name(), err);
                Ok(Provisioned::Unconstructed(bag))
            }
        },
        Identity::Instance(instance) => Ok(Provisioned::Instance(instance)),
    }
}

/// Turn a type or a name into a prototype; anything else is an error
pub fn provision_prototype<P: Prototype>(
    identity: Identity<P, P::Instance>,
    catalog: &Catalog<P>,
) -> Result<P, ComponentError> {
    match identity {
        Identity::Type(prototype) => Ok(prototype),
        Identity::Name(name) => catalog
            .get(&name)
            .cloned()
            .ok_or(ComponentError::UnknownIdentity { name }),
        other => Err(ComponentError::InvalidIdentity {
            identity: other.describe(),
        }),
    }
}
