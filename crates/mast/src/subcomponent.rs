//! Subcomponents
//!
//! A parent declares children as `key → { component, outlet }`. Children
//! are built when the parent is, but only mounted after the parent renders.

use crate::component::ComponentId;
use crate::definition::{ComponentOptions, ComponentType};
use crate::error::{ComponentError, Result};
use crate::identity::{provision_prototype, Identity};
use crate::model::Value;
use crate::outlet::Outlet;
use crate::runtime::Runtime;
use serde::Deserialize;

/// Which component a descriptor refers to
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "String")]
pub enum ComponentRef {
    /// Looked up in the registry
    Named(String),
    Type(ComponentType),
}

impl From<String> for ComponentRef {
    fn from(name: String) -> Self {
        ComponentRef::Named(name)
    }
}

impl From<&str> for ComponentRef {
    fn from(name: &str) -> Self {
        ComponentRef::Named(name.to_string())
    }
}

impl From<ComponentType> for ComponentRef {
    fn from(kind: ComponentType) -> Self {
        ComponentRef::Type(kind)
    }
}

/// `{ "component": "RowView", "outlet": "#rows" }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubcomponentDescriptor {
    #[serde(default)]
    pub component: Option<ComponentRef>,
    #[serde(default)]
    pub outlet: Option<Outlet>,
}

impl SubcomponentDescriptor {
    pub fn new(component: impl Into<ComponentRef>) -> Self {
        Self {
            component: Some(component.into()),
            outlet: None,
        }
    }

    pub fn with_outlet(mut self, outlet: impl Into<Outlet>) -> Self {
        self.outlet = Some(outlet.into());
        self
    }
}

/// Parse a JSON object of `key → descriptor`, keeping declaration order
pub fn parse_subcomponents(json: &str) -> Result<Vec<(String, SubcomponentDescriptor)>> {
    let map: serde_json::Map<String, Value> = serde_json::from_str(json)?;
    map.into_iter()
        .map(|(key, value)| Ok((key, serde_json::from_value(value)?)))
        .collect()
}

impl Runtime {
    /// Build a child of `parent` from `descriptor` and store it under `key`.
    ///
    /// The child is not mounted; the parent's next render schedules that.
    /// A child already stored under `key` is destroyed.
    pub fn register_subcomponent(
        &mut self,
        parent: ComponentId,
        descriptor: SubcomponentDescriptor,
        key: &str,
    ) -> Result<ComponentId> {
        self.live(parent)?;

        let identity = match descriptor.component {
            None => {
                return Err(ComponentError::MissingSubcomponentType { key: key.to_string() });
            }
            Some(ComponentRef::Named(name)) => {
                if !self.registry().components.contains(&name) {
                    return Err(ComponentError::UnregisteredSubcomponent {
                        key: key.to_string(),
                        name,
                    });
                }
                Identity::Name(name)
            }
            Some(ComponentRef::Type(kind)) => Identity::Type(kind),
        };
        let kind = provision_prototype(identity, &self.registry().components)?;

        let mut options = ComponentOptions::new().parent(parent);
        options.outlet = descriptor.outlet;
        let child = self.create(&kind, options)?;

        tracing::debug!("Registered subcomponent {} '{}' ({}) under {}", child, key, kind.name(), parent);
        let previous = self.component_mut(parent)?.insert_child(key.to_string(), child);
        if let Some(previous) = previous {
            tracing::debug!("Subcomponent '{}' of {} replaced, destroying {}", key, parent, previous);
            self.destroy(previous)?;
        }
        Ok(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcomponents_keeps_order() {
        let json = r##"{
            "zeta": { "component": "RowView", "outlet": "#rows" },
            "alpha": { "component": "Footer" },
            "broken": { "outlet": ".x" }
        }"##;
        let parsed = parse_subcomponents(json).unwrap();
        let keys: Vec<&str> = parsed.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["zeta", "alpha", "broken"]);

        assert!(matches!(&parsed[0].1.component, Some(ComponentRef::Named(n)) if n == "RowView"));
        assert_eq!(parsed[0].1.outlet, Some(Outlet::from("#rows")));
        assert!(parsed[1].1.outlet.is_none());
        assert!(parsed[2].1.component.is_none());
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(parse_subcomponents("[1, 2]").is_err());
        assert!(parse_subcomponents(r#"{ "a": 5 }"#).is_err());
    }
}
