//! Application registry: the named components, models and templates a
//! runtime resolves identities against.

use crate::definition::ComponentType;
use crate::identity::Catalog;
use crate::model::ModelType;
use crate::pattern::TemplateStore;

/// Named components, models and templates
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub components: Catalog<ComponentType>,
    pub models: Catalog<ModelType>,
    pub templates: TemplateStore,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type under its own name
    pub fn register_component(&mut self, kind: ComponentType) -> &mut Self {
        if let Some(previous) = self.components.register(kind) {
            tracing::warn!("Component '{}' registered twice; keeping the newer one", previous.name());
        }
        self
    }

    /// Register a model type under its own name
    pub fn register_model(&mut self, kind: ModelType) -> &mut Self {
        self.models.register(kind);
        self
    }

    pub fn define_template(&mut self, selector: impl Into<String>, source: &str) -> &mut Self {
        self.templates.define(selector, source);
        self
    }
}
