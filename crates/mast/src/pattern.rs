//! Patterns
//!
//! A pattern joins a template with a model and produces markup. It also
//! reports when its output would change, either because the model changed
//! or because it was pointed at another template.

use crate::model::{Attributes, ModelChange, ModelHandle, SubscriptionId, Value};
use mast_dom::{Document, ElementQuery, Selector};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Pattern error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("template '{selector}' is not defined")]
    UnknownTemplate { selector: String },

    #[error("unclosed placeholder in template '{selector}'")]
    UnclosedPlaceholder { selector: String },
}

/// Template + model → markup
pub trait Pattern {
    /// Render markup from `data`
    fn generate(&self, data: &Attributes) -> Result<String, PatternError>;

    /// Current template selector
    fn template(&self) -> &str;

    /// Switch templates; listeners hear about it
    fn set_template(&mut self, selector: &str) -> Result<(), PatternError>;

    fn model(&self) -> &ModelHandle;

    /// Register interest in changes of the generated output
    fn on_change(&mut self, listener: Rc<dyn Fn()>) -> SubscriptionId;

    fn off_change(&mut self, id: SubscriptionId) -> bool;
}

/// Shared map of template selector → template source
#[derive(Clone, Default)]
pub struct TemplateStore {
    templates: Rc<RefCell<HashMap<String, Rc<str>>>>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or redefine) a template under `selector`, e.g. `#row-tpl`
    pub fn define(&self, selector: impl Into<String>, source: &str) {
        self.templates.borrow_mut().insert(selector.into(), Rc::from(source));
    }

    pub fn get(&self, selector: &str) -> Option<Rc<str>> {
        self.templates.borrow().get(selector).cloned()
    }

    pub fn contains(&self, selector: &str) -> bool {
        self.templates.borrow().contains_key(selector)
    }

    pub fn len(&self) -> usize {
        self.templates.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.borrow().is_empty()
    }

    /// Collect `<script type="text/template" id="...">` elements from a
    /// document, keyed `#id`. Returns how many were found.
    pub fn harvest(&self, document: &Document) -> usize {
        let tree = document.tree();
        let Ok(scripts) = Selector::parse("script[type=\"text/template\"]") else {
            return 0;
        };

        let mut found = 0;
        for node in tree.query_selector_all(tree.root(), &scripts) {
            let Some(id) = tree.element(node).and_then(|e| e.id.clone()) else {
                tracing::warn!("Skipping template script without an id ({})", node);
                continue;
            };
            let source = tree.text_content(node);
            self.define(format!("#{id}"), source.trim());
            found += 1;
        }
        tracing::debug!("Harvested {} templates", found);
        found
    }
}

impl fmt::Debug for TemplateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let templates = self.templates.borrow();
        let mut names: Vec<&str> = templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_set().entries(names).finish()
    }
}

struct Listener {
    id: SubscriptionId,
    callback: Rc<dyn Fn()>,
    model_subscription: SubscriptionId,
}

/// Default pattern: `{{key}}` placeholders filled from the model, HTML-escaped
pub struct TemplatePattern {
    templates: TemplateStore,
    template: String,
    model: ModelHandle,
    listeners: Vec<Listener>,
    next_subscription: u64,
}

impl TemplatePattern {
    pub fn new(templates: TemplateStore, selector: &str, model: ModelHandle) -> Result<Self, PatternError> {
        if !templates.contains(selector) {
            return Err(PatternError::UnknownTemplate {
                selector: selector.to_string(),
            });
        }
        Ok(Self {
            templates,
            template: selector.to_string(),
            model,
            listeners: Vec::new(),
            next_subscription: 0,
        })
    }
}

impl Pattern for TemplatePattern {
    fn generate(&self, data: &Attributes) -> Result<String, PatternError> {
        let source = self
            .templates
            .get(&self.template)
            .ok_or_else(|| PatternError::UnknownTemplate {
                selector: self.template.clone(),
            })?;
        interpolate(&self.template, &source, data)
    }

    fn template(&self) -> &str {
        &self.template
    }

    fn set_template(&mut self, selector: &str) -> Result<(), PatternError> {
        if !self.templates.contains(selector) {
            return Err(PatternError::UnknownTemplate {
                selector: selector.to_string(),
            });
        }
        if self.template == selector {
            return Ok(());
        }

        self.template = selector.to_string();
        for listener in &self.listeners {
            (listener.callback)();
        }
        Ok(())
    }

    fn model(&self) -> &ModelHandle {
        &self.model
    }

    fn on_change(&mut self, listener: Rc<dyn Fn()>) -> SubscriptionId {
        let forward = listener.clone();
        let model_subscription = self
            .model
            .borrow_mut()
            .subscribe(Rc::new(move |_: &ModelChange| forward()));

        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push(Listener {
            id,
            callback: listener,
            model_subscription,
        });
        id
    }

    fn off_change(&mut self, id: SubscriptionId) -> bool {
        let Some(pos) = self.listeners.iter().position(|l| l.id == id) else {
            return false;
        };
        let listener = self.listeners.remove(pos);
        self.model.borrow_mut().unsubscribe(listener.model_subscription);
        true
    }
}

impl fmt::Debug for TemplatePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplatePattern")
            .field("template", &self.template)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn interpolate(selector: &str, source: &str, data: &Attributes) -> Result<String, PatternError> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| PatternError::UnclosedPlaceholder {
            selector: selector.to_string(),
        })?;

        match data.get(after[..end].trim()) {
            Some(Value::String(s)) => escape_into(s, &mut out),
            Some(Value::Null) | None => {}
            Some(other) => escape_into(&other.to_string(), &mut out),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}
