//! Example: a small todo list built from nested components

use mast::dom::{DomEvent, EventType};
use mast::{
    ComponentHooks, ComponentOptions, ComponentType, Context, LocalConnection, ModelType, Registry,
    Runtime, SubcomponentDescriptor,
};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

const PAGE: &str = r#"<html><head>
<script type="text/template" id="app-tpl">
  <section class="todos"><h1>{{heading}}</h1><ul id="items"></ul><footer id="status"></footer></section>
</script>
<script type="text/template" id="item-tpl">
  <li class="item"><span class="title">{{title}}</span><button class="remove">x</button></li>
</script>
<script type="text/template" id="status-tpl">
  <p class="status">{{state}}</p>
</script>
</head><body><div id="app"></div></body></html>"#;

struct Item;

impl ComponentHooks for Item {
    fn on_event(&mut self, handler: &str, _event: &DomEvent, cx: &mut Context<'_>) {
        if handler == "remove" {
            let id = cx.id();
            if let Err(err) = cx.runtime().destroy(id) {
                tracing::error!("Could not remove {}: {}", id, err);
            }
        }
    }
}

struct Status;

impl ComponentHooks for Status {
    fn after_connect(&mut self, cx: &mut Context<'_>) {
        if let Err(err) = cx.set("state", "online") {
            tracing::error!("Could not update status: {}", err);
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let document = mast::html::parse_document(PAGE)?;
    let mut registry = Registry::new();
    let harvested = registry.templates.harvest(&document);
    println!("Mast v{} found {} templates", mast::VERSION, harvested);

    registry.register_model(ModelType::new("Status").with_default("state", "offline"));
    registry.register_component(
        ComponentType::builder("Item")
            .template("#item-tpl")
            .event("click .remove", "remove")
            .hooks(|| Item)
            .build()?,
    );
    registry.register_component(
        ComponentType::builder("Status")
            .template("#status-tpl")
            .model("Status")
            .hooks(|| Status)
            .build()?,
    );

    let app = ComponentType::builder("TodoApp")
        .template("#app-tpl")
        .outlet("#app")
        .subcomponents(mast::parse_subcomponents(
            r##"{
                "first": { "component": "Item", "outlet": "#items" },
                "second": { "component": "Item", "outlet": "#items" },
                "status": { "component": "Status", "outlet": "#status" }
            }"##,
        )?)
        .build()?;

    let connection = Rc::new(LocalConnection::new());
    let mut runtime = Runtime::new(document, registry, connection.clone());

    let root = runtime.create(&app, ComponentOptions::new())?;
    runtime.set(root, "heading", "Things to do".into())?;
    let first = runtime.component(root).and_then(|c| c.child("first"));
    let second = runtime.component(root).and_then(|c| c.child("second"));
    if let (Some(first), Some(second)) = (first, second) {
        runtime.set(first, "title", "write the docs".into())?;
        runtime.set(second, "title", "ship it".into())?;
    }

    let report = runtime.run_until_idle();
    println!("Mounted in {} turns: {}", report.turns, runtime.document().body_html());

    connection.connect();
    runtime.run_until_idle();
    println!("After connect: {}", runtime.document().body_html());

    if let Some(button) = runtime.document().find(None, ".remove")?.first().copied() {
        runtime.trigger(button, EventType::Click);
    }
    runtime.run_until_idle();
    println!("After remove: {}", runtime.document().body_html());

    Ok(())
}
