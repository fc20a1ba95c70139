//! Mount, render, destroy and scheduling behaviour

use mast::dom::NodeId;
use mast::{
    ComponentError, ComponentHooks, ComponentId, ComponentOptions, ComponentType, Config, Context,
    DestroyPolicy, Identity, LifecycleState, LocalConnection, ModelIdentity, Notification, Registry,
    Runtime, Store, SubcomponentDescriptor, TaskKind,
};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .define_template("#parent", "<section class=\"parent\"><ul id=\"rows\"></ul></section>")
        .define_template("#row", "<li class=\"row\">{{title}}</li>")
        .define_template("#alt", "<li class=\"alt\">{{title}}!</li>")
        .define_template("#blank", "  \n ")
        .define_template("#twins", "<li></li><li></li>");
    registry.register_component(ComponentType::builder("RowView").template("#row").build().unwrap());
    registry
}

fn runtime_with(registry: Registry, connection: Rc<LocalConnection>) -> Runtime {
    let document = mast::html::parse_document("<html><body><div id=\"app\"></div></body></html>").unwrap();
    Runtime::new(document, registry, connection)
}

fn runtime() -> Runtime {
    runtime_with(registry(), Rc::new(LocalConnection::new()))
}

fn parent_type() -> ComponentType {
    ComponentType::builder("Parent")
        .template("#parent")
        .outlet("#app")
        .subcomponent("rows", SubcomponentDescriptor::new("RowView").with_outlet("#rows"))
        .build()
        .unwrap()
}

fn count(runtime: &mut Runtime, id: ComponentId, wanted: Notification) -> Rc<Cell<usize>> {
    let hits = Rc::new(Cell::new(0));
    let counter = hits.clone();
    runtime
        .observe(
            id,
            Rc::new(move |_, notification| {
                if notification == wanted {
                    counter.set(counter.get() + 1);
                }
            }),
        )
        .unwrap();
    hits
}

#[derive(Clone, Default)]
struct Log(Rc<RefCell<Vec<String>>>);

impl Log {
    fn push(&self, entry: String) {
        self.0.borrow_mut().push(entry);
    }

    fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

struct Recorder {
    log: Log,
}

impl ComponentHooks for Recorder {
    fn init(&mut self, cx: &mut Context<'_>) {
        self.log.push(format!("init {}", cx.id()));
    }

    fn after_render(&mut self, cx: &mut Context<'_>) {
        self.log.push(format!("after_render {}", cx.id()));
    }

    fn after_connect(&mut self, cx: &mut Context<'_>) {
        self.log.push(format!("after_connect {}", cx.id()));
    }
}

fn recorded(log: &Log) -> ComponentType {
    let log = log.clone();
    ComponentType::builder("Recorded")
        .template("#row")
        .outlet("#app")
        .hooks(move || Recorder { log: log.clone() })
        .build()
        .unwrap()
}

#[test]
fn test_missing_outlet_fails_and_rolls_back() {
    let mut rt = runtime();
    let kind = ComponentType::builder("List").template("#row").outlet("#list").build().unwrap();

    let err = rt.create(&kind, ComponentOptions::new()).unwrap_err();
    assert_eq!(err.to_string(), "no elements exist for outlet selector '#list'");
    assert_eq!(rt.components().count(), 0);
    assert_eq!(rt.document().body_html(), "<div id=\"app\"></div>");
}

#[test]
fn test_no_outlet_without_parent() {
    let mut rt = runtime();
    let kind = ComponentType::builder("Floating").template("#row").build().unwrap();
    let err = rt.create(&kind, ComponentOptions::new()).unwrap_err();
    assert!(matches!(err, ComponentError::NoOutlet));

    let id = rt.create(&kind, ComponentOptions::new().autorender(false)).unwrap();
    assert_eq!(rt.state(id), Some(LifecycleState::Unmounted));
}

#[test]
fn test_child_mounts_on_later_turn() {
    let mut rt = runtime();
    let parent = rt.create(&parent_type(), ComponentOptions::new()).unwrap();
    let child = rt.component(parent).unwrap().child("rows").unwrap();

    assert_eq!(rt.state(parent), Some(LifecycleState::Mounted));
    assert_eq!(rt.state(child), Some(LifecycleState::Unmounted));
    assert_eq!(rt.component(child).unwrap().parent(), Some(parent));
    assert_eq!(rt.pending(), vec![TaskKind::MountChild { parent, child }]);
    assert_eq!(
        rt.document().body_html(),
        "<div id=\"app\"><section class=\"parent\"><ul id=\"rows\"></ul></section></div>"
    );

    let report = rt.tick();
    assert!(report.is_clean());
    assert_eq!(report.ran, 1);
    assert_eq!(rt.state(child), Some(LifecycleState::Mounted));
    assert_eq!(
        rt.document().body_html(),
        "<div id=\"app\"><section class=\"parent\"><ul id=\"rows\"><li class=\"row\"></li></ul></section></div>"
    );
}

#[test]
fn test_rerender_swaps_in_place_and_remounts_children() {
    let mut rt = runtime();
    let parent = rt.create(&parent_type(), ComponentOptions::new()).unwrap();
    rt.run_until_idle();

    let before = rt.element(parent).unwrap();
    rt.render(parent, false).unwrap();
    let after = rt.element(parent).unwrap();
    assert_ne!(before, after);
    assert!(!rt.document().tree().contains(before));
    assert!(rt.document().tree().is_connected(after));

    rt.run_until_idle();
    assert_eq!(rt.document().find(None, "li.row").unwrap().len(), 1);
    assert_eq!(rt.document().find(None, "section").unwrap(), vec![after]);
}

#[test]
fn test_after_render_fires_once_unless_silent() {
    let mut rt = runtime();
    let kind = ComponentType::builder("Row").template("#row").outlet("#app").build().unwrap();
    let id = rt.create(&kind, ComponentOptions::new()).unwrap();
    let renders = count(&mut rt, id, Notification::AfterRender);

    rt.render(id, false).unwrap();
    assert_eq!(renders.get(), 1);
    rt.render(id, true).unwrap();
    assert_eq!(renders.get(), 1);
}

#[test]
fn test_replace_takes_outlet_position() {
    let mut rt = runtime();
    let kind = ComponentType::builder("Row")
        .template("#row")
        .outlet("#app")
        .replace_outlet(true)
        .build()
        .unwrap();
    let app = rt.document().get_element_by_id("app").unwrap();

    let id = rt.create(&kind, ComponentOptions::new()).unwrap();
    assert_eq!(rt.state(id), Some(LifecycleState::Mounted));
    assert!(!rt.document().tree().contains(app));
    assert_eq!(rt.document().body_html(), "<li class=\"row\"></li>");
}

#[test]
fn test_whitespace_markup_uses_empty_html() {
    let mut rt = runtime();
    let kind = ComponentType::builder("Blank").template("#blank").outlet("#app").build().unwrap();
    rt.create(&kind, ComponentOptions::new()).unwrap();
    assert_eq!(
        rt.document().body_html(),
        "<div id=\"app\"><span>There are no rows available.</span></div>"
    );
}

#[test]
fn test_multiple_roots_is_an_error() {
    let mut rt = runtime();
    let kind = ComponentType::builder("Twins").template("#twins").outlet("#app").build().unwrap();
    let err = rt.create(&kind, ComponentOptions::new()).unwrap_err();
    assert!(matches!(err, ComponentError::Markup(mast::html::MarkupError::MultipleRoots { count: 2 })));
}

#[test]
fn test_generate_with_explicit_data() {
    let mut rt = runtime();
    let kind = ComponentType::builder("Row").template("#row").build().unwrap();
    let id = rt.create(&kind, ComponentOptions::new().autorender(false)).unwrap();

    let mut data = mast::Attributes::new();
    data.insert("title".to_string(), json!("preview"));
    let node = rt.generate(id, Some(&data)).unwrap();
    assert_eq!(rt.document().tree().to_html(node), "<li class=\"row\">preview</li>");
    assert!(!rt.document().tree().is_connected(node));
}

#[test]
fn test_model_changes_coalesce_into_one_render() {
    let mut rt = runtime();
    let kind = ComponentType::builder("Row").template("#row").outlet("#app").build().unwrap();
    let id = rt.create(&kind, ComponentOptions::new()).unwrap();
    let renders = count(&mut rt, id, Notification::AfterRender);

    rt.set(id, "title", json!("first")).unwrap();
    rt.set(id, "title", json!("second")).unwrap();
    assert_eq!(rt.pending(), vec![TaskKind::Render(id)]);

    rt.tick();
    assert_eq!(renders.get(), 1);
    assert_eq!(rt.get(id, "title").unwrap(), Some(json!("second")));
    assert_eq!(rt.document().body_html(), "<div id=\"app\"><li class=\"row\">second</li></div>");

    rt.set(id, "title", json!("second")).unwrap();
    assert_eq!(rt.pending_tasks(), 0);
}

#[test]
fn test_set_template_rerenders() {
    let mut rt = runtime();
    let kind = ComponentType::builder("Row").template("#row").outlet("#app").build().unwrap();
    let id = rt.create(&kind, ComponentOptions::new()).unwrap();
    rt.set(id, "title", json!("x")).unwrap();
    rt.set_template(id, "#alt").unwrap();
    assert_eq!(rt.pending(), vec![TaskKind::Render(id)]);

    rt.run_until_idle();
    assert_eq!(rt.document().body_html(), "<div id=\"app\"><li class=\"alt\">x!</li></div>");
    assert!(rt.set_template(id, "#missing").is_err());
}

#[test]
fn test_destroy_removes_element_and_children() {
    let mut rt = runtime();
    let parent = rt.create(&parent_type(), ComponentOptions::new()).unwrap();
    rt.run_until_idle();
    let child = rt.component(parent).unwrap().child("rows").unwrap();
    let destroyed = count(&mut rt, parent, Notification::Destroyed);

    rt.destroy(parent).unwrap();
    assert_eq!(destroyed.get(), 1);
    assert_eq!(rt.state(parent), Some(LifecycleState::Destroyed));
    assert_eq!(rt.state(child), Some(LifecycleState::Destroyed));
    assert_eq!(rt.document().body_html(), "<div id=\"app\"></div>");

    rt.destroy(parent).unwrap();
    assert_eq!(destroyed.get(), 1);
    assert!(matches!(rt.render(parent, false), Err(ComponentError::Destroyed(_))));
    assert!(matches!(rt.set(child, "title", json!(1)), Err(ComponentError::Destroyed(_))));
}

#[test]
fn test_destroy_unmounted_component() {
    let mut rt = runtime();
    let kind = ComponentType::builder("Row").template("#row").build().unwrap();
    let id = rt.create(&kind, ComponentOptions::new().autorender(false)).unwrap();
    assert!(rt.destroy(id).is_ok());
    assert_eq!(rt.state(id), Some(LifecycleState::Destroyed));
}

#[test]
fn test_destroy_cancels_deferred_child_mount() {
    let mut rt = runtime();
    let parent = rt.create(&parent_type(), ComponentOptions::new()).unwrap();
    assert_eq!(rt.pending_tasks(), 1);

    rt.destroy(parent).unwrap();
    assert_eq!(rt.pending_tasks(), 0);
    let report = rt.tick();
    assert_eq!(report.ran, 0);
}

#[test]
fn test_detach_policy_keeps_children_alive() {
    let mut rt = runtime();
    let parent = rt.create(&parent_type(), ComponentOptions::new()).unwrap();
    let child = rt.component(parent).unwrap().child("rows").unwrap();

    rt.destroy_with(parent, DestroyPolicy::Detach).unwrap();
    assert_eq!(rt.pending_tasks(), 0);
    assert_eq!(rt.state(child), Some(LifecycleState::Unmounted));
    assert_eq!(rt.component(child).unwrap().parent(), None);

    let mut rt = runtime();
    let parent = rt.create(&parent_type(), ComponentOptions::new()).unwrap();
    rt.run_until_idle();
    let child = rt.component(parent).unwrap().child("rows").unwrap();
    let element = rt.element(child).unwrap();

    rt.destroy_with(parent, DestroyPolicy::Detach).unwrap();
    assert_eq!(rt.state(child), Some(LifecycleState::Unmounted));
    assert!(rt.document().tree().contains(element));
    assert!(!rt.document().tree().is_connected(element));

    rt.append(child, Some("#app".into())).unwrap();
    assert_eq!(rt.document().body_html(), "<div id=\"app\"><li class=\"row\"></li></div>");
}

#[test]
fn test_configured_destroy_policy() {
    let config = Config {
        destroy_policy: DestroyPolicy::Detach,
        ..Config::default()
    };
    let document = mast::html::parse_document("<div id=\"app\"></div>").unwrap();
    let mut rt = Runtime::with_config(document, registry(), Rc::new(LocalConnection::new()), config);
    let parent = rt.create(&parent_type(), ComponentOptions::new()).unwrap();
    let child = rt.component(parent).unwrap().child("rows").unwrap();

    rt.destroy(parent).unwrap();
    assert_eq!(rt.state(child), Some(LifecycleState::Unmounted));
}

#[test]
fn test_failed_deferred_mount_is_reported() {
    let mut rt = runtime();
    let kind = ComponentType::builder("Parent")
        .template("#parent")
        .outlet("#app")
        .subcomponent("rows", SubcomponentDescriptor::new("RowView").with_outlet("#missing"))
        .build()
        .unwrap();
    rt.create(&kind, ComponentOptions::new()).unwrap();

    let report = rt.tick();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(
        report.failures[0].1.to_string(),
        "no elements exist in this template context for child outlet selector '#missing'"
    );
}

#[test]
fn test_run_until_idle_stops_at_max_turns() {
    struct Churn {
        n: Cell<u64>,
    }

    impl ComponentHooks for Churn {
        fn after_render(&mut self, cx: &mut Context<'_>) {
            self.n.set(self.n.get() + 1);
            cx.set("title", self.n.get()).unwrap();
        }
    }

    let config = Config {
        max_turns: 5,
        ..Config::default()
    };
    let document = mast::html::parse_document("<div id=\"app\"></div>").unwrap();
    let mut rt = Runtime::with_config(document, registry(), Rc::new(LocalConnection::new()), config);
    let kind = ComponentType::builder("Churn")
        .template("#row")
        .outlet("#app")
        .hooks(|| Churn { n: Cell::new(0) })
        .build()
        .unwrap();
    let id = rt.create(&kind, ComponentOptions::new()).unwrap();

    let report = rt.run_until_idle();
    assert_eq!(report.turns, 5);
    assert_eq!(report.ran, 5);
    assert_eq!(rt.pending(), vec![TaskKind::Render(id)]);
}

#[test]
fn test_hook_order_with_live_connection() {
    let log = Log::default();
    let mut rt = runtime_with(registry(), Rc::new(LocalConnection::connected()));
    let id = rt.create(&recorded(&log), ComponentOptions::new()).unwrap();

    assert_eq!(
        log.entries(),
        vec![format!("init {id}"), format!("after_render {id}"), format!("after_connect {id}")]
    );
    assert_eq!(rt.pending_tasks(), 0);
}

#[test]
fn test_after_connect_waits_for_connection() {
    let log = Log::default();
    let connection = Rc::new(LocalConnection::new());
    let mut rt = runtime_with(registry(), connection.clone());
    let id = rt.create(&recorded(&log), ComponentOptions::new()).unwrap();
    let connects = count(&mut rt, id, Notification::AfterConnect);

    assert!(!log.entries().contains(&format!("after_connect {id}")));
    assert_eq!(connection.subscriber_count(), 1);

    rt.arm_connection(id).unwrap();
    assert_eq!(connection.subscriber_count(), 1);

    assert_eq!(connection.connect(), 1);
    assert_eq!(rt.pending(), vec![TaskKind::AfterConnect(id)]);
    rt.tick();
    assert_eq!(connects.get(), 1);
    assert_eq!(log.entries().last(), Some(&format!("after_connect {id}")));

    rt.destroy(id).unwrap();
    assert_eq!(connection.subscriber_count(), 0);
}

#[test]
fn test_unknown_component_id() {
    let mut rt = runtime();
    let kind = ComponentType::builder("Row").template("#row").outlet("#app").build().unwrap();
    let id = rt.create(&kind, ComponentOptions::new()).unwrap();

    let mut other = runtime();
    assert!(matches!(other.render(id, false), Err(ComponentError::UnknownComponent(_))));
    assert!(matches!(other.append(id, Some(NodeId::ROOT.into())), Err(ComponentError::UnknownComponent(_))));
}

#[test]
fn test_table_row_mounts_into_tbody() {
    let mut registry = Registry::new();
    registry.define_template("#row-tpl", "<tr class=\"row\"><td>{{title}}</td></tr>");
    let document = mast::html::parse_document("<table><tbody id=\"rows\"></tbody></table>").unwrap();
    let mut rt = Runtime::new(document, registry, Rc::new(LocalConnection::new()));
    let row = ComponentType::builder("RowView").template("#row-tpl").outlet("#rows").build().unwrap();

    let id = rt.create(&row, ComponentOptions::new()).unwrap();
    assert_eq!(rt.state(id), Some(LifecycleState::Mounted));

    rt.set(id, "title", json!("Buy milk")).unwrap();
    rt.run_until_idle();
    assert_eq!(
        rt.document().body_html(),
        "<table><tbody id=\"rows\"><tr class=\"row\"><td>Buy milk</td></tr></tbody></table>"
    );
}

#[test]
fn test_repeated_renders_reuse_dom_slots() {
    let mut rt = runtime();
    let kind = ComponentType::builder("Row").template("#row").outlet("#app").build().unwrap();
    let id = rt.create(&kind, ComponentOptions::new()).unwrap();
    rt.run_until_idle();
    let slots = rt.document().tree().len();

    for n in 0..1000 {
        rt.set(id, "title", json!(n)).unwrap();
        rt.run_until_idle();
    }

    // One <li> and its text node live at a time; their old slots are reused.
    assert!(rt.document().tree().len() <= slots + 2, "slots grew to {}", rt.document().tree().len());
    assert_eq!(rt.document().body_html(), "<div id=\"app\"><li class=\"row\">999</li></div>");
}

#[test]
fn test_destroy_frees_component_slot() {
    let mut rt = runtime();
    let kind = ComponentType::builder("Row").template("#row").outlet("#app").build().unwrap();
    let model = Store::new().into_handle();
    let shared: ModelIdentity = Identity::Instance(model.clone());

    let first = rt.create(&kind, ComponentOptions::new().model(shared)).unwrap();
    assert!(Rc::strong_count(&model) > 1);
    rt.destroy(first).unwrap();
    assert_eq!(Rc::strong_count(&model), 1, "destroyed component still holds its model");

    let second = rt.create(&kind, ComponentOptions::new()).unwrap();
    assert_eq!(second.index(), first.index());
    assert_ne!(second, first);
    assert_eq!(rt.component_slots(), 1);
    assert_eq!(rt.state(first), Some(LifecycleState::Destroyed));
    assert_eq!(rt.state(second), Some(LifecycleState::Mounted));
    assert!(matches!(rt.set(first, "title", json!("x")), Err(ComponentError::Destroyed(_))));
    assert!(rt.destroy(first).is_ok());
    assert_eq!(rt.state(second), Some(LifecycleState::Mounted));

    for _ in 0..100 {
        let id = rt.create(&kind, ComponentOptions::new()).unwrap();
        rt.destroy(id).unwrap();
    }
    assert_eq!(rt.component_slots(), 2);
}
