//! Component lifecycle against the in-memory host: batching, props,
//! emit, slots, provide/inject, templates and unmount.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::executor::block_on;
use spark_vdom::platform::MemoryPlatform;
use spark_vdom::{
    App, Children, Component, CompileError, ElementHandle, Error, Record, RenderContext, RenderFn,
    Renderer, Runtime, SetupResult, Slots, Value, create_text_vnode, h, props,
};

// =============================================================================
// Helpers
// =============================================================================

struct Harness {
    rt: Runtime,
    host: Rc<MemoryPlatform>,
    root: ElementHandle,
}

fn harness() -> Harness {
    let rt = Runtime::new();
    let host = MemoryPlatform::new();
    let root = host.create_root("app");
    Harness { rt, host, root }
}

impl Harness {
    fn app(&self, component: Rc<Component>) -> App<Rc<MemoryPlatform>> {
        Renderer::new(&self.rt, self.host.clone()).create_app(component)
    }

    fn html(&self) -> String {
        self.host.inner_html(self.root)
    }

    fn tick(&self) {
        block_on(self.rt.next_tick());
    }
}

fn counter() -> Rc<Cell<u32>> {
    Rc::new(Cell::new(0))
}

fn bump(c: &Cell<u32>) {
    c.set(c.get() + 1);
}

// =============================================================================
// Scheduling
// =============================================================================

#[test]
fn test_writes_batch_into_one_render() {
    let t = harness();
    let renders = counter();
    let count = t.rt.new_ref(0);

    let comp = Component::builder()
        .render({
            let renders = renders.clone();
            let count = count.clone();
            move |_| {
                bump(&renders);
                h("p", None, count.get().to_display_string())
            }
        })
        .build();
    let app = t.app(comp);
    app.mount("#app").unwrap();
    assert_eq!(t.html(), "<p>0</p>");

    count.set(1);
    count.set(2);
    count.set(3);
    // nothing re-renders synchronously
    assert_eq!(t.html(), "<p>0</p>");
    assert_eq!(renders.get(), 1);

    t.tick();
    assert_eq!(t.html(), "<p>3</p>");
    assert_eq!(renders.get(), 2);
}

#[test]
fn test_next_tick_callback_sees_updated_tree() {
    let t = harness();
    let count = t.rt.new_ref("a");
    let comp = Component::builder()
        .render({
            let count = count.clone();
            move |_| h("p", None, count.get().to_display_string())
        })
        .build();
    let app = t.app(comp);
    app.mount("#app").unwrap();

    count.set("b");
    let seen = Rc::new(RefCell::new(String::new()));
    let tick = t.rt.next_tick_with({
        let seen = seen.clone();
        let host = t.host.clone();
        let root = t.root;
        move || *seen.borrow_mut() = host.inner_html(root)
    });
    block_on(tick);
    assert_eq!(&*seen.borrow(), "<p>b</p>");
}

#[test]
fn test_setup_state_and_handlers() {
    let t = harness();
    let comp = Component::builder()
        .setup(|_props, ctx| {
            let count = ctx.runtime().new_ref(0);
            let inc = Value::function({
                let count = count.clone();
                move |_| {
                    let next = count.get().as_f64().unwrap_or(0.0) + 1.0;
                    count.set(next);
                    Value::Undefined
                }
            });
            SetupResult::State(Record::new().with("count", count).with("inc", inc))
        })
        .render(|ctx| {
            h(
                "button",
                Some(props! { "onClick" => ctx.get("inc") }),
                ctx.get("count").to_display_string(),
            )
        })
        .build();
    let app = t.app(comp);
    app.mount("#app").unwrap();

    let button = t.host.find_all(t.root, "button")[0];
    t.host.dispatch(button, "click", &[]);
    t.host.dispatch(button, "click", &[]);
    t.tick();
    assert_eq!(t.html(), "<button>2</button>");
}

#[test]
fn test_parent_update_invalidates_queued_child_job() {
    let t = harness();
    let child_renders = counter();
    let count = t.rt.new_ref(0);

    let child = Component::builder()
        .render({
            let renders = child_renders.clone();
            let count = count.clone();
            move |ctx| {
                bump(&renders);
                let n = ctx.get("n").to_display_string();
                h("i", None, format!("{n}/{}", count.get().to_display_string()))
            }
        })
        .build();

    let parent = Component::builder()
        .render({
            let count = count.clone();
            move |_| {
                let n = count.get();
                h("div", None, vec![h(&child, Some(props! { "n" => n }), Children::None)])
            }
        })
        .build();
    let app = t.app(parent);
    app.mount("#app").unwrap();
    assert_eq!(t.html(), "<div><i>0/0</i></div>");

    // both effects are scheduled; the parent's update renders the child
    count.set(1);
    t.tick();
    assert_eq!(t.html(), "<div><i>1/1</i></div>");
    assert_eq!(child_renders.get(), 2);
}

// =============================================================================
// Props & emit
// =============================================================================

#[test]
fn test_props_flow_and_unchanged_props_skip_render() {
    let t = harness();
    let child_renders = counter();
    let msg = t.rt.new_ref("hello");
    let other = t.rt.new_ref(0);

    let child = Component::builder()
        .render({
            let renders = child_renders.clone();
            move |ctx| {
                bump(&renders);
                h("span", None, ctx.props().get("msg").to_display_string())
            }
        })
        .build();

    let parent = Component::builder()
        .render({
            let msg = msg.clone();
            let other = other.clone();
            move |_| {
                h(
                    "div",
                    None,
                    vec![
                        h("b", None, other.get().to_display_string()),
                        h(&child, Some(props! { "msg" => msg.get() }), Children::None),
                    ],
                )
            }
        })
        .build();
    let app = t.app(parent);
    app.mount("#app").unwrap();
    assert_eq!(t.html(), "<div><b>0</b><span>hello</span></div>");

    other.set(1);
    t.tick();
    assert_eq!(t.html(), "<div><b>1</b><span>hello</span></div>");
    assert_eq!(child_renders.get(), 1);

    msg.set("bye");
    t.tick();
    assert_eq!(t.html(), "<div><b>1</b><span>bye</span></div>");
    assert_eq!(child_renders.get(), 2);
}

#[test]
fn test_setup_props_are_readonly() {
    let t = harness();
    let seen = Rc::new(RefCell::new(Value::Undefined));
    let child = Component::builder()
        .setup({
            let seen = seen.clone();
            move |props, _ctx| {
                // the write is dropped with a warning
                props.set("msg", "changed");
                *seen.borrow_mut() = props.get("msg");
                SetupResult::None
            }
        })
        .render(|ctx| h("span", None, ctx.get("msg").to_display_string()))
        .build();
    let app = t.app(child).with_props(props! { "msg" => "original" });
    app.mount("#app").unwrap();

    assert_eq!(*seen.borrow(), Value::from("original"));
    assert_eq!(t.html(), "<span>original</span>");
}

#[test]
fn test_emit_reaches_camel_cased_handler() {
    let t = harness();
    let total = t.rt.new_ref(0);

    let child = Component::builder()
        .setup(|_props, ctx| {
            let emit = ctx.emitter();
            let add = Value::function(move |_| {
                emit.call("add-amount", &[Value::from(5)]);
                Value::Undefined
            });
            SetupResult::State(Record::new().with("add", add))
        })
        .render(|ctx| h("button", Some(props! { "onClick" => ctx.get("add") }), "add"))
        .build();

    let parent = Component::builder()
        .render({
            let total = total.clone();
            move |_| {
                let on_add = Value::function({
                    let total = total.clone();
                    move |args| {
                        let amount = args.first().and_then(Value::as_f64).unwrap_or(0.0);
                        let current = total.peek().as_f64().unwrap_or(0.0);
                        total.set(current + amount);
                        Value::Undefined
                    }
                });
                h(
                    "div",
                    None,
                    vec![
                        h("p", None, total.get().to_display_string()),
                        h(&child, Some(props! { "onAddAmount" => on_add }), Children::None),
                    ],
                )
            }
        })
        .build();
    let app = t.app(parent);
    app.mount("#app").unwrap();

    let button = t.host.find_all(t.root, "button")[0];
    t.host.dispatch(button, "click", &[]);
    t.tick();
    assert_eq!(t.host.text_content(t.host.find_all(t.root, "p")[0]), "5");
}

// =============================================================================
// Slots
// =============================================================================

fn card() -> Rc<Component> {
    Component::builder()
        .name("Card")
        .render(|ctx| {
            let header = ctx
                .render_slot("header", Value::Undefined)
                .unwrap_or_else(|| create_text_vnode("no header"));
            let body = ctx
                .render_slot("default", Value::Undefined)
                .unwrap_or_else(|| create_text_vnode(""));
            let item = ctx
                .render_slot("item", "x")
                .unwrap_or_else(|| create_text_vnode(""));
            h("section", None, vec![header, body, item])
        })
        .build()
}

#[test]
fn test_named_and_scoped_slots() {
    let t = harness();
    let card = card();
    let parent = Component::builder()
        .render(move |_| {
            let slots = Slots::new()
                .with("header", |_| vec![h("h1", None, "Title")])
                .with("item", |props| vec![h("li", None, format!("item {}", props.to_display_string()))]);
            h(&card, None, slots)
        })
        .build();
    let app = t.app(parent);
    app.mount("#app").unwrap();
    assert_eq!(t.html(), "<section><h1>Title</h1><li>item x</li></section>");
}

#[test]
fn test_array_children_fill_default_slot() {
    let t = harness();
    let card = card();
    let parent = Component::builder()
        .render(move |_| h(&card, None, vec![h("p", None, "body")]))
        .build();
    let app = t.app(parent);
    app.mount("#app").unwrap();
    assert_eq!(t.html(), "<section>no header<p>body</p></section>");
}

#[test]
fn test_slot_content_follows_parent_state() {
    let t = harness();
    let card = card();
    let label = t.rt.new_ref("one");
    let parent = Component::builder()
        .render({
            let label = label.clone();
            move |_| {
                let text = label.get().to_display_string();
                h(&card, None, vec![h("p", None, text)])
            }
        })
        .build();
    let app = t.app(parent);
    app.mount("#app").unwrap();

    label.set("two");
    t.tick();
    assert_eq!(t.html(), "<section>no header<p>two</p></section>");
}

// =============================================================================
// Provide / inject
// =============================================================================

#[test]
fn test_inject_two_levels_deep_with_defaults() {
    let t = harness();

    let leaf = Component::builder()
        .setup(|_props, ctx| {
            let line = format!(
                "{}|{}|{}|{}|{}",
                ctx.inject("user").to_display_string(),
                ctx.inject("theme").to_display_string(),
                ctx.inject_or("missing", "fallback").to_display_string(),
                ctx.inject_with("lazy", || Value::from("made")).to_display_string(),
                ctx.inject("shadowed").to_display_string(),
            );
            SetupResult::State(Record::new().with("line", line))
        })
        .render(|ctx| h("p", None, ctx.get("line").to_display_string()))
        .build();

    let middle = Component::builder()
        .setup(|_props, ctx| {
            ctx.provide("shadowed", "middle");
            SetupResult::None
        })
        .render(move |_| h(&leaf, None, Children::None))
        .build();

    let top = Component::builder()
        .setup(|_props, ctx| {
            ctx.provide("user", "ann");
            ctx.provide("shadowed", "top");
            // a component does not see its own provides
            assert_eq!(ctx.inject("user"), Value::Undefined);
            SetupResult::None
        })
        .render(move |_| h(&middle, None, Children::None))
        .build();

    let app = t.app(top);
    app.provide("theme", "dark");
    app.mount("#app").unwrap();
    assert_eq!(t.html(), "<p>ann|dark|fallback|made|middle</p>");
}

#[test]
fn test_runtime_inject_outside_setup_is_undefined() {
    let t = harness();
    assert_eq!(t.rt.inject("anything"), Value::Undefined);
    assert!(t.rt.current_instance().is_none());
}

// =============================================================================
// Templates
// =============================================================================

#[test]
fn test_template_component() {
    let t = harness();
    let comp = Component::builder()
        .template("<div><p>{{ greeting }}, {{ user.name }}!</p><span>static</span></div>")
        .setup(|_props, ctx| {
            let rt = ctx.runtime();
            let user = rt.reactive(Record::new().with("name", "ann"));
            SetupResult::State(
                Record::new()
                    .with("greeting", rt.new_ref("hello"))
                    .with("user", user),
            )
        })
        .build();
    let app = t.app(comp);
    app.mount("#app").unwrap();
    assert_eq!(t.html(), "<div><p>hello, ann!</p><span>static</span></div>");

    let instance = app.root_instance().expect("mounted");
    let state = instance.setup_state().expect("state");
    state.set("greeting", "bye");
    if let Value::Proxy(user) = state.get("user") {
        user.set("name", "bob");
    }
    t.tick();
    assert_eq!(t.html(), "<div><p>bye, bob!</p><span>static</span></div>");
}

#[test]
fn test_template_parse_error_fails_mount() {
    let t = harness();
    let comp = Component::builder().template("<div><span></div>").build();
    let app = t.app(comp);
    let err = app.mount("#app").unwrap_err();
    assert_eq!(
        err,
        Error::Compile(CompileError::MissingEndTag { tag: "span".into() })
    );
}

#[test]
fn test_registered_compiler_replaces_builtin() {
    let t = harness();
    t.rt.register_compiler(Rc::new(|template: &str| -> spark_vdom::Result<RenderFn> {
        let text = format!("compiled: {template}");
        let render: RenderFn = Rc::new(move |_ctx: &RenderContext| h("i", None, text.clone()));
        Ok(render)
    }));
    let comp = Component::builder().template("anything").build();
    let app = t.app(comp);
    app.mount("#app").unwrap();
    assert_eq!(t.html(), "<i>compiled: anything</i>");
}

#[test]
fn test_component_without_render_renders_nothing() {
    let t = harness();
    let app = t.app(Component::builder().build());
    app.mount("#app").unwrap();
    assert_eq!(t.html(), "");
}

// =============================================================================
// Unmount
// =============================================================================

#[test]
fn test_unmount_stops_effects() {
    let t = harness();
    let renders = counter();
    let count = t.rt.new_ref(0);
    let comp = Component::builder()
        .render({
            let renders = renders.clone();
            let count = count.clone();
            move |_| {
                bump(&renders);
                h("p", None, count.get().to_display_string())
            }
        })
        .build();
    let app = t.app(comp);
    app.mount("#app").unwrap();
    let instance = app.root_instance().expect("mounted");
    assert!(instance.is_active());

    app.unmount().unwrap();
    assert_eq!(t.html(), "");
    assert!(!instance.is_active());
    assert!(!instance.is_mounted());

    count.set(1);
    t.tick();
    assert_eq!(renders.get(), 1);
    assert_eq!(t.html(), "");
}

#[test]
fn test_unmount_pending_update_is_dropped() {
    let t = harness();
    let renders = counter();
    let count = t.rt.new_ref(0);
    let comp = Component::builder()
        .render({
            let renders = renders.clone();
            let count = count.clone();
            move |_| {
                bump(&renders);
                h("p", None, count.get().to_display_string())
            }
        })
        .build();
    let app = t.app(comp);
    app.mount("#app").unwrap();

    count.set(1);
    app.unmount().unwrap();
    t.tick();
    assert_eq!(renders.get(), 1);
}

#[test]
fn test_toggled_child_is_unmounted() {
    let t = harness();
    let child_renders = counter();
    let show = t.rt.new_ref(true);
    let tick_ref = t.rt.new_ref(0);

    let child = Component::builder()
        .render({
            let renders = child_renders.clone();
            let tick_ref = tick_ref.clone();
            move |_| {
                bump(&renders);
                h("em", None, tick_ref.get().to_display_string())
            }
        })
        .build();
    let parent = Component::builder()
        .render({
            let show = show.clone();
            move |_| {
                let inner = if show.get().as_bool().unwrap_or(false) {
                    h(&child, None, Children::None)
                } else {
                    create_text_vnode("hidden")
                };
                h("div", None, vec![inner])
            }
        })
        .build();
    let app = t.app(parent);
    app.mount("#app").unwrap();
    assert_eq!(t.html(), "<div><em>0</em></div>");

    show.set(false);
    t.tick();
    assert_eq!(t.html(), "<div>hidden</div>");

    tick_ref.set(1);
    t.tick();
    assert_eq!(child_renders.get(), 1);
}

#[test]
fn test_nested_root_swap_keeps_outer_anchor() {
    let t = harness();
    let wide = t.rt.new_ref(false);
    let show_new = t.rt.new_ref(false);

    let inner = Component::builder()
        .name("Inner")
        .render({
            let wide = wide.clone();
            move |_| {
                let tag = if wide.get().as_bool().unwrap_or(false) { "div" } else { "p" };
                h(tag, None, "inner")
            }
        })
        .build();
    let outer = Component::builder()
        .name("Outer")
        .render(move |_| h(&inner, None, Children::None))
        .build();
    let list = Component::builder()
        .render({
            let show_new = show_new.clone();
            move |_| {
                let mut items = Vec::new();
                if show_new.get().as_bool().unwrap_or(false) {
                    items.push(h("li", Some(props! { "key" => "new" }), "new"));
                }
                items.push(h(&outer, Some(props! { "key" => "a" }), Children::None));
                h("ul", None, items)
            }
        })
        .build();
    let app = t.app(list);
    app.mount("#app").unwrap();
    assert_eq!(t.html(), "<ul><p>inner</p></ul>");

    // Inner replaces its own root; Outer's root node changes with it
    wide.set(true);
    t.tick();
    assert_eq!(t.html(), "<ul><div>inner</div></ul>");

    show_new.set(true);
    t.tick();
    assert_eq!(t.html(), "<ul><li>new</li><div>inner</div></ul>");
}
