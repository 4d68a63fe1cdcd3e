//! App bootstrap and direct `Renderer::render` use.

use std::rc::Rc;

use futures::executor::block_on;
use spark_vdom::platform::{HostOp, MemoryPlatform};
use spark_vdom::{
    Children, Component, Error, Renderer, Runtime, create_text_vnode, fragment, h, keyed_fragment,
    props,
};

fn setup() -> (Runtime, Rc<MemoryPlatform>, Renderer<Rc<MemoryPlatform>>) {
    let rt = Runtime::new();
    let host = MemoryPlatform::new();
    let renderer = Renderer::new(&rt, host.clone());
    (rt, host, renderer)
}

fn hello() -> Rc<Component> {
    Component::builder()
        .name("Hello")
        .render(|_| h("p", None, "hi"))
        .build()
}

// =============================================================================
// App
// =============================================================================

#[test]
fn test_mount_missing_container() {
    let (_rt, _host, renderer) = setup();
    let app = renderer.create_app(hello());
    assert_eq!(
        app.mount("#nope"),
        Err(Error::ContainerNotFound {
            selector: "#nope".into()
        })
    );
    assert!(!app.is_mounted());
}

#[test]
fn test_mount_twice_is_rejected() {
    let (_rt, host, renderer) = setup();
    let root = host.create_root("app");
    let app = renderer.create_app(hello());
    assert_eq!(app.mount("#app"), Ok(root));
    assert_eq!(app.mount("#app"), Err(Error::AlreadyMounted));
    assert_eq!(host.inner_html(root), "<p>hi</p>");
}

#[test]
fn test_unmount_then_remount() {
    let (_rt, host, renderer) = setup();
    let root = host.create_root("app");
    let app = renderer.create_app(hello());
    app.mount_to(root).unwrap();
    app.unmount().unwrap();
    assert_eq!(host.inner_html(root), "");
    assert!(app.container().is_none());

    app.mount_to(root).unwrap();
    assert_eq!(host.inner_html(root), "<p>hi</p>");
}

#[test]
fn test_root_props_and_global_properties() {
    let (_rt, host, renderer) = setup();
    let root = host.create_root("app");
    let comp = Component::builder()
        .render(|ctx| {
            let text = format!(
                "{} v{}",
                ctx.get("title").to_display_string(),
                ctx.get("version").to_display_string()
            );
            h("h1", None, text)
        })
        .build();

    let app = renderer
        .create_app(comp)
        .with_props(props! { "title" => "Docs" });
    app.config_mut().global_properties.set("version", "1.2");
    app.mount("#app").unwrap();

    assert_eq!(host.inner_html(root), "<h1>Docs v1.2</h1>");
}

#[test]
fn test_free_create_app() {
    let (_rt, host, renderer) = setup();
    let root = host.create_root("app");
    let app = spark_vdom::create_app(&renderer, hello());
    app.mount("#app").unwrap();
    assert_eq!(app.root_instance().and_then(|i| i.name().map(str::to_string)), Some("Hello".into()));
    assert_eq!(host.inner_html(root), "<p>hi</p>");
}

#[test]
fn test_two_runtimes_are_independent() {
    let (rt_a, host_a, renderer_a) = setup();
    let (rt_b, host_b, renderer_b) = setup();
    let root_a = host_a.create_root("app");
    let root_b = host_b.create_root("app");

    let show = |count: spark_vdom::Ref| {
        Component::builder()
            .render(move |_| h("p", None, count.get().to_display_string()))
            .build()
    };
    let count_a = rt_a.new_ref(0);
    let count_b = rt_b.new_ref(0);
    let app_a = renderer_a.create_app(show(count_a.clone()));
    let app_b = renderer_b.create_app(show(count_b.clone()));
    app_a.mount("#app").unwrap();
    app_b.mount("#app").unwrap();

    count_a.set(5);
    assert!(rt_a.scheduler().is_flush_pending());
    assert!(!rt_b.scheduler().is_flush_pending());

    block_on(rt_a.next_tick());
    assert_eq!(host_a.inner_html(root_a), "<p>5</p>");
    assert_eq!(host_b.inner_html(root_b), "<p>0</p>");
}

// =============================================================================
// Renderer::render
// =============================================================================

#[test]
fn test_render_patches_and_unmounts_root() {
    let (_rt, host, renderer) = setup();
    let root = host.create_root("app");

    renderer.render(Some(h("p", None, "one")), root).unwrap();
    let p = host.children(root)[0];
    renderer.render(Some(h("p", None, "two")), root).unwrap();
    assert_eq!(host.children(root), vec![p]);
    assert_eq!(host.inner_html(root), "<p>two</p>");

    // type change replaces the node in place
    renderer.render(Some(h("div", None, "three")), root).unwrap();
    assert_eq!(host.inner_html(root), "<div>three</div>");

    renderer.render(None, root).unwrap();
    assert_eq!(host.inner_html(root), "");
    assert!(renderer.root(root).is_none());
}

#[test]
fn test_props_patch_and_removal() {
    let (_rt, host, renderer) = setup();
    let root = host.create_root("app");

    renderer
        .render(Some(h("a", Some(props! { "href" => "/x", "title" => "t" }), "link")), root)
        .unwrap();
    let a = host.children(root)[0];
    host.clear_ops();

    renderer
        .render(Some(h("a", Some(props! { "href" => "/y" }), "link")), root)
        .unwrap();
    assert_eq!(host.attr(a, "href").as_deref(), Some("/y"));
    assert_eq!(host.attr(a, "title"), None);
    assert_eq!(
        host.ops(),
        vec![
            HostOp::SetAttr { el: a, key: "href".into() },
            HostOp::RemoveAttr { el: a, key: "title".into() },
        ]
    );

    // null removes too
    renderer
        .render(Some(h("a", Some(props! { "href" => spark_vdom::Value::Null }), "link")), root)
        .unwrap();
    assert_eq!(host.attr(a, "href"), None);
}

#[test]
fn test_mount_element_op_order() {
    let (_rt, host, renderer) = setup();
    let root = host.create_root("app");
    host.clear_ops();

    renderer
        .render(Some(h("div", Some(props! { "id" => "x" }), vec![h("b", None, "1")])), root)
        .unwrap();
    let div = host.children(root)[0];
    let b = host.children(div)[0];
    assert_eq!(
        host.ops(),
        vec![
            HostOp::CreateElement { el: div, tag: "div".into() },
            HostOp::SetAttr { el: div, key: "id".into() },
            HostOp::CreateElement { el: b, tag: "b".into() },
            HostOp::SetElementText { el: b, text: "1".into() },
            HostOp::Insert { el: b, parent: div, anchor: None },
            HostOp::Insert { el: div, parent: root, anchor: None },
        ]
    );
}

#[test]
fn test_children_shape_transitions() {
    let (_rt, host, renderer) = setup();
    let root = host.create_root("app");

    renderer.render(Some(h("div", None, "text")), root).unwrap();
    renderer
        .render(Some(h("div", None, vec![h("b", None, "1"), h("i", None, "2")])), root)
        .unwrap();
    assert_eq!(host.inner_html(root), "<div><b>1</b><i>2</i></div>");

    renderer.render(Some(h("div", None, "back")), root).unwrap();
    assert_eq!(host.inner_html(root), "<div>back</div>");

    renderer.render(Some(h("div", None, Children::None)), root).unwrap();
    assert_eq!(host.inner_html(root), "<div></div>");
}

#[test]
fn test_fragment_children_stay_between_anchors() {
    let (_rt, host, renderer) = setup();
    let root = host.create_root("app");

    let list = |items: &[&str]| {
        h(
            "div",
            None,
            vec![
                h("header", None, Children::None),
                fragment(items.iter().map(|i| h("p", Some(props! { "key" => *i }), *i)).collect()),
                h("footer", None, Children::None),
            ],
        )
    };

    renderer.render(Some(list(&["a"])), root).unwrap();
    renderer.render(Some(list(&["a", "b", "c"])), root).unwrap();
    assert_eq!(
        host.inner_html(root),
        "<div><header></header><p>a</p><p>b</p><p>c</p><footer></footer></div>"
    );

    renderer.render(Some(list(&["c", "a"])), root).unwrap();
    assert_eq!(
        host.inner_html(root),
        "<div><header></header><p>c</p><p>a</p><footer></footer></div>"
    );
}

#[test]
fn test_keyed_fragments_move_as_a_unit() {
    let (_rt, host, renderer) = setup();
    let root = host.create_root("app");

    let rows = |keys: &[&str]| {
        h(
            "dl",
            None,
            keys.iter()
                .map(|k| {
                    keyed_fragment(
                        *k,
                        vec![h("dt", None, *k), h("dd", None, format!("{k}!"))],
                    )
                })
                .collect::<Vec<_>>(),
        )
    };

    renderer.render(Some(rows(&["x", "y"])), root).unwrap();
    renderer.render(Some(rows(&["y", "x"])), root).unwrap();
    assert_eq!(
        host.inner_html(root),
        "<dl><dt>y</dt><dd>y!</dd><dt>x</dt><dd>x!</dd></dl>"
    );
}

#[test]
fn test_text_vnode_updates_in_place() {
    let (_rt, host, renderer) = setup();
    let root = host.create_root("app");
    renderer.render(Some(create_text_vnode("a")), root).unwrap();
    let node = host.children(root)[0];
    host.clear_ops();

    renderer.render(Some(create_text_vnode("b")), root).unwrap();
    assert_eq!(host.children(root), vec![node]);
    assert_eq!(host.ops(), vec![HostOp::SetText { el: node, text: "b".into() }]);
}
