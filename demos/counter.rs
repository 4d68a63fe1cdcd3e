//! Counter Example - state, events and batched re-render
//!
//! - A component whose setup returns a ref and a click handler
//! - Dispatching events on the in-memory host
//! - Several writes in one tick collapse into a single render
//!
//! Run with: cargo run --example counter

use futures::executor::block_on;
use spark_vdom::platform::MemoryPlatform;
use spark_vdom::{Component, Record, Renderer, Runtime, SetupResult, Value, h, props};

fn main() {
    println!("=== spark-vdom Counter Example ===\n");

    let rt = Runtime::new();
    let host = MemoryPlatform::new();
    let root = host.create_root("app");

    let counter = Component::builder()
        .name("Counter")
        .setup(|_props, ctx| {
            let count = ctx.runtime().new_ref(0);
            let inc = Value::function({
                let count = count.clone();
                move |_| {
                    let next = count.peek().as_f64().unwrap_or(0.0) + 1.0;
                    count.set(next);
                    Value::Undefined
                }
            });
            SetupResult::State(Record::new().with("count", count).with("inc", inc))
        })
        .render(|ctx| {
            h(
                "div",
                None,
                vec![
                    h("button", Some(props! { "onClick" => ctx.get("inc") }), "+1"),
                    h("span", None, ctx.get("count").to_display_string()),
                ],
            )
        })
        .build();

    let app = Renderer::new(&rt, host.clone()).create_app(counter);
    if let Err(err) = app.mount("#app") {
        eprintln!("mount failed: {err}");
        return;
    }
    println!("Mounted:        {}", host.inner_html(root));

    let button = host.find_all(root, "button")[0];
    host.clear_ops();

    for _ in 0..3 {
        host.dispatch(button, "click", &[]);
    }
    println!("Before flush:   {}", host.inner_html(root));

    block_on(rt.next_tick());
    println!("After flush:    {}", host.inner_html(root));
    println!("Host ops:       {:?}", host.ops());

    app.unmount().ok();
    println!("Unmounted:      {:?}", host.inner_html(root));
}
