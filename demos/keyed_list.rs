//! Keyed List Example - reordering with minimal host moves
//!
//! Renders a keyed `<ul>`, reorders it and prints the host operations the
//! diff needed. Retained items keep their host nodes.
//!
//! Run with: cargo run --example keyed_list

use spark_vdom::platform::{HostOp, MemoryPlatform};
use spark_vdom::{Renderer, Runtime, VNode, h, props};

fn list(keys: &[&str]) -> VNode {
    h(
        "ul",
        None,
        keys.iter()
            .map(|k| h("li", Some(props! { "key" => *k }), *k))
            .collect::<Vec<_>>(),
    )
}

fn main() {
    println!("=== spark-vdom Keyed List Example ===\n");

    let rt = Runtime::new();
    let host = MemoryPlatform::new();
    let root = host.create_root("list");
    let renderer = Renderer::new(&rt, host.clone());

    let steps: [&[&str]; 4] = [
        &["a", "b", "c", "d", "e"],
        &["a", "c", "x", "b", "e"],
        &["e", "b", "x", "c", "a"],
        &["b", "x"],
    ];

    for keys in steps {
        host.clear_ops();
        if let Err(err) = renderer.render(Some(list(keys)), root) {
            eprintln!("render failed: {err}");
            return;
        }
        let ops = host.ops();
        let moves = ops.iter().filter(|op| matches!(op, HostOp::Insert { .. })).count();
        let removes = ops.iter().filter(|op| matches!(op, HostOp::Remove { .. })).count();
        println!("{:<12} {}", keys.join(","), host.inner_html(root));
        println!("             inserts: {moves}, removes: {removes}\n");
    }
}
