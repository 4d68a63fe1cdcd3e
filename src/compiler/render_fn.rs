//! Executable render functions built straight from the transformed AST.
//!
//! There is no expression evaluator: an interpolation is a dotted property
//! path looked up through the render context.

use std::rc::Rc;

use crate::compiler::ast::{Element, Node, Root};
use crate::component::{RenderContext, RenderFn};
use crate::types::Value;
use crate::vnode::{Children, VNode, create_text_vnode, fragment, h};

pub fn build(root: Root) -> RenderFn {
    let nodes: Rc<[Node]> = root.children.into();
    Rc::new(move |ctx: &RenderContext| match &nodes[..] {
        [] => create_text_vnode(""),
        [node] => render_node(node, ctx),
        nodes => fragment(nodes.iter().map(|n| render_node(n, ctx)).collect()),
    })
}

fn render_node(node: &Node, ctx: &RenderContext) -> VNode {
    match node {
        Node::Element(element) => render_element(element, ctx),
        text => create_text_vnode(render_text(text, ctx)),
    }
}

fn render_element(element: &Element, ctx: &RenderContext) -> VNode {
    let children = match &element.children[..] {
        [] => Children::None,
        [only] if only.is_text_like() => Children::Text(render_text(only, ctx).into()),
        nodes => Children::Array(nodes.iter().map(|n| render_node(n, ctx)).collect()),
    };
    h(element.tag.as_str(), None, children)
}

fn render_text(node: &Node, ctx: &RenderContext) -> String {
    match node {
        Node::Text(text) => text.clone(),
        Node::Interpolation(expr) => resolve_path(&expr.raw, ctx).to_display_string(),
        Node::Compound(parts) => parts.iter().map(|p| render_text(p, ctx)).collect(),
        Node::Element(_) => String::new(),
    }
}

/// `a.b.c`: `a` from the context, then property reads through proxies,
/// records, refs and computed cells.
fn resolve_path(path: &str, ctx: &RenderContext) -> Value {
    let mut segments = path.split('.').map(str::trim);
    let Some(first) = segments.next() else {
        return Value::Undefined;
    };
    segments.fold(ctx.get(first), |value, key| property(&value, key))
}

fn property(value: &Value, key: &str) -> Value {
    match value {
        Value::Proxy(proxy) => proxy.get(key),
        Value::Object(record) => record.get(key),
        Value::Ref(r) => property(&r.get(), key),
        Value::Computed(c) => property(&c.get(), key),
        _ => Value::Undefined,
    }
}
