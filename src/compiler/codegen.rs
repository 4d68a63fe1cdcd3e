//! Render-function source generation.

use crate::compiler::ast::{Element, Helper, Node, Root};

const RUNTIME_BINDING: &str = "Vue";

struct CodegenContext {
    code: String,
}

impl CodegenContext {
    fn push(&mut self, source: &str) {
        self.code.push_str(source);
    }

    fn newline(&mut self) {
        self.code.push('\n');
    }
}

/// Source text of the render function for a transformed `root`.
pub fn generate(root: &Root) -> String {
    let mut ctx = CodegenContext { code: String::new() };

    if !root.helpers.is_empty() {
        gen_preamble(root, &mut ctx);
    }
    ctx.push("return function render(_ctx, _cache) { return ");
    gen_node_list(&root.children, &mut ctx);
    ctx.push(" }");
    ctx.code
}

fn gen_preamble(root: &Root, ctx: &mut CodegenContext) {
    let aliases: Vec<String> = root
        .helpers
        .iter()
        .map(|h| format!("{}: {}", h.name(), h.alias()))
        .collect();
    ctx.push(&format!("const {{ {} }} = {RUNTIME_BINDING}", aliases.join(", ")));
    ctx.newline();
}

/// No nodes: `null`; one: the node; more: an array.
fn gen_node_list(nodes: &[Node], ctx: &mut CodegenContext) {
    match nodes {
        [] => ctx.push("null"),
        [node] => gen_node(node, ctx),
        nodes => {
            ctx.push("[");
            for (i, node) in nodes.iter().enumerate() {
                if i > 0 {
                    ctx.push(", ");
                }
                gen_node(node, ctx);
            }
            ctx.push("]");
        }
    }
}

fn gen_node(node: &Node, ctx: &mut CodegenContext) {
    match node {
        Node::Text(text) => ctx.push(&quote(text)),
        Node::Interpolation(expr) => {
            ctx.push(&Helper::ToDisplayString.alias());
            ctx.push("(");
            ctx.push(&expr.content);
            ctx.push(")");
        }
        Node::Compound(parts) => {
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    ctx.push(" + ");
                }
                gen_node(part, ctx);
            }
        }
        Node::Element(element) => gen_element(element, ctx),
    }
}

/// `_createElementVNode("tag", props, children)` with trailing empty
/// arguments left out.
fn gen_element(element: &Element, ctx: &mut CodegenContext) {
    ctx.push(&Helper::CreateElementVNode.alias());
    ctx.push("(\"");
    ctx.push(&element.tag);
    ctx.push("\"");
    if !element.children.is_empty() {
        // attributes are not parsed, so props are always null
        ctx.push(", null, ");
        gen_node_list(&element.children, ctx);
    }
    ctx.push(")");
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}
