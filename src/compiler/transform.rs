//! AST transforms.
//!
//! Traversal calls every transform's `enter` on a node before its children
//! and `exit` after them (exits in reverse order). Once a children list
//! (root or element) is done, `exit_children` gets to rewrite the list.

use indexmap::IndexSet;

use crate::compiler::ast::{Helper, Node, Root};

/// Collects helpers while the transforms run.
#[derive(Debug, Default)]
pub struct TransformContext {
    helpers: IndexSet<Helper>,
}

impl TransformContext {
    /// Register `helper`; keeps first-use order.
    pub fn helper(&mut self, helper: Helper) {
        self.helpers.insert(helper);
    }

    pub fn helpers(&self) -> impl Iterator<Item = Helper> + '_ {
        self.helpers.iter().copied()
    }
}

pub trait NodeTransform {
    fn enter(&self, _node: &mut Node, _ctx: &mut TransformContext) {}

    fn exit(&self, _node: &mut Node, _ctx: &mut TransformContext) {}

    fn exit_children(&self, _children: &mut Vec<Node>, _ctx: &mut TransformContext) {}
}

/// Prefix interpolated paths with `_ctx.`.
pub struct TransformExpression;

impl NodeTransform for TransformExpression {
    fn enter(&self, node: &mut Node, _ctx: &mut TransformContext) {
        if let Node::Interpolation(expr) = node {
            expr.content = format!("_ctx.{}", expr.raw);
        }
    }
}

/// Elements are built with `createElementVNode`.
pub struct TransformElement;

impl NodeTransform for TransformElement {
    fn exit(&self, node: &mut Node, ctx: &mut TransformContext) {
        if let Node::Element(_) = node {
            ctx.helper(Helper::CreateElementVNode);
        }
    }
}

/// Merge runs of adjacent text and interpolations into one compound node.
pub struct TransformText;

impl NodeTransform for TransformText {
    fn exit_children(&self, children: &mut Vec<Node>, _ctx: &mut TransformContext) {
        let mut merged: Vec<Node> = Vec::with_capacity(children.len());
        for child in children.drain(..) {
            let joins = child.is_text_like() && merged.last().is_some_and(Node::is_text_like);
            if !joins {
                merged.push(child);
                continue;
            }
            let Some(last) = merged.pop() else {
                continue;
            };
            let mut parts = match last {
                Node::Compound(parts) => parts,
                other => vec![other],
            };
            parts.push(child);
            merged.push(Node::Compound(parts));
        }
        *children = merged;
    }
}

/// Transforms [`compile`](crate::compiler::compile) runs, in order.
pub fn default_transforms() -> Vec<Box<dyn NodeTransform>> {
    vec![
        Box::new(TransformExpression),
        Box::new(TransformElement),
        Box::new(TransformText),
    ]
}

/// Run `transforms` over `root` and record the helpers it needs.
pub fn transform(root: &mut Root, transforms: &[Box<dyn NodeTransform>]) {
    let mut ctx = TransformContext::default();
    traverse_children(&mut root.children, transforms, &mut ctx);
    root.helpers = ctx.helpers().collect();
}

fn traverse_children(
    children: &mut Vec<Node>,
    transforms: &[Box<dyn NodeTransform>],
    ctx: &mut TransformContext,
) {
    for child in children.iter_mut() {
        traverse_node(child, transforms, ctx);
    }
    for t in transforms {
        t.exit_children(children, ctx);
    }
}

fn traverse_node(node: &mut Node, transforms: &[Box<dyn NodeTransform>], ctx: &mut TransformContext) {
    for t in transforms {
        t.enter(node, ctx);
    }
    match node {
        Node::Interpolation(_) => ctx.helper(Helper::ToDisplayString),
        Node::Element(element) => traverse_children(&mut element.children, transforms, ctx),
        Node::Compound(parts) => {
            for part in parts.iter_mut() {
                traverse_node(part, transforms, ctx);
            }
        }
        Node::Text(_) => {}
    }
    for t in transforms.iter().rev() {
        t.exit(node, ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ast::{Element, Expression};
    use crate::compiler::parse::parse;

    fn transformed(template: &str) -> Root {
        let mut root = parse(template).unwrap();
        transform(&mut root, &default_transforms());
        root
    }

    #[test]
    fn test_expression_prefix() {
        let root = transformed("{{ user.name }}");
        let Node::Interpolation(expr) = &root.children[0] else {
            panic!("expected interpolation");
        };
        assert_eq!(expr.raw, "user.name");
        assert_eq!(expr.content, "_ctx.user.name");
    }

    #[test]
    fn test_text_merge() {
        let root = transformed("<div>hi, {{ name }}!<p>x</p>a{{ b }}</div>");
        let Node::Element(Element { children, .. }) = &root.children[0] else {
            panic!("expected element");
        };
        assert_eq!(children.len(), 3);
        assert!(matches!(&children[0], Node::Compound(parts) if parts.len() == 3));
        assert!(matches!(&children[1], Node::Element(_)));
        assert!(matches!(&children[2], Node::Compound(parts) if parts.len() == 2));
    }

    #[test]
    fn test_helpers_in_first_use_order() {
        // the interpolation is reached before the element exits
        let root = transformed("<div>{{ a }}</div>");
        assert_eq!(root.helpers, vec![Helper::ToDisplayString, Helper::CreateElementVNode]);

        let root = transformed("<p></p>{{ a }}");
        assert_eq!(root.helpers, vec![Helper::CreateElementVNode, Helper::ToDisplayString]);

        assert!(transformed("hi").helpers.is_empty());
    }

    #[test]
    fn test_custom_transform_list() {
        let mut root = parse("{{ msg }}").unwrap();
        transform(&mut root, &[]);
        assert_eq!(root.children, vec![Node::Interpolation(Expression::new("msg"))]);
        assert_eq!(root.helpers, vec![Helper::ToDisplayString]);
    }
}
