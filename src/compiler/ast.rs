//! Template AST.

/// Parsed template: top-level nodes plus the runtime helpers codegen needs
/// (filled in by the transform pass, in first-use order).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Root {
    pub children: Vec<Node>,
    pub helpers: Vec<Helper>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    /// `{{ expr }}`
    Interpolation(Expression),
    /// Adjacent text and interpolations merged into one `a + b` expression.
    Compound(Vec<Node>),
}

impl Node {
    /// Text and interpolations: the parts a compound expression is made of.
    pub fn is_text_like(&self) -> bool {
        matches!(self, Node::Text(_) | Node::Interpolation(_) | Node::Compound(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    /// Path as written in the template, trimmed (`user.name`).
    pub raw: String,
    /// Generated source (`_ctx.user.name` after the expression transform).
    pub content: String,
}

impl Expression {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            content: raw.clone(),
            raw,
        }
    }
}

/// Runtime functions generated code imports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Helper {
    ToDisplayString,
    CreateElementVNode,
}

impl Helper {
    pub fn name(self) -> &'static str {
        match self {
            Helper::ToDisplayString => "toDisplayString",
            Helper::CreateElementVNode => "createElementVNode",
        }
    }

    /// Local alias in generated code (`_toDisplayString`).
    pub fn alias(self) -> String {
        format!("_{}", self.name())
    }
}
