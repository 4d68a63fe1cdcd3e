//! Template compiler.
//!
//! ```text
//! template ──parse──▶ AST ──transform──▶ AST + helpers ──┬─ codegen ──▶ source text
//!                                                        └─ build ────▶ RenderFn
//! ```
//!
//! The grammar is elements, text and `{{ path }}` interpolation. Attributes
//! are skipped and there are no directives.
//!
//! ```
//! use spark_vdom::compiler::compile;
//!
//! let out = compile("{{message}}").unwrap();
//! assert_eq!(
//!     out.code,
//!     "const { toDisplayString: _toDisplayString } = Vue\n\
//!      return function render(_ctx, _cache) { return _toDisplayString(_ctx.message) }"
//! );
//! ```

pub mod ast;
pub mod codegen;
pub mod parse;
pub mod render_fn;
pub mod transform;

use crate::component::RenderFn;
use crate::error::Result;

pub use ast::{Helper, Node, Root};
pub use parse::parse;
pub use transform::{NodeTransform, TransformContext, default_transforms, transform};

/// Output of [`compile`].
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Generated render-function source.
    pub code: String,
    /// The transformed AST.
    pub ast: Root,
}

/// Parse, transform and generate source for `template`.
pub fn compile(template: &str) -> Result<CompileResult> {
    let mut ast = parse(template)?;
    transform(&mut ast, &default_transforms());
    let code = codegen::generate(&ast);
    Ok(CompileResult { code, ast })
}

/// Compile `template` into a render function. This is the compiler a new
/// [`Runtime`](crate::Runtime) registers.
pub fn compile_to_render(template: &str) -> Result<RenderFn> {
    let mut ast = parse(template)?;
    transform(&mut ast, &default_transforms());
    Ok(render_fn::build(ast))
}
