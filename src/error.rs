//! Error types.
//!
//! Only structural failures are errors. Policy violations (writing through a
//! readonly proxy) are logged and dropped, and lookups that find nothing
//! (missing slot, missing injection) resolve to `None` / `Value::Undefined`.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Template compilation failed.
    #[error("template compile error: {0}")]
    Compile(#[from] CompileError),

    /// `App::mount` could not resolve its container selector.
    #[error("mount container not found: {selector}")]
    ContainerNotFound { selector: String },

    /// `App::mount` was called on an app that is already mounted.
    #[error("app is already mounted")]
    AlreadyMounted,
}

/// Template parse failures. All are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("element <{tag}> is missing its end tag")]
    MissingEndTag { tag: String },

    #[error("interpolation starting at offset {offset} is not closed with '}}}}'")]
    UnterminatedInterpolation { offset: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = Error::from(CompileError::MissingEndTag { tag: "div".into() });
        assert_eq!(
            err.to_string(),
            "template compile error: element <div> is missing its end tag"
        );

        let err = CompileError::UnterminatedInterpolation { offset: 3 };
        assert_eq!(
            err.to_string(),
            "interpolation starting at offset 3 is not closed with '}}'"
        );
    }
}
