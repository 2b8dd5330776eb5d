/*
 * error.rs
 * Copyright (c) 2025 the pommel authors
 */

//! Error types for template parsing and rendering.

use thiserror::Error;

/// Errors that can occur during template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A tag was opened but never closed.
    #[error("unterminated tag at offset {offset}")]
    UnterminatedTag { offset: usize },

    /// A closing tag did not match the innermost open block.
    #[error("mismatched closing tag at offset {offset}: expected '{expected}', found '{found}'")]
    MismatchedBlock {
        expected: String,
        found: String,
        offset: usize,
    },

    /// End of input was reached with an open block.
    #[error("unclosed block '{name}' opened at offset {offset}")]
    UnclosedBlock { name: String, offset: usize },

    /// Any other syntax error in the template source.
    #[error("parse error at offset {offset}: {message}")]
    Parse { message: String, offset: usize },

    /// A helper was invoked but is registered in neither the instance nor
    /// the defaults registry.
    #[error("helper not found: {name}")]
    HelperNotFound { name: String },

    /// A helper callback reported a failure.
    #[error("helper '{name}' failed: {message}")]
    Helper { name: String, message: String },

    /// No candidate file exists for a referenced template name.
    #[error("partial not found: {name}")]
    PartialNotFound { name: String },

    /// `../` traversal walked past the root frame.
    #[error("context depth exceeded resolving '{path}'")]
    ContextDepth { path: String },

    /// Recursive partial inclusion exceeded the depth ceiling.
    #[error("recursive partial inclusion detected (depth > {max_depth}): {name}")]
    RecursivePartial { name: String, max_depth: usize },

    /// Layout composition exceeded the depth ceiling, which indicates a
    /// layout cycle.
    #[error("layout recursion detected (depth > {max_depth}): {name}")]
    LayoutCycle { name: String, max_depth: usize },

    /// A layout template does not contain exactly one body placeholder.
    #[error("layout '{name}' must contain exactly one {{{{body}}}} placeholder")]
    InvalidLayout { name: String },

    /// A render-time fault surfaced under strict configuration, or a helper
    /// used in the wrong position.
    #[error("render error: {message}")]
    Render { message: String },

    /// Reading a referenced template failed.
    #[error("error reading template '{name}'")]
    TemplateIo {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error from an output sink.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Formatter error from an output sink.
    #[error("write error: {0}")]
    Write(#[from] std::fmt::Error),
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
