/*
 * lib.rs
 * Copyright (c) 2025 the pommel authors
 */

//! Handlebars-style template engine.
//!
//! pommel compiles mustache-delimited templates into immutable, reusable
//! executables and renders them against hierarchical data. It supports:
//!
//! - Escaped and raw interpolation: `{{expr}}`, `{{{expr}}}`
//! - Block helpers: `{{#helper args}}...{{else}}...{{/helper}}`
//! - Inverse sections: `{{^name}}...{{/name}}`
//! - Implicit sections over paths: `{{#posts}}...{{/posts}}`
//! - Partials: `{{> name}}`, `{{> name contextPath}}`
//! - Comments: `{{! ... }}`, `{{!-- ... --}}`
//! - Layout directives: `{{!< layoutName}}` with `{{{body}}}` substitution
//! - Paths: `this`, `../` ancestor traversal, dotted and `[bracketed]`
//!   segments, `@index`/`@key`/`@first`/`@last`
//!
//! # Architecture
//!
//! Source text flows through the tokenizer ([`lexer`]), the parser
//! ([`parser`]), and the compiler ([`compile`]) into a [`CompiledTemplate`]:
//! an immutable instruction sequence with every path pre-parsed into a
//! lookup plan. Rendering ([`render`]) walks the instructions against a
//! per-call context stack ([`context`]), so one compiled template can be
//! rendered from many threads at once. Templates referenced by name
//! (partials, layouts, views) are obtained through the [`FileSystem`]
//! collaborator and cached compiled ([`resolver`]).
//!
//! # Example
//!
//! ```
//! use pommel::{Engine, Value};
//!
//! let mut engine = Engine::new();
//! engine.register_value_helper("shout", |out, input| {
//!     let text = input.arg(0).map(Value::render).unwrap_or_default();
//!     out.write(&text.to_uppercase())
//! });
//!
//! let template = engine.compile("Hello, {{name}}! {{shout \"hi\"}}").unwrap();
//! let data = Value::from(serde_json::json!({ "name": "World" }));
//! assert_eq!(engine.render(&template, &data).unwrap(), "Hello, World! HI");
//! ```

pub mod ast;
pub mod compile;
pub mod context;
pub mod engine;
pub mod error;
pub mod helpers;
pub mod lexer;
pub mod parser;
pub mod path;
pub mod registry;
pub mod render;
pub mod resolver;
pub mod value;

// Re-export main types at crate root
pub use compile::CompiledTemplate;
pub use context::IterationMeta;
pub use engine::{Engine, EngineConfig, EscapePolicy, MissingPolicy, View};
pub use error::{TemplateError, TemplateResult};
pub use lexer::Delimiters;
pub use registry::{Helper, HelperInput, HelperRegistry, HelperResult};
pub use render::{BlockBodies, FmtWriter, IoWriter, Output};
pub use resolver::{DiskFileSystem, FileSystem, MemoryFileSystem};
pub use value::{Value, to_value};
