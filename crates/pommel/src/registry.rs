/*
 * registry.rs
 * Copyright (c) 2025 the pommel authors
 */

//! Helper registry and invocation types.
//!
//! A helper is one of two closed shapes: a *value helper* writes directly to
//! the output sink, a *block helper* additionally receives handles to its
//! compiled positive and negative bodies. Each engine consults two
//! registries: its own instance registry and an explicitly-passed defaults
//! registry (carrying the built-ins), with instance entries shadowing
//! defaults.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::TemplateResult;
use crate::render::{BlockBodies, Output};
use crate::value::Value;

/// Result type returned by helper callbacks.
pub type HelperResult = TemplateResult<()>;

/// The resolved invocation a helper receives: the current context value and
/// the materialized positional and named arguments.
pub struct HelperInput<'a> {
    pub(crate) name: &'a str,
    pub(crate) context: &'a Value,
    pub(crate) args: &'a [Value],
    pub(crate) named: &'a IndexMap<String, Value>,
}

impl<'a> HelperInput<'a> {
    /// The name the helper was invoked as.
    pub fn name(&self) -> &str {
        self.name
    }

    /// The current context value at the call site.
    pub fn context(&self) -> &Value {
        self.context
    }

    /// All positional arguments, resolved in call order.
    pub fn args(&self) -> &[Value] {
        self.args
    }

    /// Positional argument by index.
    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.args.get(index)
    }

    /// Named (`key=value`) argument by key.
    pub fn named(&self, key: &str) -> Option<&'a Value> {
        self.named.get(key)
    }
}

/// Value helper: `(sink, input) -> result`. Writes are append-only and
/// unescaped; the helper must not retain the sink.
pub type ValueHelperFn =
    dyn Fn(&mut dyn Output, &HelperInput<'_>) -> HelperResult + Send + Sync;

/// Block helper: `(sink, input, bodies) -> result`. The bodies handle can
/// render the positive or negative body any number of times, with any
/// context value.
pub type BlockHelperFn =
    dyn Fn(&mut dyn Output, &HelperInput<'_>, &mut BlockBodies<'_, '_, '_>) -> HelperResult
        + Send
        + Sync;

/// A registered helper callback.
pub enum Helper {
    /// Writes output directly.
    Value(Box<ValueHelperFn>),
    /// Controls rendering of its block bodies.
    Block(Box<BlockHelperFn>),
}

impl std::fmt::Debug for Helper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Helper::Value(_) => f.write_str("Helper::Value"),
            Helper::Block(_) => f.write_str("Helper::Block"),
        }
    }
}

/// Mapping from helper name to callback.
#[derive(Debug, Default)]
pub struct HelperRegistry {
    helpers: HashMap<String, Arc<Helper>>,
}

impl HelperRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in block helpers
    /// (`if`, `unless`, `each`, `with`).
    pub fn builtins() -> Self {
        let mut registry = Self::new();
        crate::helpers::register_builtins(&mut registry);
        registry
    }

    /// Insert or replace a helper.
    pub fn register(&mut self, name: impl Into<String>, helper: Helper) {
        self.helpers.insert(name.into(), Arc::new(helper));
    }

    /// Register a value helper from a closure.
    pub fn register_value<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut dyn Output, &HelperInput<'_>) -> HelperResult + Send + Sync + 'static,
    {
        self.register(name, Helper::Value(Box::new(f)));
    }

    /// Register a block helper from a closure.
    pub fn register_block<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut dyn Output, &HelperInput<'_>, &mut BlockBodies<'_, '_, '_>) -> HelperResult
            + Send
            + Sync
            + 'static,
    {
        self.register(name, Helper::Block(Box::new(f)));
    }

    /// Look up a helper by name.
    pub fn get(&self, name: &str) -> Option<Arc<Helper>> {
        self.helpers.get(name).cloned()
    }

    /// Whether a helper with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }
}
