/*
 * engine.rs
 * Copyright (c) 2025 the pommel authors
 */

//! The public engine façade.
//!
//! An [`Engine`] owns the configuration, the helper registries, the
//! file-lookup collaborator, and the compiled-template store. Registration
//! takes `&mut self` and rendering takes `&self`, so a shared engine is
//! set up first and rendered from concurrently afterwards.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::compile::{CompiledTemplate, compile_ast};
use crate::error::{TemplateError, TemplateResult};
use crate::lexer::{Delimiters, tokenize};
use crate::parser::parse;
use crate::registry::{Helper, HelperInput, HelperRegistry, HelperResult};
use crate::render::{BlockBodies, Output, render_compiled};
use crate::resolver::{
    DiskFileSystem, FileSystem, TemplateStore, candidate_paths, remove_final_newline,
};
use crate::value::Value;

/// What to do when a referenced helper or partial is not registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Fail the render.
    Error,
    /// Render nothing.
    Empty,
}

/// Escaping applied to path-expression output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapePolicy {
    /// HTML-escape `{{expr}}` output; `{{{expr}}}` stays raw.
    Html,
    /// Never escape.
    None,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Surface unresolved expression paths as errors instead of empty
    /// output.
    pub strict_paths: bool,
    /// Policy for helpers that are referenced but never registered.
    /// Defaults to [`MissingPolicy::Error`] to catch typos early.
    pub missing_helper: MissingPolicy,
    /// Policy for `{{> name}}` references with no candidate file.
    /// Defaults to [`MissingPolicy::Empty`].
    pub missing_partial: MissingPolicy,
    /// Escaping policy for expression output.
    pub escape: EscapePolicy,
    /// Partial nesting ceiling.
    pub max_partial_depth: usize,
    /// Layout composition ceiling; exceeding it indicates a layout cycle.
    pub max_layout_depth: usize,
    /// Mustache delimiters.
    pub delimiters: Delimiters,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_paths: false,
            missing_helper: MissingPolicy::Error,
            missing_partial: MissingPolicy::Empty,
            escape: EscapePolicy::Html,
            max_partial_depth: 50,
            max_layout_depth: 16,
            delimiters: Delimiters::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strict_paths(mut self, strict: bool) -> Self {
        self.strict_paths = strict;
        self
    }

    pub fn with_missing_helper(mut self, policy: MissingPolicy) -> Self {
        self.missing_helper = policy;
        self
    }

    pub fn with_missing_partial(mut self, policy: MissingPolicy) -> Self {
        self.missing_partial = policy;
        self
    }

    pub fn with_escape(mut self, escape: EscapePolicy) -> Self {
        self.escape = escape;
        self
    }

    pub fn with_max_partial_depth(mut self, depth: usize) -> Self {
        self.max_partial_depth = depth;
        self
    }

    pub fn with_max_layout_depth(mut self, depth: usize) -> Self {
        self.max_layout_depth = depth;
        self
    }

    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters = delimiters;
        self
    }
}

/// The template engine: compiles templates and renders them against data.
pub struct Engine {
    config: EngineConfig,
    helpers: HelperRegistry,
    defaults: Arc<HelperRegistry>,
    file_system: Arc<dyn FileSystem>,
    store: TemplateStore,
    partials: HashMap<String, Arc<CompiledTemplate>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with default configuration, the built-in helpers as its
    /// defaults registry, and disk lookup rooted at the current directory.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            helpers: HelperRegistry::new(),
            defaults: Arc::new(HelperRegistry::builtins()),
            file_system: Arc::new(DiskFileSystem::default()),
            store: TemplateStore::new(),
            partials: HashMap::new(),
        }
    }

    /// Replace the file-lookup collaborator.
    pub fn with_file_system(mut self, fs: impl FileSystem + 'static) -> Self {
        self.file_system = Arc::new(fs);
        self
    }

    /// Replace the defaults registry. Instance registrations shadow entries
    /// in it.
    pub fn with_defaults(mut self, defaults: Arc<HelperRegistry>) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a helper in the instance registry, replacing any existing
    /// entry with the same name.
    pub fn register_helper(&mut self, name: impl Into<String>, helper: Helper) {
        self.helpers.register(name, helper);
    }

    /// Register a value helper from a closure.
    pub fn register_value_helper<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut dyn Output, &HelperInput<'_>) -> HelperResult + Send + Sync + 'static,
    {
        self.helpers.register_value(name, f);
    }

    /// Register a block helper from a closure.
    pub fn register_block_helper<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut dyn Output, &HelperInput<'_>, &mut BlockBodies<'_, '_, '_>) -> HelperResult
            + Send
            + Sync
            + 'static,
    {
        self.helpers.register_block(name, f);
    }

    /// Compile and register an inline partial. Registered partials are
    /// consulted before file lookup.
    pub fn register_partial(
        &mut self,
        name: impl Into<String>,
        source: &str,
    ) -> TemplateResult<()> {
        let template = self.compile(remove_final_newline(source))?;
        self.partials.insert(name.into(), Arc::new(template));
        Ok(())
    }

    /// Compile template source into an immutable, reusable
    /// [`CompiledTemplate`].
    pub fn compile(&self, source: &str) -> TemplateResult<CompiledTemplate> {
        let tokens = tokenize(source, &self.config.delimiters)?;
        compile_ast(&parse(&tokens)?)
    }

    /// Render a compiled template against data, applying layout composition
    /// when the template declares a layout.
    pub fn render(&self, template: &CompiledTemplate, data: &Value) -> TemplateResult<String> {
        let mut output = String::new();
        render_compiled(self, template, data, &mut output)?;

        let mut layout_name = template.layout.clone();
        let mut referrer = template.origin.clone();
        let mut depth = 0;
        while let Some(name) = layout_name {
            depth += 1;
            if depth > self.config.max_layout_depth {
                return Err(TemplateError::LayoutCycle {
                    name,
                    max_depth: self.config.max_layout_depth,
                });
            }
            let layout = self.resolve_view(&name, referrer.as_deref())?;
            if layout.count_body_placeholders() != 1 {
                return Err(TemplateError::InvalidLayout { name });
            }
            let body = std::mem::take(&mut output);
            render_compiled(self, &layout, &with_body(data, body), &mut output)?;
            layout_name = layout.layout.clone();
            referrer = layout.origin.clone();
        }
        Ok(output)
    }

    /// Render a compiled template to an output sink.
    pub fn render_to(
        &self,
        template: &CompiledTemplate,
        data: &Value,
        out: &mut dyn Output,
    ) -> TemplateResult<()> {
        if template.layout.is_some() {
            // Layout composition buffers the child body regardless.
            let rendered = self.render(template, data)?;
            out.write(&rendered)
        } else {
            render_compiled(self, template, data, out)
        }
    }

    /// Compile and render in one step.
    pub fn render_template(&self, source: &str, data: &Value) -> TemplateResult<String> {
        let template = self.compile(source)?;
        self.render(&template, data)
    }

    /// Resolve a template by logical name through the file-lookup
    /// collaborator and return a reusable view over it. Fails with
    /// [`TemplateError::PartialNotFound`] when no candidate file exists.
    pub fn compile_view(&self, name: &str) -> TemplateResult<View<'_>> {
        let template = self.resolve_view(name, None)?;
        Ok(View {
            engine: self,
            template,
        })
    }

    pub(crate) fn find_helper(&self, name: &str) -> Option<Arc<Helper>> {
        self.helpers.get(name).or_else(|| self.defaults.get(name))
    }

    /// Resolve a partial by name: registered partials first, then file
    /// lookup relative to the referencing template.
    pub(crate) fn lookup_partial(
        &self,
        name: &str,
        referrer: Option<&Path>,
    ) -> TemplateResult<Option<Arc<CompiledTemplate>>> {
        if let Some(template) = self.partials.get(name) {
            return Ok(Some(template.clone()));
        }
        for candidate in candidate_paths(self.file_system.as_ref(), name, referrer) {
            if let Some(template) = self.store.get(&candidate) {
                tracing::debug!(path = %candidate.display(), "template cache hit");
                return Ok(Some(template));
            }
            if self.file_system.exists(&candidate) {
                return Ok(Some(self.load_template(&candidate, name)?));
            }
        }
        Ok(None)
    }

    /// Resolve a view or layout by name; a miss is fatal.
    fn resolve_view(
        &self,
        name: &str,
        referrer: Option<&Path>,
    ) -> TemplateResult<Arc<CompiledTemplate>> {
        for candidate in candidate_paths(self.file_system.as_ref(), name, referrer) {
            if let Some(template) = self.store.get(&candidate) {
                tracing::debug!(path = %candidate.display(), "template cache hit");
                return Ok(template);
            }
            if self.file_system.exists(&candidate) {
                return Ok(self.load_template(&candidate, name)?);
            }
        }
        Err(TemplateError::PartialNotFound {
            name: name.to_owned(),
        })
    }

    fn load_template(&self, path: &Path, name: &str) -> TemplateResult<Arc<CompiledTemplate>> {
        let source = self
            .file_system
            .read(path)
            .map_err(|e| TemplateError::TemplateIo {
                name: name.to_owned(),
                source: e,
            })?;
        let mut template = self.compile(&source)?;
        template.origin = Some(path.to_owned());
        let template = Arc::new(template);
        self.store.insert(path.to_owned(), template.clone());
        tracing::debug!(path = %path.display(), "compiled template");
        Ok(template)
    }
}

/// Extend the root data with the rendered child body for layout
/// composition.
fn with_body(data: &Value, body: String) -> Value {
    let mut map = match data {
        Value::Map(m) => m.clone(),
        _ => IndexMap::new(),
    };
    map.insert("body".to_owned(), Value::String(body));
    Value::Map(map)
}

/// A compiled view bound to its engine: the `compile_view` result, callable
/// per data set.
pub struct View<'e> {
    engine: &'e Engine,
    template: Arc<CompiledTemplate>,
}

impl std::fmt::Debug for View<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

impl View<'_> {
    /// Render this view, including its layout chain.
    pub fn render(&self, data: &Value) -> TemplateResult<String> {
        self.engine.render(&self.template, data)
    }

    /// The underlying compiled template.
    pub fn template(&self) -> &CompiledTemplate {
        &self.template
    }
}
