/*
 * render.rs
 * Copyright (c) 2025 the pommel authors
 */

//! Template rendering.
//!
//! Walks a compiled instruction sequence in document order against a frame
//! stack, streaming writes to an [`Output`] sink. All helper invocation and
//! implicit-section behavior lives here; the compiled template itself stays
//! immutable and shareable.

use std::borrow::Cow;

use indexmap::IndexMap;

use crate::compile::{CompiledTemplate, FragmentId, Op};
use crate::context::{FrameStack, IterationMeta};
use crate::engine::{Engine, EscapePolicy, MissingPolicy};
use crate::error::{TemplateError, TemplateResult};
use crate::path::{Argument, PathPlan};
use crate::registry::{Helper, HelperInput};
use crate::value::Value;

/// Append-only output sink for rendered text.
///
/// Helpers write through this trait; they must not retain the sink beyond
/// the call.
pub trait Output {
    fn write(&mut self, s: &str) -> TemplateResult<()>;
}

impl Output for String {
    fn write(&mut self, s: &str) -> TemplateResult<()> {
        self.push_str(s);
        Ok(())
    }
}

/// Adapter over any `fmt::Write`.
pub struct FmtWriter<'a, W: std::fmt::Write>(pub &'a mut W);

impl<W: std::fmt::Write> Output for FmtWriter<'_, W> {
    fn write(&mut self, s: &str) -> TemplateResult<()> {
        self.0.write_str(s)?;
        Ok(())
    }
}

/// Adapter over any `io::Write`.
pub struct IoWriter<'a, W: std::io::Write>(pub &'a mut W);

impl<W: std::io::Write> Output for IoWriter<'_, W> {
    fn write(&mut self, s: &str) -> TemplateResult<()> {
        self.0.write_all(s.as_bytes())?;
        Ok(())
    }
}

/// Per-render state: the frame stack plus depth accounting. Created fresh
/// for every render call and never shared.
pub(crate) struct RenderCtx<'e, 'data> {
    pub(crate) engine: &'e Engine,
    pub(crate) stack: FrameStack<'data>,
    pub(crate) partial_depth: usize,
}

/// Render a compiled template against root data. This is the render entry
/// point below layout composition.
pub(crate) fn render_compiled(
    engine: &Engine,
    template: &CompiledTemplate,
    data: &Value,
    out: &mut dyn Output,
) -> TemplateResult<()> {
    let mut rcx = RenderCtx {
        engine,
        stack: FrameStack::new(Cow::Borrowed(data)),
        partial_depth: 0,
    };
    render_ops(&mut rcx, template, &template.root, out)
}

fn render_ops(
    rcx: &mut RenderCtx<'_, '_>,
    template: &CompiledTemplate,
    ops: &[Op],
    out: &mut dyn Output,
) -> TemplateResult<()> {
    for op in ops {
        match op {
            Op::Text(text) => out.write(text)?,
            Op::Expression { plan, escape } => render_expression(rcx, plan, *escape, out)?,
            Op::HelperCall { name, args, named } => {
                render_helper_call(rcx, name, args, named, out)?;
            }
            Op::Block {
                name,
                plan,
                args,
                named,
                positive,
                negative,
            } => render_block(rcx, template, name, plan, args, named, *positive, *negative, out)?,
            Op::Partial { name, context } => {
                render_partial(rcx, template, name, context.as_ref(), out)?;
            }
        }
    }
    Ok(())
}

/// Write a path expression, HTML-escaped unless the raw form was used. A
/// bare name that matches a registered value helper invokes the helper
/// instead (helper shadows data).
fn render_expression(
    rcx: &mut RenderCtx<'_, '_>,
    plan: &PathPlan,
    escape: bool,
    out: &mut dyn Output,
) -> TemplateResult<()> {
    if let Some(name) = plan.as_bare_key() {
        if let Some(helper) = rcx.engine.find_helper(name) {
            if let Helper::Value(f) = &*helper {
                let context = rcx.stack.current_value().clone();
                let named = IndexMap::new();
                let input = HelperInput {
                    name,
                    context: &context,
                    args: &[],
                    named: &named,
                };
                return f(out, &input);
            }
        }
    }

    let rendered = match rcx.stack.resolve(plan)? {
        Some(value) => value.render(),
        None => {
            if rcx.engine.config().strict_paths {
                return Err(TemplateError::Render {
                    message: format!("path '{}' did not resolve", plan.raw),
                });
            }
            return Ok(());
        }
    };

    if escape && rcx.engine.config().escape == EscapePolicy::Html {
        out.write(&escape_html(&rendered))
    } else {
        out.write(&rendered)
    }
}

fn render_helper_call(
    rcx: &mut RenderCtx<'_, '_>,
    name: &str,
    args: &[Argument],
    named: &[(String, Argument)],
    out: &mut dyn Output,
) -> TemplateResult<()> {
    let Some(helper) = rcx.engine.find_helper(name) else {
        return match rcx.engine.config().missing_helper {
            MissingPolicy::Error => Err(TemplateError::HelperNotFound {
                name: name.to_owned(),
            }),
            MissingPolicy::Empty => {
                tracing::warn!(helper = name, "unregistered helper rendered as empty");
                Ok(())
            }
        };
    };
    match &*helper {
        Helper::Value(f) => {
            let (args, named) = materialize_args(rcx, args, named)?;
            let context = rcx.stack.current_value().clone();
            let input = HelperInput {
                name,
                context: &context,
                args: &args,
                named: &named,
            };
            f(out, &input)
        }
        Helper::Block(_) => Err(TemplateError::Render {
            message: format!("helper '{name}' is a block helper and requires a block"),
        }),
    }
}

#[allow(clippy::too_many_arguments)]
fn render_block(
    rcx: &mut RenderCtx<'_, '_>,
    template: &CompiledTemplate,
    name: &str,
    plan: &PathPlan,
    args: &[Argument],
    named: &[(String, Argument)],
    positive: FragmentId,
    negative: Option<FragmentId>,
    out: &mut dyn Output,
) -> TemplateResult<()> {
    match rcx.engine.find_helper(name) {
        Some(helper) => match &*helper {
            Helper::Block(f) => {
                let (args, named) = materialize_args(rcx, args, named)?;
                let context = rcx.stack.current_value().clone();
                let input = HelperInput {
                    name,
                    context: &context,
                    args: &args,
                    named: &named,
                };
                let mut bodies = BlockBodies {
                    rcx: &mut *rcx,
                    template,
                    positive,
                    negative,
                };
                f(out, &input, &mut bodies)
            }
            Helper::Value(_) => Err(TemplateError::Render {
                message: format!("helper '{name}' is a value helper and cannot open a block"),
            }),
        },
        None if args.is_empty() && named.is_empty() => {
            implicit_section(rcx, template, plan, positive, negative, out)
        }
        None => match rcx.engine.config().missing_helper {
            MissingPolicy::Error => Err(TemplateError::HelperNotFound {
                name: name.to_owned(),
            }),
            MissingPolicy::Empty => {
                tracing::warn!(helper = name, "unregistered block helper rendered as empty");
                Ok(())
            }
        },
    }
}

/// Section over a plain path: a non-empty list iterates the positive body
/// per element, any other truthy value re-scopes the positive body, and a
/// falsy or undefined value renders the negative body.
fn implicit_section(
    rcx: &mut RenderCtx<'_, '_>,
    template: &CompiledTemplate,
    plan: &PathPlan,
    positive: FragmentId,
    negative: Option<FragmentId>,
    out: &mut dyn Output,
) -> TemplateResult<()> {
    let resolved = rcx.stack.resolve(plan)?.map(Cow::into_owned);
    match resolved {
        Some(Value::List(items)) if !items.is_empty() => {
            let len = items.len();
            for (index, item) in items.into_iter().enumerate() {
                rcx.stack
                    .push(Cow::Owned(item), Some(IterationMeta::for_index(index, len)));
                let result = render_ops(rcx, template, template.fragment(positive), out);
                rcx.stack.pop();
                result?;
            }
            Ok(())
        }
        Some(value) if value.is_truthy() => {
            rcx.stack.push(Cow::Owned(value), None);
            let result = render_ops(rcx, template, template.fragment(positive), out);
            rcx.stack.pop();
            result
        }
        _ => match negative {
            Some(id) => render_ops(rcx, template, template.fragment(id), out),
            None => Ok(()),
        },
    }
}

fn render_partial(
    rcx: &mut RenderCtx<'_, '_>,
    template: &CompiledTemplate,
    name: &str,
    context: Option<&PathPlan>,
    out: &mut dyn Output,
) -> TemplateResult<()> {
    let max_depth = rcx.engine.config().max_partial_depth;
    if rcx.partial_depth >= max_depth {
        return Err(TemplateError::RecursivePartial {
            name: name.to_owned(),
            max_depth,
        });
    }

    let Some(partial) = rcx.engine.lookup_partial(name, template.origin())? else {
        return match rcx.engine.config().missing_partial {
            MissingPolicy::Error => Err(TemplateError::PartialNotFound {
                name: name.to_owned(),
            }),
            MissingPolicy::Empty => {
                tracing::debug!(partial = name, "missing partial rendered as empty");
                Ok(())
            }
        };
    };

    let root = match context {
        Some(plan) => rcx.stack.resolve_owned(plan)?,
        None => rcx.stack.current_value().clone(),
    };

    // A fresh, independent render: the partial cannot reach the caller's
    // frames through `../`.
    let mut sub = RenderCtx {
        engine: rcx.engine,
        stack: FrameStack::new(Cow::Owned(root)),
        partial_depth: rcx.partial_depth + 1,
    };
    render_ops(&mut sub, &partial, &partial.root, out)
}

/// Handles to a block helper's compiled bodies.
///
/// Each body can be rendered any number of times: in the current context,
/// re-scoped to a helper-supplied value, or re-scoped with iteration
/// metadata. Frames pushed here are popped before the call returns.
pub struct BlockBodies<'r, 'e, 'data> {
    rcx: &'r mut RenderCtx<'e, 'data>,
    template: &'r CompiledTemplate,
    positive: FragmentId,
    negative: Option<FragmentId>,
}

impl BlockBodies<'_, '_, '_> {
    /// Render the positive body in the current context.
    pub fn render_positive(&mut self, out: &mut dyn Output) -> TemplateResult<()> {
        self.render_fragment(Some(self.positive), Scope::Current, out)
    }

    /// Render the positive body with `value` as the new current context.
    pub fn render_positive_scoped(
        &mut self,
        out: &mut dyn Output,
        value: Value,
    ) -> TemplateResult<()> {
        self.render_fragment(Some(self.positive), Scope::Value(value), out)
    }

    /// Render the positive body for one iteration element.
    pub fn render_positive_iteration(
        &mut self,
        out: &mut dyn Output,
        value: Value,
        meta: IterationMeta,
    ) -> TemplateResult<()> {
        self.render_fragment(Some(self.positive), Scope::Iteration(value, meta), out)
    }

    /// Render the negative (`{{else}}`) body in the current context.
    /// Renders nothing when the block has no negative body.
    pub fn render_negative(&mut self, out: &mut dyn Output) -> TemplateResult<()> {
        self.render_fragment(self.negative, Scope::Current, out)
    }

    /// Render the negative body with `value` as the new current context.
    pub fn render_negative_scoped(
        &mut self,
        out: &mut dyn Output,
        value: Value,
    ) -> TemplateResult<()> {
        self.render_fragment(self.negative, Scope::Value(value), out)
    }

    /// Whether the block has an `{{else}}` body.
    pub fn has_negative(&self) -> bool {
        self.negative.is_some()
    }

    fn render_fragment(
        &mut self,
        id: Option<FragmentId>,
        scope: Scope,
        out: &mut dyn Output,
    ) -> TemplateResult<()> {
        let Some(id) = id else {
            return Ok(());
        };
        let ops = self.template.fragment(id);
        match scope {
            Scope::Current => render_ops(self.rcx, self.template, ops, out),
            Scope::Value(value) => {
                self.rcx.stack.push(Cow::Owned(value), None);
                let result = render_ops(self.rcx, self.template, ops, out);
                self.rcx.stack.pop();
                result
            }
            Scope::Iteration(value, meta) => {
                self.rcx.stack.push(Cow::Owned(value), Some(meta));
                let result = render_ops(self.rcx, self.template, ops, out);
                self.rcx.stack.pop();
                result
            }
        }
    }
}

enum Scope {
    Current,
    Value(Value),
    Iteration(Value, IterationMeta),
}

fn materialize_args(
    rcx: &RenderCtx<'_, '_>,
    args: &[Argument],
    named: &[(String, Argument)],
) -> TemplateResult<(Vec<Value>, IndexMap<String, Value>)> {
    let mut positional = Vec::with_capacity(args.len());
    for arg in args {
        positional.push(argument_value(rcx, arg)?);
    }
    let mut by_name = IndexMap::new();
    for (key, arg) in named {
        by_name.insert(key.clone(), argument_value(rcx, arg)?);
    }
    Ok((positional, by_name))
}

fn argument_value(rcx: &RenderCtx<'_, '_>, arg: &Argument) -> TemplateResult<Value> {
    match arg {
        Argument::Str(s) => Ok(Value::String(s.clone())),
        Argument::Num(n) => Ok(Value::Number(*n)),
        Argument::Bool(b) => Ok(Value::Bool(*b)),
        Argument::Path(plan) => rcx.stack.resolve_owned(plan),
    }
}

/// Escape `&`, `<`, `>`, `"`, and `'` for HTML output.
pub(crate) fn escape_html(s: &str) -> Cow<'_, str> {
    if !s
        .bytes()
        .any(|b| matches!(b, b'&' | b'<' | b'>' | b'"' | b'\''))
    {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_passthrough_borrows() {
        assert!(matches!(escape_html("plain text"), Cow::Borrowed(_)));
    }

    #[test]
    fn escape_html_special_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn fmt_writer_adapts() {
        let mut buf = String::new();
        let mut writer = FmtWriter(&mut buf);
        writer.write("hello").unwrap();
        assert_eq!(buf, "hello");
    }

    #[test]
    fn io_writer_adapts() {
        let mut buf = Vec::new();
        let mut writer = IoWriter(&mut buf);
        writer.write("hello").unwrap();
        assert_eq!(buf, b"hello");
    }
}
