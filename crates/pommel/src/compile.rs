/*
 * compile.rs
 * Copyright (c) 2025 the pommel authors
 */

//! Template compiler.
//!
//! Lowers the parsed node tree into a [`CompiledTemplate`]: an immutable
//! instruction sequence in which every path has been pre-parsed into a
//! lookup plan and every block body has become a fragment referenced by
//! index. Compilation is pure; the same tree always compiles to a
//! structurally equal template, which is what makes caching by source
//! identity sound and concurrent rendering safe.

use std::path::{Path, PathBuf};

use crate::ast::{Ast, Node, RawArg};
use crate::error::{TemplateError, TemplateResult};
use crate::path::{Argument, PathPlan, PathSegment, parse_argument, parse_path};

/// Index of a compiled block body in the fragment table.
pub(crate) type FragmentId = usize;

/// One compiled instruction.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Op {
    /// Append literal text.
    Text(String),

    /// Resolve a path and write it, escaped unless the raw form was used.
    Expression { plan: PathPlan, escape: bool },

    /// Invoke a value helper with arguments.
    HelperCall {
        name: String,
        args: Vec<Argument>,
        named: Vec<(String, Argument)>,
    },

    /// Invoke a block helper (or an implicit section over `plan`).
    Block {
        name: String,
        plan: PathPlan,
        args: Vec<Argument>,
        named: Vec<(String, Argument)>,
        positive: FragmentId,
        negative: Option<FragmentId>,
    },

    /// Resolve and render a partial, optionally re-rooted at `context`.
    Partial {
        name: String,
        context: Option<PathPlan>,
    },
}

/// An immutable, reentrant compiled template.
///
/// Holds no render-time state; any number of renders may evaluate the same
/// `CompiledTemplate` concurrently against independent context stacks.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    pub(crate) root: Vec<Op>,
    pub(crate) fragments: Vec<Vec<Op>>,
    pub(crate) layout: Option<String>,
    pub(crate) origin: Option<PathBuf>,
}

impl CompiledTemplate {
    /// The layout name declared by a leading `{{!< name}}` directive.
    pub fn layout(&self) -> Option<&str> {
        self.layout.as_deref()
    }

    /// The file this template was loaded from, when it came from a file.
    /// Partial and layout references resolve relative to this path.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    pub(crate) fn fragment(&self, id: FragmentId) -> &[Op] {
        &self.fragments[id]
    }

    /// Count `body` placeholder expressions across the whole template.
    /// Layout composition requires exactly one.
    pub(crate) fn count_body_placeholders(&self) -> usize {
        fn count(ops: &[Op]) -> usize {
            ops.iter()
                .filter(|op| {
                    matches!(op, Op::Expression { plan, .. }
                        if plan.parents == 0
                            && matches!(plan.segments.as_slice(),
                                [PathSegment::Key(k)] if k == "body"))
                })
                .count()
        }
        count(&self.root) + self.fragments.iter().map(|f| count(f)).sum::<usize>()
    }
}

/// Compile a parsed template.
pub(crate) fn compile_ast(ast: &Ast) -> TemplateResult<CompiledTemplate> {
    let mut fragments = Vec::new();
    let root = compile_nodes(&ast.nodes, &mut fragments)?;
    Ok(CompiledTemplate {
        root,
        fragments,
        layout: ast.layout.clone(),
        origin: None,
    })
}

fn compile_nodes(nodes: &[Node], fragments: &mut Vec<Vec<Op>>) -> TemplateResult<Vec<Op>> {
    let mut ops = Vec::new();
    for node in nodes {
        match node {
            Node::Text(t) => ops.push(Op::Text(t.text.clone())),
            Node::Comment(_) => {}
            Node::Expression(e) => {
                if e.args.is_empty() {
                    ops.push(Op::Expression {
                        plan: parse_path(&e.path, e.span.start)?,
                        escape: e.escape,
                    });
                } else {
                    let name = helper_name(&e.path, e.span.start)?;
                    let (args, named) = compile_args(&e.args)?;
                    ops.push(Op::HelperCall { name, args, named });
                }
            }
            Node::Block(b) => {
                let plan = parse_path(&b.name, b.span.start)?;
                let (args, named) = compile_args(&b.args)?;
                let positive_ops = compile_nodes(&b.positive, fragments)?;
                let positive = push_fragment(fragments, positive_ops);
                let negative = match &b.negative {
                    Some(body) => {
                        let negative_ops = compile_nodes(body, fragments)?;
                        Some(push_fragment(fragments, negative_ops))
                    }
                    None => None,
                };
                ops.push(Op::Block {
                    name: b.name.clone(),
                    plan,
                    args,
                    named,
                    positive,
                    negative,
                });
            }
            Node::Partial(p) => {
                let context = match &p.context_path {
                    Some(path) => Some(parse_path(path, p.span.start)?),
                    None => None,
                };
                ops.push(Op::Partial {
                    name: p.name.clone(),
                    context,
                });
            }
        }
    }
    Ok(ops)
}

fn push_fragment(fragments: &mut Vec<Vec<Op>>, ops: Vec<Op>) -> FragmentId {
    fragments.push(ops);
    fragments.len() - 1
}

/// A helper invoked with arguments must be named by a simple identifier.
fn helper_name(word: &str, offset: usize) -> TemplateResult<String> {
    let name = word.trim();
    if name.is_empty() || name.contains(['.', '/', '[', ']']) {
        return Err(TemplateError::Parse {
            message: format!("helper name must be a simple identifier, found '{name}'"),
            offset,
        });
    }
    Ok(name.to_owned())
}

/// Split raw argument words into positional and `name=value` named
/// arguments, each pre-parsed.
fn compile_args(raw: &[RawArg]) -> TemplateResult<(Vec<Argument>, Vec<(String, Argument)>)> {
    let mut args = Vec::new();
    let mut named = Vec::new();
    for arg in raw {
        match split_named(&arg.text) {
            Some((key, value)) => {
                named.push((key.to_owned(), parse_argument(value, arg.span.start)?));
            }
            None => args.push(parse_argument(&arg.text, arg.span.start)?),
        }
    }
    Ok((args, named))
}

/// Detect a `name=value` argument. The name must be a plain identifier and
/// the word must not be a string literal.
fn split_named(word: &str) -> Option<(&str, &str)> {
    if word.starts_with('"') {
        return None;
    }
    let eq = word.find('=')?;
    let key = &word[..eq];
    if key.is_empty()
        || !key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return None;
    }
    Some((key, &word[eq + 1..]))
}
