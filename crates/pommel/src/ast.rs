/*
 * ast.rs
 * Copyright (c) 2025 the pommel authors
 */

//! Template AST types.
//!
//! The parser produces an [`Ast`]: an ordered tree of [`Node`]s plus the
//! template-level layout binding. Path and argument text is kept raw at this
//! stage; the compiler owns path syntax.

use crate::lexer::Span;

/// A parsed template: the root node sequence and layout metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    /// Root nodes in document order.
    pub nodes: Vec<Node>,
    /// Layout name from a leading `{{!< name}}` directive.
    pub layout: Option<String>,
}

/// A node in the template tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text emitted as-is.
    Text(TextNode),

    /// Mustache expression: `{{path}}`, `{{{path}}}`, or `{{helper args...}}`.
    Expression(ExpressionNode),

    /// Block: `{{#name args}}...{{else}}...{{/name}}` or the inverse form
    /// `{{^name}}...{{/name}}`.
    Block(BlockNode),

    /// Partial reference: `{{> name [contextPath]}}`.
    Partial(PartialNode),

    /// Comment: `{{! ... }}` or `{{!-- ... --}}`. Produces no output.
    Comment(CommentNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionNode {
    /// The path (or helper name): the first word of the tag interior.
    pub path: String,
    /// Raw argument words. Non-empty means this is a helper invocation.
    pub args: Vec<RawArg>,
    /// False for the triple-mustache raw form.
    pub escape: bool,
    pub span: Span,
}

/// An unparsed argument word, as split by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct RawArg {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode {
    /// Helper name or section path.
    pub name: String,
    pub args: Vec<RawArg>,
    /// Body rendered when the block applies.
    pub positive: Vec<Node>,
    /// Body rendered otherwise (`{{else}}` or the inverse form).
    pub negative: Option<Vec<Node>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartialNode {
    pub name: String,
    /// Optional path the partial is re-rooted at.
    pub context_path: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentNode {
    pub span: Span,
}
