/*
 * parser.rs
 * Copyright (c) 2025 the pommel authors
 */

//! Template parser.
//!
//! Consumes the token sequence from the lexer and builds the node tree,
//! enforcing block balance with a pending-block stack: opening a block
//! pushes its name, a closing tag pops and must match. The layout directive
//! is recognized only as the first meaningful content and recorded as
//! template-level metadata.

use crate::ast::{
    Ast, BlockNode, CommentNode, ExpressionNode, Node, PartialNode, RawArg, TextNode,
};
use crate::error::{TemplateError, TemplateResult};
use crate::lexer::{Span, Token, TokenKind};

/// A block that has been opened but not yet closed.
struct PendingBlock {
    name: String,
    args: Vec<RawArg>,
    span: Span,
    inverse: bool,
    /// Body accumulated before an `{{else}}`, once one is seen.
    first_body: Option<Vec<Node>>,
    /// The node list that was current when this block opened.
    saved: Vec<Node>,
}

/// One lexed tag: its sigil (if any), interior text, and spans.
struct TagGroup<'src> {
    open_kind: TokenKind,
    sigil: Option<TokenKind>,
    raw: &'src str,
    raw_span: Span,
    tag_span: Span,
}

/// Parse a token sequence into a template AST.
pub fn parse(tokens: &[Token<'_>]) -> TemplateResult<Ast> {
    let mut layout: Option<String> = None;
    let mut stack: Vec<PendingBlock> = Vec::new();
    let mut current: Vec<Node> = Vec::new();
    let mut saw_content = false;

    let mut i = 0;
    while i < tokens.len() {
        let tok = &tokens[i];
        match tok.kind {
            TokenKind::Text => {
                if !tok.text.is_empty() {
                    if !tok.text.chars().all(char::is_whitespace) {
                        saw_content = true;
                    }
                    current.push(Node::Text(TextNode {
                        text: tok.text.to_owned(),
                        span: tok.span,
                    }));
                }
                i += 1;
            }
            TokenKind::Open | TokenKind::OpenTriple => {
                let (group, next) = read_group(tokens, i);
                handle_group(
                    &group,
                    &mut layout,
                    &mut stack,
                    &mut current,
                    &mut saw_content,
                )?;
                i = next;
            }
            // Well-formed token streams only reach tag-interior tokens via
            // read_group; skip defensively otherwise.
            _ => i += 1,
        }
    }

    if let Some(pending) = stack.last() {
        return Err(TemplateError::UnclosedBlock {
            name: pending.name.clone(),
            offset: pending.span.start,
        });
    }

    Ok(Ast {
        nodes: current,
        layout,
    })
}

/// Collect one tag's tokens starting at the Open/OpenTriple at `i`.
/// Returns the group and the index just past its closing token.
fn read_group<'src>(tokens: &[Token<'src>], i: usize) -> (TagGroup<'src>, usize) {
    let open = &tokens[i];
    let mut sigil = None;
    let mut raw = "";
    let mut raw_span = Span::new(open.span.end, open.span.end);
    let mut j = i + 1;
    while j < tokens.len() {
        match tokens[j].kind {
            TokenKind::Close | TokenKind::CloseTriple => break,
            TokenKind::RawText => {
                raw = tokens[j].text;
                raw_span = tokens[j].span;
                j += 1;
            }
            kind => {
                sigil = Some(kind);
                j += 1;
            }
        }
    }
    let tag_end = tokens.get(j).map_or(open.span.end, |t| t.span.end);
    (
        TagGroup {
            open_kind: open.kind,
            sigil,
            raw,
            raw_span,
            tag_span: Span::new(open.span.start, tag_end),
        },
        j + 1,
    )
}

fn handle_group(
    group: &TagGroup<'_>,
    layout: &mut Option<String>,
    stack: &mut Vec<PendingBlock>,
    current: &mut Vec<Node>,
    saw_content: &mut bool,
) -> TemplateResult<()> {
    match group.sigil {
        None => {
            if group.raw.trim() == "else" {
                return begin_else(group, stack, current);
            }
            let escape = group.open_kind == TokenKind::Open;
            let mut words = split_words(group.raw, group.raw_span.start)?;
            if words.is_empty() {
                return Err(TemplateError::Parse {
                    message: "empty tag".to_owned(),
                    offset: group.tag_span.start,
                });
            }
            let path = words.remove(0);
            if path.text.starts_with('"') {
                return Err(TemplateError::Parse {
                    message: "expected a path or helper name, found a string literal".to_owned(),
                    offset: path.span.start,
                });
            }
            *saw_content = true;
            current.push(Node::Expression(ExpressionNode {
                path: path.text,
                args: words,
                escape,
                span: group.tag_span,
            }));
            Ok(())
        }
        Some(TokenKind::BlockOpen) => {
            let mut words = split_words(group.raw, group.raw_span.start)?;
            if words.is_empty() {
                return Err(TemplateError::Parse {
                    message: "block tag requires a name".to_owned(),
                    offset: group.tag_span.start,
                });
            }
            let name = words.remove(0);
            *saw_content = true;
            stack.push(PendingBlock {
                name: name.text,
                args: words,
                span: group.tag_span,
                inverse: false,
                first_body: None,
                saved: std::mem::take(current),
            });
            Ok(())
        }
        Some(TokenKind::Inverse) => {
            if group.raw.trim().is_empty() {
                // Bare `{{^}}` is a synonym for `{{else}}`.
                return begin_else(group, stack, current);
            }
            let mut words = split_words(group.raw, group.raw_span.start)?;
            let name = words.remove(0);
            *saw_content = true;
            stack.push(PendingBlock {
                name: name.text,
                args: words,
                span: group.tag_span,
                inverse: true,
                first_body: None,
                saved: std::mem::take(current),
            });
            Ok(())
        }
        Some(TokenKind::BlockClose) => {
            let found = group.raw.trim().to_owned();
            let Some(pending) = stack.pop() else {
                return Err(TemplateError::Parse {
                    message: format!("closing tag '{found}' with no open block"),
                    offset: group.tag_span.start,
                });
            };
            if pending.name != found {
                return Err(TemplateError::MismatchedBlock {
                    expected: pending.name,
                    found,
                    offset: group.tag_span.start,
                });
            }
            let body = std::mem::replace(current, pending.saved);
            let (positive, negative) = match (pending.inverse, pending.first_body) {
                (false, None) => (body, None),
                (false, Some(first)) => (first, Some(body)),
                (true, None) => (Vec::new(), Some(body)),
                (true, Some(first)) => (body, Some(first)),
            };
            current.push(Node::Block(BlockNode {
                name: found,
                args: pending.args,
                positive,
                negative,
                span: pending.span,
            }));
            Ok(())
        }
        Some(TokenKind::Partial) => {
            let words = split_words(group.raw, group.raw_span.start)?;
            if words.is_empty() || words.len() > 2 {
                return Err(TemplateError::Parse {
                    message: "partial tag takes a name and an optional context path".to_owned(),
                    offset: group.tag_span.start,
                });
            }
            let name = unquote(&words[0].text);
            let context_path = words.get(1).map(|w| w.text.clone());
            *saw_content = true;
            current.push(Node::Partial(PartialNode {
                name,
                context_path,
                span: group.tag_span,
            }));
            Ok(())
        }
        Some(TokenKind::Layout) => {
            if layout.is_some() {
                return Err(TemplateError::Parse {
                    message: "duplicate layout directive".to_owned(),
                    offset: group.tag_span.start,
                });
            }
            if *saw_content || !stack.is_empty() {
                return Err(TemplateError::Parse {
                    message: "layout directive must be the first content in the template"
                        .to_owned(),
                    offset: group.tag_span.start,
                });
            }
            let name = unquote(group.raw.trim());
            if name.is_empty() {
                return Err(TemplateError::Parse {
                    message: "layout directive requires a name".to_owned(),
                    offset: group.tag_span.start,
                });
            }
            *layout = Some(name);
            Ok(())
        }
        Some(TokenKind::Comment) => {
            current.push(Node::Comment(CommentNode {
                span: group.tag_span,
            }));
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Switch the innermost open block from its positive to its negative body.
fn begin_else(
    group: &TagGroup<'_>,
    stack: &mut [PendingBlock],
    current: &mut Vec<Node>,
) -> TemplateResult<()> {
    let Some(pending) = stack.last_mut() else {
        return Err(TemplateError::Parse {
            message: "'{{else}}' outside of a block".to_owned(),
            offset: group.tag_span.start,
        });
    };
    if pending.first_body.is_some() {
        return Err(TemplateError::Parse {
            message: format!("duplicate '{{{{else}}}}' in block '{}'", pending.name),
            offset: group.tag_span.start,
        });
    }
    pending.first_body = Some(std::mem::take(current));
    Ok(())
}

/// Split a tag interior into words, respecting double-quoted strings and
/// `[bracketed]` path segments.
fn split_words(raw: &str, base: usize) -> TemplateResult<Vec<RawArg>> {
    let bytes = raw.as_bytes();
    let mut words = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        if bytes[i] == b'"' {
            i += 1;
            loop {
                if i >= bytes.len() {
                    return Err(TemplateError::Parse {
                        message: "unterminated string literal".to_owned(),
                        offset: base + start,
                    });
                }
                match bytes[i] {
                    b'\\' => i += 2,
                    b'"' => {
                        i += 1;
                        break;
                    }
                    _ => i += 1,
                }
            }
        } else {
            while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                if bytes[i] == b'[' {
                    match raw[i..].find(']') {
                        Some(rel) => i += rel + 1,
                        None => {
                            return Err(TemplateError::Parse {
                                message: "unterminated '[' in path".to_owned(),
                                offset: base + start,
                            });
                        }
                    }
                } else {
                    i += 1;
                }
            }
        }
        words.push(RawArg {
            text: raw[start..i].to_owned(),
            span: Span::new(base + start, base + i),
        });
    }
    Ok(words)
}

/// Strip surrounding double quotes from a word, if present.
fn unquote(word: &str) -> String {
    if word.len() >= 2 && word.starts_with('"') && word.ends_with('"') {
        word[1..word.len() - 1].to_owned()
    } else {
        word.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Delimiters, tokenize};

    fn parse_str(source: &str) -> TemplateResult<Ast> {
        parse(&tokenize(source, &Delimiters::default())?)
    }

    fn ast(source: &str) -> Ast {
        parse_str(source).expect("template should parse")
    }

    #[test]
    fn literal_only() {
        let ast = ast("hello world");
        assert_eq!(ast.nodes.len(), 1);
        assert!(matches!(&ast.nodes[0], Node::Text(t) if t.text == "hello world"));
    }

    #[test]
    fn expression_with_args_is_helper_invocation() {
        let ast = ast(r#"{{asset "a" "b"}}"#);
        let Node::Expression(e) = &ast.nodes[0] else {
            panic!("expected expression");
        };
        assert_eq!(e.path, "asset");
        assert_eq!(e.args.len(), 2);
        assert_eq!(e.args[0].text, r#""a""#);
        assert!(e.escape);
    }

    #[test]
    fn triple_mustache_is_unescaped() {
        let ast = ast("{{{body}}}");
        let Node::Expression(e) = &ast.nodes[0] else {
            panic!("expected expression");
        };
        assert!(!e.escape);
    }

    #[test]
    fn block_with_else() {
        let ast = ast("{{#if x}}yes{{else}}no{{/if}}");
        let Node::Block(b) = &ast.nodes[0] else {
            panic!("expected block");
        };
        assert_eq!(b.name, "if");
        assert_eq!(b.positive.len(), 1);
        assert!(matches!(&b.positive[0], Node::Text(t) if t.text == "yes"));
        let neg = b.negative.as_ref().expect("negative body");
        assert!(matches!(&neg[0], Node::Text(t) if t.text == "no"));
    }

    #[test]
    fn inverse_section_populates_negative_body() {
        let ast = ast("{{^missing}}fallback{{/missing}}");
        let Node::Block(b) = &ast.nodes[0] else {
            panic!("expected block");
        };
        assert!(b.positive.is_empty());
        let neg = b.negative.as_ref().expect("negative body");
        assert!(matches!(&neg[0], Node::Text(t) if t.text == "fallback"));
    }

    #[test]
    fn nested_blocks() {
        let ast = ast("{{#each posts}}{{#if title}}{{title}}{{/if}}{{/each}}");
        let Node::Block(outer) = &ast.nodes[0] else {
            panic!("expected block");
        };
        assert_eq!(outer.name, "each");
        let Node::Block(inner) = &outer.positive[0] else {
            panic!("expected nested block");
        };
        assert_eq!(inner.name, "if");
    }

    #[test]
    fn mismatched_close_is_an_error() {
        let err = parse_str("{{#if x}}body{{/each}}").unwrap_err();
        match err {
            TemplateError::MismatchedBlock {
                expected, found, ..
            } => {
                assert_eq!(expected, "if");
                assert_eq!(found, "each");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unclosed_block_names_the_unmatched_helper() {
        let err = parse_str("{{#each posts}}body").unwrap_err();
        match err {
            TemplateError::UnclosedBlock { name, .. } => assert_eq!(name, "each"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn close_without_open_is_an_error() {
        assert!(matches!(
            parse_str("{{/if}}").unwrap_err(),
            TemplateError::Parse { .. }
        ));
    }

    #[test]
    fn partial_with_context_path() {
        let ast = ast("{{> post-card post}}");
        let Node::Partial(p) = &ast.nodes[0] else {
            panic!("expected partial");
        };
        assert_eq!(p.name, "post-card");
        assert_eq!(p.context_path.as_deref(), Some("post"));
    }

    #[test]
    fn layout_directive_is_metadata_not_a_node() {
        let ast = ast("{{!< default}}\n<h1>{{title}}</h1>");
        assert_eq!(ast.layout.as_deref(), Some("default"));
        assert!(
            !ast.nodes
                .iter()
                .any(|n| matches!(n, Node::Text(t) if t.text.contains("default")))
        );
    }

    #[test]
    fn layout_directive_after_content_is_an_error() {
        let err = parse_str("hello {{!< default}}").unwrap_err();
        assert!(matches!(err, TemplateError::Parse { .. }));
    }

    #[test]
    fn comment_produces_no_output_node_content() {
        let ast = ast("a{{!-- note --}}b");
        assert_eq!(ast.nodes.len(), 3);
        assert!(matches!(&ast.nodes[1], Node::Comment(_)));
    }

    #[test]
    fn else_outside_block_is_an_error() {
        assert!(matches!(
            parse_str("{{else}}").unwrap_err(),
            TemplateError::Parse { .. }
        ));
    }

    #[test]
    fn bracketed_segments_stay_one_word() {
        let ast = ast("{{post.[long title].text}}");
        let Node::Expression(e) = &ast.nodes[0] else {
            panic!("expected expression");
        };
        assert_eq!(e.path, "post.[long title].text");
        assert!(e.args.is_empty());
    }
}
