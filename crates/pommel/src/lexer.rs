/*
 * lexer.rs
 * Copyright (c) 2025 the pommel authors
 */

//! Template tokenizer.
//!
//! Scans raw template text into a flat token sequence: literal text runs,
//! mustache open/close markers, tag-kind sigils (`#`, `/`, `^`, `>`, `!`,
//! `!<`), and the raw interior text of each tag. A post-pass trims the
//! line-local whitespace around standalone block, partial, comment, and
//! layout tags so block constructs produce clean output lines.

use crate::error::{TemplateError, TemplateResult};

/// A byte range into the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Lexical token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A literal text run between tags.
    Text,
    /// `{{`
    Open,
    /// `{{{`
    OpenTriple,
    /// `}}`
    Close,
    /// `}}}`
    CloseTriple,
    /// `#`: block open sigil.
    BlockOpen,
    /// `/`: block close sigil.
    BlockClose,
    /// `^`: inverse section sigil.
    Inverse,
    /// `>`: partial sigil.
    Partial,
    /// `!<`: layout directive sigil.
    Layout,
    /// `!` or `!--`: comment sigil.
    Comment,
    /// The raw interior text of a tag.
    RawText,
}

/// A single token, borrowing its payload from the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub span: Span,
    pub text: &'src str,
}

/// Configurable mustache delimiters.
///
/// The raw (unescaped) form is the open delimiter followed by `{`, closed by
/// `}` followed by the close delimiter. Delimiters must be ASCII.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            open: "{{".to_owned(),
            close: "}}".to_owned(),
        }
    }
}

impl Delimiters {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

/// Tokenize template source into a gap-free token sequence.
pub fn tokenize<'src>(
    source: &'src str,
    delims: &Delimiters,
) -> TemplateResult<Vec<Token<'src>>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < source.len() {
        match source[pos..].find(&delims.open) {
            None => {
                tokens.push(text_token(source, pos, source.len()));
                break;
            }
            Some(rel) => {
                let tag_start = pos + rel;
                if rel > 0 {
                    tokens.push(text_token(source, pos, tag_start));
                }
                pos = scan_tag(source, tag_start, delims, &mut tokens)?;
            }
        }
    }

    strip_standalone(&mut tokens);
    Ok(tokens)
}

fn text_token(source: &str, start: usize, end: usize) -> Token<'_> {
    Token {
        kind: TokenKind::Text,
        span: Span::new(start, end),
        text: &source[start..end],
    }
}

/// Scan a single tag beginning at `tag_start` (which holds the open
/// delimiter). Returns the offset just past the tag.
fn scan_tag<'src>(
    source: &'src str,
    tag_start: usize,
    delims: &Delimiters,
    tokens: &mut Vec<Token<'src>>,
) -> TemplateResult<usize> {
    let after_open = tag_start + delims.open.len();
    let rest = &source[after_open..];

    // Raw (triple) form: open delimiter followed by `{`.
    if rest.starts_with('{') {
        let content_start = after_open + 1;
        let terminator = format!("}}{}", delims.close);
        let close_rel = find_terminator(source, content_start, &terminator, true)
            .ok_or(TemplateError::UnterminatedTag { offset: tag_start })?;
        tokens.push(Token {
            kind: TokenKind::OpenTriple,
            span: Span::new(tag_start, content_start),
            text: &source[tag_start..content_start],
        });
        tokens.push(Token {
            kind: TokenKind::RawText,
            span: Span::new(content_start, close_rel),
            text: &source[content_start..close_rel],
        });
        let end = close_rel + terminator.len();
        tokens.push(Token {
            kind: TokenKind::CloseTriple,
            span: Span::new(close_rel, end),
            text: &source[close_rel..end],
        });
        return Ok(end);
    }

    // Long comment: `{{!-- ... --}}`; the interior may contain the close
    // delimiter itself.
    if rest.starts_with("!--") {
        let content_start = after_open + 3;
        let terminator = format!("--{}", delims.close);
        let close_rel = find_terminator(source, content_start, &terminator, false)
            .ok_or(TemplateError::UnterminatedTag { offset: tag_start })?;
        push_open(tokens, source, tag_start, after_open);
        tokens.push(Token {
            kind: TokenKind::Comment,
            span: Span::new(after_open, content_start),
            text: &source[after_open..content_start],
        });
        tokens.push(Token {
            kind: TokenKind::RawText,
            span: Span::new(content_start, close_rel),
            text: &source[content_start..close_rel],
        });
        let end = close_rel + terminator.len();
        tokens.push(Token {
            kind: TokenKind::Close,
            span: Span::new(close_rel, end),
            text: &source[close_rel..end],
        });
        return Ok(end);
    }

    let (sigil, sigil_len) = match rest.as_bytes().first() {
        Some(b'#') => (Some(TokenKind::BlockOpen), 1),
        Some(b'/') => (Some(TokenKind::BlockClose), 1),
        Some(b'^') => (Some(TokenKind::Inverse), 1),
        Some(b'>') => (Some(TokenKind::Partial), 1),
        Some(b'!') if rest[1..].starts_with('<') => (Some(TokenKind::Layout), 2),
        Some(b'!') => (Some(TokenKind::Comment), 1),
        _ => (None, 0),
    };

    let content_start = after_open + sigil_len;
    // Comments do not treat quotes specially; everything else does, so a
    // close delimiter inside a quoted argument does not end the tag.
    let respect_quotes = sigil != Some(TokenKind::Comment);
    let close_rel = find_terminator(source, content_start, &delims.close, respect_quotes)
        .ok_or(TemplateError::UnterminatedTag { offset: tag_start })?;

    push_open(tokens, source, tag_start, after_open);
    if let Some(kind) = sigil {
        tokens.push(Token {
            kind,
            span: Span::new(after_open, content_start),
            text: &source[after_open..content_start],
        });
    }
    tokens.push(Token {
        kind: TokenKind::RawText,
        span: Span::new(content_start, close_rel),
        text: &source[content_start..close_rel],
    });
    let end = close_rel + delims.close.len();
    tokens.push(Token {
        kind: TokenKind::Close,
        span: Span::new(close_rel, end),
        text: &source[close_rel..end],
    });
    Ok(end)
}

fn push_open<'src>(tokens: &mut Vec<Token<'src>>, source: &'src str, start: usize, end: usize) {
    tokens.push(Token {
        kind: TokenKind::Open,
        span: Span::new(start, end),
        text: &source[start..end],
    });
}

/// Find the next occurrence of `pat` at or after `from`, optionally skipping
/// over double-quoted strings (with `\"` escapes).
fn find_terminator(source: &str, from: usize, pat: &str, respect_quotes: bool) -> Option<usize> {
    let bytes = source.as_bytes();
    let pat_bytes = pat.as_bytes();
    let mut i = from;
    let mut in_string = false;

    while i < bytes.len() {
        if in_string {
            match bytes[i] {
                b'\\' => i += 2,
                b'"' => {
                    in_string = false;
                    i += 1;
                }
                _ => i += 1,
            }
            continue;
        }
        if respect_quotes && bytes[i] == b'"' {
            in_string = true;
            i += 1;
            continue;
        }
        if bytes[i..].starts_with(pat_bytes) {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Trim the line-local whitespace around standalone tags.
///
/// A tag is standalone when it is the only non-whitespace content on its
/// source line. For standalone block/inverse/close/partial/comment/layout
/// tags (and the bare `{{else}}` tag), the indentation before the tag and
/// the newline after it are removed from the neighbouring text tokens.
fn strip_standalone(tokens: &mut [Token<'_>]) {
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].kind != TokenKind::Open {
            i += 1;
            continue;
        }

        // Collect the group: Open [sigil] RawText Close.
        let mut sigil = None;
        let mut raw = "";
        let mut j = i + 1;
        while j < tokens.len() && tokens[j].kind != TokenKind::Close {
            match tokens[j].kind {
                TokenKind::RawText => raw = tokens[j].text,
                kind => sigil = Some(kind),
            }
            j += 1;
        }
        if j >= tokens.len() {
            break;
        }

        let trimmable = match sigil {
            Some(
                TokenKind::BlockOpen
                | TokenKind::BlockClose
                | TokenKind::Inverse
                | TokenKind::Partial
                | TokenKind::Comment
                | TokenKind::Layout,
            ) => true,
            None => raw.trim() == "else",
            _ => false,
        };
        if !trimmable {
            i = j + 1;
            continue;
        }

        let before = line_start_trim(tokens, i);
        let after = line_end_trim(tokens, j);
        if let (Some(keep), Some(skip)) = (before, after) {
            if i > 0 {
                let t = &mut tokens[i - 1];
                t.text = &t.text[..keep];
                t.span.end = t.span.start + keep;
            }
            if j + 1 < tokens.len() {
                let t = &mut tokens[j + 1];
                t.text = &t.text[skip..];
                t.span.start += skip;
            }
        }
        i = j + 1;
    }
}

/// If the tag at token index `i` starts its line, return how many bytes of
/// the preceding text token to keep (cutting its trailing indentation).
fn line_start_trim(tokens: &[Token<'_>], i: usize) -> Option<usize> {
    if i == 0 {
        return Some(0);
    }
    let prev = &tokens[i - 1];
    if prev.kind != TokenKind::Text {
        return None;
    }
    match prev.text.rfind('\n') {
        Some(nl) => {
            let tail = &prev.text[nl + 1..];
            tail.bytes().all(|b| b == b' ' || b == b'\t').then_some(nl + 1)
        }
        None => {
            // No newline: only standalone if the text opens the template and
            // is itself pure indentation.
            (i == 1 && prev.text.bytes().all(|b| b == b' ' || b == b'\t')).then_some(0)
        }
    }
}

/// If the tag group ending at token index `j` (its Close token) ends its
/// line, return how many bytes of the following text token to skip.
fn line_end_trim(tokens: &[Token<'_>], j: usize) -> Option<usize> {
    let Some(next) = tokens.get(j + 1) else {
        return Some(0);
    };
    if next.kind != TokenKind::Text {
        return None;
    }
    let bytes = next.text.as_bytes();
    let ws = bytes
        .iter()
        .take_while(|b| **b == b' ' || **b == b'\t')
        .count();
    match bytes.get(ws) {
        Some(b'\n') => Some(ws + 1),
        Some(b'\r') if bytes.get(ws + 1) == Some(&b'\n') => Some(ws + 2),
        None if j + 2 >= tokens.len() => Some(ws),
        _ => None,
    }
}
