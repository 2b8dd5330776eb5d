/*
 * path.rs
 * Copyright (c) 2025 the pommel authors
 */

//! Path grammar and lookup plans.
//!
//! The compiler pre-parses every path (expression paths, helper argument
//! paths, partial context paths) into a [`PathPlan`] so no string parsing
//! happens at render time. The grammar: `this` (or `.`), leading `../`
//! ancestor hops, dot-separated segments, `[bracketed segments]` for keys
//! containing separators, numeric indices, and the iteration specials
//! `@index`, `@key`, `@first`, `@last`.

use crate::error::{TemplateError, TemplateResult};

/// One step of a lookup plan.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// Member lookup by key.
    Key(String),
    /// Index lookup into a sequence.
    Index(usize),
    /// Zero-based position of the nearest enclosing iteration.
    AtIndex,
    /// Mapping key (or index) of the nearest enclosing iteration.
    AtKey,
    /// Whether the nearest enclosing iteration is at its first element.
    AtFirst,
    /// Whether the nearest enclosing iteration is at its last element.
    AtLast,
}

/// A pre-resolved lookup plan for one path expression.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPlan {
    /// Number of leading `../` ancestor hops.
    pub parents: usize,
    /// Segments applied after the hops; empty means the frame value itself.
    pub segments: Vec<PathSegment>,
    /// The original path text, kept for error messages.
    pub raw: String,
}

impl PathPlan {
    /// True when this plan is a single bare key (a candidate helper name).
    pub fn as_bare_key(&self) -> Option<&str> {
        match (self.parents, self.segments.as_slice()) {
            (0, [PathSegment::Key(k)]) => Some(k),
            _ => None,
        }
    }
}

/// Parse a raw path into a lookup plan. `offset` is the source offset of
/// the path, used in error reports.
pub fn parse_path(raw: &str, offset: usize) -> TemplateResult<PathPlan> {
    let full = raw.trim();
    let mut rest = full;
    let mut parents = 0;

    loop {
        if let Some(stripped) = rest.strip_prefix("../") {
            parents += 1;
            rest = stripped;
        } else if rest == ".." {
            parents += 1;
            rest = "";
            break;
        } else {
            break;
        }
    }
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    if let Some(stripped) = rest.strip_prefix("this.") {
        rest = stripped;
    } else if rest == "this" || rest == "." {
        rest = "";
    }

    let mut segments = Vec::new();
    if !rest.is_empty() {
        for seg in split_segments(rest, offset)? {
            segments.push(parse_segment(&seg, offset)?);
        }
    }

    Ok(PathPlan {
        parents,
        segments,
        raw: full.to_owned(),
    })
}

/// Split on `.` while keeping `[bracketed]` text as one segment.
fn split_segments(path: &str, offset: usize) -> TemplateResult<Vec<String>> {
    let mut segments = Vec::new();
    let mut rest = path;

    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('[') {
            let Some(end) = stripped.find(']') else {
                return Err(TemplateError::Parse {
                    message: format!("unterminated '[' in path '{path}'"),
                    offset,
                });
            };
            segments.push(stripped[..end].to_owned());
            rest = &stripped[end + 1..];
            rest = rest.strip_prefix('.').unwrap_or(rest);
        } else {
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            if end == 0 {
                return Err(TemplateError::Parse {
                    message: format!("empty segment in path '{path}'"),
                    offset,
                });
            }
            segments.push(rest[..end].to_owned());
            match rest.as_bytes().get(end) {
                Some(b'.') => rest = &rest[end + 1..],
                _ => rest = &rest[end..],
            }
        }
    }
    Ok(segments)
}

fn parse_segment(seg: &str, offset: usize) -> TemplateResult<PathSegment> {
    if let Some(special) = seg.strip_prefix('@') {
        return match special {
            "index" => Ok(PathSegment::AtIndex),
            "key" => Ok(PathSegment::AtKey),
            "first" => Ok(PathSegment::AtFirst),
            "last" => Ok(PathSegment::AtLast),
            other => Err(TemplateError::Parse {
                message: format!("unknown special variable '@{other}'"),
                offset,
            }),
        };
    }
    if seg.bytes().all(|b| b.is_ascii_digit()) {
        // Bounded by usize; a key this long is not a plausible index.
        if let Ok(idx) = seg.parse::<usize>() {
            return Ok(PathSegment::Index(idx));
        }
    }
    if seg.is_empty() {
        return Err(TemplateError::Parse {
            message: "empty path segment".to_owned(),
            offset,
        });
    }
    Ok(PathSegment::Key(seg.to_owned()))
}

/// A pre-parsed helper argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// Double-quoted string literal.
    Str(String),
    /// Numeric literal.
    Num(f64),
    /// `true` or `false`.
    Bool(bool),
    /// Anything else: a path resolved against the context at call time.
    Path(PathPlan),
}

/// Parse one raw argument word into an [`Argument`].
pub fn parse_argument(raw: &str, offset: usize) -> TemplateResult<Argument> {
    let word = raw.trim();
    if let Some(stripped) = word.strip_prefix('"') {
        let Some(inner) = stripped.strip_suffix('"') else {
            return Err(TemplateError::Parse {
                message: "unterminated string literal".to_owned(),
                offset,
            });
        };
        return Ok(Argument::Str(unescape(inner)));
    }
    match word {
        "true" => return Ok(Argument::Bool(true)),
        "false" => return Ok(Argument::Bool(false)),
        _ => {}
    }
    if let Ok(n) = word.parse::<f64>() {
        return Ok(Argument::Num(n));
    }
    Ok(Argument::Path(parse_path(word, offset)?))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
