/*
 * context.rs
 * Copyright (c) 2025 the pommel authors
 */

//! Runtime context stack and path resolution.
//!
//! A render call owns one [`FrameStack`]: a vector of frames with the root
//! at index 0. Parent links are plain indices into the vector, never owned
//! references, and frames are pushed and popped around block-body
//! invocations, so every parent chain terminates at the root. Frames hold
//! their value as `Cow`: borrowed from the caller's data for the root,
//! owned for values supplied by helpers and iteration.

use std::borrow::Cow;

use crate::error::{TemplateError, TemplateResult};
use crate::path::{PathPlan, PathSegment};
use crate::value::Value;

/// Metadata attached to frames created by an iterating block helper.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationMeta {
    /// Zero-based position of the element.
    pub index: usize,
    /// Mapping key when iterating a mapping, the index otherwise.
    pub key: Value,
    /// True only for the first element.
    pub first: bool,
    /// True only for the last element.
    pub last: bool,
}

impl IterationMeta {
    /// Metadata for position `index` of a sequence of length `len`.
    pub fn for_index(index: usize, len: usize) -> Self {
        Self {
            index,
            key: Value::from(index),
            first: index == 0,
            last: index + 1 == len,
        }
    }

    /// Metadata for position `index` of a mapping of length `len`, keyed by
    /// `key`.
    pub fn for_key(index: usize, len: usize, key: &str) -> Self {
        Self {
            index,
            key: Value::from(key),
            first: index == 0,
            last: index + 1 == len,
        }
    }
}

struct Frame<'data> {
    value: Cow<'data, Value>,
    parent: Option<usize>,
    meta: Option<IterationMeta>,
}

/// The runtime context stack for one render call.
pub(crate) struct FrameStack<'data> {
    frames: Vec<Frame<'data>>,
}

impl<'data> FrameStack<'data> {
    /// Create a stack with the given root value. The root frame has no
    /// parent and no iteration metadata.
    pub fn new(root: Cow<'data, Value>) -> Self {
        Self {
            frames: vec![Frame {
                value: root,
                parent: None,
                meta: None,
            }],
        }
    }

    /// Push a frame for a block-body invocation.
    pub fn push(&mut self, value: Cow<'data, Value>, meta: Option<IterationMeta>) {
        let parent = Some(self.frames.len() - 1);
        self.frames.push(Frame {
            value,
            parent,
            meta,
        });
    }

    /// Pop the frame pushed for the body invocation that just completed.
    /// The root frame is never popped.
    pub fn pop(&mut self) {
        debug_assert!(self.frames.len() > 1, "attempted to pop the root frame");
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// The current frame's value.
    pub fn current_value(&self) -> &Value {
        self.frames[self.frames.len() - 1].value.as_ref()
    }

    /// Resolve a lookup plan against the current frame.
    ///
    /// Returns `Ok(None)` for the forgiving "undefined" outcome (missing
    /// member, special variable outside iteration). Walking `../` past the
    /// root is the one fatal resolution fault.
    pub fn resolve(&self, plan: &PathPlan) -> TemplateResult<Option<Cow<'_, Value>>> {
        let mut idx = self.frames.len() - 1;
        for _ in 0..plan.parents {
            idx = self.frames[idx]
                .parent
                .ok_or_else(|| TemplateError::ContextDepth {
                    path: plan.raw.clone(),
                })?;
        }

        match plan.segments.split_first() {
            None => Ok(Some(Cow::Borrowed(&*self.frames[idx].value))),
            Some((first, rest)) if is_special(first) => {
                let Some(meta) = self.nearest_meta(idx) else {
                    return Ok(None);
                };
                let head = match first {
                    PathSegment::AtIndex => Value::from(meta.index),
                    PathSegment::AtKey => meta.key.clone(),
                    PathSegment::AtFirst => Value::Bool(meta.first),
                    PathSegment::AtLast => Value::Bool(meta.last),
                    _ => unreachable!(),
                };
                Ok(walk(&head, rest).map(|v| Cow::Owned(v.clone())))
            }
            Some(_) => {
                Ok(walk(self.frames[idx].value.as_ref(), &plan.segments).map(Cow::Borrowed))
            }
        }
    }

    /// Resolve to an owned value, with undefined collapsing to `Null`.
    /// Used for helper argument materialization.
    pub fn resolve_owned(&self, plan: &PathPlan) -> TemplateResult<Value> {
        Ok(self
            .resolve(plan)?
            .map(Cow::into_owned)
            .unwrap_or(Value::Null))
    }

    /// Find iteration metadata on the frame at `idx` or its nearest
    /// ancestor.
    fn nearest_meta(&self, idx: usize) -> Option<&IterationMeta> {
        let mut cursor = Some(idx);
        while let Some(i) = cursor {
            if let Some(meta) = &self.frames[i].meta {
                return Some(meta);
            }
            cursor = self.frames[i].parent;
        }
        None
    }
}

fn is_special(seg: &PathSegment) -> bool {
    matches!(
        seg,
        PathSegment::AtIndex | PathSegment::AtKey | PathSegment::AtFirst | PathSegment::AtLast
    )
}

/// Sequential member/index lookup. Any miss yields `None`, never an error.
fn walk<'v>(start: &'v Value, segments: &[PathSegment]) -> Option<&'v Value> {
    let mut current = start;
    for seg in segments {
        current = match seg {
            PathSegment::Key(k) => current.get(k)?,
            PathSegment::Index(i) => current.index(*i)?,
            // Special variables are only meaningful at the head of a path.
            _ => return None,
        };
    }
    Some(current)
}
