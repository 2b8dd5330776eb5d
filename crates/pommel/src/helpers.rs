/*
 * helpers.rs
 * Copyright (c) 2025 the pommel authors
 */

//! Built-in block helpers.
//!
//! `if`, `unless`, `each`, and `with` are ordinary block helpers registered
//! in the defaults registry; the renderer has no special syntax for them.

use crate::context::IterationMeta;
use crate::registry::HelperRegistry;
use crate::value::Value;

pub(crate) fn register_builtins(registry: &mut HelperRegistry) {
    registry.register_block("if", |out, input, bodies| {
        let truthy = input.arg(0).is_some_and(Value::is_truthy);
        if truthy {
            bodies.render_positive(out)
        } else {
            bodies.render_negative(out)
        }
    });

    registry.register_block("unless", |out, input, bodies| {
        let truthy = input.arg(0).is_some_and(Value::is_truthy);
        if truthy {
            bodies.render_negative(out)
        } else {
            bodies.render_positive(out)
        }
    });

    registry.register_block("with", |out, input, bodies| {
        match input.arg(0) {
            Some(value) if value.is_truthy() => {
                bodies.render_positive_scoped(out, value.clone())
            }
            _ => bodies.render_negative(out),
        }
    });

    registry.register_block("each", |out, input, bodies| {
        match input.arg(0) {
            Some(Value::List(items)) if !items.is_empty() => {
                let len = items.len();
                for (index, item) in items.iter().enumerate() {
                    bodies.render_positive_iteration(
                        out,
                        item.clone(),
                        IterationMeta::for_index(index, len),
                    )?;
                }
                Ok(())
            }
            Some(Value::Map(map)) if !map.is_empty() => {
                let len = map.len();
                for (index, (key, item)) in map.iter().enumerate() {
                    bodies.render_positive_iteration(
                        out,
                        item.clone(),
                        IterationMeta::for_key(index, len, key),
                    )?;
                }
                Ok(())
            }
            _ => bodies.render_negative(out),
        }
    });
}
