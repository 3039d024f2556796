// Copyright the baf-core contributors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `Array`, `Optional`, and `Align` build logic.
//!
//! Unlike `Block`, none of these need a fix-point: an `Array`'s elements
//! don't depend on each other, `Optional` resolves in one step, and
//! `Align` consumes no input at all.

use crate::entry::BuildContext;
use crate::error::{BafError, Result};
use crate::refine::unpack_type;
use crate::tree::{BafTree, NodeId};
use crate::value::Value;

pub fn build_array(tree: &mut BafTree, ctx: &BuildContext, id: NodeId, data: Value) -> Result<()> {
    let schema = tree.array_schema(id);

    if let Some(count) = schema.count {
        if count < 0 {
            return Err(BafError::Spec(format!(
                "Array declared with a negative count ({count})"
            )));
        }
    }

    let seq = match data {
        Value::Seq(s) => s,
        Value::Null => Vec::new(),
        other => {
            return Err(BafError::Validation(format!(
                "expected a sequence for an Array field, got {}",
                other.type_name()
            )))
        }
    };

    if let Some(count) = schema.count {
        if seq.len() as i64 != count {
            return Err(BafError::Validation(format!(
                "Array declared with {count} elements, got {}",
                seq.len()
            )));
        }
    }

    let element_schema = schema
        .element
        .clone()
        .map(|e| *e)
        .or_else(|| tree.generic_hint(id))
        .ok_or_else(|| BafError::Spec("Array has no element model and no generic hint".into()))?;

    let mut items = Vec::with_capacity(seq.len());
    for (i, item_data) in seq.into_iter().enumerate() {
        if let Value::Built(existing) = item_data {
            if !tree.matches_schema_kind(existing, &element_schema) {
                return Err(BafError::Validation(format!(
                    "Array element {i} is a pre-built {} but expects {}",
                    tree.kind_name(existing),
                    element_schema.type_name()
                )));
            }
            items.push(existing);
            continue;
        }
        let (resolved, payload) = unpack_type(&element_schema, item_data)
            .map_err(|e| e.with_path(format!("Array[{}] → (element {i})", element_schema.type_name())))?;
        let child = tree.instantiate(&resolved, Some(id))?;
        tree.build(ctx, child, payload)
            .map_err(|e| e.with_path(format!("Array[{}] → (element {i})", element_schema.type_name())))?;
        items.push(child);
    }

    let inferred_count = if schema.count.is_none() {
        Some(items.len() as i64)
    } else {
        None
    };
    tree.set_array_items(id, items, inferred_count);
    Ok(())
}

/// Absent input (`Null`, or an empty sequence — the same "no value" shape
/// accepted elsewhere for emptiness) leaves the wrapper with no inner item.
/// Anything else is unpacked against the wrapped model and built as a
/// sibling of the wrapper itself, per the faithfully-ported parent quirk
/// documented in `DESIGN.md`.
pub fn build_optional(tree: &mut BafTree, ctx: &BuildContext, id: NodeId, data: Value) -> Result<()> {
    if data.is_empty_ish() {
        tree.set_optional_item(id, None);
        return Ok(());
    }

    let inner_schema = tree.optional_inner(id);
    if let Value::Built(existing) = data {
        if !tree.matches_schema_kind(existing, &inner_schema) {
            return Err(BafError::Validation(format!(
                "Optional was given a pre-built {} but wraps {}",
                tree.kind_name(existing),
                inner_schema.type_name()
            )));
        }
        tree.set_optional_item(id, Some(existing));
        return Ok(());
    }

    let (resolved, payload) = unpack_type(&inner_schema, data)?;
    let parent = tree.parent(id);
    let child = tree.instantiate(&resolved, parent)?;
    tree.build(ctx, child, payload)
        .map_err(|e| e.with_path(format!("Optional[{}]", inner_schema.type_name())))?;
    tree.set_optional_item(id, Some(child));
    Ok(())
}

/// `Align` takes no input; its padding is computed on demand from
/// `offset()`, never cached. The alignment value itself was already
/// validated at instantiation time, so there is nothing left to do here.
pub fn build_align(_tree: &mut BafTree, _id: NodeId) -> Result<()> {
    Ok(())
}
