// Copyright the baf-core contributors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The `Block` fix-point resolver.
//!
//! A record's fields can depend on each other in either direction — a
//! length field computed from a payload's size, a checksum computed from
//! sibling bytes — so there's no static field order that always works.
//! Instead we repeatedly sweep the not-yet-done fields, building whichever
//! ones no longer raise [`BafError::Dependency`], until either everything
//! is done or a whole sweep makes no progress (a cycle).

use crate::entry::BuildContext;
use crate::error::{BafError, Result};
use crate::refine::unpack_type;
use crate::tree::{BafTree, NodeId};
use crate::value::Value;

/// Raises `Dependency` if `node` has not yet built, letting a setter defer
/// itself to a later pass instead of reading a sibling's stale/default
/// state. Useful when a setter's own logic wouldn't otherwise notice the
/// dependency (e.g. it only reads a sibling's offset, which is always
/// computable, but should still wait for that sibling to finish).
pub fn force_dependency(tree: &BafTree, node: NodeId) -> Result<()> {
    if tree.is_built(node) {
        Ok(())
    } else {
        Err(BafError::Dependency(
            "forced dependency on a datum that has not built yet".into(),
        ))
    }
}

struct Entry {
    name: String,
    node_id: NodeId,
    done: bool,
    /// Set once a field's setter has returned successfully, so later passes
    /// reuse the cached value instead of invoking the setter again. A
    /// setter that raises `Dependency` never reaches the point where this
    /// gets set, so it's retried every pass until it succeeds, same as a
    /// plain unresolved field.
    setter_value: Option<Value>,
}

pub fn build_block(tree: &mut BafTree, ctx: &BuildContext, id: NodeId, data: Value) -> Result<()> {
    let schema = tree.block_schema(id);

    let input = match &data {
        Value::Map(_) => data.clone(),
        Value::Null => Value::map(Vec::<(String, Value)>::new()),
        other => {
            return Err(BafError::Validation(format!(
                "expected a map of field values for Block({}), got {}",
                schema.name,
                other.type_name()
            )))
        }
    };
    let map = input.as_map().expect("checked above");

    // Preflight: every field must be resolvable from either explicit input,
    // a declared default, a setter, or being self-sufficient.
    for field in &schema.fields {
        if map.contains_key(&field.name) {
            continue;
        }
        if schema.setters.contains_key(&field.name) {
            continue;
        }
        if field.schema.has_default() || field.schema.is_self_sufficient() {
            continue;
        }
        return Err(BafError::Validation(format!(
            "Block({}) is missing required field {:?}",
            schema.name, field.name
        )));
    }

    let mut entries: Vec<Entry> = schema
        .fields
        .iter()
        .map(|f| Entry {
            name: f.name.clone(),
            node_id: tree
                .block_field_node(id, &f.name)
                .expect("field node instantiated eagerly"),
            done: false,
            setter_value: None,
        })
        .collect();

    let mut pass = 0u32;
    loop {
        pass += 1;
        log::trace!(
            "Block({}) resolver pass {pass}: {} field(s) remaining",
            schema.name,
            entries.iter().filter(|e| !e.done).count()
        );
        let mut progressed = false;
        for i in 0..entries.len() {
            if entries[i].done {
                continue;
            }
            match try_build_field(tree, ctx, id, &schema, &input, &mut entries[i]) {
                Ok(()) => {
                    entries[i].done = true;
                    progressed = true;
                }
                Err(e) if e.is_dependency() => continue,
                Err(e) => {
                    return Err(e.with_path(format!(
                        "Block({}) → {}",
                        schema.name, entries[i].name
                    )))
                }
            }
        }
        if entries.iter().all(|e| e.done) {
            return Ok(());
        }
        if !progressed {
            let stuck: Vec<&str> = entries
                .iter()
                .filter(|e| !e.done)
                .map(|e| e.name.as_str())
                .collect();
            return Err(BafError::Build(format!(
                "Block({}) has a cyclic or unsatisfiable dependency among fields: {}",
                schema.name,
                stuck.join(", ")
            )));
        }
    }
}

fn try_build_field(
    tree: &mut BafTree,
    ctx: &BuildContext,
    block_id: NodeId,
    schema: &crate::schema::BlockSchema,
    input: &Value,
    entry: &mut Entry,
) -> Result<()> {
    let declared = schema
        .field(&entry.name)
        .expect("entry names come from schema.fields")
        .clone();

    let raw = if let Some(cached) = &entry.setter_value {
        cached.clone()
    } else if let Some(setter) = schema.setters.get(&entry.name) {
        let value = setter(tree, block_id, input)?;
        entry.setter_value = Some(value.clone());
        value
    } else if let Some(v) = input.as_map().and_then(|m| m.get(&entry.name)) {
        v.clone()
    } else if let Some(def) = declared.default_value() {
        def
    } else {
        Value::Null
    };

    if let Value::Built(existing) = raw {
        if !tree.matches_schema_kind(existing, &declared) {
            return Err(BafError::Validation(format!(
                "field {:?} was given a pre-built {} but expects {}",
                entry.name,
                tree.kind_name(existing),
                declared.type_name()
            )));
        }
        tree.install_block_field(block_id, &entry.name, existing)?;
        entry.node_id = existing;
        return Ok(());
    }

    let (resolved_schema, payload) = unpack_type(&declared, raw)?;
    let target = if matches!(&resolved_schema, crate::schema::Schema::Block(_))
        && !tree.matches_schema_kind(entry.node_id, &resolved_schema)
    {
        let new_id = tree.replace_block_field(block_id, &entry.name, &resolved_schema)?;
        entry.node_id = new_id;
        new_id
    } else {
        entry.node_id
    };

    tree.build(ctx, target, payload)
}
