// Copyright the baf-core contributors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Tree visualizer.
//!
//! A straight port of the original diagnostic dump: a depth-first walk
//! printing each datum's global offset, size, and type, with one
//! abbreviation — a run of primitive integers directly inside an `Array`
//! collapses to a single `...` line instead of repeating one line per
//! element.

use crate::error::Result;
use crate::tree::{BafTree, NodeId};

/// Renders `root`'s subtree. `root` must already be fully built — offsets
/// and sizes are meaningless (and may error) otherwise.
pub fn visualize(tree: &mut BafTree, root: NodeId) -> Result<String> {
    walk(tree, root, 0, 0)
}

fn walk(tree: &mut BafTree, id: NodeId, indent: usize, base_offset: usize) -> Result<String> {
    let mut out = String::new();
    let named_items = named_children(tree, id)?;
    for (name, item) in named_items {
        if tree.is_optional_empty(item) {
            continue;
        }
        out.push_str(&print_item(tree, item, name, indent, base_offset)?);
        if matches!(tree.kind_name(item), "Array" | "Block") {
            let child_offset = tree.offset(item)? + base_offset;
            out.push_str(&walk(tree, item, indent + 1, child_offset)?);
        }
    }
    Ok(out)
}

fn named_children(tree: &mut BafTree, id: NodeId) -> Result<Vec<(String, NodeId)>> {
    match tree.kind_name(id) {
        "Array" => Ok(tree
            .get_items(id, false)?
            .into_iter()
            .map(|c| (String::new(), c))
            .collect()),
        _ => Ok(tree
            .block_schema(id)
            .fields
            .iter()
            .map(|f| (f.name.clone(), tree.block_field_node(id, &f.name).unwrap()))
            .collect()),
    }
}

fn print_item(
    tree: &mut BafTree,
    item: NodeId,
    name: String,
    indent: usize,
    base_offset: usize,
) -> Result<String> {
    let is_leading_primitive_in_array = match (tree.kind_name(item), tree.parent(item)) {
        ("Int", Some(parent)) if tree.kind_name(parent) == "Array" => {
            tree.get_items(parent, false)?.first() == Some(&item)
        }
        _ => false,
    };

    let f_indent = "  ".repeat(indent);
    let f_offset = tree.offset(item)? + base_offset;

    if is_leading_primitive_in_array {
        return Ok(format!("{f_indent}{f_offset:#x} ...\n"));
    }

    let mut type_name = display_type_name(tree, item);
    if !name.is_empty() {
        type_name = format!("{name}: {type_name}");
    }
    let f_size = tree.size(item)?;
    Ok(format!("{f_indent}{f_offset:#x} ({f_size:#x}) {type_name}\n"))
}

fn display_type_name(tree: &mut BafTree, id: NodeId) -> String {
    match tree.kind_name(id) {
        "Int" => tree.int_state(id).kind.to_string(),
        "Bytes" => "Bytes".to_string(),
        "File" => "File".to_string(),
        "Block" => tree.block_schema(id).name.clone(),
        "Array" => {
            let schema = tree.array_schema(id);
            let elem = schema
                .element
                .map(|e| e.type_name())
                .or_else(|| tree.generic_hint(id).map(|h| h.type_name()))
                .unwrap_or_else(|| "?".to_string());
            let len = tree.get_items(id, false).map(|v| v.len()).unwrap_or(0);
            format!("Array[{elem}] ({len})")
        }
        "Optional" => format!("Optional[{}]", tree.optional_inner(id).type_name()),
        other => other.to_string(),
    }
}
