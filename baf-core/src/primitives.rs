// Copyright the baf-core contributors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Build logic for the three leaf datums: `Int`, `Bytes`, `File`.
//!
//! None of these have children, so unlike `Block`/`Array`/`Optional` there
//! is no fix-point to run — each one either accepts its input outright or
//! fails validation immediately.

use std::path::Path;

use crate::entry::BuildContext;
use crate::error::{BafError, Result};
use crate::tree::{BafTree, NodeId};
use crate::value::Value;

pub fn build_int(tree: &mut BafTree, id: NodeId, data: Value) -> Result<()> {
    let kind = tree.int_state(id).kind;
    let value = match data {
        Value::Int(i) => i,
        Value::Bool(b) => b as i128,
        other => {
            return Err(BafError::Validation(format!(
                "expected an integer for a {kind} field, got {}",
                other.type_name()
            )))
        }
    };
    if value < kind.min() || value > kind.max() {
        return Err(BafError::Validation(format!(
            "value {value} out of range for {kind} ({}..={})",
            kind.min(),
            kind.max()
        )));
    }
    tree.set_int_value(id, value as i64);
    Ok(())
}

pub fn build_bytes(tree: &mut BafTree, id: NodeId, data: Value) -> Result<()> {
    let declared = tree.bytes_state(id).declared_size;
    let buf = match data {
        Value::Bytes(b) => b,
        Value::Str(s) => s.into_bytes(),
        Value::Seq(items) => items
            .into_iter()
            .map(|v| match v {
                Value::Int(i) if (0..=255).contains(&i) => Ok(i as u8),
                other => Err(BafError::Validation(format!(
                    "expected a byte (0..=255) in Bytes sequence, got {}",
                    other.type_name()
                ))),
            })
            .collect::<Result<Vec<u8>>>()?,
        other => {
            return Err(BafError::Validation(format!(
                "expected bytes, a string, or a sequence of byte values, got {}",
                other.type_name()
            )))
        }
    };
    if let Some(expected) = declared {
        if buf.len() != expected {
            return Err(BafError::Validation(format!(
                "expected {expected} bytes, got {}",
                buf.len()
            )));
        }
    }
    tree.set_bytes_data(id, buf);
    Ok(())
}

/// `File` reads its payload from disk relative to [`BuildContext::root_dir`]
/// at build time; the field's input data is the path string.
pub fn build_file(tree: &mut BafTree, ctx: &BuildContext, id: NodeId, data: Value) -> Result<()> {
    let path_str = match data {
        Value::Str(s) => s,
        other => {
            return Err(BafError::Validation(format!(
                "expected a path string for a File field, got {}",
                other.type_name()
            )))
        }
    };
    let path = Path::new(&path_str);
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match &ctx.root_dir {
            Some(root) => root.join(path),
            None => {
                return Err(BafError::Spec(format!(
                    "File field references relative path {path_str:?} but no root directory was configured"
                )))
            }
        }
    };
    log::debug!("reading File field from {}", resolved.display());
    let bytes = std::fs::read(&resolved).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BafError::Validation(format!("File field references {resolved:?}, which does not exist"))
        } else {
            BafError::Io(e)
        }
    })?;
    tree.set_file_data(id, bytes);
    Ok(())
}
