// Copyright the baf-core contributors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Entry points: turn a schema plus a decoded value into bytes.
//!
//! Three ways in to the same build: a generic decoded value, a JSON
//! document, or a TOML document, each optionally read straight from a file
//! on disk. All of them end up at [`build_tree`], which instantiates the
//! root datum and runs its build; the JSON/TOML variants are thin adapters
//! through [`crate::value`].

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::schema::Schema;
use crate::tree::{BafTree, NodeId};
use crate::value::{self, Value};

/// Per-build configuration. Currently just the directory `File` fields'
/// relative paths are resolved against; kept as an explicit struct rather
/// than a process-global so multiple builds (e.g. in a test suite) never
/// share mutable state.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    pub root_dir: Option<PathBuf>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root_dir(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: Some(root_dir.into()),
        }
    }
}

/// Instantiates `schema` as a root datum and builds it from `data`,
/// returning the tree and the root's node id for further inspection
/// (`size`, `offset`, `visualize`) or final serialization via `bytes`.
pub fn build_tree(schema: &Schema, data: Value, ctx: &BuildContext) -> Result<(BafTree, NodeId)> {
    let mut tree = BafTree::new();
    let root = tree.instantiate(schema, None)?;
    tree.build(ctx, root, data)?;
    Ok((tree, root))
}

pub fn build(schema: &Schema, data: Value, ctx: &BuildContext) -> Result<Vec<u8>> {
    let (mut tree, root) = build_tree(schema, data, ctx)?;
    tree.bytes(root)
}

pub fn build_json(schema: &Schema, json: &str, ctx: &BuildContext) -> Result<Vec<u8>> {
    let parsed: serde_json::Value = serde_json::from_str(json)?;
    build(schema, value::from_json(&parsed)?, ctx)
}

pub fn build_toml(schema: &Schema, input: &str, ctx: &BuildContext) -> Result<Vec<u8>> {
    let parsed: toml::Value = input.parse()?;
    build(schema, value::from_toml(&parsed)?, ctx)
}

/// Reads and decodes a JSON document from `path`, deriving the build's root
/// directory from the file's own parent directory so `File` fields can use
/// paths relative to it without the caller having to construct a
/// `BuildContext` by hand.
pub fn build_json_file(schema: &Schema, path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    build_json(schema, &json, &context_for(path))
}

/// The TOML counterpart to [`build_json_file`].
pub fn build_toml_file(schema: &Schema, path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let input = std::fs::read_to_string(path)?;
    build_toml(schema, &input, &context_for(path))
}

fn context_for(path: &Path) -> BuildContext {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    match dir {
        Some(dir) => BuildContext::with_root_dir(dir.to_path_buf()),
        None => BuildContext::with_root_dir(Path::new(".")),
    }
}
