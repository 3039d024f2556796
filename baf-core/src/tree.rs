// Copyright the baf-core contributors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The instance tree.
//!
//! Modeling parent links as owning references is cyclic, and
//! object-identity inheritance doesn't translate to Rust. Instead: store
//! children in owning position inside the parent, keep parent links as
//! non-owning indices into an arena, make ancestor walks iterative — exactly
//! what an arena of `Node`s addressed by a plain `usize` gives us for free,
//! so that's what this module is.
//!
//! Every datum operation (`instantiate`, `build`, `size`, `bytes`, `offset`,
//! `root`) is an inherent method on [`BafTree`] taking a [`NodeId`], rather
//! than a method on some per-kind object — the method table over a sealed
//! sum type, instead of dynamic dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{BafError, Result};
use crate::schema::{ArraySchema, BlockSchema, Schema};
use crate::value::Value;

/// An index into a [`BafTree`]'s arena. Cheap to copy, never dangling for
/// the lifetime of the tree that produced it (nodes are never removed).
pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct IntState {
    pub kind: crate::schema::IntKind,
    pub value: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct BytesState {
    pub declared_size: Option<usize>,
    pub data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct FileState {
    pub data: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct BlockState {
    pub schema: Arc<BlockSchema>,
    /// Field nodes in declaration order. Always populated — fields are
    /// instantiated eagerly at `Block` construction time so their `offset()`
    /// is queryable even before the record itself builds.
    pub fields: Vec<(String, NodeId)>,
}

#[derive(Debug, Clone)]
pub struct ArrayState {
    pub schema: ArraySchema,
    pub items: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct OptionalState {
    pub inner: Box<Schema>,
    pub item: Option<NodeId>,
}

#[derive(Debug, Clone, Copy)]
pub struct AlignState {
    pub align: u32,
}

#[derive(Debug, Clone)]
pub enum DatumState {
    Int(IntState),
    Bytes(BytesState),
    File(FileState),
    Block(BlockState),
    Array(ArrayState),
    Optional(OptionalState),
    Align(AlignState),
}

impl DatumState {
    fn kind_name(&self) -> &'static str {
        match self {
            DatumState::Int(_) => "Int",
            DatumState::Bytes(_) => "Bytes",
            DatumState::File(_) => "File",
            DatumState::Block(_) => "Block",
            DatumState::Array(_) => "Array",
            DatumState::Optional(_) => "Optional",
            DatumState::Align(_) => "Align",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub is_instance: bool,
    pub is_built: bool,
    /// Propagated from the parent at instantiation time; used when an
    /// `Array`/`Optional` is declared with no explicit element model and
    /// must infer one from context instead.
    pub generic_hint: Option<Box<Schema>>,
    pub state: DatumState,
}

/// Owns every instance in one build. Destroyed wholesale with the caller's
/// root handle; there is no per-node teardown.
#[derive(Debug, Default)]
pub struct BafTree {
    nodes: Vec<Node>,
}

impl BafTree {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn root(&self, mut id: NodeId) -> NodeId {
        while let Some(p) = self.nodes[id].parent {
            id = p;
        }
        id
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn is_built(&self, id: NodeId) -> bool {
        self.nodes[id].is_built
    }

    pub fn generic_hint(&self, id: NodeId) -> Option<Schema> {
        self.nodes[id].generic_hint.as_deref().cloned()
    }

    /// Fresh instance of `schema` linked under `parent` (or root if `None`).
    /// Mirrors `DatatypeBase.instantiate`: copies the (immutable) model,
    /// stamps it as an instance, and propagates the parent's generic hint
    /// when this model doesn't carry its own.
    pub fn instantiate(&mut self, schema: &Schema, parent: Option<NodeId>) -> Result<NodeId> {
        let generic_hint = parent.and_then(|p| self.nodes[p].generic_hint.clone());
        let state = match schema {
            Schema::Int(s) => DatumState::Int(IntState {
                kind: s.kind,
                value: None,
            }),
            Schema::Bytes(s) => DatumState::Bytes(BytesState {
                declared_size: s.size,
                data: None,
            }),
            Schema::File(_) => DatumState::File(FileState::default()),
            Schema::Block(b) => {
                let id_placeholder = self.nodes.len();
                let mut fields = Vec::with_capacity(b.fields.len());
                for field in &b.fields {
                    let child = self.instantiate(&field.schema, Some(id_placeholder))?;
                    fields.push((field.name.clone(), child));
                }
                DatumState::Block(BlockState {
                    schema: b.clone(),
                    fields,
                })
            }
            Schema::Array(a) => DatumState::Array(ArrayState {
                schema: (**a).clone(),
                items: Vec::new(),
            }),
            Schema::Optional(inner) => DatumState::Optional(OptionalState {
                inner: inner.clone(),
                item: None,
            }),
            Schema::Align(src) => {
                let align = src.resolve();
                if align < 2 {
                    return Err(BafError::Spec(format!(
                        "Align requires an alignment of at least 2, got {align}"
                    )));
                }
                DatumState::Align(AlignState { align })
            }
        };

        let id = self.nodes.len();
        self.nodes.push(Node {
            parent,
            is_instance: true,
            is_built: false,
            generic_hint,
            state,
        });
        Ok(id)
    }

    fn mark_built(&mut self, id: NodeId) -> Result<()> {
        if !self.nodes[id].is_instance {
            return Err(BafError::Build(
                "attempted to build a non-instantiated model".into(),
            ));
        }
        if self.nodes[id].is_built {
            return Err(BafError::Build(
                "attempted to build an already-built datum".into(),
            ));
        }
        self.nodes[id].is_built = true;
        Ok(())
    }

    /// Dispatches to the per-kind `_build` hook, after stamping `is_built`
    /// so inner accesses during the build see a self-consistent state.
    pub fn build(&mut self, ctx: &crate::entry::BuildContext, id: NodeId, data: Value) -> Result<()> {
        self.mark_built(id)?;
        match &self.nodes[id].state {
            DatumState::Int(_) => crate::primitives::build_int(self, id, data),
            DatumState::Bytes(_) => crate::primitives::build_bytes(self, id, data),
            DatumState::File(_) => crate::primitives::build_file(self, ctx, id, data),
            DatumState::Block(_) => crate::resolver::build_block(self, ctx, id, data),
            DatumState::Array(_) => crate::containers::build_array(self, ctx, id, data),
            DatumState::Optional(_) => crate::containers::build_optional(self, ctx, id, data),
            DatumState::Align(_) => crate::containers::build_align(self, id),
        }
    }

    pub fn size(&mut self, id: NodeId) -> Result<usize> {
        match self.nodes[id].state.clone() {
            DatumState::Int(s) => Ok(s.kind.byte_len()),
            DatumState::Bytes(s) => match s.declared_size {
                Some(n) => Ok(n),
                None => match s.data {
                    Some(d) => Ok(d.len()),
                    None => Err(BafError::Dependency("size of Bytes is not yet known".into())),
                },
            },
            DatumState::File(s) => match s.data {
                Some(d) => Ok(d.len()),
                None => Err(BafError::Dependency("size of File is not yet known".into())),
            },
            DatumState::Block(b) => {
                let mut total = 0usize;
                for (_, child) in &b.fields {
                    total += self.size(*child)?;
                }
                Ok(total)
            }
            DatumState::Array(_) => {
                let items = self.get_items(id, true)?;
                let mut total = 0usize;
                for child in items {
                    total += self.size(child)?;
                }
                Ok(total)
            }
            DatumState::Optional(o) => {
                if !self.nodes[id].is_built {
                    return Err(BafError::Dependency(
                        "cannot get size of Optional before it's built".into(),
                    ));
                }
                match o.item {
                    Some(item) => self.size(item),
                    None => Ok(0),
                }
            }
            DatumState::Align(a) => {
                let off = self.offset(id)?;
                let align = a.align as usize;
                Ok((align - off % align) % align)
            }
        }
    }

    pub fn bytes(&mut self, id: NodeId) -> Result<Vec<u8>> {
        if !self.nodes[id].is_instance || !self.nodes[id].is_built {
            return Err(BafError::Build(
                "attempted to get bytes from a datum that has not yet been built".into(),
            ));
        }
        match self.nodes[id].state.clone() {
            DatumState::Int(s) => {
                let value = s
                    .value
                    .ok_or_else(|| BafError::Build("primitive does not yet have a value".into()))?;
                let le = value.to_le_bytes();
                Ok(le[..s.kind.byte_len()].to_vec())
            }
            DatumState::Bytes(s) => Ok(s.data.unwrap_or_default()),
            DatumState::File(s) => Ok(s.data.unwrap_or_default()),
            DatumState::Block(b) => {
                let mut out = Vec::new();
                for (_, child) in &b.fields {
                    out.extend(self.bytes(*child)?);
                }
                Ok(out)
            }
            DatumState::Array(_) => {
                let items = self.get_items(id, false)?;
                let mut out = Vec::new();
                for child in items {
                    out.extend(self.bytes(child)?);
                }
                Ok(out)
            }
            DatumState::Optional(o) => match o.item {
                Some(item) => self.bytes(item),
                None => Ok(Vec::new()),
            },
            DatumState::Align(_) => {
                let pad = self.size(id)?;
                Ok(vec![0u8; pad])
            }
        }
    }

    pub fn offset(&mut self, id: NodeId) -> Result<usize> {
        match self.nodes[id].parent {
            None => Ok(0),
            Some(parent) => self.offset_of(parent, id),
        }
    }

    fn offset_of(&mut self, container: NodeId, target: NodeId) -> Result<usize> {
        let items = self.get_items(container, true)?;
        let mut offset = 0usize;
        for item in items {
            if item == target {
                return Ok(offset);
            }
            offset += self.size(item)?;
        }
        Err(BafError::Internal("could not find self in parent".into()))
    }

    /// The ordered list of child datums of a `Block` or `Array`. With
    /// `use_defaults`, unbuilt `Array` slots are padded with fresh default
    /// instances so `offset_of` queries can proceed.
    pub fn get_items(&mut self, id: NodeId, use_defaults: bool) -> Result<Vec<NodeId>> {
        match self.nodes[id].state.clone() {
            DatumState::Block(b) => Ok(b.fields.iter().map(|(_, c)| *c).collect()),
            DatumState::Array(a) => {
                let items = a.items.clone();
                let Some(count) = a.schema.count else {
                    if items.is_empty() {
                        return Err(BafError::Dependency(
                            "cannot get items of un-built Array with unknown size".into(),
                        ));
                    }
                    return Ok(items);
                };
                let remaining = count as usize - items.len();
                if remaining == 0 {
                    return Ok(items);
                }
                if !use_defaults {
                    return Err(BafError::Dependency("Array is not finished building".into()));
                }
                let element = a
                    .schema
                    .element
                    .clone()
                    .or_else(|| self.nodes[id].generic_hint.clone())
                    .ok_or_else(|| BafError::Spec("Array has no valid element model".into()))?;
                let mut out = items;
                for _ in 0..remaining {
                    out.push(self.instantiate(&element, Some(id))?);
                }
                Ok(out)
            }
            other => Err(BafError::Internal(format!(
                "get_items called on non-container datum {}",
                other.kind_name()
            ))),
        }
    }

    // --- kind-specific accessors used by primitives.rs / containers.rs / resolver.rs ---

    pub fn int_state(&self, id: NodeId) -> &IntState {
        match &self.nodes[id].state {
            DatumState::Int(s) => s,
            _ => unreachable!("int_state called on non-Int node"),
        }
    }

    /// A built integer's value; `Dependency` if it hasn't built yet. The
    /// ergonomic counterpart to `int(x)` on a primitive in the original
    /// implementation, for setters that need a sibling's resolved value.
    pub fn int_value(&self, id: NodeId) -> Result<i64> {
        self.int_state(id)
            .value
            .ok_or_else(|| BafError::Dependency("integer datum is not yet built".into()))
    }

    pub fn set_int_value(&mut self, id: NodeId, value: i64) {
        if let DatumState::Int(s) = &mut self.nodes[id].state {
            s.value = Some(value);
        }
    }

    pub fn bytes_state(&self, id: NodeId) -> &BytesState {
        match &self.nodes[id].state {
            DatumState::Bytes(s) => s,
            _ => unreachable!("bytes_state called on non-Bytes node"),
        }
    }

    pub fn set_bytes_data(&mut self, id: NodeId, data: Vec<u8>) {
        if let DatumState::Bytes(s) = &mut self.nodes[id].state {
            s.data = Some(data);
        }
    }

    pub fn set_file_data(&mut self, id: NodeId, data: Vec<u8>) {
        if let DatumState::File(s) = &mut self.nodes[id].state {
            s.data = Some(data);
        }
    }

    pub fn block_schema(&self, id: NodeId) -> Arc<BlockSchema> {
        match &self.nodes[id].state {
            DatumState::Block(b) => b.schema.clone(),
            _ => unreachable!("block_schema called on non-Block node"),
        }
    }

    pub fn block_field_node(&self, id: NodeId, name: &str) -> Option<NodeId> {
        match &self.nodes[id].state {
            DatumState::Block(b) => b.fields.iter().find(|(n, _)| n == name).map(|(_, c)| *c),
            _ => None,
        }
    }

    /// Replaces a field slot's node with a fresh instance of `schema`,
    /// returning the new node id. Used both for ordinary field resolution
    /// (the placeholder's schema always matches) and for dynamic refinement,
    /// where the resolved subtype differs from the declared placeholder.
    pub fn replace_block_field(&mut self, block: NodeId, name: &str, schema: &Schema) -> Result<NodeId> {
        let new_id = self.instantiate(schema, Some(block))?;
        match &mut self.nodes[block].state {
            DatumState::Block(b) => {
                let slot = b
                    .fields
                    .iter_mut()
                    .find(|(n, _)| n == name)
                    .ok_or_else(|| BafError::Internal(format!("no such field: {name}")))?;
                slot.1 = new_id;
                Ok(new_id)
            }
            _ => Err(BafError::Internal("replace_block_field on non-Block".into())),
        }
    }

    /// Installs an already-built datum directly into a field slot: the
    /// "data is already a built datum of the expected type" shortcut, used
    /// when a setter builds a child itself and hands back the result.
    pub fn install_block_field(&mut self, block: NodeId, name: &str, existing: NodeId) -> Result<()> {
        match &mut self.nodes[block].state {
            DatumState::Block(b) => {
                let slot = b
                    .fields
                    .iter_mut()
                    .find(|(n, _)| n == name)
                    .ok_or_else(|| BafError::Internal(format!("no such field: {name}")))?;
                slot.1 = existing;
                Ok(())
            }
            _ => Err(BafError::Internal("install_block_field on non-Block".into())),
        }
    }

    pub fn array_schema(&self, id: NodeId) -> ArraySchema {
        match &self.nodes[id].state {
            DatumState::Array(a) => a.schema.clone(),
            _ => unreachable!("array_schema called on non-Array node"),
        }
    }

    pub fn set_array_items(&mut self, id: NodeId, items: Vec<NodeId>, inferred_count: Option<i64>) {
        if let DatumState::Array(a) = &mut self.nodes[id].state {
            a.items = items;
            if a.schema.count.is_none() {
                a.schema.count = inferred_count;
            }
        }
    }

    pub fn optional_inner(&self, id: NodeId) -> Schema {
        match &self.nodes[id].state {
            DatumState::Optional(o) => (*o.inner).clone(),
            _ => unreachable!("optional_inner called on non-Optional node"),
        }
    }

    pub fn set_optional_item(&mut self, id: NodeId, item: Option<NodeId>) {
        if let DatumState::Optional(o) = &mut self.nodes[id].state {
            o.item = item;
        }
    }

    /// True iff the `Optional` resolved to a present inner datum. Querying
    /// before build is ambiguous, since presence is exactly what build
    /// decides.
    pub fn optional_is_present(&self, id: NodeId) -> Result<bool> {
        if !self.nodes[id].is_built {
            return Err(BafError::Dependency(
                "Optional is ambiguous until it is built".into(),
            ));
        }
        match &self.nodes[id].state {
            DatumState::Optional(o) => Ok(o.item.is_some()),
            _ => unreachable!("optional_is_present called on non-Optional node"),
        }
    }

    pub fn is_optional_empty(&self, id: NodeId) -> bool {
        matches!(&self.nodes[id].state, DatumState::Optional(o) if o.item.is_none())
    }

    pub fn kind_name(&self, id: NodeId) -> &'static str {
        self.nodes[id].state.kind_name()
    }

    pub fn matches_schema_kind(&self, id: NodeId, schema: &Schema) -> bool {
        match (&self.nodes[id].state, schema) {
            (DatumState::Int(s), Schema::Int(sc)) => s.kind == sc.kind,
            (DatumState::Bytes(_), Schema::Bytes(_)) => true,
            (DatumState::File(_), Schema::File(_)) => true,
            (DatumState::Block(s), Schema::Block(sc)) => Arc::ptr_eq(&s.schema, sc) || s.schema.name == sc.name,
            (DatumState::Array(_), Schema::Array(_)) => true,
            (DatumState::Optional(_), Schema::Optional(_)) => true,
            (DatumState::Align(_), Schema::Align(_)) => true,
            _ => false,
        }
    }
}
