// Copyright the baf-core contributors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Datum models (schemas).
//!
//! A [`Schema`] is a reusable template node, immutable after declaration and
//! shared read-only across every tree that references it. It is a sealed
//! sum type rather than an open class hierarchy: a variant-per-kind type
//! with a method table, instead of dynamic dispatch through inheritance.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::tree::{BafTree, NodeId};
use crate::value::Value;

/// Bit-width and sign interpretation of a fixed-width integer datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntKind {
    U8,
    U16,
    U32,
    S8,
    S16,
    S32,
    I8,
    I16,
    I32,
}

impl IntKind {
    pub fn bit_size(self) -> u32 {
        match self {
            IntKind::U8 | IntKind::S8 | IntKind::I8 => 8,
            IntKind::U16 | IntKind::S16 | IntKind::I16 => 16,
            IntKind::U32 | IntKind::S32 | IntKind::I32 => 32,
        }
    }

    pub fn byte_len(self) -> usize {
        (self.bit_size() / 8) as usize
    }

    /// `[min, max]` is `[0, 2^bits - 1]` for unsigned, `[-2^(bits-1),
    /// 2^(bits-1) - 1]` for signed, and `[signed_min, unsigned_max]` for the
    /// ambiguous widths.
    pub fn min(self) -> i128 {
        match self {
            IntKind::U8 | IntKind::U16 | IntKind::U32 => 0,
            IntKind::S8 | IntKind::I8 => -(1i128 << 7),
            IntKind::S16 | IntKind::I16 => -(1i128 << 15),
            IntKind::S32 | IntKind::I32 => -(1i128 << 31),
        }
    }

    pub fn max(self) -> i128 {
        match self {
            IntKind::U8 => (1i128 << 8) - 1,
            IntKind::U16 => (1i128 << 16) - 1,
            IntKind::U32 => (1i128 << 32) - 1,
            IntKind::S8 => (1i128 << 7) - 1,
            IntKind::S16 => (1i128 << 15) - 1,
            IntKind::S32 => (1i128 << 31) - 1,
            IntKind::I8 => IntKind::U8.max(),
            IntKind::I16 => IntKind::U16.max(),
            IntKind::I32 => IntKind::U32.max(),
        }
    }
}

impl fmt::Display for IntKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntKind::U8 => "U8",
            IntKind::U16 => "U16",
            IntKind::U32 => "U32",
            IntKind::S8 => "S8",
            IntKind::S16 => "S16",
            IntKind::S32 => "S32",
            IntKind::I8 => "I8",
            IntKind::I16 => "I16",
            IntKind::I32 => "I32",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct IntSchema {
    pub kind: IntKind,
    pub default: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct BytesSchema {
    pub size: Option<usize>,
    pub default: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct FileSchema {
    pub default: Option<String>,
}

/// A setter: a per-field callback computing a field's value from the
/// record's raw input map, given access to the tree for querying sibling
/// sizes/offsets/values. Returning `Err(BafError::Dependency(_))` defers
/// the field to a later resolver pass.
pub type Setter = Arc<dyn Fn(&mut BafTree, NodeId, &Value) -> Result<Value> + Send + Sync>;

#[derive(Clone)]
pub struct BlockField {
    pub name: String,
    pub schema: Schema,
}

/// A record: an ordered set of named fields. `family` marks this schema as
/// a member of a refinement family — a field declared with an abstract
/// `Block` schema accepts any `(Subtype, payload)` input whose subtype
/// schema shares the same `family`.
#[derive(Clone)]
pub struct BlockSchema {
    pub name: String,
    pub fields: Vec<BlockField>,
    pub setters: HashMap<String, Setter>,
    pub family: Option<Arc<str>>,
}

impl fmt::Debug for BlockSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockSchema")
            .field("name", &self.name)
            .field("fields", &self.fields.iter().map(|f| &f.name).collect::<Vec<_>>())
            .field("family", &self.family)
            .finish()
    }
}

impl BlockSchema {
    pub fn builder(name: impl Into<String>) -> BlockSchemaBuilder {
        BlockSchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            setters: HashMap::new(),
            family: None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Schema> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.schema)
    }
}

pub struct BlockSchemaBuilder {
    name: String,
    fields: Vec<BlockField>,
    setters: HashMap<String, Setter>,
    family: Option<Arc<str>>,
}

impl BlockSchemaBuilder {
    pub fn field(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.fields.push(BlockField {
            name: name.into(),
            schema,
        });
        self
    }

    pub fn setter(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&mut BafTree, NodeId, &Value) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.setters.insert(name.into(), Arc::new(f));
        self
    }

    /// Marks this schema as abstract, belonging to refinement family `id`.
    /// Any schema built with the same `family` is an accepted subtype.
    pub fn family(mut self, id: impl Into<Arc<str>>) -> Self {
        self.family = Some(id.into());
        self
    }

    pub fn build(self) -> Schema {
        Schema::Block(Arc::new(BlockSchema {
            name: self.name,
            fields: self.fields,
            setters: self.setters,
            family: self.family,
        }))
    }
}

#[derive(Debug, Clone)]
pub struct ArraySchema {
    pub element: Option<Box<Schema>>,
    /// Declared element count. Negative is a deferred `Spec` error, checked
    /// at build time rather than construction time so it can be produced
    /// programmatically (e.g. from a setter-computed count).
    pub count: Option<i64>,
    pub default: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Copy)]
pub enum AlignSource {
    Literal(u32),
    /// Derive the alignment from a primitive's statically-known width —
    /// the Rust analogue of passing an unbuilt primitive datum to `Align()`
    /// in the original implementation, which is safe because a primitive's
    /// `size()` never depends on build state.
    FromWidth(IntKind),
}

impl AlignSource {
    pub fn resolve(self) -> u32 {
        match self {
            AlignSource::Literal(n) => n,
            AlignSource::FromWidth(k) => k.byte_len() as u32,
        }
    }
}

/// The sealed set of datum models.
#[derive(Clone)]
pub enum Schema {
    Int(IntSchema),
    Bytes(BytesSchema),
    File(FileSchema),
    Block(Arc<BlockSchema>),
    Array(Box<ArraySchema>),
    Optional(Box<Schema>),
    Align(AlignSource),
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}

impl Schema {
    pub fn int(kind: IntKind) -> Schema {
        Schema::Int(IntSchema { kind, default: None })
    }

    pub fn int_default(kind: IntKind, default: i64) -> Schema {
        Schema::Int(IntSchema {
            kind,
            default: Some(default),
        })
    }

    pub fn bytes(size: Option<usize>) -> Schema {
        Schema::Bytes(BytesSchema { size, default: None })
    }

    pub fn file() -> Schema {
        Schema::File(FileSchema::default())
    }

    pub fn array(element: Schema, count: Option<i64>) -> Schema {
        Schema::Array(Box::new(ArraySchema {
            element: Some(Box::new(element)),
            count,
            default: None,
        }))
    }

    pub fn optional(inner: Schema) -> Schema {
        Schema::Optional(Box::new(inner))
    }

    pub fn align(align_size: u32) -> Schema {
        Schema::Align(AlignSource::Literal(align_size))
    }

    pub fn align_of(kind: IntKind) -> Schema {
        Schema::Align(AlignSource::FromWidth(kind))
    }

    /// Whether this field needs no input data to satisfy preflight
    /// validation: generators and `Optional` wrappers.
    pub fn is_self_sufficient(&self) -> bool {
        matches!(self, Schema::Align(_) | Schema::Optional(_))
    }

    pub fn has_default(&self) -> bool {
        match self {
            Schema::Int(s) => s.default.is_some(),
            Schema::Bytes(s) => s.default.is_some(),
            Schema::File(s) => s.default.is_some(),
            Schema::Array(s) => s.default.is_some(),
            _ => false,
        }
    }

    pub fn default_value(&self) -> Option<Value> {
        match self {
            Schema::Int(s) => s.default.map(|v| Value::Int(v as i128)),
            Schema::Bytes(s) => s.default.clone().map(Value::Bytes),
            Schema::File(s) => s.default.clone().map(Value::Str),
            Schema::Array(s) => s.default.clone().map(Value::Seq),
            _ => None,
        }
    }

    /// A human label for error paths and the visualizer, e.g. `"U16"`,
    /// `"Array[U8]"`, `"Block(Header)"`.
    pub fn type_name(&self) -> String {
        match self {
            Schema::Int(s) => s.kind.to_string(),
            Schema::Bytes(_) => "Bytes".to_string(),
            Schema::File(_) => "File".to_string(),
            Schema::Block(b) => format!("Block({})", b.name),
            Schema::Array(a) => match &a.element {
                Some(e) => format!("Array[{}]", e.type_name()),
                None => "Array[?]".to_string(),
            },
            Schema::Optional(inner) => format!("Optional[{}]", inner.type_name()),
            Schema::Align(_) => "Align".to_string(),
        }
    }
}
