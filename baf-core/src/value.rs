// Copyright the baf-core contributors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The generic decoded input tree.
//!
//! Keyed maps, ordered sequences, integers, strings, byte blobs, null — the
//! shape any reasonable config format decodes into. Turning JSON/TOML text
//! into this shape is someone else's job: we lean on `serde_json`/`toml`'s
//! own value types rather than hand-rolling a decoder.

use std::collections::HashMap;

use crate::error::{BafError, Result};
use crate::schema::Schema;
use crate::tree::NodeId;

/// A node in the generic decoded input tree, or one of the two protocol
/// extensions the engine itself recognizes: an already-built datum handed
/// back in by a setter, and a packed-type refinement tuple.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Int(i128),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    Seq(Vec<Value>),
    Map(HashMap<String, Value>),
    /// A `(Subtype, payload)` pair narrowing an abstract field's model.
    Packed(Box<Schema>, Box<Value>),
    /// A slot already holding a built datum (e.g. returned by a setter that
    /// built a child itself); installed verbatim, skipping refinement.
    Built(NodeId),
}

impl Value {
    pub fn map(pairs: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Value {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_empty_ish(&self) -> bool {
        matches!(self, Value::Null) || matches!(self, Value::Seq(s) if s.is_empty())
    }

    /// A short type name for error messages, e.g. "int", "map".
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "map",
            Value::Packed(_, _) => "packed",
            Value::Built(_) => "built datum",
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

pub fn from_json(v: &serde_json::Value) -> Result<Value> {
    Ok(match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i as i128)
            } else if let Some(u) = n.as_u64() {
                Value::Int(u as i128)
            } else {
                return Err(BafError::Validation(format!(
                    "non-integral JSON number: {n}"
                )));
            }
        }
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(a) => {
            Value::Seq(a.iter().map(from_json).collect::<Result<_>>()?)
        }
        serde_json::Value::Object(o) => Value::Map(
            o.iter()
                .map(|(k, v)| Ok((k.clone(), from_json(v)?)))
                .collect::<Result<_>>()?,
        ),
    })
}

pub fn from_toml(v: &toml::Value) -> Result<Value> {
    Ok(match v {
        toml::Value::Boolean(b) => Value::Bool(*b),
        toml::Value::Integer(i) => Value::Int(*i as i128),
        toml::Value::Float(_) => {
            return Err(BafError::Validation(
                "floating point TOML values are not a supported datum input".into(),
            ))
        }
        toml::Value::String(s) => Value::Str(s.clone()),
        toml::Value::Datetime(d) => Value::Str(d.to_string()),
        toml::Value::Array(a) => Value::Seq(a.iter().map(from_toml).collect::<Result<_>>()?),
        toml::Value::Table(t) => Value::Map(
            t.iter()
                .map(|(k, v)| Ok((k.clone(), from_toml(v)?)))
                .collect::<Result<_>>()?,
        ),
    })
}
