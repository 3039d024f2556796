// Copyright the baf-core contributors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The packed-type protocol.
//!
//! A field declared with an abstract model can accept any input shaped as
//! `(Subtype, payload)`, provided `Subtype` refines the declared model.
//! Rust doesn't have object-identity subclassing to lean on, so refinement
//! here is a tag comparison: two `Block` schemas refine one another iff
//! they carry the same non-`None` `family`, set via
//! `BlockSchemaBuilder::family`.

use crate::error::{BafError, Result};
use crate::schema::Schema;
use crate::value::Value;

/// True iff `proposed` is an accepted refinement of `declared`.
///
/// Only `Block` schemas participate in refinement; every other kind must
/// match itself exactly (an `Int` field can't be refined to a different
/// `Int` width, say).
pub fn is_subtype(declared: &Schema, proposed: &Schema) -> bool {
    match (declared, proposed) {
        (Schema::Block(d), Schema::Block(p)) => match (&d.family, &p.family) {
            (Some(df), Some(pf)) => df == pf,
            _ => false,
        },
        (Schema::Int(d), Schema::Int(p)) => d.kind == p.kind,
        (Schema::Bytes(_), Schema::Bytes(_)) => true,
        (Schema::File(_), Schema::File(_)) => true,
        (Schema::Array(_), Schema::Array(_)) => true,
        (Schema::Optional(_), Schema::Optional(_)) => true,
        (Schema::Align(_), Schema::Align(_)) => true,
        _ => false,
    }
}

/// Resolves a field's effective schema and payload from its declared model
/// and raw input. A plain (non-`Packed`) value keeps the declared schema
/// unchanged; a `Packed(subtype, payload)` value is accepted only if
/// `subtype` refines `declared`.
pub fn unpack_type(declared: &Schema, value: Value) -> Result<(Schema, Value)> {
    match value {
        Value::Packed(subtype, payload) => {
            if is_subtype(declared, &subtype) {
                Ok((*subtype, *payload))
            } else {
                Err(BafError::Build(format!(
                    "{} is not a valid refinement of {}",
                    subtype.type_name(),
                    declared.type_name()
                )))
            }
        }
        other => Ok((declared.clone(), other)),
    }
}
