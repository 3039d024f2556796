// Copyright the baf-core contributors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A declarative engine for assembling binary blobs from a schema of typed
//! datum models and a decoded input tree.
//!
//! A [`schema::Schema`] describes the shape of a record the way a struct
//! declaration describes the shape of a value; [`entry::build`] (and its
//! JSON/TOML conveniences) drive a schema and a [`value::Value`] tree
//! through the [`tree::BafTree`] arena to produce the final bytes. Fields
//! that can't be resolved on a given pass — a length computed from a
//! sibling's size, a checksum computed from sibling bytes — signal
//! [`error::BafError::Dependency`] and are retried by [`resolver`] until
//! the whole record settles or a cycle is detected.

pub mod containers;
pub mod entry;
pub mod error;
pub mod primitives;
pub mod refine;
pub mod resolver;
pub mod schema;
pub mod tree;
pub mod value;
pub mod visualize;

pub use entry::{
    build, build_json, build_json_file, build_toml, build_toml_file, build_tree, BuildContext,
};
pub use error::{BafError, Result};
pub use resolver::force_dependency;
pub use schema::{ArraySchema, BlockSchema, BlockSchemaBuilder, IntKind, Schema};
pub use tree::{BafTree, NodeId};
pub use value::Value;
pub use visualize::visualize;

#[cfg(feature = "derive")]
pub use baf_derive::Block;
