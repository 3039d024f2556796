// Copyright the baf-core contributors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error taxonomy.
//!
//! Mirrors the shape of `apfs-core`'s block-reading errors: a `thiserror`
//! enum with named variants and a `Result<T>` alias used throughout the
//! crate. `Dependency` is not a "real" failure — it is the control signal
//! the resolver in [`crate::resolver`] uses to retry a field on a later
//! pass instead of unwinding the whole build.

use thiserror::Error;

/// A failure raised anywhere in the build engine.
#[derive(Debug, Error)]
pub enum BafError {
    /// An invariant was violated; indicates a bug in this crate.
    #[error("internal error: {0}")]
    Internal(String),

    /// Misuse of the schema API: a bad declaration.
    #[error("schema error: {0}")]
    Spec(String),

    /// Lifecycle misuse: building a model, double-building, a cyclical
    /// dependency, or an invalid dynamic type refinement.
    #[error("build error: {0}")]
    Build(String),

    /// The input data does not match the schema.
    #[error("validation error: {0}")]
    Validation(String),

    /// Control signal only: "cannot compute this yet, retry me later."
    /// Never meant to reach a caller of [`crate::entry::build_root`] — if it
    /// does, something outside the resolver misused [`crate::resolver::force_dependency`].
    #[error("dependency not yet resolved: {0}")]
    Dependency(String),

    /// An error annotated with the tree path at which it occurred.
    #[error("{source}\n  at {path}")]
    WithPath {
        #[source]
        source: Box<BafError>,
        path: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML decode error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, BafError>;

impl BafError {
    /// True for the `Dependency` control signal (and only for it).
    pub fn is_dependency(&self) -> bool {
        matches!(self, BafError::Dependency(_))
    }

    /// The innermost error, unwrapping any `WithPath` annotations.
    pub fn root_cause(&self) -> &BafError {
        match self {
            BafError::WithPath { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self.root_cause(), BafError::Validation(_))
    }

    pub fn is_build_error(&self) -> bool {
        matches!(self.root_cause(), BafError::Build(_))
    }

    /// Prepend a `"<container> → <slot>: <model>"` path fragment, as every
    /// container boundary does when an error escapes a field's build.
    ///
    /// `Dependency` is passed through unannotated: the resolver always
    /// intercepts it before it would reach a path boundary, so reaching
    /// this function with one means a setter raised it outside the loop
    /// that is supposed to catch it.
    pub fn with_path(self, frag: impl Into<String>) -> Self {
        match self {
            BafError::Dependency(_) => self,
            other => BafError::WithPath {
                source: Box::new(other),
                path: frag.into(),
            },
        }
    }
}
