//! Row structs for the persistence layer.
//!
//! Each submodule holds a `FromRow` struct matching the table row and the
//! conversions to and from the core domain type.

pub mod content_item;
