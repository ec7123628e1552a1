//! Domain core for versioned educational content.
//!
//! Holds the content model, the version lifecycle state machine, bulk
//! request types, and the storage and generation seams. No network or
//! database code lives here.

pub mod bulk;
pub mod content;
pub mod error;
pub mod generation;
pub mod lifecycle;
pub mod store;
pub mod types;
