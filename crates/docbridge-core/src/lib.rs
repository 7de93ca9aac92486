//! # docbridge-core
//!
//! Core types, traits, and abstractions for docbridge.
//!
//! This crate provides the foundational data structures and trait definitions
//! that the store, inference, jobs, and API crates depend on.

pub mod defaults;
pub mod error;
pub mod fields;
pub mod logging;
pub mod models;
pub mod tags;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use fields::{collect_field_instructions, ExtractableField, FieldInstruction};
pub use models::*;
pub use tags::{TagAction, TagDirective};
pub use traits::*;
