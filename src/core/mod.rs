//! Core Service Layer
//!
//! Shared infrastructure: request context and the error taxonomy.

pub mod ctx;
pub mod error;

pub use ctx::Ctx;
pub use error::{Error, Result};
