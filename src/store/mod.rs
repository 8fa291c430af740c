//! Storage module for session persistence.
//!
//! Provides the local auth strategy that keeps a linked session on disk,
//! and an in-memory store for development and testing.

mod traits;
mod local;
mod memory;

pub use traits::*;
pub use local::*;
pub use memory::*;
