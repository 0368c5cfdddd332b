//! Facade over [`pipegen_core`].
//!
//! The workspace root only re-exports the engine so that the end-to-end tests
//! under `tests/` exercise the same public surface as downstream users.

pub use pipegen_core::*;
