//! Repository contracts and SQLite implementations.
//!
//! `crud` carries the typed per-model repository; `dynamic` erases it behind
//! an object-safe record surface for name-based resolution.

pub mod crud;
pub mod dynamic;
