//! Adapters layer: Concrete implementations of ports.
//!
//! - `forest`: tree-ensemble classifier loaded from a sealed JSON artifact
//! - `sqlite`: SQLite-backed prediction history
//! - `sanitize`: PII filtering for logs

pub mod forest;
pub mod sanitize;
pub mod sqlite;

// Re-export storage error for lib.rs
pub use sqlite::StorageError;
