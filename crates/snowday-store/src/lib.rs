//! Persisted key-value storage for SnowDay.
//!
//! The forecast cache and the community vote tally both sit on top of the
//! `KeyValueStore` trait: string keys, JSON string values, per-key atomicity
//! and nothing more.

pub mod memory;
pub mod sqlite;
pub mod store;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{JsonStoreExt, KeyValueStore, StoreResult};
