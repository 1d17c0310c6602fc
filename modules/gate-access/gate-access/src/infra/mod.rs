//! Infrastructure layer for the gate access module.
//!
//! Contains storage, cache and recognizer adapters.

pub mod cache;
pub mod recognizer;
pub mod storage;

pub use cache::MokaKeyValueCache;
pub use recognizer::HttpRecognizer;
pub use storage::InMemoryStore;
