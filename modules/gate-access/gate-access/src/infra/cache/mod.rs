//! Key-value cache implementations.

mod moka_cache;

pub use moka_cache::MokaKeyValueCache;
