//! Storage implementations for the gate access module.

mod in_memory_repo;

pub use in_memory_repo::InMemoryStore;
