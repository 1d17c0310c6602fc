pub mod admin;
pub mod deadline;
pub mod engine;
pub mod entitlement;
pub mod error;
pub mod ports;
pub mod priority_list;
pub mod repo;
pub mod service;
pub mod tiers;

pub use gate_access_sdk::identifier;

#[cfg(test)]
pub(crate) mod test_support;
