pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;

pub use routes::router;

#[cfg(test)]
mod dto_test;
