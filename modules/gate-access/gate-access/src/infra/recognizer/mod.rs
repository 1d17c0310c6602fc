//! Plate recognizer clients.

mod http_client;

pub use http_client::{HttpRecognizer, RetryPolicy};
