pub mod client;
pub mod envelope;

pub use client::{ApiClient, ApiResponse};
pub use envelope::{collection_items, extract_error_message, is_rejected, parse_body};
