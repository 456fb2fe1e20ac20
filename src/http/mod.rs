// Public API - what other modules can use
pub use client::HttpClient;
pub use errors::ApiError;
pub use types::{HttpMethod, RequestBody, RequestOptions, ResponseBody};

// Internal modules
mod client;
mod errors;
mod types;
