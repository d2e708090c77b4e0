//! API layer
//!
//! The response envelope shared by every endpoint, the `Backend` trait the
//! admin controllers talk to, and its HTTP and in-process implementations.

mod backend;
mod envelope;
mod http;
mod local;

pub use backend::{Backend, ClientError, PriceTarget};
pub use envelope::{ApiResponse, Empty, FieldErrors, Status};
pub use http::HttpBackend;
pub use local::LocalBackend;
