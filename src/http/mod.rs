//! Request/response data model, bodies, and multipart encoding.

pub mod body;
pub mod decoded;
pub mod multipart;
pub mod request;
pub mod response;

// Re-exports for convenience
pub use body::Body;
pub use decoded::Decoded;
pub use multipart::{Form, Part};
pub use request::Request;
pub use response::Response;
