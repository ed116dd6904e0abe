//! Base types and error handling.
//!
//! Provides the foundational [`RestError`] taxonomy shared by every layer
//! of the request pipeline.

pub mod error;

pub use error::{BoxError, RestError};
