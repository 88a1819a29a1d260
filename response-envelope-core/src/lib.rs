//! Core deserialization types for response envelopes.
//!
//! This crate provides the format-level pieces used by `response-envelope`
//! and by any HTTP client that wants to decode response bodies lazily.
//!
//! ## Modules
//!
//! - [`content_type`]: Parsed `Content-Type` hints
//! - [`deserializer`]: The [`Deserializer`] and [`Decode`] capabilities and built-in formats
//! - [`error`]: [`DeserializationError`] and its classification

mod content_type;
mod deserializer;
mod error;

pub use content_type::*;
pub use deserializer::*;
pub use error::*;
