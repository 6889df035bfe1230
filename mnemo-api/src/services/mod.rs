//! Service Layer
//!
//! Business logic behind the HTTP handlers, independent of axum types.

mod generation_service;

pub use generation_service::*;
