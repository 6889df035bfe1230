//! OpenAI provider implementation
//!
//! Image generation through the OpenAI images endpoint.

pub mod client;
pub mod images;
pub mod types;

pub use client::{OpenAIClient, DEFAULT_BASE_URL, DEFAULT_REQUEST_TIMEOUT};
pub use images::OpenAIImageSynthesizer;
