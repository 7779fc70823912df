//! HTTP collaborators for the lookup engine
//!
//! Implementations of [`FallbackResolver`](lookup_engine::FallbackResolver),
//! [`DetailProvider`](lookup_engine::DetailProvider) and
//! [`DerivedFieldGenerator`](lookup_engine::DerivedFieldGenerator) that POST
//! JSON to a generative endpoint. Answers may be the payload itself or an
//! LLM envelope (`message.content`, `choices[0].message.content` or
//! `response`) whose text carries the payload as a JSON fragment.
//!
//! Transport failures map onto the engine's error types, so a dead endpoint
//! surfaces as a miss or a retryable cache error, never a panic.

#![warn(missing_docs)]

pub mod client;
pub mod detail;
pub mod envelope;
pub mod error;
pub mod generator;
pub mod resolver;

pub use client::{parse_endpoint, EndpointConfig, JsonEndpoint};
pub use detail::{parse_record, HttpDetailProvider};
pub use envelope::{decode_payload, decode_text, extract_json_fragment, extract_llm_content};
pub use error::{HttpError, HttpResult};
pub use generator::HttpGenerator;
pub use resolver::{parse_answer, HttpResolver};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
