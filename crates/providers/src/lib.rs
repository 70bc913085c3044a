//! Uniform clients for the external AI providers.
//!
//! Each provider module speaks one vendor HTTP API with reqwest; the
//! [`facade::ProviderFacade`] is the only type the application layer touches.

pub mod error;
pub mod facade;
pub mod gemini;
pub mod luma;
pub mod openai;
pub mod sse;
