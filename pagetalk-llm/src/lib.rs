//! Completion-service clients for the Pagetalk backend.
//!
//! - [`traits::CompletionClient`]: the seam the chat handler talks through
//! - [`groq::GroqClient`]: OpenAI-compatible chat-completions implementation

pub mod groq;
pub mod traits;

pub use traits::{ChatMessage, CompletionClient};
