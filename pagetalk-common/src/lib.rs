//! Common types and utilities shared across Pagetalk crates.
//!
//! This crate defines the shared error taxonomy and the observability
//! helpers used by every binary and integration test in the workspace. It
//! is intentionally lightweight so that all crates can depend on it without
//! pulling in heavy transitive costs.
//!
//! # Overview
//!
//! - [`PagetalkError`] and [`Result`]: shared error handling
//! - [`observability`]: centralised tracing/logging initialisation

use serde::{Deserialize, Serialize};

pub mod observability;

/// Error types used across the Pagetalk system.
///
/// Per-URL scrape failures never surface through this type; the orchestrator
/// absorbs them and degrades to empty content. These variants cover the two
/// failures that *are* allowed to reach a caller: the completion call and
/// configuration.
#[derive(thiserror::Error, Debug)]
pub enum PagetalkError {
    /// The completion service failed or returned an unusable payload.
    #[error("completion error: {0}")]
    Completion(String),

    /// Configuration was incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenient alias for results that use [`PagetalkError`].
pub type Result<T> = std::result::Result<T, PagetalkError>;

/// Role of a single conversation turn as stored and assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
    System,
}

impl TurnRole {
    /// Wire name used in outbound completion messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
            TurnRole::System => "system",
        }
    }
}

/// One prior turn of a conversation. The assembler treats turns as an
/// ordered sequence and never mutates the ones it receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
}
