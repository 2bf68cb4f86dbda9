//! Conversation turns exchanged with the planning model.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of the conversation so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Validate an inbound conversation and return the latest user request.
///
/// The conversation must be non-empty, contain no blank turns, and end
/// with a `user` turn.
pub fn latest_user_request(turns: &[ChatTurn]) -> Result<&str, CoreError> {
    let last = turns
        .last()
        .ok_or_else(|| CoreError::Validation("messages must not be empty".into()))?;

    if let Some(idx) = turns.iter().position(|t| t.content.trim().is_empty()) {
        return Err(CoreError::Validation(format!(
            "message {idx} has empty content"
        )));
    }

    if last.role != Role::User {
        return Err(CoreError::Validation(
            "the last message must come from the user".into(),
        ));
    }

    Ok(&last.content)
}
