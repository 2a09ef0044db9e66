//! Port traits for infrastructure boundaries.
//!
//! These are the only abstractions in the engine. Ports exist for:
//! - The outbound action channel (swappable bridge transport, mocked in tests)
//! - Clock (for testing the cycle math and the scanner)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use zonewarden_domain::DialogId;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The outbound action could not be delivered to the bridge. Delivery
    /// is best-effort: success here still says nothing about the
    /// application-level effect in the game.
    #[error("transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("persistence failure ({path}): {message}")]
    Persistence { path: String, message: String },
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn persistence(path: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

// =============================================================================
// Outbound Actions
// =============================================================================

/// Structured dialog-response action, encoded on the wire as the ordered
/// quadruple `dialogId | responseCode | listIndex | inputText`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogResponse {
    pub dialog_id: DialogId,
    pub response_code: u8,
    pub list_index: usize,
    pub input_text: String,
}

impl DialogResponse {
    /// Select a list row (left button).
    pub fn select(dialog_id: DialogId, list_index: usize) -> Self {
        Self {
            dialog_id,
            response_code: 1,
            list_index,
            input_text: "0".into(),
        }
    }

    /// Advance a paginated dialog to its next page.
    pub fn next_page(dialog_id: DialogId) -> Self {
        Self {
            dialog_id,
            response_code: 0,
            list_index: 0,
            input_text: "Next".into(),
        }
    }

    pub fn encode(&self) -> String {
        format!(
            "sendDialogResponse|{}|{}|{}|{}",
            self.dialog_id, self.response_code, self.list_index, self.input_text
        )
    }
}

/// Outbound action channel for one in-game identity.
///
/// Fire-and-forget: the game acknowledges nothing at the application
/// level, so every caller correlates effects through the event stream.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActionPort: Send + Sync {
    /// Send an in-game chat command (e.g. `/gzinfo`).
    async fn send_command(&self, command: &str) -> Result<(), ActionError>;

    /// Send a client-side bridge action (e.g. `teleport|x|y|z`).
    async fn send_client_action(&self, action: &str) -> Result<(), ActionError>;

    /// Answer an open dialog.
    async fn send_dialog_response(&self, response: DialogResponse) -> Result<(), ActionError>;
}

// =============================================================================
// Clock
// =============================================================================

pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_response_encoding() {
        let next = DialogResponse::next_page(DialogId::new(37));
        assert_eq!(next.encode(), "sendDialogResponse|37|0|0|Next");

        let select = DialogResponse::select(DialogId::new(12), 4);
        assert_eq!(select.encode(), "sendDialogResponse|12|1|4|0");
    }
}
