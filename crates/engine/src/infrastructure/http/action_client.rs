//! Outbound command bridge client.
//!
//! The bridge accepts form-urlencoded POSTs: `command=` for in-game slash
//! commands, `botcommand=` for client-side actions (teleports, dialog
//! responses). One client per in-game identity, each pointed at that
//! identity's bridge port.

use async_trait::async_trait;

use crate::infrastructure::ports::{ActionError, ActionPort, DialogResponse};

pub struct HttpActionClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpActionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    async fn post(&self, field: &'static str, value: &str) -> Result<(), ActionError> {
        let response = self
            .http
            .post(&self.base_url)
            .form(&[(field, value)])
            .send()
            .await
            .map_err(|e| ActionError::Transport(e.to_string()))?;
        response
            .error_for_status()
            .map_err(|e| ActionError::Transport(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ActionPort for HttpActionClient {
    async fn send_command(&self, command: &str) -> Result<(), ActionError> {
        tracing::debug!(%command, "sending command");
        self.post("command", command).await
    }

    async fn send_client_action(&self, action: &str) -> Result<(), ActionError> {
        tracing::debug!(%action, "sending client action");
        self.post("botcommand", action).await
    }

    async fn send_dialog_response(&self, response: DialogResponse) -> Result<(), ActionError> {
        let encoded = response.encode();
        tracing::debug!(action = %encoded, "sending dialog response");
        self.post("botcommand", &encoded).await
    }
}
