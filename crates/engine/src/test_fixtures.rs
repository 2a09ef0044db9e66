//! Shared test doubles.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use zonewarden_domain::{DialogEvent, DialogId, GameEvent};

use crate::infrastructure::correlator::Correlator;
use crate::infrastructure::ports::{ActionError, ActionPort, DialogResponse};

/// Build a dialog event shaped like a paginated list page.
pub fn roster_dialog(dialog_id: i64, title: &str, lines: &[&str], has_next: bool) -> GameEvent {
    let mut buttons = vec![];
    if has_next {
        buttons.push("Next".to_string());
    }
    buttons.push("Close".to_string());
    GameEvent::Dialog(DialogEvent {
        dialog_id: DialogId::new(dialog_id),
        title: title.into(),
        info: lines.join("\n"),
        buttons,
    })
}

/// An [`ActionPort`] double wired to a correlator: queued replies are
/// published shortly after the action that triggers them, mimicking the
/// bridge round-trip.
pub struct ScriptedBridge {
    correlator: Arc<Correlator>,
    commands: Mutex<Vec<String>>,
    client_actions: Mutex<Vec<String>>,
    responses: Mutex<Vec<DialogResponse>>,
    command_replies: Mutex<HashMap<String, VecDeque<GameEvent>>>,
    response_replies: Mutex<VecDeque<GameEvent>>,
    fail_commands: Mutex<bool>,
}

impl ScriptedBridge {
    pub fn new(correlator: Arc<Correlator>) -> Self {
        Self {
            correlator,
            commands: Mutex::new(Vec::new()),
            client_actions: Mutex::new(Vec::new()),
            responses: Mutex::new(Vec::new()),
            command_replies: Mutex::new(HashMap::new()),
            response_replies: Mutex::new(VecDeque::new()),
            fail_commands: Mutex::new(false),
        }
    }

    /// Queue a reply published after the next occurrence of `command`.
    pub fn queue_command_reply(&self, command: &str, event: GameEvent) {
        self.command_replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(command.to_string())
            .or_default()
            .push_back(event);
    }

    /// Queue a reply published after the next dialog response.
    pub fn queue_response_reply(&self, event: GameEvent) {
        self.response_replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(event);
    }

    /// Make every subsequent command send fail at the transport.
    pub fn fail_commands(&self) {
        *self.fail_commands.lock().unwrap_or_else(|e| e.into_inner()) = true;
    }

    pub fn sent_commands(&self) -> Vec<String> {
        self.commands.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn sent_client_actions(&self) -> Vec<String> {
        self.client_actions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn dialog_responses(&self) -> Vec<DialogResponse> {
        self.responses.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn fire(&self, event: GameEvent) {
        let correlator = self.correlator.clone();
        tokio::spawn(async move {
            // Give the caller time to register its waiter, as the real
            // network round-trip would.
            tokio::time::sleep(Duration::from_millis(5)).await;
            correlator.publish(event);
        });
    }
}

#[async_trait]
impl ActionPort for ScriptedBridge {
    async fn send_command(&self, command: &str) -> Result<(), ActionError> {
        if *self.fail_commands.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(ActionError::Transport("connection refused".into()));
        }
        self.commands
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(command.to_string());
        let reply = self
            .command_replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(command)
            .and_then(VecDeque::pop_front);
        if let Some(event) = reply {
            self.fire(event);
        }
        Ok(())
    }

    async fn send_client_action(&self, action: &str) -> Result<(), ActionError> {
        self.client_actions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(action.to_string());
        Ok(())
    }

    async fn send_dialog_response(&self, response: DialogResponse) -> Result<(), ActionError> {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(response);
        let reply = self
            .response_replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        if let Some(event) = reply {
            self.fire(event);
        }
        Ok(())
    }
}
