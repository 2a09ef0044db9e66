//! Inbound notification routes.
//!
//! The game-client bridge POSTs dialogs, chat lines, and HUD overlays
//! here as they happen. Each in-game identity (the primary bot and the
//! scanner probe) has its own routes feeding its own correlator, because
//! each identity's dialog channel is a separate shared resource.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use zonewarden_domain::{
    ChatLineEvent, DialogEvent, DialogId, GameEvent, OverlayId, TextOverlayEvent,
};

use crate::infrastructure::correlator::Correlator;

#[derive(Clone)]
pub struct IngressState {
    pub primary: Arc<Correlator>,
    pub probe: Arc<Correlator>,
}

#[derive(Debug, Deserialize)]
pub struct DialogPayload {
    pub dialog_id: i64,
    pub title: String,
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub buttons: Vec<String>,
}

impl DialogPayload {
    fn into_event(self) -> GameEvent {
        GameEvent::Dialog(DialogEvent {
            dialog_id: DialogId::new(self.dialog_id),
            title: self.title,
            info: self.info,
            buttons: self.buttons,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatPayload {
    #[serde(default)]
    pub message: String,
}

impl ChatPayload {
    fn into_event(self) -> GameEvent {
        GameEvent::ChatLine(ChatLineEvent { raw: self.message })
    }
}

#[derive(Debug, Deserialize)]
pub struct TextOverlayPayload {
    pub textdraw_id: i64,
    #[serde(default)]
    pub text: String,
}

impl TextOverlayPayload {
    fn into_event(self) -> GameEvent {
        GameEvent::TextOverlay(TextOverlayEvent {
            overlay_id: OverlayId::new(self.textdraw_id),
            text: self.text,
        })
    }
}

pub fn router(state: IngressState) -> Router {
    Router::new()
        .route("/dialog", post(primary_dialog))
        .route("/chat", post(primary_chat))
        .route("/textdraw", post(primary_textdraw))
        .route("/scanner/dialog", post(probe_dialog))
        .route("/scanner/chat", post(probe_chat))
        .route("/scanner/textdraw", post(probe_textdraw))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn primary_dialog(
    State(state): State<IngressState>,
    Json(payload): Json<DialogPayload>,
) -> &'static str {
    tracing::debug!(dialog_id = payload.dialog_id, title = %payload.title, "dialog received");
    state.primary.publish(payload.into_event());
    "OK"
}

async fn primary_chat(
    State(state): State<IngressState>,
    Json(payload): Json<ChatPayload>,
) -> &'static str {
    state.primary.publish(payload.into_event());
    "OK"
}

async fn primary_textdraw(
    State(state): State<IngressState>,
    Json(payload): Json<TextOverlayPayload>,
) -> &'static str {
    state.primary.publish(payload.into_event());
    "OK"
}

async fn probe_dialog(
    State(state): State<IngressState>,
    Json(payload): Json<DialogPayload>,
) -> &'static str {
    tracing::debug!(dialog_id = payload.dialog_id, title = %payload.title, "probe dialog received");
    state.probe.publish(payload.into_event());
    "OK"
}

async fn probe_chat(
    State(state): State<IngressState>,
    Json(payload): Json<ChatPayload>,
) -> &'static str {
    state.probe.publish(payload.into_event());
    "OK"
}

async fn probe_textdraw(
    State(state): State<IngressState>,
    Json(payload): Json<TextOverlayPayload>,
) -> &'static str {
    state.probe.publish(payload.into_event());
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonewarden_domain::EventKind;

    #[test]
    fn test_dialog_payload_conversion() {
        let payload: DialogPayload = serde_json::from_str(
            r#"{"dialog_id": 4, "title": "Group Stats", "info": "- Tag: BH", "buttons": ["Close"]}"#,
        )
        .expect("payload");
        let event = payload.into_event();
        assert_eq!(event.kind(), EventKind::Dialog);
        let dialog = event.as_dialog().expect("dialog");
        assert_eq!(dialog.dialog_id, DialogId::new(4));
        assert_eq!(dialog.buttons, vec!["Close".to_string()]);
    }

    #[test]
    fn test_chat_payload_defaults_empty_message() {
        let payload: ChatPayload = serde_json::from_str("{}").expect("payload");
        let event = payload.into_event();
        assert_eq!(event.as_chat_line().expect("chat").raw, "");
    }

    #[tokio::test]
    async fn test_published_events_reach_the_right_identity() {
        let state = IngressState {
            primary: Arc::new(Correlator::new()),
            probe: Arc::new(Correlator::new()),
        };
        let mut primary_tap = state.primary.subscribe();
        let mut probe_tap = state.probe.subscribe();

        let payload: DialogPayload =
            serde_json::from_str(r#"{"dialog_id": 9, "title": "Group Zone Info"}"#)
                .expect("payload");
        probe_dialog(State(state.clone()), Json(payload)).await;

        assert!(probe_tap.try_recv().is_ok());
        assert!(primary_tap.try_recv().is_err());
    }
}
