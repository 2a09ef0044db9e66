//! Inbound notification shapes.
//!
//! The game client bridge delivers these at arbitrary times on a channel
//! with no request identifiers; nothing here correlates a notification to
//! the action that caused it. Matching is content-based only.

use serde::{Deserialize, Serialize};

use crate::ids::{DialogId, OverlayId};

/// A modal, titled, possibly paginated text response. Raw text still
/// carries game markup; stripping happens in the parse layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogEvent {
    pub dialog_id: DialogId,
    pub title: String,
    pub info: String,
    #[serde(default)]
    pub buttons: Vec<String>,
}

/// A HUD text overlay update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextOverlayEvent {
    pub overlay_id: OverlayId,
    pub text: String,
}

/// A single chat-log line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLineEvent {
    pub raw: String,
}

/// Any inbound notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    Dialog(DialogEvent),
    TextOverlay(TextOverlayEvent),
    ChatLine(ChatLineEvent),
}

/// Event category, used to key waiter registries so flows waiting on
/// different kinds of notification never contend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Dialog,
    TextOverlay,
    ChatLine,
}

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::Dialog(_) => EventKind::Dialog,
            GameEvent::TextOverlay(_) => EventKind::TextOverlay,
            GameEvent::ChatLine(_) => EventKind::ChatLine,
        }
    }

    pub fn as_dialog(&self) -> Option<&DialogEvent> {
        match self {
            GameEvent::Dialog(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_chat_line(&self) -> Option<&ChatLineEvent> {
        match self {
            GameEvent::ChatLine(c) => Some(c),
            _ => None,
        }
    }
}
