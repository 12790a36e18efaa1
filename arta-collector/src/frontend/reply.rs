//! Transport-neutral replies and delivery of background messages

use crate::report::{ChartChoice, RenderedChart};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::sync::Mutex;

/// One selectable menu entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuOption {
    /// Value to send back to select this entry
    pub id: String,
    pub label: String,
}

fn as_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(bytes))
}

/// Something the front-end wants shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    Text {
        text: String,
    },
    Menu {
        prompt: String,
        options: Vec<MenuOption>,
    },
    /// Rendered chart, inline
    Image {
        caption: String,
        content_type: String,
        #[serde(rename = "data_base64", serialize_with = "as_base64")]
        data: Vec<u8>,
    },
    /// Remote image (artist pictures)
    ImageUrl {
        url: String,
        caption: String,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text { text: text.into() }
    }

    /// The chart selection menu
    pub fn chart_menu(prompt: impl Into<String>) -> Self {
        Reply::Menu {
            prompt: prompt.into(),
            options: ChartChoice::menu()
                .into_iter()
                .map(|(id, label)| MenuOption {
                    id: id.to_string(),
                    label: label.to_string(),
                })
                .collect(),
        }
    }

    /// Text content, if this is a text reply
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Text { text } => Some(text),
            _ => None,
        }
    }
}

impl From<RenderedChart> for Reply {
    fn from(chart: RenderedChart) -> Self {
        Reply::Image {
            caption: chart.caption,
            content_type: chart.content_type.to_string(),
            data: chart.bytes,
        }
    }
}

/// Receives messages produced outside a request/response exchange
pub trait Notifier: Send + Sync {
    /// Deliver a message to the user
    fn notify(&self, user_id: &str, reply: Reply);

    /// Replace the user's in-place progress message
    fn progress(&self, _user_id: &str, _text: &str) {}

    /// Drop anything still held for a user whose session is gone
    fn forget(&self, _user_id: &str) {}
}

/// Notifier that logs and discards
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, user_id: &str, reply: Reply) {
        tracing::debug!(user_id = %user_id, reply = ?reply.as_text(), "Dropping background reply");
    }
}

/// Per-user mailbox of background replies, drained by the transport
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Mutex<HashMap<String, Vec<Reply>>>,
    progress: Mutex<HashMap<String, String>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every pending reply for `user_id`, oldest first
    pub fn drain(&self, user_id: &str) -> Vec<Reply> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(user_id)
            .unwrap_or_default()
    }

    /// Latest progress text for `user_id`
    pub fn latest_progress(&self, user_id: &str) -> Option<String> {
        self.progress
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
            .cloned()
    }

    /// Forget everything held for `user_id`
    pub fn clear(&self, user_id: &str) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(user_id);
        self.progress
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(user_id);
    }
}

impl Notifier for Outbox {
    fn notify(&self, user_id: &str, reply: Reply) {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(user_id.to_string())
            .or_default()
            .push(reply);
    }

    fn progress(&self, user_id: &str, text: &str) {
        self.progress
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user_id.to_string(), text.to_string());
    }

    fn forget(&self, user_id: &str) {
        self.clear(user_id);
    }
}
