//! Conversational front-end
//!
//! Transport-neutral: the engine speaks in [`Reply`] values and background
//! messages go through a [`Notifier`]. The HTTP adapter in `api` is one
//! transport.

pub mod conversation;
pub mod progress;
pub mod reply;
pub mod session_store;

pub use conversation::{ChartUnavailable, Command, Conversation, SESSION_EXPIRED};
pub use progress::{format_progress, phase_label};
pub use reply::{LogNotifier, MenuOption, Notifier, Outbox, Reply};
pub use session_store::{SessionStore, SESSION_IDLE_TIMEOUT_SECS, SWEEP_INTERVAL_SECS};
