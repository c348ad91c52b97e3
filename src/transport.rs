//! Message-transport boundary.
//!
//! The conversation core talks to the chat platform through the
//! [`ChatTransport`] trait and receives [`UserEvent`]s from it. Button
//! presses arrive as a closed [`Action`] enum rather than raw callback
//! strings, so routing is checked at compile time.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::session::UserId;

/// Chat identifier. Equal to the user id in private chats.
pub type ChatId = i64;

/// Reference to a previously sent message, used for edit-in-place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: i64,
}

/// Slash commands the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
    Help,
    Balance,
}

impl Command {
    pub fn parse(text: &str) -> Option<Self> {
        // "/start@SomeBot arg" and "/start" both resolve to Start.
        let word = text.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word);
        match name {
            "/start" => Some(Self::Start),
            "/cancel" => Some(Self::Cancel),
            "/help" => Some(Self::Help),
            "/balance" => Some(Self::Balance),
            _ => None,
        }
    }
}

/// Closed set of button actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SetPumpAmount,
    SetSwapAmount,
    SetDelay,
    Start,
    Pause,
    Resume,
    RefreshBalance,
    RefreshStatus,
}

impl Action {
    /// Wire identifier carried in the button callback payload.
    pub fn callback_data(self) -> &'static str {
        match self {
            Self::SetPumpAmount => "set_pump_amount",
            Self::SetSwapAmount => "set_swap_amount",
            Self::SetDelay => "set_delay",
            Self::Start => "start_pump",
            Self::Pause => "pause_pump",
            Self::Resume => "resume_pump",
            Self::RefreshBalance => "refresh_balance",
            Self::RefreshStatus => "refresh_session_status",
        }
    }

    pub fn from_callback_data(data: &str) -> Option<Self> {
        match data {
            "set_pump_amount" => Some(Self::SetPumpAmount),
            "set_swap_amount" => Some(Self::SetSwapAmount),
            "set_delay" => Some(Self::SetDelay),
            "start_pump" => Some(Self::Start),
            "pause_pump" => Some(Self::Pause),
            "resume_pump" => Some(Self::Resume),
            "refresh_balance" => Some(Self::RefreshBalance),
            "refresh_session_status" => Some(Self::RefreshStatus),
            _ => None,
        }
    }
}

/// One inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: Action,
}

impl Button {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// Inline keyboard layout: rows of buttons.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }
}

/// What the user sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    Command(Command),
    Text(String),
    Action {
        kind: Action,
        /// Callback identifier used to acknowledge or alert.
        callback_id: String,
        /// Message the pressed keyboard was attached to.
        message_id: i64,
    },
}

/// A single incoming update, already mapped to the closed event model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEvent {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub payload: EventPayload,
}

/// Outcome of an edit call. `NotModified` and `NotFound` are conditions,
/// not errors: byte-identical content is a no-op success, and a vanished
/// message just means the caller should send a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Edited,
    NotModified,
    NotFound,
}

/// Outcome of a delete call; deleting an already-gone message is success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Outbound half of the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef, TransportError>;

    async fn edit_message_text(
        &self,
        message: &MessageRef,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<EditOutcome, TransportError>;

    /// Edit the caption of a media message (the deposit prompt may carry a
    /// welcome photo).
    async fn edit_message_caption(
        &self,
        message: &MessageRef,
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<EditOutcome, TransportError>;

    async fn delete_message(&self, message: &MessageRef) -> Result<DeleteOutcome, TransportError>;

    /// Answer a button press. With `alert` set the text pops up as a
    /// blocking dialog instead of a toast.
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), TransportError>;
}
