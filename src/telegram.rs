//! Telegram Bot API adapter.
//!
//! Thin long-poll client implementing [`ChatTransport`] over the Bot API.
//! The Bot API reports "message is not modified" and "message to delete
//! not found" as errors; this adapter folds them into the non-error
//! outcomes the core expects.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::controller::Controller;
use crate::error::TransportError;
use crate::transport::{
    Action, ChatId, ChatTransport, Command, DeleteOutcome, EditOutcome, EventPayload, Keyboard,
    MessageRef, UserEvent,
};

/// Long-poll duration for `getUpdates`.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Backoff after a failed `getUpdates` round.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    message: Option<IncomingMessage>,
    #[serde(default)]
    callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    message_id: i64,
    #[serde(default)]
    from: Option<User>,
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    id: String,
    from: User,
    #[serde(default)]
    message: Option<IncomingMessage>,
    #[serde(default)]
    data: Option<String>,
}

fn keyboard_markup(keyboard: &Keyboard) -> Value {
    let rows: Vec<Vec<Value>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| {
                    json!({
                        "text": button.label,
                        "callback_data": button.action.callback_data(),
                    })
                })
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

fn is_not_modified(description: &str) -> bool {
    description.to_lowercase().contains("not modified")
}

fn is_not_found(description: &str) -> bool {
    let lowered = description.to_lowercase();
    lowered.contains("not found") || lowered.contains("can't be edited")
}

/// Bot API client.
pub struct TelegramApi {
    client: Client,
    base: String,
}

impl TelegramApi {
    pub fn new(client: Client, token: &SecretString) -> Self {
        Self {
            client,
            base: format!("https://api.telegram.org/bot{}", token.expose_secret()),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: Value,
        timeout: Option<Duration>,
    ) -> Result<T, TransportError> {
        let mut request = self
            .client
            .post(format!("{}/{}", self.base, method))
            .json(&payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        // The Bot API answers errors with 4xx plus a JSON body; the `ok`
        // flag is authoritative, not the HTTP status.
        let body: ApiResponse<T> = request.send().await?.json().await?;
        if body.ok {
            body.result
                .ok_or_else(|| TransportError::InvalidResponse(format!("{method}: missing result")))
        } else {
            Err(TransportError::Api {
                code: body.error_code.unwrap_or(0),
                description: body.description.unwrap_or_default(),
            })
        }
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TransportError> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": POLL_TIMEOUT_SECS,
                "allowed_updates": ["message", "callback_query"],
            }),
            Some(Duration::from_secs(POLL_TIMEOUT_SECS + 10)),
        )
        .await
    }
}

#[async_trait]
impl ChatTransport for TelegramApi {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef, TransportError> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });
        if let Some(keyboard) = keyboard {
            payload["reply_markup"] = keyboard_markup(keyboard);
        }
        let message: IncomingMessage = self.call("sendMessage", payload, None).await?;
        Ok(MessageRef {
            chat_id: message.chat.id,
            message_id: message.message_id,
        })
    }

    async fn edit_message_text(
        &self,
        message: &MessageRef,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<EditOutcome, TransportError> {
        let mut payload = json!({
            "chat_id": message.chat_id,
            "message_id": message.message_id,
            "text": text,
            "parse_mode": "Markdown",
            "disable_web_page_preview": true,
        });
        if let Some(keyboard) = keyboard {
            payload["reply_markup"] = keyboard_markup(keyboard);
        }
        match self.call::<Value>("editMessageText", payload, None).await {
            Ok(_) => Ok(EditOutcome::Edited),
            Err(TransportError::Api { description, .. }) if is_not_modified(&description) => {
                Ok(EditOutcome::NotModified)
            }
            Err(TransportError::Api { description, .. }) if is_not_found(&description) => {
                Ok(EditOutcome::NotFound)
            }
            Err(err) => Err(err),
        }
    }

    async fn edit_message_caption(
        &self,
        message: &MessageRef,
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<EditOutcome, TransportError> {
        let mut payload = json!({
            "chat_id": message.chat_id,
            "message_id": message.message_id,
            "caption": caption,
            "parse_mode": "Markdown",
        });
        if let Some(keyboard) = keyboard {
            payload["reply_markup"] = keyboard_markup(keyboard);
        }
        match self.call::<Value>("editMessageCaption", payload, None).await {
            Ok(_) => Ok(EditOutcome::Edited),
            Err(TransportError::Api { description, .. }) if is_not_modified(&description) => {
                Ok(EditOutcome::NotModified)
            }
            Err(TransportError::Api { description, .. }) if is_not_found(&description) => {
                Ok(EditOutcome::NotFound)
            }
            Err(err) => Err(err),
        }
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<DeleteOutcome, TransportError> {
        let payload = json!({
            "chat_id": message.chat_id,
            "message_id": message.message_id,
        });
        match self.call::<Value>("deleteMessage", payload, None).await {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(TransportError::Api { description, .. }) if is_not_found(&description) => {
                Ok(DeleteOutcome::NotFound)
            }
            Err(err) => Err(err),
        }
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), TransportError> {
        let mut payload = json!({
            "callback_query_id": callback_id,
            "show_alert": alert,
        });
        if let Some(text) = text {
            payload["text"] = json!(text);
        }
        self.call::<Value>("answerCallbackQuery", payload, None)
            .await
            .map(|_| ())
    }
}

/// Map one raw update onto the closed event model. Unknown commands and
/// unrecognized callback payloads are dropped.
pub fn map_update(update: Update) -> Option<UserEvent> {
    if let Some(message) = update.message {
        let from = message.from?;
        let text = message.text?;
        let payload = if text.starts_with('/') {
            EventPayload::Command(Command::parse(&text)?)
        } else {
            EventPayload::Text(text)
        };
        return Some(UserEvent {
            user_id: from.id,
            chat_id: message.chat.id,
            payload,
        });
    }

    let callback = update.callback_query?;
    let kind = Action::from_callback_data(callback.data.as_deref()?)?;
    let (chat_id, message_id) = match &callback.message {
        Some(message) => (message.chat.id, message.message_id),
        None => (callback.from.id, 0),
    };
    Some(UserEvent {
        user_id: callback.from.id,
        chat_id,
        payload: EventPayload::Action {
            kind,
            callback_id: callback.id,
            message_id,
        },
    })
}

/// Long-poll loop: fetch updates and dispatch each to the controller on
/// its own task. Per-user ordering is preserved by the controller's
/// conversation context lock, so a slow backend call for one user never
/// stalls the others.
pub async fn run_polling(api: Arc<TelegramApi>, controller: Arc<Controller>) {
    let mut offset: i64 = 0;
    info!("starting Telegram long-poll loop");
    loop {
        let updates = match api.get_updates(offset).await {
            Ok(updates) => updates,
            Err(err) => {
                warn!(%err, "getUpdates failed");
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
        };
        for update in updates {
            offset = offset.max(update.update_id + 1);
            if let Some(event) = map_update(update) {
                let controller = Arc::clone(&controller);
                tokio::spawn(async move {
                    controller.handle_event(event).await;
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn update_from(value: Value) -> Update {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn maps_text_message() {
        let event = map_update(update_from(json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "from": {"id": 42},
                "chat": {"id": 42},
                "text": "0xdeadbeef"
            }
        })))
        .unwrap();
        assert_eq!(event.user_id, 42);
        assert_eq!(event.payload, EventPayload::Text("0xdeadbeef".to_string()));
    }

    #[test]
    fn maps_commands_and_drops_unknown_ones() {
        let event = map_update(update_from(json!({
            "update_id": 2,
            "message": {
                "message_id": 11,
                "from": {"id": 42},
                "chat": {"id": 42},
                "text": "/start"
            }
        })))
        .unwrap();
        assert_eq!(event.payload, EventPayload::Command(Command::Start));

        assert!(
            map_update(update_from(json!({
                "update_id": 3,
                "message": {
                    "message_id": 12,
                    "from": {"id": 42},
                    "chat": {"id": 42},
                    "text": "/unknown"
                }
            })))
            .is_none()
        );
    }

    #[test]
    fn maps_callback_to_action() {
        let event = map_update(update_from(json!({
            "update_id": 4,
            "callback_query": {
                "id": "cb-1",
                "from": {"id": 42},
                "message": {"message_id": 13, "chat": {"id": 42}},
                "data": "start_pump"
            }
        })))
        .unwrap();
        assert_eq!(
            event.payload,
            EventPayload::Action {
                kind: Action::Start,
                callback_id: "cb-1".to_string(),
                message_id: 13,
            }
        );
    }

    #[test]
    fn not_modified_and_not_found_are_detected() {
        assert!(is_not_modified("Bad Request: message is not modified"));
        assert!(is_not_found("Bad Request: message to delete not found"));
        assert!(!is_not_found("Bad Request: message is not modified"));
    }
}
