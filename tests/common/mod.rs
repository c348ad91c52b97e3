//! Shared test doubles: a programmable backend gateway and a recording
//! chat transport.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use pumpdeck::backend::{
    Balance, BackendGateway, JobStatus, StartJob, StartOutcome, WalletInfo,
};
use pumpdeck::controller::Controller;
use pumpdeck::error::{BackendError, TransportError};
use pumpdeck::session::{ContextStore, SessionStore, UserId};
use pumpdeck::transport::{
    Action, ChatId, ChatTransport, Command, DeleteOutcome, EditOutcome, EventPayload, Keyboard,
    MessageRef, UserEvent,
};
use pumpdeck::watcher::{CompletionWatcher, NotifyLedger};

pub const USER: UserId = 123_456;

fn rejected(message: &str) -> BackendError {
    BackendError::Rejected {
        status: 500,
        message: message.to_string(),
    }
}

#[derive(Debug)]
struct GatewayState {
    balance: Decimal,
    token_supported: bool,
    pools: usize,
    max_swap_wei: String,
    usd: Decimal,
    status: JobStatus,
    start_created: bool,
    fail_set_swap: bool,
    fail_status: bool,
}

impl Default for GatewayState {
    fn default() -> Self {
        Self {
            balance: dec!(1.0),
            token_supported: true,
            pools: 3,
            max_swap_wei: "250000000000000000".to_string(),
            usd: dec!(25.0),
            status: JobStatus::NotStarted,
            start_created: true,
            fail_set_swap: false,
            fail_status: false,
        }
    }
}

/// Backend gateway double: canned responses plus a call log.
#[derive(Debug, Default)]
pub struct MockGateway {
    state: Mutex<GatewayState>,
    calls: Mutex<Vec<String>>,
}

impl MockGateway {
    pub fn set_balance(&self, balance: Decimal) {
        self.state.lock().unwrap().balance = balance;
    }

    pub fn set_token_supported(&self, supported: bool) {
        self.state.lock().unwrap().token_supported = supported;
    }

    pub fn set_max_swap_wei(&self, wei: &str) {
        self.state.lock().unwrap().max_swap_wei = wei.to_string();
    }

    pub fn set_status(&self, status: JobStatus) {
        self.state.lock().unwrap().status = status;
    }

    pub fn set_start_created(&self, created: bool) {
        self.state.lock().unwrap().start_created = created;
    }

    pub fn set_fail_set_swap(&self, fail: bool) {
        self.state.lock().unwrap().fail_set_swap = fail;
    }

    pub fn set_fail_status(&self, fail: bool) {
        self.state.lock().unwrap().fail_status = fail;
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    /// Number of recorded calls whose name starts with `prefix`.
    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendGateway for MockGateway {
    async fn get_or_create_wallet(&self, _user_id: UserId) -> Result<WalletInfo, BackendError> {
        self.record("get_or_create_wallet");
        Ok(WalletInfo {
            address: "0x718447E29B90D00461966D01E533Fa1b69574444".to_string(),
        })
    }

    async fn get_balance(&self, _user_id: UserId) -> Result<Balance, BackendError> {
        self.record("get_balance");
        let balance = self.state.lock().unwrap().balance;
        Ok(Balance {
            raw: pumpdeck::amounts::bnb_to_wei(balance).unwrap(),
            display: balance,
        })
    }

    async fn is_token_supported(&self, token_address: &str) -> Result<bool, BackendError> {
        self.record(format!("is_token_supported:{token_address}"));
        Ok(self.state.lock().unwrap().token_supported)
    }

    async fn get_pools(&self, _token_address: &str) -> Result<usize, BackendError> {
        self.record("get_pools");
        Ok(self.state.lock().unwrap().pools)
    }

    async fn estimate_max_swap(&self, pump_amount_wei: &str) -> Result<String, BackendError> {
        self.record(format!("estimate_max_swap:{pump_amount_wei}"));
        Ok(self.state.lock().unwrap().max_swap_wei.clone())
    }

    async fn to_display_currency(&self, _amount_wei: &str) -> Result<Decimal, BackendError> {
        self.record("to_display_currency");
        Ok(self.state.lock().unwrap().usd)
    }

    async fn start_job(&self, request: StartJob) -> Result<StartOutcome, BackendError> {
        self.record(format!(
            "start_job:{}:{}:{}",
            request.pump_amount_wei, request.swap_amount_wei, request.delay_millis
        ));
        Ok(StartOutcome {
            created: self.state.lock().unwrap().start_created,
        })
    }

    async fn get_status(&self, _user_id: UserId) -> Result<JobStatus, BackendError> {
        self.record("get_status");
        let state = self.state.lock().unwrap();
        if state.fail_status {
            return Err(rejected("status unavailable"));
        }
        Ok(state.status.clone())
    }

    async fn pause_job(&self, _user_id: UserId) -> Result<(), BackendError> {
        self.record("pause_job");
        Ok(())
    }

    async fn resume_job(&self, _user_id: UserId) -> Result<(), BackendError> {
        self.record("resume_job");
        Ok(())
    }

    async fn set_delay(&self, _user_id: UserId, delay_millis: u64) -> Result<(), BackendError> {
        self.record(format!("set_delay:{delay_millis}"));
        Ok(())
    }

    async fn set_swap_amount(
        &self,
        _user_id: UserId,
        swap_amount_wei: &str,
    ) -> Result<(), BackendError> {
        self.record(format!("set_swap_amount:{swap_amount_wei}"));
        if self.state.lock().unwrap().fail_set_swap {
            return Err(rejected("propagation refused"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditCall {
    pub message: MessageRef,
    pub text: String,
    pub keyboard: Option<Keyboard>,
    pub outcome: EditOutcome,
}

/// Chat transport double. Tracks per-message content so a byte-identical
/// edit reports `NotModified`, like the real platform.
#[derive(Debug, Default)]
pub struct MockTransport {
    next_message_id: AtomicI64,
    contents: Mutex<HashMap<(ChatId, i64), (String, Option<Keyboard>)>>,
    pub sent: Mutex<Vec<SentMessage>>,
    pub edits: Mutex<Vec<EditCall>>,
    pub deleted: Mutex<Vec<MessageRef>>,
    pub alerts: Mutex<Vec<String>>,
    pub acks: Mutex<Vec<Option<String>>>,
}

impl MockTransport {
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|m| m.text.clone()).collect()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn edit_count(&self) -> usize {
        self.edits.lock().unwrap().len()
    }

    pub fn last_edit(&self) -> Option<EditCall> {
        self.edits.lock().unwrap().last().cloned()
    }

    pub fn alert_count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }

    pub fn last_alert(&self) -> Option<String> {
        self.alerts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef, TransportError> {
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.contents
            .lock()
            .unwrap()
            .insert((chat_id, message_id), (text.to_string(), keyboard.cloned()));
        self.sent.lock().unwrap().push(SentMessage {
            chat_id,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(MessageRef {
            chat_id,
            message_id,
        })
    }

    async fn edit_message_text(
        &self,
        message: &MessageRef,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<EditOutcome, TransportError> {
        let key = (message.chat_id, message.message_id);
        let mut contents = self.contents.lock().unwrap();
        let outcome = match contents.get(&key) {
            None => EditOutcome::NotFound,
            Some((old_text, old_keyboard))
                if old_text == text && old_keyboard.as_ref() == keyboard =>
            {
                EditOutcome::NotModified
            }
            Some(_) => {
                contents.insert(key, (text.to_string(), keyboard.cloned()));
                EditOutcome::Edited
            }
        };
        drop(contents);
        self.edits.lock().unwrap().push(EditCall {
            message: *message,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
            outcome,
        });
        Ok(outcome)
    }

    async fn edit_message_caption(
        &self,
        message: &MessageRef,
        caption: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<EditOutcome, TransportError> {
        self.edit_message_text(message, caption, keyboard).await
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<DeleteOutcome, TransportError> {
        let existed = self
            .contents
            .lock()
            .unwrap()
            .remove(&(message.chat_id, message.message_id))
            .is_some();
        self.deleted.lock().unwrap().push(*message);
        Ok(if existed {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::NotFound
        })
    }

    async fn answer_callback(
        &self,
        _callback_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), TransportError> {
        if alert {
            self.alerts
                .lock()
                .unwrap()
                .push(text.unwrap_or_default().to_string());
        } else {
            self.acks.lock().unwrap().push(text.map(str::to_string));
        }
        Ok(())
    }
}

/// Fully wired orchestration layer over the two doubles.
pub struct Harness {
    pub gateway: Arc<MockGateway>,
    pub transport: Arc<MockTransport>,
    pub store: Arc<SessionStore>,
    pub contexts: Arc<ContextStore>,
    pub ledger: Arc<NotifyLedger>,
    pub controller: Controller,
    pub watcher: CompletionWatcher,
}

pub fn harness() -> Harness {
    let gateway = Arc::new(MockGateway::default());
    let transport = Arc::new(MockTransport::default());
    let store = Arc::new(SessionStore::new());
    let contexts = Arc::new(ContextStore::new());
    let ledger = Arc::new(NotifyLedger::new());

    let controller = Controller::new(
        gateway.clone(),
        transport.clone(),
        store.clone(),
        contexts.clone(),
        ledger.clone(),
        dec!(0.097),
    );
    let watcher = CompletionWatcher::new(
        gateway.clone(),
        transport.clone(),
        store.clone(),
        contexts.clone(),
        ledger.clone(),
    );

    Harness {
        gateway,
        transport,
        store,
        contexts,
        ledger,
        controller,
        watcher,
    }
}

pub fn command(command: Command) -> UserEvent {
    UserEvent {
        user_id: USER,
        chat_id: USER,
        payload: EventPayload::Command(command),
    }
}

pub fn text(text: &str) -> UserEvent {
    UserEvent {
        user_id: USER,
        chat_id: USER,
        payload: EventPayload::Text(text.to_string()),
    }
}

pub fn action(kind: Action) -> UserEvent {
    UserEvent {
        user_id: USER,
        chat_id: USER,
        payload: EventPayload::Action {
            kind,
            callback_id: "cb".to_string(),
            message_id: 1,
        },
    }
}
