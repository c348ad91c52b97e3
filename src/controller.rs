//! Session lifecycle controller.
//!
//! Routes every incoming [`UserEvent`] through the conversation state
//! machine: validates the action against local and remote state, mutates
//! the session store, issues gateway calls, and reconciles the config
//! view. Gateway failures never escape as panics or crashes; they are
//! converted to user-visible text and local state is left unchanged.
//!
//! Locking: the per-user conversation context is held for the whole
//! handler (serializing conversation handling per user); per-user session
//! locks are taken briefly around each read-modify-write so the completion
//! watcher and the controller never interleave inside one.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{error, info, warn};

use crate::amounts;
use crate::backend::{BackendGateway, JobStatus, StartJob, StartOutcome};
use crate::error::TransportError;
use crate::session::{ContextStore, ConversationContext, SessionHandle, SessionStore, Step};
use crate::transport::{
    Action, ChatId, ChatTransport, Command, EditOutcome, EventPayload, Keyboard, MessageRef,
    UserEvent,
};
use crate::view::{self, ConfigView, RenderModel};
use crate::watcher::NotifyLedger;

const MSG_SESSION_EXPIRED: &str = "❌ Session expired. Start over with /start";
const MSG_INVALID_AMOUNT: &str = "❌ Invalid format. Enter a number (e.g. 0.1):";
const MSG_NON_POSITIVE_AMOUNT: &str = "❌ Amount must be greater than 0. Try again:";
const MSG_INVALID_DELAY: &str = "❌ Invalid format. Enter a number in seconds (e.g. 1 or 0.5):";
const MSG_NON_POSITIVE_DELAY: &str = "❌ Delay must be greater than 0. Try again:";
const MSG_WALLET_FAILED: &str =
    "❌ An error occurred while creating the wallet. Please try again later.";
const MSG_TOKEN_UNSUPPORTED: &str = "❌ This token is not supported.\n\
    Possible reasons:\n\
    • No liquidity pools on PancakeSwap\n\
    • Token is incompatible with the bot\n\n\
    Send another contract address or /cancel to abort.";
const MSG_PUMP_LOCKED: &str = "⛔ Pump amount can't be changed while the session is running.";
const MSG_PUMP_FIRST: &str = "⚠️ Set the pump amount first.";
const MSG_NOT_CONFIGURED: &str = "⚠️ Configure pump and swap amounts before starting.";
const MSG_ALREADY_RUNNING: &str = "⚠️ You already have an active session.";
const MSG_CANCELLED: &str = "❌ Operation cancelled.\nUse /start to start over.";

const PUMP_PROMPT: &str = "💰 **Set Pump Amount**\n\n\
    Enter the total amount in BNB for pumping.\n\
    Example: 0.1\n\n\
    This amount will be split across subwallets for volume distribution.";
const DELAY_PROMPT: &str = "⏱️ **Set Transaction Delay**\n\n\
    Enter the delay between transactions in seconds.\n\
    Example: 1 (= 1 second)\n\n\
    Recommended: 0.5-2 seconds for optimal performance.";
const HELP_TEXT: &str = "🤖 *BSC Pump Bot*\n\n\
    *Available commands:*\n\
    /start - Start bot and create session\n\
    /balance - Check wallet balance\n\
    /cancel - Cancel current operation\n\
    /help - Show this message\n\n\
    *How to use:*\n\
    1. Send /start\n\
    2. Paste token contract address\n\
    3. Enter pump amount\n\
    4. Enter swap amount\n\
    5. Press START 🚀";

/// Orchestrates the conversation state machine for all users.
pub struct Controller {
    gateway: Arc<dyn BackendGateway>,
    transport: Arc<dyn ChatTransport>,
    store: Arc<SessionStore>,
    contexts: Arc<ContextStore>,
    ledger: Arc<NotifyLedger>,
    view: ConfigView,
    min_deposit: Decimal,
}

impl Controller {
    pub fn new(
        gateway: Arc<dyn BackendGateway>,
        transport: Arc<dyn ChatTransport>,
        store: Arc<SessionStore>,
        contexts: Arc<ContextStore>,
        ledger: Arc<NotifyLedger>,
        min_deposit: Decimal,
    ) -> Self {
        let view = ConfigView::new(Arc::clone(&transport));
        Self {
            gateway,
            transport,
            store,
            contexts,
            ledger,
            view,
            min_deposit,
        }
    }

    /// Entry point for one incoming update. Never panics and never
    /// propagates an error to the dispatch loop.
    pub async fn handle_event(&self, event: UserEvent) {
        let ctx_handle = self.contexts.get_or_create(event.user_id);
        let mut ctx = ctx_handle.lock().await;

        let result = match &event.payload {
            EventPayload::Command(command) => {
                self.handle_command(&mut ctx, &event, *command).await
            }
            EventPayload::Text(text) => self.handle_text(&mut ctx, &event, text).await,
            EventPayload::Action {
                kind,
                callback_id,
                message_id,
            } => {
                let message = MessageRef {
                    chat_id: event.chat_id,
                    message_id: *message_id,
                };
                self.handle_action(&mut ctx, &event, *kind, callback_id, message)
                    .await
            }
        };

        if let Err(err) = result {
            error!(user_id = event.user_id, %err, "failed to deliver response");
        }
    }

    // ---- commands ----------------------------------------------------

    async fn handle_command(
        &self,
        ctx: &mut ConversationContext,
        event: &UserEvent,
        command: Command,
    ) -> Result<(), TransportError> {
        match command {
            Command::Start => self.handle_start(ctx, event).await,
            Command::Cancel => self.handle_cancel(ctx, event).await,
            Command::Help => {
                self.transport
                    .send_message(event.chat_id, HELP_TEXT, None)
                    .await?;
                Ok(())
            }
            Command::Balance => self.handle_balance(event).await,
        }
    }

    async fn handle_start(
        &self,
        ctx: &mut ConversationContext,
        event: &UserEvent,
    ) -> Result<(), TransportError> {
        let wallet = match self.gateway.get_or_create_wallet(event.user_id).await {
            Ok(wallet) => wallet,
            Err(err) => {
                warn!(user_id = event.user_id, %err, "wallet creation failed");
                self.transport
                    .send_message(event.chat_id, MSG_WALLET_FAILED, None)
                    .await?;
                return Ok(());
            }
        };
        let balance = match self.gateway.get_balance(event.user_id).await {
            Ok(balance) => balance,
            Err(err) => {
                warn!(user_id = event.user_id, %err, "balance check failed");
                self.transport
                    .send_message(event.chat_id, MSG_WALLET_FAILED, None)
                    .await?;
                return Ok(());
            }
        };

        if balance.display >= self.min_deposit {
            let text = view::ready_text(&wallet.address, &balance.display);
            self.transport
                .send_message(event.chat_id, &text, None)
                .await?;
        } else {
            let text = view::deposit_text(&wallet.address, &balance.display, &self.min_deposit);
            let keyboard = view::refresh_balance_keyboard();
            self.transport
                .send_message(event.chat_id, &text, Some(&keyboard))
                .await?;
        }

        self.store.create(event.user_id);
        *ctx = ConversationContext::default();
        info!(user_id = event.user_id, "session created");
        Ok(())
    }

    async fn handle_cancel(
        &self,
        ctx: &mut ConversationContext,
        event: &UserEvent,
    ) -> Result<(), TransportError> {
        if let Some(message) = ctx.config_message.take() {
            if let Err(err) = self.transport.delete_message(&message).await {
                warn!(user_id = event.user_id, %err, "failed to delete config message");
            }
        }
        self.store.delete(event.user_id);
        *ctx = ConversationContext::default();
        self.transport
            .send_message(event.chat_id, MSG_CANCELLED, None)
            .await?;
        info!(user_id = event.user_id, "session cancelled");
        Ok(())
    }

    async fn handle_balance(&self, event: &UserEvent) -> Result<(), TransportError> {
        let balance = match self.gateway.get_balance(event.user_id).await {
            Ok(balance) => balance,
            Err(err) => {
                self.transport
                    .send_message(event.chat_id, &format!("❌ Error checking balance: {err}"), None)
                    .await?;
                return Ok(());
            }
        };
        let usd = self
            .gateway
            .to_display_currency(&balance.raw)
            .await
            .map(|v| format!("{:.2}", v))
            .unwrap_or_else(|_| "N/A".to_string());
        let text = format!(
            "💰 Your balance:\n\nBNB: {}\nUSD: ≈${}",
            amounts::format_balance(&balance.display),
            usd
        );
        self.transport
            .send_message(event.chat_id, &text, None)
            .await?;
        Ok(())
    }

    // ---- text input --------------------------------------------------

    async fn handle_text(
        &self,
        ctx: &mut ConversationContext,
        event: &UserEvent,
        text: &str,
    ) -> Result<(), TransportError> {
        match ctx.step {
            Step::AwaitingToken => self.handle_token_input(ctx, event, text).await,
            Step::AwaitingPumpAmount => self.handle_pump_input(ctx, event, text).await,
            Step::AwaitingSwapAmount => self.handle_swap_input(ctx, event, text).await,
            Step::AwaitingDelay => self.handle_delay_input(ctx, event, text).await,
        }
    }

    async fn handle_token_input(
        &self,
        ctx: &mut ConversationContext,
        event: &UserEvent,
        text: &str,
    ) -> Result<(), TransportError> {
        let token = text.trim();
        self.transport
            .send_message(event.chat_id, "🔍 Checking token...", None)
            .await?;

        match self.gateway.is_token_supported(token).await {
            Ok(true) => {}
            Ok(false) => {
                self.transport
                    .send_message(event.chat_id, MSG_TOKEN_UNSUPPORTED, None)
                    .await?;
                return Ok(());
            }
            Err(err) => {
                let text = format!(
                    "❌ Error checking token: {err}\nCheck the contract address and try again."
                );
                self.transport
                    .send_message(event.chat_id, &text, None)
                    .await?;
                return Ok(());
            }
        }

        let Some(session) = self.store.get(event.user_id) else {
            self.transport
                .send_message(event.chat_id, MSG_SESSION_EXPIRED, None)
                .await?;
            return Ok(());
        };
        session.lock().await.token_address = token.to_string();

        let pools = self.gateway.get_pools(token).await.ok();
        self.reconcile_config(ctx, event, &session, None, pools)
            .await
    }

    async fn handle_pump_input(
        &self,
        ctx: &mut ConversationContext,
        event: &UserEvent,
        text: &str,
    ) -> Result<(), TransportError> {
        let Some(amount) = self
            .parse_positive_amount(event, text, MSG_INVALID_AMOUNT, MSG_NON_POSITIVE_AMOUNT)
            .await?
        else {
            return Ok(());
        };

        // Checked live against the backend, never against a cached figure.
        let balance = match self.gateway.get_balance(event.user_id).await {
            Ok(balance) => balance,
            Err(err) => {
                self.transport
                    .send_message(event.chat_id, &format!("❌ Error: {err}\nTry again:"), None)
                    .await?;
                return Ok(());
            }
        };
        if amount > balance.display {
            let text = format!(
                "❌ Amount exceeds your wallet balance ({} BNB). Try again:",
                amounts::format_bnb(&balance.display)
            );
            self.transport
                .send_message(event.chat_id, &text, None)
                .await?;
            return Ok(());
        }

        let wei = match amounts::bnb_to_wei(amount) {
            Ok(wei) => wei,
            Err(_) => {
                self.transport
                    .send_message(event.chat_id, MSG_INVALID_AMOUNT, None)
                    .await?;
                return Ok(());
            }
        };

        let Some(session) = self.store.get(event.user_id) else {
            self.transport
                .send_message(event.chat_id, MSG_SESSION_EXPIRED, None)
                .await?;
            ctx.step = Step::AwaitingToken;
            return Ok(());
        };
        session.lock().await.pump_amount_wei = wei.clone();
        // The maximum swap bound depends on the pump amount.
        ctx.max_swap_wei = None;

        let note = match self.gateway.to_display_currency(&wei).await {
            Ok(usd) => format!("Pump amount set to {} BNB (≈${:.2})", amount.normalize(), usd),
            Err(_) => format!("Pump amount set to {} BNB", amount.normalize()),
        };
        ctx.step = Step::AwaitingToken;
        self.reconcile_config(ctx, event, &session, Some(note), None)
            .await
    }

    async fn handle_swap_input(
        &self,
        ctx: &mut ConversationContext,
        event: &UserEvent,
        text: &str,
    ) -> Result<(), TransportError> {
        let Some(amount) = self
            .parse_positive_amount(event, text, MSG_INVALID_AMOUNT, MSG_NON_POSITIVE_AMOUNT)
            .await?
        else {
            return Ok(());
        };

        let Some(session) = self.store.get(event.user_id) else {
            self.transport
                .send_message(event.chat_id, MSG_SESSION_EXPIRED, None)
                .await?;
            ctx.step = Step::AwaitingToken;
            return Ok(());
        };

        let max_wei = match self.max_swap_bound(ctx, event, &session).await? {
            Some(max_wei) => max_wei,
            None => return Ok(()),
        };

        let wei = match amounts::bnb_to_wei(amount) {
            Ok(wei) => wei,
            Err(_) => {
                self.transport
                    .send_message(event.chat_id, MSG_INVALID_AMOUNT, None)
                    .await?;
                return Ok(());
            }
        };
        let exceeds = match (amounts::wei_value(&wei), amounts::wei_value(&max_wei)) {
            (Ok(value), Ok(max)) => value > max,
            _ => false,
        };
        if exceeds {
            let shown = amounts::wei_to_bnb(&max_wei)
                .map(|v| amounts::format_bnb(&v))
                .unwrap_or_else(|_| max_wei.clone());
            let text = format!("❌ Swap amount cannot exceed {shown} BNB. Try again:");
            self.transport
                .send_message(event.chat_id, &text, None)
                .await?;
            return Ok(());
        }

        let backend_started = {
            let mut locked = session.lock().await;
            locked.swap_amount_wei = wei.clone();
            locked.backend_started
        };
        // Pausing does not block configuration edits; a live job gets the
        // new amount either way. Propagation failure keeps local state.
        if backend_started {
            if let Err(err) = self.gateway.set_swap_amount(event.user_id, &wei).await {
                warn!(user_id = event.user_id, %err, "swap amount propagation failed");
                let text =
                    format!("⚠️ Saved locally, but failed to update the running session: {err}");
                self.transport
                    .send_message(event.chat_id, &text, None)
                    .await?;
            }
        }

        let note = match self.gateway.to_display_currency(&wei).await {
            Ok(usd) => format!("Swap amount set to {} BNB (≈${:.2})", amount.normalize(), usd),
            Err(_) => format!("Swap amount set to {} BNB", amount.normalize()),
        };
        ctx.step = Step::AwaitingToken;
        self.reconcile_config(ctx, event, &session, Some(note), None)
            .await
    }

    async fn handle_delay_input(
        &self,
        ctx: &mut ConversationContext,
        event: &UserEvent,
        text: &str,
    ) -> Result<(), TransportError> {
        let Some(seconds) = self
            .parse_positive_amount(event, text, MSG_INVALID_DELAY, MSG_NON_POSITIVE_DELAY)
            .await?
        else {
            return Ok(());
        };

        let millis = (seconds * Decimal::from(1000u32)).trunc();
        let millis = match millis.to_u64() {
            Some(value) if value > 0 => value,
            _ => {
                self.transport
                    .send_message(event.chat_id, MSG_NON_POSITIVE_DELAY, None)
                    .await?;
                return Ok(());
            }
        };

        let Some(session) = self.store.get(event.user_id) else {
            self.transport
                .send_message(event.chat_id, MSG_SESSION_EXPIRED, None)
                .await?;
            ctx.step = Step::AwaitingToken;
            return Ok(());
        };
        let backend_started = {
            let mut locked = session.lock().await;
            locked.delay_millis = millis;
            locked.backend_started
        };
        if backend_started {
            if let Err(err) = self.gateway.set_delay(event.user_id, millis).await {
                warn!(user_id = event.user_id, %err, "delay propagation failed");
                let text =
                    format!("⚠️ Saved locally, but failed to update the running session: {err}");
                self.transport
                    .send_message(event.chat_id, &text, None)
                    .await?;
            }
        }

        let note = format!("Delay set to {}s", amounts::format_delay_secs(millis));
        ctx.step = Step::AwaitingToken;
        self.reconcile_config(ctx, event, &session, Some(note), None)
            .await
    }

    // ---- button actions ----------------------------------------------

    async fn handle_action(
        &self,
        ctx: &mut ConversationContext,
        event: &UserEvent,
        action: Action,
        callback_id: &str,
        message: MessageRef,
    ) -> Result<(), TransportError> {
        match action {
            Action::SetPumpAmount => {
                self.handle_set_pump(ctx, event, callback_id, message).await
            }
            Action::SetSwapAmount => {
                self.handle_set_swap(ctx, event, callback_id, message).await
            }
            Action::SetDelay => {
                self.ack(callback_id, None).await?;
                ctx.config_message = Some(message);
                self.show_prompt(ctx, event.chat_id, DELAY_PROMPT).await?;
                ctx.step = Step::AwaitingDelay;
                Ok(())
            }
            Action::Start => self.handle_start_job(ctx, event, callback_id).await,
            Action::Pause => self.handle_pause(ctx, event, callback_id).await,
            Action::Resume => self.handle_resume(ctx, event, callback_id).await,
            Action::RefreshBalance => {
                self.handle_refresh_balance(event, callback_id, message).await
            }
            Action::RefreshStatus => {
                self.handle_refresh_status(event, callback_id, message).await
            }
        }
    }

    async fn handle_set_pump(
        &self,
        ctx: &mut ConversationContext,
        event: &UserEvent,
        callback_id: &str,
        message: MessageRef,
    ) -> Result<(), TransportError> {
        let Some(session) = self.store.get(event.user_id) else {
            return self.alert(callback_id, MSG_SESSION_EXPIRED).await;
        };
        let backend_started = session.lock().await.backend_started;
        // Pump amount is immutable once the job is live.
        if backend_started {
            match self.gateway.get_status(event.user_id).await {
                Ok(JobStatus::InProcess) => {
                    return self.alert(callback_id, MSG_PUMP_LOCKED).await;
                }
                Ok(_) => {}
                Err(err) => {
                    return self.alert(callback_id, &format!("❌ {err}")).await;
                }
            }
        }

        self.ack(callback_id, None).await?;
        ctx.config_message = Some(message);
        self.show_prompt(ctx, event.chat_id, PUMP_PROMPT).await?;
        ctx.step = Step::AwaitingPumpAmount;
        Ok(())
    }

    async fn handle_set_swap(
        &self,
        ctx: &mut ConversationContext,
        event: &UserEvent,
        callback_id: &str,
        message: MessageRef,
    ) -> Result<(), TransportError> {
        let Some(session) = self.store.get(event.user_id) else {
            return self.alert(callback_id, MSG_SESSION_EXPIRED).await;
        };
        if !session.lock().await.pump_configured() {
            return self.alert(callback_id, MSG_PUMP_FIRST).await;
        }
        let max_wei = match ctx.max_swap_wei.clone() {
            Some(max_wei) => max_wei,
            None => {
                let pump_wei = session.lock().await.pump_amount_wei.clone();
                match self.gateway.estimate_max_swap(&pump_wei).await {
                    Ok(max_wei) => {
                        ctx.max_swap_wei = Some(max_wei.clone());
                        max_wei
                    }
                    Err(err) => {
                        return self.alert(callback_id, &format!("❌ {err}")).await;
                    }
                }
            }
        };

        self.ack(callback_id, None).await?;
        ctx.config_message = Some(message);
        let shown = amounts::wei_to_bnb(&max_wei)
            .map(|v| amounts::format_bnb(&v))
            .unwrap_or_else(|_| max_wei.clone());
        let prompt = format!(
            "💱 **Set Swap Amount**\n\n\
             Enter the amount in BNB for each swap operation.\n\
             Example: 0.01\n\n\
             Maximum: {shown} BNB\n\
             This is the amount used per individual swap transaction."
        );
        self.show_prompt(ctx, event.chat_id, &prompt).await?;
        ctx.step = Step::AwaitingSwapAmount;
        Ok(())
    }

    async fn handle_start_job(
        &self,
        ctx: &mut ConversationContext,
        event: &UserEvent,
        callback_id: &str,
    ) -> Result<(), TransportError> {
        let Some(session) = self.store.get(event.user_id) else {
            return self.alert(callback_id, MSG_SESSION_EXPIRED).await;
        };
        let snapshot = session.lock().await.clone();
        if !snapshot.pump_configured() || !snapshot.swap_configured() {
            return self.alert(callback_id, MSG_NOT_CONFIGURED).await;
        }

        self.ack(callback_id, Some("🚀 Starting pump session...")).await?;
        let request = StartJob {
            user_id: event.user_id,
            token_address: snapshot.token_address.clone(),
            pump_amount_wei: snapshot.pump_amount_wei.clone(),
            swap_amount_wei: snapshot.swap_amount_wei.clone(),
            delay_millis: snapshot.delay_millis,
        };
        match self.gateway.start_job(request).await {
            Ok(StartOutcome { created: true }) => {
                {
                    let mut locked = session.lock().await;
                    locked.backend_started = true;
                    locked.is_paused = false;
                }
                // New job cycle: the user may be notified again on completion.
                self.ledger.clear(event.user_id);
                info!(user_id = event.user_id, "job started");
                self.reconcile_config(
                    ctx,
                    event,
                    &session,
                    Some("Volume pumping session started".to_string()),
                    None,
                )
                .await
            }
            Ok(StartOutcome { created: false }) => {
                // Idempotent start: a job already exists remotely.
                session.lock().await.backend_started = true;
                warn!(user_id = event.user_id, "start requested but job already exists");
                self.transport
                    .send_message(event.chat_id, MSG_ALREADY_RUNNING, None)
                    .await?;
                self.reconcile_config(ctx, event, &session, None, None).await
            }
            Err(err) => {
                let text = format!("❌ Error starting session: {err}\nTry again.");
                self.transport
                    .send_message(event.chat_id, &text, None)
                    .await?;
                Ok(())
            }
        }
    }

    async fn handle_pause(
        &self,
        ctx: &mut ConversationContext,
        event: &UserEvent,
        callback_id: &str,
    ) -> Result<(), TransportError> {
        let Some(session) = self.store.get(event.user_id) else {
            return self.alert(callback_id, MSG_SESSION_EXPIRED).await;
        };
        self.ack(callback_id, Some("⏸ Pausing pump session...")).await?;
        match self.gateway.pause_job(event.user_id).await {
            Ok(()) => {
                session.lock().await.is_paused = true;
                self.reconcile_config(
                    ctx,
                    event,
                    &session,
                    Some("Session paused".to_string()),
                    None,
                )
                .await
            }
            Err(err) => {
                let text = format!("❌ Error pausing session: {err}");
                self.transport
                    .send_message(event.chat_id, &text, None)
                    .await?;
                Ok(())
            }
        }
    }

    async fn handle_resume(
        &self,
        ctx: &mut ConversationContext,
        event: &UserEvent,
        callback_id: &str,
    ) -> Result<(), TransportError> {
        let Some(session) = self.store.get(event.user_id) else {
            return self.alert(callback_id, MSG_SESSION_EXPIRED).await;
        };
        self.ack(callback_id, Some("▶️ Resuming pump session...")).await?;
        match self.gateway.resume_job(event.user_id).await {
            Ok(()) => {
                session.lock().await.is_paused = false;
                self.reconcile_config(
                    ctx,
                    event,
                    &session,
                    Some("Session resumed".to_string()),
                    None,
                )
                .await
            }
            Err(err) => {
                let text = format!("❌ Error resuming session: {err}");
                self.transport
                    .send_message(event.chat_id, &text, None)
                    .await?;
                Ok(())
            }
        }
    }

    async fn handle_refresh_balance(
        &self,
        event: &UserEvent,
        callback_id: &str,
        message: MessageRef,
    ) -> Result<(), TransportError> {
        let wallet = match self.gateway.get_or_create_wallet(event.user_id).await {
            Ok(wallet) => wallet,
            Err(err) => return self.alert(callback_id, &format!("❌ Error: {err}")).await,
        };
        let balance = match self.gateway.get_balance(event.user_id).await {
            Ok(balance) => balance,
            Err(err) => return self.alert(callback_id, &format!("❌ Error: {err}")).await,
        };
        self.ack(callback_id, None).await?;

        if balance.display >= self.min_deposit {
            let text = view::ready_text(&wallet.address, &balance.display);
            self.edit_or_send(event.chat_id, message, &text, None).await
        } else {
            let text = view::deposit_text(&wallet.address, &balance.display, &self.min_deposit);
            let keyboard = view::refresh_balance_keyboard();
            self.edit_or_send(event.chat_id, message, &text, Some(&keyboard))
                .await
        }
    }

    async fn handle_refresh_status(
        &self,
        event: &UserEvent,
        callback_id: &str,
        message: MessageRef,
    ) -> Result<(), TransportError> {
        self.ack(callback_id, None).await?;
        let keyboard = view::status_keyboard();
        let status = match self.gateway.get_status(event.user_id).await {
            Ok(status) => status,
            Err(err) => {
                let text = format!(
                    "❌ Error getting status: {err}\nThe session may have ended or not been found."
                );
                return self
                    .edit_or_send(event.chat_id, message, &text, Some(&keyboard))
                    .await;
            }
        };
        let balance = self
            .gateway
            .get_balance(event.user_id)
            .await
            .ok()
            .map(|b| b.display);
        let text = view::status_message_text(&status, balance.as_ref());
        self.edit_or_send(event.chat_id, message, &text, Some(&keyboard))
            .await
    }

    // ---- helpers -----------------------------------------------------

    /// Parse user text as a strictly positive decimal, re-prompting the
    /// same step on failure. `None` means the caller should return as-is.
    async fn parse_positive_amount(
        &self,
        event: &UserEvent,
        text: &str,
        invalid_msg: &str,
        non_positive_msg: &str,
    ) -> Result<Option<Decimal>, TransportError> {
        let amount = match amounts::parse_bnb(text) {
            Ok(amount) => amount,
            Err(_) => {
                self.transport
                    .send_message(event.chat_id, invalid_msg, None)
                    .await?;
                return Ok(None);
            }
        };
        if amount <= Decimal::ZERO {
            self.transport
                .send_message(event.chat_id, non_positive_msg, None)
                .await?;
            return Ok(None);
        }
        Ok(Some(amount))
    }

    /// Fetch or reuse the backend-estimated maximum swap bound. `None`
    /// means the failure was already reported to the user.
    async fn max_swap_bound(
        &self,
        ctx: &mut ConversationContext,
        event: &UserEvent,
        session: &SessionHandle,
    ) -> Result<Option<String>, TransportError> {
        if let Some(max_wei) = &ctx.max_swap_wei {
            return Ok(Some(max_wei.clone()));
        }
        let pump_wei = session.lock().await.pump_amount_wei.clone();
        if amounts::wei_value(&pump_wei).map_or(true, |v| v == 0) {
            self.transport
                .send_message(event.chat_id, MSG_PUMP_FIRST, None)
                .await?;
            return Ok(None);
        }
        match self.gateway.estimate_max_swap(&pump_wei).await {
            Ok(max_wei) => {
                ctx.max_swap_wei = Some(max_wei.clone());
                Ok(Some(max_wei))
            }
            Err(err) => {
                let text = format!("❌ Error: {err}\nTry again:");
                self.transport
                    .send_message(event.chat_id, &text, None)
                    .await?;
                Ok(None)
            }
        }
    }

    /// Re-render the config menu from a fresh session snapshot plus
    /// best-effort remote reads.
    async fn reconcile_config(
        &self,
        ctx: &mut ConversationContext,
        event: &UserEvent,
        session: &SessionHandle,
        note: Option<String>,
        pools: Option<usize>,
    ) -> Result<(), TransportError> {
        let snapshot = session.lock().await.clone();
        if !snapshot.token_configured() {
            return Ok(());
        }
        let status = self
            .gateway
            .get_status(event.user_id)
            .await
            .unwrap_or(JobStatus::NotStarted);
        let balance = self
            .gateway
            .get_balance(event.user_id)
            .await
            .ok()
            .map(|b| b.display);

        let mut model = RenderModel::from_session(&snapshot, status, balance);
        if let Some(pools) = pools {
            model = model.with_pools(pools);
        }
        if let Some(note) = note {
            model = model.with_note(note);
        }
        self.view.reconcile(ctx, event.chat_id, &model).await
    }

    /// Replace the tracked menu message with a step prompt.
    async fn show_prompt(
        &self,
        ctx: &mut ConversationContext,
        chat_id: ChatId,
        text: &str,
    ) -> Result<(), TransportError> {
        if let Some(message) = ctx.config_message {
            match self
                .transport
                .edit_message_text(&message, text, None)
                .await?
            {
                EditOutcome::Edited | EditOutcome::NotModified => return Ok(()),
                EditOutcome::NotFound => ctx.config_message = None,
            }
        }
        let sent = self.transport.send_message(chat_id, text, None).await?;
        ctx.config_message = Some(sent);
        Ok(())
    }

    /// Edit a specific message in place, falling back to a fresh send when
    /// it no longer exists. `NotModified` is a no-op success.
    async fn edit_or_send(
        &self,
        chat_id: ChatId,
        message: MessageRef,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError> {
        match self
            .transport
            .edit_message_text(&message, text, keyboard)
            .await?
        {
            EditOutcome::Edited | EditOutcome::NotModified => Ok(()),
            EditOutcome::NotFound => {
                self.transport.send_message(chat_id, text, keyboard).await?;
                Ok(())
            }
        }
    }

    async fn ack(&self, callback_id: &str, text: Option<&str>) -> Result<(), TransportError> {
        self.transport.answer_callback(callback_id, text, false).await
    }

    /// Blocking alert: the action was refused and no state changed.
    async fn alert(&self, callback_id: &str, text: &str) -> Result<(), TransportError> {
        self.transport.answer_callback(callback_id, Some(text), true).await
    }
}
