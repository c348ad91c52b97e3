//! Config view rendering.
//!
//! One pure model ([`RenderModel`]) feeds one canonical text block and one
//! keyboard layout, and [`ConfigView::reconcile`] applies the result to the
//! chat idempotently: edit the stored message in place, send a fresh one
//! only when no reference exists (or the old message vanished), and treat
//! a byte-identical edit as success.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::amounts;
use crate::backend::JobStatus;
use crate::error::TransportError;
use crate::session::{ConversationContext, UserSession};
use crate::transport::{Action, Button, ChatId, ChatTransport, EditOutcome, Keyboard};

/// Everything the renderer needs, snapshotted from session + remote state.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderModel {
    pub token_address: String,
    pub pump_amount_wei: String,
    pub swap_amount_wei: String,
    pub delay_millis: u64,
    pub is_paused: bool,
    pub status: JobStatus,
    /// Best-effort wallet balance; `None` renders as "N/A".
    pub balance: Option<Decimal>,
    /// Pool count, shown only when freshly fetched after token validation.
    pub pools: Option<usize>,
    /// One-line confirmation shown above the block ("Pump amount set…").
    pub note: Option<String>,
}

impl RenderModel {
    /// Single input contract for the renderer: session snapshot plus the
    /// best-effort remote reads.
    pub fn from_session(session: &UserSession, status: JobStatus, balance: Option<Decimal>) -> Self {
        Self {
            token_address: session.token_address.clone(),
            pump_amount_wei: session.pump_amount_wei.clone(),
            swap_amount_wei: session.swap_amount_wei.clone(),
            delay_millis: session.delay_millis,
            is_paused: session.is_paused,
            status,
            balance,
            pools: None,
            note: None,
        }
    }

    pub fn with_pools(mut self, pools: usize) -> Self {
        self.pools = Some(pools);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    fn pump_configured(&self) -> bool {
        amounts::wei_value(&self.pump_amount_wei).is_ok_and(|v| v > 0)
    }

    fn swap_configured(&self) -> bool {
        amounts::wei_value(&self.swap_amount_wei).is_ok_and(|v| v > 0)
    }

    /// Canonical configuration text block.
    pub fn text(&self) -> String {
        let mut out = String::new();
        if let Some(note) = &self.note {
            out.push_str(&format!("✅ {note}\n\n"));
        }
        out.push_str("🎯 **Token Analysis Complete**\n\n");
        out.push_str("✅ Verified & Ready for Volume Boost\n");
        if let Some(pools) = self.pools {
            out.push_str(&format!("📊 Active Pools: {pools}\n"));
        }
        out.push_str(&format!(
            "🔗 CA: [{}]({})\n\n",
            elide_token(&self.token_address),
            token_link(&self.token_address)
        ));

        out.push_str("⚙️ **Current Configuration:**\n");
        out.push_str(&format!(
            "{} Pump Amount: **{} BNB**\n",
            indicator(self.pump_configured()),
            wei_or_zero(&self.pump_amount_wei)
        ));
        out.push_str(&format!(
            "{} Swap Amount: **{} BNB**\n",
            indicator(self.swap_configured()),
            wei_or_zero(&self.swap_amount_wei)
        ));
        out.push_str(&format!(
            "{} Delay: **{}s**\n\n",
            indicator(self.delay_millis > 0),
            amounts::format_delay_secs(self.delay_millis)
        ));

        out.push_str(&format!("📊 Status: {}\n", status_label(&self.status)));
        let balance = self
            .balance
            .as_ref()
            .map(amounts::format_bnb)
            .unwrap_or_else(|| "N/A".to_string());
        out.push_str(&format!("💰 Balance: **{balance} BNB**\n\n"));
        out.push_str("👇 Configure amounts or start pumping:");
        out
    }

    /// Button layout as a pure function of
    /// `(status, pump_configured, swap_configured, is_paused)`.
    pub fn keyboard(&self) -> Keyboard {
        keyboard_for(
            &self.status,
            self.pump_configured(),
            self.swap_configured(),
            self.is_paused,
        )
    }
}

fn indicator(configured: bool) -> &'static str {
    if configured { "🟢" } else { "🔴" }
}

fn wei_or_zero(wei: &str) -> String {
    amounts::wei_to_bnb(wei)
        .map(|v| amounts::format_bnb(&v))
        .unwrap_or_else(|_| "0.0".to_string())
}

/// Short prefix/suffix form of a contract address.
pub fn elide_token(token_address: &str) -> String {
    let chars: Vec<char> = token_address.chars().collect();
    if chars.len() <= 18 {
        return token_address.to_string();
    }
    let prefix: String = chars[..10].iter().collect();
    let suffix: String = chars[chars.len() - 8..].iter().collect();
    format!("{prefix}...{suffix}")
}

pub fn token_link(token_address: &str) -> String {
    format!("https://dexscreener.com/bsc/{token_address}")
}

/// Human label for every job status; exhaustive on purpose.
pub fn status_label(status: &JobStatus) -> String {
    match status {
        JobStatus::NotStarted => "⚪️ Not Started".to_string(),
        JobStatus::InProcess => "🔄 In Progress".to_string(),
        JobStatus::Success(_) => "✅ Completed".to_string(),
        JobStatus::Error(message) => format!("❌ Error: {message}"),
    }
}

fn editors(include_pump: bool) -> Vec<Button> {
    let mut row = Vec::new();
    if include_pump {
        row.push(Button::new("💰 Pump Amount", Action::SetPumpAmount));
    }
    row.push(Button::new("💱 Swap Amount", Action::SetSwapAmount));
    row.push(Button::new("⏱ Set Delay", Action::SetDelay));
    row
}

fn keyboard_for(
    status: &JobStatus,
    pump_configured: bool,
    swap_configured: bool,
    is_paused: bool,
) -> Keyboard {
    // Pump stays editable only while no job is live; a paused job is still
    // live, so the pump editor is hidden there too.
    if is_paused {
        return Keyboard::new(vec![
            editors(false),
            vec![Button::new("▶️ Resume", Action::Resume)],
        ]);
    }
    match status {
        JobStatus::InProcess => Keyboard::new(vec![
            editors(false),
            vec![
                Button::new("🚀 START", Action::Start),
                Button::new("⏸ Pause", Action::Pause),
            ],
        ]),
        JobStatus::Success(_) | JobStatus::Error(_) => Keyboard::new(vec![
            editors(true),
            vec![Button::new("▶️ Resume", Action::Resume)],
        ]),
        JobStatus::NotStarted => {
            let start_label = if pump_configured && swap_configured {
                "🚀 START"
            } else {
                "🔒 START"
            };
            Keyboard::new(vec![
                editors(true),
                vec![
                    Button::new(start_label, Action::Start),
                    Button::new("⏸ Pause", Action::Pause),
                ],
            ])
        }
    }
}

/// Welcome text once the wallet holds enough to start.
pub fn ready_text(wallet_address: &str, balance: &Decimal) -> String {
    format!(
        "💼 Your wallet: `{wallet_address}`\n\
         💰 Current balance: {} BNB\n\n\
         🚀 Ready to start!\n\
         Send me the token contract address (CA) to begin pumping.\n\n\
         Example: `0x718447E29B90D00461966D01E533Fa1b69574444`",
        amounts::format_balance(balance)
    )
}

/// Deposit prompt shown while the balance is below the minimum.
pub fn deposit_text(wallet_address: &str, balance: &Decimal, min_deposit: &Decimal) -> String {
    format!(
        "⚡️Save 30% vs others while keeping your chart fully organic — from just {min}BNB!\n\n\
         — 🌿Organic & randomized: Unique wallets, random buy/sell and timing — no bot-look, no spam\n\n\
         — 🛠Manage it your way: Run with battle-tested defaults or customize your own settings — your chart, your rules\n\n\
         🎁 Free Microbots and Bumps included\n\n\
         ➔ Deposit to this address to start:\n\
         `{wallet_address}`\n\n\
         💰 Current balance: {balance} BNB\n\
         ⚠️ Minimum required: {min} BNB",
        min = min_deposit.normalize(),
        balance = amounts::format_balance(balance),
    )
}

pub fn refresh_balance_keyboard() -> Keyboard {
    Keyboard::new(vec![vec![Button::new("🔄 Refresh", Action::RefreshBalance)]])
}

pub fn status_keyboard() -> Keyboard {
    Keyboard::new(vec![vec![Button::new(
        "🔄 Refresh Status",
        Action::RefreshStatus,
    )]])
}

/// Detailed status line(s), including final statistics for completed jobs.
pub fn status_detail(status: &JobStatus) -> String {
    match status {
        JobStatus::Success(report) => {
            let pumped = amounts::wei_to_bnb(&report.pumped_wei)
                .map(|v| amounts::format_bnb(&v))
                .unwrap_or_else(|_| report.pumped_wei.clone());
            format!(
                "✅ Success\n  Pumped: {} BNB (${})\n  Time: {}s",
                pumped,
                report.pumped_usd,
                amounts::format_delay_secs(report.elapsed_millis)
            )
        }
        other => status_label(other),
    }
}

/// Standalone status message body, refreshed in place by its button.
pub fn status_message_text(status: &JobStatus, balance: Option<&Decimal>) -> String {
    let balance = balance
        .map(amounts::format_balance)
        .unwrap_or_else(|| "N/A".to_string());
    format!(
        "🚀 Volume pumping session status:\n\n\
         Status: {}\n\
         Wallet Balance: {balance} BNB\n\n\
         Press Refresh to update data.",
        status_detail(status)
    )
}

/// One-time completion announcement sent by the watcher.
pub fn completion_text(report: &crate::backend::JobReport) -> String {
    let pumped = amounts::wei_to_bnb(&report.pumped_wei)
        .map(|v| amounts::format_bnb(&v))
        .unwrap_or_else(|_| report.pumped_wei.clone());
    format!(
        "🎉 Volume pumping session completed!\n\n\
         Pumped: {} BNB (≈${})\n\
         Time: {}s\n\n\
         Send a new token contract address to start another one.",
        pumped,
        report.pumped_usd,
        amounts::format_delay_secs(report.elapsed_millis)
    )
}

/// Applies a [`RenderModel`] to the chat, editing in place when possible.
pub struct ConfigView {
    transport: Arc<dyn ChatTransport>,
}

impl ConfigView {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    /// Render or update the config message, recording its reference in the
    /// conversation context. Safe to call repeatedly with identical state.
    pub async fn reconcile(
        &self,
        ctx: &mut ConversationContext,
        chat_id: ChatId,
        model: &RenderModel,
    ) -> Result<(), TransportError> {
        let text = model.text();
        let keyboard = model.keyboard();

        if let Some(message) = ctx.config_message {
            let outcome = self
                .transport
                .edit_message_text(&message, &text, Some(&keyboard))
                .await?;
            match outcome {
                EditOutcome::Edited | EditOutcome::NotModified => return Ok(()),
                EditOutcome::NotFound => {
                    // The old menu is gone; fall through and send a new one.
                    ctx.config_message = None;
                }
            }
        }

        let sent = self
            .transport
            .send_message(chat_id, &text, Some(&keyboard))
            .await?;
        ctx.config_message = Some(sent);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::backend::JobReport;

    fn model() -> RenderModel {
        let mut session = UserSession::new();
        session.token_address = "0x718447E29B90D00461966D01E533Fa1b69574444".to_string();
        session.pump_amount_wei = "500000000000000000".to_string();
        session.swap_amount_wei = "50000000000000000".to_string();
        RenderModel::from_session(&session, JobStatus::NotStarted, Some(dec!(1.0)))
    }

    #[test]
    fn elides_long_addresses() {
        assert_eq!(
            elide_token("0x718447E29B90D00461966D01E533Fa1b69574444"),
            "0x718447E2...69574444"
        );
        assert_eq!(elide_token("0xshort"), "0xshort");
    }

    #[test]
    fn text_contains_configuration_lines() {
        let text = model().text();
        assert!(text.contains("🟢 Pump Amount: **0.5000 BNB**"));
        assert!(text.contains("🟢 Swap Amount: **0.0500 BNB**"));
        assert!(text.contains("🟢 Delay: **1.0s**"));
        assert!(text.contains("📊 Status: ⚪️ Not Started"));
        assert!(text.contains("💰 Balance: **1.0000 BNB**"));
    }

    #[test]
    fn missing_balance_renders_placeholder() {
        let mut m = model();
        m.balance = None;
        assert!(m.text().contains("💰 Balance: **N/A BNB**"));
    }

    #[test]
    fn note_prefixes_the_block() {
        let text = model().with_note("Pump amount set to 0.5 BNB").text();
        assert!(text.starts_with("✅ Pump amount set to 0.5 BNB\n\n🎯"));
    }

    #[test]
    fn unconfigured_amounts_show_red() {
        let mut session = UserSession::new();
        session.token_address = "0xabc".to_string();
        let text = RenderModel::from_session(&session, JobStatus::NotStarted, None).text();
        assert!(text.contains("🔴 Pump Amount: **0.0 BNB**"));
        assert!(text.contains("🔴 Swap Amount: **0.0 BNB**"));
    }

    fn actions(keyboard: &Keyboard) -> Vec<Vec<Action>> {
        keyboard
            .rows
            .iter()
            .map(|row| row.iter().map(|b| b.action).collect())
            .collect()
    }

    #[test]
    fn in_process_hides_pump_editor() {
        let mut m = model();
        m.status = JobStatus::InProcess;
        assert_eq!(
            actions(&m.keyboard()),
            vec![
                vec![Action::SetSwapAmount, Action::SetDelay],
                vec![Action::Start, Action::Pause],
            ]
        );
    }

    #[test]
    fn paused_shows_resume_only() {
        let mut m = model();
        m.status = JobStatus::InProcess;
        m.is_paused = true;
        assert_eq!(
            actions(&m.keyboard()),
            vec![
                vec![Action::SetSwapAmount, Action::SetDelay],
                vec![Action::Resume],
            ]
        );
    }

    #[test]
    fn terminal_states_offer_resume() {
        let mut m = model();
        m.status = JobStatus::Success(JobReport {
            pumped_wei: "1".to_string(),
            pumped_usd: "1".to_string(),
            elapsed_millis: 1,
        });
        assert_eq!(
            actions(&m.keyboard()),
            vec![
                vec![Action::SetPumpAmount, Action::SetSwapAmount, Action::SetDelay],
                vec![Action::Resume],
            ]
        );
    }

    #[test]
    fn start_is_locked_until_both_amounts_configured() {
        let mut m = model();
        m.swap_amount_wei = String::new();
        let keyboard = m.keyboard();
        assert_eq!(keyboard.rows[1][0].label, "🔒 START");

        let ready = model().keyboard();
        assert_eq!(ready.rows[1][0].label, "🚀 START");
    }
}
