//! Typed client abstraction over the volume-boost backend.
//!
//! The orchestration layer depends on the [`BackendGateway`] trait; the
//! HTTP implementation lives in [`http`]. Every amount crosses this
//! boundary as a wei-encoded integer string, never as a float.

mod http;

pub use http::HttpGateway;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::BackendError;
use crate::session::UserId;

/// User wallet as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletInfo {
    pub address: String,
}

/// Wallet balance: raw wei string for arithmetic, display value for text.
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    pub raw: String,
    pub display: Decimal,
}

/// Parameters for creating the remote job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartJob {
    pub user_id: UserId,
    pub token_address: String,
    pub pump_amount_wei: String,
    pub swap_amount_wei: String,
    pub delay_millis: u64,
}

/// Result of a job-creation call. `created: false` means a job already
/// exists for the user; the call is idempotent and this is a warning, not
/// an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StartOutcome {
    pub created: bool,
}

/// Final statistics of a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobReport {
    #[serde(rename = "pumped_amount_wei")]
    pub pumped_wei: String,
    #[serde(rename = "pumped_amount_usd", default)]
    pub pumped_usd: String,
    #[serde(rename = "time_spent_millis", default)]
    pub elapsed_millis: u64,
}

/// Remote job state, decoded from the backend's externally tagged JSON
/// (`"InProcess"`, `{"Success": {..}}`, `{"Error": ".."}`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub enum JobStatus {
    NotStarted,
    InProcess,
    Success(JobReport),
    Error(String),
}

impl JobStatus {
    pub fn is_in_process(&self) -> bool {
        matches!(self, Self::InProcess)
    }
}

/// Async capability interface over the remote job API. All calls may fail
/// with a transport or remote-validation error; the orchestrator treats
/// every failure as non-fatal to the conversation.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    async fn get_or_create_wallet(&self, user_id: UserId) -> Result<WalletInfo, BackendError>;

    async fn get_balance(&self, user_id: UserId) -> Result<Balance, BackendError>;

    async fn is_token_supported(&self, token_address: &str) -> Result<bool, BackendError>;

    /// Number of liquidity pools backing the token.
    async fn get_pools(&self, token_address: &str) -> Result<usize, BackendError>;

    /// Backend-estimated maximum per-swap amount for a given budget.
    async fn estimate_max_swap(&self, pump_amount_wei: &str) -> Result<String, BackendError>;

    /// Convert a wei amount to its USD display value.
    async fn to_display_currency(&self, amount_wei: &str) -> Result<Decimal, BackendError>;

    async fn start_job(&self, request: StartJob) -> Result<StartOutcome, BackendError>;

    async fn get_status(&self, user_id: UserId) -> Result<JobStatus, BackendError>;

    async fn pause_job(&self, user_id: UserId) -> Result<(), BackendError>;

    async fn resume_job(&self, user_id: UserId) -> Result<(), BackendError>;

    async fn set_delay(&self, user_id: UserId, delay_millis: u64) -> Result<(), BackendError>;

    async fn set_swap_amount(
        &self,
        user_id: UserId,
        swap_amount_wei: &str,
    ) -> Result<(), BackendError>;
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_unit_status_variants() {
        let status: JobStatus = serde_json::from_value(json!("InProcess")).unwrap();
        assert_eq!(status, JobStatus::InProcess);

        let status: JobStatus = serde_json::from_value(json!("NotStarted")).unwrap();
        assert_eq!(status, JobStatus::NotStarted);
    }

    #[test]
    fn decodes_success_status_with_report() {
        let status: JobStatus = serde_json::from_value(json!({
            "Success": {
                "pumped_amount_wei": "500000000000000000",
                "pumped_amount_usd": "312.50",
                "time_spent_millis": 30000
            }
        }))
        .unwrap();

        assert_eq!(
            status,
            JobStatus::Success(JobReport {
                pumped_wei: "500000000000000000".to_string(),
                pumped_usd: "312.50".to_string(),
                elapsed_millis: 30000,
            })
        );
    }

    #[test]
    fn decodes_error_status() {
        let status: JobStatus =
            serde_json::from_value(json!({"Error": "insufficient funds"})).unwrap();
        assert_eq!(status, JobStatus::Error("insufficient funds".to_string()));
    }
}
