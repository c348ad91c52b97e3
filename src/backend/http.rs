//! reqwest-based implementation of the backend gateway.
//!
//! Mirrors the backend's REST surface one method per endpoint. Non-2xx
//! responses become `BackendError::Rejected` with the body as the message;
//! connection-level failures become `BackendError::Unavailable`.

use std::str::FromStr;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use super::{Balance, BackendGateway, JobStatus, StartJob, StartOutcome, WalletInfo};
use crate::error::BackendError;
use crate::session::UserId;

/// Cap on rejected-response bodies quoted back to the user.
const ERROR_BODY_MAX: usize = 300;

/// HTTP client for the volume-boost backend.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base: String,
}

#[derive(Debug, Deserialize)]
struct WalletResponse {
    wallet_dto: WalletDto,
}

#[derive(Debug, Deserialize)]
struct WalletDto {
    evm_address: String,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    raw: String,
    ui: Value,
}

#[derive(Debug, Deserialize)]
struct SupportedResponse {
    #[serde(default)]
    is_supported: bool,
}

#[derive(Debug, Deserialize)]
struct MaxSwapResponse {
    max_swap_amount_wei: String,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    amount_usd: Value,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: Option<JobStatus>,
}

impl HttpGateway {
    pub fn new(client: Client, base_url: &Url) -> Self {
        Self {
            client,
            base: base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            message.truncate(ERROR_BODY_MAX);
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    async fn execute_unit(&self, request: reqwest::RequestBuilder) -> Result<(), BackendError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            message.truncate(ERROR_BODY_MAX);
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

/// The backend encodes display amounts either as JSON strings or numbers.
fn decimal_from_value(value: &Value, field: &str) -> Result<Decimal, BackendError> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(BackendError::InvalidResponse(format!(
                "unexpected {field} value: {other}"
            )));
        }
    };
    Decimal::from_str(&text)
        .map_err(|e| BackendError::InvalidResponse(format!("bad {field} '{text}': {e}")))
}

/// Pools arrive as `{"pools": {"pairs": [...]}}` or as a bare list.
fn count_pools(value: &Value) -> usize {
    match value.get("pools") {
        Some(Value::Array(list)) => list.len(),
        Some(Value::Object(map)) => map
            .get("pairs")
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0),
        _ => 0,
    }
}

#[async_trait]
impl BackendGateway for HttpGateway {
    async fn get_or_create_wallet(&self, user_id: UserId) -> Result<WalletInfo, BackendError> {
        let url = self.url(&format!("/user/{user_id}/wallet"));
        debug!(%url, "GET wallet");
        let response: WalletResponse = self.execute(self.client.get(&url)).await?;
        Ok(WalletInfo {
            address: response.wallet_dto.evm_address,
        })
    }

    async fn get_balance(&self, user_id: UserId) -> Result<Balance, BackendError> {
        let url = self.url(&format!("/user/{user_id}/wallet/balance"));
        debug!(%url, "GET balance");
        let response: BalanceResponse = self.execute(self.client.get(&url)).await?;
        let display = decimal_from_value(&response.ui, "ui balance")?;
        Ok(Balance {
            raw: response.raw,
            display,
        })
    }

    async fn is_token_supported(&self, token_address: &str) -> Result<bool, BackendError> {
        let url = self.url(&format!("/token/{token_address}/is-supported"));
        let response: SupportedResponse = self.execute(self.client.get(&url)).await?;
        Ok(response.is_supported)
    }

    async fn get_pools(&self, token_address: &str) -> Result<usize, BackendError> {
        let url = self.url(&format!("/token/{token_address}/pools"));
        let response: Value = self.execute(self.client.get(&url)).await?;
        Ok(count_pools(&response))
    }

    async fn estimate_max_swap(&self, pump_amount_wei: &str) -> Result<String, BackendError> {
        let url = self.url("/bot/session/max-swap");
        let response: MaxSwapResponse = self
            .execute(
                self.client
                    .post(&url)
                    .json(&json!({ "pump_amount_wei": pump_amount_wei })),
            )
            .await?;
        Ok(response.max_swap_amount_wei)
    }

    async fn to_display_currency(&self, amount_wei: &str) -> Result<Decimal, BackendError> {
        let url = self.url("/price/bnb-to-usd");
        let response: PriceResponse = self
            .execute(
                self.client
                    .post(&url)
                    .json(&json!({ "amount_wei": amount_wei })),
            )
            .await?;
        decimal_from_value(&response.amount_usd, "amount_usd")
    }

    async fn start_job(&self, request: StartJob) -> Result<StartOutcome, BackendError> {
        let url = self.url("/bot/session/run");
        debug!(user_id = request.user_id, %url, "POST start job");
        self.execute(self.client.post(&url).json(&json!({
            "user_telegram_id": request.user_id,
            "token_ca": request.token_address,
            "pump_amount_wei": request.pump_amount_wei,
            "swap_amount_wei": request.swap_amount_wei,
            "delay_millis": request.delay_millis,
        })))
        .await
    }

    async fn get_status(&self, user_id: UserId) -> Result<JobStatus, BackendError> {
        // The backend reads a JSON body on this GET; non-standard but part
        // of the wire contract.
        let url = self.url("/bot/session/status");
        let response: StatusResponse = self
            .execute(
                self.client
                    .get(&url)
                    .json(&json!({ "user_telegram_id": user_id })),
            )
            .await?;
        Ok(response.status.unwrap_or(JobStatus::NotStarted))
    }

    async fn pause_job(&self, user_id: UserId) -> Result<(), BackendError> {
        let url = self.url("/bot/session/pause");
        self.execute_unit(
            self.client
                .post(&url)
                .json(&json!({ "user_telegram_id": user_id })),
        )
        .await
    }

    async fn resume_job(&self, user_id: UserId) -> Result<(), BackendError> {
        let url = self.url("/bot/session/resume");
        self.execute_unit(
            self.client
                .post(&url)
                .json(&json!({ "user_telegram_id": user_id })),
        )
        .await
    }

    async fn set_delay(&self, user_id: UserId, delay_millis: u64) -> Result<(), BackendError> {
        let url = self.url("/bot/session/delay");
        self.execute_unit(self.client.put(&url).json(&json!({
            "user_telegram_id": user_id,
            "delay_millis": delay_millis,
        })))
        .await
    }

    async fn set_swap_amount(
        &self,
        user_id: UserId,
        swap_amount_wei: &str,
    ) -> Result<(), BackendError> {
        let url = self.url("/bot/session/swap-amount");
        self.execute_unit(self.client.put(&url).json(&json!({
            "user_telegram_id": user_id,
            "swap_amount_wei": swap_amount_wei,
        })))
        .await
    }
}
