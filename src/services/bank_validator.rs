use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum BankValidatorError {
    #[error("Bank registry did not answer in time")]
    Timeout,

    #[error("Bank registry unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for BankValidatorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BankValidatorError::Timeout
        } else {
            BankValidatorError::Unavailable(err.to_string())
        }
    }
}

/// Registry of partner banks allowed to issue cards.
///
/// `Ok(false)` means the registry answered and does not know the bank;
/// `Err` means the registry could not be asked.
#[async_trait]
pub trait BankValidator: Send + Sync {
    async fn is_registered(&self, swift_code: &str) -> Result<bool, BankValidatorError>;

    async fn check_health(&self) -> Result<(), BankValidatorError> {
        Ok(())
    }
}

/// Bank registry reached over HTTP at `GET {base}/api/v1/banco/{swift}`
pub struct HttpBankValidator {
    client: Client,
    base_url: Url,
}

impl HttpBankValidator {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, BankValidatorError> {
        if base_url.cannot_be_a_base() {
            return Err(BankValidatorError::Unavailable(format!(
                "bank service URL cannot be a base: {}",
                base_url
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn registry_url(&self, swift_code: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "v1", "banco", swift_code]);
        }
        url
    }
}

#[async_trait]
impl BankValidator for HttpBankValidator {
    #[tracing::instrument(skip(self))]
    async fn is_registered(&self, swift_code: &str) -> Result<bool, BankValidatorError> {
        let url = self.registry_url(swift_code);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!("Bank not present in registry");
            return Ok(false);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Bank registry request failed");
            return Err(BankValidatorError::Unavailable(format!("HTTP {}", status)));
        }

        let body = response.text().await?;
        let registered = matches!(
            serde_json::from_str::<serde_json::Value>(body.trim()),
            Ok(serde_json::Value::Bool(true))
        );

        tracing::debug!(registered, "Bank registry answered");
        Ok(registered)
    }

    async fn check_health(&self) -> Result<(), BankValidatorError> {
        let response = self.client.head(self.base_url.clone()).send().await?;

        if response.status().is_server_error() {
            return Err(BankValidatorError::Unavailable(format!(
                "HTTP {}",
                response.status()
            )));
        }

        Ok(())
    }
}
