//! Open Exchange Rates API client
//!
//! Fetches the latest rate sheet for a base currency from
//! `GET {provider}/api/latest.json?app_id=...&base=...` and decodes it into a
//! [`RateSheet`].

use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::debug;

use super::{Base, RateSheet, SheetError};

/// Default provider root
pub const OPEN_EXCHANGE_RATES_URL: &str = "https://openexchangerates.org";

/// Path of the latest-rates endpoint under the provider root
const LATEST_PATH: &str = "/api/latest.json";

/// Errors that can occur when fetching rates
#[derive(Debug, Error)]
pub enum RatesError {
    /// Transport failure or timeout
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-success status
    #[error("Provider returned status {0}")]
    Status(StatusCode),

    /// Provider body did not decode as a rate sheet
    #[error(transparent)]
    Payload(#[from] SheetError),
}

/// Client for the Open Exchange Rates latest-rates endpoint
#[derive(Debug, Clone)]
pub struct RatesClient {
    client: Client,
    app_id: String,
    base_url: String,
}

impl RatesClient {
    /// Creates a client with a custom provider root and request timeout
    ///
    /// The provider root is the scheme and host (plus optional prefix) that
    /// `/api/latest.json` is appended to. Used to point at mock servers in tests.
    pub fn with_options(
        app_id: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RatesError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, app_id, base_url))
    }

    /// Creates a client around an existing HTTP client
    pub fn with_client(
        client: Client,
        app_id: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            app_id: app_id.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetches the latest rates quoted against `base`
    ///
    /// # Returns
    /// * `Ok(RateSheet)` - The decoded payload, exactly as the provider sent it
    /// * `Err(RatesError)` - On transport failure, timeout, non-2xx status or a malformed body
    ///
    /// The returned sheet is not checked against `base`; callers decide how
    /// to treat a provider that answers with a different currency.
    pub async fn fetch_latest(&self, base: &Base) -> Result<RateSheet, RatesError> {
        let url = format!("{}{}", self.base_url, LATEST_PATH);
        debug!(base = %base, url = %url, "Fetching latest rates");

        let response = self
            .client
            .get(&url)
            .query(&[("app_id", self.app_id.as_str()), ("base", base.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RatesError::Status(status));
        }

        let text = response.text().await?;
        Ok(RateSheet::parse(text)?)
    }
}
