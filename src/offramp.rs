use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tracing::info;

use crate::config::OfframpConfig;
use crate::types::Payout;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the Onmeta crypto→INR off-ramp. Orders are fire-and-log:
/// failures are diagnosed from the logs and never block ingestion.
pub struct OfframpClient {
    http: reqwest::Client,
    config: OfframpConfig,
}

impl OfframpClient {
    pub fn new(config: OfframpConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to construct http client");

        Self { http, config }
    }

    pub async fn create_order(&self, payout: &Payout) -> Result<()> {
        let response = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "cryptoAmount": payout.amount,
                "cryptoCurrency": payout.stablecoin,
                "landlordUPI": payout.landlord_upi,
                "landlordBankDetails": payout.landlord_bank_details,
            }))
            .send()
            .await?
            .error_for_status()?;

        info!(tx = %payout.tx_hash, status = %response.status(), "off-ramp order created");
        Ok(())
    }
}
