//! WhatsApp gateway channel.
//!
//! Talks to an Evolution-style REST gateway:
//! `POST {base_url}/message/sendText/{instance}` with an `apiKey` header and a
//! `{"number", "text"}` body. Any non-2xx status or transport error is a failure.

use async_trait::async_trait;
use leadflow_core::config::WhatsAppConfig;
use leadflow_core::error::{LeadflowError, Result};
use leadflow_core::traits::MessageChannel;
use std::time::Duration;

/// WhatsApp gateway channel implementation.
pub struct WhatsAppChannel {
    config: WhatsAppConfig,
    client: reqwest::Client,
}

impl WhatsAppChannel {
    pub fn new(config: WhatsAppConfig) -> Result<Self> {
        if !config.is_configured() {
            return Err(LeadflowError::Config(
                "WhatsApp base_url, instance and api_key must all be set".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LeadflowError::Http(format!("WhatsApp client build failed: {e}")))?;
        Ok(Self { config, client })
    }

    fn send_url(&self) -> String {
        format!(
            "{}/message/sendText/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.instance
        )
    }
}

#[async_trait]
impl MessageChannel for WhatsAppChannel {
    fn name(&self) -> &str { "whatsapp" }

    async fn send_text(&self, contact_handle: &str, text: &str) -> Result<String> {
        let body = serde_json::json!({
            "number": contact_handle,
            "text": text,
        });

        let response = self
            .client
            .post(self.send_url())
            .header("apiKey", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LeadflowError::Channel(format!("WhatsApp request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LeadflowError::Channel(format!(
                "WhatsApp gateway error {status}: {error_text}"
            )));
        }

        // The id is informational; a 2xx with an unexpected body still counts as delivered.
        let result: serde_json::Value = response.json().await.unwrap_or_default();
        let msg_id = result["key"]["id"].as_str().unwrap_or_default().to_string();

        tracing::debug!("WhatsApp message sent: {} → {}", msg_id, contact_handle);
        Ok(msg_id)
    }
}
