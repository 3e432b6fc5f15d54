//! HTTP client for the voice platform's contact API.
//!
//! Wraps outbound-call placement, per-contact attribute read/write, status
//! queries and call termination. Every operation is a single request with
//! the platform's own timeout; failures are reported through the trait's
//! return values so the caller decides what to do with them.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{CallError, ContactStatus, TelephonyGateway, ATTR_PROMPT};

/// Contact states after which the platform considers the call over.
const TERMINAL_STATES: [&str; 4] = ["DISCONNECTED", "COMPLETED", "ENDED", "TERMINATED"];

/// Configuration for the voice platform client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoicePlatformConfig {
    /// Base URL of the contact API
    pub api_url: String,

    /// Bearer token
    pub api_token: String,

    /// Platform instance the contacts belong to
    pub instance_id: String,

    /// Contact flow driving the interview dialogue
    pub flow_id: String,

    /// Caller id for outbound calls
    pub source_number: String,
}

/// Voice platform API client.
pub struct VoicePlatformClient {
    config: VoicePlatformConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct StartContactRequest<'a> {
    destination_phone_number: &'a str,
    contact_flow_id: &'a str,
    source_phone_number: &'a str,
    attributes: HashMap<&'a str, String>,
}

#[derive(Debug, Deserialize)]
struct StartContactResponse {
    contact_id: String,
}

#[derive(Debug, Deserialize)]
struct DescribeContactResponse {
    state: Option<String>,
    disconnect_timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttributesResponse {
    #[serde(default)]
    attributes: HashMap<String, String>,
}

impl VoicePlatformClient {
    pub fn new(config: VoicePlatformConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn contact_url(&self, rest: &str) -> String {
        format!(
            "{}/instances/{}/contacts{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.instance_id,
            rest
        )
    }

    async fn update_attributes(
        &self,
        contact_id: &str,
        attributes: HashMap<&str, String>,
    ) -> Result<()> {
        let url = self.contact_url(&format!("/{}/attributes", contact_id));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .json(&serde_json::json!({ "attributes": attributes }))
            .send()
            .await
            .context("Failed to send attribute update")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Attribute update failed ({}): {}", status, body);
        }

        Ok(())
    }
}

#[async_trait]
impl TelephonyGateway for VoicePlatformClient {
    async fn place_call(
        &self,
        phone_number: &str,
        context: &str,
        opening_prompt: &str,
    ) -> Result<String, CallError> {
        let session_tag = format!(
            "callscribe_{}_{}",
            chrono::Utc::now().format("%Y%m%d_%H%M%S"),
            &phone_number[phone_number.len().saturating_sub(4)..]
        );

        // Initial attribute map expected by the interview flow.
        let mut attributes = HashMap::new();
        attributes.insert(ATTR_PROMPT, opening_prompt.to_string());
        attributes.insert("InterviewContext", context.to_string());
        attributes.insert("SessionId", session_tag);
        attributes.insert("QuestionCount", "0".to_string());
        attributes.insert("InterviewStep", "0".to_string());

        let request = StartContactRequest {
            destination_phone_number: phone_number,
            contact_flow_id: &self.config.flow_id,
            source_phone_number: &self.config.source_number,
            attributes,
        };

        let response = self
            .client
            .post(self.contact_url(""))
            .bearer_auth(&self.config.api_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CallError::Rejected(format!("{}: {}", status, body)));
        }

        let started: StartContactResponse = response
            .json()
            .await
            .map_err(|e| CallError::Transport(e.to_string()))?;

        Ok(started.contact_id)
    }

    async fn read_attributes(&self, contact_id: &str) -> HashMap<String, String> {
        let url = self.contact_url(&format!("/{}/attributes", contact_id));

        let response = match self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_token)
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!(contact_id, status = %r.status(), "Attribute read rejected");
                return HashMap::new();
            }
            Err(e) => {
                warn!(contact_id, error = %e, "Attribute read failed");
                return HashMap::new();
            }
        };

        match response.json::<AttributesResponse>().await {
            Ok(body) => body.attributes,
            Err(e) => {
                warn!(contact_id, error = %e, "Attribute response malformed");
                HashMap::new()
            }
        }
    }

    async fn write_attribute(&self, contact_id: &str, key: &str, value: &str) -> bool {
        let mut attributes = HashMap::new();
        attributes.insert(key, value.to_string());

        match self.update_attributes(contact_id, attributes).await {
            Ok(()) => true,
            Err(e) => {
                warn!(contact_id, key, error = %e, "Attribute write failed");
                false
            }
        }
    }

    async fn query_status(&self, contact_id: &str) -> ContactStatus {
        let url = self.contact_url(&format!("/{}", contact_id));

        let contact: DescribeContactResponse = match self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(response) => match response.json().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(contact_id, error = %e, "Describe response malformed");
                    return ContactStatus { active: true, state: None };
                }
            },
            Err(e) => {
                warn!(contact_id, error = %e, "Describe contact failed");
                return ContactStatus { active: true, state: None };
            }
        };

        if contact.disconnect_timestamp.is_some() {
            return ContactStatus {
                active: false,
                state: Some(contact.state.unwrap_or_else(|| "DISCONNECTED".to_string())),
            };
        }

        let active = contact
            .state
            .as_deref()
            .map(|s| !TERMINAL_STATES.contains(&s))
            .unwrap_or(true);

        ContactStatus {
            active,
            state: contact.state,
        }
    }

    async fn terminate(&self, contact_id: &str) -> bool {
        let url = self.contact_url(&format!("/{}/stop", contact_id));

        let result = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match result {
            Ok(_) => true,
            Err(e) => {
                warn!(contact_id, error = %e, "Stop contact failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> VoicePlatformConfig {
        VoicePlatformConfig {
            api_url: "https://voice.example.com/v1/".to_string(),
            api_token: "token".to_string(),
            instance_id: "inst-1".to_string(),
            flow_id: "flow-1".to_string(),
            source_number: "+15550000000".to_string(),
        }
    }

    #[test]
    fn test_contact_url_building() {
        let client = VoicePlatformClient::new(test_config());

        assert_eq!(
            client.contact_url(""),
            "https://voice.example.com/v1/instances/inst-1/contacts"
        );
        assert_eq!(
            client.contact_url("/abc/attributes"),
            "https://voice.example.com/v1/instances/inst-1/contacts/abc/attributes"
        );
    }
}
