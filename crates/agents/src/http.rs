//! HTTP-backed capability agent.
//!
//! Posts `{action, message, history, state}` to the agent's endpoint and
//! expects `{output, visibility, estimated_tokens}` back. Any transport
//! or protocol problem maps onto `AgentError` — the scheduler recovers
//! all of them into failed step outcomes.

use async_trait::async_trait;
use brainstem_core::{AgentError, AgentInput, AgentOutput, CapabilityAgent, Visibility};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A remote capability agent reached over HTTP.
pub struct HttpAgent {
    name: String,
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpAgent {
    /// Create a new HTTP agent.
    ///
    /// `timeout_ms` bounds the underlying HTTP client; the scheduler
    /// applies its own per-step timeout on top.
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout_ms: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }
}

/// Wire format of an invocation request.
#[derive(Serialize)]
struct InvokeRequest<'a> {
    action: &'a str,
    message: &'a str,
    history: &'a [brainstem_core::ConversationTurn],
    state: &'a serde_json::Value,
}

/// Wire format of an invocation response.
#[derive(Deserialize)]
struct InvokeResponse {
    output: String,
    #[serde(default = "default_visibility")]
    visibility: Visibility,
    #[serde(default)]
    estimated_tokens: u32,
}

fn default_visibility() -> Visibility {
    Visibility::Public
}

#[async_trait]
impl CapabilityAgent for HttpAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        action: &str,
        input: &AgentInput,
    ) -> std::result::Result<AgentOutput, AgentError> {
        let url = format!("{}/invoke", self.endpoint);
        let body = InvokeRequest {
            action,
            message: &input.message,
            history: &input.history,
            state: &input.state,
        };

        debug!(agent = %self.name, action, "Invoking capability agent");

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AgentError::Timeout {
                    agent: self.name.clone(),
                    timeout_ms: 0,
                }
            } else {
                AgentError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(agent = %self.name, status, body = %error_body, "Agent returned error");
            return Err(AgentError::Api {
                status_code: status,
                message: error_body,
            });
        }

        let parsed: InvokeResponse = response
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(e.to_string()))?;

        Ok(AgentOutput {
            content: parsed.output,
            visibility: parsed.visibility,
            estimated_tokens: parsed.estimated_tokens,
        })
    }

    async fn health_check(&self) -> std::result::Result<bool, AgentError> {
        let url = format!("{}/health", self.endpoint);
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => Err(AgentError::Network(e.to_string())),
        }
    }
}
