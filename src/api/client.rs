//! Workflow API client
//!
//! One POST per message, authenticated with the profile's bearer token.
//! There is no retry: a failed call is reported to the caller immediately.

use super::types::{WorkflowRequest, WorkflowResponse, SUCCESS_PLACEHOLDER, WORKFLOW_RUN_PATH};
use crate::config::AppConfig;
use crate::error::SendError;
use crate::profiles::EndpointProfile;
use crate::{InboxError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, error, info};

/// Something that can deliver a note to a workflow and return its output
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send `text` using `profile`; the text is trimmed before sending
    async fn send(
        &self,
        text: &str,
        profile: &EndpointProfile,
    ) -> std::result::Result<String, SendError>;
}

/// HTTP client for the workflow-run endpoint
#[derive(Debug, Clone)]
pub struct WorkflowClient {
    http: reqwest::Client,
}

impl WorkflowClient {
    /// Create a client with explicit transport timeouts
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| InboxError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    /// Create a client using the configured timeouts
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.connect_timeout(), config.request_timeout())
    }
}

#[async_trait]
impl MessageSender for WorkflowClient {
    async fn send(
        &self,
        text: &str,
        profile: &EndpointProfile,
    ) -> std::result::Result<String, SendError> {
        let input = text.trim();
        if input.is_empty() {
            return Err(SendError::EmptyInput);
        }

        let url = endpoint_url(&profile.base_url);
        let request = WorkflowRequest::new(input, profile.workflow_id.clone());

        debug!(
            url = %url,
            profile = %profile.id,
            workflow_id = %profile.workflow_id,
            input_len = input.len(),
            "Sending workflow request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(&profile.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Workflow request failed: {}", e);
                SendError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("").to_string();
            error!(status = status.as_u16(), "Workflow endpoint returned error status");
            return Err(SendError::Http {
                status: status.as_u16(),
                reason,
            });
        }

        let body = response.text().await.map_err(|e| {
            error!("Failed to read workflow response: {}", e);
            SendError::Network(e.to_string())
        })?;

        // A 2xx with no body at all still counts as delivered
        if body.trim().is_empty() {
            info!("Workflow accepted message with empty response body");
            return Ok(SUCCESS_PLACEHOLDER.to_string());
        }

        let parsed: WorkflowResponse = serde_json::from_str(&body).map_err(|e| {
            error!("Workflow response is not valid JSON: {}", e);
            SendError::Protocol(e.to_string())
        })?;

        let outcome = interpret_response(parsed);
        match &outcome {
            Ok(output) => info!(output_len = output.len(), "Workflow request succeeded"),
            Err(e) => error!("Workflow reported an error: {}", e),
        }
        outcome
    }
}

/// Full URL of the workflow-run endpoint for a base URL
pub fn endpoint_url(base_url: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim().trim_end_matches('/'),
        WORKFLOW_RUN_PATH
    )
}

/// Map a decoded response body to the send outcome
pub fn interpret_response(response: WorkflowResponse) -> std::result::Result<String, SendError> {
    if let Some(error) = response.error {
        let code = error.code_text();
        return Err(SendError::Application {
            message: error
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "unknown error".to_string()),
            code,
        });
    }

    Ok(response
        .result
        .and_then(|r| r.output)
        .unwrap_or_else(|| SUCCESS_PLACEHOLDER.to_string()))
}
