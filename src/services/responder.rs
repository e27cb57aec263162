//! Fallback responder service implementation
//!
//! When the dialogue manager cannot classify a message with its pattern
//! grammar, the tail of the conversation is sent to a chat-completions style
//! endpoint together with a grounding snapshot of upcoming bookings and the
//! house rules. The reply is surfaced verbatim. This path is best-effort
//! only and never mutates booking state; every failure degrades to a static
//! apology at the call site.

use std::time::Duration;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::settings::Settings;
use crate::state::transcript::{TranscriptEntry, TranscriptRole};
use crate::utils::errors::{ResponderError, Result};

#[derive(Debug, Clone, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<CompletionMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CompletionMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

/// Generative responder for the dialogue fallback path
#[derive(Clone)]
pub struct FallbackResponder {
    client: Client,
    settings: Settings,
}

impl FallbackResponder {
    pub fn new(settings: Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.responder.timeout_seconds))
            .user_agent("PitchBuddy-Bot/1.0")
            .build()
            .map_err(|e| ResponderError::RequestFailed(e.to_string()))?;

        Ok(Self { client, settings })
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.responder.enabled
    }

    /// Complete the conversation tail against the configured endpoint.
    pub async fn complete(
        &self,
        conversation_tail: &[TranscriptEntry],
        grounding_context: &str,
    ) -> Result<String> {
        let mut messages = vec![CompletionMessage {
            role: "system".to_string(),
            content: grounding_context.to_string(),
        }];

        for entry in conversation_tail {
            messages.push(CompletionMessage {
                role: match entry.role {
                    TranscriptRole::User => "user".to_string(),
                    TranscriptRole::Assistant => "assistant".to_string(),
                },
                content: entry.text.clone(),
            });
        }

        let request = CompletionRequest {
            model: self.settings.responder.model.clone(),
            messages,
        };

        debug!(model = %request.model, tail_len = conversation_tail.len(), "Sending fallback completion request");

        let response = self
            .client
            .post(&self.settings.responder.api_url)
            .bearer_auth(&self.settings.responder.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ResponderError::Timeout
                } else if e.is_connect() {
                    ResponderError::ServiceUnavailable
                } else {
                    ResponderError::RequestFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, "Fallback responder returned an error status");
            return Err(ResponderError::RequestFailed(format!(
                "HTTP {}: {}",
                status, error_text
            ))
            .into());
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ResponderError::InvalidResponse(e.to_string()))?;

        let reply = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ResponderError::InvalidResponse("no choices in reply".to_string()))?;

        Ok(reply)
    }
}

impl std::fmt::Debug for FallbackResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackResponder")
            .field("enabled", &self.settings.responder.enabled)
            .field("model", &self.settings.responder.model)
            .finish_non_exhaustive()
    }
}
