use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::debug;
use trinho_core::{CompletionError, CompletionRequest};

use crate::gateway::CompletionTransport;
use crate::pool::Credential;

/// HTTP transport for any OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiTransport {
    client: Client,
    base_url: String,
}

impl OpenAiTransport {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn transport_error(err: &reqwest::Error) -> CompletionError {
    match err.status() {
        Some(status) => CompletionError::from_status(status.as_u16(), err.to_string()),
        None => CompletionError::Transport(err.to_string()),
    }
}

#[async_trait]
impl CompletionTransport for OpenAiTransport {
    async fn send(
        &self,
        credential: &Credential,
        request: &CompletionRequest,
    ) -> Result<String, CompletionError> {
        let body = json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "top_p": request.top_p,
            "stream": request.stream,
        });

        debug!(
            "Sending completion request: model={}, messages={}, credential={}",
            request.model,
            request.messages.len(),
            credential
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(credential.secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CompletionError::from_status(status.as_u16(), text));
        }

        let payload = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        if let Some(message) = payload["error"]["message"].as_str() {
            return Err(CompletionError::from_status(
                status.as_u16(),
                message.to_string(),
            ));
        }

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| CompletionError::InvalidResponse("missing content".to_string()))?
            .to_string();

        Ok(content)
    }
}
