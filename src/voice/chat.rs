//! Chat-completion client

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ChatConfig;
use crate::voice::{ChatCompleter, http_client, protocol_error};
use crate::{Error, Result};

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
}

#[derive(serde::Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(serde::Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Obtains replies from an OpenAI-compatible chat-completion endpoint
///
/// Works against the cloud provider or a local compatible server; the bearer
/// header is attached only when a credential is configured.
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl ChatClient {
    /// Create a new chat client
    ///
    /// # Errors
    ///
    /// Returns error if `use_auth` is set but no API key is available
    pub fn new(config: &ChatConfig, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let api_key = if config.use_auth {
            match api_key {
                Some(key) if !key.is_empty() => Some(key.to_string()),
                _ => {
                    return Err(Error::Config(
                        "API key required when chat auth is enabled".to_string(),
                    ));
                }
            }
        } else {
            None
        };

        Ok(Self {
            client: http_client(timeout)?,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl ChatCompleter for ChatClient {
    async fn complete(&self, text: &str) -> Result<String> {
        tracing::debug!(model = %self.model, "starting chat completion");

        let request = ChatRequest {
            model: &self.model,
            messages: vec![RequestMessage {
                role: "user",
                content: text,
            }],
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(error = %e, "chat request failed");
            Error::from_transport(&e)
        })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            return Err(protocol_error(response).await);
        }

        let result: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse chat response");
            Error::ResponseParse(e.to_string())
        })?;

        let reply = result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::ResponseParse("response contained no choices".to_string()))?;

        tracing::info!(reply = %reply, "chat completion complete");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_format() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![RequestMessage {
                role: "user",
                content: "hello",
            }],
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hello"}],
            })
        );
    }

    #[test]
    fn response_ignores_extra_fields() {
        let body = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 0,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "hi there"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 1, "completion_tokens": 2, "total_tokens": 3}
        }"#;

        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.choices[0].message.content, "hi there");
    }

    #[test]
    fn empty_choices_parse_to_empty_vec() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(response.choices.is_empty());
    }
}
