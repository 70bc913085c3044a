//! OpenAI client: streaming chat completions and image generation.

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::chat::ChatMessage;
use shared::events::StreamChunk;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{api_error, ProviderError};

const PROVIDER: &str = "openai";
const BASE_URL: &str = "https://api.openai.com";

static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    quality: &'a str,
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StreamResponse {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: String,
}

// ── Client ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct OpenAiClient {
    http: Client,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured { provider: PROVIDER });
        }
        Ok(Self {
            http: SHARED_HTTP.clone(),
            api_key: api_key.to_string(),
        })
    }

    /// Stream a chat completion, forwarding each text delta as
    /// [`StreamChunk::Text`] and closing with [`StreamChunk::Done`].
    pub async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        model: &str,
        max_tokens: u32,
        temperature: f32,
        tx: &UnboundedSender<StreamChunk>,
    ) -> Result<(), ProviderError> {
        let url = format!("{}/v1/chat/completions", BASE_URL);
        let req = ChatRequest {
            model,
            messages,
            max_tokens,
            temperature,
            stream: Some(true),
        };
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        if !resp.status().is_success() {
            return Err(api_error(PROVIDER, resp).await);
        }

        let mut parser = crate::sse::SseParser::new();
        let mut stream = resp.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| ProviderError::transport(PROVIDER, e))?;
            for event in parser.feed(&bytes) {
                if event.data == "[DONE]" {
                    let _ = tx.send(StreamChunk::Done);
                    return Ok(());
                }
                // Unparseable events (comments, pings) are skipped.
                let Ok(resp) = serde_json::from_str::<StreamResponse>(&event.data) else {
                    tracing::debug!("skipping unparseable stream event: {}", event.data);
                    continue;
                };
                if let Some(choice) = resp.choices.first() {
                    if let Some(content) = &choice.delta.content {
                        if !content.is_empty() {
                            let _ = tx.send(StreamChunk::Text(content.clone()));
                        }
                    }
                    if choice.finish_reason.is_some() {
                        let _ = tx.send(StreamChunk::Done);
                        return Ok(());
                    }
                }
            }
        }

        let _ = tx.send(StreamChunk::Done);
        Ok(())
    }

    /// Generate `count` images, returning their result URLs in order. No
    /// partial results: the call blocks until the provider answers.
    pub async fn generate_image(
        &self,
        prompt: &str,
        model: &str,
        size: &str,
        quality: &str,
        count: u32,
    ) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/v1/images/generations", BASE_URL);
        let req = ImageRequest {
            model,
            prompt,
            n: count,
            size,
            quality,
        };
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        if !resp.status().is_success() {
            return Err(api_error(PROVIDER, resp).await);
        }
        let body: ImageResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::transport(PROVIDER, e))?;
        Ok(body.data.into_iter().map(|d| d.url).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_is_not_configured() {
        let err = OpenAiClient::new("  ").unwrap_err();
        assert!(matches!(
            err,
            ProviderError::NotConfigured { provider: "openai" }
        ));
    }

    #[test]
    fn test_chat_request_shape() {
        let messages = vec![ChatMessage::system("be terse"), ChatMessage::user("hi")];
        let req = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            max_tokens: 256,
            temperature: 0.5,
            stream: Some(true),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_stream_delta_parse() {
        let data = r#"{"choices":[{"delta":{"content":"Hel"},"finish_reason":null}]}"#;
        let resp: StreamResponse = serde_json::from_str(data).unwrap();
        assert_eq!(resp.choices[0].delta.content.as_deref(), Some("Hel"));
        assert!(resp.choices[0].finish_reason.is_none());
    }

    #[test]
    fn test_image_response_parse_preserves_order() {
        let data = r#"{"data":[{"url":"https://a"},{"url":"https://b"}]}"#;
        let resp: ImageResponse = serde_json::from_str(data).unwrap();
        let urls: Vec<String> = resp.data.into_iter().map(|d| d.url).collect();
        assert_eq!(urls, vec!["https://a", "https://b"]);
    }
}
