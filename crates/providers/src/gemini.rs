//! Gemini client over the `generateContent` streaming API.
//!
//! Gemini has no flat message list: system prompts travel in a separate
//! `systemInstruction` block and assistant turns use the `model` role, so the
//! request is reshaped from our [`ChatMessage`] history before sending.

use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::chat::ChatMessage;
use shared::events::StreamChunk;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{api_error, ProviderError};

const PROVIDER: &str = "gemini";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Serialize, PartialEq)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

// ── Response types ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

/// Reshape a flat chat history into the Gemini request body. System messages
/// are pulled out into `systemInstruction` (joined when there are several);
/// assistant turns become the `model` role.
fn build_request(messages: &[ChatMessage], max_tokens: u32, temperature: f32) -> GenerateRequest {
    let mut system_parts: Vec<&str> = Vec::new();
    let mut contents = Vec::new();

    for msg in messages {
        match msg.role.as_str() {
            "system" => system_parts.push(&msg.content),
            role => {
                let role = if role == "assistant" { "model" } else { "user" };
                contents.push(Content {
                    role: Some(role.to_string()),
                    parts: vec![Part {
                        text: msg.content.clone(),
                    }],
                });
            }
        }
    }

    let system_instruction = (!system_parts.is_empty()).then(|| Content {
        role: None,
        parts: vec![Part {
            text: system_parts.join("\n\n"),
        }],
    });

    GenerateRequest {
        contents,
        system_instruction,
        generation_config: GenerationConfig {
            max_output_tokens: max_tokens,
            temperature,
        },
    }
}

// ── Client ───────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured { provider: PROVIDER });
        }
        Ok(Self {
            http: SHARED_HTTP.clone(),
            api_key: api_key.to_string(),
        })
    }

    /// Stream a completion; deltas arrive as [`StreamChunk::Text`] and the
    /// channel closes with [`StreamChunk::Done`] when the body ends.
    pub async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        model: &str,
        max_tokens: u32,
        temperature: f32,
        tx: &UnboundedSender<StreamChunk>,
    ) -> Result<(), ProviderError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            BASE_URL, model, self.api_key
        );
        let req = build_request(messages, max_tokens, temperature);
        let resp = self
            .http
            .post(&url)
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
                let Ok(resp) = serde_json::from_str::<StreamResponse>(&event.data) else {
                    tracing::debug!("skipping unparseable stream event: {}", event.data);
                    continue;
                };
                for candidate in &resp.candidates {
                    let Some(content) = &candidate.content else {
                        continue;
                    };
                    for part in &content.parts {
                        if !part.text.is_empty() {
                            let _ = tx.send(StreamChunk::Text(part.text.clone()));
                        }
                    }
                }
            }
        }

        // Gemini signals completion by closing the stream, not with a marker.
        let _ = tx.send(StreamChunk::Done);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_is_not_configured() {
        assert!(matches!(
            GeminiClient::new("").unwrap_err(),
            ProviderError::NotConfigured { provider: "gemini" }
        ));
    }

    #[test]
    fn test_system_messages_become_instruction() {
        let messages = vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("hello"),
            ChatMessage::assistant("hi"),
            ChatMessage::user("bye"),
        ];
        let req = build_request(&messages, 100, 0.7);

        let instruction = req.system_instruction.expect("instruction");
        assert_eq!(instruction.parts[0].text, "be brief");

        assert_eq!(req.contents.len(), 3);
        assert_eq!(req.contents[0].role.as_deref(), Some("user"));
        assert_eq!(req.contents[1].role.as_deref(), Some("model"));
        assert_eq!(req.contents[1].parts[0].text, "hi");
        assert_eq!(req.contents[2].role.as_deref(), Some("user"));
    }

    #[test]
    fn test_multiple_system_messages_joined() {
        let messages = vec![
            ChatMessage::system("one"),
            ChatMessage::system("two"),
            ChatMessage::user("go"),
        ];
        let req = build_request(&messages, 50, 0.0);
        assert_eq!(req.system_instruction.unwrap().parts[0].text, "one\n\ntwo");
    }

    #[test]
    fn test_no_system_message_omits_instruction() {
        let messages = vec![ChatMessage::user("hello")];
        let req = build_request(&messages, 50, 0.0);
        assert!(req.system_instruction.is_none());
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("systemInstruction").is_none());
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 50);
    }

    #[test]
    fn test_stream_response_parse() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"Hel"},{"text":"lo"}]}}]}"#;
        let resp: StreamResponse = serde_json::from_str(data).unwrap();
        let texts: Vec<&str> = resp.candidates[0]
            .content
            .as_ref()
            .unwrap()
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(texts, vec!["Hel", "lo"]);
    }
}
