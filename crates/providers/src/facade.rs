//! Single entry point for every provider call the application makes.
//!
//! The façade holds only credentials; clients are constructed per call, which
//! keeps the type cheap to rebuild. The application wraps it in an `Arc` and
//! swaps the whole thing when settings change, so in-flight workers finish
//! against the credentials they started with.

use shared::chat::ChatMessage;
use shared::events::{StreamChunk, VideoHandle};
use shared::settings::{AppSettings, ChatProvider};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::ProviderError;
use crate::gemini::GeminiClient;
use crate::luma::LumaClient;
use crate::openai::OpenAiClient;

#[derive(Debug, Clone, Default)]
pub struct ProviderFacade {
    openai_api_key: String,
    gemini_api_key: String,
    luma_api_key: String,
}

impl ProviderFacade {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            openai_api_key: settings.openai_api_key.clone(),
            gemini_api_key: settings.gemini_api_key.clone(),
            luma_api_key: settings.luma_api_key.clone(),
        }
    }

    pub fn has_chat_key(&self, provider: ChatProvider) -> bool {
        match provider {
            ChatProvider::OpenAi => !self.openai_api_key.trim().is_empty(),
            ChatProvider::Gemini => !self.gemini_api_key.trim().is_empty(),
        }
    }

    pub fn has_luma_key(&self) -> bool {
        !self.luma_api_key.trim().is_empty()
    }

    /// Stream a chat completion through whichever provider is selected.
    pub async fn chat_stream(
        &self,
        provider: ChatProvider,
        model: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
        tx: &UnboundedSender<StreamChunk>,
    ) -> Result<(), ProviderError> {
        match provider {
            ChatProvider::OpenAi => {
                OpenAiClient::new(&self.openai_api_key)?
                    .chat_stream(messages, model, max_tokens, temperature, tx)
                    .await
            }
            ChatProvider::Gemini => {
                GeminiClient::new(&self.gemini_api_key)?
                    .chat_stream(messages, model, max_tokens, temperature, tx)
                    .await
            }
        }
    }

    /// Buffered completion: stream internally and return the full text once
    /// the provider finishes. Used where per-token updates add nothing, such
    /// as alternating AI-to-AI turns.
    pub async fn chat(
        &self,
        provider: ChatProvider,
        model: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, ProviderError> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        self.chat_stream(provider, model, messages, max_tokens, temperature, &tx)
            .await?;
        drop(tx);

        let mut full = String::new();
        while let Some(chunk) = rx.recv().await {
            match chunk {
                StreamChunk::Text(delta) => full.push_str(&delta),
                StreamChunk::Done => break,
            }
        }
        Ok(full)
    }

    pub async fn generate_image(
        &self,
        prompt: &str,
        model: &str,
        size: &str,
        quality: &str,
        count: u32,
    ) -> Result<Vec<String>, ProviderError> {
        OpenAiClient::new(&self.openai_api_key)?
            .generate_image(prompt, model, size, quality, count)
            .await
    }

    pub async fn generate_video(
        &self,
        prompt: &str,
        aspect_ratio: &str,
        looping: bool,
    ) -> VideoHandle {
        match LumaClient::new(&self.luma_api_key) {
            Ok(client) => client.generate_video(prompt, aspect_ratio, looping).await,
            Err(e) => VideoHandle::failed("", e.to_string()),
        }
    }

    pub async fn poll_video_status(&self, id: &str) -> VideoHandle {
        match LumaClient::new(&self.luma_api_key) {
            Ok(client) => client.poll_status(id).await,
            Err(e) => VideoHandle::failed(id, e.to_string()),
        }
    }

    pub async fn wait_for_video_completion(
        &self,
        id: &str,
        timeout: Duration,
        poll_interval: Duration,
        on_poll: impl FnMut(&VideoHandle),
    ) -> VideoHandle {
        match LumaClient::new(&self.luma_api_key) {
            Ok(client) => {
                client
                    .wait_for_completion(id, timeout, poll_interval, on_poll)
                    .await
            }
            Err(e) => VideoHandle::failed(id, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_keys(openai: &str, gemini: &str, luma: &str) -> AppSettings {
        AppSettings {
            openai_api_key: openai.to_string(),
            gemini_api_key: gemini.to_string(),
            luma_api_key: luma.to_string(),
            ..AppSettings::default()
        }
    }

    #[test]
    fn test_key_presence_per_provider() {
        let facade = ProviderFacade::from_settings(&settings_with_keys("sk-x", "", ""));
        assert!(facade.has_chat_key(ChatProvider::OpenAi));
        assert!(!facade.has_chat_key(ChatProvider::Gemini));
        assert!(!facade.has_luma_key());
    }

    #[test]
    fn test_whitespace_key_counts_as_missing() {
        let facade = ProviderFacade::from_settings(&settings_with_keys("   ", "g", " "));
        assert!(!facade.has_chat_key(ChatProvider::OpenAi));
        assert!(facade.has_chat_key(ChatProvider::Gemini));
    }

    #[tokio::test]
    async fn test_video_without_key_fails_soft() {
        let facade = ProviderFacade::default();
        let handle = facade.generate_video("a storm", "16:9", false).await;
        assert_eq!(handle.status, shared::events::GenerationStatus::Failed);
        assert!(handle.error.as_deref().unwrap().contains("luma"));
    }

    #[tokio::test]
    async fn test_chat_without_key_is_not_configured() {
        let facade = ProviderFacade::default();
        let err = facade
            .chat(ChatProvider::OpenAi, "gpt-4o-mini", &[], 10, 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured { .. }));
    }
}
