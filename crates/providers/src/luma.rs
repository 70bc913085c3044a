//! Luma Dream Machine client for video generation.
//!
//! Video jobs are asynchronous on the provider side: a creation call returns
//! a generation id, and the job is then polled until it reaches a terminal
//! state. Unlike the chat clients, the polling helpers never return `Err`;
//! failures are folded into a failed [`VideoHandle`] so the caller always has
//! a job state to show.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::events::{GenerationStatus, VideoHandle};
use std::sync::LazyLock;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{api_error, ProviderError};

const PROVIDER: &str = "luma";
const BASE_URL: &str = "https://api.lumalabs.ai/dream-machine/v1";

static SHARED_HTTP: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .pool_max_idle_per_host(2)
        .build()
        .expect("failed to build HTTP client")
});

#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    prompt: &'a str,
    aspect_ratio: &'a str,
    #[serde(rename = "loop")]
    looping: bool,
}

#[derive(Debug, Deserialize)]
struct Generation {
    id: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    failure_reason: Option<String>,
    #[serde(default)]
    assets: Option<Assets>,
}

#[derive(Debug, Deserialize)]
struct Assets {
    #[serde(default)]
    video: Option<String>,
}

fn map_state(state: &str) -> GenerationStatus {
    match state {
        "queued" => GenerationStatus::Pending,
        "dreaming" => GenerationStatus::Processing,
        "completed" => GenerationStatus::Completed,
        _ => GenerationStatus::Failed,
    }
}

fn handle_from(generation: Generation) -> VideoHandle {
    let status = map_state(&generation.state);
    VideoHandle {
        id: generation.id,
        status,
        url: generation.assets.and_then(|a| a.video),
        error: generation.failure_reason,
    }
}

pub struct LumaClient {
    http: Client,
    api_key: String,
}

impl LumaClient {
    pub fn new(api_key: &str) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured { provider: PROVIDER });
        }
        Ok(Self {
            http: SHARED_HTTP.clone(),
            api_key: api_key.to_string(),
        })
    }

    /// Submit a video job. Errors come back as a failed handle with an empty
    /// id rather than `Err`, so the page can render them like any other
    /// terminal job state.
    pub async fn generate_video(&self, prompt: &str, aspect_ratio: &str, looping: bool) -> VideoHandle {
        let url = format!("{}/generations", BASE_URL);
        let req = CreateRequest {
            prompt,
            aspect_ratio,
            looping,
        };
        let resp = match self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                return VideoHandle::failed("", ProviderError::transport(PROVIDER, e).to_string())
            }
        };
        if !resp.status().is_success() {
            return VideoHandle::failed("", api_error(PROVIDER, resp).await.to_string());
        }
        match resp.json::<Generation>().await {
            Ok(generation) => handle_from(generation),
            Err(e) => VideoHandle::failed("", ProviderError::transport(PROVIDER, e).to_string()),
        }
    }

    /// Fetch the current state of a job.
    pub async fn poll_status(&self, id: &str) -> VideoHandle {
        let url = format!("{}/generations/{}", BASE_URL, id);
        let resp = match self.http.get(&url).bearer_auth(&self.api_key).send().await {
            Ok(resp) => resp,
            Err(e) => {
                return VideoHandle::failed(id, ProviderError::transport(PROVIDER, e).to_string())
            }
        };
        if !resp.status().is_success() {
            return VideoHandle::failed(id, api_error(PROVIDER, resp).await.to_string());
        }
        match resp.json::<Generation>().await {
            Ok(generation) => handle_from(generation),
            Err(e) => VideoHandle::failed(id, ProviderError::transport(PROVIDER, e).to_string()),
        }
    }

    /// Poll until the job reaches a terminal state or `timeout` elapses.
    /// `on_poll` fires after every status fetch so progress can be surfaced.
    pub async fn wait_for_completion(
        &self,
        id: &str,
        timeout: Duration,
        poll_interval: Duration,
        mut on_poll: impl FnMut(&VideoHandle),
    ) -> VideoHandle {
        let deadline = Instant::now() + timeout;
        loop {
            let handle = self.poll_status(id).await;
            on_poll(&handle);
            if handle.status.is_terminal() {
                return handle;
            }
            if Instant::now() + poll_interval > deadline {
                return VideoHandle::failed(
                    id,
                    format!("timed out after {}s", timeout.as_secs()),
                );
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_mapping() {
        assert_eq!(map_state("queued"), GenerationStatus::Pending);
        assert_eq!(map_state("dreaming"), GenerationStatus::Processing);
        assert_eq!(map_state("completed"), GenerationStatus::Completed);
        assert_eq!(map_state("failed"), GenerationStatus::Failed);
        assert_eq!(map_state("???"), GenerationStatus::Failed);
    }

    #[test]
    fn test_completed_generation_yields_url() {
        let data = r#"{"id":"gen-1","state":"completed","assets":{"video":"https://v/1.mp4"}}"#;
        let generation: Generation = serde_json::from_str(data).unwrap();
        let handle = handle_from(generation);
        assert_eq!(handle.id, "gen-1");
        assert_eq!(handle.status, GenerationStatus::Completed);
        assert_eq!(handle.url.as_deref(), Some("https://v/1.mp4"));
        assert!(handle.error.is_none());
    }

    #[test]
    fn test_failed_generation_carries_reason() {
        let data = r#"{"id":"gen-2","state":"failed","failure_reason":"nsfw prompt"}"#;
        let generation: Generation = serde_json::from_str(data).unwrap();
        let handle = handle_from(generation);
        assert_eq!(handle.status, GenerationStatus::Failed);
        assert_eq!(handle.error.as_deref(), Some("nsfw prompt"));
    }

    #[test]
    fn test_queued_generation_is_pending() {
        let data = r#"{"id":"gen-3","state":"queued"}"#;
        let generation: Generation = serde_json::from_str(data).unwrap();
        let handle = handle_from(generation);
        assert_eq!(handle.status, GenerationStatus::Pending);
        assert!(!handle.status.is_terminal());
    }

    #[test]
    fn test_create_request_shape() {
        let req = CreateRequest {
            prompt: "a koi pond",
            aspect_ratio: "16:9",
            looping: false,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["prompt"], "a koi pond");
        assert_eq!(json["aspect_ratio"], "16:9");
        assert_eq!(json["loop"], false);
    }

    #[test]
    fn test_create_request_loop_flag() {
        let req = CreateRequest {
            prompt: "a koi pond",
            aspect_ratio: "1:1",
            looping: true,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["loop"], true);
    }
}
