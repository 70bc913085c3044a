//! Provider error taxonomy.
//!
//! Three failure classes, checked in this order: missing credentials (caught
//! before any network call), transport failures, and semantic errors the
//! provider reports over a successful connection.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The required API key is empty; surfaced without touching the network.
    #[error("{provider} API key not configured")]
    NotConfigured { provider: &'static str },

    /// Network failure, timeout, or a broken response body.
    #[error("request to {provider} failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    /// Non-success HTTP status with whatever detail the provider returned.
    #[error("{provider} error: {status}: {detail}")]
    Api {
        provider: &'static str,
        status: StatusCode,
        detail: String,
    },
}

impl ProviderError {
    pub fn transport(provider: &'static str, err: impl std::fmt::Display) -> Self {
        ProviderError::Transport {
            provider,
            message: err.to_string(),
        }
    }
}

/// Consume a non-success response into an [`ProviderError::Api`], keeping at
/// most 800 characters of body detail.
pub(crate) async fn api_error(provider: &'static str, resp: reqwest::Response) -> ProviderError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let detail: String = body.trim().chars().take(800).collect();
    ProviderError::Api {
        provider,
        status,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_configured_names_provider() {
        let err = ProviderError::NotConfigured { provider: "openai" };
        assert_eq!(err.to_string(), "openai API key not configured");
    }

    #[test]
    fn test_api_error_display_includes_detail() {
        let err = ProviderError::Api {
            provider: "luma",
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: "prompt too long".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("luma"));
        assert!(text.contains("422"));
        assert!(text.contains("prompt too long"));
    }
}
