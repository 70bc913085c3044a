//! Event types flowing from background workers back to the UI thread.
//!
//! Each user-initiated operation gets one `std::sync::mpsc` channel carrying
//! one of these enums; the UI polls with `try_recv` every frame. Provider
//! clients additionally emit low-level [`StreamChunk`]s over a tokio channel
//! inside the worker, which the worker folds into cumulative fragments.

use serde::{Deserialize, Serialize};

/// One incremental piece of a streaming chat response, as emitted by a
/// provider client.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    /// A text delta. Workers accumulate these; the UI never sees deltas.
    Text(String),
    /// The provider signalled end of stream.
    Done,
}

/// Lifecycle of one streaming chat request (single chat, one compare side).
///
/// `Fragment` carries the cumulative text so far, not a delta: the renderer
/// replaces the trailing assistant bubble wholesale on every event. The final
/// `Completed` value always equals the last `Fragment` value.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Fragment(String),
    Completed(String),
    Failed(String),
}

/// One finished persona turn in an AI duet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuetTurn {
    pub speaker: String,
    pub content: String,
    /// True when the second persona spoke (controls bubble alignment).
    pub second_persona: bool,
}

/// Lifecycle of an AI duet run. Turns are buffered, never streamed.
#[derive(Debug, Clone)]
pub enum DuetEvent {
    Turn(DuetTurn),
    Finished,
    Failed(String),
}

/// Result of one background image generation.
#[derive(Debug, Clone)]
pub enum ImageEvent {
    Generated {
        prompt: String,
        url: String,
        /// Raw bytes already fetched from the result URL, decoded on the UI
        /// thread into a texture.
        bytes: Vec<u8>,
    },
    Failed(String),
}

/// Status of an asynchronous generation job, polled rather than pushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl GenerationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, GenerationStatus::Completed | GenerationStatus::Failed)
    }

    pub fn label(self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Processing => "processing",
            GenerationStatus::Completed => "completed",
            GenerationStatus::Failed => "failed",
        }
    }
}

/// Identifier + status + optional result for an asynchronous video job.
#[derive(Debug, Clone)]
pub struct VideoHandle {
    pub id: String,
    pub status: GenerationStatus,
    pub url: Option<String>,
    pub error: Option<String>,
}

impl VideoHandle {
    pub fn pending(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: GenerationStatus::Pending,
            url: None,
            error: None,
        }
    }

    pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: GenerationStatus::Failed,
            url: None,
            error: Some(error.into()),
        }
    }
}

/// Lifecycle of one video generation, from submission through the poll loop.
#[derive(Debug, Clone)]
pub enum VideoEvent {
    /// The provider accepted the job and assigned an id.
    Accepted { id: String },
    /// One poll observation; emitted after every status check.
    Status { id: String, status: GenerationStatus },
    Ready { id: String, url: String },
    Failed { id: String, error: String },
}

/// Result of a release check against the update endpoint.
#[derive(Debug, Clone)]
pub enum UpdateEvent {
    UpToDate,
    Available {
        version: String,
        notes: String,
        url: String,
    },
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(GenerationStatus::Completed.is_terminal());
        assert!(GenerationStatus::Failed.is_terminal());
        assert!(!GenerationStatus::Pending.is_terminal());
        assert!(!GenerationStatus::Processing.is_terminal());
    }

    #[test]
    fn test_failed_handle_carries_error() {
        let handle = VideoHandle::failed("gen-1", "boom");
        assert_eq!(handle.status, GenerationStatus::Failed);
        assert_eq!(handle.error.as_deref(), Some("boom"));
        assert!(handle.url.is_none());
    }
}
