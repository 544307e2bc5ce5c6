//! Live progress feed for a pipeline run.
//!
//! Lets a caller forward run progress to a client (SSE, WebSocket) while
//! the run is going. Publishing is fire-and-forget: no subscribers, or
//! lagging ones, never slow down or fail the run.

use serde::Serialize;
use tokio::sync::broadcast;

/// Stage boundaries reported through [`ProgressEvent::StageCompleted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Traversal,
    Deduplication,
    SkipList,
    BannedWords,
    SemanticFilter,
    Details,
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    PageGathered {
        page: usize,
        found: usize,
        total: usize,
    },
    StageCompleted {
        stage: Stage,
        remaining: usize,
    },
    ItemExtracted {
        id: String,
        name: String,
        remaining: usize,
    },
    ItemFailed {
        id: String,
        reason: String,
    },
    RunAborted {
        reason: String,
    },
    RunCompleted {
        validated: usize,
        rejected: usize,
    },
}

impl ProgressEvent {
    /// JSON payload for forwarding to a client.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Broadcast handle for [`ProgressEvent`]s.
#[derive(Debug, Clone)]
pub struct ProgressFeed {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ProgressFeed {
    /// Create a feed with default capacity (256 events).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a feed with the given channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. No-op if no subscribers.
    pub fn publish(&self, event: ProgressEvent) {
        // Ignore send errors (no active receivers)
        let _ = self.sender.send(event);
    }
}

impl Default for ProgressFeed {
    fn default() -> Self {
        Self::new()
    }
}
