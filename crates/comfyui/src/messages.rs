//! ComfyUI WebSocket event types and parser.
//!
//! The engine sends JSON messages over WebSocket shaped as
//! `{"type": "<kind>", "data": {...}}`. This module deserializes the
//! kinds the progress monitor consumes into a typed [`EngineEvent`].
//! Unknown kinds parse to an error; callers log and skip them.

use serde::Deserialize;

/// Engine event stream messages relevant to job tracking.
///
/// Deserialized via the internally-tagged `"type"` field with
/// associated `"data"` content.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EngineEvent {
    /// Queue status broadcast; logged only.
    #[serde(rename = "status")]
    Status(serde_json::Value),

    /// A prompt has started executing.
    #[serde(rename = "execution_start")]
    ExecutionStart(ExecutionStartData),

    /// A node is executing. `node: None` means the prompt finished --
    /// this is the terminal success signal.
    #[serde(rename = "executing")]
    Executing(ExecutingData),

    /// Step-level progress inside a long-running node (the sampler).
    #[serde(rename = "progress")]
    Progress(ProgressData),

    /// Execution failed with an engine-reported error.
    #[serde(rename = "execution_error")]
    ExecutionError(ExecutionErrorData),
}

/// Payload for `execution_start` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionStartData {
    pub prompt_id: String,
}

/// Payload for `executing` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutingData {
    /// The node that started, or `None` when execution completed.
    pub node: Option<String>,
    pub prompt_id: String,
}

/// Payload for `progress` messages.
///
/// Older engine builds omit `prompt_id` here; the monitor drops such
/// frames rather than guess which in-flight job they belong to.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressData {
    /// Current step number.
    pub value: u32,
    /// Total number of steps.
    pub max: u32,
    #[serde(default)]
    pub prompt_id: Option<String>,
}

/// Payload for `execution_error` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionErrorData {
    pub prompt_id: String,
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub node_type: Option<String>,
    pub exception_message: String,
    #[serde(default)]
    pub exception_type: Option<String>,
}

impl ExecutionErrorData {
    /// One-line description carrying the engine-provided detail.
    pub fn detail(&self) -> String {
        match (&self.node_type, &self.exception_type) {
            (Some(node), Some(kind)) => {
                format!("{kind} in {node}: {}", self.exception_message)
            }
            (None, Some(kind)) => format!("{kind}: {}", self.exception_message),
            _ => self.exception_message.clone(),
        }
    }
}

/// Parse a WebSocket text frame into a typed event.
///
/// Returns `Err` for malformed JSON or message kinds the monitor does
/// not track (`executed`, `execution_cached`, preview frames, ...).
pub fn parse_event(text: &str) -> Result<EngineEvent, serde_json::Error> {
    serde_json::from_str(text)
}
