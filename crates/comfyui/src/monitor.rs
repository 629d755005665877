//! Per-job progress monitor over the engine's WebSocket event stream.
//!
//! Opened only after a successful submission, scoped to the submitting
//! client id, and driven to a terminal state by decoded events:
//!
//! ```text
//! Connecting -> Running -> { Succeeded, Failed }
//! ```
//!
//! Events are additionally correlated to the job's prompt id so that
//! concurrent jobs under the same client id cannot cross-talk. Progress
//! frames that carry no prompt id are dropped rather than misattributed.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::error::GenerateError;
use crate::messages::{parse_event, EngineEvent};

/// One step-progress sample forwarded to the caller's sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Current step number.
    pub value: u32,
    /// Total number of steps.
    pub max: u32,
}

/// Monitor lifecycle states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorState {
    Connecting,
    Running,
    Succeeded,
    Failed(String),
}

/// Effect of one decoded event on the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    /// Not for this job, or informational only.
    Ignore,
    /// Forward a progress sample; stay in `Running`.
    Progress(ProgressUpdate),
    /// Terminal success: the engine finished all nodes.
    Succeeded,
    /// Terminal failure carrying the engine-provided detail.
    Failed(String),
}

/// Decide what a single event means for the job identified by
/// `prompt_id`. Pure, so the whole state machine is testable without a
/// socket.
pub(crate) fn step(prompt_id: &str, event: &EngineEvent) -> Step {
    match event {
        EngineEvent::Progress(data) => match data.prompt_id.as_deref() {
            Some(id) if id == prompt_id => Step::Progress(ProgressUpdate {
                value: data.value,
                max: data.max,
            }),
            // Another job's progress, or an engine build that omits the
            // prompt id. Dropping beats misattributing.
            _ => Step::Ignore,
        },
        EngineEvent::Executing(data) => {
            if data.prompt_id != prompt_id {
                Step::Ignore
            } else if data.node.is_none() {
                Step::Succeeded
            } else {
                Step::Ignore
            }
        }
        EngineEvent::ExecutionError(data) => {
            if data.prompt_id == prompt_id {
                Step::Failed(data.detail())
            } else {
                Step::Ignore
            }
        }
        EngineEvent::ExecutionStart(_) | EngineEvent::Status(_) => Step::Ignore,
    }
}

/// Watch one job to completion.
///
/// Connects to `{ws_url}/ws?clientId={client_id}`, decodes events, and
/// blocks until the job reaches a terminal state, the stream fails, or
/// `timeout` expires. Progress samples are forwarded to `progress` when
/// a sink is provided; a dropped receiver does not fail the job.
pub async fn watch(
    ws_url: &str,
    client_id: &str,
    prompt_id: &str,
    progress: Option<mpsc::UnboundedSender<ProgressUpdate>>,
    timeout: Duration,
) -> Result<(), GenerateError> {
    let deadline = tokio::time::timeout(
        timeout,
        watch_inner(ws_url, client_id, prompt_id, progress),
    );

    match deadline.await {
        Ok(result) => result,
        Err(_) => Err(GenerateError::Timeout {
            prompt_id: prompt_id.to_string(),
            seconds: timeout.as_secs(),
        }),
    }
}

async fn watch_inner(
    ws_url: &str,
    client_id: &str,
    prompt_id: &str,
    progress: Option<mpsc::UnboundedSender<ProgressUpdate>>,
) -> Result<(), GenerateError> {
    let mut state = MonitorState::Connecting;
    let url = format!("{ws_url}/ws?clientId={client_id}");
    tracing::trace!(%prompt_id, ?state, "Opening event stream");

    let (mut ws_stream, _response) = connect_async(&url).await.map_err(|e| {
        GenerateError::Connection(format!("failed to connect to event stream at {ws_url}: {e}"))
    })?;

    state = MonitorState::Running;
    tracing::debug!(%prompt_id, %client_id, "Monitoring job events");

    while let Some(frame) = ws_stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                // Preview images; not tracked.
                continue;
            }
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
            Ok(Message::Close(frame)) => {
                tracing::warn!(%prompt_id, ?frame, "Event stream closed mid-job");
                return Err(GenerateError::Connection(
                    "event stream closed before the job completed".into(),
                ));
            }
            Err(e) => {
                return Err(GenerateError::Connection(format!(
                    "event stream receive error: {e}"
                )));
            }
        };

        let event = match parse_event(&text) {
            Ok(event) => event,
            Err(e) => {
                // The engine emits kinds we do not track; skip them.
                tracing::trace!(%prompt_id, error = %e, "Skipping unhandled event");
                continue;
            }
        };

        match step(prompt_id, &event) {
            Step::Ignore => {}
            Step::Progress(update) => {
                tracing::debug!(%prompt_id, value = update.value, max = update.max, "Progress");
                if let Some(ref sink) = progress {
                    // Receiver may have been dropped; progress is best-effort.
                    let _ = sink.send(update);
                }
            }
            Step::Succeeded => {
                tracing::info!(%prompt_id, "Job completed");
                return Ok(());
            }
            Step::Failed(detail) => {
                tracing::error!(%prompt_id, %detail, "Job failed");
                return Err(GenerateError::Execution(detail));
            }
        }
    }

    tracing::warn!(%prompt_id, ?state, "Event stream ended without a terminal event");
    Err(GenerateError::Connection(
        "event stream ended before the job completed".into(),
    ))
}
