//! Generation failure taxonomy.
//!
//! The variants map one-to-one onto how the orchestrator reacts:
//! [`Submission`](GenerateError::Submission) is absorbed by the fallback
//! cascade until it is exhausted; everything after a job has been
//! accepted ([`Execution`](GenerateError::Execution) onward) surfaces
//! directly -- a committed job is never resubmitted.

/// Errors produced by [`crate::generator::Generator::generate`].
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The engine did not answer the health probe.
    #[error("ComfyUI is not reachable at {url}")]
    Unreachable { url: String },

    /// The engine rejected the workflow, or the submission request
    /// failed at the transport level.
    #[error("Workflow submission failed: {0}")]
    Submission(String),

    /// The engine reported a failure while the job was running.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// The job signalled success but its history entry or artifact
    /// could not be found.
    #[error("Result missing: {0}")]
    ResultMissing(String),

    /// The event stream failed after the job was accepted. The job's
    /// outcome is unknown; it is not retried.
    #[error("Event stream error: {0}")]
    Connection(String),

    /// The monitor deadline expired before a terminal event arrived.
    /// The job may still be running on the engine.
    #[error("Timed out after {seconds}s waiting for job {prompt_id}")]
    Timeout { prompt_id: String, seconds: u64 },
}
