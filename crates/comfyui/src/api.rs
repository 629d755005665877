//! REST client for the ComfyUI HTTP endpoints.
//!
//! Wraps the engine surface the orchestrator consumes: reachability
//! probe, node-type catalog, workflow submission, execution history,
//! and artifact download.

use std::time::Duration;

use serde::Deserialize;

use crate::history::ArtifactRef;
use crate::workflow::Workflow;

/// Bound on the `/system_stats` reachability probe.
const REACHABLE_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for a single ComfyUI instance.
pub struct ComfyApi {
    client: reqwest::Client,
    base_url: String,
}

/// Errors from the ComfyUI REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ComfyApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The engine returned a non-2xx status code.
    #[error("ComfyUI API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The engine answered `/prompt` with an error payload instead of a
    /// job id (unknown node type, malformed wiring, ...).
    #[error("Workflow rejected: {0}")]
    Rejected(String),
}

/// The two shapes `/prompt` can answer with: a queued job id, or an
/// explicit error object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SubmitOutcome {
    Queued {
        prompt_id: String,
    },
    Rejected {
        error: serde_json::Value,
        #[serde(default)]
        node_errors: serde_json::Value,
    },
}

impl ComfyApi {
    /// Create a new API client.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `http://host:8188`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (connection pooling across collaborators).
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Base HTTP URL of the instance.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Probe whether the engine is up.
    ///
    /// Sends `GET /system_stats` with a 5-second bound. Returns `false`
    /// on any network failure or non-success status; never errors.
    pub async fn check_reachable(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/system_stats", self.base_url))
            .timeout(REACHABLE_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, url = %self.base_url, "Reachability probe failed");
                false
            }
        }
    }

    /// Fetch the full node-type catalog.
    ///
    /// Sends `GET /object_info`. The response maps node type name to its
    /// schema; callers only use the key set for membership tests.
    pub async fn object_info(&self) -> Result<serde_json::Value, ComfyApiError> {
        let response = self
            .client
            .get(format!("{}/object_info", self.base_url))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Submit a workflow for execution.
    ///
    /// Sends `POST /prompt` with the workflow graph and the caller's
    /// client id. Returns the server-assigned prompt id, or
    /// [`ComfyApiError::Rejected`] when the response carries an explicit
    /// error field instead.
    pub async fn submit_workflow(
        &self,
        workflow: &Workflow,
        client_id: &str,
    ) -> Result<String, ComfyApiError> {
        let body = serde_json::json!({
            "prompt": workflow,
            "client_id": client_id,
        });

        let response = self
            .client
            .post(format!("{}/prompt", self.base_url))
            .json(&body)
            .send()
            .await?;

        // Rejections can come back as 400 with an error body; fold them
        // into Rejected rather than a bare status error.
        let status = response.status();
        let text = response.text().await?;

        match serde_json::from_str::<SubmitOutcome>(&text) {
            Ok(SubmitOutcome::Queued { prompt_id }) => Ok(prompt_id),
            Ok(SubmitOutcome::Rejected { error, node_errors }) => {
                tracing::warn!(%error, %node_errors, "ComfyUI rejected workflow");
                Err(ComfyApiError::Rejected(error.to_string()))
            }
            Err(_) => Err(ComfyApiError::Api {
                status: status.as_u16(),
                body: text,
            }),
        }
    }

    /// Retrieve execution history for a specific prompt.
    ///
    /// Sends `GET /history/{prompt_id}`. The returned JSON is keyed by
    /// prompt id and contains recorded node outputs once execution has
    /// been persisted.
    pub async fn history(&self, prompt_id: &str) -> Result<serde_json::Value, ComfyApiError> {
        let response = self
            .client
            .get(format!("{}/history/{}", self.base_url, prompt_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download the raw bytes of a produced artifact.
    ///
    /// Sends `GET /view?filename&subfolder&type`.
    pub async fn view(&self, artifact: &ArtifactRef) -> Result<Vec<u8>, ComfyApiError> {
        let response = self
            .client
            .get(format!("{}/view", self.base_url))
            .query(&[
                ("filename", artifact.filename.as_str()),
                ("subfolder", artifact.subfolder.as_str()),
                ("type", artifact.kind.as_str()),
            ])
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ComfyApiError::Api`] with
    /// the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ComfyApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComfyApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ComfyApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_outcome_parses_queued() {
        let json = r#"{"prompt_id":"abc-123","number":4}"#;
        match serde_json::from_str::<SubmitOutcome>(json).unwrap() {
            SubmitOutcome::Queued { prompt_id } => assert_eq!(prompt_id, "abc-123"),
            other => panic!("Expected Queued, got {other:?}"),
        }
    }

    #[test]
    fn submit_outcome_parses_rejection() {
        let json = r#"{"error":{"type":"invalid_prompt","message":"Cannot execute"},"node_errors":{}}"#;
        match serde_json::from_str::<SubmitOutcome>(json).unwrap() {
            SubmitOutcome::Rejected { error, .. } => {
                assert_eq!(error["type"], "invalid_prompt");
            }
            other => panic!("Expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn submit_outcome_rejection_without_node_errors() {
        let json = r#"{"error":"unknown node type"}"#;
        assert!(matches!(
            serde_json::from_str::<SubmitOutcome>(json).unwrap(),
            SubmitOutcome::Rejected { .. }
        ));
    }
}
