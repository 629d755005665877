//! Generation orchestrator: capability probe → variant build → cascade
//! submit → monitor → artifact fetch.
//!
//! [`Generator`] is constructed once at the composition root and shared
//! (behind `Arc`) by every request handler. Each [`generate`] call runs
//! one logical pipeline; concurrent calls share only the read-mostly
//! capability cache and the instance-wide client id. Events are
//! correlated per job, so concurrent jobs do not cross-talk.
//!
//! [`generate`]: Generator::generate

use std::time::Duration;

use tokio::sync::mpsc;

use fluxgen_core::generation::{GenerationMetadata, GenerationParams};

use crate::api::{ComfyApi, ComfyApiError};
use crate::capabilities::CapabilityProbe;
use crate::error::GenerateError;
use crate::history::extract_artifact;
use crate::monitor::{self, ProgressUpdate};
use crate::workflow::{self, fallback_plan, WorkflowVariant};

/// Default bound on the wait for a terminal event.
pub const DEFAULT_MONITOR_TIMEOUT: Duration = Duration::from_secs(600);

/// Connection settings for one ComfyUI instance.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Base HTTP URL, e.g. `http://127.0.0.1:8188`.
    pub api_url: String,
    /// WebSocket base URL, e.g. `ws://127.0.0.1:8188`.
    pub ws_url: String,
    /// Upper bound on the event-stream wait per job.
    pub monitor_timeout: Duration,
}

impl GeneratorConfig {
    /// Config for an engine on the conventional local port.
    pub fn local() -> Self {
        Self {
            api_url: "http://127.0.0.1:8188".into(),
            ws_url: "ws://127.0.0.1:8188".into(),
            monitor_timeout: DEFAULT_MONITOR_TIMEOUT,
        }
    }
}

/// Identifies one accepted job on the engine.
#[derive(Debug, Clone)]
pub struct JobHandle {
    /// Server-assigned job id.
    pub prompt_id: String,
    /// The orchestrator-instance client id the job was submitted under.
    pub client_id: String,
}

/// The produced image plus the parameter echo.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub bytes: Vec<u8>,
    pub metadata: GenerationMetadata,
    /// Which graph variant actually ran.
    pub variant: &'static str,
}

/// Orchestrates text-to-image jobs against one ComfyUI instance.
pub struct Generator {
    api: ComfyApi,
    ws_url: String,
    /// Correlates event-stream connections to this orchestrator
    /// instance; minted once per instance, not per job.
    client_id: String,
    probe: CapabilityProbe,
    monitor_timeout: Duration,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            api: ComfyApi::new(config.api_url),
            ws_url: config.ws_url,
            client_id: uuid::Uuid::new_v4().to_string(),
            probe: CapabilityProbe::new(),
            monitor_timeout: config.monitor_timeout,
        }
    }

    /// Whether the engine currently answers its health probe.
    pub async fn check_reachable(&self) -> bool {
        self.api.check_reachable().await
    }

    /// Run one generation job to completion.
    ///
    /// Fails with one of the [`GenerateError`] kinds; submission
    /// rejections cascade through weaker graph variants before
    /// surfacing, anything after acceptance surfaces directly.
    pub async fn generate(
        &self,
        params: &GenerationParams,
        progress: Option<mpsc::UnboundedSender<ProgressUpdate>>,
    ) -> Result<GenerationResult, GenerateError> {
        if !self.api.check_reachable().await {
            return Err(GenerateError::Unreachable {
                url: self.api.base_url().to_string(),
            });
        }

        let caps = self.probe.capabilities(&self.api).await;

        // Resolve the seed once so every cascade attempt submits the
        // same graph modulo the variant shape.
        let seed = params.seed.unwrap_or_else(workflow::draw_seed);
        let params = GenerationParams {
            seed: Some(seed),
            ..params.clone()
        };

        let (job, variant) = self.submit_with_fallback(&params, &caps).await?;

        monitor::watch(
            &self.ws_url,
            &job.client_id,
            &job.prompt_id,
            progress,
            self.monitor_timeout,
        )
        .await?;

        let history = self
            .api
            .history(&job.prompt_id)
            .await
            .map_err(|e| GenerateError::ResultMissing(format!("history fetch failed: {e}")))?;
        let artifact = extract_artifact(&history, &job.prompt_id)?;

        let bytes = self
            .api
            .view(&artifact)
            .await
            .map_err(|e| GenerateError::ResultMissing(format!("artifact download failed: {e}")))?;

        tracing::info!(
            prompt_id = %job.prompt_id,
            filename = %artifact.filename,
            size = bytes.len(),
            variant = variant.label(),
            "Generation finished",
        );

        Ok(GenerationResult {
            bytes,
            metadata: GenerationMetadata {
                prompt: params.prompt,
                width: params.width,
                height: params.height,
                steps: params.steps,
                guidance: params.guidance,
                seed,
                filename: artifact.filename,
            },
            variant: variant.label(),
        })
    }

    /// Submit the best permitted variant, cascading through weaker ones
    /// on submission failure.
    ///
    /// The attempt order comes from [`fallback_plan`], so at most three
    /// submissions happen and each is strictly weaker than the last.
    /// Only submission-time failures cascade; once the engine accepts a
    /// graph the job is committed.
    async fn submit_with_fallback(
        &self,
        params: &GenerationParams,
        caps: &crate::capabilities::CapabilitySet,
    ) -> Result<(JobHandle, WorkflowVariant), GenerateError> {
        let plan = fallback_plan(caps);
        let attempts = plan.len();
        let mut last_error: Option<ComfyApiError> = None;

        for (attempt, variant) in plan.into_iter().enumerate() {
            let graph = workflow::build(variant, params);

            match self.api.submit_workflow(&graph, &self.client_id).await {
                Ok(prompt_id) => {
                    tracing::info!(
                        %prompt_id,
                        client_id = %self.client_id,
                        variant = variant.label(),
                        attempt = attempt + 1,
                        "Workflow accepted",
                    );
                    return Ok((
                        JobHandle {
                            prompt_id,
                            client_id: self.client_id.clone(),
                        },
                        variant,
                    ));
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        variant = variant.label(),
                        attempt = attempt + 1,
                        attempts,
                        "Submission failed",
                    );
                    last_error = Some(e);
                }
            }
        }

        // The plan is never empty, so last_error is set by the time the
        // cascade is exhausted.
        Err(GenerateError::Submission(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no submission attempted".into()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use assert_matches::assert_matches;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::capabilities::CapabilitySet;

    fn unreachable_generator() -> Generator {
        // Port 1 is never listening; every network call fails fast.
        Generator::new(GeneratorConfig {
            api_url: "http://127.0.0.1:1".into(),
            ws_url: "ws://127.0.0.1:1".into(),
            monitor_timeout: Duration::from_secs(1),
        })
    }

    fn generator_for(base_url: String) -> Generator {
        Generator::new(GeneratorConfig {
            api_url: base_url,
            ws_url: "ws://127.0.0.1:1".into(),
            monitor_timeout: Duration::from_secs(1),
        })
    }

    /// Minimal engine stub: answers one `POST /prompt` per canned
    /// response body, capturing each submitted request body for
    /// assertions.
    async fn stub_engine(
        responses: Vec<&'static str>,
    ) -> (String, Arc<Mutex<Vec<serde_json::Value>>>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let submissions = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&submissions);

        tokio::spawn(async move {
            for body in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };

                let mut raw = Vec::new();
                let mut chunk = [0u8; 4096];
                let request = loop {
                    let Ok(n) = socket.read(&mut chunk).await else {
                        return;
                    };
                    if n == 0 {
                        return;
                    }
                    raw.extend_from_slice(&chunk[..n]);
                    if let Some(json) = request_json(&raw) {
                        break json;
                    }
                };
                captured.lock().unwrap().push(request);

                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        (base_url, submissions)
    }

    /// Parse the JSON body out of a raw HTTP request, once fully read.
    fn request_json(raw: &[u8]) -> Option<serde_json::Value> {
        let header_end = raw.windows(4).position(|w| w == b"\r\n\r\n")? + 4;
        let headers = std::str::from_utf8(&raw[..header_end]).ok()?;
        let content_length: usize = headers.lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse().ok()
            } else {
                None
            }
        })?;
        let body = raw.get(header_end..header_end + content_length)?;
        serde_json::from_slice(body).ok()
    }

    #[tokio::test]
    async fn unreachable_engine_fails_before_submission() {
        let generator = unreachable_generator();
        let result = generator
            .generate(&GenerationParams::new("a test prompt"), None)
            .await;
        assert_matches!(result, Err(GenerateError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn cascade_surfaces_submission_error_when_exhausted() {
        let generator = unreachable_generator();
        let caps = CapabilitySet {
            quantized_loader: false,
            sampling_correction: false,
        };
        let params = GenerationParams {
            seed: Some(7),
            ..GenerationParams::new("a test prompt")
        };

        let result = generator.submit_with_fallback(&params, &caps).await;
        assert_matches!(result, Err(GenerateError::Submission(_)));
    }

    #[tokio::test]
    async fn rejected_submission_falls_back_to_standard_not_simple() {
        // Full capabilities, but the engine rejects the quantized graph
        // with an explicit error body. The next attempt must be the
        // Standard variant (not a jump to Simple), resubmitting the same
        // seed under the same client id.
        let (base_url, submissions) = stub_engine(vec![
            r#"{"error":{"type":"invalid_prompt","message":"unknown node UnetLoaderGGUF"},"node_errors":{}}"#,
            r#"{"prompt_id":"job-std-1"}"#,
        ])
        .await;

        let generator = generator_for(base_url);
        let caps = CapabilitySet {
            quantized_loader: true,
            sampling_correction: true,
        };
        let params = GenerationParams {
            seed: Some(7),
            ..GenerationParams::new("a test prompt")
        };

        let (handle, variant) = generator.submit_with_fallback(&params, &caps).await.unwrap();
        assert_eq!(handle.prompt_id, "job-std-1");
        assert_eq!(variant, WorkflowVariant::Standard);

        let bodies = submissions.lock().unwrap();
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0]["prompt"]["load_unet"]["class_type"], "UnetLoaderGGUF");
        assert_eq!(bodies[1]["prompt"]["load_unet"]["class_type"], "UNETLoader");
        assert!(bodies[1]["prompt"]["model_sampling"].is_object());
        assert_eq!(bodies[0]["prompt"]["sampler"]["inputs"]["seed"], 7);
        assert_eq!(bodies[1]["prompt"]["sampler"]["inputs"]["seed"], 7);
        assert_eq!(bodies[0]["client_id"], bodies[1]["client_id"]);
    }

    #[tokio::test]
    async fn client_id_is_stable_across_jobs() {
        let (base_url, submissions) = stub_engine(vec![
            r#"{"prompt_id":"job-1"}"#,
            r#"{"prompt_id":"job-2"}"#,
        ])
        .await;

        let generator = generator_for(base_url);
        let caps = CapabilitySet {
            quantized_loader: false,
            sampling_correction: false,
        };
        let params = GenerationParams {
            seed: Some(1),
            ..GenerationParams::new("a test prompt")
        };

        let (first, _) = generator.submit_with_fallback(&params, &caps).await.unwrap();
        let (second, _) = generator.submit_with_fallback(&params, &caps).await.unwrap();
        assert_eq!(first.client_id, second.client_id);

        let bodies = submissions.lock().unwrap();
        assert_eq!(bodies[0]["client_id"], bodies[1]["client_id"]);
        assert_eq!(bodies[0]["client_id"].as_str().unwrap().len(), 36);
    }
}
