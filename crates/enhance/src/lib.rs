//! OpenRouter client for LLM-based prompt enhancement.
//!
//! Thin collaborator around the chat-completions API: rewrite a short
//! user description into a detailed generation prompt, validate an API
//! key, and list the text models suitable for rewriting.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const ENHANCE_TIMEOUT: Duration = Duration::from_secs(30);
const KEY_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const MODELS_TIMEOUT: Duration = Duration::from_secs(15);

/// Instruction given to the rewriting model. The model must answer with
/// the enhanced prompt only, as one flowing paragraph.
const SYSTEM_PROMPT: &str = "\
You are a prompt engineering expert for the Flux 2 image generation model. \
Transform the user's short description into a detailed, effective prompt. \
Flux 2 responds best to descriptive language, specific subject attributes, \
lighting and atmosphere details, camera or perspective notes, and quality \
boosters such as 'highly detailed' or '8k'. Rules: output ONLY the enhanced \
prompt; keep it concise but rich (50-150 words); preserve the user's core \
intent; no negative-prompt elements; no markdown or bullet points; write one \
flowing paragraph in English.";

/// Errors from the enhancement layer.
#[derive(Debug, thiserror::Error)]
pub enum EnhanceError {
    /// The HTTP request itself failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// OpenRouter returned a non-2xx status code.
    #[error("OpenRouter API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The response parsed but carried no completion text.
    #[error("OpenRouter response contained no completion")]
    EmptyCompletion,
}

/// A text model offered for prompt rewriting.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub context_length: u64,
    pub pricing: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Client for the OpenRouter chat-completions API.
pub struct OpenRouterClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenRouterClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }

    /// Rewrite a user description into a detailed generation prompt.
    pub async fn enhance_prompt(
        &self,
        user_prompt: &str,
        model: &str,
    ) -> Result<String, EnhanceError> {
        let body = serde_json::json!({
            "model": model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!("Transform this into a Flux 2 optimized prompt: {user_prompt}"),
                },
            ],
            "max_tokens": 500,
            "temperature": 0.7,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(ENHANCE_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EnhanceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(EnhanceError::EmptyCompletion)?;

        // Models occasionally wrap the answer in quotes despite the
        // instructions.
        Ok(content.trim().trim_matches(['"', '\'']).to_string())
    }

    /// Whether the configured API key is accepted by OpenRouter.
    ///
    /// Returns `false` on any failure; never errors.
    pub async fn check_api_key(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/auth/key", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(KEY_CHECK_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "API key check failed");
                false
            }
        }
    }

    /// List models suitable for prompt rewriting, name-sorted.
    ///
    /// Image/vision/audio/embedding models are filtered out. Upstream
    /// failure degrades to an empty list.
    pub async fn list_models(&self) -> Vec<ModelInfo> {
        let result = self
            .client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(MODELS_TIMEOUT)
            .send()
            .await;

        let response = match result {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                tracing::warn!(status = %response.status(), "Model listing failed");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Model listing failed");
                return Vec::new();
            }
        };

        let payload: serde_json::Value = match response.json().await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Model listing returned malformed JSON");
                return Vec::new();
            }
        };

        let entries = payload
            .get("data")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default();

        let mut models: Vec<ModelInfo> = entries.iter().filter_map(parse_text_model).collect();
        models.sort_by(|a, b| a.name.cmp(&b.name));
        models
    }
}

/// Parse one catalog entry, skipping non-text models.
fn parse_text_model(entry: &serde_json::Value) -> Option<ModelInfo> {
    let id = entry.get("id")?.as_str()?.to_string();

    const NON_TEXT_MARKERS: &[&str] = &["image", "vision", "audio", "embed", "tts", "whisper"];
    let lowered = id.to_lowercase();
    if NON_TEXT_MARKERS.iter().any(|m| lowered.contains(m)) {
        return None;
    }

    Some(ModelInfo {
        name: entry
            .get("name")
            .and_then(|n| n.as_str())
            .unwrap_or(&id)
            .to_string(),
        description: entry
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or_default()
            .to_string(),
        context_length: entry
            .get("context_length")
            .and_then(|c| c.as_u64())
            .unwrap_or(0),
        pricing: entry.get("pricing").cloned().unwrap_or(serde_json::Value::Null),
        id,
    })
}
