//! Artifact extraction from the engine's execution history.
//!
//! After the event stream signals success, `GET /history/{prompt_id}`
//! returns the recorded node outputs. [`extract_artifact`] scans those
//! outputs for the first node exposing an image list and pulls out the
//! reference needed to download the bytes via `/view`.

use serde::{Deserialize, Serialize};

use crate::error::GenerateError;

/// Reference to one produced image, as recorded by the terminal node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub filename: String,
    /// Subdirectory under the engine's output root; often empty.
    #[serde(default)]
    pub subfolder: String,
    /// Output folder kind (`output`, `temp`, ...). Passed back verbatim
    /// as the `type` query parameter of `/view`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Pull the produced artifact reference out of a history response.
///
/// The history JSON is keyed by prompt id:
/// `{ "<prompt_id>": { "outputs": { "<node>": { "images": [...] } } } }`.
///
/// Fails with [`GenerateError::ResultMissing`] when the prompt id is
/// absent (not yet recorded, or rotated out) or when no recorded node
/// exposes an image list -- the latter means the terminal node's output
/// shape changed or execution produced nothing despite a success signal.
pub fn extract_artifact(
    history: &serde_json::Value,
    prompt_id: &str,
) -> Result<ArtifactRef, GenerateError> {
    let entry = history.get(prompt_id).ok_or_else(|| {
        GenerateError::ResultMissing(format!("no history entry for job {prompt_id}"))
    })?;

    let outputs = entry
        .get("outputs")
        .and_then(|o| o.as_object())
        .ok_or_else(|| {
            GenerateError::ResultMissing(format!("history entry for job {prompt_id} has no outputs"))
        })?;

    for (node_name, output) in outputs {
        let Some(images) = output.get("images").and_then(|i| i.as_array()) else {
            continue;
        };
        let Some(first) = images.first() else {
            continue;
        };

        let artifact: ArtifactRef = serde_json::from_value(first.clone()).map_err(|e| {
            GenerateError::ResultMissing(format!(
                "malformed image entry in node '{node_name}': {e}"
            ))
        })?;
        return Ok(artifact);
    }

    Err(GenerateError::ResultMissing(format!(
        "no node output exposes an image list for job {prompt_id}"
    )))
}
