//! Generation parameter model, defaults, and validation.
//!
//! [`GenerationParams`] is the input to the ComfyUI orchestrator;
//! [`GenerationMetadata`] is the echo of those parameters attached to a
//! finished result. Quality/resolution presets live in
//! [`crate::presets`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Defaults and bounds
// ---------------------------------------------------------------------------

/// Default image width in pixels.
pub const DEFAULT_WIDTH: u32 = 1024;
/// Default image height in pixels.
pub const DEFAULT_HEIGHT: u32 = 1024;
/// Default number of sampling steps.
pub const DEFAULT_STEPS: u32 = 20;
/// Default guidance (CFG) scale.
pub const DEFAULT_GUIDANCE: f64 = 3.5;

/// Smallest accepted image dimension. The latent space works on 16-px
/// blocks, so anything below this produces degenerate latents.
pub const MIN_DIMENSION: u32 = 64;
/// Largest accepted image dimension.
pub const MAX_DIMENSION: u32 = 2048;
/// Hard ceiling on sampling steps to prevent runaway jobs.
pub const MAX_STEPS: u32 = 100;
/// Upper bound on the guidance scale.
pub const MAX_GUIDANCE: f64 = 20.0;
/// Seeds are drawn from the positive 31-bit range, matching the engine's
/// accepted seed domain.
pub const SEED_RANGE: u64 = 1 << 31;

// ---------------------------------------------------------------------------
// Parameter types
// ---------------------------------------------------------------------------

/// Everything needed to build and submit one text-to-image job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Positive prompt text.
    pub prompt: String,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Number of sampling steps.
    pub steps: u32,
    /// Guidance (CFG) scale.
    pub guidance: f64,
    /// Explicit seed. `None` means "draw a fresh random seed".
    pub seed: Option<u64>,
}

impl GenerationParams {
    /// Construct params for a prompt with all other fields at their
    /// defaults and no fixed seed.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            steps: DEFAULT_STEPS,
            guidance: DEFAULT_GUIDANCE,
            seed: None,
        }
    }
}

/// Parameter echo attached to a finished generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub guidance: f64,
    /// The seed that was actually used (resolved if the request left it
    /// unset).
    pub seed: u64,
    /// Filename of the artifact as recorded by the engine.
    pub filename: String,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate generation parameters before any engine traffic happens.
pub fn validate_params(params: &GenerationParams) -> Result<(), CoreError> {
    if params.prompt.trim().is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".into()));
    }
    validate_dimension("width", params.width)?;
    validate_dimension("height", params.height)?;
    if params.steps == 0 || params.steps > MAX_STEPS {
        return Err(CoreError::Validation(format!(
            "Steps must be between 1 and {MAX_STEPS}, got {}",
            params.steps
        )));
    }
    if !(0.0..=MAX_GUIDANCE).contains(&params.guidance) {
        return Err(CoreError::Validation(format!(
            "Guidance must be between 0 and {MAX_GUIDANCE}, got {}",
            params.guidance
        )));
    }
    if let Some(seed) = params.seed {
        if seed >= SEED_RANGE {
            return Err(CoreError::Validation(format!(
                "Seed must be below 2^31, got {seed}"
            )));
        }
    }
    Ok(())
}

fn validate_dimension(axis: &str, value: u32) -> Result<(), CoreError> {
    if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
        return Err(CoreError::Validation(format!(
            "{axis} must be between {MIN_DIMENSION} and {MAX_DIMENSION}, got {value}"
        )));
    }
    Ok(())
}
