//! Text-to-image workflow graph builder.
//!
//! A workflow is a named-node graph submitted to the engine as one job.
//! Three progressively-degraded variants exist for the same request:
//!
//! - **Quantized** -- GGUF quantized model loader plus the
//!   resolution-aware sampling-correction node. Preferred: smallest
//!   memory footprint, best portability.
//! - **Standard** -- full-precision loader plus sampling correction.
//! - **Simple** -- full-precision loader only; the sampler consumes the
//!   loader's model output directly. Omitting sampling correction is
//!   always valid but can degrade quality at non-square resolutions.
//!
//! All variants share an identical tail: positive/negative text encode,
//! an empty latent sized to the request, the sampler, the decoder, and a
//! single terminal save node.

use std::collections::BTreeMap;

use rand::Rng;
use serde::Serialize;

use fluxgen_core::generation::{GenerationParams, SEED_RANGE};

use crate::capabilities::CapabilitySet;

// ---------------------------------------------------------------------------
// Node type names
// ---------------------------------------------------------------------------

/// Quantized (GGUF) model loader node type.
pub const QUANTIZED_LOADER: &str = "UnetLoaderGGUF";
/// Resolution-aware timestep-shift node type.
pub const SAMPLING_CORRECTION: &str = "ModelSamplingFlux";
/// Terminal artifact-producing node type.
pub const SAVE_IMAGE: &str = "SaveImage";

/// Human-readable name of the model family every variant targets.
pub const MODEL_NAME: &str = "flux2-dev";

// Model asset filenames expected on the engine side.
const UNET_FULL: &str = "flux2_dev_fp8mixed.safetensors";
const UNET_GGUF: &str = "flux2-dev-Q5_K_M.gguf";
const CLIP_FULL: &str = "mistral_3_small_flux2_fp8.safetensors";
const CLIP_GGUF: &str = "mistral_3_small_flux2_bf16.safetensors";
const VAE: &str = "flux2-vae.safetensors";

/// Filename prefix the engine uses for saved outputs.
const OUTPUT_PREFIX: &str = "flux_gen";

// ---------------------------------------------------------------------------
// Graph model
// ---------------------------------------------------------------------------

/// A reference to another node's output: `(node name, output index)`.
/// Serializes to the engine's `["name", index]` wire shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeLink(pub String, pub u32);

/// One slot value in a node's input map: either literal parameter data
/// or a link to another node's output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NodeInput {
    Text(String),
    Int(u64),
    Float(f64),
    Link(NodeLink),
}

/// One step in the engine's computation graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSpec {
    /// Engine node type name.
    pub class_type: String,
    /// Slot name to input value.
    pub inputs: BTreeMap<String, NodeInput>,
}

impl NodeSpec {
    fn new(class_type: &str) -> Self {
        Self {
            class_type: class_type.to_string(),
            inputs: BTreeMap::new(),
        }
    }

    fn text(mut self, slot: &str, value: impl Into<String>) -> Self {
        self.inputs.insert(slot.into(), NodeInput::Text(value.into()));
        self
    }

    fn int(mut self, slot: &str, value: u64) -> Self {
        self.inputs.insert(slot.into(), NodeInput::Int(value));
        self
    }

    fn float(mut self, slot: &str, value: f64) -> Self {
        self.inputs.insert(slot.into(), NodeInput::Float(value));
        self
    }

    fn link(mut self, slot: &str, node: &str, output: u32) -> Self {
        self.inputs
            .insert(slot.into(), NodeInput::Link(NodeLink(node.to_string(), output)));
        self
    }
}

/// A complete, immutable workflow graph keyed by node name.
///
/// Serializes transparently to the engine's `{name: spec}` wire format.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Workflow {
    nodes: BTreeMap<String, NodeSpec>,
}

/// Structural invariant violations detected by [`Workflow::validate`].
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// A link names a node that is not present in the graph.
    #[error("Node '{node}' slot '{slot}' links to missing node '{target}'")]
    UnresolvedLink {
        node: String,
        slot: String,
        target: String,
    },

    /// The graph must contain exactly one terminal artifact node.
    #[error("Expected exactly one terminal artifact node, found {0}")]
    TerminalCount(usize),
}

impl Workflow {
    fn insert(&mut self, name: &str, spec: NodeSpec) {
        self.nodes.insert(name.to_string(), spec);
    }

    /// Node lookup by name.
    pub fn get(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.get(name)
    }

    /// All nodes, keyed by name.
    pub fn nodes(&self) -> &BTreeMap<String, NodeSpec> {
        &self.nodes
    }

    /// Whether the graph contains a node of the given type.
    pub fn contains_type(&self, class_type: &str) -> bool {
        self.nodes.values().any(|n| n.class_type == class_type)
    }

    /// Check the structural invariants: every link resolves to a node in
    /// this graph, and exactly one terminal artifact node exists.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        for (name, spec) in &self.nodes {
            for (slot, input) in &spec.inputs {
                if let NodeInput::Link(NodeLink(target, _)) = input {
                    if !self.nodes.contains_key(target) {
                        return Err(WorkflowError::UnresolvedLink {
                            node: name.clone(),
                            slot: slot.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }
        }

        let terminals = self
            .nodes
            .values()
            .filter(|n| n.class_type == SAVE_IMAGE)
            .count();
        if terminals != 1 {
            return Err(WorkflowError::TerminalCount(terminals));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Variant selection
// ---------------------------------------------------------------------------

/// The three graph shapes, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowVariant {
    Quantized,
    Standard,
    Simple,
}

impl WorkflowVariant {
    /// Pick the best variant the engine supports.
    ///
    /// Pure function of the capability set: quantized when the quantized
    /// loader exists, standard when only sampling correction exists,
    /// simple otherwise.
    pub fn select(caps: &CapabilitySet) -> Self {
        if caps.quantized_loader {
            Self::Quantized
        } else if caps.sampling_correction {
            Self::Standard
        } else {
            Self::Simple
        }
    }

    /// Short label for logs and metadata.
    pub fn label(self) -> &'static str {
        match self {
            Self::Quantized => "quantized",
            Self::Standard => "standard",
            Self::Simple => "simple",
        }
    }
}

/// Ordered submission attempts for a capability set.
///
/// The first entry is [`WorkflowVariant::select`]'s choice; each later
/// entry is the next weaker variant still permitted by the capability
/// set. The plan drives the submission cascade: attempts happen strictly
/// in this order and the plan never exceeds three entries. Fallback
/// covers submission-time rejection only; once the engine accepts a
/// graph the remaining entries are irrelevant.
pub fn fallback_plan(caps: &CapabilitySet) -> Vec<WorkflowVariant> {
    let mut plan = vec![WorkflowVariant::select(caps)];
    if plan.contains(&WorkflowVariant::Quantized) && caps.sampling_correction {
        plan.push(WorkflowVariant::Standard);
    }
    if !plan.contains(&WorkflowVariant::Simple) {
        plan.push(WorkflowVariant::Simple);
    }
    plan
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Draw a seed uniformly from the positive 31-bit range.
pub fn draw_seed() -> u64 {
    rand::rng().random_range(0..SEED_RANGE)
}

/// Build the requested workflow variant.
///
/// If `params.seed` is unset, a fresh seed is drawn -- two builds with an
/// unset seed yield different graphs. With an explicit seed the result
/// is fully deterministic.
pub fn build(variant: WorkflowVariant, params: &GenerationParams) -> Workflow {
    let seed = params.seed.unwrap_or_else(draw_seed);
    let mut workflow = Workflow {
        nodes: BTreeMap::new(),
    };

    // Model loading differs per variant; everything downstream of the
    // model output is shared.
    let (loader_name, clip_name) = match variant {
        WorkflowVariant::Quantized => {
            workflow.insert(
                "load_unet",
                NodeSpec::new(QUANTIZED_LOADER).text("unet_name", UNET_GGUF),
            );
            ("load_unet", CLIP_GGUF)
        }
        WorkflowVariant::Standard | WorkflowVariant::Simple => {
            workflow.insert(
                "load_unet",
                NodeSpec::new("UNETLoader")
                    .text("unet_name", UNET_FULL)
                    .text("weight_dtype", "fp8_e4m3fn"),
            );
            ("load_unet", CLIP_FULL)
        }
    };

    workflow.insert(
        "load_clip",
        NodeSpec::new("CLIPLoader")
            .text("clip_name", clip_name)
            .text("type", "flux2"),
    );
    workflow.insert("load_vae", NodeSpec::new("VAELoader").text("vae_name", VAE));

    // The sampler's model input: either the sampling-correction node
    // (which rescales the timestep schedule for the target resolution)
    // or the raw loader output.
    let model_source = match variant {
        WorkflowVariant::Quantized | WorkflowVariant::Standard => {
            workflow.insert(
                "model_sampling",
                NodeSpec::new(SAMPLING_CORRECTION)
                    .link("model", loader_name, 0)
                    .float("max_shift", 1.15)
                    .float("base_shift", 0.5)
                    .int("width", params.width as u64)
                    .int("height", params.height as u64),
            );
            "model_sampling"
        }
        WorkflowVariant::Simple => loader_name,
    };

    workflow.insert(
        "clip_encode",
        NodeSpec::new("CLIPTextEncode")
            .text("text", params.prompt.clone())
            .link("clip", "load_clip", 0),
    );
    workflow.insert(
        "clip_encode_negative",
        NodeSpec::new("CLIPTextEncode")
            .text("text", "")
            .link("clip", "load_clip", 0),
    );
    workflow.insert(
        "empty_latent",
        NodeSpec::new("EmptySD3LatentImage")
            .int("width", params.width as u64)
            .int("height", params.height as u64)
            .int("batch_size", 1),
    );
    workflow.insert(
        "sampler",
        NodeSpec::new("KSampler")
            .link("model", model_source, 0)
            .link("positive", "clip_encode", 0)
            .link("negative", "clip_encode_negative", 0)
            .link("latent_image", "empty_latent", 0)
            .int("seed", seed)
            .int("steps", params.steps as u64)
            .float("cfg", params.guidance)
            .text("sampler_name", "euler")
            .text("scheduler", "simple")
            .float("denoise", 1.0),
    );
    workflow.insert(
        "vae_decode",
        NodeSpec::new("VAEDecode")
            .link("samples", "sampler", 0)
            .link("vae", "load_vae", 0),
    );
    workflow.insert(
        "save_image",
        NodeSpec::new(SAVE_IMAGE)
            .link("images", "vae_decode", 0)
            .text("filename_prefix", OUTPUT_PREFIX),
    );

    workflow
}
