//! Quality and resolution preset tables.
//!
//! Quality presets control steps and guidance independent of resolution;
//! resolution presets are the aspect-ratio choices the frontend offers.
//! Both are static tables echoed by `GET /config`.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Quality presets
// ---------------------------------------------------------------------------

/// A named steps/guidance pairing.
#[derive(Debug, Clone, Serialize)]
pub struct QualityPreset {
    /// Stable identifier used in requests (`basic`, `mid`, `high`).
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    pub description: &'static str,
    pub steps: u32,
    pub guidance: f64,
}

/// All quality presets, ordered fastest-first.
pub const QUALITY_PRESETS: &[QualityPreset] = &[
    QualityPreset {
        id: "basic",
        name: "Basic",
        description: "Fast generation, good for previews",
        steps: 8,
        guidance: 3.0,
    },
    QualityPreset {
        id: "mid",
        name: "Standard",
        description: "Balanced quality and speed",
        steps: 20,
        guidance: 3.5,
    },
    QualityPreset {
        id: "high",
        name: "High Quality",
        description: "Best quality, slower generation",
        steps: 32,
        guidance: 4.0,
    },
];

/// Preset used when the request names an unknown preset id.
pub const DEFAULT_QUALITY_PRESET: &str = "mid";

/// Look up a quality preset by id, falling back to the default preset.
///
/// Unknown ids intentionally degrade to the default rather than failing
/// the request.
pub fn quality_preset(id: &str) -> &'static QualityPreset {
    QUALITY_PRESETS
        .iter()
        .find(|p| p.id == id)
        .or_else(|| QUALITY_PRESETS.iter().find(|p| p.id == DEFAULT_QUALITY_PRESET))
        .expect("default quality preset must exist")
}

// ---------------------------------------------------------------------------
// Resolution presets
// ---------------------------------------------------------------------------

/// A named width/height pairing.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionPreset {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    /// Icon hint for the frontend.
    pub icon: &'static str,
}

/// All resolution presets offered by the UI.
pub const RESOLUTION_PRESETS: &[ResolutionPreset] = &[
    ResolutionPreset { name: "Square (1:1)", width: 1024, height: 1024, icon: "square" },
    ResolutionPreset { name: "Landscape (16:9)", width: 1344, height: 768, icon: "landscape" },
    ResolutionPreset { name: "Portrait (9:16)", width: 768, height: 1344, icon: "portrait" },
    ResolutionPreset { name: "Wide (21:9)", width: 1536, height: 640, icon: "wide" },
    ResolutionPreset { name: "Classic (4:3)", width: 1152, height: 896, icon: "classic" },
    ResolutionPreset { name: "Photo (3:2)", width: 1216, height: 832, icon: "photo" },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{validate_params, GenerationParams};

    #[test]
    fn known_preset_is_returned() {
        let p = quality_preset("high");
        assert_eq!(p.id, "high");
        assert_eq!(p.steps, 32);
    }

    #[test]
    fn unknown_preset_falls_back_to_default() {
        let p = quality_preset("ultra-mega");
        assert_eq!(p.id, DEFAULT_QUALITY_PRESET);
    }

    #[test]
    fn every_preset_combination_passes_validation() {
        for quality in QUALITY_PRESETS {
            for resolution in RESOLUTION_PRESETS {
                let params = GenerationParams {
                    prompt: "test".into(),
                    width: resolution.width,
                    height: resolution.height,
                    steps: quality.steps,
                    guidance: quality.guidance,
                    seed: None,
                };
                assert!(
                    validate_params(&params).is_ok(),
                    "preset {} x {} failed validation",
                    quality.id,
                    resolution.name
                );
            }
        }
    }
}
