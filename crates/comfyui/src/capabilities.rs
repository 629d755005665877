//! Runtime discovery of the engine's supported node types.
//!
//! [`CapabilityProbe`] fetches the node-type catalog from
//! `GET /object_info` once and caches the key set for the owning
//! orchestrator's lifetime. The cache is never invalidated mid-session:
//! if the engine's plugins change underneath a running process, the
//! stale set is used until restart.
//!
//! A fetch failure caches an *empty* catalog, which reads as "no
//! advanced capability" -- the workflow builder then degrades to the
//! simple variant instead of the probe failing the caller.

use std::collections::HashSet;

use tokio::sync::OnceCell;

use crate::api::ComfyApi;
use crate::workflow::{QUANTIZED_LOADER, SAMPLING_CORRECTION};

/// The advanced node types the workflow builder can take advantage of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySet {
    /// `UnetLoaderGGUF` is available.
    pub quantized_loader: bool,
    /// `ModelSamplingFlux` is available.
    pub sampling_correction: bool,
}

/// Once-per-instance node catalog cache.
///
/// Concurrent first-time probes may both fetch; one write wins, which is
/// safe because the fetch is idempotent and side-effect-free.
#[derive(Default)]
pub struct CapabilityProbe {
    catalog: OnceCell<HashSet<String>>,
}

impl CapabilityProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a specific node type is in the engine's catalog.
    pub async fn supports(&self, api: &ComfyApi, node_type: &str) -> bool {
        self.catalog(api).await.contains(node_type)
    }

    /// Derive the capability set the workflow builder cares about.
    pub async fn capabilities(&self, api: &ComfyApi) -> CapabilitySet {
        let catalog = self.catalog(api).await;
        CapabilitySet {
            quantized_loader: catalog.contains(QUANTIZED_LOADER),
            sampling_correction: catalog.contains(SAMPLING_CORRECTION),
        }
    }

    /// The cached catalog, fetching it on first use.
    async fn catalog(&self, api: &ComfyApi) -> &HashSet<String> {
        self.catalog
            .get_or_init(|| async {
                match api.object_info().await {
                    Ok(info) => {
                        let types: HashSet<String> = info
                            .as_object()
                            .map(|map| map.keys().cloned().collect())
                            .unwrap_or_default();
                        tracing::debug!(count = types.len(), "Fetched node-type catalog");
                        types
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "Failed to fetch node catalog; assuming no advanced capabilities",
                        );
                        HashSet::new()
                    }
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_failure_degrades_to_no_capabilities() {
        // Nothing listens on this port, so the catalog fetch fails and
        // the probe must report the most conservative capability set.
        let api = ComfyApi::new("http://127.0.0.1:1".into());
        let probe = CapabilityProbe::new();

        let caps = probe.capabilities(&api).await;
        assert!(!caps.quantized_loader);
        assert!(!caps.sampling_correction);
        assert!(!probe.supports(&api, QUANTIZED_LOADER).await);
    }

    #[tokio::test]
    async fn failed_fetch_is_cached_for_instance_lifetime() {
        let api = ComfyApi::new("http://127.0.0.1:1".into());
        let probe = CapabilityProbe::new();

        let first = probe.capabilities(&api).await;
        let second = probe.capabilities(&api).await;
        assert_eq!(first, second);
    }
}
