//! HTTP route layer for the Flux generation backend.
//!
//! Thin I/O plumbing over the orchestrator in `fluxgen-comfyui`: request
//! validation, prompt enhancement, gallery persistence, and the Axum
//! middleware stack. Exposed as a library so integration tests can build
//! the exact router the binary runs.

pub mod config;
pub mod error;
pub mod gallery;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
