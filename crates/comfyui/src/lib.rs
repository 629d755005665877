//! ComfyUI job compiler and execution orchestrator.
//!
//! Builds text-to-image workflow graphs, selects among three
//! progressively-degraded variants by probing the engine's node catalog,
//! submits with a cascading fallback strategy, tracks execution over the
//! engine's WebSocket event stream, and retrieves the produced image.
//!
//! The entry point is [`generator::Generator`], constructed once at the
//! composition root and shared across requests.

pub mod api;
pub mod capabilities;
pub mod error;
pub mod generator;
pub mod history;
pub mod messages;
pub mod monitor;
pub mod workflow;

pub use error::GenerateError;
pub use generator::{Generator, GeneratorConfig};
pub use monitor::ProgressUpdate;
