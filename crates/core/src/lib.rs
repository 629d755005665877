//! Domain types shared across the fluxgen workspace.
//!
//! Holds the generation parameter model, parameter validation, the
//! quality/resolution preset tables, and the core error type. No I/O
//! lives here.

pub mod error;
pub mod generation;
pub mod presets;
