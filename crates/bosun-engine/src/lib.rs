//! Bosun Engine - manifest compilation
//!
//! This crate turns service manifests into deployable configuration:
//! - `${name}` interpolation over raw provision text
//! - Deep merge with per-key sequence policies and a depth bound
//! - Provision loading with include resolution and cycle protection
//! - Service and stack rendering into compose, routing and monitoring targets
//! - Writing rendered targets and diffing them against the output directory

pub mod error;
pub mod interpolate;
pub mod merge;
pub mod output;
pub mod provision;
pub mod render;

pub use error::{EngineError, Result};
pub use interpolate::{interpolate, interpolate_tree};
pub use merge::{MAX_MERGE_DEPTH, MergePolicy, deep_merge};
pub use output::{FileDiff, FileStatus, OutputDiff};
pub use provision::{Provision, ProvisionLoader, Target};
pub use render::{
    RenderOutput, Renderer, load_service_manifest, load_stack, load_values_overlay,
    render_service, render_stack,
};
