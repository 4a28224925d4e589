//! Cloud Run manifest rendering from layered apphosting configs
//!
//! This crate merges a base apphosting config with an environment overlay,
//! validates the merged document for one resource kind and renders it into
//! a Cloud Run Service, Job or WorkerPool manifest.

pub mod config;
pub mod output;
pub mod pipeline;
pub mod render;

pub use apphosting_schema::{validate, ResourceKind, ValidationReport, Violation};
pub use config::{deep_merge, merge, AppHostingConfig, ConfigError, ConfigSource};
pub use pipeline::{
    MergedConfig, Pipeline, PipelineConfig, PipelineError, PipelineResult, RenderOutcome,
};
pub use render::{
    render, render_to_file, resolve_resource_kind, Manifest, RenderError, RenderOptions,
};
