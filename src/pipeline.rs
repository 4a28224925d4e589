//! Pipeline orchestration: load, merge, validate, render
//!
//! One invocation reads the overlay config (and optionally a base config),
//! merges them, validates the result for the requested resource kind and
//! only then renders and writes the manifest. Nothing is written unless
//! every stage succeeds.

use std::path::{Path, PathBuf};

use apphosting_schema::{ResourceKind, ValidationReport};
use serde::Serialize;
use serde_yaml::Value;
use thiserror::Error;

use crate::config::{load_document, merge, sha256_hex, ConfigError, ConfigOrigin, ConfigSource};
use crate::output::write_atomic;
use crate::render::{render, RenderError, RenderOptions};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Validation(ValidationReport),

    #[error("invalid render options: {0}")]
    Options(RenderError),

    #[error("output error: {0}")]
    Output(RenderError),

    #[error("render error: {0}")]
    Render(RenderError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),
}

impl PipelineError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Config(_) => 2,
            PipelineError::Validation(_) => 3,
            PipelineError::Options(_) => 4,
            PipelineError::Output(_) => 5,
            PipelineError::Render(_) => 6,
            PipelineError::Serialization(_) => 6,
        }
    }
}

impl From<RenderError> for PipelineError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::MissingOption(_) | RenderError::UnknownResourceType(_) => {
                PipelineError::Options(err)
            }
            RenderError::Config(inner) => PipelineError::Config(inner),
            RenderError::Output { .. } => PipelineError::Output(err),
            RenderError::Serialize { .. } => PipelineError::Render(err),
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Config layers the pipeline reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Environment-specific overlay (required)
    pub config_path: PathBuf,

    /// Shared base config, merged underneath the overlay
    pub base_path: Option<PathBuf>,
}

/// Merged config document with the sources that produced it
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub document: Value,

    /// Base first (if any), then the overlay
    pub sources: Vec<ConfigSource>,
}

impl MergedConfig {
    /// Serialize the merged document to YAML
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.document)
    }
}

/// Summary of a successful render
#[derive(Debug, Clone, Serialize)]
pub struct RenderOutcome {
    pub output_path: PathBuf,
    pub kind: ResourceKind,

    /// SHA-256 of the manifest bytes
    pub digest: String,

    pub bytes_written: usize,
    pub sources: Vec<ConfigSource>,
}

/// Pipeline execution context
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load both layers and merge them.
    pub fn merged(&self) -> PipelineResult<MergedConfig> {
        let mut sources = Vec::with_capacity(2);

        let base = match &self.config.base_path {
            Some(path) => {
                let loaded = load_document(path, ConfigOrigin::Base)?;
                sources.push(loaded.source);
                Some(loaded.value)
            }
            None => None,
        };

        let overlay = load_document(&self.config.config_path, ConfigOrigin::Overlay)?;
        sources.push(overlay.source);

        Ok(MergedConfig {
            document: merge(base, overlay.value),
            sources,
        })
    }

    /// Load, merge and validate without rendering.
    pub fn check(&self, kind: ResourceKind) -> PipelineResult<ValidationReport> {
        let merged = self.merged()?;
        Ok(ValidationReport::check(&merged.document, kind))
    }

    /// Full pipeline: the manifest is written only when the merged config
    /// has no violations.
    pub fn run(&self, options: &RenderOptions) -> PipelineResult<RenderOutcome> {
        let kind = options.validate()?;
        let merged = self.merged()?;

        let report = ValidationReport::check(&merged.document, kind);
        if !report.is_valid() {
            for violation in &report.violations {
                tracing::warn!(code = %violation.to_code(), "{}", violation);
            }
            return Err(PipelineError::Validation(report));
        }

        let bytes = render(&merged.document, options)?;
        write_atomic(&options.output_path, &bytes).map_err(|source| {
            PipelineError::Output(RenderError::Output {
                path: options.output_path.clone(),
                source,
            })
        })?;

        let outcome = RenderOutcome {
            output_path: options.output_path.clone(),
            kind,
            digest: sha256_hex(&bytes),
            bytes_written: bytes.len(),
            sources: merged.sources,
        };
        tracing::info!(
            kind = %outcome.kind,
            path = %outcome.output_path.display(),
            digest = %outcome.digest,
            "wrote manifest"
        );
        Ok(outcome)
    }

    /// Write the merged document as YAML to `path`.
    pub fn write_merged(&self, path: &Path) -> PipelineResult<MergedConfig> {
        let merged = self.merged()?;
        let yaml = merged.to_yaml()?;
        write_atomic(path, yaml.as_bytes()).map_err(|source| {
            PipelineError::Output(RenderError::Output {
                path: path.to_path_buf(),
                source,
            })
        })?;
        Ok(merged)
    }
}
