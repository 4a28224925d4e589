//! Manifest renderer
//!
//! Turns a merged config document plus render options into one Cloud Run
//! manifest. The resource kind picks the manifest shape:
//! - `service`: Knative `Service` (serving.knative.dev/v1)
//! - `job`: Cloud Run `Job` (run.googleapis.com/v1)
//! - `worker`: Cloud Run `WorkerPool` (run.googleapis.com/v1)
//!
//! Rendering is pure; [`render_to_file`] is the only entry point that
//! touches the filesystem.

mod job;
mod service;
mod shared;
mod worker;

pub use job::{build_job, Job, JOB_API_VERSION};
pub use service::{build_service, clean_service_manifest, Service, SERVICE_API_VERSION};
pub use shared::{
    secret_name_from_reference, Annotations, Container, EnvVar, ANNOTATION_CLOUDSQL_INSTANCES,
    ANNOTATION_EXECUTION_ENVIRONMENT, ANNOTATION_INGRESS, ANNOTATION_MAX_SCALE,
    ANNOTATION_MIN_SCALE, ANNOTATION_NETWORK_INTERFACES, ANNOTATION_VPC_CONNECTOR,
    ANNOTATION_VPC_EGRESS, SECRET_VERSION_LATEST,
};
pub use worker::{build_worker_pool, WorkerPool, WORKER_POOL_API_VERSION};

use std::io;
use std::path::{Path, PathBuf};

use apphosting_schema::{ResourceKind, UnknownKind};
use serde_yaml::Value;
use thiserror::Error;

use crate::config::{AppHostingConfig, ConfigError, DEFAULT_TIMEOUT_SECONDS};
use crate::output::write_atomic;

/// Render errors
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{0} is required")]
    MissingOption(&'static str),

    #[error(transparent)]
    UnknownResourceType(#[from] UnknownKind),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to serialize {kind} manifest: {source}")]
    Serialize {
        kind: ResourceKind,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to write manifest {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Per-invocation render parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Becomes `metadata.name`
    pub service_name: String,

    /// Required, but not written into the manifest
    pub region: String,

    /// Container image reference, used verbatim
    pub image: String,

    /// `service`, `job` or `worker`; empty means `service`
    pub resource_type: String,

    /// Request timeout for services and worker pools; <= 0 means the default
    pub timeout_seconds: i64,

    pub output_path: PathBuf,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            service_name: String::new(),
            region: String::new(),
            image: String::new(),
            resource_type: ResourceKind::Service.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            output_path: PathBuf::new(),
        }
    }
}

impl RenderOptions {
    /// Check required options in a fixed order and resolve the resource kind.
    pub fn validate(&self) -> Result<ResourceKind, RenderError> {
        if self.service_name.trim().is_empty() {
            return Err(RenderError::MissingOption("service name"));
        }
        if self.region.trim().is_empty() {
            return Err(RenderError::MissingOption("region"));
        }
        if self.image.trim().is_empty() {
            return Err(RenderError::MissingOption("image"));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(RenderError::MissingOption("output path"));
        }
        self.resource_kind()
    }

    /// Resource kind named by `resource_type`.
    pub fn resource_kind(&self) -> Result<ResourceKind, RenderError> {
        Ok(resolve_resource_kind(&self.resource_type)?)
    }
}

/// Parse a resource type option; blank means `service`.
pub fn resolve_resource_kind(resource_type: &str) -> Result<ResourceKind, UnknownKind> {
    let resource_type = resource_type.trim();
    if resource_type.is_empty() {
        return Ok(ResourceKind::Service);
    }
    resource_type.parse()
}

/// A built manifest, one variant per resource kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Manifest {
    Service(Service),
    Job(Job),
    WorkerPool(WorkerPool),
}

impl Manifest {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Manifest::Service(_) => ResourceKind::Service,
            Manifest::Job(_) => ResourceKind::Job,
            Manifest::WorkerPool(_) => ResourceKind::Worker,
        }
    }

    /// Serialize to YAML. Services go through the cleanup pass first.
    pub fn to_yaml(&self) -> Result<String, RenderError> {
        let kind = self.kind();
        let wrap = |source| RenderError::Serialize { kind, source };
        match self {
            Manifest::Service(service) => {
                let tree = serde_yaml::to_value(service).map_err(wrap)?;
                serde_yaml::to_string(&clean_service_manifest(tree)).map_err(wrap)
            }
            Manifest::Job(job) => serde_yaml::to_string(job).map_err(wrap),
            Manifest::WorkerPool(pool) => serde_yaml::to_string(pool).map_err(wrap),
        }
    }
}

/// Build the typed manifest for `kind`.
pub fn build_manifest(
    config: &AppHostingConfig,
    options: &RenderOptions,
    kind: ResourceKind,
) -> Manifest {
    match kind {
        ResourceKind::Service => Manifest::Service(build_service(config, options)),
        ResourceKind::Job => Manifest::Job(build_job(config, options)),
        ResourceKind::Worker => Manifest::WorkerPool(build_worker_pool(config, options)),
    }
}

/// Render a merged config document to manifest bytes.
pub fn render(doc: &Value, options: &RenderOptions) -> Result<Vec<u8>, RenderError> {
    let kind = options.validate()?;
    let config = AppHostingConfig::from_document(doc)?;

    tracing::debug!(
        kind = %kind,
        service = %options.service_name,
        region = %options.region,
        image = %options.image,
        "rendering manifest"
    );

    let yaml = build_manifest(&config, options, kind).to_yaml()?;
    Ok(yaml.into_bytes())
}

/// Render and atomically write the manifest to `options.output_path`.
///
/// Returns the bytes written. The destination is untouched on any failure.
pub fn render_to_file(doc: &Value, options: &RenderOptions) -> Result<Vec<u8>, RenderError> {
    let bytes = render(doc, options)?;
    write_manifest(&options.output_path, &bytes)?;
    Ok(bytes)
}

fn write_manifest(path: &Path, bytes: &[u8]) -> Result<(), RenderError> {
    write_atomic(path, bytes).map_err(|source| RenderError::Output {
        path: path.to_path_buf(),
        source,
    })
}
